//! 构建器配置

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// 构建器选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// 按路径复用关联；关闭后同一路径每次引用都新建关联
    pub join_cache: bool,
    /// 是否在构建时处理预加载请求
    pub prefetch: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            join_cache: true,
            prefetch: true,
        }
    }
}

impl BuilderOptions {
    pub fn without_join_cache(mut self) -> Self {
        self.join_cache = false;
        self
    }

    pub fn without_prefetch(mut self) -> Self {
        self.prefetch = false;
        self
    }

    /// 从 JSON 读取，缺省字段取默认值
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
