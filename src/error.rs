//! 错误类型定义

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("属性不存在: {0}")]
    UnknownAttribute(String),

    #[error("无效的关联遍历: {0}")]
    InvalidTraversal(String),

    #[error("不支持的操作符: {0}")]
    UnsupportedOperator(String),

    #[error("查询引擎错误: {0}")]
    Backend(String),

    #[error("配置错误: {0}")]
    ConfigError(#[from] serde_json::Error),
}
