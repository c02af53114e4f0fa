//! 预加载引擎
//!
//! 预加载请求是属性列表字符串（见 [`crate::path`]），构建时先于谓词归约处理：
//! 解析后逐条展开为属性链，经由预加载缓存在根上创建 fetch 遍历。

use crate::error::Result;
use crate::path::AttributeList;
use crate::predicate::QueryContext;
use crate::traversal::cache::{TraversalCache, TraversalKind};
use std::fmt;
use tracing::debug;

/// 预加载引擎
pub trait PrefetchEngine<C: QueryContext> {
    /// 处理一条属性列表形式的预加载请求
    fn prefetch(&mut self, attribute_list: &str, ctx: &mut C) -> Result<()>;
}

/// 默认预加载引擎
///
/// 自带一个始终记忆化的预加载缓存，同一路径在多次请求间只创建一次。
pub struct DefaultPrefetchEngine<C: QueryContext> {
    fetches: TraversalCache<C::Fetch>,
}

impl<C: QueryContext> DefaultPrefetchEngine<C> {
    pub fn new() -> Self {
        Self {
            fetches: TraversalCache::new(TraversalKind::Fetch),
        }
    }

    /// 已创建的预加载
    pub fn fetches(&self) -> &TraversalCache<C::Fetch> {
        &self.fetches
    }
}

impl<C: QueryContext> PrefetchEngine<C> for DefaultPrefetchEngine<C> {
    fn prefetch(&mut self, attribute_list: &str, ctx: &mut C) -> Result<()> {
        if attribute_list.trim().is_empty() {
            return Ok(());
        }
        if ctx.is_count_query() {
            debug!(attributes = attribute_list, "count query, prefetch skipped");
            return Ok(());
        }

        let list = AttributeList::parse(attribute_list);
        for chain in list.leaf_paths() {
            self.fetches
                .resolve(chain, |parent, attribute| ctx.fetch(parent, attribute))?;
        }
        Ok(())
    }
}

impl<C: QueryContext> Default for DefaultPrefetchEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: QueryContext> fmt::Debug for DefaultPrefetchEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultPrefetchEngine")
            .field("fetches", &self.fetches)
            .finish()
    }
}
