//! 关联与预加载遍历
//!
//! 提供按路径记忆化的遍历缓存，以及基于属性列表的预加载引擎

mod cache;
mod prefetch;

pub use cache::{NodeId, TraversalCache, TraversalKind, TraversalNode};
pub use prefetch::{DefaultPrefetchEngine, PrefetchEngine};
