//! predicate-builder - 关联路径感知的查询谓词构建器
//!
//! 与具体查询引擎解耦的谓词构建核心，支持：
//! - 属性列表路径语法（`a.b.[c,d.[e,f]]`）解析
//! - 按路径去重的关联（join）与预加载（fetch）缓存
//! - 可冻结为恒假的谓词累加器
//! - 空值吸收的 AND/OR 子句组合

pub mod error;
pub mod metrics;
pub mod path;
pub mod predicate;
pub mod render;
pub mod traversal;
pub mod types;

// 重导出常用类型
pub use error::{Error, Result};
pub use path::{AttributeList, AttributePath, Segment};
pub use predicate::{
    BuilderOptions, Clause, Connective, ExpressionFactory, Operator, PredicateBuilder,
    QueryContext, Scope,
};
pub use traversal::{
    DefaultPrefetchEngine, NodeId, PrefetchEngine, TraversalCache, TraversalKind, TraversalNode,
};
pub use types::Value;

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
