//! 谓词构建模块
//!
//! 包含：
//! - 查询引擎接口（表达式工厂、查询上下文、求值作用域）
//! - 子句组合（空值吸收的 AND/OR）
//! - 谓词累加器（可冻结为恒假）
//! - 面向调用方的链式构建器

mod accumulator;
mod builder;
mod clause;
mod context;
mod operator;
mod options;

pub use accumulator::Accumulator;
pub use builder::PredicateBuilder;
pub use clause::{compose, Clause, Connective};
pub use context::{ExpressionFactory, QueryContext, Restriction, Scope};
pub use operator::Operator;
pub use options::BuilderOptions;
