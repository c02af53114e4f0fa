//! 属性路径模块
//!
//! 解析 `a.b.[c,d.[e,f]]` 形式的属性列表，生成路径树

mod ast;
mod parser;

pub use ast::{AttributeList, AttributePath, Segment};
pub use parser::{parse, AttributeParser};
