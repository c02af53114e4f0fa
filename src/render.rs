//! 文本渲染查询上下文
//!
//! 不连接任何数据库的 [`QueryContext`] 实现：把表达式构造成可打印的树，
//! 并记录构建过程中创建的关联、预加载、分组与投影，便于调试和测试断言。

use crate::error::{Error, Result};
use crate::predicate::{ExpressionFactory, Operator, QueryContext};
use crate::types::Value;
use std::fmt;
use tracing::trace;

/// 渲染后的布尔表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 恒真 `1=1`
    True,
    /// 恒假 `1=0`
    False,
    /// 叶子比较
    Compare {
        operator: Operator,
        path: String,
        value: Option<Value>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Or(..) => write!(f, "({})", self),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::True => write!(f, "1=1"),
            Expr::False => write!(f, "1=0"),
            Expr::Compare {
                operator: Operator::NotIn,
                path,
                value,
            } => {
                write!(f, "not {} in", path)?;
                if let Some(value) = value {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Expr::Compare {
                operator: Operator::EqualsGreatest,
                path,
                ..
            } => write!(f, "{} equal max({})", path, path),
            Expr::Compare {
                operator,
                path,
                value,
            } => {
                if operator.is_ignore_case() {
                    write!(f, "upper({}) {}", path, operator)?;
                } else {
                    write!(f, "{} {}", path, operator)?;
                }
                if let Some(value) = value {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Expr::And(lhs, rhs) => {
                lhs.fmt_operand(f)?;
                write!(f, " and ")?;
                rhs.fmt_operand(f)
            }
            Expr::Or(lhs, rhs) => write!(f, "{} or {}", lhs, rhs),
        }
    }
}

/// 关联句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRef {
    /// 关联记录下标
    pub id: usize,
    /// 渲染用路径，带 ON 条件时形如 `owner[on owner.active equal true]`
    pub path: String,
}

/// 预加载句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRef {
    pub id: usize,
}

/// 关联或预加载记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Traversal {
    pub id: usize,
    pub parent: Option<usize>,
    pub attribute: String,
}

/// 渲染上下文
#[derive(Debug, Default)]
pub struct RenderContext {
    joins: Vec<Traversal>,
    fetches: Vec<Traversal>,
    /// (关联下标, ON 条件)
    restrictions: Vec<(usize, String)>,
    distinct: bool,
    grouping: Vec<String>,
    selection: Vec<String>,
    count_query: bool,
    /// 视为不存在的属性名
    rejected: Vec<String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记为计数查询，预加载将被跳过
    pub fn count(mut self) -> Self {
        self.count_query = true;
        self
    }

    /// 访问该属性名时报告属性不存在
    pub fn reject(mut self, attribute: impl Into<String>) -> Self {
        self.rejected.push(attribute.into());
        self
    }

    pub fn joins(&self) -> &[Traversal] {
        &self.joins
    }

    /// 直接挂在根上的关联
    pub fn root_joins(&self) -> Vec<&Traversal> {
        self.joins.iter().filter(|j| j.parent.is_none()).collect()
    }

    pub fn fetches(&self) -> &[Traversal] {
        &self.fetches
    }

    pub fn restrictions(&self) -> &[(usize, String)] {
        &self.restrictions
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn grouping(&self) -> &[String] {
        &self.grouping
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// 预加载树，如 `fetch a(fetch b,fetch c)`，根上的多个预加载以 `, ` 分隔
    pub fn render_fetches(&self) -> String {
        self.fetches
            .iter()
            .filter(|f| f.parent.is_none())
            .map(|f| self.render_fetch(f))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn render_fetch(&self, fetch: &Traversal) -> String {
        let children: Vec<String> = self
            .fetches
            .iter()
            .filter(|f| f.parent == Some(fetch.id))
            .map(|f| self.render_fetch(f))
            .collect();

        if children.is_empty() {
            format!("fetch {}", fetch.attribute)
        } else {
            format!("fetch {}({})", fetch.attribute, children.join(","))
        }
    }

    fn check(&self, attribute: &str) -> Result<()> {
        if self.rejected.iter().any(|r| r == attribute) {
            return Err(Error::UnknownAttribute(attribute.to_string()));
        }
        Ok(())
    }
}

impl ExpressionFactory for RenderContext {
    type Expr = Expr;
    type Path = String;

    fn predicate(
        &mut self,
        operator: Operator,
        path: &String,
        value: Option<&Value>,
    ) -> Result<Expr> {
        if operator.takes_value() && value.is_none() {
            return Err(Error::UnsupportedOperator(format!("{} {}", path, operator)));
        }
        Ok(Expr::Compare {
            operator,
            path: path.clone(),
            value: value.cloned(),
        })
    }

    fn and(&mut self, lhs: Expr, rhs: Expr) -> Expr {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    fn or(&mut self, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    fn conjunction(&mut self) -> Expr {
        Expr::True
    }

    fn disjunction(&mut self) -> Expr {
        Expr::False
    }
}

impl QueryContext for RenderContext {
    type Join = JoinRef;
    type Fetch = FetchRef;

    fn join(&mut self, parent: Option<&JoinRef>, attribute: &str) -> Result<JoinRef> {
        self.check(attribute)?;
        let id = self.joins.len();
        self.joins.push(Traversal {
            id,
            parent: parent.map(|p| p.id),
            attribute: attribute.to_string(),
        });
        let path = match parent {
            Some(parent) => format!("{}.{}", parent.path, attribute),
            None => attribute.to_string(),
        };
        trace!(id, path = %path, "render join");
        Ok(JoinRef { id, path })
    }

    fn attribute(&mut self, from: Option<&JoinRef>, name: &str) -> Result<String> {
        self.check(name)?;
        Ok(match from {
            Some(join) => format!("{}.{}", join.path, name),
            None => name.to_string(),
        })
    }

    fn restrict(&mut self, join: &JoinRef, restriction: Expr) -> Result<JoinRef> {
        let on = restriction.to_string();
        self.restrictions.push((join.id, on.clone()));
        Ok(JoinRef {
            id: join.id,
            path: format!("{}[on {}]", join.path, on),
        })
    }

    fn fetch(&mut self, parent: Option<&FetchRef>, attribute: &str) -> Result<FetchRef> {
        self.check(attribute)?;
        let id = self.fetches.len();
        self.fetches.push(Traversal {
            id,
            parent: parent.map(|p| p.id),
            attribute: attribute.to_string(),
        });
        Ok(FetchRef { id })
    }

    fn distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    fn group_by(&mut self, paths: Vec<String>) {
        self.grouping = paths;
    }

    fn multiselect(&mut self, paths: Vec<String>) {
        self.selection = paths;
    }

    fn is_count_query(&self) -> bool {
        self.count_query
    }
}
