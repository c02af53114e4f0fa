//! 子句组合
//!
//! 子句是延迟求值的谓词片段：求值结果为 `None` 表示"不施加约束"。
//! 组合时 `None` 被吸收：两侧都为 `None` 结果仍为 `None`，
//! 只有一侧为 `None` 时原样返回另一侧，AND 与 OR 规则相同。

use crate::error::Result;
use crate::predicate::context::{ExpressionFactory, QueryContext, Scope};
use std::fmt;
use std::rc::Rc;

type ClauseFn<C> =
    dyn Fn(&mut Scope<'_, C>) -> Result<Option<<C as ExpressionFactory>::Expr>>;

/// 逻辑连接词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// 谓词子句
pub struct Clause<C: QueryContext> {
    inner: Rc<ClauseFn<C>>,
}

impl<C: QueryContext> Clause<C> {
    /// 总是产生表达式的子句
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<C::Expr> + 'static,
    {
        Self::optional(move |scope| f(scope).map(Some))
    }

    /// 可能不产生表达式的子句
    pub fn optional<F>(f: F) -> Self
    where
        F: Fn(&mut Scope<'_, C>) -> Result<Option<C::Expr>> + 'static,
    {
        Self { inner: Rc::new(f) }
    }

    /// 恒真子句
    pub fn conjunction() -> Self {
        Self::new(|scope| Ok(scope.conjunction()))
    }

    /// 恒假子句
    pub fn disjunction() -> Self {
        Self::new(|scope| Ok(scope.disjunction()))
    }

    /// 求值
    pub fn to_predicate(&self, scope: &mut Scope<'_, C>) -> Result<Option<C::Expr>> {
        (self.inner)(scope)
    }

    /// 与另一子句做 AND，`None` 视为不约束
    pub fn and(self, other: impl Into<Option<Clause<C>>>) -> Clause<C> {
        compose(Some(self), other.into(), Connective::And)
    }

    /// 与另一子句做 OR，`None` 视为不约束
    pub fn or(self, other: impl Into<Option<Clause<C>>>) -> Clause<C> {
        compose(Some(self), other.into(), Connective::Or)
    }
}

impl<C: QueryContext> Clone for Clause<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C: QueryContext> fmt::Debug for Clause<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause").finish_non_exhaustive()
    }
}

/// 组合两个可缺省的子句
pub fn compose<C: QueryContext>(
    lhs: Option<Clause<C>>,
    rhs: Option<Clause<C>>,
    connective: Connective,
) -> Clause<C> {
    Clause::<C>::optional(move |scope| {
        let lhs = evaluate(lhs.as_ref(), scope)?;
        let rhs = evaluate(rhs.as_ref(), scope)?;
        Ok(match (lhs, rhs) {
            (None, rhs) => rhs,
            (lhs, None) => lhs,
            (Some(lhs), Some(rhs)) => Some(match connective {
                Connective::And => scope.and(lhs, rhs),
                Connective::Or => scope.or(lhs, rhs),
            }),
        })
    })
}

fn evaluate<C: QueryContext>(
    clause: Option<&Clause<C>>,
    scope: &mut Scope<'_, C>,
) -> Result<Option<C::Expr>> {
    match clause {
        Some(clause) => clause.to_predicate(scope),
        None => Ok(None),
    }
}
