//! 查询引擎接口
//!
//! 构建器不直接依赖任何查询引擎，只通过以下两个 trait 与之交互：
//! - [`ExpressionFactory`]：构造叶子布尔表达式及 AND/OR、恒真/恒假
//! - [`QueryContext`]：根实体上下文，负责创建关联、预加载、读取属性等
//!
//! [`Scope`] 把上下文与构建器的关联缓存绑在一起，供片段在求值时解析属性路径。

use crate::error::{Error, Result};
use crate::predicate::operator::Operator;
use crate::traversal::TraversalCache;
use crate::types::Value;
use smallvec::SmallVec;
use std::ops::{Deref, DerefMut};

/// 属性路径分隔符
const PROPERTY_DELIMITER: char = '.';

/// 布尔表达式工厂
pub trait ExpressionFactory {
    /// 引擎的布尔表达式
    type Expr;
    /// 引擎的属性句柄
    type Path;

    /// 由 (操作符, 属性, 字面量) 构造叶子表达式；不带值的操作符收到 `None`
    fn predicate(
        &mut self,
        operator: Operator,
        path: &Self::Path,
        value: Option<&Value>,
    ) -> Result<Self::Expr>;

    fn and(&mut self, lhs: Self::Expr, rhs: Self::Expr) -> Self::Expr;

    fn or(&mut self, lhs: Self::Expr, rhs: Self::Expr) -> Self::Expr;

    /// 恒真表达式（AND 的单位元）
    fn conjunction(&mut self) -> Self::Expr;

    /// 恒假表达式
    fn disjunction(&mut self) -> Self::Expr;
}

/// 根实体查询上下文
///
/// 片段以闭包形式延迟求值，因此上下文类型需为 `'static`；
/// 需要借用连接等资源的引擎可用 `Rc`/`Arc` 持有。
pub trait QueryContext: ExpressionFactory + 'static {
    /// 关联句柄
    type Join;
    /// 预加载句柄
    type Fetch;

    /// 在根（`parent = None`）或已有关联上创建左外关联
    fn join(&mut self, parent: Option<&Self::Join>, attribute: &str) -> Result<Self::Join>;

    /// 读取根或关联上的属性
    fn attribute(&mut self, from: Option<&Self::Join>, name: &str) -> Result<Self::Path>;

    /// 为关联附加 ON 条件，返回带条件的关联
    fn restrict(&mut self, join: &Self::Join, restriction: Self::Expr) -> Result<Self::Join>;

    /// 在根或已有预加载上创建预加载
    fn fetch(&mut self, parent: Option<&Self::Fetch>, attribute: &str) -> Result<Self::Fetch>;

    /// 标记查询去重
    fn distinct(&mut self, distinct: bool);

    /// 设置分组列
    fn group_by(&mut self, paths: Vec<Self::Path>);

    /// 设置投影列
    fn multiselect(&mut self, paths: Vec<Self::Path>);

    /// 标量计数查询不做预加载
    fn is_count_query(&self) -> bool {
        false
    }
}

/// 关联 ON 条件构造器
pub type Restriction<'r, C> =
    dyn Fn(&mut C, &<C as QueryContext>::Join) -> Result<<C as ExpressionFactory>::Expr> + 'r;

/// 片段求值作用域
///
/// 解引用为底层 [`QueryContext`]，可直接调用表达式工厂方法。
pub struct Scope<'a, C: QueryContext> {
    ctx: &'a mut C,
    joins: &'a mut TraversalCache<C::Join>,
}

impl<'a, C: QueryContext> Scope<'a, C> {
    pub fn new(ctx: &'a mut C, joins: &'a mut TraversalCache<C::Join>) -> Self {
        Self { ctx, joins }
    }

    /// 解析点分属性路径，如 `owner.address.city`
    ///
    /// 除最后一段外均为关联，经由关联缓存去重；最后一段在最末关联（或根）上读取。
    pub fn path(&mut self, name: &str) -> Result<C::Path> {
        self.resolve(name, None)
    }

    /// 同 [`Scope::path`]，并为最末关联附加 ON 条件。
    ///
    /// 路径没有关联（直接位于根上）时忽略 `restriction`。
    pub fn path_on<R>(&mut self, name: &str, restriction: R) -> Result<C::Path>
    where
        R: Fn(&mut C, &C::Join) -> Result<C::Expr>,
    {
        let restriction: &Restriction<'_, C> = &restriction;
        self.resolve(name, Some(restriction))
    }

    /// 当前作用域内的关联缓存
    pub fn joins(&self) -> &TraversalCache<C::Join> {
        &*self.joins
    }

    fn resolve(&mut self, name: &str, restriction: Option<&Restriction<'_, C>>) -> Result<C::Path> {
        let mut chain: SmallVec<[&str; 4]> = name.split(PROPERTY_DELIMITER).collect();
        if chain.iter().any(|segment| segment.is_empty()) {
            return Err(Error::InvalidTraversal(name.to_string()));
        }
        let leaf = chain.pop().unwrap_or_default();

        let ctx = &mut *self.ctx;
        let node = self
            .joins
            .resolve(chain.iter().copied(), |parent, attribute| {
                ctx.join(parent, attribute)
            })?;

        // ON 条件写回节点，同一构建内后续经过该关联的路径都带上它
        if let (Some(id), Some(restriction)) = (node, restriction) {
            if let Some(join) = self.joins.handle(id) {
                let on = restriction(&mut *self.ctx, join)?;
                let restricted = self.ctx.restrict(join, on)?;
                self.joins.replace_handle(id, restricted);
            }
        }

        let join = node.and_then(|id| self.joins.handle(id));
        self.ctx.attribute(join, leaf)
    }
}

impl<C: QueryContext> Deref for Scope<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.ctx
    }
}

impl<C: QueryContext> DerefMut for Scope<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.ctx
    }
}
