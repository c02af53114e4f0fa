//! 谓词构建器
//!
//! 以链式调用登记过滤条件与预加载请求，最终一次性构建为查询引擎的布尔表达式。
//!
//! ```ignore
//! let predicate = PredicateBuilder::new()
//!     .with_property("owner.name", Some("alice"))
//!     .with_required_property_in("status", Some(["open", "review"]))
//!     .prefetch("owner.[address,roles]")
//!     .build(&mut ctx)?;
//! ```
//!
//! 值为 `None` 的可选条件不施加约束；必需条件缺值时整个查询冻结为恒假。

use crate::error::Result;
use crate::metrics;
use crate::predicate::accumulator::Accumulator;
use crate::predicate::clause::Clause;
use crate::predicate::context::{QueryContext, Scope};
use crate::predicate::operator::Operator;
use crate::predicate::options::BuilderOptions;
use crate::traversal::{DefaultPrefetchEngine, PrefetchEngine, TraversalCache, TraversalKind};
use crate::types::Value;
use std::fmt;
use tracing::debug;

/// 主键属性名
const ID_PROPERTY: &str = "id";
/// 调用方使用的通配符
const WILDCARD_REQUEST: char = '*';
/// 查询引擎 LIKE 通配符
const WILDCARD_LIKE: &str = "%";

/// 谓词构建器
pub struct PredicateBuilder<C: QueryContext> {
    options: BuilderOptions,
    predicates: Accumulator<C>,
    prefetches: Vec<String>,
    prefetch_engine: Box<dyn PrefetchEngine<C>>,
}

impl<C: QueryContext> PredicateBuilder<C> {
    pub fn new() -> Self {
        Self::with_options(BuilderOptions::default())
    }

    pub fn with_options(options: BuilderOptions) -> Self {
        Self::with_prefetch_engine(options, DefaultPrefetchEngine::new())
    }

    /// 使用自定义预加载引擎
    pub fn with_prefetch_engine<E>(options: BuilderOptions, engine: E) -> Self
    where
        E: PrefetchEngine<C> + 'static,
    {
        Self {
            options,
            predicates: Accumulator::new(),
            prefetches: Vec::new(),
            prefetch_engine: Box::new(engine),
        }
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// 是否已因必需条件缺值而冻结
    pub fn is_frozen(&self) -> bool {
        self.predicates.is_frozen()
    }

    /// 合并另一构建器的条件与预加载请求（追加在当前条件之后）
    pub fn and(mut self, other: PredicateBuilder<C>) -> Self {
        self.predicates.merge(other.predicates);
        self.prefetches.extend(other.prefetches);
        self
    }

    /// 查询去重
    pub fn distinct(mut self) -> Self {
        self.predicates.append(Clause::<C>::new(|scope| {
            scope.distinct(true);
            Ok(scope.conjunction())
        }));
        self
    }

    /// 登记预加载请求，如 `owner.[address,roles]`
    pub fn prefetch(mut self, attributes: impl Into<String>) -> Self {
        self.prefetches.push(attributes.into());
        self
    }

    pub fn with_id<V: Into<Value>>(self, id: Option<V>) -> Self {
        self.with_property(ID_PROPERTY, id)
    }

    /// 属性等于给定值
    pub fn with_property<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Self {
        self.add_predicate_if_has_value(name, Operator::Equal, value.map(Into::into));
        self
    }

    /// 属性等于给定值；值缺失（或为空字符串）时查询不再匹配任何记录
    pub fn with_required_property<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Self {
        let value: Option<Value> = value.map(Into::into);
        match value {
            Some(value) if !value.is_blank_text() => {
                self.add_predicate(name, Operator::Equal, Some(value))
            }
            _ => self.disjunct(),
        }
        self
    }

    /// 忽略大小写的相等比较
    pub fn with_property_ignore_case(mut self, name: &str, value: Option<&str>) -> Self {
        let value = value.map(|v| Value::from(v).to_uppercase());
        self.add_predicate_if_has_value(name, Operator::EqualIgnoreCase, value);
        self
    }

    pub fn with_property_not<V: Into<Value>>(mut self, name: &str, value: Option<V>) -> Self {
        self.add_predicate_if_has_value(name, Operator::NotEqual, value.map(Into::into));
        self
    }

    pub fn with_property_not_ignore_case(mut self, name: &str, value: Option<&str>) -> Self {
        let value = value.map(|v| Value::from(v).to_uppercase());
        self.add_predicate_if_has_value(name, Operator::NotEqualIgnoreCase, value);
        self
    }

    /// 属性属于给定集合
    pub fn with_property_in<I, V>(mut self, name: &str, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_predicate_if_has_value(name, Operator::In, values.map(Value::list));
        self
    }

    /// 属性属于给定集合；集合缺失或为空时查询不再匹配任何记录
    pub fn with_required_property_in<I, V>(mut self, name: &str, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match values.map(Value::list) {
            Some(values) if !values.is_empty_list() => {
                self.add_predicate(name, Operator::In, Some(values))
            }
            _ => self.disjunct(),
        }
        self
    }

    pub fn with_property_not_in<I, V>(mut self, name: &str, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.add_predicate_if_has_value(name, Operator::NotIn, values.map(Value::list));
        self
    }

    pub fn with_null_property(mut self, name: &str) -> Self {
        self.add_predicate(name, Operator::IsNull, None);
        self
    }

    pub fn with_not_null_property(mut self, name: &str) -> Self {
        self.add_predicate(name, Operator::IsNotNull, None);
        self
    }

    /// 忽略大小写的模糊匹配，`*` 为通配符
    pub fn with_property_like_ignore_case(mut self, name: &str, pattern: Option<&str>) -> Self {
        let pattern = pattern
            .map(|p| Value::from(p.replace(WILDCARD_REQUEST, WILDCARD_LIKE)).to_uppercase());
        self.add_predicate_if_has_value(name, Operator::LikeIgnoreCase, pattern);
        self
    }

    /// 忽略大小写的前缀匹配；前缀缺失时匹配任意非空值
    pub fn with_property_starting_with(mut self, name: &str, prefix: Option<&str>) -> Self {
        let pattern = match prefix {
            Some(prefix) => format!("{}{}", prefix.to_uppercase(), WILDCARD_LIKE),
            None => WILDCARD_LIKE.to_string(),
        };
        self.add_predicate(name, Operator::LikeIgnoreCase, Some(Value::String(pattern)));
        self
    }

    pub fn with_property_after<V: Into<Value>>(mut self, name: &str, from: Option<V>) -> Self {
        self.add_predicate_if_has_value(name, Operator::GreaterThan, from.map(Into::into));
        self
    }

    pub fn with_property_after_inclusive<V: Into<Value>>(
        mut self,
        name: &str,
        from: Option<V>,
    ) -> Self {
        self.add_predicate_if_has_value(name, Operator::GreaterThanOrEqual, from.map(Into::into));
        self
    }

    pub fn with_property_before<V: Into<Value>>(mut self, name: &str, to: Option<V>) -> Self {
        self.add_predicate_if_has_value(name, Operator::LessThan, to.map(Into::into));
        self
    }

    pub fn with_property_before_inclusive<V: Into<Value>>(
        mut self,
        name: &str,
        to: Option<V>,
    ) -> Self {
        self.add_predicate_if_has_value(name, Operator::LessThanOrEqual, to.map(Into::into));
        self
    }

    /// 属性等于根实体上该属性的最大值
    pub fn with_property_max_value(mut self, name: &str) -> Self {
        self.add_predicate(name, Operator::EqualsGreatest, None);
        self
    }

    /// 登记自定义子句，`None` 忽略
    pub fn with(mut self, clause: impl Into<Option<Clause<C>>>) -> Self {
        if let Some(clause) = clause.into() {
            self.predicates.append(clause);
        }
        self
    }

    /// 值存在时由 `operator` 生成子句并登记
    pub fn with_value<V, F>(self, value: Option<V>, operator: F) -> Self
    where
        F: FnOnce(V) -> Clause<C>,
    {
        match value {
            Some(value) => self.with(operator(value)),
            None => self,
        }
    }

    /// 设置分组列
    pub fn group_by(mut self, names: &[&str]) -> Self {
        let names = owned_names(names);
        self.predicates.append(Clause::<C>::new(move |scope| {
            let paths = names
                .iter()
                .map(|name| scope.path(name))
                .collect::<Result<Vec<_>>>()?;
            scope.group_by(paths);
            Ok(scope.conjunction())
        }));
        self
    }

    /// 设置投影列
    pub fn project(mut self, names: &[&str]) -> Self {
        let names = owned_names(names);
        self.predicates.append(Clause::<C>::new(move |scope| {
            let paths = names
                .iter()
                .map(|name| scope.path(name))
                .collect::<Result<Vec<_>>>()?;
            scope.multiselect(paths);
            Ok(scope.conjunction())
        }));
        self
    }

    /// 构建最终谓词：先处理预加载请求，再归约全部条件
    pub fn build(self, ctx: &mut C) -> Result<C::Expr> {
        self.build_with_joins(ctx).map(|(predicate, _)| predicate)
    }

    /// 同 [`PredicateBuilder::build`]，同时返回构建过程中创建的关联
    pub fn build_with_joins(mut self, ctx: &mut C) -> Result<(C::Expr, TraversalCache<C::Join>)> {
        let metrics = metrics::global_metrics();
        let timer = metrics.record_build_start();

        let mut joins =
            TraversalCache::with_memoization(TraversalKind::Join, self.options.join_cache);
        let result = self.run(ctx, &mut joins);
        metrics.record_build_complete(timer, result.is_ok());

        let predicate = result?;
        debug!(
            fragments = self.predicates.len(),
            frozen = self.predicates.is_frozen(),
            joins = joins.len(),
            "predicate built"
        );
        Ok((predicate, joins))
    }

    fn run(&mut self, ctx: &mut C, joins: &mut TraversalCache<C::Join>) -> Result<C::Expr> {
        if self.options.prefetch {
            for attributes in &self.prefetches {
                self.prefetch_engine.prefetch(attributes, ctx)?;
            }
        } else if !self.prefetches.is_empty() {
            debug!(requests = self.prefetches.len(), "prefetch disabled, requests ignored");
        }

        let mut scope = Scope::new(ctx, joins);
        self.predicates.reduce(&mut scope)
    }

    fn add_predicate_if_has_value(&mut self, name: &str, operator: Operator, value: Option<Value>) {
        if let Some(value) = value {
            self.add_predicate(name, operator, Some(value));
        }
    }

    fn add_predicate(&mut self, name: &str, operator: Operator, value: Option<Value>) {
        assert!(!name.trim().is_empty(), "属性名不能为空");
        let name = name.to_string();
        self.predicates.append(Clause::<C>::new(move |scope| {
            let path = scope.path(&name)?;
            scope.predicate(operator, &path, value.as_ref())
        }));
    }

    fn disjunct(&mut self) {
        self.predicates.replace_and_freeze();
    }
}

impl<C: QueryContext> Default for PredicateBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: QueryContext> fmt::Debug for PredicateBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateBuilder")
            .field("options", &self.options)
            .field("predicates", &self.predicates)
            .field("prefetches", &self.prefetches)
            .finish_non_exhaustive()
    }
}

fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ExpressionFactory;
    use crate::render::{Expr, RenderContext};
    use crate::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    const NO_VALUE: Option<&str> = None;
    const NO_VALUES: Option<Vec<i32>> = None;

    fn builder() -> PredicateBuilder<RenderContext> {
        PredicateBuilder::new()
    }

    fn build(builder: PredicateBuilder<RenderContext>) -> String {
        let mut ctx = RenderContext::new();
        builder.build(&mut ctx).unwrap().to_string()
    }

    fn like(attribute: &'static str, value: &'static str) -> Clause<RenderContext> {
        Clause::<RenderContext>::new(move |scope| {
            let path = scope.path(attribute)?;
            scope.predicate(Operator::LikeIgnoreCase, &path, Some(&Value::from(value)))
        })
    }

    fn equal(attribute: &'static str, value: &'static str) -> Clause<RenderContext> {
        Clause::<RenderContext>::new(move |scope| {
            let path = scope.path(attribute)?;
            scope.predicate(Operator::Equal, &path, Some(&Value::from(value)))
        })
    }

    /// 只记录请求的预加载引擎
    #[derive(Clone, Default)]
    struct RecordingEngine {
        requests: Rc<RefCell<Vec<String>>>,
    }

    impl PrefetchEngine<RenderContext> for RecordingEngine {
        fn prefetch(&mut self, attribute_list: &str, _ctx: &mut RenderContext) -> Result<()> {
            self.requests.borrow_mut().push(attribute_list.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_no_predicates_is_conjunction() {
        assert_eq!(build(builder()), "1=1");
    }

    #[test]
    fn test_with_property() {
        assert_eq!(
            build(builder().with_property("attribute", Some("value"))),
            "attribute equal value"
        );
    }

    #[test]
    fn test_with_property_not() {
        assert_eq!(
            build(builder().with_property_not("attribute", Some("value"))),
            "attribute not equal value"
        );
    }

    #[test]
    fn test_with_property_not_ignore_case() {
        assert_eq!(
            build(builder().with_property_not_ignore_case("attribute", Some("value"))),
            "upper(attribute) not equal VALUE"
        );
        assert_eq!(
            build(builder().with_property_not_ignore_case("attribute", NO_VALUE)),
            "1=1"
        );
    }

    #[test]
    fn test_with_property_in() {
        assert_eq!(
            build(builder().with_property_in("attribute", Some(["v1", "v2"]))),
            "attribute in v1,v2"
        );
        assert_eq!(
            build(builder().with_property_not_in("attribute", Some(["v1", "v2"]))),
            "not attribute in v1,v2"
        );
    }

    #[test]
    fn test_with_multiple_properties() {
        let builder = builder()
            .with_property("attribute", Some("value"))
            .with_property("attribute2", Some("value2"))
            .with_property_in("list", Some(vec![1, 2]));
        assert_eq!(
            build(builder),
            "attribute equal value and attribute2 equal value2 and list in 1,2"
        );
    }

    #[test]
    fn test_absent_values_do_not_constrain() {
        let builder = builder()
            .with_property("name", NO_VALUE)
            .with_property("surname", NO_VALUE)
            .with_property_ignore_case("case", None)
            .with_property_like_ignore_case("name", None)
            .with_property_in("list", NO_VALUES)
            .with_property_after("version", None::<i64>);
        assert_eq!(build(builder), "1=1");
    }

    #[test]
    fn test_with_id() {
        assert_eq!(build(builder().with_id(Some("idValue"))), "id equal idValue");
        assert_eq!(build(builder().with_id(Some(42))), "id equal 42");
    }

    #[test]
    fn test_with_required_property() {
        assert_eq!(
            build(builder().with_required_property("required", Some("value"))),
            "required equal value"
        );
        assert_eq!(
            build(builder().with_required_property_in("required", Some(["value"]))),
            "required in value"
        );
    }

    #[test]
    fn test_required_property_absent_freezes() {
        let builder = builder()
            .with_property("name", Some("ignored"))
            .with_required_property("required", NO_VALUE)
            .with_property_in("profiles", Some([1]));
        assert!(builder.is_frozen());
        assert_eq!(build(builder), "1=0");
    }

    #[test]
    fn test_required_property_empty_string_freezes() {
        let builder = builder()
            .with_property("name", Some("ignored"))
            .with_required_property("required", Some(""))
            .with_property_in("profiles", Some([1]));
        assert_eq!(build(builder), "1=0");
    }

    #[test]
    fn test_required_property_zero_is_present() {
        assert_eq!(
            build(builder().with_required_property("required", Some(0))),
            "required equal 0"
        );
    }

    #[test]
    fn test_required_property_twice_stays_frozen() {
        let builder = builder()
            .with_property("name", Some("ignored"))
            .with_required_property("required", NO_VALUE)
            .with_required_property("required", NO_VALUE)
            .with_property_in("profiles", Some([1]));
        assert_eq!(build(builder), "1=0");
    }

    #[test]
    fn test_required_property_in_absent_or_empty_freezes() {
        let absent = builder()
            .with_property("name", Some("ignored"))
            .with_required_property_in("required", NO_VALUES)
            .with_property_in("profiles", Some([1]));
        assert_eq!(build(absent), "1=0");

        let empty = builder()
            .with_property("name", Some("ignored"))
            .with_required_property_in("required", Some(Vec::<i32>::new()))
            .with_property_in("profiles", Some([1]));
        assert_eq!(build(empty), "1=0");
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(
            build(builder().with_property_ignore_case("case", Some("Value"))),
            "upper(case) equal VALUE"
        );
    }

    #[test]
    fn test_null_checks() {
        assert_eq!(build(builder().with_null_property("null")), "null is null");
        assert_eq!(
            build(builder().with_not_null_property("name")),
            "name is not null"
        );
    }

    #[test]
    fn test_like_ignore_case_rewrites_wildcards() {
        assert_eq!(
            build(builder().with_property_like_ignore_case("name", Some("*n*"))),
            "upper(name) like %N%"
        );
    }

    #[test]
    fn test_starting_with() {
        assert_eq!(
            build(builder().with_property_starting_with("name", Some("n"))),
            "upper(name) like N%"
        );
        assert_eq!(
            build(builder().with_property_starting_with("name", NO_VALUE)),
            "upper(name) like %"
        );
    }

    #[test]
    fn test_ranges() {
        assert_eq!(build(builder().with_property_after("version", Some(1))), "version > 1");
        assert_eq!(
            build(builder().with_property_after_inclusive("version", Some(1))),
            "version >= 1"
        );
        assert_eq!(build(builder().with_property_before("version", Some(1))), "version < 1");
        assert_eq!(
            build(builder().with_property_before_inclusive("version", Some(1))),
            "version <= 1"
        );
    }

    #[test]
    fn test_max_value() {
        assert_eq!(
            build(builder().with_property_max_value("version")),
            "version equal max(version)"
        );
    }

    #[test]
    fn test_with_clause() {
        assert_eq!(
            build(builder().with(like("attribute", "value"))),
            "upper(attribute) like value"
        );
        assert_eq!(build(builder().with(None)), "1=1");
    }

    #[test]
    fn test_with_value_operator() {
        let present = builder().with_value(Some("value"), |v| like("attribute", v));
        assert_eq!(build(present), "upper(attribute) like value");

        let absent = builder().with_value(NO_VALUE, |v| like("attribute", v));
        assert_eq!(build(absent), "1=1");
    }

    #[test]
    fn test_with_composed_clauses() {
        let and = like("attribute", "value").and(equal("other", "alternative"));
        assert_eq!(
            build(builder().with(and)),
            "upper(attribute) like value and other equal alternative"
        );

        let or = like("attribute", "value").or(equal("other", "alternative"));
        assert_eq!(
            build(builder().with(or)),
            "upper(attribute) like value or other equal alternative"
        );

        let with_none = like("attribute", "value").and(None);
        assert_eq!(build(builder().with(with_none)), "upper(attribute) like value");
    }

    #[test]
    fn test_property_with_join() {
        assert_eq!(
            build(builder().with_property("attribute.nested.user.name", Some("name value"))),
            "attribute.nested.user.name equal name value"
        );
    }

    #[test]
    fn test_duplicated_joins_result_in_single_join() {
        let mut ctx = RenderContext::new();
        builder()
            .with_property("attribute.name", Some("name"))
            .with_property("attribute.surname", Some("surname"))
            .with_property("attribute.email", Some("email"))
            .build(&mut ctx)
            .unwrap();
        assert_eq!(ctx.root_joins().len(), 1);
        assert_eq!(ctx.joins().len(), 1);
    }

    #[test]
    fn test_distinct_joins_result_in_multiple_joins() {
        let mut ctx = RenderContext::new();
        let (_, joins) = builder()
            .with_property("attribute.name", Some("name"))
            .with_property("other.name", Some("name"))
            .build_with_joins(&mut ctx)
            .unwrap();
        assert_eq!(ctx.root_joins().len(), 2);
        assert_eq!(joins.paths().collect::<Vec<_>>(), vec!["attribute", "other"]);
    }

    #[test]
    fn test_disabled_join_cache_creates_join_per_reference() {
        let mut ctx = RenderContext::new();
        let options = BuilderOptions::default().without_join_cache();
        let (_, joins) = PredicateBuilder::with_options(options)
            .with_property("attribute.name", Some("name"))
            .with_property("attribute.surname", Some("surname"))
            .with_property("attribute.email", Some("email"))
            .build_with_joins(&mut ctx)
            .unwrap();
        assert_eq!(ctx.root_joins().len(), 3);
        assert_eq!(joins.len(), 3);
        assert_eq!(joins.lookup("attribute"), None);
    }

    #[test]
    fn test_and_merges_builders() {
        let other = builder()
            .with_property("other.name", Some("name"))
            .with_property("other.surname", Some("surname"));
        let merged = builder()
            .with_property("attribute.name", Some("name"))
            .and(other);

        let mut ctx = RenderContext::new();
        let predicate = merged.build(&mut ctx).unwrap();
        assert_eq!(
            predicate.to_string(),
            "attribute.name equal name and other.name equal name and other.surname equal surname"
        );
        assert_eq!(ctx.root_joins().len(), 2);
    }

    #[test]
    fn test_and_with_frozen_source() {
        let frozen = builder().with_required_property("required", NO_VALUE);
        let merged = builder().with_property("name", Some("kept")).and(frozen);
        assert!(!merged.is_frozen());
        assert_eq!(build(merged), "name equal kept and 1=0");
    }

    #[test]
    fn test_join_on_restriction() {
        let clause = Clause::<RenderContext>::new(|scope| {
            let path = scope.path_on("attribute.name", |ctx: &mut RenderContext, join| {
                let kind = ctx.attribute(Some(join), "kind")?;
                ctx.predicate(Operator::Equal, &kind, Some(&Value::from("main")))
            })?;
            scope.predicate(Operator::Equal, &path, Some(&Value::from("value")))
        });

        let mut ctx = RenderContext::new();
        let predicate = builder().with(clause).build(&mut ctx).unwrap();
        assert_eq!(
            predicate.to_string(),
            "attribute[on attribute.kind equal main].name equal value"
        );
        assert_eq!(ctx.restrictions().len(), 1);
    }

    #[test]
    fn test_join_on_restriction_applies_to_later_paths() {
        let clause = Clause::<RenderContext>::new(|scope| {
            let path = scope.path_on("attribute.name", |ctx: &mut RenderContext, join| {
                let kind = ctx.attribute(Some(join), "kind")?;
                ctx.predicate(Operator::Equal, &kind, Some(&Value::from("main")))
            })?;
            scope.predicate(Operator::Equal, &path, Some(&Value::from("v")))
        });

        let mut ctx = RenderContext::new();
        let (predicate, joins) = builder()
            .with(clause)
            .with_property("attribute.nested.x", Some("w"))
            .build_with_joins(&mut ctx)
            .unwrap();

        assert_eq!(
            predicate.to_string(),
            "attribute[on attribute.kind equal main].name equal v \
             and attribute[on attribute.kind equal main].nested.x equal w"
        );
        assert_eq!(joins.paths().collect::<Vec<_>>(), vec!["attribute", "attribute.nested"]);
        assert_eq!(ctx.restrictions().len(), 1);
    }

    #[test]
    fn test_join_on_root_property_ignores_restriction() {
        let clause = Clause::<RenderContext>::new(|scope| {
            let path = scope.path_on("name", |ctx: &mut RenderContext, _join| {
                Ok(ctx.disjunction())
            })?;
            scope.predicate(Operator::Equal, &path, Some(&Value::from("value")))
        });

        let mut ctx = RenderContext::new();
        let predicate = builder().with(clause).build(&mut ctx).unwrap();
        assert_eq!(predicate.to_string(), "name equal value");
        assert!(ctx.restrictions().is_empty());
    }

    #[test]
    fn test_distinct_group_by_project() {
        let mut ctx = RenderContext::new();
        let predicate = builder()
            .distinct()
            .group_by(&["category", "owner.name"])
            .project(&["category"])
            .build(&mut ctx)
            .unwrap();

        assert_eq!(predicate.to_string(), "1=1 and 1=1 and 1=1");
        assert!(ctx.is_distinct());
        assert_eq!(ctx.grouping(), &["category".to_string(), "owner.name".to_string()]);
        assert_eq!(ctx.selection(), &["category".to_string()]);
    }

    #[test]
    fn test_prefetch_uses_default_engine() {
        let mut ctx = RenderContext::new();
        builder()
            .prefetch("attribute.[nested.deep,other.deep]")
            .prefetch("attribute.nested")
            .build(&mut ctx)
            .unwrap();
        assert_eq!(
            ctx.render_fetches(),
            "fetch attribute(fetch nested(fetch deep),fetch other(fetch deep))"
        );
    }

    #[test]
    fn test_prefetch_requests_reach_custom_engine() {
        let engine = RecordingEngine::default();
        let requests = Rc::clone(&engine.requests);
        let other = builder().prefetch("other");

        let mut ctx = RenderContext::new();
        PredicateBuilder::with_prefetch_engine(BuilderOptions::default(), engine)
            .prefetch("attribute")
            .and(other)
            .build(&mut ctx)
            .unwrap();

        assert_eq!(*requests.borrow(), vec!["attribute".to_string(), "other".to_string()]);
        assert!(ctx.fetches().is_empty());
    }

    #[test]
    fn test_prefetch_disabled() {
        let engine = RecordingEngine::default();
        let requests = Rc::clone(&engine.requests);

        let mut ctx = RenderContext::new();
        PredicateBuilder::with_prefetch_engine(BuilderOptions::default().without_prefetch(), engine)
            .prefetch("attribute")
            .build(&mut ctx)
            .unwrap();
        assert!(requests.borrow().is_empty());
    }

    struct FailingEngine;

    impl PrefetchEngine<RenderContext> for FailingEngine {
        fn prefetch(&mut self, attribute_list: &str, _ctx: &mut RenderContext) -> Result<()> {
            Err(Error::Backend(format!("无法预加载 {}", attribute_list)))
        }
    }

    #[test]
    fn test_prefetch_error_aborts_build() {
        let mut ctx = RenderContext::new();
        let options = BuilderOptions::default();
        let result = PredicateBuilder::with_prefetch_engine(options, FailingEngine)
            .prefetch("attribute")
            .with_property("owner.name", Some("x"))
            .build(&mut ctx);
        assert!(matches!(result, Err(Error::Backend(_))));
        assert!(ctx.joins().is_empty());
    }

    #[test]
    fn test_count_query_skips_prefetch() {
        let mut ctx = RenderContext::new().count();
        let predicate = builder()
            .prefetch("attribute")
            .with_property("name", Some("x"))
            .build(&mut ctx)
            .unwrap();
        assert_eq!(
            predicate,
            Expr::Compare {
                operator: Operator::Equal,
                path: "name".to_string(),
                value: Some(Value::from("x")),
            }
        );
        assert!(ctx.fetches().is_empty());
    }

    #[test]
    fn test_unknown_attribute_propagates() {
        let mut ctx = RenderContext::new().reject("ghost");
        let result = builder()
            .with_property("owner.ghost", Some("x"))
            .build(&mut ctx);
        assert!(matches!(result, Err(Error::UnknownAttribute(name)) if name == "ghost"));
    }

    #[test]
    #[should_panic]
    fn test_empty_property_name_panics() {
        let _ = builder().with_null_property("");
    }
}
