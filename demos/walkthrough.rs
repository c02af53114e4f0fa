//! predicate-builder 演示脚本
//!
//! 使用文本渲染上下文构建几个典型谓词并打印结果。
//! `RUST_LOG=predicate_builder=debug` 可查看关联创建与冻结日志。

use predicate_builder::metrics::global_metrics;
use predicate_builder::render::RenderContext;
use predicate_builder::{
    AttributeList, BuilderOptions, Clause, ExpressionFactory, Operator, PredicateBuilder,
    QueryContext, Value,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    println!("predicate-builder 演示");
    println!("======================\n");

    // 1. 属性列表解析
    let list = AttributeList::parse("owner.[address.city,roles],tags");
    println!("1. 属性列表: {}", list);
    for leaf in list.leaf_paths() {
        println!("   - {}", leaf.join("."));
    }
    println!();

    // 2. 普通过滤条件，共享关联
    let mut ctx = RenderContext::new();
    let (predicate, joins) = PredicateBuilder::new()
        .with_property("owner.name", Some("alice"))
        .with_property_like_ignore_case("owner.email", Some("*@example.com"))
        .with_property_in("status", Some(["open", "review"]))
        .with_property_after("created", Some(20240101))
        .prefetch("owner.[address,roles]")
        .distinct()
        .build_with_joins(&mut ctx)?;
    println!("2. 谓词: {}", predicate);
    println!("   关联: {:?}", joins.paths().collect::<Vec<_>>());
    println!("   预加载: {}", ctx.render_fetches());
    println!("   去重: {}\n", ctx.is_distinct());

    // 3. 必需条件缺值
    let mut ctx = RenderContext::new();
    let predicate = PredicateBuilder::new()
        .with_property("name", Some("ignored"))
        .with_required_property("tenant", None::<&str>)
        .with_property_in("profiles", Some([1]))
        .build(&mut ctx)?;
    println!("3. 必需条件缺失: {}\n", predicate);

    // 4. 自定义子句与 ON 条件
    let primary = Clause::<RenderContext>::new(|scope| {
        let city = scope.path_on("owner.address.city", |ctx: &mut RenderContext, join| {
            let kind = ctx.attribute(Some(join), "kind")?;
            ctx.predicate(Operator::Equal, &kind, Some(&Value::from("primary")))
        })?;
        scope.predicate(Operator::EqualIgnoreCase, &city, Some(&Value::from("BERLIN")))
    });
    let fallback = Clause::<RenderContext>::new(|scope| {
        let country = scope.path("owner.address.country")?;
        scope.predicate(Operator::Equal, &country, Some(&Value::from("DE")))
    });

    let mut ctx = RenderContext::new();
    let predicate = PredicateBuilder::new()
        .with(primary.or(fallback))
        .build(&mut ctx)?;
    println!("4. 自定义子句: {}", predicate);
    println!("   ON 条件: {:?}\n", ctx.restrictions());

    // 5. 关闭关联缓存
    let options = BuilderOptions::from_json(r#"{"join_cache": false}"#)?;
    let mut ctx = RenderContext::new();
    let (_, joins) = PredicateBuilder::with_options(options)
        .with_property("owner.name", Some("alice"))
        .with_property("owner.email", Some("alice@example.com"))
        .build_with_joins(&mut ctx)?;
    println!("5. 关闭关联缓存后创建的关联数: {}\n", joins.len());

    println!("指标:");
    println!("{}", serde_json::to_string_pretty(&global_metrics().snapshot())?);

    Ok(())
}
