//! 构建指标收集模块
//!
//! 统计谓词构建、片段求值和关联缓存命中情况

use crate::traversal::TraversalKind;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 全局构建指标
#[derive(Debug)]
pub struct Metrics {
    /// 构建统计
    build_stats: BuildStats,
    /// 关联（join）缓存统计
    join_stats: CacheStats,
    /// 预加载（fetch）缓存统计
    fetch_stats: CacheStats,
    /// 启动时间
    start_time: Instant,
}

/// 构建统计
#[derive(Debug, Default)]
struct BuildStats {
    /// 总构建次数
    builds: AtomicU64,
    /// 失败构建次数
    failed_builds: AtomicU64,
    /// 构建总耗时（微秒）
    total_duration_us: AtomicU64,
    /// 已求值片段数
    fragments_evaluated: AtomicU64,
    /// 返回空（不约束）的片段数
    fragments_skipped: AtomicU64,
    /// 冻结次数
    freezes: AtomicU64,
}

/// 遍历缓存统计
#[derive(Debug, Default)]
struct CacheStats {
    /// 缓存命中
    hits: AtomicU64,
    /// 新建遍历
    created: AtomicU64,
}

impl CacheStats {
    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.created.store(0, Ordering::Relaxed);
    }
}

/// 可导出的指标快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    // 构建指标
    pub builds: u64,
    pub failed_builds: u64,
    pub avg_build_duration_us: f64,
    pub fragments_evaluated: u64,
    pub fragments_skipped: u64,
    pub freezes: u64,

    // 缓存指标
    pub join_cache_hits: u64,
    pub joins_created: u64,
    pub join_cache_hit_rate: f64,
    pub fetch_cache_hits: u64,
    pub fetches_created: u64,

    pub uptime_seconds: u64,
}

/// Prometheus 格式指标
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    pub content: String,
}

impl Metrics {
    /// 创建新的指标收集器
    pub fn new() -> Self {
        Self {
            build_stats: BuildStats::default(),
            join_stats: CacheStats::default(),
            fetch_stats: CacheStats::default(),
            start_time: Instant::now(),
        }
    }

    /// 记录构建开始
    pub fn record_build_start(&self) -> BuildTimer {
        self.build_stats.builds.fetch_add(1, Ordering::Relaxed);
        BuildTimer::new()
    }

    /// 记录构建完成
    pub fn record_build_complete(&self, timer: BuildTimer, success: bool) {
        if !success {
            self.build_stats.failed_builds.fetch_add(1, Ordering::Relaxed);
        }
        self.build_stats
            .total_duration_us
            .fetch_add(timer.elapsed().as_micros() as u64, Ordering::Relaxed);
    }

    /// 记录片段求值结果
    pub fn record_fragment(&self, constrained: bool) {
        self.build_stats
            .fragments_evaluated
            .fetch_add(1, Ordering::Relaxed);
        if !constrained {
            self.build_stats
                .fragments_skipped
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// 记录冻结
    pub fn record_freeze(&self) {
        self.build_stats.freezes.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录缓存命中
    pub fn record_cache_hit(&self, kind: TraversalKind) {
        self.cache_stats(kind).hits.fetch_add(1, Ordering::Relaxed);
    }

    /// 记录新建遍历
    pub fn record_traversal_created(&self, kind: TraversalKind) {
        self.cache_stats(kind).created.fetch_add(1, Ordering::Relaxed);
    }

    fn cache_stats(&self, kind: TraversalKind) -> &CacheStats {
        match kind {
            TraversalKind::Join => &self.join_stats,
            TraversalKind::Fetch => &self.fetch_stats,
        }
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        let builds = self.build_stats.builds.load(Ordering::Relaxed);
        let total_duration_us = self.build_stats.total_duration_us.load(Ordering::Relaxed);
        let join_hits = self.join_stats.hits.load(Ordering::Relaxed);
        let joins_created = self.join_stats.created.load(Ordering::Relaxed);

        let avg_build_duration_us = if builds > 0 {
            (total_duration_us as f64) / (builds as f64)
        } else {
            0.0
        };

        let join_cache_hit_rate = if join_hits + joins_created > 0 {
            (join_hits as f64) / ((join_hits + joins_created) as f64)
        } else {
            0.0
        };

        MetricsSnapshot {
            builds,
            failed_builds: self.build_stats.failed_builds.load(Ordering::Relaxed),
            avg_build_duration_us,
            fragments_evaluated: self.build_stats.fragments_evaluated.load(Ordering::Relaxed),
            fragments_skipped: self.build_stats.fragments_skipped.load(Ordering::Relaxed),
            freezes: self.build_stats.freezes.load(Ordering::Relaxed),
            join_cache_hits: join_hits,
            joins_created,
            join_cache_hit_rate,
            fetch_cache_hits: self.fetch_stats.hits.load(Ordering::Relaxed),
            fetches_created: self.fetch_stats.created.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// 导出为 Prometheus 格式
    pub fn to_prometheus(&self) -> PrometheusMetrics {
        let snapshot = self.snapshot();
        let mut content = String::new();

        let mut counter = |name: &str, help: &str, value: u64| {
            content.push_str(&format!("# HELP predicate_builder_{} {}\n", name, help));
            content.push_str(&format!("# TYPE predicate_builder_{} counter\n", name));
            content.push_str(&format!("predicate_builder_{} {}\n", name, value));
        };

        counter("builds_total", "Total number of predicate builds", snapshot.builds);
        counter("builds_failed_total", "Number of failed builds", snapshot.failed_builds);
        counter(
            "fragments_evaluated_total",
            "Predicate fragments evaluated",
            snapshot.fragments_evaluated,
        );
        counter(
            "fragments_skipped_total",
            "Fragments that produced no constraint",
            snapshot.fragments_skipped,
        );
        counter("freezes_total", "Accumulators frozen to contradiction", snapshot.freezes);
        counter("join_cache_hits_total", "Join cache hits", snapshot.join_cache_hits);
        counter("joins_created_total", "Join traversals created", snapshot.joins_created);
        counter("fetch_cache_hits_total", "Fetch cache hits", snapshot.fetch_cache_hits);
        counter("fetches_created_total", "Fetch traversals created", snapshot.fetches_created);

        content.push_str("# HELP predicate_builder_join_cache_hit_rate Join cache hit rate (0-1)\n");
        content.push_str("# TYPE predicate_builder_join_cache_hit_rate gauge\n");
        content.push_str(&format!(
            "predicate_builder_join_cache_hit_rate {:.4}\n",
            snapshot.join_cache_hit_rate
        ));

        PrometheusMetrics { content }
    }

    /// 重置所有指标
    pub fn reset(&self) {
        self.build_stats.builds.store(0, Ordering::Relaxed);
        self.build_stats.failed_builds.store(0, Ordering::Relaxed);
        self.build_stats.total_duration_us.store(0, Ordering::Relaxed);
        self.build_stats.fragments_evaluated.store(0, Ordering::Relaxed);
        self.build_stats.fragments_skipped.store(0, Ordering::Relaxed);
        self.build_stats.freezes.store(0, Ordering::Relaxed);
        self.join_stats.reset();
        self.fetch_stats.reset();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// 构建计时器
pub struct BuildTimer {
    start: Instant,
}

impl BuildTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// 全局指标实例
static METRICS: once_cell::sync::Lazy<Arc<Metrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(Metrics::new()));

/// 获取全局指标实例
pub fn global_metrics() -> Arc<Metrics> {
    METRICS.clone()
}
