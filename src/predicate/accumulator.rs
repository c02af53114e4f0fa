//! 谓词累加器
//!
//! 按插入顺序保存谓词片段，构建时依次求值并以 AND 归约。
//! 冻结是单向转换：之前的片段全部丢弃，之后的追加全部忽略，
//! 归约结果恒为恒假表达式。

use crate::error::Result;
use crate::metrics;
use crate::predicate::clause::Clause;
use crate::predicate::context::{QueryContext, Scope};
use std::fmt;
use tracing::debug;

enum State<C: QueryContext> {
    /// 可继续追加
    Open(Vec<Clause<C>>),
    /// 已冻结，等价于唯一的恒假片段
    Frozen,
}

/// 谓词累加器
pub struct Accumulator<C: QueryContext> {
    state: State<C>,
}

impl<C: QueryContext> Accumulator<C> {
    pub fn new() -> Self {
        Self {
            state: State::Open(Vec::new()),
        }
    }

    /// 追加片段，已冻结时忽略
    pub fn append(&mut self, fragment: Clause<C>) {
        if let State::Open(fragments) = &mut self.state {
            fragments.push(fragment);
        }
    }

    /// 丢弃全部片段并冻结为恒假，返回本次调用是否发生了转换
    pub fn replace_and_freeze(&mut self) -> bool {
        match &self.state {
            State::Frozen => false,
            State::Open(fragments) => {
                debug!(discarded = fragments.len(), "predicate accumulator frozen");
                metrics::global_metrics().record_freeze();
                self.state = State::Frozen;
                true
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, State::Frozen)
    }

    /// 片段数量，冻结后恒为 1
    pub fn len(&self) -> usize {
        match &self.state {
            State::Open(fragments) => fragments.len(),
            State::Frozen => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 追加另一累加器的全部片段（保持顺序）。
    ///
    /// 已冻结的来源贡献一个恒假片段；本累加器的冻结状态不受来源影响。
    pub fn merge(&mut self, other: Accumulator<C>) {
        for fragment in other.into_fragments() {
            self.append(fragment);
        }
    }

    /// 取出全部片段
    pub fn into_fragments(self) -> Vec<Clause<C>> {
        match self.state {
            State::Open(fragments) => fragments,
            State::Frozen => vec![Clause::disjunction()],
        }
    }

    /// 依次求值并以 AND 归约；跳过返回 `None` 的片段，全部跳过时返回恒真
    pub fn reduce(&self, scope: &mut Scope<'_, C>) -> Result<C::Expr> {
        let fragments = match &self.state {
            State::Frozen => return Ok(scope.disjunction()),
            State::Open(fragments) => fragments,
        };

        let metrics = metrics::global_metrics();
        let mut reduced: Option<C::Expr> = None;
        for fragment in fragments {
            let predicate = fragment.to_predicate(scope)?;
            metrics.record_fragment(predicate.is_some());

            if let Some(predicate) = predicate {
                reduced = Some(match reduced {
                    Some(acc) => scope.and(acc, predicate),
                    None => predicate,
                });
            }
        }

        Ok(match reduced {
            Some(predicate) => predicate,
            None => scope.conjunction(),
        })
    }
}

impl<C: QueryContext> Default for Accumulator<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: QueryContext> fmt::Debug for Accumulator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("frozen", &self.is_frozen())
            .field("fragments", &self.len())
            .finish()
    }
}
