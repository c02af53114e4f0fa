//! 遍历缓存
//!
//! 关联（join）与预加载（fetch）节点保存在构建器独占的 arena 中，
//! 以从根开始的完整点分路径作为键做记忆化，返回稳定的 `NodeId`

use crate::error::Result;
use crate::metrics;
use indexmap::IndexMap;
use std::fmt;
use tracing::{debug, trace};

/// 路径键分隔符
const PATH_SEPARATOR: char = '.';

/// 遍历节点 ID（arena 下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// 遍历类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalKind {
    /// 关联，用于访问嵌套属性
    Join,
    /// 预加载，随主查询一并加载关联数据
    Fetch,
}

impl fmt::Display for TraversalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalKind::Join => write!(f, "join"),
            TraversalKind::Fetch => write!(f, "fetch"),
        }
    }
}

/// 遍历节点
#[derive(Debug, Clone)]
pub struct TraversalNode<H> {
    /// 带前导分隔符的路径键，如 `.a.b`
    key: String,
    /// 父节点，`None` 表示直接挂在根上
    parent: Option<NodeId>,
    /// 查询引擎提供的关联句柄
    handle: H,
}

impl<H> TraversalNode<H> {
    /// 从根开始的完整点分路径，如 `a.b`
    pub fn path(&self) -> &str {
        &self.key[PATH_SEPARATOR.len_utf8()..]
    }

    /// 本节点对应的属性名
    pub fn attribute(&self) -> &str {
        self.key
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}

/// 遍历缓存
pub struct TraversalCache<H> {
    kind: TraversalKind,
    /// 关闭后每次解析都新建遍历
    memoize: bool,
    /// 节点 arena
    nodes: Vec<TraversalNode<H>>,
    /// 路径键到节点的映射（保持创建顺序）
    memo: IndexMap<String, NodeId>,
}

impl<H> TraversalCache<H> {
    /// 创建启用记忆化的缓存
    pub fn new(kind: TraversalKind) -> Self {
        Self::with_memoization(kind, true)
    }

    /// 创建缓存，`memoize = false` 时每次解析都会新建遍历
    pub fn with_memoization(kind: TraversalKind, memoize: bool) -> Self {
        Self {
            kind,
            memoize,
            nodes: Vec::new(),
            memo: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> TraversalKind {
        self.kind
    }

    pub fn is_memoized(&self) -> bool {
        self.memoize
    }

    /// 沿属性链从左到右解析遍历节点。
    ///
    /// 每个前缀先查缓存，未命中时调用 `create(父句柄, 属性名)` 新建遍历并登记；
    /// 父句柄为 `None` 表示在根上创建。空链返回 `Ok(None)`，即根本身。
    pub fn resolve<'p, I, F>(&mut self, chain: I, mut create: F) -> Result<Option<NodeId>>
    where
        I: IntoIterator<Item = &'p str>,
        F: FnMut(Option<&H>, &str) -> Result<H>,
    {
        let metrics = metrics::global_metrics();
        let mut current: Option<NodeId> = None;
        let mut key = String::new();

        for attribute in chain {
            key.push(PATH_SEPARATOR);
            key.push_str(attribute);

            if self.memoize {
                if let Some(&id) = self.memo.get(&key) {
                    trace!(kind = %self.kind, path = %&key[1..], "traversal cache hit");
                    metrics.record_cache_hit(self.kind);
                    current = Some(id);
                    continue;
                }
            }

            let parent = current.map(|id| &self.nodes[id.0].handle);
            let handle = create(parent, attribute)?;

            let id = NodeId(self.nodes.len());
            self.nodes.push(TraversalNode {
                key: key.clone(),
                parent: current,
                handle,
            });
            if self.memoize {
                self.memo.insert(key.clone(), id);
            }

            debug!(kind = %self.kind, path = %&key[1..], node = id.0, "traversal created");
            metrics.record_traversal_created(self.kind);
            current = Some(id);
        }

        Ok(current)
    }

    /// 获取节点
    pub fn get(&self, id: NodeId) -> Option<&TraversalNode<H>> {
        self.nodes.get(id.0)
    }

    /// 获取节点句柄
    pub fn handle(&self, id: NodeId) -> Option<&H> {
        self.get(id).map(TraversalNode::handle)
    }

    /// 替换节点句柄，返回旧句柄；之后从该节点出发的遍历都基于新句柄
    pub fn replace_handle(&mut self, id: NodeId, handle: H) -> Option<H> {
        self.nodes
            .get_mut(id.0)
            .map(|node| std::mem::replace(&mut node.handle, handle))
    }

    /// 按点分路径查找已缓存节点（仅记忆化模式下有效）
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut key = String::with_capacity(path.len() + 1);
        key.push(PATH_SEPARATOR);
        key.push_str(path);
        self.memo.get(&key).copied()
    }

    /// 按创建顺序遍历所有节点
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TraversalNode<H>)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// 已缓存的路径（按创建顺序）
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.memo.keys().map(|k| &k[PATH_SEPARATOR.len_utf8()..])
    }

    /// 已创建的遍历数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<H> fmt::Debug for TraversalCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalCache")
            .field("kind", &self.kind)
            .field("memoize", &self.memoize)
            .field("paths", &self.memo.keys().collect::<Vec<_>>())
            .finish()
    }
}
