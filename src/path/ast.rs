//! Attribute path tree
//!
//! Value types produced by the attribute-list parser. A list such as
//! `first,attribute.[nested.deep,other]` becomes an [`AttributeList`] with two
//! [`AttributePath`] items; the second one ends with a [`Segment::Group`].

use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

// ============================================================================
// Segment
// ============================================================================

/// One step of an attribute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Segment {
    /// Plain relation/property name
    Attribute(String),
    /// Bracketed sub-list sharing the same parent; only valid as the last segment
    Group(AttributeList),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Attribute(name) => write!(f, "{}", name),
            Segment::Group(list) => write!(f, "[{}]", list),
        }
    }
}

// ============================================================================
// AttributePath
// ============================================================================

/// Dot-separated chain of segments
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AttributePath {
    segments: SmallVec<[Segment; 4]>,
}

impl AttributePath {
    /// Plain chain without a trailing group
    pub fn chain<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributePath {
            segments: attributes
                .into_iter()
                .map(|a| Segment::Attribute(a.into()))
                .collect(),
        }
    }

    /// Terminate the chain with a group
    pub fn with_group(mut self, group: AttributeList) -> Self {
        self.segments.push(Segment::Group(group));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Plain attribute names, in order
    pub fn attributes(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Attribute(name) => Some(name.as_str()),
            Segment::Group(_) => None,
        })
    }

    /// Trailing group, if any
    pub fn group(&self) -> Option<&AttributeList> {
        match self.segments.last() {
            Some(Segment::Group(list)) => Some(list),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn collect_leaves<'a>(&'a self, prefix: &[&'a str], out: &mut Vec<Vec<&'a str>>) {
        let mut chain: Vec<&'a str> = prefix.to_vec();
        chain.extend(self.attributes());
        match self.group() {
            Some(group) if !group.is_empty() => group.collect_leaves(&chain, out),
            _ => {
                if !chain.is_empty() {
                    out.push(chain);
                }
            }
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

// ============================================================================
// AttributeList
// ============================================================================

/// Comma-separated list of attribute paths
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AttributeList {
    items: Vec<AttributePath>,
}

impl AttributeList {
    pub fn new(items: Vec<AttributePath>) -> Self {
        AttributeList { items }
    }

    /// Parse a raw attribute-list string
    pub fn parse(input: &str) -> Self {
        super::parser::parse(input)
    }

    pub fn items(&self) -> &[AttributePath] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flatten the tree into full root-to-leaf attribute chains.
    ///
    /// `a.[b,c.[d,e]]` yields `a.b`, `a.c.d`, `a.c.e` in that order. An empty
    /// group contributes its prefix alone.
    pub fn leaf_paths(&self) -> Vec<Vec<&str>> {
        let mut out = Vec::new();
        self.collect_leaves(&[], &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &[&'a str], out: &mut Vec<Vec<&'a str>>) {
        for item in &self.items {
            item.collect_leaves(prefix, out);
        }
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
