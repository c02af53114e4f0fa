//! Attribute-list parser
//!
//! Grammar:
//!
//! ```text
//! list  := item (',' item)*
//! item  := ident ('.' ident)* ('.' '[' list ']')?
//! ```
//!
//! Commas are separators only at bracket depth 0, so the list is first split
//! level by level and every item is then cut into its dotted chain.

use crate::path::ast::{AttributeList, AttributePath, Segment};
use smallvec::SmallVec;

const LIST_START: char = '[';
const LIST_END: char = ']';
const ATTRIBUTE_DELIMITER: char = ',';
const CHAIN_DELIMITER: char = '.';

/// Attribute-list parser
pub struct AttributeParser<'a> {
    input: &'a str,
}

impl<'a> AttributeParser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Parse the whole input as a list.
    ///
    /// Blank input produces an empty list. Unbalanced brackets are not
    /// validated; the result for such input is unspecified but never panics.
    pub fn parse(&self) -> AttributeList {
        parse_list(self.input)
    }
}

/// Parse an attribute-list string
pub fn parse(input: &str) -> AttributeList {
    AttributeParser::new(input).parse()
}

fn parse_list(input: &str) -> AttributeList {
    AttributeList::new(
        split_same_level(input)
            .into_iter()
            .filter_map(parse_item)
            .collect(),
    )
}

/// Split on commas found at nesting depth 0
fn split_same_level(input: &str) -> SmallVec<[&str; 8]> {
    let mut parts = SmallVec::new();
    let mut depth: i32 = 0;
    let mut begin = 0;

    for (i, c) in input.char_indices() {
        match c {
            LIST_START => depth += 1,
            LIST_END => depth -= 1,
            ATTRIBUTE_DELIMITER if depth == 0 => {
                parts.push(&input[begin..i]);
                begin = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[begin..]);
    parts
}

/// Parse one dotted item; `None` for blank items
fn parse_item(item: &str) -> Option<AttributePath> {
    let item = item.trim();
    if item.is_empty() {
        return None;
    }

    match item.find(LIST_START) {
        None => Some(AttributePath::chain(split_chain(item))),
        Some(index) => {
            let (prefix, tail) = item.split_at(index);
            // 嵌套深度已在上一层解析，组一定占据条目的末尾
            let inner = tail
                .strip_prefix(LIST_START)
                .map(|rest| rest.strip_suffix(LIST_END).unwrap_or(rest))
                .unwrap_or(tail);
            let path = AttributePath::chain(split_chain(prefix)).with_group(parse_list(inner));
            debug_assert!(matches!(path.segments().last(), Some(Segment::Group(_))));
            Some(path)
        }
    }
}

fn split_chain(chain: &str) -> impl Iterator<Item = &str> {
    chain
        .split(CHAIN_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
