//! A restricted CSS selector grammar for querying wrapped trees.
//!
//! Supported forms are
//!
//! - tag names, e.g. `path`
//! - exact attribute values with an optional tag, e.g. `path[fill="url(#grad1)"]`
//! - comma separated alternatives of the above, e.g. `path, rect`
//!
//! Anything else parses to [`Selector::Unsupported`], which matches nothing.
use std::{fmt::Display, ops::ControlFlow, sync::LazyLock};

use regex::Regex;

use crate::node::{Kind, Node, Ref};

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_:-]+$").unwrap());
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?<tag>[A-Za-z0-9_:-]+)?\[(?<name>[A-Za-z0-9_:-]+)=(?:"(?<double>[^"]*)"|'(?<single>[^']*)')\]$"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed selector
pub enum Selector {
    /// A selector outside the supported grammar, kept as written
    Unsupported(String),
    /// Matches nodes with the given tag name
    Tag(String),
    /// Matches nodes with an attribute of exactly the given value, and the tag name if given
    Attribute {
        /// The required tag name
        tag: Option<String>,
        /// The qualified name of the attribute
        name: String,
        /// The exact value of the attribute, without quotes
        value: String,
    },
    /// Matches nodes that match any of the alternatives
    Any(Vec<Selector>),
}

impl Selector {
    /// Parses a selector string. Never fails, unrecognised forms become
    /// [`Selector::Unsupported`].
    pub fn parse(source: &str) -> Self {
        let mut alternatives: Vec<_> = split_alternatives(source)
            .into_iter()
            .map(Self::parse_compound)
            .collect();
        if alternatives.len() == 1 {
            alternatives.remove(0)
        } else {
            Self::Any(alternatives)
        }
    }

    fn parse_compound(source: &str) -> Self {
        let source = source.trim();
        if TAG.is_match(source) {
            return Self::Tag(source.to_string());
        }
        if let Some(captures) = ATTRIBUTE.captures(source) {
            let value = captures
                .name("double")
                .or_else(|| captures.name("single"))
                .map_or("", |value| value.as_str());
            return Self::Attribute {
                tag: captures.name("tag").map(|tag| tag.as_str().to_string()),
                name: captures["name"].to_string(),
                value: value.to_string(),
            };
        }
        log::debug!("unsupported selector `{source}` will match nothing");
        Self::Unsupported(source.to_string())
    }

    /// Returns whether the node matches the selector, without considering its descendants.
    pub fn matches(&self, node: &Node<'_>) -> bool {
        let selectable = match node.kind() {
            Kind::Element => true,
            Kind::Root => !node.name().is_empty(),
            _ => false,
        };
        selectable && self.matches_selectable(node)
    }

    fn matches_selectable(&self, node: &Node<'_>) -> bool {
        match self {
            Self::Unsupported(_) => false,
            Self::Tag(tag) => *node.name() == **tag,
            Self::Attribute { tag, name, value } => {
                tag.as_ref().is_none_or(|tag| *node.name() == **tag)
                    && node.has_attr(name, Some(value))
            }
            Self::Any(alternatives) => alternatives
                .iter()
                .any(|alternative| alternative.matches_selectable(node)),
        }
    }

    /// Returns every node in the subtree of `root` that matches, in pre-order. `root` itself is
    /// included.
    pub fn select_all<'arena>(&self, root: Ref<'arena>) -> Vec<Ref<'arena>> {
        let mut matches = vec![];
        let _ = root.traverse(|node| {
            if self.matches(node) {
                matches.push(node);
            }
            ControlFlow::Continue(())
        });
        matches
    }

    /// Returns the first node in the subtree of `root` that matches, in pre-order.
    pub fn select_first<'arena>(&self, root: Ref<'arena>) -> Option<Ref<'arena>> {
        let mut first = None;
        let _ = root.traverse(|node| {
            if self.matches(node) {
                first = Some(node);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        first
    }
}

/// Splits on commas that aren't quoted or bracketed
fn split_alternatives(source: &str) -> Vec<&str> {
    let mut alternatives = vec![];
    let mut quote = None;
    let mut depth = 0_usize;
    let mut start = 0;
    for (i, c) in source.char_indices() {
        match (quote, c) {
            (Some(q), _) if q == c => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                alternatives.push(&source[start..i]);
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    alternatives.push(&source[start..]);
    alternatives
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(source) | Self::Tag(source) => f.write_str(source),
            Self::Attribute { tag, name, value } => {
                if let Some(tag) = tag {
                    f.write_str(tag)?;
                }
                if value.contains('"') {
                    write!(f, "[{name}='{value}']")
                } else {
                    write!(f, r#"[{name}="{value}"]"#)
                }
            }
            Self::Any(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                Ok(())
            }
        }
    }
}

impl<'arena> Node<'arena> {
    /// Returns every node of this subtree matching the selector, including this node, in
    /// document order.
    ///
    /// [MDN | querySelectorAll](https://developer.mozilla.org/en-US/docs/Web/API/Element/querySelectorAll)
    pub fn query_selector_all(&'arena self, selector: &str) -> Vec<Ref<'arena>> {
        Selector::parse(selector).select_all(self)
    }

    /// Returns the first node of this subtree matching the selector, including this node.
    ///
    /// [MDN | querySelector](https://developer.mozilla.org/en-US/docs/Web/API/Element/querySelector)
    pub fn query_selector(&'arena self, selector: &str) -> Option<Ref<'arena>> {
        Selector::parse(selector).select_first(self)
    }

    /// Returns whether this node would be selected by the selector
    ///
    /// [MDN | matches](https://developer.mozilla.org/en-US/docs/Web/API/Element/matches)
    pub fn matches(&self, selector: &str) -> bool {
        Selector::parse(selector).matches(self)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{arena::Allocator, parse::RawNode};

    const SVG: &str = r##"{
        "type": "root",
        "children": [{
            "name": "svg",
            "children": [
                { "name": "path", "attributes": { "id": "a", "fill": "url(#grad1)" } },
                { "name": "rect", "attributes": { "id": "b", "fill": "url(#grad1)" } },
                { "name": "g", "children": [
                    { "name": "path", "attributes": { "id": "c", "fill": "url(#grad2)" } },
                    { "type": "text", "value": "path" },
                    { "name": "rect", "attributes": { "id": "d" } }
                ] },
                { "name": "path", "attributes": { "id": "e", "fill": "url(#grad1)" } }
            ]
        }]
    }"##;

    fn ids(nodes: &[Ref<'_>]) -> Vec<String> {
        nodes
            .iter()
            .map(|node| node.attr_value("id").unwrap_or_default())
            .collect()
    }

    #[test]
    fn parse_selectors() {
        assert_eq!(Selector::parse("path"), Selector::Tag(String::from("path")));
        assert_eq!(
            Selector::parse(r#"path[fill="url(#grad1)"]"#),
            Selector::Attribute {
                tag: Some(String::from("path")),
                name: String::from("fill"),
                value: String::from("url(#grad1)"),
            }
        );
        assert_eq!(
            Selector::parse("[xlink:href='#a, #b']"),
            Selector::Attribute {
                tag: None,
                name: String::from("xlink:href"),
                value: String::from("#a, #b"),
            }
        );
        assert_eq!(
            Selector::parse(" path ,rect"),
            Selector::Any(vec![
                Selector::Tag(String::from("path")),
                Selector::Tag(String::from("rect")),
            ])
        );
        assert_eq!(
            Selector::parse("g > path"),
            Selector::Unsupported(String::from("g > path"))
        );
        assert_eq!(
            Selector::parse(r#"[fill="red']"#),
            Selector::Unsupported(String::from(r#"[fill="red']"#))
        );
        assert_eq!(Selector::parse(""), Selector::Unsupported(String::new()));
    }

    #[test]
    fn display_selectors() {
        insta::assert_snapshot!(
            Selector::parse(r#"path[fill='url(#a)'],  rect, g:hover"#).to_string(),
            @r#"path[fill="url(#a)"], rect, g:hover"#
        );
        insta::assert_snapshot!(
            Selector::parse(r#"[title='say "hi"']"#).to_string(),
            @r#"[title='say "hi"']"#
        );
    }

    #[test]
    fn query_by_tag() -> anyhow::Result<()> {
        let raw: RawNode = serde_json::from_str(SVG)?;
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&raw))?;

        let paths = root.query_selector_all("path");
        assert_eq!(ids(&paths), vec!["a", "c", "e"]);
        assert_eq!(ids(&root.query_selector_all("rect")), vec!["b", "d"]);
        // text nodes never match
        assert!(paths.iter().all(|path| path.kind() == &Kind::Element));

        // idempotent
        let again = root.query_selector_all("path");
        assert_eq!(paths.len(), again.len());
        assert!(paths.iter().zip(&again).all(|(a, b)| a.ptr_eq(b)));
        Ok(())
    }

    #[test]
    fn query_by_attribute() -> anyhow::Result<()> {
        let raw: RawNode = serde_json::from_str(SVG)?;
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&raw))?;

        let filled = root.query_selector_all(r#"path[fill="url(#grad1)"]"#);
        assert_eq!(ids(&filled), vec!["a", "e"]);

        let any_filled = root.query_selector_all(r#"[fill="url(#grad1)"]"#);
        assert_eq!(ids(&any_filled), vec!["a", "b", "e"]);

        assert!(root.query_selector_all(r#"path[fill="url(#grad"]"#).is_empty());
        Ok(())
    }

    #[test]
    fn query_alternatives_in_document_order() -> anyhow::Result<()> {
        let raw: RawNode = serde_json::from_str(SVG)?;
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&raw))?;

        let shapes = root.query_selector_all("path, rect");
        assert_eq!(ids(&shapes), vec!["a", "b", "c", "d", "e"]);

        // unsupported alternatives match nothing, the rest still match
        let shapes = root.query_selector_all("rect, g > path");
        assert_eq!(ids(&shapes), vec!["b", "d"]);
        Ok(())
    }

    #[test]
    fn query_first() -> anyhow::Result<()> {
        let raw: RawNode = serde_json::from_str(SVG)?;
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&raw))?;

        let rect = root.query_selector("rect").expect("should find rect");
        assert_eq!(rect.attr_value("id").as_deref(), Some("b"));

        let g = root.query_selector("g").expect("should find g");
        let path = g.query_selector("path").expect("should find path in g");
        assert_eq!(path.attr_value("id").as_deref(), Some("c"));

        assert!(root.query_selector("circle").is_none());
        assert!(root.query_selector("svg > *").is_none());
        assert!(root.query_selector("").is_none());
        Ok(())
    }

    #[test]
    fn query_includes_self() -> anyhow::Result<()> {
        let raw: RawNode = serde_json::from_str(SVG)?;
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&raw))?;
        let svg = root.child(0).expect("should have svg");

        assert!(svg.matches("svg"));
        assert!(svg.query_selector("svg").is_some_and(|node| node.ptr_eq(svg)));
        // an unnamed root never matches
        assert!(!root.matches(""));
        assert!(root.query_selector_all("root").is_empty());

        let named_root = allocator.alloc(
            Kind::Root,
            String::from("svg"),
            crate::attribute::Attributes::new(),
            None,
        );
        assert!(named_root.matches("svg"));
        Ok(())
    }
}
