//! The shape of trees handed over by a parser, before they're wrapped into an arena.
//!
//! Any parser can produce a [`RawNode`], either directly or by deserializing one. The
//! `roxmltree` feature includes a parser for XML sources.
use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::node::Kind;

#[cfg(feature = "roxmltree")]
pub mod roxmltree;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
/// A node of a parsed tree, with missing fields defaulted.
pub struct RawNode {
    /// The type of node, `element` if absent
    #[serde(alias = "type")]
    pub kind: Kind,
    /// The tag name of the node, empty if absent
    pub name: String,
    /// The attributes of the node
    pub attributes: RawAttributes,
    /// The content of text-like nodes
    pub value: Option<String>,
    /// The children of the node, in document order
    pub children: Vec<RawNode>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
/// The attributes of a parsed node, which may come as plain strings or as prepared records.
pub enum RawAttributes {
    /// A `name -> value` mapping, in source order
    Map(AttributeMap),
    /// Prepared records, e.g. copied from another tree
    Records(Vec<AttrRecord>),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// A list of `name -> value` pairs that deserializes from a map without losing order
pub struct AttributeMap(pub Vec<(String, String)>);

#[derive(Deserialize, Debug, Clone, PartialEq)]
/// A prepared attribute record.
///
/// Any `prefix` or `local` fields of the record are ignored, they are derived from `name`.
pub struct AttrRecord {
    /// The qualified name of the attribute
    #[serde(default)]
    pub name: Option<String>,
    /// The value of the attribute
    pub value: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
/// Which parts of a source document a parser keeps in the tree
pub struct Options {
    /// Whether text nodes are kept
    pub keep_text: bool,
    /// Whether comment nodes are kept
    pub keep_comments: bool,
    /// Whether text nodes of only whitespace are kept
    pub keep_whitespace: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            keep_text: true,
            keep_comments: false,
            keep_whitespace: false,
        }
    }
}

impl RawNode {
    /// Creates a node with no attributes or children
    pub fn new(kind: Kind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds an attribute to the node, which must not have attribute records
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self.attributes {
            RawAttributes::Map(map) => map.0.push((name.into(), value.into())),
            RawAttributes::Records(records) => records.push(AttrRecord {
                name: Some(name.into()),
                value: value.into(),
            }),
        }
        self
    }

    /// Appends a child to the node
    #[must_use]
    pub fn with_child(mut self, child: RawNode) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for RawAttributes {
    fn default() -> Self {
        Self::Map(AttributeMap::default())
    }
}

impl<'de> Deserialize<'de> for AttributeMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AttributeMapVisitor;

        impl<'de> Visitor<'de> for AttributeMapVisitor {
            type Value = AttributeMap;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of attribute names to string values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or_default());
                while let Some(entry) = access.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(AttributeMap(entries))
            }
        }

        deserializer.deserialize_map(AttributeMapVisitor)
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn raw_node_defaults() -> anyhow::Result<()> {
    let raw: RawNode = serde_json::from_str("{}")?;
    assert_eq!(raw, RawNode::new(Kind::Element, ""));

    let raw: RawNode =
        serde_json::from_str(r#"{ "kind": "doctype", "children": [{ "type": "x" }] }"#)?;
    assert_eq!(raw.kind, Kind::DocType);
    assert_eq!(raw.children[0].kind, Kind::Other(String::from("x")));
    Ok(())
}

#[test]
fn raw_attributes_keep_order() -> anyhow::Result<()> {
    let raw: RawNode =
        serde_json::from_str(r#"{ "attributes": { "z": "1", "a": "2", "m": "3" } }"#)?;
    assert_eq!(
        raw,
        RawNode::new(Kind::Element, "")
            .with_attribute("z", "1")
            .with_attribute("a", "2")
            .with_attribute("m", "3")
    );

    let raw: RawNode =
        serde_json::from_str(r#"{ "attributes": [{ "name": "a", "value": "1" }] }"#)?;
    assert_eq!(
        raw.attributes,
        RawAttributes::Records(vec![AttrRecord {
            name: Some(String::from("a")),
            value: String::from("1"),
        }])
    );
    Ok(())
}

#[test]
fn options_defaults() -> anyhow::Result<()> {
    let options: Options = serde_json::from_str(r#"{ "keepComments": true }"#)?;
    assert_eq!(
        options,
        Options {
            keep_comments: true,
            ..Options::default()
        }
    );
    Ok(())
}
