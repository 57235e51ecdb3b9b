//! Parsing methods using roxmltree
//!
//! # Quirks
//!
//! Roxmltree has some notable quirks
//!
//! - Prefixes are recovered from namespace uris, so a uri bound to multiple prefixes uses the
//!   nearest binding
//! - Doctypes are skipped
use std::{fmt::Display, path::Path};

use crate::{
    node::Kind,
    parse::{Options, RawNode},
};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const MAX_DEPTH: u32 = 1024;

#[derive(Debug)]
/// The errors which may occur while parsing a document with roxmltree.
pub enum ParseError {
    /// The document parsed had a depth than 1024 elements
    NodesLimitReached,
    /// The document couldn't be parsed by roxmltree
    Roxml(roxmltree::Error),
    /// The document couldn't be parsed due to an IO issue
    IO(std::io::Error),
}

/// Parses an XML source into a tree ready for wrapping
///
/// # Errors
///
/// If the source isn't well-formed, or the depth of the tree is too deep
pub fn parse(source: &str, options: &Options) -> Result<RawNode, ParseError> {
    let xml = roxmltree::Document::parse_with_options(
        source,
        roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        },
    )
    .map_err(ParseError::Roxml)?;
    from_document(&xml, options)
}

/// Reads and parses the XML file at the given path
///
/// # Errors
///
/// If the file can't be read, or [`parse`] fails
pub fn parse_path(path: &Path, options: &Options) -> Result<RawNode, ParseError> {
    let source = std::fs::read_to_string(path).map_err(ParseError::IO)?;
    parse(&source, options)
}

/// Converts an xml document already in roxmltree representation
///
/// # Errors
///
/// If the depth of the tree is too deep
pub fn from_document(
    xml: &roxmltree::Document<'_>,
    options: &Options,
) -> Result<RawNode, ParseError> {
    let mut root = RawNode::new(Kind::Root, "");
    parse_xml_node_children(&mut root, xml.root(), 0, options)?;
    Ok(root)
}

fn parse_xml_node_children(
    node: &mut RawNode,
    parent: roxmltree::Node<'_, '_>,
    depth: u32,
    options: &Options,
) -> Result<(), ParseError> {
    for xml_child in parent.children() {
        if let Some(child) = parse_xml_node(xml_child, depth, options)? {
            node.children.push(child);
        }
    }
    Ok(())
}

fn parse_xml_node(
    node: roxmltree::Node<'_, '_>,
    depth: u32,
    options: &Options,
) -> Result<Option<RawNode>, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::NodesLimitReached);
    }

    let child = match node.node_type() {
        roxmltree::NodeType::Root => RawNode::new(Kind::Root, ""),
        roxmltree::NodeType::Element => parse_element(node),
        roxmltree::NodeType::PI => {
            let Some(pi) = node.pi() else {
                return Ok(None);
            };
            RawNode {
                value: pi.value.map(Into::into),
                ..RawNode::new(Kind::Instruction, pi.target)
            }
        }
        roxmltree::NodeType::Comment if options.keep_comments => RawNode {
            value: node.text().map(Into::into),
            ..RawNode::new(Kind::Comment, "")
        },
        roxmltree::NodeType::Text if options.keep_text => {
            let text = node.text().unwrap_or_default();
            if !options.keep_whitespace && text.trim().is_empty() {
                return Ok(None);
            }
            RawNode {
                value: Some(text.into()),
                ..RawNode::new(Kind::Text, "")
            }
        }
        roxmltree::NodeType::Comment | roxmltree::NodeType::Text => return Ok(None),
    };
    let mut child = child;
    parse_xml_node_children(&mut child, node, depth + 1, options)?;
    Ok(Some(child))
}

fn parse_element(xml_node: roxmltree::Node<'_, '_>) -> RawNode {
    let name = qualify(
        xml_node,
        xml_node.tag_name().namespace(),
        xml_node.tag_name().name(),
    );
    let mut element = RawNode::new(Kind::Element, name);
    for (name, value) in xml_node.namespaces().filter_map(|ns| find_new_xmlns(xml_node, ns)) {
        element = element.with_attribute(name, value);
    }
    for attr in xml_node.attributes() {
        let name = qualify(xml_node, attr.namespace(), attr.name());
        element = element.with_attribute(name, attr.value());
    }
    element
}

/// Joins the prefix bound to `namespace` with the local name
fn qualify(xml_node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NAMESPACE) => Some("xml"),
        Some(uri) => xml_node.lookup_prefix(uri),
        None => None,
    };
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

/// When `ns` isn't already in scope from the parent element, returns an `xmlns` attribute to
/// add to the source element.
fn find_new_xmlns(
    xml_node: roxmltree::Node<'_, '_>,
    ns: &roxmltree::Namespace<'_>,
) -> Option<(String, String)> {
    if ns.name() == Some("xml") {
        return None;
    }
    let inherited = xml_node.parent_element().is_some_and(|parent| {
        parent
            .namespaces()
            .any(|parent_ns| parent_ns.name() == ns.name() && parent_ns.uri() == ns.uri())
    });
    if inherited {
        return None;
    }
    match ns.name() {
        // return `xmlns:ns="uri"`
        Some(prefix) => Some((format!("xmlns:{prefix}"), ns.uri().to_string())),
        // return `xmlns="uri"`
        None if !ns.uri().is_empty() => Some((String::from("xmlns"), ns.uri().to_string())),
        // no new xmlns
        None => None,
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodesLimitReached => f.write_str("The depth of the document parsed was too deep"),
            Self::Roxml(err) => err.fmt(f),
            Self::IO(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NodesLimitReached => None,
            Self::Roxml(err) => Some(err),
            Self::IO(err) => Some(err),
        }
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn parse_roxmltree() -> anyhow::Result<()> {
    let source = r##"<?xml version="1.0"?>
<?xml-stylesheet href="a.css"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="300">
  <!-- comment -->
  <g xml:space="preserve">
    <use xlink:href="#a"/>
    <text>hi</text>
  </g>
</svg>"##;
    let raw = parse(source, &Options::default())?;

    assert_eq!(raw.kind, Kind::Root);
    let [pi, svg] = raw.children.as_slice() else {
        panic!("expected a PI and svg in root, found {:?}", raw.children);
    };
    assert_eq!(pi.kind, Kind::Instruction);
    // the xml declaration isn't a PI
    assert_eq!(pi.name, "xml-stylesheet");
    assert_eq!(pi.value.as_deref(), Some(r#"href="a.css""#));

    assert_eq!(
        *svg,
        RawNode::new(Kind::Element, "svg")
            .with_attribute("xmlns", "http://www.w3.org/2000/svg")
            .with_attribute("xmlns:xlink", "http://www.w3.org/1999/xlink")
            .with_attribute("width", "300")
            .with_child(
                RawNode::new(Kind::Element, "g")
                    .with_attribute("xml:space", "preserve")
                    .with_child(
                        RawNode::new(Kind::Element, "use").with_attribute("xlink:href", "#a")
                    )
                    .with_child(RawNode::new(Kind::Element, "text").with_child(RawNode {
                        value: Some(String::from("hi")),
                        ..RawNode::new(Kind::Text, "")
                    }))
            )
    );
    Ok(())
}

#[test]
fn parse_keeps_comments_when_asked() -> anyhow::Result<()> {
    let options = Options {
        keep_comments: true,
        ..Options::default()
    };
    let raw = parse("<svg><!--a--></svg>", &options)?;

    let comment = &raw.children[0].children[0];
    assert_eq!(comment.kind, Kind::Comment);
    assert_eq!(comment.value.as_deref(), Some("a"));
    Ok(())
}

#[test]
fn parse_malformed() {
    let result = parse("<svg><g></svg>", &Options::default());
    assert!(matches!(result, Err(ParseError::Roxml(_))));

    let deep = "<g>".repeat(1100) + &"</g>".repeat(1100);
    // roxmltree may refuse before the depth check does
    assert!(parse(&deep, &Options::default()).is_err());
}
