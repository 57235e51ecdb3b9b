//! Wrapped XAST nodes and the legacy element API.
use std::{
    cell::{self, Cell, RefCell},
    fmt::Display,
};

use serde::{Deserialize, Serialize};

use crate::{
    attribute::{Attr, Attributes},
    error::Error,
};

/// A reference to a node
pub type Ref<'arena> = &'arena Node<'arena>;
/// A settable reference to a node
pub type Link<'arena> = Cell<Option<Ref<'arena>>>;

#[derive(PartialEq, Eq, Debug, Clone, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// An enum which specifies the type of node.
///
/// Unrecognised types from the source tree are kept as [`Kind::Other`].
pub enum Kind {
    /// The root of a document, contains the root element, doctype, PIs, etc.
    Root,
    #[default]
    /// An element. (e.g. `<a xlink:href="#">hello</a>`)
    Element,
    /// A text node. (e.g. `foo` of `<p>foo</p>`)
    Text,
    /// A comment node. (e.g. `<!-- foo -->`)
    Comment,
    /// A `CDataSection`, such as `<![CDATA[ ... ]]>`
    CData,
    /// A processing instruction. (e.g. `<?xml version="1.0"?>`)
    Instruction,
    /// A `DocumentType` node such as `<!doctype html>`
    DocType,
    /// Any other marker copied from the source tree
    Other(String),
}

impl Kind {
    /// Returns the name of the kind as written in the source tree
    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::Element => "element",
            Self::Text => "text",
            Self::Comment => "comment",
            Self::CData => "cdata",
            Self::Instruction => "instruction",
            Self::DocType => "doctype",
            Self::Other(kind) => kind,
        }
    }
}

impl From<&str> for Kind {
    fn from(value: &str) -> Self {
        match value {
            "root" => Self::Root,
            "element" => Self::Element,
            "text" => Self::Text,
            "comment" => Self::Comment,
            "cdata" => Self::CData,
            "instruction" => Self::Instruction,
            "doctype" => Self::DocType,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Kind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Kind> for String {
    fn from(value: Kind) -> Self {
        match value {
            Kind::Other(kind) => kind,
            kind => kind.as_str().to_string(),
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(derive_more::Debug)]
/// An XML node, allocated in an [`crate::arena::Arena`].
///
/// A node owns its children in document order. The parent is a plain back-reference, updated
/// whenever the node is moved with [`Node::splice_content`].
pub struct Node<'arena> {
    id: usize,
    #[debug(skip)]
    pub(crate) parent: Link<'arena>,
    pub(crate) children: RefCell<Vec<Ref<'arena>>>,
    kind: Kind,
    name: RefCell<String>,
    attributes: RefCell<Attributes>,
    value: RefCell<Option<String>>,
}

impl<'arena> Node<'arena> {
    pub(crate) fn new(
        id: usize,
        kind: Kind,
        name: String,
        attributes: Attributes,
        value: Option<String>,
    ) -> Self {
        Self {
            id,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            kind,
            name: RefCell::new(name),
            attributes: RefCell::new(attributes),
            value: RefCell::new(value),
        }
    }

    /// Returns an identifier for the node that is unique within its arena
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the underlying pointer is at the same address as the other
    pub fn ptr_eq(&self, other: &Node<'_>) -> bool {
        std::ptr::addr_eq(self, other)
    }

    /// Returns an enum that identifies what the node is.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Returns the tag name of the node, or an empty string for nodes without one
    pub fn name(&self) -> cell::Ref<'_, str> {
        cell::Ref::map(self.name.borrow(), String::as_str)
    }

    /// Returns the content of a text-like node
    pub fn value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// Replaces the content of a text-like node, returning the previous content
    pub fn set_value(&self, value: Option<String>) -> Option<String> {
        self.value.replace(value)
    }

    /// Returns the node that holds this node as a child. The root of a tree, or a node that was
    /// removed from its parent, has no parent.
    ///
    /// [MDN | parentNode](https://developer.mozilla.org/en-US/docs/Web/API/Node/parentNode)
    pub fn parent(&self) -> Option<Ref<'arena>> {
        self.parent.get()
    }

    /// Returns a snapshot of the node's children.
    ///
    /// [MDN | childNodes](https://developer.mozilla.org/en-US/docs/Web/API/Node/childNodes)
    pub fn children(&self) -> Vec<Ref<'arena>> {
        self.children.borrow().clone()
    }

    /// Returns the number of child nodes
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Returns a node from the child nodes
    ///
    /// [MDN | item](https://developer.mozilla.org/en-US/docs/Web/API/NodeList/item)
    pub fn child(&self, index: usize) -> Option<Ref<'arena>> {
        self.children.borrow().get(index).copied()
    }

    /// Returns the index of the child within the current node's child list
    pub fn child_index(&self, child: &Node<'_>) -> Option<usize> {
        self.children
            .borrow()
            .iter()
            .position(|sibling| sibling.ptr_eq(child))
    }

    /// Returns whether `other` is this node or one of its descendants.
    ///
    /// [MDN | contains](https://developer.mozilla.org/en-US/docs/Web/API/Node/contains)
    pub fn contains(&self, other: &Node<'_>) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let mut current = other.parent.get();
        while let Some(ancestor) = current {
            if self.ptr_eq(ancestor) {
                return true;
            }
            current = ancestor.parent.get();
        }
        false
    }

    /// Returns whether the node has zero child nodes
    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    /// Returns whether the node is an element, and when `names` isn't empty, whether its name is
    /// one of them.
    pub fn is_elem(&self, names: &[&str]) -> bool {
        self.kind == Kind::Element && (names.is_empty() || names.contains(&&*self.name()))
    }

    /// Replaces the node's tag name, returning the previous name
    pub fn rename_elem(&self, name: impl Into<String>) -> String {
        self.name.replace(name.into())
    }

    /// Traverses the node's ancestors until it finds an element with the given name
    pub fn closest_elem(&self, name: &str) -> Option<Ref<'arena>> {
        let mut current = self.parent.get();
        while let Some(ancestor) = current {
            if ancestor.is_elem(&[name]) {
                return Some(ancestor);
            }
            current = ancestor.parent.get();
        }
        None
    }

    /// Returns the collection of attributes assigned to the node.
    ///
    /// [MDN | attributes](https://developer.mozilla.org/en-US/docs/Web/API/Element/attributes)
    pub fn attributes(&self) -> cell::Ref<'_, Attributes> {
        self.attributes.borrow()
    }

    /// Returns the mutable collection of attributes assigned to the node.
    pub fn attributes_mut(&self) -> cell::RefMut<'_, Attributes> {
        self.attributes.borrow_mut()
    }

    /// Returns whether the node has the attribute, and when `value` is given, whether the
    /// attribute's value is exactly equal to it.
    pub fn has_attr(&self, name: &str, value: Option<&str>) -> bool {
        self.attributes.borrow().has(name, value)
    }

    /// Like [`Node::has_attr`], but compares the attribute's local name regardless of prefix
    pub fn has_attr_local(&self, local_name: &str, value: Option<&str>) -> bool {
        self.attributes.borrow().has_local(local_name, value)
    }

    /// Returns a copy of the attribute with the given qualified name.
    ///
    /// [MDN | getAttributeNode](https://developer.mozilla.org/en-US/docs/Web/API/Element/getAttributeNode)
    pub fn attr(&self, name: &str) -> Option<Attr> {
        self.attributes.borrow().get(name).cloned()
    }

    /// Returns the value of the attribute with the given qualified name.
    ///
    /// [MDN | getAttribute](https://developer.mozilla.org/en-US/docs/Web/API/Element/getAttribute)
    pub fn attr_value(&self, name: &str) -> Option<String> {
        self.attributes
            .borrow()
            .get(name)
            .map(|attr| attr.value().to_string())
    }

    /// Stores the attribute record under its own qualified name, returning the record it
    /// replaced.
    ///
    /// # Errors
    ///
    /// If the record's name is empty
    pub fn add_attr(&self, attr: Attr) -> Result<Option<Attr>, Error> {
        if attr.name().trim().is_empty() {
            return Err(Error::InvalidAttribute {
                value: attr.value().to_string(),
            });
        }
        Ok(self.attributes.borrow_mut().set_record(attr))
    }

    /// Sets the value of an attribute, creating it if it doesn't exist.
    ///
    /// [MDN | setAttribute](https://developer.mozilla.org/en-US/docs/Web/API/Element/setAttribute)
    pub fn set_attr(&self, name: &str, value: impl Into<String>) -> Option<Attr> {
        self.attributes.borrow_mut().set(name, value)
    }

    /// Removes the attribute with the given qualified name, if present.
    ///
    /// [MDN | removeAttribute](https://developer.mozilla.org/en-US/docs/Web/API/Element/removeAttribute)
    pub fn remove_attr(&self, name: &str) -> Option<Attr> {
        self.attributes.borrow_mut().remove(name)
    }

    /// Calls `f` with each of the node's attributes, as they were before the first call.
    ///
    /// `f` may add or remove attributes of this node.
    pub fn each_attr<F>(&self, f: F)
    where
        F: FnMut(&Attr),
    {
        let attributes = self.attributes.borrow().clone();
        attributes.iter().for_each(f);
    }

    /// Returns whether any of the node's attributes satisfy the predicate. The predicate may
    /// change the attributes of this node.
    pub fn some_attr<F>(&self, f: F) -> bool
    where
        F: FnMut(&Attr) -> bool,
    {
        let attributes = self.attributes.borrow().clone();
        attributes.iter().any(f)
    }

    /// Returns a formatter that displays the node like a start tag, e.g. `<path d="M0 0">`
    pub fn formatter(&self) -> Formatter<'_, 'arena> {
        Formatter(self)
    }
}

/// Formats the contained node as a start tag
pub struct Formatter<'a, 'arena>(&'a Node<'arena>);

impl Display for Formatter<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.0;
        match node.kind() {
            Kind::Element | Kind::Root if !node.name().is_empty() => {
                f.write_fmt(format_args!("<{}", &*node.name()))?;
                for attr in &*node.attributes() {
                    f.write_fmt(format_args!(" {attr}"))?;
                }
                f.write_str(">")
            }
            kind => f.write_fmt(format_args!("#{kind}")),
        }
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn kind_from_source() {
    assert_eq!(Kind::from("element"), Kind::Element);
    assert_eq!(Kind::from("root"), Kind::Root);
    assert_eq!(Kind::from("foo"), Kind::Other(String::from("foo")));
    assert_eq!(String::from(Kind::Other(String::from("foo"))), "foo");
    assert_eq!(Kind::default(), Kind::Element);
}

#[test]
fn node_attributes() -> anyhow::Result<()> {
    let node = Node::new(0, Kind::Element, "use".into(), Attributes::new(), None);

    assert_eq!(node.add_attr(Attr::new("xlink:href", "#a"))?, None);
    assert!(node.has_attr("xlink:href", Some("#a")));
    assert!(node.has_attr_local("href", Some("#a")));
    assert!(!node.has_attr("href", None));
    assert_eq!(node.attr("xlink:href").map(|attr| attr.prefix().to_string()), Some("xlink".into()));

    node.set_attr("fill", "none");
    let mut names = vec![];
    node.each_attr(|attr| names.push(attr.name().to_string()));
    assert_eq!(names, vec!["xlink:href", "fill"]);
    assert!(node.some_attr(|attr| attr.value() == "none"));

    assert_eq!(node.remove_attr("fill"), Some(Attr::new("fill", "none")));
    assert_eq!(node.remove_attr("fill"), None);
    assert_eq!(node.attr_value("fill"), None);
    Ok(())
}

#[test]
fn node_attributes_change_during_callbacks() {
    let attributes = [
        Attr::new("id", "a"),
        Attr::new("data-x", "1"),
        Attr::new("data-y", "2"),
    ]
    .into_iter()
    .collect();
    let node = Node::new(0, Kind::Element, "rect".into(), attributes, None);

    let mut visited = vec![];
    node.each_attr(|attr| {
        visited.push(attr.name().to_string());
        if attr.name().starts_with("data-") {
            node.remove_attr(attr.name());
            node.set_attr("fill", "none");
        }
    });
    assert_eq!(visited, vec!["id", "data-x", "data-y"]);
    assert_eq!(
        node.attributes().iter().map(Attr::name).collect::<Vec<_>>(),
        vec!["id", "fill"]
    );

    assert!(node.some_attr(|attr| node.remove_attr(attr.name()).is_some()));
    assert_eq!(node.attributes().len(), 1);

    let fill = node.attr("fill").expect("should have fill");
    node.set_attr("fill", "red");
    assert_eq!(fill.value(), "none");
    assert_eq!(node.attr_value("fill").as_deref(), Some("red"));
}

#[test]
fn node_rejects_unnamed_attr() {
    let node = Node::new(0, Kind::Element, "path".into(), Attributes::new(), None);

    let result = node.add_attr(Attr::new("", "red"));
    assert!(matches!(result, Err(Error::InvalidAttribute { value }) if value == "red"));
    assert!(node.attributes().is_empty());
}

#[test]
fn node_rename_and_is_elem() {
    let node = Node::new(0, Kind::Element, "g".into(), Attributes::new(), None);

    assert!(node.is_elem(&[]));
    assert!(node.is_elem(&["svg", "g"]));
    assert_eq!(node.rename_elem("a"), "g");
    assert!(!node.is_elem(&["g"]));
    assert_eq!(&*node.name(), "a");
    assert!(node.is_empty());

    let text = Node::new(1, Kind::Text, String::new(), Attributes::new(), Some("hi".into()));
    assert!(!text.is_elem(&[]));
    assert_eq!(text.value().as_deref(), Some("hi"));
}

#[test]
fn node_formatter() {
    let attributes = [Attr::new("d", "M0 0"), Attr::new("fill", "red")]
        .into_iter()
        .collect();
    let node = Node::new(0, Kind::Element, "path".into(), attributes, None);
    insta::assert_snapshot!(node.formatter().to_string(), @r#"<path d="M0 0" fill="red">"#);

    let text = Node::new(1, Kind::Text, String::new(), Attributes::new(), None);
    insta::assert_snapshot!(text.formatter().to_string(), @"#text");
}
