//! The arena used to allocate nodes, and the wrapping of parsed trees into it.
use crate::{
    attribute::{Attr, Attributes},
    error::Error,
    node::{Kind, Node, Ref},
    parse::{RawAttributes, RawNode},
};

/// The inner value of [`Arena`]
type PrivateArena<'arena> = &'arena typed_arena::Arena<Node<'arena>>;
/// An arena for [`Node`] values
///
/// Every node of a tree lives as long as the arena. Removing a node from its parent only makes it
/// unreachable from the tree.
pub struct Arena<'arena>(typed_arena::Arena<Node<'arena>>);

/// The allocator for adding new nodes that live as long as the document
#[derive(Clone, Copy)]
pub struct Allocator<'arena> {
    /// The arena for new nodes
    arena: PrivateArena<'arena>,
}

impl<'arena> Allocator<'arena> {
    /// Returns an arena that cannot be publicly accessed
    pub fn new_arena() -> Arena<'arena> {
        Arena(typed_arena::Arena::new())
    }

    /// Returns an arena that cannot be publicly accessed
    pub fn new_arena_with_capacity(n: usize) -> Arena<'arena> {
        Arena(typed_arena::Arena::with_capacity(n))
    }

    /// Creates a new allocator to assign nodes that live as long as the document requires.
    pub fn new(arena: &'arena Arena<'arena>) -> Self {
        Self { arena: &arena.0 }
    }

    /// Allocates a detached node
    pub fn alloc(
        &self,
        kind: Kind,
        name: String,
        attributes: Attributes,
        value: Option<String>,
    ) -> Ref<'arena> {
        // The arena's length only grows, so it can be used as a unique id
        let id = self.arena.len();
        self.arena
            .alloc(Node::new(id, kind, name, attributes, value))
    }

    /// Allocates a detached element with the given name and attributes
    pub fn element<I, K, V>(&self, name: &str, attributes: I) -> Ref<'arena>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| Attr::new(name, value))
            .collect();
        self.alloc(Kind::Element, name.to_string(), attributes, None)
    }

    /// Allocates a detached text node
    pub fn text(&self, value: impl Into<String>) -> Ref<'arena> {
        self.alloc(Kind::Text, String::new(), Attributes::new(), Some(value.into()))
    }

    /// Wraps the tree produced by a parser, returning the root node.
    ///
    /// The source tree is copied, so later changes to either tree aren't shared.
    ///
    /// # Errors
    ///
    /// If the parser produced no tree, or an attribute record is missing its name
    pub fn wrap(&self, raw: Option<&RawNode>) -> Result<Ref<'arena>, Error> {
        let Some(raw) = raw else {
            log::debug!("no tree to wrap");
            return Err(Error::MissingTree);
        };
        let start = self.arena.len();
        let root = self.wrap_node(raw, None)?;
        log::debug!("wrapped tree of {} nodes", self.arena.len() - start);
        Ok(root)
    }

    #[cfg(feature = "roxmltree")]
    /// Parses an XML source with roxmltree and wraps the resulting tree
    ///
    /// # Errors
    ///
    /// If the source can't be parsed
    pub fn parse(
        &self,
        source: &str,
        options: &crate::parse::Options,
    ) -> Result<Ref<'arena>, Error> {
        let raw = crate::parse::roxmltree::parse(source, options)?;
        self.wrap(Some(&raw))
    }

    fn wrap_node(&self, raw: &RawNode, parent: Option<Ref<'arena>>) -> Result<Ref<'arena>, Error> {
        let attributes = match &raw.attributes {
            RawAttributes::Map(map) => map
                .0
                .iter()
                .map(|(name, value)| Attr::new(name.as_str(), value.as_str()))
                .collect(),
            RawAttributes::Records(records) => records
                .iter()
                .map(|record| match record.name.as_deref() {
                    Some(name) if !name.trim().is_empty() => Ok(Attr::new(name, &*record.value)),
                    _ => Err(Error::InvalidAttribute {
                        value: record.value.clone(),
                    }),
                })
                .collect::<Result<Attributes, _>>()?,
        };
        let node = self.alloc(
            raw.kind.clone(),
            raw.name.clone(),
            attributes,
            raw.value.clone(),
        );
        node.parent.set(parent);

        let children = raw
            .children
            .iter()
            .map(|child| self.wrap_node(child, Some(node)))
            .collect::<Result<Vec<_>, _>>()?;
        *node.children.borrow_mut() = children;
        Ok(node)
    }

    /// Returns a deep copy of the node and its descendants. The copy has no parent.
    ///
    /// [MDN | cloneNode](https://developer.mozilla.org/en-US/docs/Web/API/Node/cloneNode)
    pub fn clone_node(&self, node: &Node<'_>) -> Ref<'arena> {
        self.clone_into(node, None)
    }

    fn clone_into(&self, node: &Node<'_>, parent: Option<Ref<'arena>>) -> Ref<'arena> {
        let clone = self.alloc(
            node.kind().clone(),
            node.name().to_string(),
            node.attributes().clone(),
            node.value(),
        );
        clone.parent.set(parent);
        let children = node
            .children
            .borrow()
            .iter()
            .map(|child| self.clone_into(child, Some(clone)))
            .collect();
        *clone.children.borrow_mut() = children;
        clone
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn wrap_assigns_parents() -> anyhow::Result<()> {
    let raw: RawNode = serde_json::from_str(
        r##"{
            "type": "root",
            "children": [{
                "type": "element",
                "name": "svg",
                "attributes": { "xmlns": "http://www.w3.org/2000/svg", "viewBox": "0 0 10 10" },
                "children": [
                    {
                        "name": "g",
                        "children": [{ "name": "path", "attributes": { "d": "M0 0" } }]
                    },
                    { "type": "text", "value": "hello" }
                ]
            }]
        }"##,
    )?;
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let root = allocator.wrap(Some(&raw))?;

    assert_eq!(root.kind(), &Kind::Root);
    assert!(root.parent().is_none());

    let svg = root.child(0).expect("root should have svg");
    assert!(svg.parent().is_some_and(|parent| parent.ptr_eq(root)));
    assert_eq!(&*svg.name(), "svg");
    assert_eq!(
        svg.attributes().iter().map(Attr::name).collect::<Vec<_>>(),
        vec!["xmlns", "viewBox"]
    );

    let g = svg.child(0).expect("svg should have g");
    let path = g.child(0).expect("g should have path");
    assert!(path.parent().is_some_and(|parent| parent.ptr_eq(g)));
    assert!(g.parent().is_some_and(|parent| parent.ptr_eq(svg)));
    assert!(path.is_empty());

    let text = svg.child(1).expect("svg should have text");
    assert_eq!(text.kind(), &Kind::Text);
    assert_eq!(text.value().as_deref(), Some("hello"));
    Ok(())
}

#[test]
fn wrap_copies_source() -> anyhow::Result<()> {
    let mut raw = RawNode::new(Kind::Element, "rect").with_attribute("fill", "red");
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let rect = allocator.wrap(Some(&raw))?;

    rect.set_attr("fill", "blue");
    raw.name = String::from("circle");

    assert_eq!(&*rect.name(), "rect");
    assert_eq!(rect.attr_value("fill").as_deref(), Some("blue"));
    assert_eq!(
        raw.attributes,
        RawNode::new(Kind::Element, "").with_attribute("fill", "red").attributes
    );
    Ok(())
}

#[test]
fn wrap_missing_tree() {
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);

    let result = allocator.wrap(None);
    assert!(matches!(result, Err(Error::MissingTree)));
    assert_eq!(
        Error::MissingTree.to_string(),
        "Parse failure: no tree was produced for the source"
    );
}

#[test]
#[cfg(feature = "roxmltree")]
fn parse_and_wrap() -> anyhow::Result<()> {
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let options = crate::parse::Options::default();

    let root = allocator.parse(r#"<svg><rect x="1"/></svg>"#, &options)?;
    let rect = root.query_selector("rect").expect("should have rect");
    assert!(rect.closest_elem("svg").is_some());

    let result = allocator.parse("<svg>", &options);
    assert!(matches!(result, Err(Error::Parse(_))));
    assert!(result.is_err_and(|err| err.to_string().starts_with("Parse failure: ")));
    Ok(())
}

#[test]
fn wrap_attribute_records() -> anyhow::Result<()> {
    let raw: RawNode = serde_json::from_str(
        r##"{
            "name": "use",
            "attributes": [
                { "name": "xlink:href", "value": "#a", "prefix": "xlink", "local": "href" },
                { "name": "x", "value": "1" }
            ]
        }"##,
    )?;
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let node = allocator.wrap(Some(&raw))?;

    let href = node.attr("xlink:href").expect("should have href");
    assert_eq!(href.prefix(), "xlink");
    assert_eq!(href.local_name(), "href");
    assert_eq!(href.value(), "#a");

    let unnamed: RawNode = serde_json::from_str(r#"{ "attributes": [{ "value": "1" }] }"#)?;
    assert!(matches!(
        allocator.wrap(Some(&unnamed)),
        Err(Error::InvalidAttribute { .. })
    ));
    Ok(())
}

#[test]
fn clone_node_is_deep_and_detached() -> anyhow::Result<()> {
    let arena = Allocator::new_arena();
    let allocator = Allocator::new(&arena);
    let raw = RawNode::new(Kind::Element, "g")
        .with_child(RawNode::new(Kind::Element, "rect").with_attribute("x", "1"));
    let g = allocator.wrap(Some(&raw))?;
    let rect = g.child(0).expect("g should have rect");

    let copy = allocator.clone_node(g);
    assert!(copy.parent().is_none());
    assert!(!copy.ptr_eq(g));
    let rect_copy = copy.child(0).expect("copy should have rect");
    assert!(rect_copy.parent().is_some_and(|parent| parent.ptr_eq(copy)));

    rect_copy.set_attr("x", "2");
    assert_eq!(rect.attr_value("x").as_deref(), Some("1"));
    assert_ne!(rect.id(), rect_copy.id());
    Ok(())
}
