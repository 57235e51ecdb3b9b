//! Traversal and structural mutation of wrapped trees.
use std::ops::ControlFlow;

use itertools::Itertools;

use crate::{
    error::Error,
    node::{Node, Ref},
};

#[derive(Debug, Clone, Default)]
/// Zero or more nodes to insert with [`splice`].
///
/// Nested lists are flattened in order, and [`Items::Empty`] entries are discarded.
pub enum Items<'arena> {
    #[default]
    /// No node, e.g. for a pure removal
    Empty,
    /// A single node
    One(Ref<'arena>),
    /// A list of nodes or further lists
    Many(Vec<Items<'arena>>),
}

impl<'arena> Items<'arena> {
    fn flatten_into(self, nodes: &mut Vec<Ref<'arena>>) {
        match self {
            Self::Empty => {}
            Self::One(node) => nodes.push(node),
            Self::Many(items) => {
                for item in items {
                    item.flatten_into(nodes);
                }
            }
        }
    }

    /// Returns the nodes in insertion order
    pub fn flatten(self) -> Vec<Ref<'arena>> {
        let mut nodes = Vec::new();
        self.flatten_into(&mut nodes);
        nodes
    }
}

impl<'arena> From<Ref<'arena>> for Items<'arena> {
    fn from(value: Ref<'arena>) -> Self {
        Self::One(value)
    }
}

impl<'arena> From<Option<Ref<'arena>>> for Items<'arena> {
    fn from(value: Option<Ref<'arena>>) -> Self {
        value.map_or(Self::Empty, Self::One)
    }
}

impl<'arena> From<Vec<Ref<'arena>>> for Items<'arena> {
    fn from(value: Vec<Ref<'arena>>) -> Self {
        Self::Many(value.into_iter().map(Self::One).collect())
    }
}

impl<'arena> From<Vec<Items<'arena>>> for Items<'arena> {
    fn from(value: Vec<Items<'arena>>) -> Self {
        Self::Many(value)
    }
}

/// Visits `node`, then each of its descendants depth-first in document order.
///
/// Each child list is read before its children are visited, so the visitor may mutate the tree
/// without invalidating the walk. Returning [`ControlFlow::Break`] stops the traversal.
pub fn traverse<'arena, F>(node: Ref<'arena>, visit: &mut F) -> ControlFlow<()>
where
    F: FnMut(Ref<'arena>) -> ControlFlow<()>,
{
    visit(node)?;
    for child in node.children() {
        traverse(child, visit)?;
    }
    ControlFlow::Continue(())
}

/// Removes `remove_count` children of `parent` starting at `start`, and inserts `items` in their
/// place. Returns the removed children, which no longer have a parent.
///
/// An out of range `start` appends to the children, and `remove_count` is clamped to the
/// available children. Inserted nodes are detached from any previous parent and have their parent
/// set to `parent` in the same step.
///
/// # Errors
///
/// If `parent` or one of its ancestors is being inserted, since the tree would become cyclic.
pub fn splice<'arena>(
    parent: Ref<'arena>,
    start: usize,
    remove_count: usize,
    items: impl Into<Items<'arena>>,
) -> Result<Vec<Ref<'arena>>, Error> {
    let inserted: Vec<_> = items
        .into()
        .flatten()
        .into_iter()
        .unique_by(|node| node.id())
        .collect();
    if inserted.iter().any(|node| node.contains(parent)) {
        return Err(Error::HierarchyRequest);
    }
    let is_inserted = |child: Ref<'arena>| inserted.iter().any(|node| node.ptr_eq(child));

    for node in &inserted {
        if let Some(previous_parent) = node.parent.get() {
            if !previous_parent.ptr_eq(parent) {
                previous_parent
                    .children
                    .borrow_mut()
                    .retain(|sibling| !sibling.ptr_eq(node));
            }
        }
    }

    let mut children = parent.children.borrow_mut();
    let len = children.len();
    let start = start.min(len);
    let end = start.saturating_add(remove_count).min(len);
    let removed: Vec<_> = children[start..end]
        .iter()
        .copied()
        .filter(|child| !is_inserted(*child))
        .collect();

    let mut spliced = Vec::with_capacity(len - removed.len() + inserted.len());
    spliced.extend(children[..start].iter().copied().filter(|child| !is_inserted(*child)));
    spliced.extend(inserted.iter().copied());
    spliced.extend(children[end..].iter().copied().filter(|child| !is_inserted(*child)));
    *children = spliced;
    for node in &inserted {
        node.parent.set(Some(parent));
    }
    drop(children);

    for node in &removed {
        node.parent.set(None);
    }
    log::trace!(
        "spliced node {}: removed {} and inserted {} children at {start}",
        parent.id(),
        removed.len(),
        inserted.len(),
    );
    Ok(removed)
}

impl<'arena> Node<'arena> {
    /// Visits this node, then each of its descendants. See [`traverse`].
    pub fn traverse<F>(&'arena self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(Ref<'arena>) -> ControlFlow<()>,
    {
        traverse(self, &mut visit)
    }

    /// Replaces a range of this node's children. See [`splice`].
    ///
    /// # Errors
    ///
    /// If this node or one of its ancestors is being inserted
    pub fn splice_content(
        &'arena self,
        start: usize,
        remove_count: usize,
        items: impl Into<Items<'arena>>,
    ) -> Result<Vec<Ref<'arena>>, Error> {
        splice(self, start, remove_count, items)
    }

    /// Adds a node to the end of the list of children of this node.
    ///
    /// [MDN | appendChild](https://developer.mozilla.org/en-US/docs/Web/API/Node/appendChild)
    ///
    /// # Errors
    ///
    /// If this node or one of its ancestors is being inserted
    pub fn append_child(&'arena self, child: Ref<'arena>) -> Result<(), Error> {
        splice(self, usize::MAX, 0, child).map(|_| ())
    }

    /// Removes the node from its parent and clears the reference to the parent
    ///
    /// [MDN | remove](https://developer.mozilla.org/en-US/docs/Web/API/Element/remove)
    pub fn remove(&self) {
        let Some(parent) = self.parent.get() else {
            return;
        };
        parent
            .children
            .borrow_mut()
            .retain(|sibling| !sibling.ptr_eq(self));
        self.parent.set(None);
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{arena::Allocator, node::Kind, parse::RawNode};

    fn names(nodes: &[Ref<'_>]) -> Vec<String> {
        nodes.iter().map(|node| node.name().to_string()).collect()
    }

    fn assert_parent(parent: Ref<'_>) {
        for child in parent.children() {
            assert!(
                child.parent().is_some_and(|p| p.ptr_eq(parent)),
                "{} should be parented by {}",
                child.formatter(),
                parent.formatter()
            );
            assert_parent(child);
        }
    }

    fn element(name: &str) -> RawNode {
        RawNode::new(Kind::Element, name)
    }

    #[test]
    fn traverse_pre_order() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(
            &element("svg")
                .with_child(element("g").with_child(element("a")).with_child(element("b")))
                .with_child(element("c")),
        ))?;

        let mut visited = vec![];
        let flow = root.traverse(|node| {
            visited.push(node);
            ControlFlow::Continue(())
        });
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(names(&visited), vec!["svg", "g", "a", "b", "c"]);

        // restartable
        let mut again = vec![];
        let _ = traverse(root, &mut |node| {
            again.push(node);
            ControlFlow::Continue(())
        });
        assert_eq!(names(&again), names(&visited));

        let mut until_b = vec![];
        let flow = root.traverse(|node| {
            until_b.push(node);
            if &*node.name() == "b" {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(names(&until_b), vec!["svg", "g", "a", "b"]);
        Ok(())
    }

    #[test]
    fn traverse_while_mutating() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(
            &element("svg")
                .with_child(element("a"))
                .with_child(element("b")),
        ))?;

        let mut visited = vec![];
        let _ = root.traverse(|node| {
            visited.push(node.name().to_string());
            if &*node.name() == "a" {
                node.remove();
            }
            ControlFlow::Continue(())
        });
        assert_eq!(visited, vec!["svg", "a", "b"]);
        assert_eq!(names(&root.children()), vec!["b"]);
        Ok(())
    }

    #[test]
    fn splice_replaces_range() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(
            &element("svg")
                .with_child(element("a"))
                .with_child(element("b"))
                .with_child(element("c"))
                .with_child(element("d")),
        ))?;
        let b = root.child(1).expect("should have b");
        let x = allocator.element("x", [("id", "x")]);
        let y = allocator.element("y", [("id", "y")]);

        let removed = root.splice_content(1, 2, vec![x, y])?;
        assert_eq!(names(&removed), vec!["b", "c"]);
        assert!(b.parent().is_none());
        assert_eq!(names(&root.children()), vec!["a", "x", "y", "d"]);
        assert!(x.parent().is_some_and(|parent| parent.ptr_eq(root)));
        assert!(y.parent().is_some_and(|parent| parent.ptr_eq(root)));
        assert_parent(root);
        Ok(())
    }

    #[test]
    fn splice_edge_cases() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(
            &element("svg").with_child(element("a")).with_child(element("b")),
        ))?;

        // pure insertion
        let x = allocator.element("x", [("id", "x")]);
        assert!(root.splice_content(1, 0, x)?.is_empty());
        assert_eq!(names(&root.children()), vec!["a", "x", "b"]);

        // pure deletion
        let removed = root.splice_content(0, 1, Items::Empty)?;
        assert_eq!(names(&removed), vec!["a"]);
        assert_eq!(names(&root.children()), vec!["x", "b"]);

        // out of range start appends, removal count is clamped
        let z = allocator.element("z", [("id", "z")]);
        assert!(root.splice_content(10, 5, Some(z))?.is_empty());
        assert_eq!(names(&root.children()), vec!["x", "b", "z"]);

        // nested lists are flattened and empty entries discarded
        let p = allocator.element("p", [("id", "p")]);
        let q = allocator.element("q", [("id", "q")]);
        let r = allocator.text("r");
        root.splice_content(
            0,
            0,
            vec![
                Items::from(p),
                Items::Empty,
                Items::from(vec![q, r]),
                Items::from(None),
            ],
        )?;
        assert_eq!(names(&root.children()), vec!["p", "q", "", "x", "b", "z"]);
        assert_parent(root);
        Ok(())
    }

    #[test]
    fn splice_moves_between_parents() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(
            &element("svg")
                .with_child(element("g").with_child(element("a")).with_child(element("b")))
                .with_child(element("defs")),
        ))?;
        let g = root.child(0).expect("should have g");
        let defs = root.child(1).expect("should have defs");
        let a = g.child(0).expect("should have a");

        defs.splice_content(0, 0, a)?;
        assert_eq!(names(&g.children()), vec!["b"]);
        assert_eq!(names(&defs.children()), vec!["a"]);
        assert!(a.parent().is_some_and(|parent| parent.ptr_eq(defs)));

        // moving within the same parent keeps one copy
        let b = g.child(0).expect("should have b");
        defs.append_child(b)?;
        root.splice_content(0, 0, vec![defs, defs])?;
        assert_eq!(names(&root.children()), vec!["defs", "g"]);
        assert_eq!(names(&defs.children()), vec!["a", "b"]);
        assert!(g.is_empty());
        assert_parent(root);
        Ok(())
    }

    #[test]
    fn splice_rejects_cycles() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&element("svg").with_child(element("g"))))?;
        let g = root.child(0).expect("should have g");

        assert!(matches!(
            g.splice_content(0, 0, root),
            Err(Error::HierarchyRequest)
        ));
        assert!(matches!(
            g.splice_content(0, 0, g),
            Err(Error::HierarchyRequest)
        ));
        assert_eq!(names(&root.children()), vec!["g"]);
        assert!(g.is_empty());
        Ok(())
    }

    #[test]
    fn remove_detaches() -> anyhow::Result<()> {
        let arena = Allocator::new_arena();
        let allocator = Allocator::new(&arena);
        let root = allocator.wrap(Some(&element("svg").with_child(element("g"))))?;
        let g = root.child(0).expect("should have g");

        g.remove();
        assert!(root.is_empty());
        assert!(g.parent().is_none());
        // removing a detached node does nothing
        g.remove();
        Ok(())
    }
}
