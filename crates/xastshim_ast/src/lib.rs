//! A mutable element API over parsed XML trees.
//!
//! A parser hands over a tree of [`parse::RawNode`]s, which is wrapped into an
//! [`arena::Arena`]. The wrapped [`node::Node`]s can then be read, queried with a small
//! [`selectors::Selector`] grammar, and restructured with [`tree::splice`] while every child
//! keeps pointing at its parent.
//!
//! ```
//! use xastshim_ast::{arena::Allocator, parse::RawNode, node::Kind};
//!
//! let raw = RawNode::new(Kind::Root, "")
//!     .with_child(RawNode::new(Kind::Element, "svg").with_child(
//!         RawNode::new(Kind::Element, "path").with_attribute("xlink:href", "#a"),
//!     ));
//! let arena = Allocator::new_arena();
//! let allocator = Allocator::new(&arena);
//! let root = allocator.wrap(Some(&raw)).unwrap();
//!
//! let path = root.query_selector("path").unwrap();
//! assert_eq!(path.attr("xlink:href").unwrap().local_name(), "href");
//!
//! let rect = allocator.element("rect", [("width", "10")]);
//! let svg = path.parent().unwrap();
//! let removed = svg.splice_content(0, 1, rect).unwrap();
//! assert!(removed[0].parent().is_none());
//! assert!(rect.parent().unwrap().ptr_eq(svg));
//! ```
pub mod arena;
pub mod attribute;
pub mod error;
pub mod node;
pub mod parse;
pub mod selectors;
pub mod tree;

#[cfg(test)]
#[ctor::ctor]
fn init_test() {
    let _ = env_logger::builder().is_test(true).try_init();
}
