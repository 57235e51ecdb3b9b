//! Attribute records and the collection of attributes owned by a node.
use std::fmt::Display;

use smallvec::SmallVec;

/// Represents one of an element's attributes.
///
/// The qualified name is split on its first `:` when the record is created, so the prefix and
/// local name always agree with it.
///
/// [MDN | Attr](https://developer.mozilla.org/en-US/docs/Web/API/Attr)
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub struct Attr {
    name: String,
    /// Byte offset of the first `:` in `name`
    separator: Option<usize>,
    value: String,
}

impl Attr {
    /// Creates an attribute record from a qualified name, such as `xlink:href`, and its value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let separator = name.find(':');
        Self {
            name,
            separator,
            value: value.into(),
        }
    }

    /// Returns the qualified name of an attribute.
    ///
    /// [MDN | name](https://developer.mozilla.org/en-US/docs/Web/API/Attr/name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the local part of the qualified name of an attribute.
    ///
    /// [MDN | localName](https://developer.mozilla.org/en-US/docs/Web/API/Attr/localName)
    pub fn local_name(&self) -> &str {
        match self.separator {
            Some(index) => &self.name[index + 1..],
            None => &self.name,
        }
    }

    /// Returns the namespace prefix of the attribute, or an empty string when there is none.
    ///
    /// [MDN | prefix](https://developer.mozilla.org/en-US/docs/Web/API/Attr/prefix)
    pub fn prefix(&self) -> &str {
        self.separator.map_or("", |index| &self.name[..index])
    }

    /// Returns the value of the attribute.
    ///
    /// [MDN | value](https://developer.mozilla.org/en-US/docs/Web/API/Attr/value)
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Overwrites the value of the attribute with a new one, returning the old value.
    pub fn set_value(&mut self, value: impl Into<String>) -> String {
        std::mem::replace(&mut self.value, value.into())
    }
}

impl Display for Attr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}=\"{}\"", self.name, self.value))
    }
}

/// A representation of a collection of [Attr] objects, keyed by qualified name.
///
/// Attributes keep the order they were first inserted in. Overwriting an attribute keeps its
/// position.
///
/// [MDN | NamedNodeMap](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap)
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Attributes(SmallVec<[Attr; 4]>);

impl Attributes {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of attributes stored in the collection.
    ///
    /// [MDN | length](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap/length)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are any attributes stored in the collection
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|attr| attr.name() == name)
    }

    /// Returns an attribute corresponding to the given qualified name.
    ///
    /// [MDN | getNamedItem](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap/getNamedItem)
    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.0.iter().find(|attr| attr.name() == name)
    }

    /// See [`Attributes::get`]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attr> {
        self.0.iter_mut().find(|attr| attr.name() == name)
    }

    /// Returns the first attribute with the given local name, regardless of prefix
    pub fn get_local(&self, local_name: &str) -> Option<&Attr> {
        self.0.iter().find(|attr| attr.local_name() == local_name)
    }

    /// Returns whether an attribute with the given qualified name exists, and when `value` is
    /// given, whether its value is exactly equal.
    pub fn has(&self, name: &str, value: Option<&str>) -> bool {
        match (self.get(name), value) {
            (Some(attr), Some(value)) => attr.value() == value,
            (found, None) => found.is_some(),
            (None, Some(_)) => false,
        }
    }

    /// Like [`Attributes::has`], but finds the attribute by local name regardless of prefix.
    pub fn has_local(&self, local_name: &str, value: Option<&str>) -> bool {
        match (self.get_local(local_name), value) {
            (Some(attr), Some(value)) => attr.value() == value,
            (found, None) => found.is_some(),
            (None, Some(_)) => false,
        }
    }

    /// Creates an attribute from the given name and value and puts it in the collection,
    /// returning the attribute it replaced.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Option<Attr> {
        self.set_record(Attr::new(name, value))
    }

    /// Puts the attribute in the collection under its own qualified name. If there's already an
    /// attribute with the same name, it is replaced in place.
    ///
    /// [MDN | setNamedItem](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap/setNamedItem)
    pub fn set_record(&mut self, attr: Attr) -> Option<Attr> {
        match self.position(attr.name()) {
            Some(index) => Some(std::mem::replace(&mut self.0[index], attr)),
            None => {
                self.0.push(attr);
                None
            }
        }
    }

    /// Removes the attribute corresponding to the given name from the collection.
    ///
    /// [MDN | removeNamedItem](https://developer.mozilla.org/en-US/docs/Web/API/NamedNodeMap/removeNamedItem)
    pub fn remove(&mut self, name: &str) -> Option<Attr> {
        let index = self.position(name)?;
        Some(self.0.remove(index))
    }

    /// Keeps only the attributes the callback returns `true` for
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&mut Attr) -> bool,
    {
        self.0.retain(f);
    }

    /// Returns an iterator over each attribute, in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attr> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attr;
    type IntoIter = std::slice::Iter<'a, Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Attr> for Attributes {
    fn from_iter<T: IntoIterator<Item = Attr>>(iter: T) -> Self {
        let mut attributes = Self::new();
        for attr in iter {
            attributes.set_record(attr);
        }
        attributes
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[test]
fn attr_splits_qualified_name() {
    let href = Attr::new("xlink:href", "#a");
    assert_eq!(href.prefix(), "xlink");
    assert_eq!(href.local_name(), "href");
    assert_eq!(href.value(), "#a");
    assert_eq!(
        format!("{}:{}", href.prefix(), href.local_name()),
        href.name()
    );

    let fill = Attr::new("fill", "red");
    assert_eq!(fill.prefix(), "");
    assert_eq!(fill.local_name(), "fill");

    // only the first `:` separates the prefix
    let odd = Attr::new("a:b:c", "");
    assert_eq!(odd.prefix(), "a");
    assert_eq!(odd.local_name(), "b:c");
}

#[test]
fn attributes_set_overwrites_in_place() {
    let mut attributes = Attributes::new();
    assert_eq!(attributes.set("id", "a"), None);
    attributes.set("fill", "red");
    let replaced = attributes.set("id", "b");

    assert_eq!(replaced, Some(Attr::new("id", "a")));
    assert_eq!(attributes.len(), 2);
    assert_eq!(
        attributes.iter().map(Attr::name).collect::<Vec<_>>(),
        vec!["id", "fill"]
    );
    assert_eq!(attributes.get("id").map(Attr::value), Some("b"));
}

#[test]
fn attributes_set_record_trusts_name() {
    let mut attributes = Attributes::new();
    attributes.set_record(Attr::new("xml:space", "preserve"));

    let attr = attributes.get("xml:space");
    assert_eq!(attr.map(Attr::prefix), Some("xml"));
    assert_eq!(attr.map(Attr::local_name), Some("space"));
    assert_eq!(
        attributes.get_local("space").map(Attr::name),
        Some("xml:space")
    );
}

#[test]
fn attributes_has() {
    let attributes: Attributes = [Attr::new("fill", "url(#grad1)")].into_iter().collect();

    assert!(attributes.has("fill", None));
    assert!(attributes.has("fill", Some("url(#grad1)")));
    assert!(!attributes.has("fill", Some("url(#grad2)")));
    assert!(!attributes.has("fill", Some("URL(#grad1)")));
    assert!(!attributes.has("stroke", None));
    assert!(!attributes.has("stroke", Some("url(#grad1)")));
}

#[test]
fn attributes_has_local() {
    let attributes: Attributes = [Attr::new("xlink:href", "#a")].into_iter().collect();

    assert!(attributes.has_local("href", None));
    assert!(attributes.has_local("href", Some("#a")));
    assert!(!attributes.has_local("href", Some("#b")));
    assert!(!attributes.has_local("xlink", None));
    assert!(!attributes.has("href", None));
}

#[test]
fn attributes_remove() {
    let mut attributes: Attributes = [Attr::new("a", "1"), Attr::new("b", "2")]
        .into_iter()
        .collect();

    assert_eq!(attributes.remove("c"), None);
    assert_eq!(attributes.remove("a"), Some(Attr::new("a", "1")));
    assert_eq!(attributes.len(), 1);
    assert!(!attributes.has("a", None));
}
