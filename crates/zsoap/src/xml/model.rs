//! XML data model

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use super::namespace::{declared_prefix, Namespaces};

/// Qualified tag name: optional prefix plus local name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.to_string(),
        }
    }

    /// Split `prefix:local`
    pub fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) => Self::new(Some(prefix), local),
            None => Self::new(None, name),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    /// Match against `local` or an exact `prefix:local`
    pub fn matches(&self, name: &str) -> bool {
        match name.split_once(':') {
            Some((prefix, local)) => self.prefix() == Some(prefix) && self.local == local,
            None => self.local == name,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Content of an element in document order, borrowed from it
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Node<'a> {
    Element(&'a Element),
    Text(&'a str),
}

/// Slot in the content order; the n-th `Element` slot is the n-th child element
#[derive(Clone, Debug, PartialEq, Eq)]
enum Content {
    Element,
    Text(String),
}

/// XML element
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub(crate) name: QName,
    pub(crate) attributes: IndexMap<String, String>,
    elements: Vec<Element>,
    content: Vec<Content>,
    pub(crate) inherited: Arc<Namespaces>,
    pub(crate) scope: Arc<Namespaces>,
}

impl Element {
    /// Create a detached element; `name` may carry a prefix (`soap:Body`)
    pub fn new(name: &str) -> Self {
        let root = Arc::new(Namespaces::new());
        Self {
            name: QName::parse(name),
            attributes: IndexMap::new(),
            elements: Vec::new(),
            content: Vec::new(),
            inherited: Arc::clone(&root),
            scope: root,
        }
    }

    /// Create a detached element declaring `uri` under `prefix`
    /// (as the default namespace when `prefix` is `None`)
    pub fn with_namespace(name: &str, uri: &str, prefix: Option<&str>) -> Self {
        let mut element = Self::new(name);
        element.declare_namespace(prefix, uri);
        element
    }

    pub(crate) fn from_parts(
        name: QName,
        attributes: IndexMap<String, String>,
        inherited: &Arc<Namespaces>,
    ) -> Self {
        let scope = Namespaces::extended(inherited, &attributes);
        Self {
            name,
            attributes,
            elements: Vec::new(),
            content: Vec::new(),
            inherited: Arc::clone(inherited),
            scope,
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        self.name.local()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.prefix()
    }

    /// Tag as written, `prefix:local` or `local`
    pub fn tag(&self) -> String {
        self.name.to_string()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = QName::parse(name);
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set an attribute; `xmlns` declarations take effect for the whole subtree
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(name.to_string(), value.into());
        if declared_prefix(name).is_some() {
            self.refresh_scope();
        }
        self
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let removed = self.attributes.shift_remove(name);
        if removed.is_some() && declared_prefix(name).is_some() {
            self.refresh_scope();
        }
        removed
    }

    /// Concatenated text children
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| match content {
                Content::Text(text) => Some(text.as_str()),
                Content::Element => None,
            })
            .collect()
    }

    pub fn has_text(&self) -> bool {
        self.content
            .iter()
            .any(|content| matches!(content, Content::Text(_)))
    }

    /// Replace all text children with `text`
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.content
            .retain(|content| matches!(content, Content::Element));
        let text = text.into();
        if !text.is_empty() {
            self.content.insert(0, Content::Text(text));
        }
        self
    }

    pub fn append_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.content.push(Content::Text(text.into()));
        self
    }

    /// Drop whitespace-only text runs when the element also has child elements
    pub(crate) fn drop_layout_text(&mut self) {
        if !self.elements.is_empty() {
            self.content.retain(
                |content| !matches!(content, Content::Text(text) if text.trim().is_empty()),
            );
        }
    }

    /// Child elements and text in document order
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> {
        let mut elements = self.elements.iter();
        self.content
            .iter()
            .filter_map(move |content| match content {
                Content::Element => elements.next().map(Node::Element),
                Content::Text(text) => Some(Node::Text(text)),
            })
    }

    /// True when the element has neither child elements nor text
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Direct child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.elements.iter()
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.elements.iter_mut()
    }

    /// Direct child elements whose tag matches `name` (local name, or `prefix:local`)
    pub fn children_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Self> + 'n
    where
        'a: 'n,
    {
        self.elements
            .iter()
            .filter(move |element| element.name.matches(name))
    }

    /// First direct child element matching `name`
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.elements.iter().find(|element| element.name.matches(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.elements
            .iter_mut()
            .find(|element| element.name.matches(name))
    }

    pub fn first_element(&self) -> Option<&Self> {
        self.elements.first()
    }

    /// Append a new child element and return it for chaining
    pub fn append_child(&mut self, name: &str) -> &mut Self {
        let child = Self::from_parts(QName::parse(name), IndexMap::new(), &self.scope);
        self.push_element(child)
    }

    /// Append `element` (moved) under this element, re-evaluating its bindings here
    pub fn append_element(&mut self, mut element: Self) -> &mut Self {
        element.rebase(&self.scope);
        self.push_element(element)
    }

    /// Insert `element` as the first child
    #[allow(clippy::indexing_slicing)]
    pub fn prepend_element(&mut self, mut element: Self) -> &mut Self {
        element.rebase(&self.scope);
        self.elements.insert(0, element);
        self.content.insert(0, Content::Element);
        &mut self.elements[0]
    }

    /// Append a child whose bindings are already evaluated under this element
    #[allow(clippy::indexing_slicing)]
    pub(crate) fn push_element(&mut self, element: Self) -> &mut Self {
        let index = self.elements.len();
        self.elements.push(element);
        self.content.push(Content::Element);
        &mut self.elements[index]
    }

    /// Remove and return the direct child elements matching `name`
    pub fn take_children_named(&mut self, name: &str) -> Vec<Self> {
        let mut elements = std::mem::take(&mut self.elements).into_iter();
        let mut taken = Vec::new();
        let mut kept = Vec::new();
        self.content.retain(|content| match content {
            Content::Text(_) => true,
            Content::Element => match elements.next() {
                Some(element) if element.name.matches(name) => {
                    taken.push(element);
                    false
                }
                Some(element) => {
                    kept.push(element);
                    true
                }
                None => false,
            },
        });
        self.elements = kept;
        taken
    }

    /// Consume the element, yielding its direct child elements
    pub fn into_elements(self) -> impl Iterator<Item = Self> {
        self.elements.into_iter()
    }

    /// Depth-first iterator over this element and all descendants
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order walk over an element subtree
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        let before = self.stack.len();
        self.stack.extend(element.elements());
        if let Some(pushed) = self.stack.get_mut(before..) {
            pushed.reverse();
        }
        Some(element)
    }
}
