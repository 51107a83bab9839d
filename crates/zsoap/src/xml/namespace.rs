//! Namespace bindings and prefix resolution
//!
//! Every [`Element`] carries the bindings inherited from its ancestors and the
//! bindings in scope at the element itself (inherited plus its own `xmlns`
//! declarations). Declaring a namespace refreshes the bindings of the whole
//! subtree, so a prefix redeclared on a descendant shadows the ancestor's
//! binding only below that descendant.

use indexmap::IndexMap;
use std::sync::Arc;

use super::model::Element;

/// Attribute name used for namespace declarations
pub const XMLNS: &str = "xmlns";

/// Prefix → namespace URI bindings; the default namespace uses the empty prefix
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespaces(IndexMap<String, String>);

impl Namespaces {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// URI bound to `prefix` (`""` for the default namespace)
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    /// Innermost prefix bound to `uri`
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    fn bind(&mut self, prefix: &str, uri: &str) {
        // move a redeclared prefix to the end so it wins reverse lookups
        self.0.shift_remove(prefix);
        self.0.insert(prefix.to_string(), uri.to_string());
    }

    /// Bindings in effect after applying the `xmlns` declarations among `attributes`
    pub(crate) fn extended(
        inherited: &Arc<Self>,
        attributes: &IndexMap<String, String>,
    ) -> Arc<Self> {
        let mut declarations = attributes
            .iter()
            .filter_map(|(name, uri)| declared_prefix(name).map(|prefix| (prefix, uri)))
            .peekable();
        if declarations.peek().is_none() {
            return Arc::clone(inherited);
        }
        let mut scope = Self::clone(inherited);
        for (prefix, uri) in declarations {
            scope.bind(prefix, uri);
        }
        Arc::new(scope)
    }
}

/// Prefix declared by an attribute name: `xmlns` → `""`, `xmlns:p` → `"p"`
pub fn declared_prefix(attribute: &str) -> Option<&str> {
    if attribute == XMLNS {
        Some("")
    } else {
        attribute.strip_prefix("xmlns:")
    }
}

/// Attribute name declaring `prefix`
pub fn declaration_name(prefix: &str) -> String {
    if prefix.is_empty() {
        XMLNS.to_string()
    } else {
        format!("{XMLNS}:{prefix}")
    }
}

impl Element {
    /// Namespace bindings visible at this element
    pub fn namespaces(&self) -> &Namespaces {
        &self.scope
    }

    /// Prefix bound to `uri` in scope (`""` when it is the default namespace)
    pub fn lookup_prefix(&self, uri: &str) -> Option<&str> {
        self.scope.prefix_for(uri)
    }

    /// URI bound to `prefix` in scope
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.scope.get(prefix)
    }

    /// Namespace URI of this element's own tag
    pub fn namespace_uri(&self) -> Option<&str> {
        self.lookup_namespace(self.name.prefix().unwrap_or_default())
    }

    /// Declare `prefix` (or the default namespace when `None`) on this element
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        let name = declaration_name(prefix.unwrap_or_default());
        self.attributes.insert(name, uri.to_string());
        self.refresh_scope();
    }

    /// Prefix for `uri`, declaring it on this element when unbound.
    /// The hint is used when free, otherwise `ns0`, `ns1`, ... is generated.
    pub fn ensure_prefix(&mut self, uri: &str, hint: Option<&str>) -> String {
        if let Some(prefix) = self.lookup_prefix(uri) {
            return prefix.to_string();
        }
        let prefix = match hint {
            Some(hint) if self.lookup_namespace(hint).is_none() => hint.to_string(),
            _ => (0usize..)
                .map(|n| format!("ns{n}"))
                .find(|candidate| self.lookup_namespace(candidate).is_none())
                .unwrap_or_default(),
        };
        self.declare_namespace(Some(&prefix), uri);
        prefix
    }

    pub(crate) fn refresh_scope(&mut self) {
        let inherited = Arc::clone(&self.inherited);
        self.rebase(&inherited);
    }

    /// Re-evaluate bindings for this subtree under new inherited bindings
    pub(crate) fn rebase(&mut self, inherited: &Arc<Namespaces>) {
        self.inherited = Arc::clone(inherited);
        self.scope = Namespaces::extended(inherited, &self.attributes);
        let scope = Arc::clone(&self.scope);
        for child in self.elements_mut() {
            child.rebase(&scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_names() {
        assert_eq!(declared_prefix("xmlns"), Some(""));
        assert_eq!(declared_prefix("xmlns:soap"), Some("soap"));
        assert_eq!(declared_prefix("xsi:nil"), None);
        assert_eq!(declaration_name(""), "xmlns");
        assert_eq!(declaration_name("qmw"), "xmlns:qmw");
    }

    #[test]
    fn test_children_inherit_bindings() {
        let mut root = Element::new("root");
        root.declare_namespace(Some("a"), "urn:a");
        let child = root.append_child("a:child");
        assert_eq!(child.lookup_prefix("urn:a"), Some("a"));
        assert_eq!(child.namespace_uri(), Some("urn:a"));
    }

    #[test]
    fn test_redeclaration_shadows_only_subtree() {
        let mut root = Element::new("root");
        root.declare_namespace(Some("p"), "urn:outer");
        let inner = root.append_child("inner");
        inner.declare_namespace(Some("p"), "urn:inner");
        inner.append_child("leaf");
        root.append_child("sibling");

        let inner = root.child("inner");
        let leaf = inner.and_then(|e| e.child("leaf"));
        let sibling = root.child("sibling");
        assert_eq!(leaf.and_then(|e| e.lookup_namespace("p")), Some("urn:inner"));
        assert_eq!(sibling.and_then(|e| e.lookup_namespace("p")), Some("urn:outer"));
        assert_eq!(leaf.and_then(|e| e.lookup_prefix("urn:outer")), None);
    }

    #[test]
    fn test_declaring_on_ancestor_reaches_existing_descendants() {
        let mut root = Element::new("root");
        root.append_child("a").append_child("b");
        root.declare_namespace(None, "urn:default");

        let b = root.child("a").and_then(|a| a.child("b"));
        assert_eq!(b.and_then(|b| b.lookup_prefix("urn:default")), Some(""));
    }

    #[test]
    fn test_ensure_prefix_reuses_or_generates() {
        let mut root = Element::new("root");
        root.declare_namespace(Some("x"), "urn:x");
        assert_eq!(root.ensure_prefix("urn:x", Some("other")), "x");
        assert_eq!(root.ensure_prefix("urn:y", Some("y")), "y");
        assert_eq!(root.ensure_prefix("urn:z", Some("x")), "ns0");
        assert_eq!(root.attribute("xmlns:ns0"), Some("urn:z"));
    }
}
