//! Namespace bindings for XPath expressions.
//!
//! The table maps a namespace name (URI) to the prefix used for it in
//! expressions. Each URI has at most one prefix; several URIs may share a prefix.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Map from namespace URI to prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceBindings {
    bindings: HashMap<String, String>,
}

impl NamespaceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `namespace_uri`, replacing any earlier prefix for that URI.
    pub fn add_binding(&mut self, namespace_uri: impl Into<String>, prefix: impl Into<String>) {
        self.bindings.insert(namespace_uri.into(), prefix.into());
    }

    /// Bulk union with `bindings`; `None` leaves the table unchanged.
    pub fn add_all_bindings(&mut self, bindings: Option<&HashMap<String, String>>) {
        if let Some(bindings) = bindings {
            self.bindings
                .extend(bindings.iter().map(|(uri, prefix)| (uri.clone(), prefix.clone())));
        }
    }

    pub fn prefix_for(&self, namespace_uri: &str) -> Option<&str> {
        self.bindings.get(namespace_uri).map(String::as_str)
    }

    /// Reverse lookup by linear scan.
    ///
    /// When several URIs share `prefix` the result is whichever the scan meets
    /// first, which is unspecified. Tables used for lookup by prefix should keep
    /// prefixes unique.
    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(_, bound)| bound.as_str() == prefix)
            .map(|(uri, _)| uri.as_str())
    }

    /// Prefixes bound to `namespace_uri` (zero or one)
    pub fn prefixes_for(&self, namespace_uri: &str) -> impl Iterator<Item = &str> {
        self.prefix_for(namespace_uri).into_iter()
    }

    /// Read-only view of every binding
    pub fn all_bindings(&self) -> &HashMap<String, String> {
        &self.bindings
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Prefix-to-URI pairs sorted by prefix, the shape XPath engines register.
    /// Duplicate prefixes are dropped after their first URI.
    pub(crate) fn prefix_declarations(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<(&str, &str)> = self
            .bindings
            .iter()
            .map(|(uri, prefix)| (prefix.as_str(), uri.as_str()))
            .collect();
        pairs.sort();
        pairs.dedup_by(|a, b| a.0 == b.0);
        pairs
    }
}

impl<U: Into<String>, P: Into<String>> Extend<(U, P)> for NamespaceBindings {
    fn extend<I: IntoIterator<Item = (U, P)>>(&mut self, iter: I) {
        for (uri, prefix) in iter {
            self.add_binding(uri, prefix);
        }
    }
}

impl<U: Into<String>, P: Into<String>> FromIterator<(U, P)> for NamespaceBindings {
    fn from_iter<I: IntoIterator<Item = (U, P)>>(iter: I) -> Self {
        let mut bindings = NamespaceBindings::new();
        bindings.extend(iter);
        bindings
    }
}

impl From<HashMap<String, String>> for NamespaceBindings {
    fn from(bindings: HashMap<String, String>) -> Self {
        Self { bindings }
    }
}

impl fmt::Display for NamespaceBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NamespaceBindings:")?;
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort();
        for (uri, prefix) in entries {
            writeln!(f, "  {} = {}", prefix, uri)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GML: &str = "http://www.opengis.net/gml/3.2";
    const WFS: &str = "http://www.opengis.net/wfs/2.0";

    #[test]
    fn test_add_binding_replaces_prefix() {
        let mut ns = NamespaceBindings::new();
        ns.add_binding(GML, "gml");
        assert_eq!(ns.prefix_for(GML), Some("gml"));

        ns.add_binding(GML, "gml32");
        assert_eq!(ns.prefix_for(GML), Some("gml32"));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_unknown_lookups_are_absent() {
        let ns = NamespaceBindings::new();
        assert_eq!(ns.prefix_for(GML), None);
        assert_eq!(ns.uri_for_prefix("gml"), None);
        assert_eq!(ns.prefixes_for(GML).count(), 0);
    }

    #[test]
    fn test_reverse_lookup() {
        let ns: NamespaceBindings = [(GML, "gml"), (WFS, "wfs")].into_iter().collect();
        assert_eq!(ns.uri_for_prefix("wfs"), Some(WFS));
        assert_eq!(ns.uri_for_prefix("gml"), Some(GML));
        assert_eq!(ns.prefixes_for(WFS).collect::<Vec<_>>(), vec!["wfs"]);
    }

    #[test]
    fn test_shared_prefix_returns_one_of_the_uris() {
        let ns: NamespaceBindings = [(GML, "x"), (WFS, "x")].into_iter().collect();
        let found = ns.uri_for_prefix("x").unwrap();
        assert!(found == GML || found == WFS);
    }

    #[test]
    fn test_add_all_bindings() {
        let mut ns = NamespaceBindings::new();
        ns.add_all_bindings(None);
        assert!(ns.is_empty());

        let mut extra = HashMap::new();
        extra.insert(GML.to_string(), "gml".to_string());
        extra.insert(WFS.to_string(), "wfs".to_string());
        ns.add_binding(GML, "old");
        ns.add_all_bindings(Some(&extra));

        assert_eq!(ns.len(), 2);
        assert_eq!(ns.prefix_for(GML), Some("gml"));
        assert_eq!(ns.all_bindings(), &extra);
    }

    #[test]
    fn test_prefix_declarations_are_unique_per_prefix() {
        let ns: NamespaceBindings = [(GML, "gml"), (WFS, "gml"), ("urn:a", "a")]
            .into_iter()
            .collect();
        let decls = ns.prefix_declarations();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].0, "a");
        assert_eq!(decls[1].0, "gml");
    }

    #[test]
    fn test_display_lists_bindings() {
        let ns: NamespaceBindings = [(GML, "gml")].into_iter().collect();
        let text = ns.to_string();
        assert!(text.starts_with("NamespaceBindings:"));
        assert!(text.contains("gml = http://www.opengis.net/gml/3.2"));
    }
}
