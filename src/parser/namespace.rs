use std::rc::Rc;

/// The namespace URI permanently bound to the `xml` prefix.
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The prefix-to-URI bindings in effect at one element.
///
/// A scope is shared with its parent until the element declares a binding of
/// its own, in which case the bindings are copied and extended. Bindings keep
/// declaration order: outermost first, and a redeclared prefix keeps the slot
/// of its first declaration. The default namespace uses the prefix `""`.
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    bindings: Rc<Vec<(String, String)>>,
}

impl NamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scope of a child element that declares `decls`.
    pub fn extend(&self, decls: &[(String, String)]) -> Self {
        if decls.is_empty() {
            return self.clone();
        }
        let mut bindings = self.bindings.as_ref().clone();
        for (prefix, uri) in decls {
            match bindings.iter_mut().find(|(p, _)| p == prefix) {
                Some(binding) => binding.1.clone_from(uri),
                None => bindings.push((prefix.clone(), uri.clone())),
            }
        }
        Self {
            bindings: Rc::new(bindings),
        }
    }

    /// Look up the URI bound to `prefix`.
    ///
    /// The `xml` prefix always resolves.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    /// Returns the URI of the default namespace, or `""` if none is in effect.
    pub fn default_namespace(&self) -> &str {
        self.resolve("").unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[cfg(test)]
    fn shares_bindings(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}
