use std::{borrow::Cow, fmt::Display};

/// Parse an XML qualified name string
///
/// ```text
/// [NS 5] QName ::= (Prefix ':')? LocalPart
///
/// [NS 6] Prefix ::= NCName
///
/// [NS 7] LocalPart ::= NCName
/// ```
///
/// Returns `None` if the name doesn't have a prefix.
/// Otherwise, returns `Some((Prefix, LocalPart))`.
///
/// # Note
/// This function does not perform validation.
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }
    name.split_once(':')
}

/// Builds the QName `"prefix:ncname"`.
///
/// If `prefix` is `Some` and not empty, return `Cow::Owned(QName)`.
/// Otherwise, return `Cow::Borrowed(ncname)`.
pub fn build_qname<'a>(ncname: &'a str, prefix: Option<&str>) -> Cow<'a, str> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Cow::Borrowed(ncname);
    };
    Cow::Owned(format!("{prefix}:{ncname}"))
}

/// An element name resolved against its namespace scope.
///
/// Two names are equal when their namespace URIs and local names are equal.
/// The prefix is only kept to render the name back as it appeared.
#[derive(Debug, Clone, Default)]
pub struct QualifiedName {
    namespace: String,
    local_name: String,
    prefix: String,
}

impl QualifiedName {
    pub fn new(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            local_name: local_name.into(),
            prefix: prefix.into(),
        }
    }

    /// Returns the namespace URI, or `""` for names in no namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns the prefix, or `""` for unprefixed names.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the name as written in markup, `prefix:local` or `local`.
    pub fn qname(&self) -> Cow<'_, str> {
        build_qname(&self.local_name, Some(&self.prefix))
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.local_name == other.local_name
    }
}

impl Eq for QualifiedName {}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qname2_test() {
        const CASES: &[(&str, Option<(&str, &str)>)] = &[
            ("c:child", Some(("c", "child"))),
            ("child", None),
            (":child", None),
            ("a:b:c", Some(("a", "b:c"))),
        ];
        for &(name, expected) in CASES {
            assert_eq!(split_qname2(name), expected, "name: {name}");
        }
    }

    #[test]
    fn qualified_name_equality_test() {
        let a = QualifiedName::new("urn:c", "child", "c");
        let b = QualifiedName::new("urn:c", "child", "x");
        let c = QualifiedName::new("", "child", "");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.qname(), "c:child");
        assert_eq!(c.qname(), "child");
        assert_eq!(a.to_string(), "{urn:c}child");
        assert_eq!(c.to_string(), "child");
    }
}
