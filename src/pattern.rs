//! Provide the path pattern language used to select elements.
//!
//! ```text
//! Path    ::= '/' Step ('/' Step?)*
//! Step    ::= (Prefix ':')? LocalName
//! Prefix  ::= NCName | '*'
//! ```
//!
//! An empty step between two slashes (`//`) matches any number of
//! intermediate levels. A local name may contain the wildcards `?` (one
//! character) and `*` (any run of characters).

use std::{collections::BTreeMap, fmt::Display};

use log::debug;
use regex::Regex;

use crate::{
    error::XmlTokenizeError,
    parser::{QualifiedName, split_qname2},
};

#[derive(Debug, Clone)]
enum NamespaceTest {
    Any,
    Uri(String),
}

#[derive(Debug, Clone)]
enum LocalNameTest {
    Exact(String),
    Wildcard(Regex),
}

/// One compiled step of a path pattern.
#[derive(Debug, Clone)]
pub struct NameTest {
    namespace: NamespaceTest,
    local_name: LocalNameTest,
    source: String,
}

impl NameTest {
    fn compile(
        path: &str,
        step: &str,
        namespaces: &BTreeMap<String, String>,
    ) -> Result<Self, XmlTokenizeError> {
        let (prefix, local) = split_qname2(step).unwrap_or(("", step));
        if local.is_empty() {
            return Err(XmlTokenizeError::invalid_path(
                path,
                format!("step '{step}' has no local name"),
            ));
        }

        let namespace = match prefix {
            "*" => NamespaceTest::Any,
            "" => NamespaceTest::Uri(namespaces.get("").cloned().unwrap_or_default()),
            prefix => match namespaces.get(prefix) {
                Some(uri) => NamespaceTest::Uri(uri.clone()),
                None => {
                    return Err(XmlTokenizeError::UnboundPrefix {
                        path: path.to_owned(),
                        prefix: prefix.to_owned(),
                    });
                }
            },
        };

        let local_name = if local.contains(['?', '*']) {
            let mut re = String::from("^(?:");
            for c in local.chars() {
                match c {
                    '?' => re.push('.'),
                    '*' => re.push_str(".*"),
                    c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
                }
            }
            re.push_str(")$");
            let re = Regex::new(&re).map_err(|err| {
                XmlTokenizeError::invalid_path(path, format!("step '{step}': {err}"))
            })?;
            LocalNameTest::Wildcard(re)
        } else {
            LocalNameTest::Exact(local.to_owned())
        };

        Ok(Self {
            namespace,
            local_name,
            source: step.to_owned(),
        })
    }

    /// Check if `name` satisfies this step.
    pub fn matches(&self, name: &QualifiedName) -> bool {
        let namespace = match &self.namespace {
            NamespaceTest::Any => true,
            NamespaceTest::Uri(uri) => uri == name.namespace(),
        };
        namespace
            && match &self.local_name {
                LocalNameTest::Exact(local) => local == name.local_name(),
                LocalNameTest::Wildcard(re) => re.is_match(name.local_name()),
            }
    }
}

impl Display for NameTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// A compiled path pattern.
///
/// `None` steps are descendant markers. Two markers are never adjacent, and
/// the last step is never a marker.
#[derive(Debug, Clone)]
pub struct PathPattern {
    steps: Vec<Option<NameTest>>,
}

impl PathPattern {
    /// Compile `path`, resolving step prefixes against `namespaces`.
    ///
    /// The key `""` of `namespaces` is the namespace of unprefixed steps.
    /// Trailing slashes are ignored.
    pub fn compile(
        path: &str,
        namespaces: &BTreeMap<String, String>,
    ) -> Result<Self, XmlTokenizeError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(XmlTokenizeError::invalid_path(path, "must start with '/'"));
        };

        let mut steps = rest.split('/').collect::<Vec<_>>();
        while steps.last().is_some_and(|step| step.is_empty()) {
            steps.pop();
        }
        if steps.is_empty() {
            return Err(XmlTokenizeError::invalid_path(path, "no step to match"));
        }

        let mut compiled = Vec::with_capacity(steps.len());
        for step in steps {
            if step.is_empty() {
                if matches!(compiled.last(), Some(None)) {
                    return Err(XmlTokenizeError::invalid_path(
                        path,
                        "consecutive descendant markers",
                    ));
                }
                compiled.push(None);
            } else {
                compiled.push(Some(NameTest::compile(path, step, namespaces)?));
            }
        }
        let pattern = Self { steps: compiled };
        debug!("compiled path '{path}' to {pattern}");
        Ok(pattern)
    }

    #[cfg(test)]
    fn steps(&self) -> &[Option<NameTest>] {
        &self.steps
    }

    /// Returns a cursor positioned at the first step.
    pub fn cursor(self) -> PatternCursor {
        PatternCursor {
            pattern: self,
            index: 0,
        }
    }
}

impl Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for step in &self.steps {
            match step {
                Some(test) => write!(f, "/{test}")?,
                None => write!(f, "/")?,
            }
        }
        Ok(())
    }
}

/// The position reached in a [`PathPattern`] while walking a document.
///
/// When the cursor rests on a descendant marker, the step it tests against is
/// the one following the marker.
#[derive(Debug, Clone)]
pub struct PatternCursor {
    pattern: PathPattern,
    index: usize,
}

impl PatternCursor {
    #[cfg(test)]
    fn index(&self) -> usize {
        self.index
    }

    /// Check if the cursor rests on a descendant marker.
    pub fn is_descendant_slot(&self) -> bool {
        self.pattern.steps[self.index].is_none()
    }

    /// Returns the step the next element is tested against.
    pub fn current(&self) -> &NameTest {
        let index = self.index + self.is_descendant_slot() as usize;
        match &self.pattern.steps[index] {
            Some(test) => test,
            None => unreachable!("descendant markers are never adjacent"),
        }
    }

    /// Returns the step before the cursor.
    ///
    /// The outer `None` means the cursor is at the top,
    /// the inner `None` means the previous step is a descendant marker.
    pub fn ancestor(&self) -> Option<Option<&NameTest>> {
        let index = self.index.checked_sub(1)?;
        Some(self.pattern.steps[index].as_ref())
    }

    /// Advance past the current step (and the marker before it, if any).
    pub fn descend(&mut self) {
        self.index += 1 + self.is_descendant_slot() as usize;
    }

    /// Move back one step.
    pub fn retreat(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    /// Check if the current step is the last one.
    pub fn is_at_bottom(&self) -> bool {
        self.index + 1 + self.is_descendant_slot() as usize == self.pattern.steps.len()
    }

    pub fn is_at_top(&self) -> bool {
        self.index == 0
    }
}
