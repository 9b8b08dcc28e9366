use std::{collections::BTreeMap, fmt::Display, str::FromStr};

/// How each matched element is turned into a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// The element text with every namespace binding in scope declared on its start tag.
    #[default]
    Inject,
    /// The element text embedded in the text of its ancestors' start tags
    /// and closed by their end tags.
    Wrap,
    /// The content between the element's start tag and end tag.
    Unwrap,
    /// The concatenated character data found between tags.
    Text,
}

impl ExtractMode {
    /// Returns the mode selected by its one-letter code (`i`, `w`, `u` or `t`).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(Self::Inject),
            'w' => Some(Self::Wrap),
            'u' => Some(Self::Unwrap),
            't' => Some(Self::Text),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::Inject => 'i',
            Self::Wrap => 'w',
            Self::Unwrap => 'u',
            Self::Text => 't',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inject => "inject",
            Self::Wrap => "wrap",
            Self::Unwrap => "unwrap",
            Self::Text => "text",
        }
    }
}

impl Display for ExtractMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseExtractModeError(String);

impl Display for ParseExtractModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown extraction mode '{}', expected one of i, w, u, t",
            self.0
        )
    }
}

impl std::error::Error for ParseExtractModeError {}

impl FromStr for ExtractMode {
    type Err = ParseExtractModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = s.trim().to_ascii_lowercase();
        let mut chars = mode.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(mode) = Self::from_char(c) {
                return Ok(mode);
            }
        }
        match mode.as_str() {
            "inject" => Ok(Self::Inject),
            "wrap" => Ok(Self::Wrap),
            "unwrap" => Ok(Self::Unwrap),
            "text" => Ok(Self::Text),
            _ => Err(ParseExtractModeError(s.to_owned())),
        }
    }
}

/// Settings of an [`XmlTokenizer`](crate::XmlTokenizer).
///
/// # Examples
/// ```
/// use xmltokenize::{ExtractMode, TokenizeOptions};
///
/// let options = TokenizeOptions::new("//c:child")
///     .namespace("c", "urn:c")
///     .mode(ExtractMode::Wrap)
///     .group(2);
/// assert_eq!(options.group, 2);
/// ```
#[derive(Debug, Clone)]
pub struct TokenizeOptions {
    /// The path expression selecting the elements to extract.
    pub path: String,
    /// Prefix bindings used by the path expression.
    /// The prefix `""` gives the namespace of unprefixed steps.
    pub namespaces: BTreeMap<String, String>,
    pub mode: ExtractMode,
    /// How many matches are combined into one token.
    pub group: usize,
}

impl TokenizeOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespaces: BTreeMap::new(),
            mode: ExtractMode::default(),
            group: 1,
        }
    }

    /// Bind `prefix` to `uri` for the path expression.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    pub fn namespaces<P, U>(mut self, bindings: impl IntoIterator<Item = (P, U)>) -> Self
    where
        P: Into<String>,
        U: Into<String>,
    {
        self.namespaces
            .extend(bindings.into_iter().map(|(p, u)| (p.into(), u.into())));
        self
    }

    pub fn mode(mut self, mode: ExtractMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the group size. `0` is treated as `1`.
    pub fn group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub(crate) fn effective_group(&self) -> usize {
        self.group.max(1)
    }
}
