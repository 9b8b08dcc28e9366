//! Streaming extraction of XML elements as standalone text tokens.
//!
//! An [`XmlTokenizer`] walks a document once, selects elements with a small
//! path language (see [`pattern`]) and returns the literal source text of
//! every match, made self-contained according to an [`ExtractMode`]:
//!
//! - `Inject` declares the inherited namespace bindings on the element,
//! - `Wrap` keeps the ancestors' start tags around the element,
//! - `Unwrap` returns the element content,
//! - `Text` returns the character data only.
//!
//! Matches can be batched into groups of a fixed size. Memory use depends on
//! the size of one match (or group) and the document depth, not on the
//! document size.

pub mod encoding;
pub mod error;
pub mod io;
pub mod parser;
pub mod pattern;
pub mod tokenize;

pub use error::XmlTokenizeError;
pub use parser::{PullParser, QualifiedName, QuickXmlParser, StartElement, XmlEvent};
pub use pattern::PathPattern;
pub use tokenize::{ExtractMode, TokenizeOptions, XmlTokenizer};
