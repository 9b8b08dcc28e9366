//! Provide the pull-parser contract that drives the tokenizer and its default
//! implementation on top of `quick-xml`.
//!
//! A pull parser only has to report element boundaries: non-element events
//! (text, comments, processing instructions, ...) are skipped internally and
//! end up in the recorded text of whatever element comes next.

mod namespace;
mod qname;
mod reader;

pub use namespace::*;
pub use qname::*;
pub use reader::*;

use crate::error::XmlTokenizeError;

/// A start tag as reported by a [`PullParser`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartElement {
    /// The resolved element name.
    pub name: QualifiedName,
    /// The namespace bindings declared on this element, in document order.
    /// The default namespace uses the prefix `""`.
    pub namespaces: Vec<(String, String)>,
    /// The source offset of the `<` that opens the tag.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    StartElement(StartElement),
    EndElement(QualifiedName),
    EndDocument,
}

/// The collaborator the tokenizer pulls element events from.
pub trait PullParser {
    /// Returns the source offset just past the last event returned by
    /// [`PullParser::next_event`], or `None` if offsets are not supported.
    ///
    /// The offset must be `Some(0)` before the first event is pulled.
    fn offset(&self) -> Option<usize>;

    /// Pull the next element boundary.
    ///
    /// Once the document is finished, [`XmlEvent::EndDocument`] is returned
    /// for every subsequent call.
    fn next_event(&mut self) -> Result<XmlEvent, XmlTokenizeError>;

    /// Skip the content of the element whose start was returned last and
    /// return its end event.
    fn skip_element(&mut self) -> Result<XmlEvent, XmlTokenizeError> {
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                XmlEvent::StartElement(_) => depth += 1,
                XmlEvent::EndElement(name) => {
                    if depth == 0 {
                        return Ok(XmlEvent::EndElement(name));
                    }
                    depth -= 1;
                }
                XmlEvent::EndDocument => {
                    return Err(XmlTokenizeError::parse(
                        self.offset().unwrap_or_default(),
                        "unexpected end of document inside an element",
                    ));
                }
            }
        }
    }
}
