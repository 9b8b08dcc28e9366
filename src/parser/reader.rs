use std::io::{self, BufReader, Read};

use encoding_rs::Encoding;
use log::trace;
use quick_xml::{Reader, escape::unescape, events::Event};

use crate::{
    encoding::decode,
    error::XmlTokenizeError,
    io::{RecordableReader, Recording},
};

use super::{NamespaceScope, PullParser, QualifiedName, StartElement, XmlEvent, split_qname2};

/// The default [`PullParser`], built on `quick_xml::Reader`.
///
/// Empty elements are reported as a start followed by an end. Namespaces are
/// resolved here, because the underlying reader only sees raw names.
///
/// Text and attribute values are checked for undeclared entity references,
/// and only whitespace may appear outside the single root element.
pub struct QuickXmlParser<R: Read> {
    reader: Reader<BufReader<RecordableReader<R>>>,
    encoding: Option<&'static Encoding>,
    scopes: Vec<NamespaceScope>,
    buf: Vec<u8>,
    root_closed: bool,
    finished: bool,
}

impl<R: Read> QuickXmlParser<R> {
    pub fn new(source: RecordableReader<R>) -> Self {
        let encoding = source.recording().encoding();
        let mut reader = Reader::from_reader(BufReader::new(source));
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        config.check_end_names = true;
        Self {
            reader,
            encoding,
            scopes: vec![],
            buf: vec![],
            root_closed: false,
            finished: false,
        }
    }

    /// Returns a handle to the recording of the source this parser reads.
    pub fn recording(&self) -> Recording {
        self.reader.get_ref().get_ref().recording()
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn convert_error(&self, err: quick_xml::Error) -> XmlTokenizeError {
        match err {
            quick_xml::Error::Io(err) => {
                XmlTokenizeError::Io(io::Error::new(err.kind(), err.to_string()))
            }
            err => XmlTokenizeError::parse(self.position(), err.to_string()),
        }
    }

    fn check_text(&self, text: &[u8], position: usize) -> Result<(), XmlTokenizeError> {
        if self.scopes.is_empty() {
            if text.iter().any(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n')) {
                return Err(XmlTokenizeError::parse(
                    position,
                    "text outside the root element",
                ));
            }
            return Ok(());
        }
        let text = decode(self.encoding, text)?;
        unescape(&text).map_err(|err| XmlTokenizeError::parse(position, err.to_string()))?;
        Ok(())
    }

    fn read_element_event(&mut self, buf: &mut Vec<u8>) -> Result<XmlEvent, XmlTokenizeError> {
        loop {
            buf.clear();
            let position = self.position();
            let event = self
                .reader
                .read_event_into(buf)
                .map_err(|err| self.convert_error(err))?;
            match event {
                Event::Start(start) => {
                    let qname = start.name();
                    let raw = decode(self.encoding, qname.as_ref())?;
                    if raw.is_empty() {
                        return Err(XmlTokenizeError::parse(position, "element name is missing"));
                    }
                    if self.root_closed && self.scopes.is_empty() {
                        return Err(XmlTokenizeError::parse(
                            position,
                            format!("element '{raw}' follows the root element"),
                        ));
                    }

                    let mut namespaces = vec![];
                    for attr in start.attributes() {
                        let attr = attr
                            .map_err(|err| XmlTokenizeError::parse(position, err.to_string()))?;
                        if attr.value.contains(&b'<') {
                            return Err(XmlTokenizeError::parse(
                                position,
                                format!("'<' in attribute value of element '{raw}'"),
                            ));
                        }
                        let value = decode(self.encoding, &attr.value)?;
                        let value = unescape(&value)
                            .map_err(|err| XmlTokenizeError::parse(position, err.to_string()))?;
                        let prefix = match attr.key.as_ref().strip_prefix(b"xmlns") {
                            Some([]) => String::new(),
                            Some([b':', prefix @ ..]) => {
                                decode(self.encoding, prefix)?.into_owned()
                            }
                            _ => continue,
                        };
                        namespaces.push((prefix, value.into_owned()));
                    }

                    let scope = self
                        .scopes
                        .last()
                        .cloned()
                        .unwrap_or_default()
                        .extend(&namespaces);
                    let name = resolve_name(&scope, &raw, position)?;
                    self.scopes.push(scope);
                    return Ok(XmlEvent::StartElement(StartElement {
                        name,
                        namespaces,
                        position,
                    }));
                }
                Event::End(end) => {
                    let qname = end.name();
                    let raw = decode(self.encoding, qname.as_ref())?;
                    let Some(scope) = self.scopes.pop() else {
                        return Err(XmlTokenizeError::parse(
                            position,
                            format!("unexpected end tag '{raw}'"),
                        ));
                    };
                    self.root_closed = self.scopes.is_empty();
                    return resolve_name(&scope, &raw, position).map(XmlEvent::EndElement);
                }
                Event::Text(text) => self.check_text(&text, position)?,
                Event::CData(_) if self.scopes.is_empty() => {
                    return Err(XmlTokenizeError::parse(
                        position,
                        "character data outside the root element",
                    ));
                }
                Event::Eof => {
                    if !self.scopes.is_empty() {
                        return Err(XmlTokenizeError::parse(
                            position,
                            format!(
                                "unexpected end of document, {} element(s) not closed",
                                self.scopes.len()
                            ),
                        ));
                    }
                    trace!("end of document at {position}");
                    self.finished = true;
                    return Ok(XmlEvent::EndDocument);
                }
                _ => {}
            }
        }
    }
}

impl<R: Read> PullParser for QuickXmlParser<R> {
    fn offset(&self) -> Option<usize> {
        Some(self.position())
    }

    fn next_event(&mut self) -> Result<XmlEvent, XmlTokenizeError> {
        if self.finished {
            return Ok(XmlEvent::EndDocument);
        }
        let mut buf = std::mem::take(&mut self.buf);
        let res = self.read_element_event(&mut buf);
        buf.clear();
        self.buf = buf;
        res
    }
}

fn resolve_name(
    scope: &NamespaceScope,
    name: &str,
    position: usize,
) -> Result<QualifiedName, XmlTokenizeError> {
    let Some((prefix, local)) = split_qname2(name) else {
        return Ok(QualifiedName::new(scope.default_namespace(), name, ""));
    };
    let uri = scope.resolve(prefix).ok_or_else(|| {
        XmlTokenizeError::parse(
            position,
            format!("namespace prefix '{prefix}' of element '{name}' is not bound"),
        )
    })?;
    Ok(QualifiedName::new(uri, local, prefix))
}
