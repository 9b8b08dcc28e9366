//! Provide the streaming tokenizer.
//!
//! The tokenizer pulls element events from a [`PullParser`], follows a
//! [`PathPattern`] down the document, and cuts the literal text of each
//! matched element out of the recorded source. The text is rendered
//! according to the [`ExtractMode`] and handed out one token at a time.
//!
//! # Examples
//! ```
//! use xmltokenize::{ExtractMode, TokenizeOptions, XmlTokenizer};
//!
//! let doc = "<g:A xmlns:g='urn:g'><c:B xmlns:c='urn:c'><c:C>x</c:C><c:C/></c:B></g:A>";
//! let options = TokenizeOptions::new("//c:C").namespace("c", "urn:c");
//! let tokens = XmlTokenizer::from_reader(options, doc.as_bytes())
//!     .unwrap()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(
//!     tokens,
//!     [
//!         r#"<c:C xmlns:g="urn:g" xmlns:c="urn:c">x</c:C>"#,
//!         r#"<c:C xmlns:g="urn:g" xmlns:c="urn:c"/>"#,
//!     ]
//! );
//! ```

mod options;
pub mod render;

use std::io::Read;

use log::{debug, trace};

pub use options::*;
use render::{RenderContext, render_group, render_token};

use crate::{
    encoding::find_encoding,
    error::XmlTokenizeError,
    io::{RecordableReader, Recording},
    parser::{NamespaceScope, PullParser, QualifiedName, QuickXmlParser, StartElement, XmlEvent},
    pattern::{PathPattern, PatternCursor},
};

/// Whether the pattern cursor follows closing elements back up.
///
/// After a final match, each end tag may move the cursor back one step.
/// A start tag suspends this until the document returns to the level
/// where the match happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Backtrack {
    /// No match has been completed yet.
    #[default]
    Idle,
    /// Retreat resumes once the element at this depth closes.
    Suspended(usize),
    /// Every end tag is a candidate for retreat.
    Active(usize),
}

impl Backtrack {
    fn is_active(self) -> bool {
        matches!(self, Self::Active(_))
    }

    fn on_start(self) -> Self {
        match self {
            Self::Active(depth) => Self::Suspended(depth),
            other => other,
        }
    }

    /// Check if pending tokens must be flushed before an element at `depth` closes.
    fn flush_due(self, depth: usize) -> bool {
        match self {
            Self::Idle => false,
            Self::Suspended(track) => track > 0 && depth == track,
            Self::Active(_) => true,
        }
    }

    /// Returns the state after an element closed, leaving `depth` open elements.
    fn on_end(self, depth: usize) -> Self {
        match self {
            Self::Active(track) => Self::Active(track.saturating_sub(1)),
            Self::Suspended(track) if track > 0 && depth + 1 == track => Self::Active(track - 1),
            other => other,
        }
    }

    fn track_depth(self) -> Option<usize> {
        match self {
            Self::Idle => None,
            Self::Suspended(track) | Self::Active(track) => Some(track),
        }
    }
}

/// A streaming iterator over the elements of an XML document selected by a path.
///
/// Each item is one rendered token, or an error that terminates the sequence.
/// One token is always read ahead so that [`XmlTokenizer::has_next`] can answer
/// without blocking on the source.
///
/// The source is owned by the tokenizer and is released when the tokenizer
/// is dropped.
pub struct XmlTokenizer<P: PullParser> {
    parser: P,
    recording: Recording,
    cursor: PatternCursor,
    mode: ExtractMode,
    group: usize,

    /// open elements, outermost first
    path: Vec<QualifiedName>,
    /// namespace scope of each open element (inject mode)
    scopes: Vec<NamespaceScope>,
    /// text preceding each recorded element (wrap mode)
    segments: Vec<String>,
    /// names of the elements in `segments` (wrap mode)
    segment_log: Vec<QualifiedName>,
    /// matched tokens not yet emitted as a group
    pending: Vec<String>,

    lookahead: Option<XmlEvent>,
    consumed: usize,
    depth: usize,
    backtrack: Backtrack,

    next: Option<Result<String, XmlTokenizeError>>,
    finished: bool,
}

impl<R: Read> XmlTokenizer<QuickXmlParser<R>> {
    /// Create a tokenizer over UTF-8 input.
    ///
    /// A string can be tokenized with `XmlTokenizer::from_reader(options, s.as_bytes())`.
    pub fn from_reader(options: TokenizeOptions, reader: R) -> Result<Self, XmlTokenizeError> {
        let parser = QuickXmlParser::new(RecordableReader::new(reader));
        let recording = parser.recording();
        Self::with_parser(options, parser, recording)
    }

    /// Create a tokenizer over input in the encoding registered under `encoding`.
    ///
    /// The encoding must be ASCII-compatible.
    pub fn with_encoding(
        options: TokenizeOptions,
        reader: R,
        encoding: &str,
    ) -> Result<Self, XmlTokenizeError> {
        let encoding = find_encoding(encoding)?;
        let source = RecordableReader::with_encoding(reader, Some(encoding));
        let parser = QuickXmlParser::new(source);
        let recording = parser.recording();
        Self::with_parser(options, parser, recording)
    }
}

impl<P: PullParser> XmlTokenizer<P> {
    /// Create a tokenizer over a custom pull parser.
    ///
    /// `recording` must record the same source the parser reads, and the
    /// parser must not have pulled any event yet.
    pub fn with_parser(
        options: TokenizeOptions,
        parser: P,
        recording: Recording,
    ) -> Result<Self, XmlTokenizeError> {
        let pattern = PathPattern::compile(&options.path, &options.namespaces)?;
        match parser.offset() {
            Some(0) => {}
            _ => return Err(XmlTokenizeError::LocationUnsupported),
        }
        debug!(
            "tokenize '{}' with mode {}, group {}",
            pattern,
            options.mode,
            options.effective_group()
        );

        let mut tokenizer = Self {
            parser,
            recording,
            cursor: pattern.cursor(),
            mode: options.mode,
            group: options.effective_group(),
            path: vec![],
            scopes: vec![],
            segments: vec![],
            segment_log: vec![],
            pending: vec![],
            lookahead: None,
            consumed: 0,
            depth: 0,
            backtrack: Backtrack::Idle,
            next: None,
            finished: false,
        };
        tokenizer.next = tokenizer.prefetch();
        Ok(tokenizer)
    }

    /// Check if another token (or an error) is available.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn mode(&self) -> ExtractMode {
        self.mode
    }

    pub fn group(&self) -> usize {
        self.group
    }

    fn prefetch(&mut self) -> Option<Result<String, XmlTokenizeError>> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                debug!("tokenizing stopped: {err}");
                self.finished = true;
                Some(Err(err))
            }
        }
    }

    fn read_event(&mut self) -> Result<XmlEvent, XmlTokenizeError> {
        match self.lookahead.take() {
            Some(event) => Ok(event),
            None => self.parser.next_event(),
        }
    }

    /// Carve the text between the last consumed position and `position`
    /// out of the recording.
    fn take_text(&mut self, position: usize) -> Result<String, XmlTokenizeError> {
        let len = position.saturating_sub(self.consumed);
        let text = self.recording.consume_text(len)?;
        self.consumed += len;
        self.recording.record();
        Ok(text)
    }

    fn next_token(&mut self) -> Result<Option<String>, XmlTokenizeError> {
        loop {
            let token = match self.read_event()? {
                XmlEvent::StartElement(start) => self.start_element(start)?,
                XmlEvent::EndElement(name) => self.end_element(name)?,
                XmlEvent::EndDocument => {
                    trace!("end of document; pending={}", self.pending.len());
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    self.lookahead = Some(XmlEvent::EndDocument);
                    Some(self.flush_group())
                }
            };
            if token.is_some() {
                return Ok(token);
            }
        }
    }

    fn start_element(&mut self, start: StartElement) -> Result<Option<String>, XmlTokenizeError> {
        let StartElement {
            name,
            namespaces,
            position,
        } = start;
        self.depth += 1;
        trace!(
            "se={name}; depth={}; trackdepth={:?}",
            self.depth,
            self.backtrack.track_depth()
        );

        let text = self.take_text(position)?;
        if self.mode == ExtractMode::Wrap && !self.backtrack.is_active() {
            self.segments.push(text);
            self.segment_log.push(name.clone());
        }
        if self.mode == ExtractMode::Inject {
            let scope = self
                .scopes
                .last()
                .cloned()
                .unwrap_or_default()
                .extend(&namespaces);
            self.scopes.push(scope);
        }
        self.path.push(name.clone());
        self.backtrack = self.backtrack.on_start();

        if self.cursor.current().matches(&name) {
            if !self.cursor.is_at_bottom() {
                self.cursor.descend();
                return Ok(None);
            }
            let token = self.capture()?;
            self.backtrack = Backtrack::Active(self.depth);
            if self.group == 1 {
                return Ok(Some(token));
            }
            self.pending.push(token);
            if self.pending.len() == self.group {
                return Ok(Some(self.flush_group()));
            }
        } else if !self.cursor.is_descendant_slot() {
            trace!("skip {name}");
            let end = self.parser.skip_element()?;
            self.lookahead = Some(end);
        }
        Ok(None)
    }

    /// Read the rest of the matched element and render it.
    fn capture(&mut self) -> Result<String, XmlTokenizeError> {
        self.parser.skip_element()?;
        let position = self
            .parser
            .offset()
            .ok_or(XmlTokenizeError::LocationUnsupported)?;
        let span = self.take_text(position)?;
        trace!("matched {:?}", span);

        self.depth -= 1;
        self.path.pop();
        let token = if self.mode == ExtractMode::Wrap && self.group > 1 {
            span
        } else {
            let ctx = RenderContext {
                segments: &self.segments,
                path: &self.path,
                scope: self.scopes.last(),
            };
            render_token(self.mode, &span, &ctx)
        };
        if self.mode == ExtractMode::Inject {
            self.scopes.pop();
        }
        Ok(token)
    }

    fn end_element(&mut self, name: QualifiedName) -> Result<Option<String>, XmlTokenizeError> {
        if self.mode == ExtractMode::Wrap
            && self.group > 1
            && !self.pending.is_empty()
            && self.backtrack.flush_due(self.depth)
        {
            self.lookahead = Some(XmlEvent::EndElement(name));
            return Ok(Some(self.flush_group()));
        }

        self.depth = self.depth.saturating_sub(1);
        self.path.pop();
        if self.mode == ExtractMode::Inject {
            self.scopes.pop();
        }
        trace!(
            "ee={name}; depth={}; trackdepth={:?}",
            self.depth,
            self.backtrack.track_depth()
        );

        self.backtrack = self.backtrack.on_end(self.depth);
        if !self.backtrack.is_active() {
            return Ok(None);
        }

        if self.mode == ExtractMode::Wrap {
            let mut discarded = 0;
            while self.segment_log.last().is_some_and(|last| *last != name) {
                self.segment_log.pop();
                discarded += 1;
            }
            let len = self.segments.len().saturating_sub(discarded);
            self.segments.truncate(len);
        }

        let retreat = match self.cursor.ancestor() {
            None => false,
            Some(None) => true,
            Some(Some(ancestor)) => ancestor.matches(&name),
        };
        if retreat {
            self.cursor.retreat();
        }
        Ok(None)
    }

    fn flush_group(&mut self) -> String {
        trace!("flush {} token(s)", self.pending.len());
        let ctx = RenderContext {
            segments: &self.segments,
            path: &self.path,
            scope: None,
        };
        let token = render_group(self.mode, &self.pending, &ctx);
        self.pending.clear();
        token
    }
}

impl<P: PullParser> Iterator for XmlTokenizer<P> {
    type Item = Result<String, XmlTokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        if current.is_ok() {
            self.next = self.prefetch();
        }
        Some(current)
    }
}

impl<P: PullParser> std::iter::FusedIterator for XmlTokenizer<P> {}
