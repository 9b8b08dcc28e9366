use std::{
    cell::RefCell,
    io::{self, Read},
    rc::Rc,
};

use encoding_rs::Encoding;

use crate::encoding::{EncodingError, decode};

/// A reader that copies everything it reads into a shared [`Recording`].
///
/// The pull parser reads through this type while the tokenizer keeps the
/// `Recording` handle, so the literal text of any element can be recovered
/// once the parser has moved past it.
pub struct RecordableReader<R> {
    inner: R,
    recording: Recording,
}

impl<R: Read> RecordableReader<R> {
    /// Create a recordable reader over UTF-8 (or pre-decoded) input.
    pub fn new(inner: R) -> Self {
        Self::with_encoding(inner, None)
    }

    /// Create a recordable reader whose recorded bytes are decoded with `encoding`.
    ///
    /// Recording is active from the start.
    pub fn with_encoding(inner: R, encoding: Option<&'static Encoding>) -> Self {
        Self {
            inner,
            recording: Recording::new(encoding),
        }
    }

    /// Returns a handle to the recording buffer shared with this reader.
    pub fn recording(&self) -> Recording {
        self.recording.clone()
    }
}

impl<R: Read> Read for RecordableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.recording.push(&buf[..len]);
        Ok(len)
    }
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

struct RecordBuffer {
    data: Vec<u8>,
    encoding: Option<&'static Encoding>,
    recording: bool,
    // false until the start of the stream has been checked for a BOM
    bom_checked: bool,
}

impl RecordBuffer {
    fn strip_bom(&mut self) {
        if self.data.starts_with(UTF8_BOM) {
            self.data.drain(..UTF8_BOM.len());
            self.bom_checked = true;
        } else if !UTF8_BOM.starts_with(&self.data) {
            self.bom_checked = true;
        }
    }
}

/// Shared handle to the bytes recorded by a [`RecordableReader`].
///
/// Consuming a prefix stops recording until [`Recording::record`] is called again.
/// A leading UTF-8 byte order mark is never recorded, so recorded offsets
/// agree with parsers that skip it.
#[derive(Clone)]
pub struct Recording(Rc<RefCell<RecordBuffer>>);

impl Recording {
    fn new(encoding: Option<&'static Encoding>) -> Self {
        Self(Rc::new(RefCell::new(RecordBuffer {
            data: vec![],
            encoding,
            recording: true,
            bom_checked: false,
        })))
    }

    fn push(&self, bytes: &[u8]) {
        let mut buf = self.0.borrow_mut();
        if buf.recording && !bytes.is_empty() {
            buf.data.extend_from_slice(bytes);
            if !buf.bom_checked {
                buf.strip_bom();
            }
        }
    }

    /// Resume recording.
    pub fn record(&self) {
        self.0.borrow_mut().recording = true;
    }

    pub fn is_recording(&self) -> bool {
        self.0.borrow().recording
    }

    /// Returns the number of recorded bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.0.borrow().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the encoding used by [`Recording::consume_text`].
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.0.borrow().encoding
    }

    /// Remove the first `len` recorded bytes and return them undecoded.
    ///
    /// If fewer bytes are recorded, all of them are returned.
    pub(crate) fn consume_bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = self.0.borrow_mut();
        buf.recording = false;
        let len = len.min(buf.data.len());
        buf.data.drain(..len).collect()
    }

    /// Remove the first `len` recorded bytes and decode them.
    pub fn consume_text(&self, len: usize) -> Result<String, EncodingError> {
        let bytes = self.consume_bytes(len);
        let text = decode(self.encoding(), &bytes)?;
        Ok(text.into_owned())
    }
}
