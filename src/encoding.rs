//! Provide encoding lookup and decoding for byte-oriented sources.
//!
//! Recorded spans are kept as raw bytes and decoded only when they are
//! carved out of the recording. Because every span boundary falls on a
//! markup character, only ASCII-compatible encodings are accepted.

use std::{borrow::Cow, fmt::Display, str::from_utf8};

use encoding_rs::{DecoderResult, Encoding, UTF_8};

#[derive(Debug, Clone)]
pub enum EncodingError {
    /// No encoding is known under `label`.
    Unknown { label: String },
    /// The encoding exists, but markup characters are not single ASCII bytes in it.
    NotAsciiCompatible { name: &'static str },
    /// Malformed byte sequence is found.
    ///
    /// The malformed sequence occurs at `input[offset..offset + length]`.
    Malformed {
        encoding: &'static str,
        offset: usize,
        length: usize,
    },
    /// Other errors.
    Other { msg: Cow<'static, str> },
}

impl EncodingError {
    /// Check if this error is caused by a bad encoding name rather than by input data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Unknown { .. } | Self::NotAsciiCompatible { .. })
    }

    pub fn malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encoding Error: ")?;
        match self {
            Self::Unknown { label } => write!(f, "unknown encoding '{label}'"),
            Self::NotAsciiCompatible { name } => {
                write!(f, "encoding '{name}' is not ASCII-compatible")
            }
            Self::Malformed {
                encoding,
                offset,
                length,
            } => write!(
                f,
                "Malformed {encoding} byte sequence occurs at {}..{}",
                offset,
                offset + length
            ),
            Self::Other { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EncodingError {}

/// Look up the encoding registered under `label`.
///
/// Labels follow the WHATWG Encoding Standard, so `ISO-8859-1` resolves to
/// `windows-1252`. Encodings that are not ASCII-compatible (UTF-16, ISO-2022-JP, ...)
/// are rejected.
pub fn find_encoding(label: &str) -> Result<&'static Encoding, EncodingError> {
    let encoding =
        Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| EncodingError::Unknown {
            label: label.to_owned(),
        })?;
    if !encoding.is_ascii_compatible() {
        return Err(EncodingError::NotAsciiCompatible {
            name: encoding.name(),
        });
    }
    Ok(encoding)
}

/// Decode `src` without BOM sniffing and without replacement characters.
///
/// `None` is treated as UTF-8.
pub fn decode<'a>(
    encoding: Option<&'static Encoding>,
    src: &'a [u8],
) -> Result<Cow<'a, str>, EncodingError> {
    let encoding = encoding.unwrap_or(UTF_8);
    if encoding == UTF_8 {
        return from_utf8(src)
            .map(Cow::Borrowed)
            .map_err(|err| EncodingError::Malformed {
                encoding: UTF_8.name(),
                offset: err.valid_up_to(),
                length: err.error_len().unwrap_or(src.len() - err.valid_up_to()),
            });
    }
    if Encoding::ascii_valid_up_to(src) == src.len() {
        return from_utf8(src).map(Cow::Borrowed).map_err(|_| EncodingError::Other {
            msg: "ASCII prefix is not UTF-8".into(),
        });
    }

    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(src.len())
        .ok_or(EncodingError::Other {
            msg: "input is too long to decode".into(),
        })?;
    let mut dst = String::with_capacity(capacity);
    let (res, read) = decoder.decode_to_string_without_replacement(src, &mut dst, true);
    match res {
        DecoderResult::InputEmpty => Ok(Cow::Owned(dst)),
        DecoderResult::Malformed(length, extra) => Err(EncodingError::Malformed {
            encoding: encoding.name(),
            offset: read - length as usize - extra as usize,
            length: length as usize,
        }),
        DecoderResult::OutputFull => Err(EncodingError::Other {
            msg: "decoder output buffer is too short".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_encoding_test() {
        const CASES: &[(&str, Option<&str>)] = &[
            ("UTF-8", Some("UTF-8")),
            ("utf8", Some("UTF-8")),
            ("ISO-8859-1", Some("windows-1252")),
            (" latin1 ", Some("windows-1252")),
            ("Shift_JIS", Some("Shift_JIS")),
            ("EUC-JP", Some("EUC-JP")),
            ("utf-u", None),
        ];
        for &(label, expected) in CASES {
            let res = find_encoding(label).ok().map(|enc| enc.name());
            assert_eq!(res, expected, "label: {label}");
        }
    }

    #[test]
    fn reject_ascii_incompatible_encoding_test() {
        for label in ["UTF-16", "UTF-16BE", "ISO-2022-JP"] {
            let err = find_encoding(label).unwrap_err();
            assert!(err.is_configuration(), "label: {label}");
            assert!(matches!(err, EncodingError::NotAsciiCompatible { .. }));
        }
        assert!(matches!(
            find_encoding("no-such-encoding"),
            Err(EncodingError::Unknown { .. })
        ));
    }

    #[test]
    fn decode_test() {
        let latin1 = find_encoding("ISO-8859-1").unwrap();
        let res = decode(Some(latin1), b"we l\xF3ve iso-latin").unwrap();
        assert_eq!(res, "we l\u{00f3}ve iso-latin");

        let res = decode(None, "caf\u{e9}".as_bytes()).unwrap();
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, "caf\u{e9}");

        let err = decode(None, b"abc\xFFdef").unwrap_err();
        assert!(err.malformed());
        match err {
            EncodingError::Malformed { offset, length, .. } => {
                assert_eq!(offset, 3);
                assert_eq!(length, 1);
            }
            _ => unreachable!(),
        }
    }
}
