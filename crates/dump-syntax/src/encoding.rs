use crate::error::EncodingError;
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::{borrow::Cow, fs, path::Path};
use tracing::{debug, info, warn};

/// Bytes sampled from the head of the file for the statistical guess.
pub const SAMPLE_SIZE: usize = 200 * 1024;

/// A decoding attempt in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Encoding(&'static Encoding),
    /// ISO-8859-1 proper (every byte maps to the code point of the same value).
    /// `encoding_rs` folds this label into windows-1252, so it is decoded by hand.
    Latin1,
}

impl Candidate {
    pub fn label(&self) -> &'static str {
        match self {
            Candidate::Encoding(encoding) => encoding.name(),
            Candidate::Latin1 => "ISO-8859-1",
        }
    }

    fn decode<'b>(&self, bytes: &'b [u8]) -> Option<Cow<'b, str>> {
        match self {
            Candidate::Encoding(encoding) => {
                encoding.decode_without_bom_handling_and_without_replacement(bytes)
            }
            Candidate::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| b as char).collect())),
        }
    }
}

/// Text of a dump file together with how it was obtained.
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
    /// Statistical guess, when the sample was conclusive.
    pub detected: Option<&'static str>,
    /// True when no candidate decoded cleanly and invalid bytes were replaced.
    pub lossy: bool,
}

/// Guesses the encoding of a byte sample.
///
/// Pure ASCII samples carry no signal and yield `None`, so the fixed chain
/// (starting with UTF-8) decides.
pub fn detect_encoding(sample: &[u8], is_complete: bool) -> Option<&'static Encoding> {
    if sample.is_ascii() {
        return None;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(sample, is_complete);
    Some(detector.guess(None, true))
}

/// Candidate order: the guess first, then UTF-8, windows-1252, ISO-8859-1.
pub fn candidate_chain(detected: Option<&'static Encoding>) -> Vec<Candidate> {
    let mut chain = Vec::with_capacity(4);
    if let Some(encoding) = detected {
        chain.push(Candidate::Encoding(encoding));
    }
    for fallback in [
        Candidate::Encoding(UTF_8),
        Candidate::Encoding(WINDOWS_1252),
        Candidate::Latin1,
    ] {
        if !chain.contains(&fallback) {
            chain.push(fallback);
        }
    }
    chain
}

/// Decodes with the first candidate that accepts the whole input, falling back
/// to lossy UTF-8. Never fails.
pub fn decode_with(bytes: &[u8], candidates: &[Candidate]) -> (String, &'static str, bool) {
    for candidate in candidates {
        match candidate.decode(bytes) {
            Some(text) => return (text.into_owned(), candidate.label(), false),
            None => debug!(encoding = candidate.label(), "Candidate rejected"),
        }
    }
    (String::from_utf8_lossy(bytes).into_owned(), UTF_8.name(), true)
}

pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    // A UTF-8 BOM settles the question
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        let (text, encoding, lossy) = decode_with(rest, &[Candidate::Encoding(UTF_8)]);
        return DecodedText {
            text,
            encoding,
            detected: Some(UTF_8.name()),
            lossy,
        };
    }

    let sample_len = bytes.len().min(SAMPLE_SIZE);
    let detected = detect_encoding(&bytes[..sample_len], sample_len == bytes.len());
    let (text, encoding, lossy) = decode_with(bytes, &candidate_chain(detected));

    DecodedText {
        text,
        encoding,
        detected: detected.map(|e| e.name()),
        lossy,
    }
}

/// Reads and decodes a dump file.
pub fn read_dump(path: &Path) -> Result<DecodedText, EncodingError> {
    let bytes = fs::read(path).map_err(|source| EncodingError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_bytes(&bytes);
    if decoded.lossy {
        warn!(
            path = %path.display(),
            "No encoding decoded the dump cleanly; invalid bytes were replaced"
        );
    } else {
        info!(
            path = %path.display(),
            encoding = decoded.encoding,
            detected = decoded.detected.unwrap_or("inconclusive"),
            "Decoded dump file"
        );
    }
    Ok(decoded)
}
