//! Deterministic cache keys for analysis requests
//!
//! A request is reduced to the canonical document
//! `{"feedback_text": .., "instructions": .., "tools": [..sorted..]}` and the
//! key is the SHA-256 hex digest of its JSON encoding. The encoding uses the
//! same byte layout the service has always written (`", "` and `": "`
//! separators, non-ASCII escaped as `\uXXXX`), so keys already stored in a
//! shared table stay addressable.

use crate::cache::types::CacheKey;
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::io;

/// Length of a derived key in hex characters
pub const KEY_LENGTH: usize = 64;

/// Canonical request document. Fields are declared in sorted key order.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    feedback_text: &'a str,
    instructions: &'a str,
    tools: BTreeSet<&'a str>,
}

/// JSON formatter with spaced separators and ASCII-only output
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\u{7f}' {
                continue;
            }
            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + ch.len_utf8();
        }

        writer.write_all(&bytes[start..])
    }
}

/// Canonical JSON bytes for a request triple
pub fn canonical_form<I, S>(text: &str, instructions: &str, tools: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let owned: Vec<S> = tools.into_iter().collect();
    let request = CanonicalRequest {
        feedback_text: text,
        instructions,
        tools: owned.iter().map(AsRef::as_ref).collect(),
    };

    let mut buf = Vec::with_capacity(text.len() + instructions.len() + 64);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, CanonicalFormatter);
    request.serialize(&mut ser)?;
    Ok(buf)
}

/// Derive the cache key for `(text, instructions, tools)`
///
/// Tool order and duplicate tool names do not affect the key. Text and
/// instructions are hashed exactly as given.
pub fn derive<I, S>(text: &str, instructions: &str, tools: I) -> Result<CacheKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let canonical = canonical_form(text, instructions, tools)?;
    let digest = Sha256::digest(&canonical);
    Ok(format!("{:x}", digest))
}

/// True if `key` has the shape of a derived key
pub fn is_valid_key(key: &str) -> bool {
    key.len() == KEY_LENGTH && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
