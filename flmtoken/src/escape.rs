//! The escape grammar shared by both backends.
//!
//! Vocabularies produced for fastllm spell certain bytes with textual markers:
//!
//! - `<FLM_FIX_TOKEN_123` at the start of the input means "emit token 123", bypassing
//!   tokenization entirely.
//! - `<0xHH>` is one raw byte, for characters that have no piece of their own.
//! - `<n>` is a newline and `<|tab|>` is a tab.
//! - [`BLANK_MARKER`] (U+2581, "▁") stands for a space.
//! - `<|blank_N|>` anywhere in decoded output replaces the *whole* output with N spaces.
use crate::{TokenInt, TokenString};
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use tracing::*;

/// The three byte UTF-8 encoding of U+2581 LOWER ONE EIGHTH BLOCK, used in place of a space.
pub const BLANK_MARKER: &[u8] = "\u{2581}".as_bytes();

/// Input that starts with this, followed by decimal digits, names a token id directly
pub const FIXED_TOKEN_PREFIX: &[u8] = b"<FLM_FIX_TOKEN_";

const NEWLINE_MARKER: &[u8] = b"<n>";
const TAB_MARKER: &[u8] = b"<|tab|>";
const BLANK_RUN_PREFIX: &[u8] = b"<|blank_";
const BLANK_RUN_SUFFIX_LEN: usize = b"|>".len();
const BYTE_FALLBACK_LEN: usize = 6;

static BLANK_MARKER_FINDER: Lazy<AhoCorasick> = Lazy::new(|| AhoCorasick::new([BLANK_MARKER]));
static BLANK_RUN_FINDER: Lazy<AhoCorasick> = Lazy::new(|| AhoCorasick::new([BLANK_RUN_PREFIX]));

/// If `text` starts with [`FIXED_TOKEN_PREFIX`] and has something after it, return the id named
/// by the decimal digits right after the prefix.
///
/// Parsing stops at the first non-digit, and anything after that is ignored.  No digits at all
/// means id 0.  An id too big for [`TokenInt`] saturates.
pub fn parse_fixed_token(text: &[u8]) -> Option<TokenInt> {
    if text.len() <= FIXED_TOKEN_PREFIX.len() || !text.starts_with(FIXED_TOKEN_PREFIX) {
        return None;
    }

    Some(parse_leading_digits(&text[FIXED_TOKEN_PREFIX.len()..]).unwrap_or(TokenInt::MAX))
}

/// The `<0xHH>` marker for a byte, with uppercase hex digits.
pub fn byte_fallback_marker(byte: u8) -> [u8; BYTE_FALLBACK_LEN] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    [
        b'<',
        b'0',
        b'x',
        HEX[usize::from(byte >> 4)],
        HEX[usize::from(byte & 0x0f)],
        b'>',
    ]
}

/// Expand decoded pieces into the text they stand for.
///
/// One left to right pass replaces `<0xHH>` with the byte it names, `<n>` with a newline and
/// `<|tab|>` with a tab, copying everything else through.  Then every blank marker becomes a
/// space.  Finally, if the result contains `<|blank_N|>` anywhere, the result is thrown away and
/// N spaces are returned instead.
pub fn expand(raw: &[u8]) -> TokenString {
    let mut expanded = Vec::with_capacity(raw.len());
    let mut pos = 0;

    while pos < raw.len() {
        let rest = &raw[pos..];
        if let Some(byte) = rest.get(..BYTE_FALLBACK_LEN).and_then(parse_byte_fallback) {
            expanded.push(byte);
            pos += BYTE_FALLBACK_LEN;
        } else if rest.starts_with(NEWLINE_MARKER) {
            expanded.push(b'\n');
            pos += NEWLINE_MARKER.len();
        } else if rest.starts_with(TAB_MARKER) {
            expanded.push(b'\t');
            pos += TAB_MARKER.len();
        } else {
            expanded.push(rest[0]);
            pos += 1;
        }
    }

    // Replacing a marker with a space can't create a new marker, so one pass is enough
    let expanded = BLANK_MARKER_FINDER.replace_all_bytes(&expanded, &[b" "]);

    if let Some(found) = BLANK_RUN_FINDER.find(&expanded) {
        // The count is read as though the marker ends the output: the last two bytes after the
        // prefix are taken to be `|>` and not looked at, even when they're digits
        let digits = &expanded[found.end()..];
        let digits = match digits.len().checked_sub(BLANK_RUN_SUFFIX_LEN) {
            Some(len) => &digits[..len],
            None => digits,
        };
        match parse_leading_digits(digits) {
            Some(count) => return vec![b' '; count],
            None => warn!("Ignoring blank run marker with an out of range count"),
        }
    }

    expanded
}

/// Parse a `<0xHH>` marker.  Either case of hex digit is accepted.
fn parse_byte_fallback(candidate: &[u8]) -> Option<u8> {
    match candidate {
        [b'<', b'0', b'x', high, low, b'>'] => {
            let high = (*high as char).to_digit(16)?;
            let low = (*low as char).to_digit(16)?;
            Some((high * 16 + low) as u8)
        }
        _ => None,
    }
}

/// Parse the run of ASCII digits at the start of `bytes` as a decimal number.
///
/// An empty run is zero.  Returns `None` on overflow.
fn parse_leading_digits(bytes: &[u8]) -> Option<usize> {
    bytes
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .try_fold(0usize, |value, digit| {
            value.checked_mul(10)?.checked_add(usize::from(digit - b'0'))
        })
}
