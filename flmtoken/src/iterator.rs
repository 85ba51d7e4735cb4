//! The fallback tokenizer used when there's no subword model, implemented as a Rust [`Iterator`].
//!
//! It's about as simple as a tokenizer gets.  Spaces are rewritten to blank markers, then the
//! result is looked up in the vocabulary one byte at a time, with `<0xHH>` pieces as the fallback
//! for bytes that don't have a piece of their own.
use crate::escape::{self, BLANK_MARKER};
use crate::{TokenInt, TokenString, Vocabulary};

/// Encode `text` with the fallback algorithm.
///
/// Input bytes for which neither a single byte piece nor a `<0xHH>` piece exist are dropped.
/// That's lossy, but it's the documented behavior of this tokenizer and not an error.
pub(crate) fn fallback_encode(text: &[u8], vocab: &Vocabulary) -> Vec<TokenInt> {
    if let Some(token) = escape::parse_fixed_token(text) {
        return vec![token];
    }

    let working = substitute_blanks(text);

    // Can't match today since `working` always starts with a blank marker, but the fixed token
    // check applies to the rewritten text too.
    if let Some(token) = escape::parse_fixed_token(&working) {
        return vec![token];
    }

    FallbackEncodeIterator::new(vocab, working).collect()
}

/// Rewrite spaces as blank markers.
///
/// The output always starts with one blank marker.  After that, each run of spaces becomes a
/// single blank marker, except that spaces at the very start of the input are absorbed by that
/// leading marker.  Everything else is copied as is.
pub(crate) fn substitute_blanks(text: &[u8]) -> TokenString {
    let mut working = Vec::with_capacity(text.len() + BLANK_MARKER.len());
    working.extend_from_slice(BLANK_MARKER);

    let mut previous = None;
    for &byte in text {
        if byte == b' ' {
            if previous.is_some_and(|previous| previous != b' ') {
                working.extend_from_slice(BLANK_MARKER);
            }
        } else {
            working.push(byte);
        }
        previous = Some(byte);
    }

    working
}

/// Yields the token for each byte of text that has already had its spaces substituted.
pub(crate) struct FallbackEncodeIterator<'a> {
    vocab: &'a Vocabulary,

    /// The text being encoded, after blank substitution
    working: TokenString,

    /// The offset into `working` of the next byte to encode
    pos: usize,
}

impl<'a> FallbackEncodeIterator<'a> {
    pub(crate) fn new(vocab: &'a Vocabulary, working: TokenString) -> Self {
        Self {
            vocab,
            working,
            pos: 0,
        }
    }
}

impl<'a> Iterator for FallbackEncodeIterator<'a> {
    type Item = TokenInt;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&byte) = self.working.get(self.pos) {
            self.pos += 1;

            let token = self
                .vocab
                .token_for_piece([byte])
                .or_else(|| self.vocab.token_for_piece(escape::byte_fallback_marker(byte)));
            if token.is_some() {
                return token;
            }

            // No piece for this byte at all; skip it
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Each remaining byte yields at most one token
        (0, Some(self.working.len() - self.pos))
    }
}
