use crate::{TokenInt, TokenString};
use tracing::*;

mod hash;
mod legacy;
mod reader;

pub(crate) use hash::{TokenDecoder, TokenEncoder};
pub use legacy::{LegacyEntry, LegacyVocabFile};
pub use reader::ByteStreamReader;

/// The id/piece mapping of a loaded vocabulary.
///
/// A vocabulary is built exactly once, when the tokenizer is initialized, and never changes
/// after that.  It holds two parallel views: piece to id (used by the fallback encoder) and id to
/// piece (used by the fallback decoder), as well as the entries in the order they were loaded.
///
/// When two entries share the same piece, the reverse (piece to id) view keeps whichever came
/// last.  That's what every producer of these files has always done, so it's preserved here, but
/// a warning is logged since it's almost certainly not what the vocabulary author intended.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    /// Every entry in load order
    entries: Vec<(TokenInt, TokenString)>,

    /// Mapping of pieces to token ids
    encode: TokenEncoder,

    /// Mapping of token ids back to pieces
    decode: TokenDecoder,
}

impl Vocabulary {
    /// Build a vocabulary from `(id, piece)` pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TokenInt, TokenString)>,
    {
        let entries = entries.into_iter().collect::<Vec<_>>();
        let mut encode = TokenEncoder::with_capacity(entries.len());
        let mut decode = TokenDecoder::with_capacity(entries.len());

        for (token, piece) in &entries {
            if let Some(previous) = encode.insert(piece.clone(), *token) {
                if previous != *token {
                    warn!(
                        piece = %String::from_utf8_lossy(piece),
                        previous,
                        token,
                        "Duplicate piece in vocabulary; the later id wins when encoding"
                    );
                }
            }
            decode.insert(*token, piece.clone());
        }

        debug!(
            entries = entries.len(),
            pieces = encode.len(),
            ids = decode.len(),
            "Built vocabulary mapping"
        );

        Self {
            entries,
            encode,
            decode,
        }
    }

    /// The number of entries that were loaded, including any with duplicate pieces or ids
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All `(id, piece)` entries, in the order they were loaded.
    pub fn entries(&self) -> impl Iterator<Item = (TokenInt, &[u8])> {
        self.entries
            .iter()
            .map(|(token, piece)| (*token, piece.as_slice()))
    }

    /// Look up the id for a piece
    pub fn token_for_piece(&self, piece: impl AsRef<[u8]>) -> Option<TokenInt> {
        self.encode.token_for_bytes(piece)
    }

    /// Look up the piece for an id
    pub fn piece_for_token(&self, token: TokenInt) -> Option<&[u8]> {
        self.decode.bytes_for_token(token).map(Vec::as_slice)
    }

    /// Concatenate the pieces for `tokens`, in order.
    ///
    /// Ids that aren't in the vocabulary are skipped.  This is deliberately lossy rather than an
    /// error, so that a model emitting an id from outside the vocabulary doesn't abort decoding
    /// of everything around it.
    pub fn concat_pieces(&self, tokens: &[TokenInt]) -> TokenString {
        let mut raw = Vec::with_capacity(tokens.len() * 2);
        for token in tokens {
            match self.piece_for_token(*token) {
                Some(piece) => raw.extend_from_slice(piece),
                None => trace!(token, "Skipping id that isn't in the vocabulary"),
            }
        }

        raw
    }
}
