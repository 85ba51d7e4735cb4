//! The lookup tables behind a [`super::Vocabulary`].
//!
//! This is isolated to this module to make it easier to experiment with different hash impls.
use crate::token::{TokenInt, TokenString};

pub use rustc_hash::FxHashMap as HashMap;

/// Encoders map piece byte strings to their token ids.
#[derive(Clone, Debug, Default)]
pub struct TokenEncoder(HashMap<TokenString, TokenInt>);

/// Decoders maintain the reverse mapping, from the integer representation of the token to the
/// corresponding piece.
#[derive(Clone, Debug, Default)]
pub struct TokenDecoder(HashMap<TokenInt, TokenString>);

impl TokenEncoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity_and_hasher(capacity, Default::default()))
    }

    /// Map `piece` to `token`, returning the token it used to map to, if any.
    pub fn insert(&mut self, piece: TokenString, token: TokenInt) -> Option<TokenInt> {
        self.0.insert(piece, token)
    }

    pub fn token_for_bytes(&self, bytes: impl AsRef<[u8]>) -> Option<TokenInt> {
        self.0.get(bytes.as_ref()).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl TokenDecoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(HashMap::with_capacity_and_hasher(capacity, Default::default()))
    }

    /// Map `token` to `piece`, returning the piece it used to map to, if any.
    pub fn insert(&mut self, token: TokenInt, piece: TokenString) -> Option<TokenString> {
        self.0.insert(token, piece)
    }

    pub fn bytes_for_token(&self, token: TokenInt) -> Option<&TokenString> {
        self.0.get(&token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
