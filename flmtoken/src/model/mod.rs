//! The native subword model that the tokenizer prefers over the legacy vocabulary format.
use crate::error::{FileIoSnafu, KitokenSnafu, ModelLoadSnafu};
use crate::{Result, TokenInt, TokenString};
use snafu::ResultExt;
use std::path::Path;
use tracing::*;

mod proto;

/// A subword vocabulary model that does its own tokenizing.
///
/// When one of these loads successfully, its `encode` and `decode` are authoritative; the
/// tokenizer only adds fixed token handling on the way in and escape expansion on the way out.
/// The pieces it exposes through [`Self::id_to_piece`] are used to build the vocabulary mapping
/// for introspection.
pub trait SubwordModel: Send + Sync + 'static {
    /// Load a model from a file.  Failing here is how the tokenizer decides to try the legacy
    /// format instead, so this should fail cleanly on anything that isn't a model of this kind.
    fn load(path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Whether the model is usable for encoding and decoding
    fn is_ready(&self) -> bool;

    fn encode(&self, text: &str) -> Vec<TokenInt>;

    /// Decode ids into raw text, which may still contain escape markers.
    fn decode(&self, tokens: &[TokenInt]) -> TokenString;

    /// The number of pieces, which are numbered `0..piece_size()`
    fn piece_size(&self) -> usize;

    fn id_to_piece(&self, token: TokenInt) -> Option<TokenString>;
}

/// A SentencePiece `.model` file, tokenized with `kitoken`.
pub struct SentencePieceModel {
    inner: kitoken::Kitoken,

    /// Pieces as stored in the model, indexed by id
    pieces: Vec<TokenString>,
}

impl std::fmt::Debug for SentencePieceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentencePieceModel")
            .field("pieces", &self.pieces.len())
            .finish_non_exhaustive()
    }
}

impl SentencePieceModel {
    /// Load a serialized SentencePiece model from memory
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let pieces = proto::read_pieces(data)?;
        let inner = kitoken::Kitoken::from_sentencepiece_slice(data).map_err(|e| {
            KitokenSnafu {
                message: e.to_string(),
            }
            .build()
        })?;

        Ok(Self { inner, pieces })
    }
}

impl SubwordModel for SentencePieceModel {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).with_context(|_| FileIoSnafu {
            path: path.to_path_buf(),
        })?;

        let model = Self::from_bytes(&data).map_err(|e| {
            ModelLoadSnafu {
                path,
                message: e.to_string(),
            }
            .build()
        })?;
        debug!(pieces = model.pieces.len(), "Loaded SentencePiece model");

        Ok(model)
    }

    fn is_ready(&self) -> bool {
        !self.pieces.is_empty()
    }

    fn encode(&self, text: &str) -> Vec<TokenInt> {
        // Control pieces like `<s>` written in the text are encoded as plain text, never as their
        // control ids, same as SentencePiece itself
        match self.inner.encode(text, false) {
            Ok(tokens) => tokens.into_iter().map(|token| token as TokenInt).collect(),
            Err(e) => {
                warn!(error = ?e, "SentencePiece model failed to encode text");
                Vec::new()
            }
        }
    }

    fn decode(&self, tokens: &[TokenInt]) -> TokenString {
        // Ids the model doesn't know are dropped, same as the fallback decoder does
        let tokens = tokens
            .iter()
            .filter(|token| **token < self.pieces.len())
            .map(|token| *token as u32)
            .collect::<Vec<_>>();

        // Control pieces decode to nothing
        match self.inner.decode(tokens.as_slice(), false) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = ?e, "SentencePiece model failed to decode tokens");
                Vec::new()
            }
        }
    }

    fn piece_size(&self) -> usize {
        self.pieces.len()
    }

    fn id_to_piece(&self, token: TokenInt) -> Option<TokenString> {
        self.pieces.get(token).cloned()
    }
}
