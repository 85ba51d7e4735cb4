use snafu::ResultExt;
use std::path::Path;
use std::sync::Arc;
use tracing::*;

mod backend;
mod error;
pub mod escape;
mod iterator;
mod model;
mod token;
mod vocab;

use backend::{Backend, LegacyBackend, SubwordBackend};

pub use backend::BackendKind;
pub use error::*;
pub use model::*;
pub use token::*;
pub use vocab::*;

pub type Result<T> = std::result::Result<T, FlmtokenError>;

/// Converts text to token ids for a language model, and token ids back to text.
///
/// A tokenizer is initialized from a single vocabulary file, which may either be a native
/// subword model (a SentencePiece `.model` by default) or a vocabulary in the legacy binary
/// format.  The subword model is tried first.  Either way, the vocabulary is loaded once and
/// never changes, and the API is the same.
///
/// Instances of `Tokenizer` are cheap to clone and can be shared between threads; encoding and
/// decoding only ever read the loaded vocabulary.
#[derive(Clone)]
pub struct Tokenizer {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("backend", &self.backend_kind())
            .field("entries", &self.vocabulary().len())
            .finish()
    }
}

impl Tokenizer {
    /// Load the vocabulary at `path`, as a SentencePiece model if possible and otherwise as a
    /// legacy vocabulary file.
    pub fn initialize(path: impl AsRef<Path>) -> Result<Self> {
        Self::initialize_with::<SentencePieceModel>(path)
    }

    /// Like [`Self::initialize`], but with a different kind of native subword model.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn initialize_with<M: SubwordModel>(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match M::load(path) {
            Ok(model) => {
                let tokenizer = Self::from_model(model);
                debug!(
                    pieces = tokenizer.vocabulary().len(),
                    "Using subword model backend"
                );
                Ok(tokenizer)
            }
            Err(native) => {
                warn!(
                    error = %native,
                    "Not a subword model; trying the legacy vocabulary format"
                );
                let file = LegacyVocabFile::load(path).context(NoUsableBackendSnafu {
                    path,
                    native: native.to_string(),
                })?;

                Ok(Self::from_legacy(file))
            }
        }
    }

    /// Make a tokenizer from an already loaded subword model.
    pub fn from_model<M: SubwordModel>(model: M) -> Self {
        Self {
            backend: Arc::new(SubwordBackend::new(model)),
        }
    }

    /// Make a tokenizer from an already parsed legacy vocabulary.
    pub fn from_legacy(file: LegacyVocabFile) -> Self {
        Self {
            backend: Arc::new(LegacyBackend::new(file)),
        }
    }

    /// Which backend this tokenizer is using
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The id/piece mapping.  For a subword model this is informational only; the model's own
    /// encoding and decoding are what's used.
    pub fn vocabulary(&self) -> &Vocabulary {
        self.backend.vocabulary()
    }

    /// The legacy file this tokenizer was loaded from, if it was loaded from one.
    pub fn legacy_file(&self) -> Option<&LegacyVocabFile> {
        self.backend.legacy_file()
    }

    /// Encode text into token ids.
    ///
    /// If `text` starts with `<FLM_FIX_TOKEN_` followed by more text, the digits right after that
    /// prefix are the one and only token returned, whatever the backend.
    ///
    /// With the legacy backend, characters that can't be found in the vocabulary (not even as a
    /// `<0xHH>` byte piece) are silently left out of the result.
    pub fn encode(&self, text: impl AsRef<str>) -> Vec<TokenInt> {
        self.encode_bytes(text.as_ref().as_bytes())
    }

    /// Encode raw bytes, which need not be valid UTF-8.
    ///
    /// The legacy backend looks each byte up on its own, so a byte like `0xAB` encodes to the
    /// `<0xAB>` piece, and whatever [`Self::decode_to_bytes`] returns can be encoded again.  A
    /// subword model only accepts text, so for that backend invalid UTF-8 is replaced with U+FFFD
    /// before the model sees it.
    pub fn encode_bytes(&self, text: &[u8]) -> Vec<TokenInt> {
        self.backend.encode(text)
    }

    /// Decode token ids into the bytes they stand for, with all escape markers expanded.
    ///
    /// Ids that aren't in the vocabulary are silently skipped.
    pub fn decode_to_bytes(&self, tokens: &[TokenInt]) -> TokenString {
        escape::expand(&self.backend.decode_raw(tokens))
    }

    /// Decode token ids into text.
    ///
    /// Byte fallback tokens can produce byte sequences that aren't valid UTF-8.  Those are
    /// replaced with U+FFFD rather than failing; use [`Self::decode_to_bytes`] to get the exact
    /// bytes.
    pub fn decode(&self, tokens: &[TokenInt]) -> String {
        String::from_utf8_lossy(&self.decode_to_bytes(tokens)).into_owned()
    }
}
