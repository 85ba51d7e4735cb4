//! The two interchangeable ways of turning text into ids and back.
//!
//! Which one a [`crate::Tokenizer`] uses is decided once, at initialization, and callers never
//! need to care which it was.
use crate::iterator::fallback_encode;
use crate::model::SubwordModel;
use crate::{escape, LegacyVocabFile, TokenInt, TokenString, Vocabulary};
use strum::{EnumIter, EnumString, IntoStaticStr};

/// Which backend a tokenizer ended up with
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumString,
    EnumIter,
    IntoStaticStr,
    strum::Display,
)]
pub enum BackendKind {
    /// A native subword model did the loading, and does the encoding and decoding
    #[strum(serialize = "subword")]
    Subword,

    /// The file was in the legacy binary format and the fallback algorithm is in use
    #[strum(serialize = "legacy")]
    Legacy,
}

/// Encode text to ids, and ids to raw (not yet expanded) text.
pub(crate) trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn vocabulary(&self) -> &Vocabulary;

    /// The parsed legacy file, for backends that loaded one
    fn legacy_file(&self) -> Option<&LegacyVocabFile> {
        None
    }

    /// Encode raw input bytes.  They need not be UTF-8; the legacy algorithm works byte by byte.
    fn encode(&self, text: &[u8]) -> Vec<TokenInt>;

    /// Decode ids into the raw concatenation of their pieces.  Escape markers are expanded by the
    /// caller, the same way for every backend.
    fn decode_raw(&self, tokens: &[TokenInt]) -> TokenString;
}

/// Backend built on a native subword model
pub(crate) struct SubwordBackend<M> {
    model: M,

    /// Built from the model's pieces, for introspection and for the fallback path should the
    /// model ever report that it's not ready
    vocab: Vocabulary,
}

impl<M: SubwordModel> SubwordBackend<M> {
    pub(crate) fn new(model: M) -> Self {
        let vocab = Vocabulary::from_entries(
            (0..model.piece_size())
                .filter_map(|token| model.id_to_piece(token).map(|piece| (token, piece))),
        );

        Self { model, vocab }
    }
}

impl<M: SubwordModel> Backend for SubwordBackend<M> {
    fn kind(&self) -> BackendKind {
        BackendKind::Subword
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn encode(&self, text: &[u8]) -> Vec<TokenInt> {
        if !self.model.is_ready() {
            return fallback_encode(text, &self.vocab);
        }

        // Fixed tokens never reach the model
        match escape::parse_fixed_token(text) {
            Some(token) => vec![token],
            None => self.model.encode(&String::from_utf8_lossy(text)),
        }
    }

    fn decode_raw(&self, tokens: &[TokenInt]) -> TokenString {
        if self.model.is_ready() {
            self.model.decode(tokens)
        } else {
            self.vocab.concat_pieces(tokens)
        }
    }
}

/// Backend built on a legacy vocabulary file
pub(crate) struct LegacyBackend {
    file: LegacyVocabFile,
    vocab: Vocabulary,
}

impl LegacyBackend {
    pub(crate) fn new(file: LegacyVocabFile) -> Self {
        let vocab = file.to_vocabulary();
        Self { file, vocab }
    }
}

impl Backend for LegacyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    fn legacy_file(&self) -> Option<&LegacyVocabFile> {
        Some(&self.file)
    }

    fn encode(&self, text: &[u8]) -> Vec<TokenInt> {
        fallback_encode(text, &self.vocab)
    }

    fn decode_raw(&self, tokens: &[TokenInt]) -> TokenString {
        self.vocab.concat_pieces(tokens)
    }
}
