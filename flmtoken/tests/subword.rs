//! Exercise the subword model backend with a stand-in model, so no real SentencePiece file is
//! needed.
use flmtoken::{BackendKind, FlmtokenError, TokenInt, TokenString, Tokenizer};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const MAGIC: &str = "mock-subword-model";

/// A "model" stored as a text file: a magic first line, then one piece per line.  It encodes by
/// looking up each character, turning spaces into the blank marker the way SentencePiece does.
struct MockModel {
    pieces: Vec<String>,
    ready: bool,
    encode_calls: Arc<AtomicUsize>,
}

impl MockModel {
    fn new(pieces: &[&str]) -> Self {
        Self {
            pieces: pieces.iter().map(|piece| piece.to_string()).collect(),
            ready: true,
            encode_calls: Default::default(),
        }
    }
}

impl flmtoken::SubwordModel for MockModel {
    fn load(path: &Path) -> flmtoken::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FlmtokenError::ModelLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut lines = text.lines();
        if lines.next() != Some(MAGIC) {
            return Err(FlmtokenError::ModelLoad {
                path: path.to_path_buf(),
                message: "missing magic".to_string(),
            });
        }

        Ok(Self::new(&lines.collect::<Vec<_>>()))
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn encode(&self, text: &str) -> Vec<TokenInt> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        text.chars()
            .map(|c| if c == ' ' { '\u{2581}' } else { c })
            .filter_map(|c| {
                let c = c.to_string();
                self.pieces.iter().position(|piece| *piece == c)
            })
            .collect()
    }

    fn decode(&self, tokens: &[TokenInt]) -> TokenString {
        tokens
            .iter()
            .filter_map(|token| self.pieces.get(*token))
            .flat_map(|piece| piece.bytes())
            .collect()
    }

    fn piece_size(&self) -> usize {
        self.pieces.len()
    }

    fn id_to_piece(&self, token: TokenInt) -> Option<TokenString> {
        self.pieces.get(token).map(|piece| piece.as_bytes().to_vec())
    }
}

const PIECES: &[&str] = &["<unk>", "h", "i", "\u{2581}", "<n>", "<|tab|>", "<0x21>"];

#[test]
fn loads_model_when_it_can() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mock.model");
    std::fs::write(&path, format!("{MAGIC}\n{}", PIECES.join("\n"))).unwrap();

    let tokenizer = Tokenizer::initialize_with::<MockModel>(&path).unwrap();

    assert_eq!(BackendKind::Subword, tokenizer.backend_kind());
    assert!(tokenizer.legacy_file().is_none());
    assert_eq!(PIECES.len(), tokenizer.vocabulary().len());
    assert_eq!(Some(3), tokenizer.vocabulary().token_for_piece("\u{2581}"));
    assert_eq!(Some(&b"<n>"[..]), tokenizer.vocabulary().piece_for_token(4));
}

#[test]
fn model_encoding_is_used_verbatim() {
    let tokenizer = Tokenizer::from_model(MockModel::new(PIECES));

    // No leading blank marker, and no space collapsing; that's the legacy algorithm, not this one
    assert_eq!(vec![1, 2, 3, 3, 1], tokenizer.encode("hi  h"));
}

#[test]
fn fixed_token_skips_the_model() {
    let model = MockModel::new(PIECES);
    let encode_calls = model.encode_calls.clone();
    let tokenizer = Tokenizer::from_model(model);

    assert_eq!(vec![42], tokenizer.encode("<FLM_FIX_TOKEN_42extra"));
    assert_eq!(vec![0], tokenizer.encode("<FLM_FIX_TOKEN_x"));
    assert_eq!(0, encode_calls.load(Ordering::SeqCst));

    assert_eq!(vec![1, 2], tokenizer.encode("hi"));
    assert_eq!(1, encode_calls.load(Ordering::SeqCst));
}

#[test]
fn fixed_token_prefix_alone_goes_to_the_model() {
    let tokenizer = Tokenizer::from_model(MockModel::new(&["<", "F"]));

    assert_eq!(vec![0, 1], tokenizer.encode("<F"));
    assert_eq!(vec![0, 1, 1], tokenizer.encode("<FLM_FIX_TOKEN_"));
}

#[test]
fn model_decoding_is_expanded() {
    let tokenizer = Tokenizer::from_model(MockModel::new(PIECES));

    // "h" "i" "<0x21>" "<n>" "▁" "h" "<|tab|>"
    assert_eq!("hi!\n h\t", tokenizer.decode(&[1, 2, 6, 4, 3, 1, 5]));
    assert_eq!("", tokenizer.decode(&[]));
}

#[test]
fn blank_run_overrides_model_output() {
    let tokenizer = Tokenizer::from_model(MockModel::new(&["hello", "<|blank_3|>"]));

    assert_eq!("   ", tokenizer.decode(&[0, 1, 0]));
}

#[test]
fn model_that_is_not_ready_uses_the_fallback() {
    let mut model = MockModel::new(&["h", "i", "<0xE2>", "<0x96>", "<0x81>"]);
    model.ready = false;
    let tokenizer = Tokenizer::from_model(model);

    assert_eq!(BackendKind::Subword, tokenizer.backend_kind());
    assert_eq!(vec![2, 3, 4, 0, 2, 3, 4, 1], tokenizer.encode("h i"));
    assert_eq!(" h i", tokenizer.decode(&tokenizer.encode("h i")));
}

#[test]
fn invalid_utf8_reaches_the_model_as_replacement_characters() {
    let tokenizer = Tokenizer::from_model(MockModel::new(&["h", "\u{fffd}"]));

    assert_eq!(vec![0, 1, 0], tokenizer.encode_bytes(b"h\xffh"));
    assert_eq!(vec![42], tokenizer.encode_bytes(b"<FLM_FIX_TOKEN_42\xff"));
}
