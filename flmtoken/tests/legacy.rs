//! End to end tests of the legacy vocabulary backend, starting from files on disk.
use flmtoken::{BackendKind, LegacyEntry, LegacyVocabFile, Tokenizer};
use proptest::prelude::*;
use std::path::Path;

const BLANK: &str = "\u{2581}";

/// Write a legacy vocabulary by hand, int by int, so these tests don't rely on the writer.
fn write_vocab(path: &Path, version: i32, metadata: &[(&str, &str)], pieces: &[(&[u8], i32)]) {
    fn int(bytes: &mut Vec<u8>, value: i32) {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let mut bytes = Vec::new();
    int(&mut bytes, version);
    if version >= 1 {
        int(&mut bytes, metadata.len() as i32);
        for (key, value) in metadata {
            int(&mut bytes, key.len() as i32);
            bytes.extend_from_slice(key.as_bytes());
            int(&mut bytes, value.len() as i32);
            bytes.extend_from_slice(value.as_bytes());
        }
    }

    int(&mut bytes, pieces.len() as i32);
    for (piece, id) in pieces {
        int(&mut bytes, piece.len() as i32);
        for byte in piece.iter() {
            int(&mut bytes, i32::from(*byte));
        }
        int(&mut bytes, *id);
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
    }

    std::fs::write(path, bytes).unwrap();
}

/// Lowercase letters, digits and the byte fallback pieces needed to spell the blank marker
fn alphabet_vocab(path: &Path) {
    let mut pieces = Vec::new();
    for (id, byte) in (b'a'..=b'z').chain(b'0'..=b'9').enumerate() {
        pieces.push((vec![byte], id as i32 + 3));
    }
    for (id, piece) in ["<0xE2>", "<0x96>", "<0x81>"].iter().enumerate() {
        pieces.push((piece.as_bytes().to_vec(), 1000 + id as i32));
    }

    let pieces = pieces
        .iter()
        .map(|(piece, id)| (piece.as_slice(), *id))
        .collect::<Vec<_>>();
    write_vocab(path, 1, &[("model", "test")], &pieces);
}

fn alphabet_tokenizer() -> (tempfile::TempDir, Tokenizer) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alphabet.bin");
    alphabet_vocab(&path);
    let tokenizer = Tokenizer::initialize(&path).unwrap();

    (dir, tokenizer)
}

#[test]
fn parses_version_1_file_with_two_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.bin");
    write_vocab(
        &path,
        1,
        &[("tokenizer", "llama")],
        &[(&b"he"[..], 5), (BLANK.as_bytes(), 9)],
    );

    let tokenizer = Tokenizer::initialize(&path).unwrap();
    assert_eq!(BackendKind::Legacy, tokenizer.backend_kind());

    let vocab = tokenizer.vocabulary();
    assert_eq!(2, vocab.len());
    assert_eq!(Some(&b"he"[..]), vocab.piece_for_token(5));
    assert_eq!(Some(BLANK.as_bytes()), vocab.piece_for_token(9));
    assert_eq!(Some(9), vocab.token_for_piece(BLANK));

    let file = tokenizer.legacy_file().unwrap();
    assert_eq!(1, file.version);
    assert_eq!(
        vec![(b"tokenizer".to_vec(), b"llama".to_vec())],
        file.metadata
    );
    assert_eq!(
        LegacyEntry {
            id: 5,
            piece: b"he".to_vec(),
            score: 0.25
        },
        file.entries[0]
    );
}

#[test]
fn whitespace_runs_become_one_marker() {
    let (_dir, tokenizer) = alphabet_tokenizer();
    let marker = [1000, 1001, 1002];
    let a = tokenizer.vocabulary().token_for_piece("a").unwrap();
    let b = tokenizer.vocabulary().token_for_piece("b").unwrap();

    let expected = [&marker[..], &[a][..], &marker[..], &[b][..]].concat();
    assert_eq!(expected, tokenizer.encode("a b"));
    assert_eq!(expected, tokenizer.encode("a  b"));
    assert_eq!(expected, tokenizer.encode("a       b"));
}

#[test]
fn fixed_token_bypass() {
    let (_dir, tokenizer) = alphabet_tokenizer();

    assert_eq!(vec![42], tokenizer.encode("<FLM_FIX_TOKEN_42extra"));
}

#[test]
fn byte_fallback_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.bin");

    // '«' is C2 AB in UTF-8; neither byte has a piece of its own
    write_vocab(
        &path,
        0,
        &[],
        &[(&b"x"[..], 0), (&b"<0xC2>"[..], 1), (&b"<0xAB>"[..], 2)],
    );
    let tokenizer = Tokenizer::initialize(&path).unwrap();

    // The blank marker can't be spelled with this vocabulary, so it's silently dropped
    let tokens = tokenizer.encode("x\u{ab}");
    assert_eq!(vec![0, 1, 2], tokens);
    assert_eq!(vec![b'x', 0xc2, 0xab], tokenizer.decode_to_bytes(&tokens));
    assert_eq!(vec![0xab], tokenizer.decode_to_bytes(&[2]));
    assert_eq!("x\u{ab}", tokenizer.decode(&tokens));
}

#[test]
fn raw_byte_encodes_to_its_fallback_piece() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.bin");
    write_vocab(&path, 0, &[], &[(&b"x"[..], 3), (&b"<0xAB>"[..], 7)]);
    let tokenizer = Tokenizer::initialize(&path).unwrap();

    // A lone 0xAB isn't UTF-8, so only the byte level entry point can take it
    assert_eq!(vec![7], tokenizer.encode_bytes(&[0xab]));
    assert_eq!(vec![0xab], tokenizer.decode_to_bytes(&[7]));

    // Whatever comes out of decoding goes back in unchanged
    let decoded = tokenizer.decode_to_bytes(&[3, 7, 3]);
    assert_eq!(vec![b'x', 0xab, b'x'], decoded);
    assert_eq!(vec![3, 7, 3], tokenizer.encode_bytes(&decoded));
}

#[test]
fn newline_tab_and_blank_run_markers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocab.bin");
    write_vocab(
        &path,
        0,
        &[],
        &[
            (&b"x<n>y<|tab|>z"[..], 0),
            (&b"junk"[..], 1),
            (&b"<|blank_5|>"[..], 2),
        ],
    );
    let tokenizer = Tokenizer::initialize(&path).unwrap();

    assert_eq!("x\ny\tz", tokenizer.decode(&[0]));
    assert_eq!("     ", tokenizer.decode(&[1, 2, 0, 1]));
}

#[test]
fn export_reloads_identically() {
    let (dir, tokenizer) = alphabet_tokenizer();

    let copy = dir.path().join("copy.bin");
    LegacyVocabFile::from_vocabulary(tokenizer.vocabulary())
        .save(&copy)
        .unwrap();
    let reloaded = Tokenizer::initialize(&copy).unwrap();

    assert_eq!(
        tokenizer.vocabulary().entries().collect::<Vec<_>>(),
        reloaded.vocabulary().entries().collect::<Vec<_>>()
    );
    assert_eq!(
        tokenizer.encode("hello world 42"),
        reloaded.encode("hello world 42")
    );
}

proptest! {
    /// Text that starts with a single space, made of mapped characters and single interior spaces,
    /// decodes back to exactly what was encoded.  The leading space is the one every encoding
    /// implicitly starts with.
    #[test]
    fn round_trip(words in prop::collection::vec("[a-z0-9]{1,8}", 1..10)) {
        let (_dir, tokenizer) = alphabet_tokenizer();
        let text = format!(" {}", words.join(" "));

        let tokens = tokenizer.encode(&text);
        prop_assert_eq!(text, tokenizer.decode(&tokens));
    }

    /// Space runs decode as a single space, wherever they are.
    #[test]
    fn space_runs_decode_as_one_space(words in prop::collection::vec("[a-z]{1,4}", 1..6), run in 1usize..5) {
        let (_dir, tokenizer) = alphabet_tokenizer();
        let text = words.join(" ".repeat(run).as_str());

        let decoded = tokenizer.decode(&tokenizer.encode(&text));
        prop_assert_eq!(format!(" {}", words.join(" ")), decoded);
    }
}
