/// A token in its integer form, as fed to the language model.
///
/// Ids are whatever the vocabulary says they are.  For the legacy binary format that's the `id`
/// field stored next to each piece; for a SentencePiece model it's the index of the piece in the
/// model.  Either way ids are never negative.
pub type TokenInt = usize;

/// A token in its byte string form, also called a "piece".
///
/// Pieces are bytes rather than `String` because the legacy format builds them by truncating
/// integer character codes to a single byte, and because byte-fallback pieces decode to raw bytes
/// which need not be valid UTF-8 on their own.
pub type TokenString = Vec<u8>;
