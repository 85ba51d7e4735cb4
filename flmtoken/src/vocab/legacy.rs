//! The legacy self-describing binary vocabulary format.
//!
//! All integers and floats are 4 bytes, little-endian, unaligned:
//!
//! ```text
//! int versionId
//! if versionId >= 1:
//!     int kvCount
//!     kvCount x (lenstr key, lenstr value)
//! int vocabLen
//! vocabLen x (int charCount, charCount x int charCode, int id, float score)
//!
//! lenstr = int length, length raw bytes
//! ```
//!
//! Each `charCode` contributes exactly one byte to the piece: its low byte.  The rest of the
//! integer is thrown away, which is how the format has always been consumed.
use super::{ByteStreamReader, Vocabulary};
use crate::error::{FileIoSnafu, ValueTooLargeSnafu, WriteSnafu};
use crate::{Result, TokenInt, TokenString};
use snafu::{OptionExt, ResultExt};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::*;

/// Files at this version or above carry a key/value metadata table.
const METADATA_VERSION: i32 = 1;

/// Upper bound on up-front allocation driven by counts read from the file.
const MAX_PREALLOCATE: usize = 1 << 16;

/// One vocabulary entry as stored in a legacy file
#[derive(Clone, Debug, PartialEq)]
pub struct LegacyEntry {
    pub id: TokenInt,
    pub piece: TokenString,

    /// Not used for encoding or decoding
    pub score: f32,
}

/// The full contents of a legacy vocabulary file.
///
/// Only `entries` matter for encoding and decoding.  The version and metadata table are kept so
/// the file can be inspected and written back out unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct LegacyVocabFile {
    pub version: i32,

    /// Key/value pairs, in file order.  Always empty when `version` is less than 1.
    pub metadata: Vec<(Vec<u8>, Vec<u8>)>,

    pub entries: Vec<LegacyEntry>,
}

impl LegacyVocabFile {
    /// Parse a legacy vocabulary file from the filesystem.
    ///
    /// The file handle is closed before this returns, whether it succeeds or not.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = ByteStreamReader::open(path.as_ref())?;
        let file = Self::read_from(&mut reader)?;

        debug!(
            version = file.version,
            metadata = file.metadata.len(),
            entries = file.entries.len(),
            bytes = reader.offset(),
            "Loaded legacy vocabulary"
        );

        Ok(file)
    }

    /// Parse a legacy vocabulary from a byte stream.
    ///
    /// Any short read is a hard error.  Bytes after the last entry are not read.
    pub fn read_from<R: Read>(reader: &mut ByteStreamReader<R>) -> Result<Self> {
        let version = reader.read_i32("versionId")?;

        let mut metadata = Vec::new();
        if version >= METADATA_VERSION {
            let count = reader.read_usize("keyValueLen")?;
            metadata.reserve(count.min(MAX_PREALLOCATE));
            for _ in 0..count {
                let key = reader.read_string("metadata key")?;
                let value = reader.read_string("metadata value")?;
                metadata.push((key, value));
            }
        }

        let vocab_len = reader.read_usize("vocabLen")?;
        let mut entries = Vec::with_capacity(vocab_len.min(MAX_PREALLOCATE));
        for _ in 0..vocab_len {
            let char_count = reader.read_usize("piece length")?;
            let mut piece = Vec::with_capacity(char_count.min(MAX_PREALLOCATE));
            for _ in 0..char_count {
                // Truncation to the low byte is part of the format
                piece.push(reader.read_i32("piece character")? as u8);
            }
            let id = reader.read_usize("token id")?;
            let score = reader.read_f32("score")?;

            entries.push(LegacyEntry { id, piece, score });
        }

        Ok(Self {
            version,
            metadata,
            entries,
        })
    }

    /// Make a version 1 file with no metadata from an existing vocabulary.  Scores are all zero.
    pub fn from_vocabulary(vocab: &Vocabulary) -> Self {
        Self {
            version: METADATA_VERSION,
            metadata: Vec::new(),
            entries: vocab
                .entries()
                .map(|(id, piece)| LegacyEntry {
                    id,
                    piece: piece.to_vec(),
                    score: 0.0,
                })
                .collect(),
        }
    }

    /// Build the id/piece mapping for this file's entries.
    pub fn to_vocabulary(&self) -> Vocabulary {
        Vocabulary::from_entries(
            self.entries
                .iter()
                .map(|entry| (entry.id, entry.piece.clone())),
        )
    }

    /// Write this vocabulary to a file in the legacy format, replacing the file if it exists.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|_| FileIoSnafu {
            path: path.to_path_buf(),
        })?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush().context(WriteSnafu)
    }

    /// Serialize in the legacy format.
    ///
    /// This is the exact inverse of [`Self::read_from`].  The metadata table is written only if
    /// `version` calls for one.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        write_i32(&mut writer, self.version)?;

        if self.version >= METADATA_VERSION {
            write_len(&mut writer, "keyValueLen", self.metadata.len())?;
            for (key, value) in &self.metadata {
                write_string(&mut writer, "metadata key", key)?;
                write_string(&mut writer, "metadata value", value)?;
            }
        }

        write_len(&mut writer, "vocabLen", self.entries.len())?;
        for entry in &self.entries {
            write_len(&mut writer, "piece length", entry.piece.len())?;
            for byte in &entry.piece {
                write_i32(&mut writer, i32::from(*byte))?;
            }
            write_len(&mut writer, "token id", entry.id)?;
            writer
                .write_all(&entry.score.to_le_bytes())
                .context(WriteSnafu)?;
        }

        Ok(())
    }
}

fn write_i32(writer: &mut impl Write, value: i32) -> Result<()> {
    writer.write_all(&value.to_le_bytes()).context(WriteSnafu)
}

fn write_len(writer: &mut impl Write, field: &'static str, value: usize) -> Result<()> {
    let value = i32::try_from(value)
        .ok()
        .context(ValueTooLargeSnafu { field, value })?;
    write_i32(writer, value)
}

fn write_string(writer: &mut impl Write, field: &'static str, bytes: &[u8]) -> Result<()> {
    write_len(writer, field, bytes.len())?;
    writer.write_all(bytes).context(WriteSnafu)
}
