//! Just enough of the protobuf wire format to list the pieces of a SentencePiece `ModelProto`.
//!
//! The tokenizing itself is done by `kitoken`, but it doesn't expose pieces by index, which is
//! what the vocabulary mapping is built from.  The relevant part of the schema is:
//!
//! ```text
//! message ModelProto {
//!   repeated SentencePiece pieces = 1;
//!   ...
//! }
//! message SentencePiece {
//!   optional string piece = 1;
//!   optional float score = 2;
//!   optional Type type = 3;
//! }
//! ```
use crate::error::InvalidModelProtoSnafu;
use crate::{Result, TokenString};
use snafu::ensure;

const WIRE_VARINT: u64 = 0;
const WIRE_FIXED64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_FIXED32: u64 = 5;

/// List the pieces of a serialized `ModelProto`, in id order.
pub(crate) fn read_pieces(data: &[u8]) -> Result<Vec<TokenString>> {
    let mut reader = WireReader::new(data);
    let mut pieces = Vec::new();

    while reader.has_more() {
        let (field, wire_type) = reader.read_tag()?;
        if (field, wire_type) == (1, WIRE_LEN) {
            let message = reader.read_len_delimited()?;
            pieces.push(read_piece(message)?);
        } else {
            reader.skip_value(wire_type)?;
        }
    }

    ensure!(
        !pieces.is_empty(),
        InvalidModelProtoSnafu {
            offset: data.len(),
            reason: "model has no pieces"
        }
    );

    Ok(pieces)
}

fn read_piece(message: &[u8]) -> Result<TokenString> {
    let mut reader = WireReader::new(message);
    let mut piece = TokenString::new();

    while reader.has_more() {
        let (field, wire_type) = reader.read_tag()?;
        if (field, wire_type) == (1, WIRE_LEN) {
            piece = reader.read_len_delimited()?.to_vec();
        } else {
            reader.skip_value(wire_type)?;
        }
    }

    Ok(piece)
}

struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    fn fail<T>(&self, reason: &'static str) -> Result<T> {
        InvalidModelProtoSnafu {
            offset: self.pos,
            reason,
        }
        .fail()
    }

    fn read_tag(&mut self) -> Result<(u64, u64)> {
        let tag = self.read_varint()?;
        let field = tag >> 3;
        if field == 0 {
            return self.fail("field number 0");
        }

        Ok((field, tag & 0x7))
    }

    fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let Some(&byte) = self.data.get(self.pos) else {
                return self.fail("truncated varint");
            };
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        self.fail("varint too long")
    }

    fn read_len_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        self.take(len)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let (data, start) = (self.data, self.pos);
        match start.checked_add(len).and_then(|end| data.get(start..end)) {
            Some(bytes) => {
                self.pos += len;
                Ok(bytes)
            }
            None => self.fail("field extends past end of data"),
        }
    }

    fn skip_value(&mut self, wire_type: u64) -> Result<()> {
        match wire_type {
            WIRE_VARINT => self.read_varint().map(|_| ()),
            WIRE_FIXED64 => self.take(8).map(|_| ()),
            WIRE_LEN => self.read_len_delimited().map(|_| ()),
            WIRE_FIXED32 => self.take(4).map(|_| ()),
            _ => self.fail("unsupported wire type"),
        }
    }
}
