use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FlmtokenError {
    #[snafu(display("File I/O error on file '{}'", path.display()))]
    FileIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display(
        "Vocabulary file ended early reading {field} at byte offset {offset} (needed {expected} bytes)"
    ))]
    ShortRead {
        field: &'static str,
        offset: u64,
        expected: usize,
    },

    #[snafu(display("Error reading {field} at byte offset {offset}"))]
    Read {
        field: &'static str,
        offset: u64,
        source: std::io::Error,
    },

    #[snafu(display("Field {field} at byte offset {offset} has negative value {value}"))]
    NegativeValue {
        field: &'static str,
        offset: u64,
        value: i32,
    },

    #[snafu(display("Field {field} value {value} doesn't fit in a 4 byte signed integer"))]
    ValueTooLarge { field: &'static str, value: usize },

    #[snafu(display("Error writing legacy vocabulary"))]
    Write { source: std::io::Error },

    #[snafu(display("Failed to load '{}' as a subword model: {message}", path.display()))]
    ModelLoad { path: PathBuf, message: String },

    #[snafu(display("Malformed SentencePiece model at byte offset {offset}: {reason}"))]
    InvalidModelProto { offset: usize, reason: &'static str },

    #[snafu(display("kitoken rejected the SentencePiece model: {message}"))]
    Kitoken { message: String },

    #[snafu(display(
        "'{}' is neither a subword model ({native}) nor a legacy vocabulary file",
        path.display()
    ))]
    NoUsableBackend {
        path: PathBuf,
        native: String,
        #[snafu(source(from(FlmtokenError, Box::new)))]
        source: Box<FlmtokenError>,
    },
}
