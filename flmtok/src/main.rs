use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flmtoken::{LegacyVocabFile, TokenInt, Tokenizer};
use std::fmt::Write as _;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing::*;
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    globals: Globals,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Globals {
    /// The vocabulary to use: a SentencePiece model, or a legacy binary vocabulary file
    #[arg(short, long, value_name = "FILE", env = "FLMTOK_VOCAB", global = true)]
    vocab: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Write log events as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode text into token ids, printed space separated
    Encode {
        /// The text to encode
        #[arg(required_unless_present = "stdin")]
        text: Option<String>,

        /// Read the text to encode from stdin instead; it need not be UTF-8
        #[arg(long, conflicts_with = "text")]
        stdin: bool,
    },

    /// Decode token ids into text
    Decode {
        /// The token ids to decode
        #[arg(required = true)]
        ids: Vec<TokenInt>,
    },

    /// Describe the vocabulary
    Inspect {
        /// Also list every id and its piece
        #[arg(long)]
        pieces: bool,
    },

    /// Write the vocabulary out in the legacy binary format
    Export {
        /// Where to write the legacy vocabulary
        out: PathBuf,
    },
}

impl Commands {
    fn execute(self, globals: &Globals) -> anyhow::Result<()> {
        use Commands::*;

        let path = globals
            .vocab
            .as_deref()
            .context("No vocabulary given; use --vocab or set FLMTOK_VOCAB")?;
        let tokenizer = Tokenizer::initialize(path)
            .with_context(|| format!("Failed to load vocabulary {}", path.display()))?;
        info!(backend = %tokenizer.backend_kind(), path = %path.display(), "Loaded vocabulary");

        let mut stdout = std::io::stdout().lock();
        match self {
            Encode { text, stdin } => {
                // Stdin is taken as raw bytes, so it doesn't have to be UTF-8
                let text = match text {
                    Some(text) if !stdin => text.into_bytes(),
                    _ => {
                        let mut text = Vec::new();
                        std::io::stdin()
                            .read_to_end(&mut text)
                            .context("Failed to read text from stdin")?;
                        text
                    }
                };

                let ids = tokenizer
                    .encode_bytes(&text)
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                writeln!(stdout, "{}", ids.join(" "))?;
            }
            Decode { ids } => {
                stdout.write_all(&tokenizer.decode_to_bytes(&ids))?;
                writeln!(stdout)?;
            }
            Inspect { pieces } => {
                write!(stdout, "{}", render_inspect(&tokenizer, pieces))?;
            }
            Export { out } => {
                let file = match tokenizer.legacy_file() {
                    Some(file) => file.clone(),
                    None => LegacyVocabFile::from_vocabulary(tokenizer.vocabulary()),
                };
                file.save(&out)
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                info!(
                    entries = file.entries.len(),
                    out = %out.display(),
                    "Exported legacy vocabulary"
                );
            }
        }

        Ok(())
    }
}

/// Human readable description of a loaded vocabulary
fn render_inspect(tokenizer: &Tokenizer, pieces: bool) -> String {
    let mut out = String::new();
    let vocab = tokenizer.vocabulary();

    // Writing to a String can't fail
    let _ = writeln!(out, "backend: {}", tokenizer.backend_kind());
    let _ = writeln!(out, "entries: {}", vocab.len());

    if let Some(file) = tokenizer.legacy_file() {
        let _ = writeln!(out, "version: {}", file.version);
        for (key, value) in &file.metadata {
            let _ = writeln!(
                out,
                "metadata: {} = {}",
                String::from_utf8_lossy(key),
                String::from_utf8_lossy(value)
            );
        }
    }

    if pieces {
        for (id, piece) in vocab.entries() {
            let _ = writeln!(out, "{id}\t{}", String::from_utf8_lossy(piece).escape_debug());
        }
    }

    out
}

fn main() {
    let cli = Cli::parse();
    // You can see how many times a particular flag or argument occurred
    // Note, only flags can have multiple occurrences
    let default_log_directive = match cli.globals.debug {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_log_directive.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr);
    let result = if cli.globals.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.expect("Failed to set subscriber");

    if let Err(e) = cli.command.execute(&cli.globals) {
        error!("{:#}", e);
        exit(1);
    } else {
        debug!("command executed successfully");
    }
}
