//! Padlock CLI
//!
//! Command-line tool for K-of-N threshold one-time-pad encoding.
//!
//! # Commands
//! - `encode` - Split an input file into N collection directories
//! - `decode` - Reconstruct the original file from K or more collections
//!
//! Any K collection directories reconstruct the input exactly; K-1 or fewer
//! reveal nothing about it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use padlock_core::{Decoder, Encoder, MixedRandom, Params};
use padlock_store::{require_collections, DirectoryStore};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "padlock")]
#[command(about = "K-of-N threshold one-time-pad encoder")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into N collection directories
    Encode {
        /// Input file to encode
        input: PathBuf,

        /// Directory receiving one subdirectory per collection
        output: PathBuf,

        /// Total number of collections to create (2-26)
        #[arg(short = 'n', long, default_value_t = 3)]
        copies: usize,

        /// Minimum collections needed to reconstruct (2-N)
        #[arg(short = 'k', long, default_value_t = 2)]
        required: usize,

        /// Byte budget for one stored record body
        #[arg(long, default_value_t = padlock_core::DEFAULT_CHUNK_BYTES)]
        chunk: usize,

        /// Chunk file format tag
        #[arg(long, default_value = "bin")]
        format: String,
    },

    /// Decode collections back into the original file
    Decode {
        /// Directory holding K or more collection subdirectories
        input: PathBuf,

        /// Output file for the reconstructed data
        output: PathBuf,

        /// Chunk file format tag
        #[arg(long, default_value = "bin")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    match cli.command {
        Commands::Encode {
            input,
            output,
            copies,
            required,
            chunk,
            format,
        } => encode_file(&input, &output, copies, required, chunk, &format),
        Commands::Decode {
            input,
            output,
            format,
        } => decode_file(&input, &output, &format),
    }
}

fn encode_file(
    input: &PathBuf,
    output: &PathBuf,
    copies: usize,
    required: usize,
    chunk: usize,
    format: &str,
) -> Result<()> {
    let params = Params::new(copies, required)
        .context("invalid scheme parameters")?
        .with_chunk_bytes(chunk);

    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut reader = BufReader::new(file);

    let mut store = DirectoryStore::create(output)
        .with_context(|| format!("creating {}", output.display()))?
        .with_format(format);
    let rng = MixedRandom::with_default_sources().context("initializing random sources")?;

    info!(
        copies,
        required,
        input = %input.display(),
        output = %output.display(),
        "encoding"
    );
    Encoder::new(params)?
        .encode(&mut reader, &rng, &mut store, format)
        .context("encode failed")?;

    info!("encode complete; distribute the collection directories separately");
    Ok(())
}

fn decode_file(input: &PathBuf, output: &PathBuf, format: &str) -> Result<()> {
    let store = DirectoryStore::new(input).with_format(format);

    // Discovery alone cannot know K; require at least the scheme minimum,
    // the decoder enforces the real threshold from the record headers.
    let labels = require_collections(input, padlock_core::MIN_COLLECTIONS)
        .with_context(|| format!("scanning {}", input.display()))?;
    info!(
        collections = labels.len(),
        input = %input.display(),
        "decoding"
    );

    let streams: Vec<Box<dyn Read>> = labels
        .iter()
        .map(|&label| Box::new(store.collection_reader(label)) as Box<dyn Read>)
        .collect();

    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    Decoder::new()
        .decode(streams, &mut writer)
        .context("decode failed")?;
    writer.flush()?;

    info!(output = %output.display(), "decode complete");
    Ok(())
}
