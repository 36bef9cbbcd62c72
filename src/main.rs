use std::io::{self, BufWriter};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gunzip_rs::{DecompressOptions, Mode};

/// Decompresses a .gz stream read from stdin and writes it to stdout.
#[derive(Parser, Debug)]
#[command(name = "gunzip-rs", version, about)]
struct Cli {
    /// Decode on a second thread
    #[arg(short = 't', long = "threads")]
    threads: bool,

    /// Events the decoding thread may run ahead of the writer
    #[arg(long, default_value_t = 16)]
    channel_capacity: usize,

    /// Input buffer size in bytes
    #[arg(long, default_value_t = 16 << 10)]
    buffer_size: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mode = if cli.threads {
        Mode::Pipelined
    } else {
        Mode::SingleThread
    };
    let options = DecompressOptions::new()
        .with_mode(mode)
        .with_channel_capacity(cli.channel_capacity)
        .with_input_buffer_size(cli.buffer_size);

    let output = BufWriter::new(io::stdout().lock());
    let written = gunzip_rs::decompress(io::stdin(), output, options)
        .context("failed to decompress stdin")?;

    info!(bytes = written, "done");
    Ok(())
}
