//! Replay a captured request stream through a simulated device.
//!
//! Reads the raw bytes of `<SRC>`, answers every complete request as the
//! device would, and writes the reply bytes to `<DST_DIR>/reply-<name of SRC>`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufWriter;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use taolst::config::ResponderConfig;
use taolst::protocol::FrameDecoder;
use taolst::session::Responder;
use taolst::transport::reply_path;

/// TAOLST reply generator for captured request streams
#[derive(Parser, Debug)]
#[command(name = "taolst-replay")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Capture file holding the raw request bytes
    src: PathBuf,

    /// Directory receiving the reply file
    dst_dir: PathBuf,

    /// JSON responder configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print each reply to stdout
    #[arg(short, long)]
    print: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
        EnvFilter::new(format!("taolst={},taolst_replay={}", level, level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => ResponderConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ResponderConfig::default(),
    };
    tracing::debug!("Config: {:?}", config);

    let dst = reply_path(&cli.src, &cli.dst_dir)?;

    let input = tokio::fs::File::open(&cli.src)
        .await
        .with_context(|| format!("opening {}", cli.src.display()))?;
    let output = tokio::fs::File::create(&dst)
        .await
        .with_context(|| format!("creating {}", dst.display()))?;

    let mut responder = Responder::new(&config);
    let sent = responder.run(input, BufWriter::new(output)).await?;

    tracing::info!(
        "{} replies to {} written to {}",
        sent,
        cli.src.display(),
        dst.display()
    );

    if cli.print {
        let bytes = tokio::fs::read(&dst)
            .await
            .with_context(|| format!("reading back {}", dst.display()))?;
        for reply in FrameDecoder::new().push_slice(&bytes) {
            println!("{}", reply);
        }
    }

    Ok(())
}
