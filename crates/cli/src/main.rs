//! # cowctl - COW Snapshot Encoder
//!
//! Encodes how a target image differs from a source image into a COW file.
//!
//! ```text
//! cowctl <source> <target> <output>
//! ```
//!
//! A fresh run makes two passes: an estimation pass that sizes the
//! operation table, then the write pass. A label is emitted every
//! `COW_LABEL_INTERVAL` blocks; if the write pass dies, rerun with
//! `COW_RESUME_LABEL` set to the last label to continue where it stopped.
//! A label that was never recorded resumes at the newest label below it.
//!
//! ## Configuration
//!
//! ```text
//! COW_BLOCK_SIZE        bytes per block              (default: 4096)
//! COW_COMPRESSION       "<algorithm>[,<level>]"      (default: "none")
//!                       none | gz | lz4 | zstd | brotli
//! COW_COMPRESS_THREADS  compression workers          (default: 1)
//! COW_SCRATCH_SPACE     reserve the scratch region   (default: "false")
//! COW_LABEL_INTERVAL    blocks between labels        (default: 1024)
//! COW_RESUME_LABEL      resume an interrupted run    (default: unset)
//! RUST_LOG              log filter                   (default: "info")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ COW_COMPRESSION=lz4 cowctl system_a.img system_b.img system.cow
//! wrote 262144 ops (1048576 blocks: copy=1040000 zero=4096 replace=4480) to system.cow, 19175624 bytes
//! ```

mod diff;
mod encode;

use anyhow::{bail, Context, Result};
use config::CowOptions;
use encode::Encoder;
use std::fs::OpenOptions;
use tracing_subscriber::EnvFilter;
use writer::{CowEstimator, CowWriter};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        bail!("usage: cowctl <source> <target> <output>");
    }
    let (source_path, target_path, output_path) = (&args[1], &args[2], &args[3]);

    let options = CowOptions::from_env();
    let label_interval: u64 = env_or("COW_LABEL_INTERVAL", "1024").parse().unwrap_or(1024);
    let resume_label: Option<u64> = std::env::var("COW_RESUME_LABEL")
        .ok()
        .and_then(|v| v.trim().parse().ok());

    let source = std::fs::read(source_path)
        .with_context(|| format!("failed to read source image {}", source_path))?;
    let target = std::fs::read(target_path)
        .with_context(|| format!("failed to read target image {}", target_path))?;

    let block_size = options.block_size as usize;
    if block_size == 0 || target.len() % block_size != 0 {
        bail!(
            "target image is {} bytes, not a whole number of {} byte blocks",
            target.len(),
            block_size
        );
    }

    let encoder = Encoder {
        source: &source,
        target: &target,
        block_size,
        label_interval,
    };

    let (mut w, from_block) = match resume_label {
        None => {
            let mut estimator = CowEstimator::for_estimation(options)?;
            estimator.initialize(None)?;
            encoder.run(&mut estimator, 0)?;

            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(true)
                .open(output_path)
                .with_context(|| format!("failed to create {}", output_path))?;
            let mut w = estimator.into_writer(file)?;
            w.initialize(None)?;
            (w, 0)
        }
        Some(label) => {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .open(output_path)
                .with_context(|| format!("failed to open {} for append", output_path))?;
            let mut w = CowWriter::new(options, file)?;
            w.initialize(Some(label))
                .with_context(|| format!("failed to resume {} at label {}", output_path, label))?;
            // Labels are block indices, so the resolved label is where to restart.
            let from_block = w.resumed_label().unwrap_or(label);
            (w, from_block)
        }
    };

    let stats = encoder.run(&mut w, from_block)?;
    println!(
        "wrote {} ops ({} blocks: copy={} zero={} replace={}) to {}, {} bytes",
        w.op_count(),
        encoder.num_blocks(),
        stats.copied,
        stats.zeroed,
        stats.replaced,
        output_path,
        w.get_cow_size()
    );
    Ok(())
}
