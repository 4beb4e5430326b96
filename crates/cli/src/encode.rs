/// Drives a [`CowWriter`] over a target image.
///
/// The target is processed in windows of `label_interval` blocks. After each
/// window a label equal to the next unprocessed block index is emitted, so
/// an interrupted run resumes with `COW_RESUME_LABEL=<label>` at exactly the
/// window it stopped in.
use anyhow::Result;
use format::CowStorage;
use tracing::info;
use writer::CowWriter;

use crate::diff::{plan, Run};

/// Counts of what one pass emitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeStats {
    pub copied: u64,
    pub zeroed: u64,
    pub replaced: u64,
    pub labels: u64,
}

pub struct Encoder<'a> {
    pub source: &'a [u8],
    pub target: &'a [u8],
    pub block_size: usize,
    pub label_interval: u64,
}

impl Encoder<'_> {
    /// Total number of target blocks.
    pub fn num_blocks(&self) -> u64 {
        (self.target.len() / self.block_size) as u64
    }

    /// Emits every block from `from_block` to the end, then finalizes.
    pub fn run<S: CowStorage>(&self, w: &mut CowWriter<S>, from_block: u64) -> Result<EncodeStats> {
        let mut stats = EncodeStats::default();
        let total = self.num_blocks();
        let interval = self.label_interval.max(1);

        let mut start = from_block;
        while start < total {
            let end = (start + interval).min(total);
            for run in plan(self.source, self.target, self.block_size, start..end) {
                match run {
                    Run::Copy { start, len } => {
                        w.emit_copy(start, start, len)?;
                        stats.copied += len;
                    }
                    Run::Zero { start, len } => {
                        w.emit_zero_blocks(start, len)?;
                        stats.zeroed += len;
                    }
                    Run::Replace { start, len } => {
                        let from = start as usize * self.block_size;
                        let to = from + len as usize * self.block_size;
                        w.emit_raw_blocks(start, &self.target[from..to])?;
                        stats.replaced += len;
                    }
                }
            }
            w.emit_label(end)?;
            stats.labels += 1;
            start = end;
        }

        w.finalize()?;
        info!(
            estimating = w.is_estimating(),
            copied = stats.copied,
            zeroed = stats.zeroed,
            replaced = stats.replaced,
            labels = stats.labels,
            cow_size = w.get_cow_size(),
            "encode pass complete"
        );
        Ok(stats)
    }
}
