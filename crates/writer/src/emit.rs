//! Public encode operations.

use format::{layout, CowOperation, CowStorage};
use tracing::{debug, error};

use crate::{CowError, CowWriter};

/// What a run of data blocks encodes.
#[derive(Debug, Clone, Copy)]
enum BlockKind {
    Replace,
    /// Patch against the source image starting `offset` bytes into
    /// `old_block`.
    Xor { old_block: u64, offset: u16 },
}

impl<S: CowStorage> CowWriter<S> {
    /// Appends `num_blocks` Copy operations mapping `new_block + i` to
    /// `old_block + i`. No payload.
    pub fn emit_copy(&mut self, new_block: u64, old_block: u64, num_blocks: u64) -> Result<(), CowError> {
        check_block_range("new block", new_block, num_blocks)?;
        check_block_range("old block", old_block, num_blocks)?;
        let ops: Vec<CowOperation> = (0..num_blocks)
            .map(|i| CowOperation::Copy {
                new_block: new_block + i,
                source_block: old_block + i,
            })
            .collect();
        self.write_operation(&ops, &[])
    }

    /// Appends one Replace operation per whole block of `data`, starting at
    /// `new_block_start`.
    ///
    /// # Errors
    ///
    /// [`CowError::InvalidInput`] if `data` is not a whole number of blocks.
    /// On any other failure the counters are restored to their values
    /// before the call.
    pub fn emit_raw_blocks(&mut self, new_block_start: u64, data: &[u8]) -> Result<(), CowError> {
        self.emit_blocks(new_block_start, data, BlockKind::Replace)
    }

    /// Appends one Xor operation per whole block of `data`. Block `i` is
    /// patched against the source image at byte
    /// `(old_block + i) * block_size + offset`.
    pub fn emit_xor_blocks(
        &mut self,
        new_block_start: u64,
        data: &[u8],
        old_block: u64,
        offset: u16,
    ) -> Result<(), CowError> {
        self.emit_blocks(new_block_start, data, BlockKind::Xor { old_block, offset })
    }

    /// Appends `num_blocks` Zero operations. No payload.
    pub fn emit_zero_blocks(&mut self, new_block_start: u64, num_blocks: u64) -> Result<(), CowError> {
        check_block_range("new block", new_block_start, num_blocks)?;
        let ops: Vec<CowOperation> = (0..num_blocks)
            .map(|i| CowOperation::Zero {
                new_block: new_block_start + i,
            })
            .collect();
        self.write_operation(&ops, &[])
    }

    fn block_op(&self, kind: BlockKind, index: u64, new_block: u64, data_offset: u64, data_length: u16) -> CowOperation {
        match kind {
            BlockKind::Replace => CowOperation::Replace {
                new_block,
                data_offset,
                data_length,
            },
            BlockKind::Xor { old_block, offset } => CowOperation::Xor {
                new_block,
                source_offset: (old_block + index) * u64::from(self.header.block_size)
                    + u64::from(offset),
                data_length,
            },
        }
    }

    fn emit_blocks(&mut self, new_block_start: u64, data: &[u8], kind: BlockKind) -> Result<(), CowError> {
        self.ensure_initialized()?;
        let block_size = self.header.block_size as usize;
        if data.len() % block_size != 0 {
            return Err(CowError::InvalidInput(format!(
                "{} bytes is not a multiple of the {} byte block size",
                data.len(),
                block_size
            )));
        }
        let num_blocks = (data.len() / block_size) as u64;
        check_block_range("new block", new_block_start, num_blocks)?;
        if let BlockKind::Xor { old_block, offset } = kind {
            // The last block has the largest source offset.
            let last = num_blocks.saturating_sub(1);
            old_block
                .checked_add(last)
                .and_then(|b| b.checked_mul(block_size as u64))
                .and_then(|b| b.checked_add(u64::from(offset)))
                .ok_or_else(|| {
                    CowError::InvalidInput(format!(
                        "xor source of {} blocks from block {} offset {} overflows",
                        num_blocks, old_block, offset
                    ))
                })?;
        }
        // block_size fits u16; checked when the options were validated.
        let full_length = block_size as u16;

        let compressed = match &self.compressor {
            None => {
                let ops: Vec<CowOperation> = (0..num_blocks)
                    .map(|i| {
                        let data_offset = self.next_data_pos + i * block_size as u64;
                        self.block_op(kind, i, new_block_start + i, data_offset, full_length)
                    })
                    .collect();
                return self.write_operation(&ops, data);
            }
            Some(pool) => pool.compress_blocks(data, block_size)?,
        };

        let saved_op_count = self.header.op_count;
        let saved_data_pos = self.next_data_pos;
        for (i, (block, packed)) in data.chunks_exact(block_size).zip(&compressed).enumerate() {
            let i = i as u64;
            // Never persist a payload that did not shrink.
            let payload: &[u8] = if packed.len() < block_size {
                packed
            } else {
                block
            };
            let op = self.block_op(
                kind,
                i,
                new_block_start + i,
                self.next_data_pos,
                payload.len() as u16,
            );
            if let Err(e) = self.write_operation(&[op], payload) {
                error!(
                    new_block = new_block_start,
                    compression = %self.compression.algorithm,
                    error = %e,
                    "emit blocks with compression: write failed"
                );
                self.header.op_count = saved_op_count;
                self.next_data_pos = saved_data_pos;
                return Err(e);
            }
        }

        debug!(
            new_block = new_block_start,
            blocks = num_blocks,
            bytes = self.next_data_pos - saved_data_pos,
            "emitted compressed blocks"
        );
        Ok(())
    }

    /// Records a resume point at the current operation count and makes it
    /// durable.
    ///
    /// Resume points labelled `>= label` are pruned first, then the oldest
    /// are evicted while the table is over capacity. The resume table is
    /// written and synced before the header is finalized, so a header that
    /// names a resume point never reaches disk ahead of the table.
    pub fn emit_label(&mut self, label: u64) -> Result<(), CowError> {
        self.ensure_initialized()?;
        let saved = self.resume_points.clone();
        self.resume_points.insert(label, self.header.op_count);
        debug_assert!(self.resume_points.len() <= self.header.resume_point_max as usize);

        if let Some(storage) = self.storage.as_mut() {
            let offset = layout::resume_offset(&self.header);
            if let Err(e) = storage.write_at(offset, &self.resume_points.encode()) {
                error!(label, offset, error = %e, "writing resume buffer failed");
                self.resume_points = saved;
                return Err(e.into());
            }
            // The table must be on disk before a header that counts it.
            if let Err(e) = storage.sync() {
                error!(label, offset, error = %e, "resume buffer sync failed");
                self.resume_points = saved;
                return Err(e.into());
            }
        }
        self.header.resume_point_count = self.resume_points.len() as u32;
        debug!(label, op_index = self.header.op_count, "emitted label");
        self.finalize()
    }

    /// Records the replay-order sequence.
    ///
    /// The sequence array sits before the resume and operation tables, so it
    /// must be recorded before any operation or label, and only once.
    pub fn emit_sequence_data(&mut self, values: &[u32]) -> Result<(), CowError> {
        self.ensure_initialized()?;
        if self.header.op_count > 0 || !self.resume_points.is_empty() {
            return Err(CowError::InvalidInput(
                "sequence data must be emitted before any operation or label".to_string(),
            ));
        }
        if self.header.sequence_data_count > 0 {
            return Err(CowError::InvalidInput(
                "sequence data was already recorded".to_string(),
            ));
        }

        self.header.sequence_data_count = values.len() as u64;
        if let Some(storage) = self.storage.as_mut() {
            let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            let offset = layout::sequence_offset(&self.header);
            if let Err(e) = storage.write_at(offset, &bytes) {
                error!(count = values.len(), offset, error = %e, "writing sequence buffer failed");
                self.header.sequence_data_count = 0;
                return Err(e.into());
            }
        }
        self.next_data_pos = layout::data_offset(&self.header);
        Ok(())
    }

    /// Rewrites the header at offset 0 and syncs. Safe to call repeatedly;
    /// a no-op while estimating.
    pub fn finalize(&mut self) -> Result<(), CowError> {
        self.ensure_initialized()?;
        self.header.validate()?;
        let image = self.header.to_bytes();
        if let Some(storage) = self.storage.as_mut() {
            storage.write_at(0, &image)?;
            storage.sync()?;
        }
        Ok(())
    }
}

/// Rejects a run of `num_blocks` starting at `start` whose last index does
/// not fit in a `u64`.
fn check_block_range(what: &str, start: u64, num_blocks: u64) -> Result<(), CowError> {
    if num_blocks > 0 && start.checked_add(num_blocks - 1).is_none() {
        return Err(CowError::InvalidInput(format!(
            "{} range {} + {} overflows",
            what, start, num_blocks
        )));
    }
    Ok(())
}
