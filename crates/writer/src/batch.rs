//! The single persistence routine.
//!
//! Every emit path funnels through [`CowWriter::write_operation`]; no other
//! code advances `op_count` or `next_data_pos`.

use format::{layout, CowOperation, CowStorage, OPERATION_BYTES};
use tracing::error;

use crate::{CowError, CowWriter};

impl<S: CowStorage> CowWriter<S> {
    /// Persists `ops` and their concatenated payload `data`.
    ///
    /// # Estimation mode
    ///
    /// Only counters move. When `op_count` outgrows `op_count_max` the table
    /// is enlarged to match, and because the data region starts right after
    /// the table, `next_data_pos` shifts by the newly reserved slots.
    ///
    /// # Write mode
    ///
    /// The records land at the slot of the current `op_count` and the payload
    /// at `next_data_pos`. Counters advance only after both writes succeed.
    ///
    /// # Errors
    ///
    /// - [`CowError::Capacity`] if the table cannot hold `ops`.
    /// - [`CowError::Io`] if either write fails.
    pub(crate) fn write_operation(
        &mut self,
        ops: &[CowOperation],
        data: &[u8],
    ) -> Result<(), CowError> {
        self.ensure_initialized()?;
        let count = ops.len() as u64;

        let storage = match self.storage.as_mut() {
            Some(storage) => storage,
            None => {
                self.header.op_count += count;
                if self.header.op_count > self.header.op_count_max {
                    let grown = self.header.op_count - self.header.op_count_max;
                    self.next_data_pos += grown * OPERATION_BYTES;
                    self.header.op_count_max = self.header.op_count;
                }
                self.next_data_pos += data.len() as u64;
                return Ok(());
            }
        };

        if self.header.op_count + count > self.header.op_count_max {
            error!(
                op_count = self.header.op_count,
                requested = count,
                op_count_max = self.header.op_count_max,
                "operation table full"
            );
            return Err(CowError::Capacity {
                op_count: self.header.op_count,
                requested: count,
                op_count_max: self.header.op_count_max,
            });
        }

        let offset = layout::op_offset(self.header.op_count, &self.header);
        if let Err(e) = storage.write_at(offset, &CowOperation::encode_all(ops)) {
            error!(ops = count, offset, error = %e, "write failed for ops");
            return Err(e.into());
        }
        if !data.is_empty() {
            if let Err(e) = storage.write_at(self.next_data_pos, data) {
                error!(
                    size = data.len(),
                    offset = self.next_data_pos,
                    error = %e,
                    "write failed for data"
                );
                return Err(e.into());
            }
        }

        self.header.op_count += count;
        self.next_data_pos += data.len() as u64;
        Ok(())
    }
}
