/// Fresh-file and append-mode initialization.
///
/// A fresh open reserves the header (and scratch region) and syncs before
/// any operation is written. An append open rebuilds the bookkeeping from
/// the committed state the parser reports at a resume point; the replayed
/// operations are summed, never re-executed.
use format::{layout, CowStorage};
use parser::CowParser;
use tracing::{error, info};

use crate::{CowError, CowWriter, ResumePoints};

impl<S: CowStorage> CowWriter<S> {
    /// Opens the writer.
    ///
    /// With `None` a new file is started. With `Some(label)` the existing
    /// file is resumed at the newest resume point labelled `<= label` (see
    /// [`resumed_label`](Self::resumed_label)); everything written after it
    /// is discarded from the bookkeeping and will be overwritten, along with
    /// any resume point labelled above the resolved one.
    ///
    /// # Errors
    ///
    /// - [`CowError::Io`] if reserving the header fails.
    /// - [`CowError::Recovery`] if the header is unreadable or the label is
    ///   unknown.
    /// - [`CowError::Config`] if the file was written with a different
    ///   compression algorithm.
    /// - [`CowError::InvalidInput`] if already initialized, or when asked to
    ///   append while estimating.
    pub fn initialize(&mut self, label: Option<u64>) -> Result<(), CowError> {
        if self.initialized {
            return Err(CowError::InvalidInput(
                "writer is already initialized".to_string(),
            ));
        }
        match label {
            None => self.open_for_write()?,
            Some(label) => self.open_for_append(label)?,
        }
        self.initialized = true;
        Ok(())
    }

    fn open_for_write(&mut self) -> Result<(), CowError> {
        self.resume_points = ResumePoints::new(self.header.resume_point_max as usize);
        self.header.resume_point_count = 0;

        if let Some(storage) = self.storage.as_mut() {
            // The header is provisional; it only reserves its bytes.
            let image = self.header.to_bytes();
            storage.write_at(0, &image)?;

            if self.header.buffer_size > 0 {
                let zeroes = vec![0u8; self.header.buffer_size as usize];
                if let Err(e) = storage.write_at(layout::scratch_offset(&self.header), &zeroes) {
                    error!(error = %e, "writing scratch space failed");
                    return Err(e.into());
                }
            }

            if let Err(e) = storage.sync() {
                error!(error = %e, "header sync failed");
                return Err(e.into());
            }
        }

        self.next_data_pos = layout::data_offset(&self.header);
        info!(
            estimating = self.is_estimating(),
            block_size = self.header.block_size,
            compression = %self.compression.algorithm,
            op_count_max = self.header.op_count_max,
            data_offset = self.next_data_pos,
            "opened cow for write"
        );
        Ok(())
    }

    fn open_for_append(&mut self, label: u64) -> Result<(), CowError> {
        let storage = self.storage.as_mut().ok_or_else(|| {
            CowError::InvalidInput("cannot resume a label while estimating".to_string())
        })?;

        let header = CowParser::read_header(storage).map_err(|e| {
            error!(error = %e, "couldn't read cow header");
            e
        })?;

        if header.compression_algorithm != self.compression.algorithm.code() {
            return Err(config::ConfigError::Compression {
                spec: self.options.compression.clone(),
                reason: format!(
                    "file was written with compression code {}",
                    header.compression_algorithm
                ),
            }
            .into());
        }

        let parsed = CowParser::parse(storage, &header, Some(label)).map_err(|e| {
            error!(label, error = %e, "unable to parse with given label");
            e
        })?;

        self.header = header;
        self.options.block_size = self.header.block_size;
        self.header.op_count = parsed.translate().len() as u64;
        // Points above the resolved label index operations that are about
        // to be overwritten.
        let committed: Vec<_> = parsed
            .resume_points()
            .iter()
            .filter(|p| parsed.label().map_or(true, |l| p.label <= l))
            .copied()
            .collect();
        self.resume_points =
            ResumePoints::from_points(&committed, self.header.resume_point_max as usize);
        self.header.resume_point_count = self.resume_points.len() as u32;
        self.next_data_pos = layout::data_offset(&self.header) + parsed.data_bytes();
        self.resumed_label = parsed.label();

        info!(
            label,
            resumed_label = ?self.resumed_label,
            op_count = self.header.op_count,
            op_count_max = self.header.op_count_max,
            next_data_pos = self.next_data_pos,
            "opened cow for append"
        );
        Ok(())
    }
}
