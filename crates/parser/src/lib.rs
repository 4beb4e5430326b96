//! # Parser - COW File Reader
//!
//! Reads back the committed state of a COW file: the header, the resume
//! table, and the operation records up to a resume point. The writer uses
//! this to rebuild its bookkeeping when it is reopened for append.
//!
//! Parsing never trusts `op_count` in the header when a label is given. A
//! writer may have persisted operations past the last label before it died;
//! only operations before the resume point's `op_index` are committed.

use format::{layout, CowHeader, CowOperation, CowStorage, FormatError, ResumePoint};
use format::{HEADER_BYTES, OPERATION_BYTES, RESUME_POINT_BYTES};
use std::io;
use thiserror::Error;
use tracing::debug;

/// Errors raised while parsing a COW file.
#[derive(Debug, Error)]
pub enum ParseError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A structure failed to decode.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Every stored resume point is labelled above the requested label.
    #[error("no resume point at or below label {0}")]
    LabelNotFound(u64),

    /// The file contradicts its own header.
    #[error("corrupt: {0}")]
    Corrupt(String),
}

/// Stateless COW reader.
pub struct CowParser;

impl CowParser {
    /// Reads and validates the header at offset 0.
    pub fn read_header<S: CowStorage + ?Sized>(storage: &mut S) -> Result<CowHeader, ParseError> {
        let mut buf = [0u8; HEADER_BYTES as usize];
        storage.read_at(0, &mut buf)?;
        Ok(CowHeader::from_bytes(&buf)?)
    }

    /// Loads the committed state of the file.
    ///
    /// With `Some(label)` the newest resume point whose label is `<= label`
    /// bounds the committed operations; [`ParsedCow::label`] reports which
    /// one was used. With `None` the header's `op_count` does.
    ///
    /// # Errors
    ///
    /// - [`ParseError::LabelNotFound`] if every stored label is greater.
    /// - [`ParseError::Corrupt`] if the bound exceeds the table capacity or
    ///   an operation references more data than one block.
    pub fn parse<S: CowStorage + ?Sized>(
        storage: &mut S,
        header: &CowHeader,
        label: Option<u64>,
    ) -> Result<ParsedCow, ParseError> {
        let resume_points = Self::read_resume_points(storage, header)?;

        // Pruning on insert keeps the table strictly increasing, so the last
        // match is the newest usable point.
        let resolved = match label {
            Some(label) => Some(
                *resume_points
                    .iter()
                    .rev()
                    .find(|p| p.label <= label)
                    .ok_or(ParseError::LabelNotFound(label))?,
            ),
            None => None,
        };
        let op_count = resolved.map_or(header.op_count, |p| p.op_index);
        if op_count > header.op_count_max {
            return Err(ParseError::Corrupt(format!(
                "op index {} exceeds op_count_max {}",
                op_count, header.op_count_max
            )));
        }

        let ops = Self::read_ops(storage, header, op_count)?;
        debug!(
            ?label,
            resolved = ?resolved.map(|p| p.label),
            op_count,
            resume_points = resume_points.len(),
            "parsed cow file"
        );

        Ok(ParsedCow {
            header: header.clone(),
            label: resolved.map(|p| p.label),
            resume_points,
            ops,
        })
    }

    fn read_resume_points<S: CowStorage + ?Sized>(
        storage: &mut S,
        header: &CowHeader,
    ) -> Result<Vec<ResumePoint>, ParseError> {
        let count = header.resume_point_count.min(header.resume_point_max) as usize;
        let mut buf = vec![0u8; count * RESUME_POINT_BYTES as usize];
        storage.read_at(layout::resume_offset(header), &mut buf)?;

        let mut r = &buf[..];
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            points.push(ResumePoint::read_from(&mut r)?);
        }
        Ok(points)
    }

    fn read_ops<S: CowStorage + ?Sized>(
        storage: &mut S,
        header: &CowHeader,
        count: u64,
    ) -> Result<Vec<CowOperation>, ParseError> {
        let mut buf = vec![0u8; (count * OPERATION_BYTES) as usize];
        storage.read_at(layout::op_offset(0, header), &mut buf)?;

        let mut r = &buf[..];
        let mut ops = Vec::with_capacity(count as usize);
        for i in 0..count {
            let op = CowOperation::read_from(&mut r)?;
            if u32::from(op.data_length()) > header.block_size {
                return Err(ParseError::Corrupt(format!(
                    "op {} carries {} bytes, block size is {}",
                    i,
                    op.data_length(),
                    header.block_size
                )));
            }
            ops.push(op);
        }
        Ok(ops)
    }
}

/// The committed state of a COW file at a resume point.
#[derive(Debug, Clone)]
pub struct ParsedCow {
    header: CowHeader,
    label: Option<u64>,
    resume_points: Vec<ResumePoint>,
    ops: Vec<CowOperation>,
}

impl ParsedCow {
    /// The header the file was parsed with.
    pub fn header(&self) -> &CowHeader {
        &self.header
    }

    /// The label the committed state was resolved to, if one was requested.
    pub fn label(&self) -> Option<u64> {
        self.label
    }

    /// Every resume point stored on disk, in table order.
    pub fn resume_points(&self) -> &[ResumePoint] {
        &self.resume_points
    }

    /// The committed operations, in the order they were written.
    pub fn translate(&self) -> &[CowOperation] {
        &self.ops
    }

    /// Total payload bytes referenced by the committed operations.
    pub fn data_bytes(&self) -> u64 {
        self.ops.iter().map(|op| u64::from(op.data_length())).sum()
    }
}
