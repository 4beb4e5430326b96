//! Block classification for `cowctl`.
//!
//! Each target block becomes a Zero, a Copy of the source block at the same
//! index, or a Replace. Adjacent blocks of the same kind are coalesced into
//! one run so the writer sees as few calls as possible.

use std::ops::Range;

/// A run of consecutive target blocks encoded the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Run {
    Copy { start: u64, len: u64 },
    Zero { start: u64, len: u64 },
    Replace { start: u64, len: u64 },
}

impl Run {
    fn extend(&mut self) {
        match self {
            Run::Copy { len, .. } | Run::Zero { len, .. } | Run::Replace { len, .. } => *len += 1,
        }
    }

    fn same_kind(&self, other: &Run) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Classifies the target blocks in `blocks`.
pub fn plan(source: &[u8], target: &[u8], block_size: usize, blocks: Range<u64>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for block in blocks {
        let at = block as usize * block_size;
        let new = &target[at..at + block_size];

        let run = if new.iter().all(|b| *b == 0) {
            Run::Zero { start: block, len: 1 }
        } else if source.get(at..at + block_size) == Some(new) {
            Run::Copy { start: block, len: 1 }
        } else {
            Run::Replace { start: block, len: 1 }
        };

        match runs.last_mut() {
            Some(last) if last.same_kind(&run) => last.extend(),
            _ => runs.push(run),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    const BS: usize = 4;

    #[test]
    fn classifies_and_coalesces() {
        let source = b"aaaabbbbccccdddd".to_vec();
        let mut target = source.clone();
        target[4..8].copy_from_slice(&[0; 4]);
        target[8..12].copy_from_slice(b"xxxx");
        target[12..16].copy_from_slice(b"yyyy");

        let runs = plan(&source, &target, BS, 0..4);
        assert_eq!(
            runs,
            vec![
                Run::Copy { start: 0, len: 1 },
                Run::Zero { start: 1, len: 1 },
                Run::Replace { start: 2, len: 2 },
            ]
        );
    }

    #[test]
    fn blocks_past_the_source_are_replaced() {
        let source = b"aaaa".to_vec();
        let target = b"aaaabbbb".to_vec();
        let runs = plan(&source, &target, BS, 0..2);
        assert_eq!(
            runs,
            vec![
                Run::Copy { start: 0, len: 1 },
                Run::Replace { start: 1, len: 1 },
            ]
        );
    }

    #[test]
    fn range_limits_the_plan() {
        let source = vec![1u8; 16];
        let target = vec![1u8; 16];
        assert_eq!(
            plan(&source, &target, BS, 2..4),
            vec![Run::Copy { start: 2, len: 2 }]
        );
        assert!(plan(&source, &target, BS, 4..4).is_empty());
    }
}
