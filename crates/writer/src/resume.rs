use format::ResumePoint;

/// Bounded, insertion-ordered list of resume points.
///
/// After every [`insert`](Self::insert) the newest label is the only entry
/// whose label is at or above it, and the list holds at most `max` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoints {
    points: Vec<ResumePoint>,
    max: usize,
}

impl ResumePoints {
    pub fn new(max: usize) -> Self {
        Self {
            points: Vec::with_capacity(max + 1),
            max,
        }
    }

    /// Rebuilds the list from a table read off disk, keeping at most `max`
    /// of the newest entries.
    pub fn from_points(points: &[ResumePoint], max: usize) -> Self {
        let skip = points.len().saturating_sub(max);
        Self {
            points: points[skip..].to_vec(),
            max,
        }
    }

    /// Records `label` at `op_index`.
    ///
    /// Entries labelled `>= label` are dropped first so a reused or lower
    /// label never leaves a stale higher checkpoint behind. The oldest
    /// entries are evicted while the list is over capacity.
    pub fn insert(&mut self, label: u64, op_index: u64) {
        self.points.retain(|p| p.label < label);
        self.points.push(ResumePoint { label, op_index });
        while self.points.len() > self.max {
            self.points.remove(0);
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ResumePoint] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The on-disk image of the table, in list order.
    pub fn encode(&self) -> Vec<u8> {
        ResumePoint::encode_all(&self.points)
    }
}
