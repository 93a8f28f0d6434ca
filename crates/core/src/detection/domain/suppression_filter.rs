use crate::shared::region::Region;

/// Overlap above which a candidate is considered a duplicate of a kept region.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.5;

/// Greedy non-maximum suppression keyed on the bottom edge.
///
/// Candidates are visited from the largest bottom coordinate downwards
/// (the subject nearest the camera first). Each visited region is kept and
/// every remaining candidate whose intersection covers more than
/// `threshold` of the kept region's own area is dropped. Equal bottoms are
/// ordered by `(top, left, right)` so the result does not depend on input
/// order, which also makes the filter idempotent.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionFilter {
    threshold: f64,
}

impl SuppressionFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the kept regions in pick order (largest bottom first).
    pub fn apply(&self, candidates: &[Region]) -> Vec<Region> {
        let mut remaining = candidates.to_vec();
        remaining.sort_by_key(|r| (r.bottom, r.top, r.left, r.right));

        let mut kept = Vec::with_capacity(remaining.len());
        while let Some(pick) = remaining.pop() {
            remaining.retain(|other| pick.overlap_ratio(other) <= self.threshold);
            kept.push(pick);
        }
        kept
    }
}

impl Default for SuppressionFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_THRESHOLD)
    }
}
