use ndarray::Array2;

use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::tracking::domain::region_tracker::RegionTracker;

/// Longest template side, in samples. Larger regions are subsampled.
const MAX_TEMPLATE_SIDE: usize = 32;

/// Search radius as a fraction of the region's larger side.
pub const DEFAULT_SEARCH_MARGIN: f64 = 0.5;

/// How far the template moves toward each new match.
pub const DEFAULT_LEARNING_RATE: f32 = 0.15;

/// Grayscale template tracker using normalized cross-correlation.
///
/// The region captured at `start` is subsampled on a regular grid (step
/// chosen so the grid is at most 32 samples on a side). Each `update`
/// scores translated copies of the region inside a search window: first on
/// a grid of `step` pixels, then pixel by pixel around the best coarse hit.
/// Region size never changes; scale is refreshed by the next detection.
pub struct CorrelationTracker {
    region: Region,
    template: Option<Array2<f32>>,
    step: usize,
    search_margin: f64,
    learning_rate: f32,
}

impl CorrelationTracker {
    pub fn new(search_margin: f64, learning_rate: f32) -> Self {
        Self {
            region: Region::new(0, 0, 0, 0),
            template: None,
            step: 1,
            search_margin,
            learning_rate: learning_rate.clamp(0.0, 1.0),
        }
    }

    fn sample(&self, luma: &Array2<f32>, left: usize, top: usize) -> Array2<f32> {
        let (rows, cols) = self.template_shape();
        Array2::from_shape_fn((rows, cols), |(j, i)| {
            luma[[top + j * self.step, left + i * self.step]]
        })
    }

    fn template_shape(&self) -> (usize, usize) {
        let w = self.region.width() as usize;
        let h = self.region.height() as usize;
        (h.div_ceil(self.step), w.div_ceil(self.step))
    }

    fn score(&self, luma: &Array2<f32>, left: usize, top: usize) -> f32 {
        match &self.template {
            Some(template) => ncc(template, &self.sample(luma, left, top)),
            None => 0.0,
        }
    }

    /// Best `(left, top)` within `radius` of `(cx, cy)`, visiting every
    /// `stride`-th offset. Offsets are clamped so the region stays inside
    /// the frame. Keeps `(cx, cy)` unless another position scores higher.
    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        luma: &Array2<f32>,
        cx: i32,
        cy: i32,
        radius: i32,
        stride: usize,
        max_left: i32,
        max_top: i32,
    ) -> (i32, i32, f32) {
        let mut best = (cx, cy, self.score(luma, cx as usize, cy as usize));
        for dy in (-radius..=radius).step_by(stride) {
            for dx in (-radius..=radius).step_by(stride) {
                let left = (cx + dx).clamp(0, max_left);
                let top = (cy + dy).clamp(0, max_top);
                if (left, top) == (cx, cy) {
                    continue;
                }
                let s = self.score(luma, left as usize, top as usize);
                if s > best.2 {
                    best = (left, top, s);
                }
            }
        }
        best
    }
}

impl Default for CorrelationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_MARGIN, DEFAULT_LEARNING_RATE)
    }
}

impl RegionTracker for CorrelationTracker {
    fn start(&mut self, frame: &Frame, region: Region) {
        let (w, h) = frame.size();
        self.region = region.clamped(w, h);
        if self.region.is_empty() || frame.is_empty() {
            self.template = None;
            return;
        }
        let side = self.region.width().max(self.region.height()) as usize;
        self.step = side.div_ceil(MAX_TEMPLATE_SIDE).max(1);
        let luma = frame.to_luma();
        self.template = Some(self.sample(
            &luma,
            self.region.left as usize,
            self.region.top as usize,
        ));
    }

    fn update(&mut self, frame: &Frame) {
        if self.template.is_none() || frame.is_empty() {
            return;
        }
        let (fw, fh) = frame.size();
        let max_left = fw as i32 - self.region.width();
        let max_top = fh as i32 - self.region.height();
        if max_left < 0 || max_top < 0 {
            // Frame shrank below the region; hold position until retired.
            self.region = self.region.clamped(fw, fh);
            self.template = None;
            return;
        }

        let luma = frame.to_luma();
        let cx = self.region.left.clamp(0, max_left);
        let cy = self.region.top.clamp(0, max_top);
        let side = self.region.width().max(self.region.height()) as f64;
        let radius = ((side * self.search_margin).round() as i32).max(self.step as i32);

        let (coarse_x, coarse_y, _) =
            self.search(&luma, cx, cy, radius, self.step, max_left, max_top);
        let (left, top, _) = if self.step > 1 {
            self.search(
                &luma,
                coarse_x,
                coarse_y,
                self.step as i32 - 1,
                1,
                max_left,
                max_top,
            )
        } else {
            (coarse_x, coarse_y, 0.0)
        };

        self.region = self
            .region
            .translated(left - self.region.left, top - self.region.top);

        let patch = self.sample(&luma, left as usize, top as usize);
        let rate = self.learning_rate;
        if let Some(template) = self.template.as_mut() {
            template.zip_mut_with(&patch, |t, p| *t = (1.0 - rate) * *t + rate * p);
        }
    }

    fn position(&self) -> Region {
        self.region
    }
}

/// Zero-mean normalized cross-correlation in `[-1, 1]`; flat inputs score 0.
fn ncc(a: &Array2<f32>, b: &Array2<f32>) -> f32 {
    let n = a.len() as f32;
    if n == 0.0 {
        return 0.0;
    }
    let mean_a = a.sum() / n;
    let mean_b = b.sum() / n;
    let mut cross = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        cross += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        cross / denom
    }
}
