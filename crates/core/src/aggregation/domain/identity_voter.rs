use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::recognition::domain::analysis::Analysis;
use crate::shared::config::ConfigError;

/// How a single-subject snapshot contributes to its name's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteScoring {
    /// One point per snapshot.
    #[default]
    Count,
    /// The snapshot's match distance. Kept for parity with deployments
    /// tuned against it; note that closer matches score lower.
    DistanceSum,
}

/// Smooths per-frame identity verdicts into one stable name.
///
/// Keeps the last `window` snapshots. Only snapshots holding exactly one
/// known face vote; empty or crowded frames and unknown faces are not
/// evidence for anyone. Once a name's score reaches the threshold while
/// nothing is latched, that name is latched until [`IdentityVoter::reset`].
pub struct IdentityVoter {
    history: VecDeque<Vec<Analysis>>,
    window: usize,
    threshold: f64,
    scoring: VoteScoring,
    current: Option<String>,
}

impl IdentityVoter {
    pub fn new(window: usize, threshold: f64, scoring: VoteScoring) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidLatchThreshold(threshold));
        }
        Ok(Self {
            history: VecDeque::with_capacity(window),
            window,
            threshold,
            scoring,
            current: None,
        })
    }

    /// Records a snapshot, evicting the oldest when full, and re-evaluates
    /// the latch. Returns the current name.
    pub fn push(&mut self, snapshot: Vec<Analysis>) -> Option<&str> {
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(snapshot);

        if self.current.is_none() {
            if let Some((name, score)) = self.leader() {
                if score >= self.threshold {
                    log::info!("latched identity {name} (score {score:.2})");
                    self.current = Some(name);
                }
            }
        }
        self.current()
    }

    /// Scores per name over the window, highest first, ties by name.
    pub fn scores(&self) -> Vec<(String, f64)> {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for snapshot in &self.history {
            let [only] = snapshot.as_slice() else {
                continue;
            };
            let Some(name) = only.name.as_deref() else {
                continue;
            };
            let vote = match self.scoring {
                VoteScoring::Count => 1.0,
                VoteScoring::DistanceSum => only.distance,
            };
            *totals.entry(name).or_insert(0.0) += vote;
        }
        let mut scores: Vec<(String, f64)> = totals
            .into_iter()
            .map(|(name, score)| (name.to_string(), score))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scores
    }

    fn leader(&self) -> Option<(String, f64)> {
        self.scores().into_iter().next()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Clears the latched name. The window is kept, so a name that still
    /// dominates it latches again on the next push.
    pub fn reset(&mut self) {
        if let Some(name) = self.current.take() {
            log::info!("released identity {name}");
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
