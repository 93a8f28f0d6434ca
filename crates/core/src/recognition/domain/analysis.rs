use crate::shared::constants::UNKNOWN_NAME;
use crate::shared::region::Region;

/// Identity verdict for one face in one frame.
///
/// `distance` is the true distance to the closest known encoding even when
/// it was too far to accept the match.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub name: Option<String>,
    pub distance: f64,
    pub region: Region,
}

impl Analysis {
    pub fn is_known(&self) -> bool {
        self.name.is_some()
    }

    /// Matched name, or "Unknown".
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    /// Same verdict with the region mapped by `factor`, e.g. back to
    /// full resolution after analysing a resized frame.
    pub fn scaled(&self, factor: f64) -> Analysis {
        Analysis {
            region: self.region.scaled(factor),
            ..self.clone()
        }
    }
}
