use serde::{Deserialize, Serialize};

/// Fixed-length identity feature vector of one face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEncoding(Vec<f32>);

impl FaceEncoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance. Encodings of different lengths come from
    /// different models and are infinitely far apart.
    pub fn distance(&self, other: &FaceEncoding) -> f64 {
        if self.0.len() != other.0.len() {
            return f64::INFINITY;
        }
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| {
                let d = (*a - *b) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl From<Vec<f32>> for FaceEncoding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}
