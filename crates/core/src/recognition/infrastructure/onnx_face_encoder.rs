/// ArcFace-style face encoder using ONNX Runtime.
///
/// Each face crop is resized to 112x112, normalised to `[-1, 1]` and
/// embedded. Embeddings are L2-normalised and then scaled so that the
/// default tolerance of 0.6 accepts pairs with a cosine similarity of at
/// least [`MATCH_COSINE`].
use std::path::Path;

use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::recognition::domain::face_encoding::FaceEncoding;
use crate::shared::frame::Frame;
use crate::shared::onnx_session::open_session;
use crate::shared::constants::DEFAULT_TOLERANCE;
use crate::shared::region::Region;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// Cosine similarity above which two ArcFace embeddings are the same person.
pub const MATCH_COSINE: f64 = 0.4;

pub struct OnnxFaceEncoder {
    session: ort::session::Session,
}

impl OnnxFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }

    fn embed(&mut self, crop: &Frame) -> Result<FaceEncoding, Box<dyn std::error::Error>> {
        let tensor = preprocess(crop.data(), crop.width(), crop.height(), crop.channels());
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("embedding model produced no outputs".into());
        }
        let embedding = outputs[0].try_extract_array::<f32>()?;
        let mut values: Vec<f32> = embedding.iter().copied().collect();
        calibrate(&mut values);
        Ok(FaceEncoding::new(values))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(
        &mut self,
        frame: &Frame,
        regions: &[Region],
    ) -> Result<Vec<FaceEncoding>, Box<dyn std::error::Error>> {
        let mut encodings = Vec::with_capacity(regions.len());
        for region in regions {
            let crop = frame.crop(region);
            if crop.is_empty() {
                return Err(format!("face region {region:?} lies outside the frame").into());
            }
            encodings.push(self.embed(&crop)?);
        }
        Ok(encodings)
    }
}

/// Resize crop to 112x112, normalize, NCHW layout. Grayscale crops are
/// replicated across the three channels.
fn preprocess(data: &[u8], width: u32, height: u32, channels: u8) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;
    let c = channels.max(1) as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    if src_w == 0 || src_h == 0 {
        return tensor;
    }

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * c;
            for ch in 0..3 {
                let Some(&value) = data.get(offset + ch.min(c - 1)) else {
                    continue;
                };
                tensor[[0, ch, y, x]] = (value as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }

    tensor
}

/// Length of every embedding. For unit vectors `|a - b|² = 2 - 2 cos`, so
/// at this length a distance of `DEFAULT_TOLERANCE` sits at `MATCH_COSINE`.
fn embedding_scale() -> f32 {
    (DEFAULT_TOLERANCE / (2.0 - 2.0 * MATCH_COSINE).sqrt()) as f32
}

fn calibrate(v: &mut [f32]) {
    l2_normalize(v);
    let scale = embedding_scale();
    for x in v.iter_mut() {
        *x *= scale;
    }
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
