/// YOLO region detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and confidence-ordered NMS.
/// Works with single-class face models (`[cx, cy, w, h, conf, keypoints..]`)
/// as well as multi-class models, where `class_index` picks the score column
/// (class 0 is "person" in COCO exports).
use std::path::Path;

use crate::detection::domain::region_detector::{clamp_to_frame, RegionDetector};
use crate::shared::frame::Frame;
use crate::shared::onnx_session::{open_session, square_input_size};
use crate::shared::region::Region;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold for raw model output.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of box coordinates preceding the score columns.
const BOX_VALUES: usize = 4;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    class_index: usize,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads a YOLO ONNX model.
    ///
    /// The input resolution is read from the model's NCHW input shape,
    /// falling back to 640 for dynamic shapes.
    pub fn new(
        model_path: &Path,
        confidence: f64,
        class_index: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        let input_size = square_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            confidence,
            class_index,
            input_size,
        })
    }
}

impl RegionDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if frame.is_empty() || frame.channels() < 3 {
            return Ok(Vec::new());
        }
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        // Output is [1, features, detections] (transposed) or
        // [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let score_col = BOX_VALUES + self.class_index;
        if score_col >= num_feats {
            return Err(format!(
                "class index {} out of range for {num_feats} output features",
                self.class_index
            )
            .into());
        }

        let data = tensor.as_standard_layout();
        let data = data.as_slice().ok_or("Cannot get tensor slice")?;
        let value = |det: usize, feat: usize| -> f64 {
            if transposed {
                data[feat * num_dets + det] as f64
            } else {
                data[det * num_feats + feat] as f64
            }
        };

        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let conf = value(i, score_col);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
            raw_dets.push(RawDetection {
                x1: ((cx - w / 2.0) - pad_x as f64) / scale,
                y1: ((cy - h / 2.0) - pad_y as f64) / scale,
                x2: ((cx + w / 2.0) - pad_x as f64) / scale,
                y2: ((cy + h / 2.0) - pad_y as f64) / scale,
                confidence: conf,
            });
        }

        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);
        log::debug!("yolo: {} candidates, {} after nms", num_dets, kept.len());
        Ok(clamp_to_frame(
            kept.iter()
                .map(|d| Region::from_corners_f64(d.x1, d.y1, d.x2, d.y2)),
            frame,
        ))
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl RawDetection {
    fn bbox(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        if keep
            .iter()
            .all(|k| bbox_iou(&k.bbox(), &det.bbox()) <= iou_thresh)
        {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
