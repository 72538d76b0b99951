//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free 3-stride decoding with NMS post-processing. Only scores and
//! boxes are decoded; the model's keypoint outputs are ignored because eye
//! geometry comes from the dedicated 68-point landmark model.

use crate::frame::Frame;
use crate::types::FaceBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const DETECTOR_INPUT_SIZE: usize = 640;
const DETECTOR_MEAN: f32 = 127.5;
const DETECTOR_STD: f32 = 128.0;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DETECTOR_NMS_THRESHOLD: f32 = 0.4;
const DETECTOR_STRIDES: [usize; 3] = [8, 16, 32];
const DETECTOR_ANCHORS_PER_CELL: usize = 2;
// SCRFD exports scores at [0..3] and boxes at [3..6], one tensor per stride.
const DETECTOR_MIN_OUTPUTS: usize = 6;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Metadata for mapping letterboxed coordinates back to the frame.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// SCRFD-based face detector over RGB frames.
pub struct FaceDetector {
    session: Session,
    input_size: usize,
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        tracing::info!(path = model_path, outputs = num_outputs, "loaded face detector");

        if num_outputs < DETECTOR_MIN_OUTPUTS {
            return Err(DetectorError::InferenceFailed(format!(
                "detector model requires at least {DETECTOR_MIN_OUTPUTS} outputs \
                 (3 strides x score/bbox), got {num_outputs}"
            )));
        }

        Ok(Self {
            session,
            input_size: DETECTOR_INPUT_SIZE,
        })
    }

    /// Detect faces in a frame, returning boxes sorted by confidence.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, DetectorError> {
        let (input, letterbox) = self.preprocess(frame);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all = Vec::new();
        for (stride_pos, &stride) in DETECTOR_STRIDES.iter().enumerate() {
            let (_, scores) = outputs[stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, boxes) = outputs[stride_pos + 3]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("boxes stride {stride}: {e}")))?;

            all.extend(decode_stride(
                scores,
                boxes,
                stride,
                self.input_size,
                &letterbox,
                DETECTOR_CONFIDENCE_THRESHOLD,
            ));
        }

        let mut result = nms(all, DETECTOR_NMS_THRESHOLD);
        result.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(result)
    }

    /// Letterbox the RGB frame into an NCHW tensor normalized to the SCRFD
    /// input distribution. Padding uses the mean value (normalizes to 0.0).
    fn preprocess(&self, frame: &Frame) -> (Array4<f32>, Letterbox) {
        let size = self.input_size;
        let scale_w = size as f32 / frame.width() as f32;
        let scale_h = size as f32 / frame.height() as f32;
        let scale = scale_w.min(scale_h);

        let new_w = (frame.width() as f32 * scale).round() as u32;
        let new_h = (frame.height() as f32 * scale).round() as u32;
        let pad_x = (size as f32 - new_w as f32) / 2.0;
        let pad_y = (size as f32 - new_h as f32) / 2.0;

        let resized = frame.resized(new_w, new_h);
        let px_start = pad_x.floor() as usize;
        let py_start = pad_y.floor() as usize;

        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for y in 0..size {
            for x in 0..size {
                let inside = y >= py_start
                    && y < py_start + new_h as usize
                    && x >= px_start
                    && x < px_start + new_w as usize;
                for c in 0..3 {
                    let pixel = if inside {
                        let idx = ((y - py_start) * new_w as usize + (x - px_start)) * 3 + c;
                        resized.data()[idx] as f32
                    } else {
                        DETECTOR_MEAN
                    };
                    tensor[[0, c, y, x]] = (pixel - DETECTOR_MEAN) / DETECTOR_STD;
                }
            }
        }

        (tensor, Letterbox { scale, pad_x, pad_y })
    }
}

/// Decode detections for a single stride level into frame coordinates.
fn decode_stride(
    scores: &[f32],
    boxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<FaceBox> {
    let grid = input_size / stride;
    let num_anchors = grid * grid * DETECTOR_ANCHORS_PER_CELL;

    let mut detections = Vec::new();
    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let anchor_idx = idx / DETECTOR_ANCHORS_PER_CELL;
        let anchor_cx = (anchor_idx % grid) as f32 * stride as f32;
        let anchor_cy = (anchor_idx / grid) as f32 * stride as f32;

        // Box encoding: [left, top, right, bottom] offsets in stride units.
        let off = idx * 4;
        if off + 3 >= boxes.len() {
            continue;
        }
        let x1 = anchor_cx - boxes[off] * stride as f32;
        let y1 = anchor_cy - boxes[off + 1] * stride as f32;
        let x2 = anchor_cx + boxes[off + 2] * stride as f32;
        let y2 = anchor_cy + boxes[off + 3] * stride as f32;

        detections.push(FaceBox {
            top: (y1 - letterbox.pad_y) / letterbox.scale,
            right: (x2 - letterbox.pad_x) / letterbox.scale,
            bottom: (y2 - letterbox.pad_y) / letterbox.scale,
            left: (x1 - letterbox.pad_x) / letterbox.scale,
            confidence: score,
        });
    }

    detections
}

/// Non-Maximum Suppression: remove overlapping detections.
fn nms(mut detections: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());
        for j in (i + 1)..detections.len() {
            if !suppressed[j] && iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection-over-Union of two edge-form boxes.
fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let left = a.left.max(b.left);
    let top = a.top.max(b.top);
    let right = a.right.min(b.right);
    let bottom = a.bottom.min(b.bottom);

    let inter = (right - left).max(0.0) * (bottom - top).max(0.0);
    let union = a.width() * a.height() + b.width() * b.height() - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_box(left: f32, top: f32, w: f32, h: f32, conf: f32) -> FaceBox {
        FaceBox {
            top,
            right: left + w,
            bottom: top + h,
            left,
            confidence: conf,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = face_box(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_no_overlap() {
        let a = face_box(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face_box(20.0, 20.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_horizontal_overlap() {
        let a = face_box(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face_box(5.0, 0.0, 10.0, 10.0, 1.0);
        // Overlap 5x10 = 50, union 150
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            face_box(0.0, 0.0, 100.0, 100.0, 0.9),
            face_box(5.0, 5.0, 100.0, 100.0, 0.8),
            face_box(200.0, 200.0, 50.0, 50.0, 0.7),
        ];
        let result = nms(detections, 0.4);
        assert_eq!(result.len(), 2);
        assert!((result[0].confidence - 0.9).abs() < 1e-6);
        assert!((result[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint() {
        let detections = vec![
            face_box(0.0, 0.0, 10.0, 10.0, 0.9),
            face_box(50.0, 50.0, 10.0, 10.0, 0.8),
        ];
        assert_eq!(nms(detections, 0.4).len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let (width, height) = (320.0f32, 240.0f32);
        let scale = (640.0 / width).min(640.0 / height);
        let pad_x = (640.0 - (width * scale).round()) / 2.0;
        let pad_y = (640.0 - (height * scale).round()) / 2.0;
        let letterbox = Letterbox { scale, pad_x, pad_y };

        let (orig_x, orig_y) = (100.0f32, 50.0f32);
        let boxed_x = orig_x * scale + pad_x;
        let boxed_y = orig_y * scale + pad_y;

        let recovered_x = (boxed_x - letterbox.pad_x) / letterbox.scale;
        let recovered_y = (boxed_y - letterbox.pad_y) / letterbox.scale;
        assert!((recovered_x - orig_x).abs() < 0.1);
        assert!((recovered_y - orig_y).abs() < 0.1);
    }

    #[test]
    fn test_decode_stride_below_threshold_skipped() {
        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let grid = DETECTOR_INPUT_SIZE / 8;
        let anchors = grid * grid * DETECTOR_ANCHORS_PER_CELL;
        let scores = vec![0.1f32; anchors];
        let boxes = vec![1.0f32; anchors * 4];
        let dets = decode_stride(&scores, &boxes, 8, DETECTOR_INPUT_SIZE, &letterbox, 0.5);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_stride_anchor_geometry() {
        // One confident anchor at cell (1, 2) of the stride-8 grid with unit
        // offsets should decode to a 16x16 box centered on the anchor.
        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let grid = DETECTOR_INPUT_SIZE / 8;
        let anchors = grid * grid * DETECTOR_ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; anchors];
        let mut boxes = vec![0.0f32; anchors * 4];

        let cell = 2 * grid + 1; // (x=1, y=2)
        let idx = cell * DETECTOR_ANCHORS_PER_CELL;
        scores[idx] = 0.9;
        boxes[idx * 4..idx * 4 + 4].copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);

        let dets = decode_stride(&scores, &boxes, 8, DETECTOR_INPUT_SIZE, &letterbox, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.left - 0.0).abs() < 1e-4); // 8 - 8
        assert!((d.top - 8.0).abs() < 1e-4); // 16 - 8
        assert!((d.right - 16.0).abs() < 1e-4); // 8 + 8
        assert!((d.bottom - 24.0).abs() < 1e-4); // 16 + 8
        assert!((d.confidence - 0.9).abs() < 1e-6);
    }
}
