//! 68-point facial landmark regression via ONNX Runtime.
//!
//! PFLD-style model: a square face crop resized to 112x112 yields 136
//! normalized coordinates, mapped back into frame space. The 68-point
//! layout follows the standard convention (0-16 jaw, 17-26 brows, 27-35
//! nose, 36-41 right eye, 42-47 left eye, 48-67 lips).

use crate::frame::Frame;
use crate::types::FaceBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const LANDMARK_INPUT_SIZE: usize = 112;
const LANDMARK_COUNT: usize = 68;
/// Crop margin around the detector box; landmark models are trained with
/// context beyond the tight face rectangle.
const CROP_EXPANSION: f32 = 1.2;

/// Right-eye landmark indices in the 68-point convention.
pub const RIGHT_EYE: std::ops::Range<usize> = 36..42;
/// Left-eye landmark indices in the 68-point convention.
pub const LEFT_EYE: std::ops::Range<usize> = 42..48;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box is empty after clamping to the frame")]
    EmptyRegion,
}

impl From<ort::Error> for LandmarkError {
    fn from(e: ort::Error) -> Self {
        LandmarkError::InferenceFailed(e.to_string())
    }
}

/// 68 ordered landmark points in frame coordinates.
#[derive(Debug, Clone)]
pub struct Landmarks {
    points: [(f32, f32); LANDMARK_COUNT],
}

impl Landmarks {
    pub fn new(points: [(f32, f32); LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f32, f32); LANDMARK_COUNT] {
        &self.points
    }

    /// The six left-eye points (indices 42..48).
    pub fn left_eye(&self) -> [(f32, f32); 6] {
        let mut eye = [(0.0, 0.0); 6];
        eye.copy_from_slice(&self.points[LEFT_EYE]);
        eye
    }

    /// The six right-eye points (indices 36..42).
    pub fn right_eye(&self) -> [(f32, f32); 6] {
        let mut eye = [(0.0, 0.0); 6];
        eye.copy_from_slice(&self.points[RIGHT_EYE]);
        eye
    }
}

/// Square crop region around a face box, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub side: f32,
}

/// Compute the square region fed to the landmark model: centered on the
/// face box, side `max(w, h) * CROP_EXPANSION`, clamped to the frame.
pub fn crop_region(face: &FaceBox, frame_width: u32, frame_height: u32) -> Option<CropRegion> {
    let clamped = face.clamped(frame_width, frame_height);
    if clamped.is_empty() {
        return None;
    }

    let cx = (clamped.left + clamped.right) / 2.0;
    let cy = (clamped.top + clamped.bottom) / 2.0;
    let side = (clamped.width().max(clamped.height()) * CROP_EXPANSION)
        .min(frame_width as f32)
        .min(frame_height as f32);

    let x = (cx - side / 2.0).clamp(0.0, frame_width as f32 - side);
    let y = (cy - side / 2.0).clamp(0.0, frame_height as f32 - side);
    Some(CropRegion { x, y, side })
}

/// Map raw model output (136 floats, normalized to the crop square) back
/// into frame coordinates.
fn decode_points(raw: &[f32], region: &CropRegion) -> [(f32, f32); LANDMARK_COUNT] {
    let mut points = [(0.0f32, 0.0f32); LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
        *point = (
            region.x + raw[i * 2] * region.side,
            region.y + raw[i * 2 + 1] * region.side,
        );
    }
    points
}

/// PFLD-style 68-point landmark predictor.
pub struct LandmarkPredictor {
    session: Session,
}

impl LandmarkPredictor {
    /// Load the landmark ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, LandmarkError> {
        if !Path::new(model_path).exists() {
            return Err(LandmarkError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded landmark predictor");
        Ok(Self { session })
    }

    /// Predict 68 landmarks for one detected face.
    pub fn predict(&mut self, frame: &Frame, face: &FaceBox) -> Result<Landmarks, LandmarkError> {
        let region = crop_region(face, frame.width(), frame.height())
            .ok_or(LandmarkError::EmptyRegion)?;

        let crop_box = FaceBox {
            top: region.y,
            right: region.x + region.side,
            bottom: region.y + region.side,
            left: region.x,
            confidence: face.confidence,
        };
        let crop = frame.crop(&crop_box).ok_or(LandmarkError::EmptyRegion)?;
        let resized = crop.resized(LANDMARK_INPUT_SIZE as u32, LANDMARK_INPUT_SIZE as u32);

        let input = preprocess(&resized);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkError::InferenceFailed(format!("landmark decode: {e}")))?;

        if raw.len() != LANDMARK_COUNT * 2 {
            return Err(LandmarkError::InferenceFailed(format!(
                "expected {} coordinates, got {}",
                LANDMARK_COUNT * 2,
                raw.len()
            )));
        }

        Ok(Landmarks::new(decode_points(raw, &region)))
    }
}

/// 112x112 crop into an NCHW tensor normalized to [0, 1].
///
/// Landmark regression is luminance-driven: the crop is reduced to its
/// intensity plane and replicated across the three input channels.
fn preprocess(resized: &Frame) -> Array4<f32> {
    let size = LANDMARK_INPUT_SIZE;
    let luma = resized.to_luma();
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            let normalized = luma[y * size + x] as f32 / 255.0;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(left: f32, top: f32, right: f32, bottom: f32) -> FaceBox {
        FaceBox {
            top,
            right,
            bottom,
            left,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_crop_region_square_and_expanded() {
        let region = crop_region(&face(100.0, 100.0, 200.0, 250.0), 640, 480).unwrap();
        // Side = max(100, 150) * 1.2 = 180
        assert!((region.side - 180.0).abs() < 1e-4);
        // Centered on (150, 175)
        assert!((region.x - (150.0 - 90.0)).abs() < 1e-4);
        assert!((region.y - (175.0 - 90.0)).abs() < 1e-4);
    }

    #[test]
    fn test_crop_region_clamped_to_frame() {
        let region = crop_region(&face(0.0, 0.0, 100.0, 100.0), 640, 480).unwrap();
        assert!(region.x >= 0.0);
        assert!(region.y >= 0.0);
        assert!(region.x + region.side <= 640.0 + 1e-4);
        assert!(region.y + region.side <= 480.0 + 1e-4);
    }

    #[test]
    fn test_crop_region_never_exceeds_frame_side() {
        // Oversized detection on a small frame
        let region = crop_region(&face(0.0, 0.0, 600.0, 400.0), 320, 240).unwrap();
        assert!(region.side <= 240.0 + 1e-4);
    }

    #[test]
    fn test_crop_region_empty_box() {
        assert!(crop_region(&face(700.0, 500.0, 800.0, 600.0), 640, 480).is_none());
    }

    #[test]
    fn test_decode_points_maps_into_region() {
        let region = CropRegion {
            x: 50.0,
            y: 80.0,
            side: 100.0,
        };
        let mut raw = vec![0.0f32; LANDMARK_COUNT * 2];
        raw[0] = 0.0; // point 0 at region origin
        raw[1] = 0.0;
        raw[2] = 1.0; // point 1 at region far corner
        raw[3] = 1.0;
        raw[72] = 0.5; // point 36 (right eye outer corner) at region center
        raw[73] = 0.5;

        let points = decode_points(&raw, &region);
        assert_eq!(points[0], (50.0, 80.0));
        assert_eq!(points[1], (150.0, 180.0));
        assert_eq!(points[36], (100.0, 130.0));
    }

    #[test]
    fn test_eye_slices() {
        let mut pts = [(0.0f32, 0.0f32); LANDMARK_COUNT];
        for (i, p) in pts.iter_mut().enumerate() {
            *p = (i as f32, i as f32);
        }
        let lm = Landmarks::new(pts);

        let right = lm.right_eye();
        assert_eq!(right[0], (36.0, 36.0));
        assert_eq!(right[5], (41.0, 41.0));

        let left = lm.left_eye();
        assert_eq!(left[0], (42.0, 42.0));
        assert_eq!(left[5], (47.0, 47.0));
    }

    #[test]
    fn test_preprocess_shape_and_scale() {
        let data = vec![255u8; LANDMARK_INPUT_SIZE * LANDMARK_INPUT_SIZE * 3];
        let frame = Frame::new(data, LANDMARK_INPUT_SIZE as u32, LANDMARK_INPUT_SIZE as u32, 0);
        let tensor = preprocess(&frame);
        assert_eq!(tensor.shape(), &[1, 3, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_channels_replicated() {
        // A colored pixel contributes one intensity to all three channels.
        let mut data = vec![0u8; LANDMARK_INPUT_SIZE * LANDMARK_INPUT_SIZE * 3];
        data[0] = 200; // R of pixel (0, 0)
        data[1] = 40; // G
        data[2] = 90; // B
        let frame = Frame::new(data, LANDMARK_INPUT_SIZE as u32, LANDMARK_INPUT_SIZE as u32, 0);
        let tensor = preprocess(&frame);
        assert_eq!(tensor[[0, 0, 0, 0]], tensor[[0, 1, 0, 0]]);
        assert_eq!(tensor[[0, 1, 0, 0]], tensor[[0, 2, 0, 0]]);
        assert!(tensor[[0, 0, 0, 0]] > 0.0);
    }
}
