//! ArcFace-style face encoder via ONNX Runtime.
//!
//! Turns a face crop into a 512-dimensional L2-normalized embedding using
//! the w600k_r50 model. The crop is resized to 112x112 directly; this
//! pipeline compares the detector's crop as-is rather than warping to a
//! canonical landmark alignment.

use crate::frame::Frame;
use crate::types::Embedding;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ENCODER_INPUT_SIZE: usize = 112;
const ENCODER_MEAN: f32 = 127.5;
const ENCODER_STD: f32 = 127.5; // symmetric normalization, unlike the detector
const EMBEDDING_DIM: usize = 512;
const ENCODER_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("empty face crop")]
    EmptyCrop,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face embedding extractor.
pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    /// Load the encoder ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EncoderError> {
        if !Path::new(model_path).exists() {
            return Err(EncoderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded face encoder");
        Ok(Self { session })
    }

    /// Encode a face crop into an L2-normalized embedding.
    pub fn encode(&mut self, crop: &Frame) -> Result<Embedding, EncoderError> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(EncoderError::EmptyCrop);
        }

        let resized = crop.resized(ENCODER_INPUT_SIZE as u32, ENCODER_INPUT_SIZE as u32);
        let input = preprocess(&resized);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncoderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();
        if raw.len() != EMBEDDING_DIM {
            return Err(EncoderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding {
            values: l2_normalize(raw),
            model_version: Some(ENCODER_MODEL_VERSION.to_string()),
        })
    }
}

/// 112x112 RGB crop into an NCHW tensor with symmetric normalization.
fn preprocess(resized: &Frame) -> Array4<f32> {
    let size = ENCODER_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for y in 0..size {
        for x in 0..size {
            for c in 0..3 {
                let pixel = resized.data()[(y * size + x) * 3 + c] as f32;
                tensor[[0, c, y, x]] = (pixel - ENCODER_MEAN) / ENCODER_STD;
            }
        }
    }
    tensor
}

fn l2_normalize(values: Vec<f32>) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| x / norm).collect()
    } else {
        values
    }
}
