use serde::{Deserialize, Serialize};

/// Euclidean distance at or below which two face embeddings are considered
/// the same person. The pipeline's default match policy.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Detected face rectangle, stored as edges in frame coordinates.
///
/// Edge form (`top`/`right`/`bottom`/`left`) is the crop convention used
/// throughout the pipeline: `frame[top..bottom, left..right]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    /// Clamp all edges into a `frame_width` × `frame_height` frame.
    pub fn clamped(&self, frame_width: u32, frame_height: u32) -> FaceBox {
        let w = frame_width as f32;
        let h = frame_height as f32;
        FaceBox {
            top: self.top.clamp(0.0, h),
            right: self.right.clamp(0.0, w),
            bottom: self.bottom.clamp(0.0, h),
            left: self.left.clamp(0.0, w),
            confidence: self.confidence,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bottom <= self.top || self.right <= self.left
    }
}

/// Face embedding vector (512-dimensional, L2-normalized by the encoder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// Outcome of comparing one reference embedding against one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct FaceMatch {
    pub matched: bool,
    /// Euclidean distance between the pair.
    pub distance: f32,
}

/// Strategy for deciding whether a candidate embedding matches a reference.
pub trait Matcher {
    fn compare(&self, reference: &Embedding, candidate: &Embedding, threshold: f32) -> FaceMatch;
}

/// Euclidean-distance matcher: a candidate matches when its distance to the
/// reference is at or below the threshold.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, reference: &Embedding, candidate: &Embedding, threshold: f32) -> FaceMatch {
        let distance = reference.euclidean_distance(candidate);
        FaceMatch {
            matched: distance <= threshold,
            distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(values: Vec<f32>) -> Embedding {
        Embedding {
            values,
            model_version: None,
        }
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = embedding(vec![1.0, 0.0, 0.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_unit_axes() {
        let a = embedding(vec![1.0, 0.0]);
        let b = embedding(vec![0.0, 1.0]);
        assert!((a.euclidean_distance(&b) - std::f32::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_identical_matches() {
        let a = embedding(vec![0.5, 0.5]);
        let result = EuclideanMatcher.compare(&a, &a, DEFAULT_MATCH_THRESHOLD);
        assert!(result.matched);
        assert!(result.distance.abs() < 1e-6);
    }

    #[test]
    fn test_matcher_far_candidate_rejected() {
        let a = embedding(vec![1.0, 0.0]);
        let b = embedding(vec![-1.0, 0.0]);
        let result = EuclideanMatcher.compare(&a, &b, DEFAULT_MATCH_THRESHOLD);
        assert!(!result.matched);
        assert!((result.distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_matcher_threshold_inclusive() {
        // Distance exactly at the threshold still matches.
        let a = embedding(vec![0.0, 0.0]);
        let b = embedding(vec![0.6, 0.0]);
        let result = EuclideanMatcher.compare(&a, &b, 0.6);
        assert!(result.matched);
    }

    #[test]
    fn test_matcher_just_over_threshold() {
        let a = embedding(vec![0.0, 0.0]);
        let b = embedding(vec![0.6001, 0.0]);
        let result = EuclideanMatcher.compare(&a, &b, 0.6);
        assert!(!result.matched);
    }

    #[test]
    fn test_facebox_dimensions() {
        let b = FaceBox {
            top: 10.0,
            right: 50.0,
            bottom: 40.0,
            left: 20.0,
            confidence: 0.9,
        };
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.height(), 30.0);
        assert!(!b.is_empty());
    }

    #[test]
    fn test_facebox_clamped() {
        let b = FaceBox {
            top: -5.0,
            right: 700.0,
            bottom: 500.0,
            left: -3.0,
            confidence: 0.9,
        };
        let c = b.clamped(640, 480);
        assert_eq!(c.top, 0.0);
        assert_eq!(c.left, 0.0);
        assert_eq!(c.right, 640.0);
        assert_eq!(c.bottom, 480.0);
    }

    #[test]
    fn test_facebox_inverted_is_empty() {
        let b = FaceBox {
            top: 40.0,
            right: 20.0,
            bottom: 10.0,
            left: 50.0,
            confidence: 0.9,
        };
        assert!(b.is_empty());
    }
}
