//! Eye-aspect-ratio geometry and the closed-eye frame selector.
//!
//! EAR is computed from the six eye landmarks treated as a closed hexagon:
//! outer corner, two upper-lid points, inner corner, two lower-lid points.
//! A low EAR means the lids are together.

/// Average EAR below which a frame counts as eyes-closed.
pub const EAR_THRESHOLD: f32 = 0.20;
/// Consecutive closed frames required before a reopening counts as a blink.
pub const CONSEC_FRAMES: u32 = 1;

/// EAR = (‖p2−p6‖ + ‖p3−p5‖) / (2‖p1−p4‖) over the six-point eye hexagon.
///
/// A degenerate eye (zero horizontal span) reads as fully closed.
pub fn eye_aspect_ratio(eye: &[(f32, f32); 6]) -> f32 {
    let a = distance(eye[1], eye[5]);
    let b = distance(eye[2], eye[4]);
    let c = distance(eye[0], eye[3]);
    if c <= f32::EPSILON {
        return 0.0;
    }
    (a + b) / (2.0 * c)
}

fn distance(p: (f32, f32), q: (f32, f32)) -> f32 {
    ((p.0 - q.0).powi(2) + (p.1 - q.1).powi(2)).sqrt()
}

/// Per-frame scanner: tracks the consecutive-closed counter, the blink
/// total, and which frame is currently selected.
///
/// Selection policy: every frame whose EAR falls below the threshold
/// becomes the selected frame, overwriting any earlier selection — the
/// last qualifying frame wins. A blink is counted at the transition back
/// above threshold, once the counter has reached [`CONSEC_FRAMES`].
#[derive(Debug, Default)]
pub struct BlinkScanner {
    counter: u32,
    total: u32,
    selected: Option<usize>,
}

impl BlinkScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's averaged EAR. Returns true when the frame is a
    /// closed-eye candidate (the caller should retain it).
    pub fn observe(&mut self, frame_index: usize, ear: f32) -> bool {
        if ear < EAR_THRESHOLD {
            self.counter += 1;
            self.selected = Some(frame_index);
            true
        } else {
            if self.counter >= CONSEC_FRAMES {
                self.total += 1;
            }
            self.counter = 0;
            false
        }
    }

    /// Index of the last frame that fell below the threshold, if any.
    pub fn selected_frame(&self) -> Option<usize> {
        self.selected
    }

    /// Completed blinks observed so far.
    pub fn total_blinks(&self) -> u32 {
        self.total
    }
}
