//! Drowsiness state tracking
//!
//! Debounces per-frame eye observations into a drowsiness flag: the flag is
//! raised once the consecutive closed/absent counter reaches the configured
//! threshold, and recomputed from scratch on every frame.

use tracing::{debug, info};

use crate::analysis::{Annotation, Evaluation, FaceObservation, OverlayLine};

/// Temporal drowsiness state (tracked across frames)
///
/// Counter and flag always change together; share one instance behind a
/// single lock when several requests feed the same camera session.
#[derive(Debug, Clone, Default)]
pub struct DrowsinessTracker {
    /// Consecutive evaluations with eyes judged closed or missing
    counter: u32,
    /// Result of the most recent `counter >= threshold` check
    drowsy: bool,
}

impl DrowsinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current consecutive closed/absent counter
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Drowsiness flag from the last evaluation
    pub fn is_drowsy(&self) -> bool {
        self.drowsy
    }

    /// Fold one frame's observations into the tracker.
    ///
    /// Faces are processed in detector order and each one overwrites the
    /// flag, so the last face decides the outcome. Within a face with two or
    /// more eyes, the counter is reset first and each eye's verdict replaces
    /// the previous one, so the last eye decides.
    pub fn evaluate(
        &mut self,
        faces: &[FaceObservation],
        consec_frames: u32,
        ear_threshold: f32,
    ) -> Evaluation {
        let mut annotations = Vec::new();

        if faces.is_empty() {
            self.counter = 0;
            self.drowsy = false;
            annotations.push(Annotation::label(OverlayLine::Status, "No faces detected"));
            debug!("No faces detected, counter reset");
            return self.snapshot(annotations);
        }

        for face in faces {
            annotations.push(Annotation::FaceBox(face.region));
            annotations.push(Annotation::label(
                OverlayLine::EyeCount,
                format!("Eyes detected: {}", face.eyes.len()),
            ));

            if face.eyes.len() >= 2 {
                self.counter = 0;
                self.drowsy = false;

                let mut last_openness = 0.0;
                for eye in &face.eyes {
                    annotations.push(Annotation::EyeBox(face.region.offset_child(&eye.region)));
                    last_openness = eye.openness;
                    // Each eye's verdict overwrites the previous one.
                    self.counter = if eye.openness < ear_threshold { 1 } else { 0 };
                }
                annotations.push(Annotation::label(
                    OverlayLine::Openness,
                    format!("EAR: {:.2}", last_openness),
                ));
            } else {
                // Missing eyes count as closure or occlusion.
                self.counter = self.counter.saturating_add(1);
            }

            annotations.push(Annotation::label(
                OverlayLine::Counter,
                format!("Counter: {}/{}", self.counter, consec_frames),
            ));

            self.drowsy = self.counter >= consec_frames;
            if self.drowsy {
                annotations.push(Annotation::label(OverlayLine::Alert, "DROWSINESS ALERT!"));
            }
        }

        if self.drowsy {
            info!(counter = self.counter, threshold = consec_frames, "Drowsiness detected");
        } else {
            debug!(counter = self.counter, threshold = consec_frames, "Frame evaluated");
        }

        self.snapshot(annotations)
    }

    fn snapshot(&self, annotations: Vec<Annotation>) -> Evaluation {
        Evaluation {
            drowsy: self.drowsy,
            counter: self.counter,
            annotations,
        }
    }
}
