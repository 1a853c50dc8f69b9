//! Per-frame observations, overlay annotations, and evaluation results

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Translate a region expressed relative to `self` into `self`'s coordinate space
    pub fn offset_child(&self, child: &Region) -> Region {
        Region {
            x: self.x + child.x,
            y: self.y + child.y,
            width: child.width,
            height: child.height,
        }
    }

    /// Clip to a `width` x `height` image; `None` if nothing remains
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Region> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(Region::new(self.x, self.y, w, h))
    }
}

/// One detected eye, relative to its face sub-image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeObservation {
    pub region: Region,
    /// Openness score (geometric ratio x brightness factor)
    pub openness: f32,
}

/// One detected face and the eyes found inside it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceObservation {
    pub region: Region,
    /// Eyes in detector order
    pub eyes: Vec<EyeObservation>,
}

/// Fixed text rows of the frame overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayLine {
    /// "No faces detected"
    Status,
    /// "Eyes detected: N"
    EyeCount,
    /// "EAR: 0.00"
    Openness,
    /// "Counter: c/t"
    Counter,
    /// "DROWSINESS ALERT!"
    Alert,
}

impl OverlayLine {
    /// Text baseline (pixels from the top of the frame)
    pub fn baseline(self) -> u32 {
        match self {
            OverlayLine::Status => 30,
            OverlayLine::EyeCount => 60,
            OverlayLine::Openness => 90,
            OverlayLine::Counter => 120,
            OverlayLine::Alert => 150,
        }
    }
}

/// Overlay drawing instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    /// Face bounding box (frame coordinates)
    FaceBox(Region),
    /// Eye bounding box (frame coordinates)
    EyeBox(Region),
    /// Text on one of the fixed overlay lines
    Label { line: OverlayLine, text: String },
}

impl Annotation {
    pub(crate) fn label(line: OverlayLine, text: impl Into<String>) -> Self {
        Annotation::Label {
            line,
            text: text.into(),
        }
    }

    /// Label text, if this is a label
    pub fn text(&self) -> Option<&str> {
        match self {
            Annotation::Label { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Result of evaluating one frame's observations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    /// Drowsiness flag after this frame
    pub drowsy: bool,
    /// Consecutive closed/absent counter after this frame
    pub counter: u32,
    /// Overlay instructions, in emission order
    pub annotations: Vec<Annotation>,
}

impl Evaluation {
    /// All label texts in order
    pub fn labels(&self) -> Vec<&str> {
        self.annotations.iter().filter_map(Annotation::text).collect()
    }
}
