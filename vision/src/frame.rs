use std::time::Instant;

/// One image sample from the camera feed.
///
/// The payload is an encoded image (JPEG on every current source). Frames
/// are owned transiently by the loop that produced them; only the frame
/// that triggers a capture outlives its iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Instant::now(),
        }
    }
}

/// Bounding region of a detected face, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Presence judgment for a single [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct DetectionResult {
    pub present: bool,
    pub region: Option<Region>,
}

impl DetectionResult {
    pub fn present(region: Option<Region>) -> Self {
        Self {
            present: true,
            region,
        }
    }

    pub fn absent() -> Self {
        Self {
            present: false,
            region: None,
        }
    }
}
