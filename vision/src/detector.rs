use async_trait::async_trait;

use crate::error::DeviceError;
use crate::frame::{DetectionResult, Frame};

/// Judges whether a face is present in a frame.
///
/// Detection accuracy is somebody else's problem; this crate only cares
/// about the boolean (and the optional bounding region).
#[async_trait]
pub trait PresenceDetector: Send + Sync {
    async fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DeviceError>;
}

/// Bench-rig detector: any non-empty frame counts as a face.
///
/// Lets the full pipeline run on a machine without a detection model.
#[derive(Clone, Default)]
pub struct AlwaysPresent;

#[async_trait]
impl PresenceDetector for AlwaysPresent {
    async fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, DeviceError> {
        if frame.bytes.is_empty() {
            Ok(DetectionResult::absent())
        } else {
            Ok(DetectionResult::present(None))
        }
    }
}
