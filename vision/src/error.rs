use thiserror::Error;

/// Failures from the camera or the presence detector.
///
/// Either one cancels the current scan session; nothing here is fatal to
/// the process.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("presence detector failed: {0}")]
    Detector(String),
}
