use async_trait::async_trait;
use glob::glob;
use std::path::PathBuf;
use tokio::fs;

use crate::error::DeviceError;
use crate::frame::Frame;

/// Supplies sequential frames from a camera device.
///
/// The camera itself is owned externally; implementations only promise a
/// fixed resolution and sequential delivery.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn next_frame(&mut self) -> Result<Frame, DeviceError>;
}

/// Cycles JPEG files from disk as simulated camera frames.
///
/// Useful on development rigs without a camera attached.
pub struct FolderSource {
    paths: Vec<PathBuf>,
    index: usize,
}

impl FolderSource {
    /// Create a source that cycles files matching `pattern`.
    pub fn new(pattern: &str) -> Result<Self, DeviceError> {
        let paths: Vec<PathBuf> = glob(pattern)
            .map_err(|e| DeviceError::Camera(e.msg.to_string()))?
            .filter_map(Result::ok)
            .collect();
        if paths.is_empty() {
            return Err(DeviceError::Camera(format!(
                "no frames match pattern {pattern}"
            )));
        }
        Ok(Self { paths, index: 0 })
    }
}

#[async_trait]
impl FrameSource for FolderSource {
    async fn next_frame(&mut self) -> Result<Frame, DeviceError> {
        if self.index >= self.paths.len() {
            self.index = 0;
        }
        let path = self.paths[self.index].clone();
        self.index += 1;
        let bytes = fs::read(&path)
            .await
            .map_err(|e| DeviceError::Camera(format!("{}: {e}", path.display())))?;
        Ok(Frame::new(bytes))
    }
}
