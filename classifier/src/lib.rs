//! Emotion classification seam.
//!
//! The model itself is an opaque external service. This crate defines the
//! [`Classifier`] contract, the HTTP adapter that talks to a
//! DeepFace-style endpoint, and [`ClassifierAdapter`], which bolts on the
//! timeout and single-flight semantics the rest of the system relies on.

pub mod adapter;
pub mod error;
pub mod http;
pub mod mood;

pub use adapter::ClassifierAdapter;
pub use error::ClassificationError;
pub use http::HttpClassifier;
pub use mood::{EmotionScores, MoodLabel};

use async_trait::async_trait;

/// Classifies the emotion visible in an encoded face image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<EmotionScores, ClassificationError>;
}

/// Classifier returning canned scores. For rigs and tests.
#[derive(Clone, Debug)]
pub struct StaticClassifier {
    scores: EmotionScores,
}

impl StaticClassifier {
    pub fn new(scores: EmotionScores) -> Self {
        Self { scores }
    }

    /// A classifier that always reports the given mood with certainty.
    pub fn certain(label: MoodLabel) -> Self {
        let mut scores = EmotionScores::default();
        scores.set(label, 100.0);
        Self { scores }
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(&self, _image: &[u8]) -> Result<EmotionScores, ClassificationError> {
        Ok(self.scores.clone())
    }
}
