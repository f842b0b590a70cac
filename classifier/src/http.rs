//! HTTP adapter for a DeepFace-style emotion service.
//!
//! The service takes a base64 JPEG and answers with per-label confidence
//! percentages:
//!
//! ```json
//! { "emotion": { "happy": 61.2, "neutral": 30.1, "sad": 8.7 } }
//! ```
//!
//! Unknown labels in the response are ignored; absent labels read as 0.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ClassificationError;
use crate::mood::{EmotionScores, MoodLabel};
use crate::Classifier;

#[derive(Clone)]
pub struct HttpClassifier {
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    emotion: HashMap<String, f32>,
}

impl HttpClassifier {
    /// Create a client targeting `url` (e.g. `http://localhost:5005/analyze`).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<EmotionScores, ClassificationError> {
        let payload = BASE64.encode(image);
        info!(url = %self.url, size = image.len(), "requesting emotion analysis");
        let resp = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest { image: &payload })
            .send()
            .await
            .map_err(|e| ClassificationError::Unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ClassificationError::Unavailable(format!(
                "service answered {}",
                resp.status()
            )));
        }
        let body: AnalyzeResponse = resp
            .json()
            .await
            .map_err(|e| ClassificationError::InvalidInput(e.to_string()))?;

        let scores: EmotionScores = body
            .emotion
            .iter()
            .filter_map(|(name, &confidence)| MoodLabel::parse(name).map(|l| (l, confidence)))
            .collect();
        debug!(dominant = %scores.dominant(), "analysis complete");
        Ok(scores)
    }
}
