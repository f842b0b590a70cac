//! Timeout and single-flight discipline around any [`Classifier`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::error::ClassificationError;
use crate::mood::EmotionScores;
use crate::Classifier;

/// Wraps a classifier with an explicit deadline and a one-in-flight gate.
///
/// Only one scan session exists at a time, so a second request while one
/// is pending is a bug upstream; it is rejected rather than queued.
#[derive(Clone)]
pub struct ClassifierAdapter {
    inner: Arc<dyn Classifier>,
    deadline: Duration,
    gate: Arc<Semaphore>,
}

impl ClassifierAdapter {
    pub fn new(inner: Arc<dyn Classifier>, deadline: Duration) -> Self {
        Self {
            inner,
            deadline,
            gate: Arc::new(Semaphore::new(1)),
        }
    }
}

#[async_trait]
impl Classifier for ClassifierAdapter {
    async fn classify(&self, image: &[u8]) -> Result<EmotionScores, ClassificationError> {
        let Ok(_permit) = self.gate.try_acquire() else {
            warn!("classification rejected: one already in flight");
            return Err(ClassificationError::Unavailable(
                "a classification is already in flight".into(),
            ));
        };
        info!(size = image.len(), deadline = ?self.deadline, "classifying capture");
        match tokio::time::timeout(self.deadline, self.inner.classify(image)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("classification exceeded deadline");
                Err(ClassificationError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodLabel;
    use crate::StaticClassifier;

    struct SlowClassifier {
        delay: Duration,
    }

    #[async_trait]
    impl Classifier for SlowClassifier {
        async fn classify(&self, _image: &[u8]) -> Result<EmotionScores, ClassificationError> {
            tokio::time::sleep(self.delay).await;
            Ok(EmotionScores::default())
        }
    }

    #[tokio::test]
    async fn passes_through_within_deadline() {
        let adapter = ClassifierAdapter::new(
            Arc::new(StaticClassifier::certain(MoodLabel::Happy)),
            Duration::from_secs(1),
        );
        let scores = adapter.classify(b"jpeg").await.unwrap();
        assert_eq!(scores.dominant(), MoodLabel::Happy);
    }

    #[tokio::test]
    async fn slow_service_yields_timeout() {
        let adapter = ClassifierAdapter::new(
            Arc::new(SlowClassifier {
                delay: Duration::from_millis(200),
            }),
            Duration::from_millis(20),
        );
        let err = adapter.classify(b"jpeg").await.unwrap_err();
        assert_eq!(err, ClassificationError::Timeout);
    }

    #[tokio::test]
    async fn second_in_flight_request_is_rejected() {
        let adapter = ClassifierAdapter::new(
            Arc::new(SlowClassifier {
                delay: Duration::from_millis(100),
            }),
            Duration::from_secs(1),
        );
        let racing = adapter.clone();
        let first = tokio::spawn(async move { racing.classify(b"a").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = adapter.classify(b"b").await.unwrap_err();
        assert!(matches!(err, ClassificationError::Unavailable(_)));

        // The first request is unaffected by the rejection.
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn gate_reopens_after_completion() {
        let adapter = ClassifierAdapter::new(
            Arc::new(StaticClassifier::certain(MoodLabel::Sad)),
            Duration::from_secs(1),
        );
        adapter.classify(b"a").await.unwrap();
        adapter.classify(b"b").await.unwrap();
    }
}
