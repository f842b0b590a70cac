use classifier::{EmotionScores, MoodLabel};
use dispenser::PumpId;

/// Events emitted toward the presentation layer.
///
/// Exact wording is the presenter's business; these carry the information
/// content (which pump, how long, what completed).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Fraction of the presence hold reached; 0.0 means still searching.
    ScanProgress(f32),
    /// The capture fired and classification is about to start.
    Captured,
    Analyzing,
    MoodDetected {
        label: MoodLabel,
        scores: EmotionScores,
    },
    Dispensing {
        pump: PumpId,
        secs: f32,
    },
    DrinkReady {
        name: String,
    },
    Aborted,
    Failed(String),
}
