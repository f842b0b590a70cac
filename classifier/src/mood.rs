//! Mood labels and their confidence scores.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed label set produced by the emotion service.
///
/// Declaration order is the total order used for deterministic arg-max
/// tie-breaking; it never depends on discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MoodLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl MoodLabel {
    pub const ALL: [MoodLabel; 7] = [
        MoodLabel::Angry,
        MoodLabel::Disgust,
        MoodLabel::Fear,
        MoodLabel::Happy,
        MoodLabel::Neutral,
        MoodLabel::Sad,
        MoodLabel::Surprise,
    ];

    /// Wire spelling, as carried in `DISPENSE <MOOD_LABEL>`.
    pub fn as_str(self) -> &'static str {
        match self {
            MoodLabel::Angry => "ANGRY",
            MoodLabel::Disgust => "DISGUST",
            MoodLabel::Fear => "FEAR",
            MoodLabel::Happy => "HAPPY",
            MoodLabel::Neutral => "NEUTRAL",
            MoodLabel::Sad => "SAD",
            MoodLabel::Surprise => "SURPRISE",
        }
    }

    /// Human spelling for drink names and status lines ("Happy").
    pub fn title(self) -> &'static str {
        match self {
            MoodLabel::Angry => "Angry",
            MoodLabel::Disgust => "Disgust",
            MoodLabel::Fear => "Fear",
            MoodLabel::Happy => "Happy",
            MoodLabel::Neutral => "Neutral",
            MoodLabel::Sad => "Sad",
            MoodLabel::Surprise => "Surprise",
        }
    }

    /// Case-insensitive parse of a wire or service label.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|l| *l == self).unwrap_or(0)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence per mood label.
///
/// Covers the whole label set by construction: absent labels read 0.0 and
/// negative inputs are clamped to 0.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionScores {
    scores: [f32; MoodLabel::ALL.len()],
}

impl EmotionScores {
    pub fn set(&mut self, label: MoodLabel, confidence: f32) {
        self.scores[label.index()] = confidence.max(0.0);
    }

    pub fn get(&self, label: MoodLabel) -> f32 {
        self.scores[label.index()]
    }

    /// The arg-max label. Ties go to the earlier label in the fixed order,
    /// so results are reproducible run to run.
    pub fn dominant(&self) -> MoodLabel {
        let mut best = MoodLabel::ALL[0];
        let mut best_score = self.get(best);
        for label in MoodLabel::ALL.into_iter().skip(1) {
            let score = self.get(label);
            if score > best_score {
                best = label;
                best_score = score;
            }
        }
        best
    }

    /// Labels and confidences, highest first (ties keep the fixed order).
    pub fn ranked(&self) -> Vec<(MoodLabel, f32)> {
        let mut pairs: Vec<(MoodLabel, f32)> =
            MoodLabel::ALL.into_iter().map(|l| (l, self.get(l))).collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        pairs
    }
}

impl FromIterator<(MoodLabel, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (MoodLabel, f32)>>(iter: I) -> Self {
        let mut scores = Self::default();
        for (label, confidence) in iter {
            scores.set(label, confidence);
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(MoodLabel::parse("happy"), Some(MoodLabel::Happy));
        assert_eq!(MoodLabel::parse(" SURPRISE "), Some(MoodLabel::Surprise));
        assert_eq!(MoodLabel::parse("bored"), None);
    }

    #[test]
    fn absent_labels_read_zero() {
        let scores = EmotionScores::from_iter([(MoodLabel::Sad, 80.0)]);
        assert_eq!(scores.get(MoodLabel::Happy), 0.0);
        assert_eq!(scores.get(MoodLabel::Sad), 80.0);
    }

    #[test]
    fn negative_confidence_clamps_to_zero() {
        let scores = EmotionScores::from_iter([(MoodLabel::Fear, -3.0)]);
        assert_eq!(scores.get(MoodLabel::Fear), 0.0);
    }

    #[test]
    fn dominant_picks_highest() {
        let scores = EmotionScores::from_iter([
            (MoodLabel::Happy, 12.0),
            (MoodLabel::Sad, 61.5),
            (MoodLabel::Neutral, 26.5),
        ]);
        assert_eq!(scores.dominant(), MoodLabel::Sad);
    }

    #[test]
    fn dominant_breaks_ties_by_fixed_order() {
        // Surprise inserted first, but Fear precedes it in the label order.
        let scores = EmotionScores::from_iter([
            (MoodLabel::Surprise, 50.0),
            (MoodLabel::Fear, 50.0),
        ]);
        assert_eq!(scores.dominant(), MoodLabel::Fear);
    }

    #[test]
    fn all_zero_scores_fall_back_to_first_label() {
        assert_eq!(EmotionScores::default().dominant(), MoodLabel::Angry);
    }

    #[test]
    fn ranked_orders_highest_first() {
        let scores = EmotionScores::from_iter([
            (MoodLabel::Happy, 70.0),
            (MoodLabel::Neutral, 20.0),
            (MoodLabel::Sad, 10.0),
        ]);
        let top: Vec<MoodLabel> = scores.ranked().into_iter().take(2).map(|(l, _)| l).collect();
        assert_eq!(top, vec![MoodLabel::Happy, MoodLabel::Neutral]);
    }
}
