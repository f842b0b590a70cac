//! Recipes and the mood→recipe planner.

use std::collections::HashMap;
use std::time::Duration;

use classifier::MoodLabel;
use serde::Deserialize;
use thiserror::Error;

/// Number of pumps on the rig; ids run 1..=PUMP_COUNT.
pub const PUMP_COUNT: u8 = 8;

/// Stable identifier of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PumpId(u8);

impl PumpId {
    /// Accepts only ids present in the fixed registry.
    pub fn new(id: u8) -> Result<Self, RecipeError> {
        if (1..=PUMP_COUNT).contains(&id) {
            Ok(Self(id))
        } else {
            Err(RecipeError::UnknownPump(id))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every registered pump, in id order.
    pub fn all() -> impl Iterator<Item = PumpId> {
        (1..=PUMP_COUNT).map(PumpId)
    }
}

impl std::fmt::Display for PumpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One dispensing action: run `pump` for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub pump: PumpId,
    pub duration: Duration,
}

/// A named, ordered list of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Build a recipe from `(pump id, seconds)` pairs, validating that
    /// every pump is registered and every duration is positive.
    pub fn new(
        name: impl Into<String>,
        steps: impl IntoIterator<Item = (u8, f64)>,
    ) -> Result<Self, RecipeError> {
        let steps = steps
            .into_iter()
            .map(|(id, secs)| {
                let pump = PumpId::new(id)?;
                if secs <= 0.0 || !secs.is_finite() {
                    return Err(RecipeError::BadDuration { pump: id, secs });
                }
                Ok(Step {
                    pump,
                    duration: Duration::from_secs_f64(secs),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    /// Total client-side run time of this recipe.
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }
}

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("pump {0} is not in the registry (1..={PUMP_COUNT})")]
    UnknownPump(u8),
    #[error("pump {pump}: step duration {secs}s must be positive")]
    BadDuration { pump: u8, secs: f64 },
    #[error("unknown mood label {0:?} in recipe table")]
    UnknownLabel(String),
    #[error("recipe table parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The Dispense Planner: a static mood→recipe table with a designated
/// fallback. Lookup never fails — an unknown or unconfigured mood gets
/// the fallback recipe instead of an error.
#[derive(Debug, Clone)]
pub struct RecipeBook {
    recipes: HashMap<MoodLabel, Recipe>,
    fallback: Recipe,
}

#[derive(Deserialize)]
struct RecipeEntry {
    name: String,
    steps: Vec<(u8, f64)>,
}

impl RecipeBook {
    pub fn new(recipes: HashMap<MoodLabel, Recipe>, fallback: Recipe) -> Self {
        Self { recipes, fallback }
    }

    /// Look up the recipe for a mood. Total function by design.
    pub fn plan(&self, mood: MoodLabel) -> &Recipe {
        self.recipes.get(&mood).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &Recipe {
        &self.fallback
    }

    /// Load a table from JSON:
    ///
    /// ```json
    /// { "HAPPY": { "name": "Happy Mix", "steps": [[1, 2.0], [3, 1.0]] } }
    /// ```
    ///
    /// Unknown labels and non-positive durations are load errors, never
    /// runtime surprises. Moods missing from the file use the built-in
    /// fallback; a `NEUTRAL` entry replaces the fallback itself.
    pub fn from_json(json: &str) -> Result<Self, RecipeError> {
        let raw: HashMap<String, RecipeEntry> = serde_json::from_str(json)?;
        let mut recipes = HashMap::new();
        for (key, entry) in raw {
            let label = MoodLabel::parse(&key).ok_or(RecipeError::UnknownLabel(key))?;
            recipes.insert(label, Recipe::new(entry.name, entry.steps)?);
        }
        let fallback = recipes
            .get(&MoodLabel::Neutral)
            .cloned()
            .unwrap_or_else(default_fallback);
        Ok(Self { recipes, fallback })
    }
}

impl Default for RecipeBook {
    /// The built-in table: one "{Mood} Mix" per label, neutral as fallback.
    fn default() -> Self {
        let table = [
            (MoodLabel::Happy, vec![(1, 2.0), (3, 1.0), (5, 0.5)]),
            (MoodLabel::Sad, vec![(2, 2.0), (4, 1.5)]),
            (MoodLabel::Angry, vec![(6, 1.0), (1, 1.0), (7, 0.5)]),
            (MoodLabel::Fear, vec![(3, 1.5), (8, 1.0)]),
            (MoodLabel::Surprise, vec![(5, 1.0), (2, 1.0), (4, 0.5)]),
            (MoodLabel::Disgust, vec![(7, 1.5), (6, 1.0)]),
            (MoodLabel::Neutral, vec![(1, 1.0), (2, 1.0)]),
        ];
        let recipes: HashMap<MoodLabel, Recipe> = table
            .into_iter()
            .map(|(mood, steps)| {
                let name = format!("{} Mix", mood.title());
                // Static table with in-range ids; construction cannot fail.
                let recipe = Recipe::new(name, steps).unwrap_or_else(|_| default_fallback());
                (mood, recipe)
            })
            .collect();
        let fallback = recipes
            .get(&MoodLabel::Neutral)
            .cloned()
            .unwrap_or_else(default_fallback);
        Self { recipes, fallback }
    }
}

fn default_fallback() -> Recipe {
    Recipe {
        name: "Neutral Mix".into(),
        steps: vec![Step {
            pump: PumpId(1),
            duration: Duration::from_secs(1),
        }],
    }
}
