//! Narrative event catalog.
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_EVENT_DATA: &str = include_str!("../assets/events.json");

/// Resource effects and time cost attached to a single option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub time_cost: u32,
    #[serde(default)]
    pub satisfaction_delta: f32,
    #[serde(default)]
    pub bus_condition_delta: f32,
    #[serde(default)]
    pub fuel_delta: f32,
}

/// Scripted interruption presenting the driver with discrete choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub options: Vec<Choice>,
}

impl NarrativeEvent {
    /// Option at `index`, if present.
    #[must_use]
    pub fn option(&self, index: usize) -> Option<&Choice> {
        self.options.get(index)
    }
}

/// Errors raised when loading an event catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("event catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("event catalog has no events")]
    Empty,
    #[error("event `{id}` offers no options")]
    NoOptions { id: String },
    #[error("event id `{id}` appears more than once")]
    DuplicateId { id: String },
}

/// Container for all narrative events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventCatalog {
    pub events: Vec<NarrativeEvent>,
}

impl EventCatalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self { events: Vec::new() }
    }

    /// Load and validate a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the catalog fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Create a catalog from pre-built events.
    #[must_use]
    pub fn from_events(events: Vec<NarrativeEvent>) -> Self {
        Self { events }
    }

    /// Built-in catalog shipped with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_EVENT_DATA).unwrap_or_default()
    }

    /// Check the catalog is non-empty, ids are unique, and every event offers a choice.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.events.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (idx, event) in self.events.iter().enumerate() {
            if event.options.is_empty() {
                return Err(CatalogError::NoOptions {
                    id: event.id.clone(),
                });
            }
            if self.events[..idx].iter().any(|other| other.id == event.id) {
                return Err(CatalogError::DuplicateId {
                    id: event.id.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look up an event by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NarrativeEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Pick one event uniformly at random.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&NarrativeEvent> {
        if self.events.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.events.len());
        self.events.get(idx)
    }
}
