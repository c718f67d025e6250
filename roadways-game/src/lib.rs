//! Roadways Trip Engine
//!
//! Platform-agnostic core logic for a Haryana Roadways bus trip from the
//! Chandigarh depot to Faridabad. The crate owns the trip state machine and
//! its rules without any UI, clock, or platform-specific dependencies; hosts
//! drive it through [`TripMachine`] directly or, with the `async` feature,
//! through the tokio [`driver`].

pub(crate) mod constants;

pub mod config;
#[cfg(feature = "async")]
pub mod driver;
pub mod events;
pub mod machine;
pub mod messages;
pub mod numbers;
pub mod outcome;
pub mod rng;
pub mod route;
pub mod state;
pub mod steer;

use thiserror::Error;

// Re-export commonly used types
pub use config::{TripConfig, TripConfigError};
#[cfg(feature = "async")]
pub use driver::{DriverError, DriverHandle, Snapshot, TripDriver};
pub use events::{CatalogError, Choice, EventCatalog, NarrativeEvent};
pub use machine::{
    ActionOutcome, Command, IgnoreReason, PendingTrigger, TripMachine, time_driven_progress,
};
pub use messages::MessageLog;
pub use outcome::{Ending, LossCause, TripSummary, trip_summary};
pub use rng::RngStreams;
pub use route::{ROUTE, Waypoint};
pub use state::{TripPhase, TripState, format_elapsed};
pub use steer::{SteerDirection, SteerMode, SteerResult};

/// Name under which hosts store the trip configuration.
pub const TRIP_CONFIG_NAME: &str = "trip";

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the narrative event catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_event_catalog(&self) -> Result<EventCatalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Loader backed by the catalog compiled into the crate and a fixed config.
#[derive(Debug, Clone, Default)]
pub struct BuiltinLoader {
    config: TripConfig,
}

impl BuiltinLoader {
    #[must_use]
    pub const fn with_config(config: TripConfig) -> Self {
        Self { config }
    }
}

impl DataLoader for BuiltinLoader {
    type Error = CatalogError;

    fn load_event_catalog(&self) -> Result<EventCatalog, Self::Error> {
        Ok(EventCatalog::load_from_static())
    }

    fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = serde_json::to_value(&self.config)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Failures while assembling a machine from loaded data.
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("data loader failed: {0}")]
    Loader(#[source] E),
    #[error("invalid trip configuration: {0}")]
    Config(#[from] TripConfigError),
}

/// Builds trip machines from a host-provided [`DataLoader`].
pub struct TripEngine<L>
where
    L: DataLoader,
{
    data_loader: L,
}

impl<L> TripEngine<L>
where
    L: DataLoader,
{
    /// Create a new engine with the provided data loader
    pub const fn new(data_loader: L) -> Self {
        Self { data_loader }
    }

    /// Load and validate the trip configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the values are out of range.
    pub fn load_config(&self) -> Result<TripConfig, EngineError<L::Error>> {
        let cfg: TripConfig = self
            .data_loader
            .load_config(TRIP_CONFIG_NAME)
            .map_err(EngineError::Loader)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Start a fresh trip with the loaded configuration and catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or catalog cannot be loaded.
    pub fn create_machine(&self, seed: u64) -> Result<TripMachine, EngineError<L::Error>> {
        let cfg = self.load_config()?;
        self.create_machine_with(cfg, seed)
    }

    /// Start a fresh trip with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the catalog cannot be loaded.
    pub fn create_machine_with(
        &self,
        cfg: TripConfig,
        seed: u64,
    ) -> Result<TripMachine, EngineError<L::Error>> {
        cfg.validate()?;
        let catalog = self
            .data_loader
            .load_event_catalog()
            .map_err(EngineError::Loader)?;
        log::debug!(
            "engine | new trip seed {seed} steer {:?} with {} events",
            cfg.steer_mode,
            catalog.len()
        );
        Ok(TripMachine::new(cfg, catalog, seed))
    }

    /// Resume a trip from a saved state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or catalog cannot be loaded.
    pub fn resume(
        &self,
        seed: u64,
        state: TripState,
    ) -> Result<TripMachine, EngineError<L::Error>> {
        let cfg = self.load_config()?;
        let catalog = self
            .data_loader
            .load_event_catalog()
            .map_err(EngineError::Loader)?;
        Ok(TripMachine::from_state(cfg, catalog, seed, state))
    }
}
