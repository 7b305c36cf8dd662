//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ObservatoryConfig (validated, immutable)
//!     → Observatory::start
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Observatory::reconcile applies the candidate diff
//! ```
//!
//! # Design Decisions
//! - Tunables are fixed at start; only the candidate set is hot-reloaded
//! - Classifier and selector thresholds are required, never defaulted
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CandidateConfig, ClassifierConfig, DrainConfig, ObservabilityConfig,
    ObservatoryConfig, ProbeConfig, SelectorConfig, TargetConfig,
};
pub use validation::{validate_config, ValidationError};
