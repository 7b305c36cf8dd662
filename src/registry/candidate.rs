//! A registered outbound candidate.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::TargetConfig;
use crate::probe::ProbeTarget;

/// One outbound under observation.
///
/// `generation` is unique per registration, so results from a task that
/// belonged to an earlier registration of the same tag can be told apart.
#[derive(Clone)]
pub struct Candidate {
    pub tag: String,
    pub generation: u64,
    pub target: Arc<dyn ProbeTarget>,
    /// Set when the candidate came from the config file.
    pub source: Option<TargetConfig>,
    pub registered_at: SystemTime,
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("tag", &self.tag)
            .field("generation", &self.generation)
            .field("target", &self.target.describe())
            .finish()
    }
}
