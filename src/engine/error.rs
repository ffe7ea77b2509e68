use crosscat_cc::error::{BuildStateError, UpdateConfigError};
use thiserror::Error;

/// Errors that can arise when creating a new engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NewEngineError {
    /// Asked for zero states. The Engine must have at least one state.
    #[error("attempted to create an engine with zero states")]
    ZeroStatesRequested,
    /// The update settings cannot drive a valid sampler
    #[error("invalid update config: {0}")]
    UpdateConfig(#[from] UpdateConfigError),
    /// A state could not be built from the data
    #[error("failed to build state {state_id}: {source}")]
    BuildState {
        state_id: usize,
        #[source]
        source: BuildStateError,
    },
}
