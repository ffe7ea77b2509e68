//! Common import for general use.

pub use crate::{Engine, EngineBuilder, EngineConfig};

pub use crosscat_cc::{
    alg::ColAssignAlg,
    config::{InitMode, StateUpdateConfig},
    state::{State, StatePartition},
    transition::{StateTransition, ViewTransition},
    view::View,
};
pub use crosscat_stats::conjugate::{CatHypers, Hypers, NgHypers, VmHypers};
pub use crosscat_stats::rv;
pub use crosscat_stats::FType;
pub use crosscat_utils::Matrix;
