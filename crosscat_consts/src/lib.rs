#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
//! Default values for grids and inference-type things
pub use rv;

/// The default number of points in each hyperparameter grid
pub const DEFAULT_N_GRID: usize = 31;

/// The default probability with which the Metropolis-Hastings column kernel
/// proposes moving a column to a brand new view
pub const MH_SINGLETON_PROB: f64 = 0.5;

/// The default number of states in an Engine
pub const DEFAULT_N_STATES: usize = 8;

/// The default number of sweeps per `update` call
pub const DEFAULT_N_ITERS: usize = 1;

/// The scale of the smallest continuous `s` grid value relative to the
/// column's sum of squared deviations
pub const S_GRID_LOWER_RATIO: f64 = 0.01;
