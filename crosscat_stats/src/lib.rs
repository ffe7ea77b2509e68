#![warn(unused_extern_crates)]
#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
//! Stateless math for cross-categorization: CRP probabilities, categorical
//! sampling, hyperparameter grids and the conjugate component formulas.
pub mod conjugate;
pub mod crp;
mod ftype;
pub mod grid;
mod sample;
mod special;

pub use crosscat_consts::rv;
pub use ftype::{FType, FTypeError};
pub use sample::{draw_sample_unnormalized, draw_sample_with_partition, ln_pflip};
pub use crate::special::{ln_gamma, ln_i0};
