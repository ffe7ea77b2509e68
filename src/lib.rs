#![warn(
    clippy::all,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::unseparated_literal_suffix,
    clippy::unreadable_literal,
    clippy::option_option,
    clippy::implicit_clone
)]
//! A cross-categorization engine for heterogeneous tabular data.
//!
//! CrossCat partitions the columns of a table into views and, within each
//! view, partitions the rows into clusters. An [`Engine`] runs an ensemble of
//! independent Markov chains ([`State`](cc::state::State)s) over those
//! partitions in parallel.
//!
//! # Example
//!
//! ```rust
//! use crosscat::prelude::*;
//!
//! let data = Matrix::from_vecs(vec![
//!     vec![0.1, 1.0],
//!     vec![0.3, 0.0],
//!     vec![2.9, 1.0],
//!     vec![3.2, 2.0],
//! ]);
//! let ftypes = vec![FType::Continuous, FType::Multinomial { k: 3 }];
//!
//! let mut engine = EngineBuilder::new(data, ftypes)
//!     .with_nstates(2)
//!     .seed_from_u64(1337)
//!     .build()
//!     .unwrap();
//!
//! engine.update(10);
//!
//! let dep = engine.dependence_probability(0, 1);
//! assert!((0.0..=1.0).contains(&dep));
//! ```
pub mod config;
mod engine;
pub mod prelude;

pub use config::{ConfigError, EngineConfig};
pub use engine::{Builder as EngineBuilder, Engine, NewEngineError};

pub use crosscat_cc as cc;
pub use crosscat_consts as consts;
pub use crosscat_stats as stats;
pub use crosscat_utils as utils;
