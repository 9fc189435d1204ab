//! Provide various utility functions and structs.
//!
//! The utility objects in this submodule are not documented.
//! Use at your own risk.
#![allow(missing_docs)]

pub(crate) mod hash;
mod number_theory;
mod ntt;
pub mod polymod;
pub mod rlwe;
mod random_generator;

// gather utilities in this module
pub use ntt::*;
pub use number_theory::*;
pub use random_generator::{BlakeRNGFactory, BlakeRNG, PRNGSeed, PRNG_SEED_BYTES};
