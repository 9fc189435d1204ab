//! Multiparty HE
//!
//! Every worker holds an additive share `s_i` of the collective secret key.
//! Collective operations exchange one polynomial per party and sum them at a
//! single aggregator.
//!
//! Mouchet et al., 2020. Multiparty Homomorphic Encryption from Ring-Learning-with-Errors
//! <https://eprint.iacr.org/2020/304>

mod participant;

pub use participant::{Participant, PolynomialAggregation};
