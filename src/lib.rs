//! Trigon: a dealer-assisted multiparty computation core.
//!
//! Parties hold additive shares of fixed-point values in a ring chosen by
//! type ([ring::Z2k], [ring::Zq] or [ring::Angle]). Party `0` is a dealer that
//! only ever sees masks; the other parties are workers holding data.
//!
//! The crate provides:
//!
//! - the transport between parties, over TCP or in-process pipes, with
//!   message batching and traffic accounting ([network]);
//! - correlated randomness streams shared by each pair of parties ([prg]);
//! - Beaver partition, reconstruct and multiplication, sine and cosine, and
//!   the logistic sigmoid ([Mpc]);
//! - conversion between shares and ciphertexts of a multiparty RLWE scheme,
//!   whose collective key no party holds on its own ([Mpc::setup_mhe]).
//!
//! ```rust
//! use trigon::ring::{vec_from_f64, vec_to_f64, Z2k};
//! use trigon::simulation::{open, run_in_process, share_among_workers};
//!
//! let values: Vec<Z2k<62>> = vec_from_f64(&[0.5, -1.25, 3.0], 20);
//! let shares = run_in_process(3, move |mpc| {
//!     let x = share_among_workers(mpc.pid(), mpc.party_count(), &values, 1);
//!     mpc.ss_square_elem_vec(&x)
//! }).unwrap();
//! assert_eq!(vec_to_f64(&open(&shares), 40), vec![0.25, 1.5625, 9.0]);
//! ```

mod context;
mod encoder;
mod encryption_parameters;
mod encryptor;
mod evaluator;
mod key;
mod modulus;
mod serialize;
mod text;

pub mod config;
pub mod error;
pub mod mpc;
pub mod multiparty;
pub mod network;
pub mod prg;
pub mod ring;
pub mod simulation;
pub mod util;

pub use config::{HeConfig, ProtocolConfig};
pub use context::{ContextData, HeContext};
pub use encoder::FixedPointEncoder;
pub use encryption_parameters::{EncryptionParameters, ParmsID, PARMS_ID_ZERO};
pub use encryptor::{Decryptor, Encryptor};
pub use error::{MpcError, Result};
pub use evaluator::Evaluator;
pub use key::{KeyGenerator, PublicKey, SecretKey};
pub use modulus::{CoeffModulus, Modulus};
pub use mpc::Mpc;
pub use network::Network;
pub use ring::{RingElement, Z2k};
pub use serialize::{PolynomialSerializer, SerializableWithHeContext};
pub use text::{CipherMatrix, CipherVector, Ciphertext, PlainMatrix, PlainVector, Plaintext};
