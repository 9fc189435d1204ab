//! Party and encryption configuration.
//!
//! Both structures derive serde so that an application can load them from
//! whatever file format it uses. Nothing in this crate reads files.

use serde::{Deserialize, Serialize};

use crate::error::{MpcError, Result};

/// Pid of the trusted dealer.
pub const DEALER_PID: usize = 0;

/// Default hub: the first worker.
pub const DEFAULT_HUB_PID: usize = 1;

/// Ciphertexts buffered per peer before a batch is flushed.
pub const DEFAULT_CIPHERTEXT_BATCH_SIZE: usize = 128;

/// Integers buffered per peer before a batch is flushed.
pub const DEFAULT_INT_BATCH_SIZE: usize = 512;

/// Largest input magnitude the sigmoid is expected to see.
pub const SIGMOID_INPUT_RANGE: f64 = 10.0;

/// Static configuration of one party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// This party's id. `0` is the dealer.
    pub party_id: usize,
    /// Total number of parties including the dealer.
    pub party_count: usize,
    /// Party that aggregates ciphertexts and polynomial shares.
    pub hub_party_id: usize,
    /// Fractional bits of the fixed-point encoding.
    pub frac_bits: u32,
    /// Size of the per-party worker pool.
    pub worker_threads: usize,
    pub ciphertext_batch_size: usize,
    pub int_batch_size: usize,
    /// Whether traffic counters are updated.
    pub network_logging: bool,
    /// Half-width of each worker's mask interval used before sigmoid
    /// evaluation.
    pub nonlinear_mask_bound: f64,
    /// Fractional bits of the sigmoid factors. The numerator and denominator
    /// carry twice as many, so the output ring needs `2 * sigmoid_frac_bits`
    /// bits plus sign headroom.
    pub sigmoid_frac_bits: u32,
    /// Standard deviation of the noise added to decryption shares.
    pub share_noise_sigma: f64,
    pub dial_retries: usize,
    pub dial_interval_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            party_id: 0,
            party_count: 3,
            hub_party_id: DEFAULT_HUB_PID,
            frac_bits: 20,
            worker_threads: 4,
            ciphertext_batch_size: DEFAULT_CIPHERTEXT_BATCH_SIZE,
            int_batch_size: DEFAULT_INT_BATCH_SIZE,
            network_logging: true,
            nonlinear_mask_bound: 1.5,
            sigmoid_frac_bits: 29,
            share_noise_sigma: crate::util::rlwe::sample::NOISE_STANDARD_DEVIATION,
            dial_retries: 5,
            dial_interval_ms: 5000,
        }
    }
}

impl ProtocolConfig {
    /// Same configuration, seen from another party.
    pub fn for_party(&self, party_id: usize) -> Self {
        Self { party_id, ..self.clone() }
    }

    pub fn is_dealer(&self) -> bool {
        self.party_id == DEALER_PID
    }

    pub fn is_hub(&self) -> bool {
        self.party_id == self.hub_party_id
    }

    /// Number of parties excluding the dealer.
    pub fn worker_count(&self) -> usize {
        self.party_count - 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.party_count < 3 {
            return Err(MpcError::Config(format!(
                "need a dealer and at least two workers, got {} parties", self.party_count)));
        }
        if self.party_id >= self.party_count {
            return Err(MpcError::Config(format!(
                "party id {} out of range for {} parties", self.party_id, self.party_count)));
        }
        if self.hub_party_id == DEALER_PID || self.hub_party_id >= self.party_count {
            return Err(MpcError::Config(format!("hub must be a worker, got {}", self.hub_party_id)));
        }
        if self.worker_threads == 0 {
            return Err(MpcError::Config("worker pool must have at least one thread".into()));
        }
        if self.ciphertext_batch_size == 0 || self.int_batch_size == 0 {
            return Err(MpcError::Config("batch sizes must be positive".into()));
        }
        if !(self.nonlinear_mask_bound > 0.0) || !(self.share_noise_sigma >= 0.0) {
            return Err(MpcError::Config("mask bound must be positive and share noise non-negative".into()));
        }
        if self.sigmoid_frac_bits == 0 || self.sigmoid_frac_bits > 63 {
            return Err(MpcError::Config(format!("sigmoid precision of {} bits", self.sigmoid_frac_bits)));
        }
        // σ at the farthest remainder a worker may see must not round to zero
        let reach = SIGMOID_INPUT_RANGE + self.worker_count() as f64 * self.nonlinear_mask_bound;
        let smallest = 1.0 / (1.0 + reach.exp()) * 2f64.powi(self.sigmoid_frac_bits as i32);
        if smallest < 1.0 {
            return Err(MpcError::Config(format!(
                "sigmoid factors down to σ(-{}) are not representable at {} bits; \
                 lower nonlinear_mask_bound or raise sigmoid_frac_bits",
                reach, self.sigmoid_frac_bits)));
        }
        Ok(())
    }
}

/// Encryption parameters of the multiparty HE scheme.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeConfig {
    pub poly_modulus_degree: usize,
    /// Bit sizes of the coefficient modulus chain, lowest level first.
    pub coeff_modulus_bits: Vec<usize>,
    /// log2 of the encoding scale.
    pub scale_bits: u32,
}

impl Default for HeConfig {
    fn default() -> Self {
        Self {
            poly_modulus_degree: 4096,
            coeff_modulus_bits: vec![55, 55, 55, 55],
            scale_bits: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        for pid in 0..3 {
            let party = config.for_party(pid);
            assert!(party.validate().is_ok());
            assert_eq!(party.is_dealer(), pid == 0);
            assert_eq!(party.is_hub(), pid == 1);
        }
    }

    #[test]
    fn test_reject_bad_config() {
        let mut config = ProtocolConfig::default();
        config.hub_party_id = 0;
        assert!(matches!(config.validate(), Err(MpcError::Config(_))));
        let config = ProtocolConfig { party_count: 2, ..Default::default() };
        assert!(config.validate().is_err());
        let config = ProtocolConfig { party_id: 3, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_unrepresentable_sigmoid() {
        // masks of ±8 per worker push the remainder to -26, σ(-26) < 2^-29
        let config = ProtocolConfig { nonlinear_mask_bound: 8.0, ..Default::default() };
        assert!(matches!(config.validate(), Err(MpcError::Config(_))));
        let config = ProtocolConfig { nonlinear_mask_bound: 8.0, sigmoid_frac_bits: 60, ..Default::default() };
        assert!(config.validate().is_ok());
        // the default bound still fits with a few more workers
        let config = ProtocolConfig { party_count: 7, ..Default::default() };
        assert!(config.validate().is_ok());
        let config = ProtocolConfig { party_count: 9, ..Default::default() };
        assert!(config.validate().is_err());
        let config = ProtocolConfig { sigmoid_frac_bits: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
