//! The per-party protocol context.
//!
//! [Mpc] owns everything one party needs to take part in a protocol step: its
//! configuration, the channels to the other parties, the correlated
//! randomness streams, a bounded worker pool for local parallel work and,
//! once [Mpc::setup_mhe] ran, the multiparty HE state. Every protocol is a
//! method on it, implemented across the submodules:
//!
//! - [reveal]: opening a value held in additive shares among the workers;
//! - [beaver]: partition, reconstruct and multiplication;
//! - [nonlinear]: sine, cosine and the logistic sigmoid;
//! - [bridge]: moving shares to ciphertexts and back.
//!
//! Party `0` is the dealer. It only ever holds masks, never live data, and
//! takes part in every protocol so that the workers stay in lock step with it.

pub mod beaver;
pub mod bridge;
pub mod nonlinear;
pub mod reveal;

use tracing::debug;

use crate::{
    config::{ProtocolConfig, DEALER_PID},
    error::{MpcError, Result},
    network::Network,
    prg::CorrelatedRandomness,
};

pub use bridge::{mask_bound, sample_centered, MheState};

pub struct Mpc {
    config: ProtocolConfig,
    network: Network,
    rand: CorrelatedRandomness,
    pool: rayon::ThreadPool,
    mhe: Option<MheState>,
}

impl Mpc {

    pub fn new(config: ProtocolConfig, network: Network, rand: CorrelatedRandomness) -> Result<Self> {
        config.validate()?;
        if network.pid() != config.party_id || rand.pid() != config.party_id {
            return Err(MpcError::Config(format!(
                "party {} got the network of party {} and the streams of party {}",
                config.party_id, network.pid(), rand.pid())));
        }
        if network.party_count() != config.party_count || rand.party_count() != config.party_count {
            return Err(MpcError::Config("network, streams and configuration disagree on the party count".into()));
        }
        let pid = config.party_id;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.max(1))
            .thread_name(move |i| format!("mpc-{}-{}", pid, i))
            .build()
            .map_err(|e| MpcError::Config(e.to_string()))?;
        debug!("party {} ready with {} worker threads", pid, config.worker_threads);
        Ok(Self { config, network, rand, pool, mhe: None })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn pid(&self) -> usize {
        self.config.party_id
    }

    pub fn party_count(&self) -> usize {
        self.config.party_count
    }

    pub fn is_dealer(&self) -> bool {
        self.config.party_id == DEALER_PID
    }

    pub fn hub_pid(&self) -> usize {
        self.config.hub_party_id
    }

    pub fn frac_bits(&self) -> u32 {
        self.config.frac_bits
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn rand_mut(&mut self) -> &mut CorrelatedRandomness {
        &mut self.rand
    }

    /// Ids of every party but the dealer.
    pub fn worker_ids(&self) -> std::ops::Range<usize> {
        1..self.config.party_count
    }

    /// The worker that receives residuals from the dealer.
    pub fn last_pid(&self) -> usize {
        self.config.party_count - 1
    }

    /// Flush every buffered integer and ciphertext.
    pub fn flush(&self) -> Result<()> {
        self.network.flush_all_ints()?;
        self.network.flush_all_ciphertexts()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PipeRegistry;
    use crate::util::PRNGSeed;

    #[test]
    fn test_new_checks_party_ids() {
        let registry = PipeRegistry::new();
        let config = ProtocolConfig::default().for_party(1);
        let network = Network::in_process(&registry, &config, 0);
        let rand = CorrelatedRandomness::derive(2, 3, &PRNGSeed([0; 64]));
        assert!(matches!(Mpc::new(config.clone(), network, rand), Err(MpcError::Config(_))));

        let network = Network::in_process(&registry, &config, 0);
        let rand = CorrelatedRandomness::derive(1, 3, &PRNGSeed([0; 64]));
        let mpc = Mpc::new(config, network, rand).unwrap();
        assert_eq!(mpc.worker_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(mpc.last_pid(), 2);
        assert!(!mpc.is_dealer());
    }
}
