//! Running every party inside one process.
//!
//! Each party gets its own thread, its own [Mpc] context and in-process pipes
//! to the others. Used by the tests and benchmarks, and handy for trying a
//! protocol locally before deploying it over TCP.

use std::thread;

use rand::SeedableRng;

use crate::{
    config::ProtocolConfig,
    error::Result,
    mpc::Mpc,
    network::{Network, PipeRegistry},
    prg::CorrelatedRandomness,
    ring::{additive_shares, RMat, RingElement},
    util::{BlakeRNG, PRNGSeed},
};

/// Run `f` on `party_count` parties with default settings and fresh seeds.
/// Returns the results indexed by party id.
pub fn run_in_process<T, F>(party_count: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut Mpc) -> Result<T> + Sync,
{
    let config = ProtocolConfig { party_count, ..ProtocolConfig::default() };
    run_with_config(&config, &PRNGSeed::from_entropy(), f)
}

/// Run `f` on every party of `config`, deriving all correlated streams from
/// `master_seed`. A panic in any party is propagated.
pub fn run_with_config<T, F>(config: &ProtocolConfig, master_seed: &PRNGSeed, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&mut Mpc) -> Result<T> + Sync,
{
    config.validate()?;
    let n = config.party_count;
    let mut networks = {
        let registry = PipeRegistry::new();
        (0..n).map(|pid| Network::in_process(&registry, &config.for_party(pid), 0)).collect::<Vec<_>>()
    };
    // the registry is gone, so a party that exits disconnects its peers

    thread::scope(|scope| {
        let f = &f;
        let mut handles = Vec::with_capacity(n);
        for (pid, network) in networks.drain(..).enumerate() {
            let config = config.for_party(pid);
            let rand = CorrelatedRandomness::derive(pid, n, master_seed);
            let handle = thread::Builder::new()
                .name(format!("party-{}", pid))
                .spawn_scoped(scope, move || {
                    let mut mpc = Mpc::new(config, network, rand)?;
                    f(&mut mpc)
                })?;
            handles.push(handle);
        }
        handles.into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// Route `tracing` output of tests through the test harness. Filtered by
/// `RUST_LOG`.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// This party's additive share of `secret`, split among the workers with a
/// generator seeded by `seed`. The dealer's share is zero.
pub fn share_among_workers<T: RingElement>(pid: usize, party_count: usize, secret: &[T], seed: u64) -> Vec<T> {
    if pid == 0 {
        return vec![T::zero(); secret.len()];
    }
    let mut rng = BlakeRNG::seed_from_u64(seed);
    secret.iter()
        .map(|s| additive_shares(&mut rng, s, party_count - 1).swap_remove(pid - 1))
        .collect()
}

/// Sum the shares of every party.
pub fn open<T: RingElement>(shares: &[Vec<T>]) -> Vec<T> {
    let len = shares.first().map(|s| s.len()).unwrap_or(0);
    (0..len)
        .map(|i| shares.iter().fold(T::zero(), |acc, s| acc + s[i].clone()))
        .collect()
}

pub fn open_mat<T: RingElement>(shares: &[RMat<T>]) -> RMat<T> {
    let mut iter = shares.iter();
    let mut sum = match iter.next() {
        Some(first) => first.clone(),
        None => return RMat::zeros(0, 0),
    };
    for share in iter {
        sum.add_assign(share);
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::Z2k;

    type R = Z2k<32>;

    #[test]
    fn test_shares_sum_to_secret() {
        let secret = vec![R::new(5), R::new(123456), R::zero()];
        let shares: Vec<Vec<R>> = (0..4).map(|pid| share_among_workers(pid, 4, &secret, 42)).collect();
        assert!(shares[0].iter().all(|v| v.is_zero()));
        assert_ne!(shares[1], secret);
        assert_eq!(open(&shares), secret);
    }

    #[test]
    fn test_party_error_is_returned() {
        init_test_logging();
        let result: Result<Vec<()>> = run_in_process(3, |mpc| {
            if mpc.pid() == 2 {
                return Err(crate::error::MpcError::MissingKeys);
            }
            // waits for party 2, which has gone away
            mpc.network().receive_bytes(2, 1).map(|_| ())
        });
        assert!(result.is_err());
    }
}
