//! Correlated randomness shared between pairs of parties.
//!
//! Every pair of parties holds a common seed, so both sides can draw the same
//! masks without talking. A party reads from one stream at a time: its private
//! stream by default, a pair stream after [CorrelatedRandomness::switch_to],
//! or the stream common to all parties after
//! [CorrelatedRandomness::switch_to_common].

use rand::{RngCore, SeedableRng};

use crate::util::{BlakeRNG, PRNGSeed};

const PAIR_CONTEXT: &str = "trigon 2024 pair stream";
const COMMON_CONTEXT: &str = "trigon 2024 common stream";
const PRIVATE_CONTEXT: &str = "trigon 2024 private stream";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Party(usize),
    Common,
}

/// The per-party set of seeded streams.
///
/// Slot `j != pid` is the stream shared with party `j`; slot `pid` is private.
/// Implements [RngCore] by reading the active stream.
pub struct CorrelatedRandomness {
    pid: usize,
    streams: Vec<BlakeRNG>,
    common: BlakeRNG,
    active: Slot,
    saved: Option<Slot>,
}

impl CorrelatedRandomness {

    /// `pair_seeds[j]` is the seed shared with party `j`; entry `pid` is ignored
    /// in favour of `private_seed`.
    pub fn from_seeds(pid: usize, pair_seeds: &[PRNGSeed], common_seed: PRNGSeed, private_seed: PRNGSeed) -> Self {
        assert!(pid < pair_seeds.len(), "[Invalid argument] Party id out of range.");
        let streams = pair_seeds.iter().enumerate()
            .map(|(j, seed)| BlakeRNG::from_seed(if j == pid { private_seed } else { *seed }))
            .collect();
        Self {
            pid,
            streams,
            common: BlakeRNG::from_seed(common_seed),
            active: Slot::Party(pid),
            saved: None,
        }
    }

    /// Derive every stream from one master seed known to all parties. Meant for
    /// local simulation and tests.
    pub fn derive(pid: usize, party_count: usize, master: &PRNGSeed) -> Self {
        let pair_seeds: Vec<PRNGSeed> = (0..party_count)
            .map(|j| {
                let (lo, hi) = (pid.min(j) as u64, pid.max(j) as u64);
                let mut label = [0u8; 16];
                label[..8].copy_from_slice(&lo.to_le_bytes());
                label[8..].copy_from_slice(&hi.to_le_bytes());
                master.derive(PAIR_CONTEXT, &label)
            })
            .collect();
        let common = master.derive(COMMON_CONTEXT, &[]);
        let private = master.derive(PRIVATE_CONTEXT, &(pid as u64).to_le_bytes());
        Self::from_seeds(pid, &pair_seeds, common, private)
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn party_count(&self) -> usize {
        self.streams.len()
    }

    /// Read from the stream shared with `peer` until [CorrelatedRandomness::restore].
    pub fn switch_to(&mut self, peer: usize) {
        assert!(peer < self.streams.len(), "[Invalid argument] No stream for party {}.", peer);
        self.switch(Slot::Party(peer));
    }

    /// Read from the stream shared by all parties until [CorrelatedRandomness::restore].
    pub fn switch_to_common(&mut self) {
        self.switch(Slot::Common);
    }

    fn switch(&mut self, slot: Slot) {
        if let Some(saved) = self.saved {
            panic!("[Logic error] Stream switch to {:?} while already switched away from {:?}.", slot, saved);
        }
        self.saved = Some(self.active);
        self.active = slot;
    }

    /// Return to the stream active before the last switch.
    pub fn restore(&mut self) {
        match self.saved.take() {
            Some(slot) => self.active = slot,
            None => panic!("[Logic error] Restore without a matching stream switch."),
        }
    }

    /// Run `f` with the stream shared with `peer` active.
    pub fn with_peer<F, T>(&mut self, peer: usize, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.switch_to(peer);
        let result = f(self);
        self.restore();
        result
    }

    /// Run `f` with the common stream active.
    pub fn with_common<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.switch_to_common();
        let result = f(self);
        self.restore();
        result
    }

    fn active_stream(&mut self) -> &mut BlakeRNG {
        match self.active {
            Slot::Party(j) => &mut self.streams[j],
            Slot::Common => &mut self.common,
        }
    }

}

impl RngCore for CorrelatedRandomness {

    fn next_u32(&mut self) -> u32 {
        self.active_stream().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.active_stream().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.active_stream().fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.active_stream().try_fill_bytes(dest)
    }

}
