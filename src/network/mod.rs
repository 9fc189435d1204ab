//! Point-to-point transport between the parties.
//!
//! A [Network] holds one [PeerChannel] per other party, either an in-process
//! pipe from a [PipeRegistry] or a TCP connection served by a small tokio
//! runtime owned by the network. On top of the raw byte
//! channel it provides the framing used by the protocols:
//!
//! - fixed-size payloads (ring elements, vectors of known length) go without
//!   a header;
//! - ring matrices and polynomials carry a `u32` little-endian byte count;
//! - cipher matrices carry a `u64` byte count;
//! - integers are buffered per peer and flushed as a run of 8-byte words once
//!   `int_batch_size` of them are queued;
//! - ciphertexts are buffered per peer and flushed once
//!   `ciphertext_batch_size` of them are queued, framed as a `u32` count and a
//!   `u32` length before each ciphertext.
//!
//! Every failure is reported as an [MpcError]; the protocols cannot recover
//! from a failed exchange.

mod channel;
mod traffic;

use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    runtime::Runtime,
};
use tracing::{debug, info, warn};

pub use channel::{PeerChannel, PipeRegistry};
pub use traffic::PeerTraffic;

use crate::{
    config::ProtocolConfig,
    error::{MpcError, Result},
    ring::{RMat, RingElement},
    CipherMatrix, Ciphertext, HeContext, ParmsID, PolynomialSerializer, SerializableWithHeContext,
};

/// How long a closing network waits for queued writes to reach a peer.
const LINGER: Duration = Duration::from_secs(10);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

struct Peer {
    channel: Mutex<PeerChannel>,
    traffic: Mutex<PeerTraffic>,
    int_buffer: Mutex<Vec<u64>>,
    ct_buffer: Mutex<Vec<Vec<u8>>>,
}

impl Peer {
    fn new(channel: PeerChannel) -> Self {
        Self {
            channel: Mutex::new(channel),
            traffic: Mutex::new(PeerTraffic::default()),
            int_buffer: Mutex::new(Vec::new()),
            ct_buffer: Mutex::new(Vec::new()),
        }
    }
}

/// Channels from one party to all others.
pub struct Network {
    pid: usize,
    peers: Vec<Option<Peer>>,
    int_batch_size: usize,
    ciphertext_batch_size: usize,
    logging: AtomicBool,
    runtime: Option<Runtime>,
}

impl Network {

    fn from_channels(config: &ProtocolConfig, channels: Vec<Option<PeerChannel>>) -> Self {
        Self {
            pid: config.party_id,
            peers: channels.into_iter().map(|c| c.map(Peer::new)).collect(),
            int_batch_size: config.int_batch_size.max(1),
            ciphertext_batch_size: config.ciphertext_batch_size.max(1),
            logging: AtomicBool::new(config.network_logging),
            runtime: None,
        }
    }

    /// Connect to every other party through in-process pipes of `shard`.
    pub fn in_process(registry: &PipeRegistry, config: &ProtocolConfig, shard: usize) -> Self {
        let pid = config.party_id;
        let channels = (0..config.party_count)
            .map(|j| (j != pid).then(|| registry.endpoint(pid, j, shard)))
            .collect();
        Self::from_channels(config, channels)
    }

    /// One network per local worker shard.
    pub fn in_process_shards(registry: &PipeRegistry, config: &ProtocolConfig, shards: usize) -> Vec<Self> {
        (0..shards).map(|shard| Self::in_process(registry, config, shard)).collect()
    }

    /// Connect over TCP. Dials every lower party id at `peer_addrs[j]`,
    /// announcing its own id, and accepts every higher one on `listener`.
    pub fn over_tcp(config: &ProtocolConfig, listener: TcpListener, peer_addrs: &[String]) -> Result<Self> {
        config.validate()?;
        let pid = config.party_id;
        let n = config.party_count;
        if peer_addrs.len() != n {
            return Err(MpcError::Config(format!("{} addresses for {} parties", peer_addrs.len(), n)));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name(format!("net-{}", pid))
            .enable_all()
            .build()?;
        let streams = runtime.block_on(Self::connect_all(config, listener, peer_addrs))?;

        let mut channels = Vec::with_capacity(n);
        for (peer, stream) in streams.into_iter().enumerate() {
            channels.push(match stream {
                Some(stream) => Some(PeerChannel::over_tcp(peer, stream, runtime.handle())?),
                None => None,
            });
        }
        let mut network = Self::from_channels(config, channels);
        network.runtime = Some(runtime);
        Ok(network)
    }

    async fn connect_all(config: &ProtocolConfig, listener: TcpListener, peer_addrs: &[String]) -> Result<Vec<Option<TcpStream>>> {
        let pid = config.party_id;
        let n = config.party_count;
        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let mut streams: Vec<Option<TcpStream>> = (0..n).map(|_| None).collect();

        for (peer, addr) in peer_addrs.iter().enumerate().take(pid) {
            let mut stream = Self::dial(config, peer, addr).await?;
            stream.write_all(&(pid as u64).to_le_bytes()).await.map_err(|e| MpcError::transport(peer, e))?;
            debug!("party {} connected to party {} at {}", pid, peer, addr);
            streams[peer] = Some(stream);
        }

        for _ in pid + 1..n {
            let (mut stream, remote) = listener.accept().await?;
            let mut hello = [0u8; 8];
            stream.read_exact(&mut hello).await?;
            let peer = u64::from_le_bytes(hello) as usize;
            if peer <= pid || peer >= n || streams[peer].is_some() {
                return Err(MpcError::codec("hello", format!("unexpected party id {} from {}", peer, remote)));
            }
            debug!("party {} accepted party {} from {}", pid, peer, remote);
            streams[peer] = Some(stream);
        }
        Ok(streams)
    }

    async fn dial(config: &ProtocolConfig, peer: usize, addr: &str) -> Result<TcpStream> {
        let attempts = config.dial_retries.max(1);
        for attempt in 1..=attempts {
            match TcpStream::connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    warn!("dialing party {} at {} failed (attempt {}/{}): {}", peer, addr, attempt, attempts, e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(config.dial_interval_ms)).await;
                    }
                }
            }
        }
        Err(MpcError::Connect { peer, addr: addr.to_string(), attempts })
    }

    pub fn pid(&self) -> usize {
        self.pid
    }

    pub fn party_count(&self) -> usize {
        self.peers.len()
    }

    fn peer(&self, id: usize) -> &Peer {
        match self.peers.get(id) {
            Some(Some(peer)) => peer,
            _ => panic!("[Invalid argument] Party {} has no channel to party {}.", self.pid, id),
        }
    }

    fn logging(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    // ---- raw bytes ----

    /// Write one message.
    pub fn send_bytes(&self, to: usize, bytes: Vec<u8>) -> Result<()> {
        let peer = self.peer(to);
        if self.logging() {
            lock(&peer.traffic).record_send(bytes.len());
        }
        lock(&peer.channel).write_all(bytes)
    }

    fn read_raw(&self, from: usize, len: usize) -> Result<Vec<u8>> {
        lock(&self.peer(from).channel).read_exact(len)
    }

    fn record_receive(&self, from: usize, len: usize) {
        if self.logging() {
            lock(&self.peer(from).traffic).record_receive(len);
        }
    }

    /// Read exactly `len` bytes.
    pub fn receive_bytes(&self, from: usize, len: usize) -> Result<Vec<u8>> {
        let bytes = self.read_raw(from, len)?;
        self.record_receive(from, len);
        Ok(bytes)
    }

    /// Write a `u32` byte count followed by the payload.
    pub fn send_framed(&self, to: usize, payload: &[u8]) -> Result<()> {
        let len = u32::try_from(payload.len())
            .map_err(|_| MpcError::codec("frame", format!("{} bytes exceed a u32 length", payload.len())))?;
        let mut bytes = Vec::with_capacity(4 + payload.len());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(payload);
        self.send_bytes(to, bytes)
    }

    pub fn receive_framed(&self, from: usize) -> Result<Vec<u8>> {
        let len = u32_from(&self.read_raw(from, 4)?) as usize;
        let payload = self.read_raw(from, len)?;
        self.record_receive(from, 4 + len);
        Ok(payload)
    }

    // ---- ring values ----

    pub fn send_relem<T: RingElement>(&self, to: usize, value: &T) -> Result<()> {
        let mut bytes = vec![0u8; T::byte_len()];
        value.write_bytes(&mut bytes);
        self.send_bytes(to, bytes)
    }

    pub fn receive_relem<T: RingElement>(&self, from: usize) -> Result<T> {
        Ok(T::read_bytes(&self.receive_bytes(from, T::byte_len())?))
    }

    /// A vector whose length the receiver already knows.
    pub fn send_relem_vec<T: RingElement>(&self, to: usize, values: &[T]) -> Result<()> {
        let width = T::byte_len();
        let mut bytes = vec![0u8; width * values.len()];
        for (chunk, value) in bytes.chunks_exact_mut(width).zip(values) {
            value.write_bytes(chunk);
        }
        self.send_bytes(to, bytes)
    }

    pub fn receive_relem_vec<T: RingElement>(&self, from: usize, len: usize) -> Result<Vec<T>> {
        let width = T::byte_len();
        let bytes = self.receive_bytes(from, width * len)?;
        Ok(bytes.chunks_exact(width).map(T::read_bytes).collect())
    }

    pub fn send_rmat<T: RingElement>(&self, to: usize, matrix: &RMat<T>) -> Result<()> {
        self.send_framed(to, &matrix.to_bytes())
    }

    pub fn receive_rmat<T: RingElement>(&self, from: usize, rows: usize, cols: usize) -> Result<RMat<T>> {
        RMat::from_bytes(rows, cols, &self.receive_framed(from)?)
    }

    // ---- polynomials ----

    pub fn send_poly(&self, to: usize, context: &HeContext, data: &[u64], parms_id: ParmsID) -> Result<()> {
        let mut payload = Vec::new();
        PolynomialSerializer::serialize_polynomial(context, &mut payload, data, parms_id)
            .map_err(|e| MpcError::codec("polynomial", e.to_string()))?;
        self.send_framed(to, &payload)
    }

    /// The framed polynomial payload, ready for
    /// [crate::multiparty::PolynomialAggregation::receive].
    pub fn receive_poly_bytes(&self, from: usize) -> Result<Vec<u8>> {
        self.receive_framed(from)
    }

    pub fn receive_poly(&self, from: usize, context: &HeContext) -> Result<(Vec<u64>, usize)> {
        let payload = self.receive_framed(from)?;
        PolynomialSerializer::deserialize_polynomial(context, &mut payload.as_slice())
            .map_err(|e| MpcError::codec("polynomial", e.to_string()))
    }

    // ---- buffered integers ----

    /// Queue one integer; a full buffer is flushed immediately.
    pub fn send_int(&self, to: usize, value: u64) -> Result<()> {
        let full = {
            let mut buffer = lock(&self.peer(to).int_buffer);
            buffer.push(value);
            buffer.len() >= self.int_batch_size
        };
        if full {
            self.flush_ints(to)?;
        }
        Ok(())
    }

    pub fn flush_ints(&self, to: usize) -> Result<()> {
        let words = std::mem::take(&mut *lock(&self.peer(to).int_buffer));
        if words.is_empty() {
            return Ok(());
        }
        debug!("flushing {} integers to party {}", words.len(), to);
        let bytes = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.send_bytes(to, bytes)
    }

    pub fn flush_all_ints(&self) -> Result<()> {
        for to in self.peer_ids() {
            self.flush_ints(to)?;
        }
        Ok(())
    }

    pub fn receive_int_vec(&self, from: usize, count: usize) -> Result<Vec<u64>> {
        let bytes = self.receive_bytes(from, 8 * count)?;
        Ok(bytes.chunks_exact(8).map(u64_from).collect())
    }

    // ---- buffered ciphertexts ----

    /// Queue one ciphertext; a full buffer is flushed immediately.
    pub fn send_ciphertext(&self, to: usize, cipher: &Ciphertext, context: &HeContext) -> Result<()> {
        let mut bytes = Vec::with_capacity(cipher.serialized_size(context));
        cipher.serialize(context, &mut bytes)
            .map_err(|e| MpcError::codec("ciphertext", e.to_string()))?;
        let full = {
            let mut buffer = lock(&self.peer(to).ct_buffer);
            buffer.push(bytes);
            buffer.len() >= self.ciphertext_batch_size
        };
        if full {
            self.flush_ciphertexts(to)?;
        }
        Ok(())
    }

    pub fn flush_ciphertexts(&self, to: usize) -> Result<()> {
        let batch = std::mem::take(&mut *lock(&self.peer(to).ct_buffer));
        if batch.is_empty() {
            return Ok(());
        }
        debug!("flushing {} ciphertexts to party {}", batch.len(), to);
        let total: usize = batch.iter().map(|c| 4 + c.len()).sum();
        let mut bytes = Vec::with_capacity(4 + total);
        bytes.extend_from_slice(&(batch.len() as u32).to_le_bytes());
        for cipher in &batch {
            bytes.extend_from_slice(&(cipher.len() as u32).to_le_bytes());
            bytes.extend_from_slice(cipher);
        }
        self.send_bytes(to, bytes)
    }

    pub fn flush_all_ciphertexts(&self) -> Result<()> {
        for to in self.peer_ids() {
            self.flush_ciphertexts(to)?;
        }
        Ok(())
    }

    /// Read one flushed batch.
    pub fn receive_ciphertext_batch(&self, from: usize, context: &HeContext) -> Result<Vec<Ciphertext>> {
        let count = u32_from(&self.read_raw(from, 4)?) as usize;
        let mut received = 4;
        let mut batch = Vec::with_capacity(count);
        for _ in 0..count {
            let len = u32_from(&self.read_raw(from, 4)?) as usize;
            let bytes = self.read_raw(from, len)?;
            received += 4 + len;
            batch.push(Ciphertext::deserialize(context, &mut bytes.as_slice())
                .map_err(|e| MpcError::codec("ciphertext", e.to_string()))?);
        }
        self.record_receive(from, received);
        Ok(batch)
    }

    /// Read batches until `count` ciphertexts arrived.
    pub fn receive_ciphertexts(&self, from: usize, count: usize, context: &HeContext) -> Result<Vec<Ciphertext>> {
        let mut ciphers = Vec::with_capacity(count);
        while ciphers.len() < count {
            let batch = self.receive_ciphertext_batch(from, context)?;
            if batch.is_empty() {
                return Err(MpcError::codec("ciphertext batch", "empty batch"));
            }
            ciphers.extend(batch);
        }
        if ciphers.len() > count {
            return Err(MpcError::codec("ciphertext batch",
                format!("expected {} ciphertexts, got {}", count, ciphers.len())));
        }
        Ok(ciphers)
    }

    // ---- cipher matrices ----

    pub fn send_cipher_matrix(&self, to: usize, matrix: &CipherMatrix, context: &HeContext) -> Result<()> {
        let mut body = Vec::new();
        body.extend_from_slice(&(matrix.len() as u64).to_le_bytes());
        for row in matrix {
            body.extend_from_slice(&(row.len() as u64).to_le_bytes());
            for cipher in row {
                body.extend_from_slice(&(cipher.serialized_size(context) as u64).to_le_bytes());
                cipher.serialize(context, &mut body)
                    .map_err(|e| MpcError::codec("ciphertext", e.to_string()))?;
            }
        }
        let mut bytes = Vec::with_capacity(8 + body.len());
        bytes.extend_from_slice(&(body.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&body);
        self.send_bytes(to, bytes)
    }

    pub fn receive_cipher_matrix(&self, from: usize, context: &HeContext) -> Result<CipherMatrix> {
        let len = u64_from(&self.read_raw(from, 8)?) as usize;
        let body = self.read_raw(from, len)?;
        self.record_receive(from, 8 + len);
        let mut reader = body.as_slice();
        let rows = read_u64(&mut reader)? as usize;
        let mut matrix = Vec::with_capacity(rows);
        for _ in 0..rows {
            let cols = read_u64(&mut reader)? as usize;
            let mut row = Vec::with_capacity(cols);
            for _ in 0..cols {
                let size = read_u64(&mut reader)? as usize;
                if size > reader.len() {
                    return Err(MpcError::codec("cipher matrix", "truncated ciphertext"));
                }
                let (head, tail) = reader.split_at(size);
                row.push(Ciphertext::deserialize(context, &mut &head[..])
                    .map_err(|e| MpcError::codec("ciphertext", e.to_string()))?);
                reader = tail;
            }
            matrix.push(row);
        }
        if !reader.is_empty() {
            return Err(MpcError::codec("cipher matrix", format!("{} trailing bytes", reader.len())));
        }
        Ok(matrix)
    }

    // ---- accounting ----

    pub fn enable_logging(&self) {
        self.logging.store(true, Ordering::Relaxed);
    }

    pub fn disable_logging(&self) {
        self.logging.store(false, Ordering::Relaxed);
    }

    pub fn reset_traffic(&self) {
        for id in self.peer_ids() {
            *lock(&self.peer(id).traffic) = PeerTraffic::default();
        }
    }

    /// Counters for one peer; zero for the party itself.
    pub fn traffic(&self, peer: usize) -> PeerTraffic {
        match self.peers.get(peer) {
            Some(Some(p)) => *lock(&p.traffic),
            _ => PeerTraffic::default(),
        }
    }

    pub fn log_traffic(&self) {
        for id in self.peer_ids() {
            let t = self.traffic(id);
            info!(
                party = self.pid, peer = id,
                bytes_sent = t.bytes_sent, bytes_received = t.bytes_received,
                messages_sent = t.messages_sent, messages_received = t.messages_received,
                "network traffic"
            );
        }
    }

    fn peer_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.peers.iter().enumerate().filter(|(_, p)| p.is_some()).map(|(id, _)| id)
    }

}

impl Drop for Network {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        let tasks: Vec<_> = self.peers.drain(..)
            .flatten()
            .filter_map(|peer| peer.channel.into_inner().unwrap_or_else(PoisonError::into_inner).close())
            .collect();
        let pid = self.pid;
        runtime.block_on(async move {
            for task in tasks {
                if tokio::time::timeout(LINGER, task).await.is_err() {
                    warn!("party {} dropped unsent data after {:?}", pid, LINGER);
                }
            }
        });
    }
}

/// Sum the counters of several shard networks, indexed by peer id.
pub fn aggregate_traffic(networks: &[Network]) -> Vec<PeerTraffic> {
    let party_count = networks.iter().map(|n| n.party_count()).max().unwrap_or(0);
    let mut total = vec![PeerTraffic::default(); party_count];
    for network in networks {
        for (id, slot) in total.iter_mut().enumerate() {
            *slot += network.traffic(id);
        }
    }
    total
}

fn u32_from(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

fn u64_from(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(word)
}

fn read_u64(reader: &mut &[u8]) -> Result<u64> {
    if reader.len() < 8 {
        return Err(MpcError::codec("cipher matrix", "truncated header"));
    }
    let (head, tail) = reader.split_at(8);
    *reader = tail;
    Ok(u64_from(head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use crate::{config::HeConfig, ring::Z2k, EncryptionParameters};

    type R = Z2k<62>;

    fn pair(registry: &PipeRegistry, shard: usize) -> (Network, Network) {
        let config = ProtocolConfig::default();
        (
            Network::in_process(registry, &config.for_party(1), shard),
            Network::in_process(registry, &config.for_party(2), shard),
        )
    }

    #[test]
    fn test_int_batching() {
        let registry = PipeRegistry::new();
        let (a, b) = pair(&registry, 0);
        for i in 0..513u64 {
            a.send_int(2, i * 3).unwrap();
        }
        assert_eq!(a.traffic(2).messages_sent, 1);
        a.flush_all_ints().unwrap();
        assert_eq!(a.traffic(2).messages_sent, 2);
        assert_eq!(a.traffic(2).bytes_sent, 513 * 8);
        // nothing left to flush
        a.flush_ints(2).unwrap();
        assert_eq!(a.traffic(2).messages_sent, 2);

        let received = b.receive_int_vec(1, 513).unwrap();
        assert_eq!(received, (0..513u64).map(|i| i * 3).collect::<Vec<_>>());
        assert_eq!(b.traffic(1).bytes_received, 513 * 8);
    }

    #[test]
    fn test_ring_framing() {
        let registry = PipeRegistry::new();
        let (a, b) = pair(&registry, 0);
        let m = RMat::<R>::from_f64(2, 3, &[1.0, -2.0, 3.5, 0.0, 7.25, -0.5], 20);
        a.send_relem(2, &R::new(42)).unwrap();
        a.send_relem_vec(2, m.data()).unwrap();
        a.send_rmat(2, &m).unwrap();
        assert_eq!(b.receive_relem::<R>(1).unwrap(), R::new(42));
        assert_eq!(b.receive_relem_vec::<R>(1, 6).unwrap(), m.data().to_vec());
        assert_eq!(b.receive_rmat::<R>(1, 2, 3).unwrap(), m);
        // 8 bytes, 48 bytes, 4 + 48 bytes
        assert_eq!(a.traffic(2).bytes_sent, 8 + 48 + 52);

        a.send_rmat(2, &m).unwrap();
        assert!(matches!(b.receive_rmat::<R>(1, 3, 3), Err(MpcError::Codec { .. })));
    }

    #[test]
    fn test_ciphertext_batching() {
        let config = HeConfig { poly_modulus_degree: 16, coeff_modulus_bits: vec![30, 30], scale_bits: 20 };
        let context = HeContext::new(EncryptionParameters::from_config(&config).unwrap()).unwrap();
        let registry = PipeRegistry::new();
        let protocol = ProtocolConfig { ciphertext_batch_size: 2, ..ProtocolConfig::default() };
        let a = Network::in_process(&registry, &protocol.for_party(1), 0);
        let b = Network::in_process(&registry, &protocol.for_party(2), 0);

        let ciphers: Vec<Ciphertext> = (0..5u64).map(|i| {
            let mut c = Ciphertext::zeros(&context, (i % 2) as usize);
            c.data_mut().iter_mut().enumerate().for_each(|(j, x)| *x = i + j as u64);
            c
        }).collect();
        for c in &ciphers {
            a.send_ciphertext(2, c, &context).unwrap();
        }
        assert_eq!(a.traffic(2).messages_sent, 2);
        a.flush_all_ciphertexts().unwrap();
        assert_eq!(a.traffic(2).messages_sent, 3);

        assert_eq!(b.receive_ciphertext_batch(1, &context).unwrap(), ciphers[..2].to_vec());
        assert_eq!(b.receive_ciphertexts(1, 3, &context).unwrap(), ciphers[2..].to_vec());

        let matrix: CipherMatrix = vec![ciphers[..2].to_vec(), vec![], ciphers[2..].to_vec()];
        a.send_cipher_matrix(2, &matrix, &context).unwrap();
        assert_eq!(b.receive_cipher_matrix(1, &context).unwrap(), matrix);
    }

    #[test]
    fn test_traffic_toggle_and_shards() {
        let registry = PipeRegistry::new();
        let config = ProtocolConfig::default();
        let shards_1 = Network::in_process_shards(&registry, &config.for_party(1), 2);
        let shards_0 = Network::in_process_shards(&registry, &config.for_party(0), 2);
        for (shard, net) in shards_1.iter().enumerate() {
            net.send_bytes(0, vec![0; 10 * (shard + 1)]).unwrap();
        }
        for (shard, net) in shards_0.iter().enumerate() {
            assert_eq!(net.receive_bytes(1, 10 * (shard + 1)).unwrap().len(), 10 * (shard + 1));
        }
        let total = aggregate_traffic(&shards_1);
        assert_eq!(total[0], PeerTraffic { bytes_sent: 30, bytes_received: 0, messages_sent: 2, messages_received: 0 });
        assert_eq!(total[1], PeerTraffic::default());
        assert_eq!(aggregate_traffic(&shards_0)[1].bytes_received, 30);

        shards_1[0].disable_logging();
        shards_1[0].send_bytes(2, vec![1; 5]).unwrap();
        assert_eq!(shards_1[0].traffic(2), PeerTraffic::default());
        shards_1[0].enable_logging();
        shards_1[0].reset_traffic();
        assert_eq!(shards_1[0].traffic(0), PeerTraffic::default());
    }

    #[test]
    fn test_tcp_network() {
        crate::simulation::init_test_logging();
        let n = 3;
        let listeners: Vec<TcpListener> = (0..n).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect();
        let addrs: Vec<String> = listeners.iter().map(|l| l.local_addr().unwrap().to_string()).collect();
        let handles: Vec<_> = listeners.into_iter().enumerate().map(|(pid, listener)| {
            let addrs = addrs.clone();
            thread::spawn(move || {
                let config = ProtocolConfig { party_id: pid, dial_interval_ms: 50, ..ProtocolConfig::default() };
                let network = Network::over_tcp(&config, listener, &addrs).unwrap();
                for peer in 0..n {
                    if peer != pid {
                        network.send_relem(peer, &R::new(100 * pid as u128 + peer as u128)).unwrap();
                    }
                }
                let mut got = vec![];
                for peer in 0..n {
                    if peer != pid {
                        got.push(network.receive_relem::<R>(peer).unwrap());
                    }
                }
                (pid, got)
            })
        }).collect();
        for handle in handles {
            let (pid, got) = handle.join().unwrap();
            let expected: Vec<R> = (0..n).filter(|&p| p != pid).map(|p| R::new(100 * p as u128 + pid as u128)).collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_tcp_drop_delivers_queued_writes() {
        crate::simulation::init_test_logging();
        let listeners: Vec<TcpListener> = (0..3).map(|_| TcpListener::bind("127.0.0.1:0").unwrap()).collect();
        let addrs: Vec<String> = listeners.iter().map(|l| l.local_addr().unwrap().to_string()).collect();
        let payload: Vec<u8> = (0..3_000_000u32).map(|i| (i % 253) as u8).collect();
        let handles: Vec<_> = listeners.into_iter().enumerate().map(|(pid, listener)| {
            let (addrs, payload) = (addrs.clone(), payload.clone());
            thread::spawn(move || {
                let config = ProtocolConfig { party_id: pid, dial_interval_ms: 50, ..ProtocolConfig::default() };
                let network = Network::over_tcp(&config, listener, &addrs).unwrap();
                match pid {
                    // queue a large message and hang up at once
                    2 => network.send_bytes(1, payload).unwrap(),
                    1 => {
                        assert_eq!(network.receive_bytes(2, payload.len()).unwrap(), payload);
                        assert!(matches!(network.receive_bytes(2, 1), Err(MpcError::Disconnected { peer: 2 })));
                    }
                    _ => {}
                }
            })
        }).collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
