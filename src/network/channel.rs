use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    net::TcpStream,
    runtime::Handle,
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::error::{MpcError, Result};

const BUFFER_CAPACITY: usize = 32 * 1024;
const READ_BUF_SIZE: usize = 256 * 1024;

type SharedReceiver = Arc<Mutex<UnboundedReceiver<Bytes>>>;

/// Duplex, ordered byte channel to one peer.
///
/// Writes enqueue whole buffers; reads return exactly the requested number of
/// bytes, waiting for as many inbound chunks as needed. Both block the calling
/// thread and must not be used from inside an async task.
pub struct PeerChannel {
    peer: usize,
    outbound: UnboundedSender<Bytes>,
    inbound: SharedReceiver,
    pending: BytesMut,
    task: Option<JoinHandle<()>>,
}

impl PeerChannel {

    fn new(peer: usize, outbound: UnboundedSender<Bytes>, inbound: SharedReceiver) -> Self {
        Self { peer, outbound, inbound, pending: BytesMut::new(), task: None }
    }

    pub fn peer(&self) -> usize {
        self.peer
    }

    pub fn write_all(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.outbound.send(Bytes::from(bytes)).map_err(|_| MpcError::Disconnected { peer: self.peer })
    }

    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        while self.pending.len() < len {
            let chunk = {
                let mut inbound = self.inbound.lock()
                    .map_err(|_| MpcError::Disconnected { peer: self.peer })?;
                inbound.blocking_recv().ok_or(MpcError::Disconnected { peer: self.peer })?
            };
            self.pending.extend_from_slice(&chunk);
        }
        Ok(self.pending.split_to(len).to_vec())
    }

    /// Channel over a connected socket. The connection task on `runtime`
    /// drains the outbound queue into the socket and forwards whatever the
    /// socket yields.
    pub fn over_tcp(peer: usize, stream: TcpStream, runtime: &Handle) -> Result<Self> {
        stream.set_nodelay(true).map_err(|e| MpcError::transport(peer, e))?;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let task = runtime.spawn(run(peer, stream, outbound_rx, inbound_tx));
        let mut channel = Self::new(peer, outbound, Arc::new(Mutex::new(inbound)));
        channel.task = Some(task);
        Ok(channel)
    }

    /// Stop accepting writes. Returns the connection task, which ends once
    /// every queued write reached the socket.
    pub(crate) fn close(self) -> Option<JoinHandle<()>> {
        let PeerChannel { task, .. } = self;
        task
    }

}

async fn run(
    peer: usize,
    stream: TcpStream,
    outbound_rx: UnboundedReceiver<Bytes>,
    inbound_tx: UnboundedSender<Bytes>,
) {
    let (reader, writer) = tokio::io::split(stream);
    let outbound = handle_outbound_traffic(writer, outbound_rx);
    tokio::pin!(outbound);

    tokio::select! {
        r = &mut outbound => match r {
            Ok(()) => debug!("send loop to party {} finished", peer),
            Err(e) => warn!("send loop to party {} failed: {}", peer, e),
        },
        r = handle_inbound_traffic(reader, inbound_tx) => match r {
            Ok(()) => {
                debug!("party {} closed the connection", peer);
                // writes queued before our own shutdown still go out
                if let Err(e) = outbound.await {
                    debug!("send loop to party {} ended: {}", peer, e);
                }
            }
            Err(e) => warn!("receive loop from party {} failed: {}", peer, e),
        },
    }
}

/// Send queued buffers to the socket, coalescing what is already waiting.
async fn handle_outbound_traffic(
    mut writer: WriteHalf<TcpStream>,
    mut outbound_rx: UnboundedReceiver<Bytes>,
) -> io::Result<()> {
    let mut buf = BytesMut::with_capacity(BUFFER_CAPACITY);

    while let Some(chunk) = outbound_rx.recv().await {
        buf.extend_from_slice(&chunk);
        while buf.len() < BUFFER_CAPACITY {
            match outbound_rx.try_recv() {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(_) => break,
            }
        }
        write_buf(&mut writer, &mut buf).await?;
    }

    // no more writers
    writer.shutdown().await
}

/// Forward socket reads to the inbound queue until the peer hangs up.
async fn handle_inbound_traffic(
    mut reader: ReadHalf<TcpStream>,
    inbound_tx: UnboundedSender<Bytes>,
) -> io::Result<()> {
    let mut buf = BytesMut::with_capacity(READ_BUF_SIZE);

    loop {
        if buf.capacity() < BUFFER_CAPACITY {
            buf.reserve(READ_BUF_SIZE);
        }
        if reader.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
        if inbound_tx.send(buf.split().freeze()).is_err() {
            return Ok(());
        }
    }
}

async fn write_buf(writer: &mut WriteHalf<TcpStream>, buf: &mut BytesMut) -> io::Result<()> {
    writer.write_all(buf).await?;
    writer.flush().await?;
    buf.clear();
    Ok(())
}

struct Pipe {
    low_to_high: (UnboundedSender<Bytes>, SharedReceiver),
    high_to_low: (UnboundedSender<Bytes>, SharedReceiver),
}

impl Pipe {
    fn new() -> Self {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        Self {
            low_to_high: (a_tx, Arc::new(Mutex::new(a_rx))),
            high_to_low: (b_tx, Arc::new(Mutex::new(b_rx))),
        }
    }
}

/// In-memory duplex pipes for simulating several parties in one process.
///
/// Pipes are keyed by the unordered pair of party ids and a shard index. The
/// first request creates the pipe, later requests return ends of the same
/// pipe, so setting up the same pair twice is harmless.
#[derive(Default)]
pub struct PipeRegistry {
    pipes: Mutex<HashMap<(usize, usize, usize), Pipe>>,
}

impl PipeRegistry {

    pub fn new() -> Self {
        Self::default()
    }

    /// The end of the `(me, peer, shard)` pipe that belongs to `me`.
    pub fn endpoint(&self, me: usize, peer: usize, shard: usize) -> PeerChannel {
        assert_ne!(me, peer, "[Invalid argument] A party has no pipe to itself.");
        let key = (me.min(peer), me.max(peer), shard);
        let mut pipes = match self.pipes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let pipe = pipes.entry(key).or_insert_with(|| {
            debug!("creating pipe {:?}", key);
            Pipe::new()
        });
        let (outbound, inbound) = if me < peer {
            (&pipe.low_to_high, &pipe.high_to_low)
        } else {
            (&pipe.high_to_low, &pipe.low_to_high)
        };
        PeerChannel::new(peer, outbound.0.clone(), inbound.1.clone())
    }

    pub fn len(&self) -> usize {
        self.pipes.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_registry_is_idempotent() {
        let registry = PipeRegistry::new();
        let mut a = registry.endpoint(0, 1, 0);
        let mut b = registry.endpoint(1, 0, 0);
        let _again = registry.endpoint(0, 1, 0);
        let _other_shard = registry.endpoint(0, 1, 1);
        assert_eq!(registry.len(), 2);

        a.write_all(vec![1, 2, 3]).unwrap();
        a.write_all(vec![4, 5]).unwrap();
        assert_eq!(b.read_exact(4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(b.read_exact(1).unwrap(), vec![5]);

        // a second request for the same pair reads the same queue
        let mut b_again = registry.endpoint(1, 0, 0);
        a.write_all(vec![6]).unwrap();
        assert_eq!(b_again.read_exact(1).unwrap(), vec![6]);
    }

    #[test]
    fn test_tcp_channel() {
        crate::simulation::init_test_logging();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (accepted, dialed) = runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (accepted, dialed) = tokio::join!(listener.accept(), TcpStream::connect(addr));
            (accepted.unwrap().0, dialed.unwrap())
        });
        let mut server = PeerChannel::over_tcp(0, accepted, runtime.handle()).unwrap();
        let mut client = PeerChannel::over_tcp(1, dialed, runtime.handle()).unwrap();

        let handle = thread::spawn(move || {
            let got = server.read_exact(100_000).unwrap();
            server.write_all(got[..10].to_vec()).unwrap();
            (got, server)
        });
        let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        client.write_all(payload[..30_000].to_vec()).unwrap();
        client.write_all(payload[30_000..].to_vec()).unwrap();
        assert_eq!(client.read_exact(10).unwrap(), payload[..10].to_vec());
        let (got, server) = handle.join().unwrap();
        assert_eq!(got, payload);

        // once the server is closed the client sees the hang-up
        let task = server.close().unwrap();
        runtime.block_on(task).unwrap();
        assert!(matches!(client.read_exact(1), Err(MpcError::Disconnected { peer: 1 })));
    }
}
