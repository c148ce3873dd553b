//! The network façade.
//!
//! [`Network`] owns the bootstrap result, one [peer link](crate::link) per
//! remote party, and the loopback queue for self-addressed messages. It
//! enforces id-range and liveness checks and coordinates the one-time,
//! idempotent teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};

use conclave_types::{NetworkConfig, PartyId};

use crate::bootstrap;
use crate::error::{Direction, NetworkError};
use crate::link::PeerLink;

/// Time allowed for the whole bootstrap when the caller does not pick one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// A connected network: one duplex channel per remote party, plus the
/// loopback path.
///
/// Sends are synchronous and never block on network state; receives await
/// the next payload from the named party. Messages between a fixed pair
/// of parties arrive in the order they were sent; nothing is guaranteed
/// across pairs, or between network and loopback traffic.
///
/// After [`close`](Network::close), and equally once the handle is
/// dropped, all pipelines stop; `send`/`receive` on a closed network
/// fail fast with [`NetworkError::Closed`].
pub struct Network {
    config: NetworkConfig,
    links: HashMap<PartyId, PeerLink>,
    loopback_tx: mpsc::UnboundedSender<Vec<u8>>,
    loopback_rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    shutdown: broadcast::Sender<()>,
    closed: AtomicBool,
}

impl Network {
    /// Connect to all other parties with the default timeout.
    ///
    /// Construction runs the bootstrap once and spawns every pipeline; a
    /// failure here is fatal and leaves no partially connected network
    /// behind.
    pub async fn connect(config: NetworkConfig) -> Result<Self, NetworkError> {
        Self::connect_with_timeout(config, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to all other parties, allowing `timeout` for the whole
    /// bootstrap phase.
    pub async fn connect_with_timeout(
        config: NetworkConfig,
        timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let (shutdown, _) = broadcast::channel(1);

        // A single party has nobody to bootstrap with; only the loopback
        // path exists.
        let mut links = HashMap::new();
        if config.num_parties() > 1 {
            let channels = bootstrap::establish_channels(&config, timeout).await?;
            for (party, stream) in channels {
                links.insert(party, PeerLink::spawn(party, stream, shutdown.subscribe()));
            }
        }

        let (loopback_tx, loopback_rx) = mpsc::unbounded_channel();
        tracing::info!(
            my_id = config.my_id(),
            parties = config.num_parties(),
            "network connected"
        );

        Ok(Self {
            config,
            links,
            loopback_tx,
            loopback_rx: Mutex::new(loopback_rx),
            shutdown,
            closed: AtomicBool::new(false),
        })
    }

    /// Queue `payload` for delivery to `party_id`, in submission order.
    ///
    /// Sending to the own id goes through the loopback queue and never
    /// touches a socket. Fails fast with [`NetworkError::InvalidPartyId`]
    /// out of range, [`NetworkError::Closed`] after close, or
    /// [`NetworkError::LinkFailed`] once the peer's sender pipeline has
    /// terminated.
    pub fn send(&self, party_id: PartyId, payload: Vec<u8>) -> Result<(), NetworkError> {
        self.check_range(party_id)?;
        if self.closed.load(Ordering::Acquire) {
            return Err(NetworkError::Closed);
        }
        if party_id == self.config.my_id() {
            return self
                .loopback_tx
                .send(payload)
                .map_err(|_| NetworkError::Closed);
        }
        match self.links.get(&party_id) {
            Some(link) => link.enqueue(payload),
            None => Err(self.out_of_range(party_id)),
        }
    }

    /// Await the next payload from `party_id`.
    ///
    /// Delivery is FIFO per sending party. Fails fast with
    /// [`NetworkError::InvalidPartyId`] or [`NetworkError::Closed`];
    /// fails with [`NetworkError::LinkFailed`] as soon as the peer's
    /// receiver pipeline has terminated, rather than blocking forever.
    pub async fn receive(&self, party_id: PartyId) -> Result<Vec<u8>, NetworkError> {
        self.check_range(party_id)?;
        if self.closed.load(Ordering::Acquire) {
            return Err(NetworkError::Closed);
        }
        if party_id == self.config.my_id() {
            return self.receive_loopback().await;
        }
        match self.links.get(&party_id) {
            Some(link) => match link.next_inbound().await {
                Some(payload) => Ok(payload),
                None if self.closed.load(Ordering::Acquire) => Err(NetworkError::Closed),
                None => Err(NetworkError::LinkFailed {
                    party: party_id,
                    direction: Direction::Receive,
                }),
            },
            None => Err(self.out_of_range(party_id)),
        }
    }

    /// Stop every pipeline and release all sockets. Idempotent; never
    /// fails. Errors pipelines carried out of the session are logged, not
    /// raised.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(my_id = self.config.my_id(), "network already closed");
            return;
        }
        // Receivers first: signal only, they stop at the next loop-top.
        let _ = self.shutdown.send(());
        // Then ask every sender to drain what is queued and stop.
        for link in self.links.values() {
            link.request_flush();
        }
        // Await full termination; sockets are released as the tasks end.
        for link in self.links.values() {
            link.join().await;
        }
        tracing::info!(my_id = self.config.my_id(), "network closed");
    }

    /// Number of parties in the computation, fixed at construction.
    pub fn num_parties(&self) -> u32 {
        self.config.num_parties()
    }

    /// The local party's id.
    pub fn my_id(&self) -> PartyId {
        self.config.my_id()
    }

    /// Loopback delivery: FIFO in `send(my_id, …)` order. The loopback
    /// has no pipeline task whose exit could close the queue, so a
    /// blocked receive also watches the stop signal.
    async fn receive_loopback(&self) -> Result<Vec<u8>, NetworkError> {
        let mut shutdown = self.shutdown.subscribe();
        // Re-check after subscribing: a close that raced ahead of the
        // subscription would otherwise go unseen.
        if self.closed.load(Ordering::Acquire) {
            return Err(NetworkError::Closed);
        }
        let mut rx = self.loopback_rx.lock().await;
        tokio::select! {
            payload = rx.recv() => payload.ok_or(NetworkError::Closed),
            _ = shutdown.recv() => Err(NetworkError::Closed),
        }
    }

    fn check_range(&self, party_id: PartyId) -> Result<(), NetworkError> {
        if party_id == 0 || party_id > self.config.num_parties() {
            return Err(self.out_of_range(party_id));
        }
        Ok(())
    }

    fn out_of_range(&self, party_id: PartyId) -> NetworkError {
        NetworkError::InvalidPartyId {
            id: party_id,
            max: self.config.num_parties(),
        }
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        // Best-effort: wake any receiver pipeline still parked on a read
        // so tasks do not outlive the handle. `close` remains the
        // supported teardown path.
        if !self.closed.load(Ordering::Acquire) {
            let _ = self.shutdown.send(());
        }
    }
}
