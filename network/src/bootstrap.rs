//! One-time connection establishment.
//!
//! Deadlock-free role split, keyed by the total order on party ids: party
//! `i` dials every party `j > i` and accepts from every `j < i`, so for
//! any unordered pair exactly one side initiates and the other listens.
//! The first byte written on a dialed connection is the dialer's party id
//! — the only in-band identification the accepting side gets.
//!
//! Dial attempts retry with exponential backoff; the whole phase runs
//! under one overall timeout. Failure is fatal: every partially opened
//! socket and the listener are closed before the error propagates, so no
//! degraded channel set ever escapes.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use conclave_types::{NetworkConfig, Party, PartyId};

use crate::error::NetworkError;

/// Retry delays double from 1 ms; the exponent is capped so a single wait
/// never exceeds ~4 s.
const MAX_BACKOFF_EXPONENT: u32 = 12;

/// Establish exactly one duplex channel per remote party.
pub(crate) async fn establish_channels(
    config: &NetworkConfig,
    timeout: Duration,
) -> Result<HashMap<PartyId, TcpStream>, NetworkError> {
    let me = config.me();
    let listener = TcpListener::bind((me.host.as_str(), me.port))
        .await
        .map_err(|e| NetworkError::Bootstrap(format!("failed to bind {}: {e}", me.address())))?;
    tracing::info!(my_id = config.my_id(), addr = %me.address(), "listener bound");

    let result = tokio::time::timeout(timeout, async {
        tokio::try_join!(accept_lower(config, &listener), dial_higher(config))
    })
    .await;

    // The listener is released on every path below: no further inbound
    // connections are expected once bootstrap is decided.
    match result {
        Err(_) => Err(NetworkError::BootstrapTimeout(timeout)),
        Ok(Err(e)) => Err(NetworkError::Bootstrap(e.to_string())),
        Ok(Ok((mut channels, dialed))) => {
            channels.extend(dialed);
            tracing::info!(
                my_id = config.my_id(),
                channels = channels.len(),
                "bootstrap complete"
            );
            Ok(channels)
        }
    }
}

/// Accept connections from every party with a lower id, identifying each
/// by the id byte it writes after connecting.
async fn accept_lower(
    config: &NetworkConfig,
    listener: &TcpListener,
) -> io::Result<HashMap<PartyId, TcpStream>> {
    let my_id = config.my_id();
    let expected = (my_id - 1) as usize;
    let mut channels = HashMap::with_capacity(expected);
    while channels.len() < expected {
        let (mut stream, addr) = listener.accept().await?;
        let mut id_buf = [0u8; 1];
        stream.read_exact(&mut id_buf).await?;
        let id = PartyId::from(id_buf[0]);
        if id == 0 || id >= my_id {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected party id {id} from {addr}"),
            ));
        }
        if channels.insert(id, stream).is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("second connection claiming party id {id}"),
            ));
        }
        tracing::info!(my_id, party = id, peer = %addr, "accepted connection");
    }
    Ok(channels)
}

/// Dial every party with a higher id, retrying each with backoff, and
/// identify ourselves with a single id byte once connected.
async fn dial_higher(config: &NetworkConfig) -> io::Result<HashMap<PartyId, TcpStream>> {
    let my_id = config.my_id();
    let mut channels = HashMap::new();
    for party in config.remote_parties().filter(|p| p.id > my_id) {
        let mut stream = dial_with_backoff(party).await;
        stream.write_all(&[party_id_byte(my_id)]).await?;
        tracing::info!(my_id, party = party.id, addr = %party.address(), "connected");
        channels.insert(party.id, stream);
    }
    Ok(channels)
}

/// Retry the connect until it succeeds; the overall bootstrap timeout is
/// the only thing that gives up on an unreachable peer.
async fn dial_with_backoff(party: &Party) -> TcpStream {
    let mut attempts: u32 = 0;
    loop {
        match TcpStream::connect((party.host.as_str(), party.port)).await {
            Ok(stream) => return stream,
            Err(e) => {
                attempts += 1;
                let delay = Duration::from_millis(1u64 << attempts.min(MAX_BACKOFF_EXPONENT));
                tracing::debug!(
                    party = party.id,
                    attempt = attempts,
                    error = %e,
                    "connect failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Party ids are validated to fit one byte at configuration time.
fn party_id_byte(id: PartyId) -> u8 {
    debug_assert!(id <= u32::from(u8::MAX));
    id as u8
}
