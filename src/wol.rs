//! Dispatch of magic packets.
//!
//! Wake-on-LAN has no reply, so a successful [`Dispatcher::send`] only means
//! the local network stack accepted at least one datagram. It says nothing
//! about whether the target received the packet or woke up.

pub mod noop;
pub mod udp;

use crate::destination::{Destination, DestinationError};
use crate::mac::ParseMacError;
use crate::packet::MagicPacket;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum WakeError {
    #[error("Invalid MAC address: {0}")]
    InvalidAddressFormat(#[from] ParseMacError),
    #[error("Invalid destination: {0}")]
    InvalidDestination(#[from] DestinationError),
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(io::Error),
    #[error("All {attempts} send attempts failed: {source}")]
    SendFailed { attempts: u32, source: io::Error },
}

impl WakeError {
    /// True when the stored host entry has to be fixed; false when the
    /// network was the problem and a later retry may work.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::InvalidAddressFormat(_) => true,
            Self::InvalidDestination(e) => !e.is_network_error(),
            Self::NetworkUnavailable(_) | Self::SendFailed { .. } => false,
        }
    }
}

/// Outcome of a send that reached the local stack at least once.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sent {
    pub attempts: u32,
    pub accepted: u32,
}

/// Opens sending contexts. Implementations hold no per-send state.
pub trait Transport: Sync + Send {
    fn open(&self, destination: &Destination) -> io::Result<Box<dyn Channel>>;
}

/// A sending context, released when dropped.
pub trait Channel: Send {
    fn send_to(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize>;
}

#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn udp() -> Self {
        Self::new(Arc::new(udp::UdpTransport::default()))
    }

    /// Sends `packet` to `destination` `attempts` times on one socket.
    ///
    /// Fails only if the socket cannot be opened or every attempt is
    /// rejected. An `attempts` of zero is treated as one.
    pub fn send(
        &self,
        packet: &MagicPacket,
        destination: &Destination,
        attempts: u32,
    ) -> Result<Sent, WakeError> {
        let attempts = attempts.max(1);
        let channel = self
            .transport
            .open(destination)
            .map_err(WakeError::NetworkUnavailable)?;

        let target = destination.socket_addr();
        let mut accepted = 0;
        let mut last_error = None;
        for _ in 0..attempts {
            match channel.send_to(packet.as_bytes(), target) {
                Ok(n) if n == packet.len() => accepted += 1,
                Ok(n) => {
                    last_error = Some(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated to {} of {} bytes", n, packet.len()),
                    ))
                }
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            Some(source) if accepted == 0 => Err(WakeError::SendFailed { attempts, source }),
            _ => Ok(Sent { attempts, accepted }),
        }
    }
}
