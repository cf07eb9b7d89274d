use crate::destination::Destination;
use crate::wol::{Channel, Transport};
use log::info;
use std::io;
use std::net::SocketAddr;

/// Stand-in transport that logs instead of touching the network.
pub struct LogOnlyTransport;

struct LogOnlyChannel;

impl Transport for LogOnlyTransport {
    fn open(&self, destination: &Destination) -> io::Result<Box<dyn Channel>> {
        info!(
            "faking socket for {} (broadcast: {})",
            destination,
            destination.is_broadcast()
        );
        Ok(Box::new(LogOnlyChannel))
    }
}

impl Channel for LogOnlyChannel {
    fn send_to(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        info!("faking {} byte packet to {}: {:02x?}", payload.len(), target, payload);
        Ok(payload.len())
    }
}
