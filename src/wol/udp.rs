use crate::destination::Destination;
use crate::wol::{Channel, Transport};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const OPEN_TIMEOUT: Duration = Duration::from_secs(3);

type Opener = fn(SocketAddr, bool) -> io::Result<UdpSocket>;

/// Sends over a fresh UDP socket bound to an ephemeral port.
///
/// IPv4 sockets always have `SO_BROADCAST` set. A subnet broadcast address
/// cannot be recognised without its netmask, and the flag has no effect on
/// unicast sends.
pub struct UdpTransport {
    open_timeout: Duration,
    opener: Opener,
}

impl UdpTransport {
    pub fn new(open_timeout: Duration) -> Self {
        Self {
            open_timeout,
            opener: open_socket,
        }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(OPEN_TIMEOUT)
    }
}

fn open_socket(bind_addr: SocketAddr, broadcast: bool) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(bind_addr)?;
    if broadcast {
        socket.set_broadcast(true)?;
    }
    Ok(socket)
}

fn bind_options(destination: &Destination) -> (SocketAddr, bool) {
    match destination.socket_addr() {
        SocketAddr::V4(_) => ((Ipv4Addr::UNSPECIFIED, 0).into(), true),
        SocketAddr::V6(_) => ((Ipv6Addr::UNSPECIFIED, 0).into(), false),
    }
}

impl Transport for UdpTransport {
    fn open(&self, destination: &Destination) -> io::Result<Box<dyn Channel>> {
        let (bind_addr, broadcast) = bind_options(destination);
        let opener = self.opener;

        // Binding can stall on hosts without a usable interface. If it does,
        // give up; a socket that shows up later is dropped with the sender.
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(opener(bind_addr, broadcast));
        });
        match rx.recv_timeout(self.open_timeout) {
            Ok(socket) => Ok(Box::new(socket?)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no socket after {:?}", self.open_timeout),
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::Other,
                "socket opener exited without a result",
            )),
        }
    }
}

impl Channel for UdpSocket {
    fn send_to(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, payload, target)
    }
}
