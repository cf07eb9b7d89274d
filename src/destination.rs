use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9;
pub const DEFAULT_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    #[error("Port {0} is outside 1-65535")]
    BadPort(i64),
    #[error("Could not resolve address {0:?}")]
    Unresolvable(String),
    #[error("No answer resolving {0:?} in time")]
    LookupTimedOut(String),
}

impl DestinationError {
    /// A lookup that never answered points at the network, not the entry.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Self::LookupTimedOut(_))
    }
}

/// Where a magic packet is sent.
///
/// Without a netmask a subnet broadcast cannot be told apart from a unicast
/// address, so [`Destination::is_broadcast`] is only a display hint: the
/// limited broadcast address or an address ending in `.255`. The UDP
/// transport enables broadcast for every IPv4 destination regardless.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Destination {
    addr: SocketAddr,
    broadcast: bool,
}

impl Destination {
    pub fn new(ip: IpAddr, port: u16) -> Result<Self, DestinationError> {
        if port == 0 {
            return Err(DestinationError::BadPort(0));
        }
        Ok(Self {
            addr: SocketAddr::new(ip, port),
            broadcast: is_broadcast(ip),
        })
    }

    /// Builds a destination from the optional overrides stored with a host.
    ///
    /// `address` may be an IP literal or a name; a name is resolved and the
    /// first IPv4 result is preferred. Resolution gives up after
    /// [`LOOKUP_TIMEOUT`].
    pub fn resolve(address: Option<&str>, port: Option<i64>) -> Result<Self, DestinationError> {
        let port = match port {
            None => DEFAULT_PORT,
            Some(p) => u16::try_from(p)
                .ok()
                .filter(|p| *p != 0)
                .ok_or(DestinationError::BadPort(p))?,
        };
        let ip = match address.map(str::trim).filter(|a| !a.is_empty()) {
            None => IpAddr::V4(DEFAULT_BROADCAST),
            Some(a) => match a.parse::<IpAddr>() {
                Ok(ip) => ip,
                Err(_) => lookup(a, LOOKUP_TIMEOUT, system_resolver)?,
            },
        };
        Self::new(ip, port)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Whether the address looks like a broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(DEFAULT_BROADCAST), DEFAULT_PORT),
            broadcast: true,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

fn is_broadcast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_broadcast() || v4.octets()[3] == 255,
        IpAddr::V6(_) => false,
    }
}

type Resolver = fn(String) -> io::Result<Vec<SocketAddr>>;

fn system_resolver(name: String) -> io::Result<Vec<SocketAddr>> {
    Ok((name.as_str(), 0).to_socket_addrs()?.collect())
}

// The system resolver has no deadline of its own, so it runs on a helper
// thread that is abandoned when the timeout passes.
fn lookup(
    name: &str,
    timeout: Duration,
    resolver: Resolver,
) -> Result<IpAddr, DestinationError> {
    let (tx, rx) = mpsc::channel();
    let owned = name.to_string();
    thread::spawn(move || {
        let _ = tx.send(resolver(owned));
    });
    let addrs = match rx.recv_timeout(timeout) {
        Ok(Ok(addrs)) => addrs,
        Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Disconnected) => {
            return Err(DestinationError::Unresolvable(name.to_string()))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            return Err(DestinationError::LookupTimedOut(name.to_string()))
        }
    };
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip())
        .ok_or_else(|| DestinationError::Unresolvable(name.to_string()))
}

#[cfg(test)]
mod tests {
    use crate::destination::*;
    use std::net::Ipv6Addr;
    use std::time::Instant;

    #[test]
    fn defaults() {
        let d = Destination::resolve(None, None).unwrap();
        assert_eq!(d, Destination::default());
        assert_eq!(d.to_string(), "255.255.255.255:9");
        assert!(d.is_broadcast());
    }

    #[test]
    fn blank_address_uses_default() {
        let d = Destination::resolve(Some("  "), Some(7)).unwrap();
        assert_eq!(d.to_string(), "255.255.255.255:7");
    }

    #[test]
    fn subnet_broadcast() {
        let d = Destination::resolve(Some("192.168.1.255"), None).unwrap();
        assert!(d.is_broadcast());
        assert_eq!(d.port(), 9);
        // A /25 broadcast still parses; only the hint misses it.
        let d = Destination::resolve(Some("192.168.1.127"), None).unwrap();
        assert_eq!(d.to_string(), "192.168.1.127:9");
    }

    #[test]
    fn unicast() {
        let d = Destination::resolve(Some("192.168.1.20"), Some(9)).unwrap();
        assert!(!d.is_broadcast());
        let d = Destination::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 9).unwrap();
        assert!(!d.is_broadcast());
    }

    #[test]
    fn bad_ports() {
        assert_eq!(
            Destination::resolve(None, Some(0)),
            Err(DestinationError::BadPort(0))
        );
        assert_eq!(
            Destination::resolve(None, Some(65536)),
            Err(DestinationError::BadPort(65536))
        );
        assert_eq!(
            Destination::resolve(None, Some(-1)),
            Err(DestinationError::BadPort(-1))
        );
        assert_eq!(
            Destination::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            Err(DestinationError::BadPort(0))
        );
        assert!(Destination::resolve(None, Some(65535)).is_ok());
    }

    #[test]
    fn unresolvable_name() {
        // The .invalid TLD is reserved and never resolves.
        assert_eq!(
            Destination::resolve(Some("no-such-host.invalid"), None),
            Err(DestinationError::Unresolvable(
                "no-such-host.invalid".to_string()
            ))
        );
    }

    fn stalled_resolver(_: String) -> io::Result<Vec<SocketAddr>> {
        thread::sleep(Duration::from_secs(5));
        Ok(vec![])
    }

    fn dual_stack_resolver(_: String) -> io::Result<Vec<SocketAddr>> {
        Ok(vec![
            (Ipv6Addr::LOCALHOST, 0).into(),
            (Ipv4Addr::new(10, 0, 0, 255), 0).into(),
        ])
    }

    fn empty_resolver(_: String) -> io::Result<Vec<SocketAddr>> {
        Ok(vec![])
    }

    #[test]
    fn lookup_gives_up_after_timeout() {
        let start = Instant::now();
        let err = lookup("slow.example", Duration::from_millis(50), stalled_resolver).unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(err, DestinationError::LookupTimedOut("slow.example".to_string()));
        assert!(err.is_network_error());
        assert!(!DestinationError::BadPort(0).is_network_error());
    }

    #[test]
    fn lookup_prefers_ipv4() {
        let ip = lookup("nas.lan", LOOKUP_TIMEOUT, dual_stack_resolver).unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 255)));
        assert_eq!(
            lookup("nas.lan", LOOKUP_TIMEOUT, empty_resolver),
            Err(DestinationError::Unresolvable("nas.lan".to_string()))
        );
    }
}
