use crate::destination::Destination;
use crate::mac::{parse_mac, MacAddress};
use crate::packet::{self, MagicPacket, SecureOnPassword};
use crate::wol::WakeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A stored machine, as kept in the host book.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_name: Option<String>,
    pub mac_address: String,
    // Broadcast, subnet broadcast or unicast address. Defaults to
    // 255.255.255.255 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_on: Option<String>,
}

impl Host {
    pub fn new(title: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon_name: None,
            mac_address: mac_address.into(),
            broadcast_address: None,
            port: None,
            secure_on: None,
        }
    }

    /// Validates the stored text fields. Nothing here touches the network
    /// except resolving a broadcast address given as a name.
    pub fn wake_target(&self) -> Result<WakeTarget, WakeError> {
        let mac = parse_mac(&self.mac_address)?;
        let secure_on = match self.secure_on.as_deref() {
            Some(s) if !s.is_empty() => Some(s.parse::<SecureOnPassword>()?),
            _ => None,
        };
        let destination = Destination::resolve(self.broadcast_address.as_deref(), self.port)?;
        Ok(WakeTarget {
            mac,
            secure_on,
            destination,
        })
    }
}

/// A host whose fields have all been parsed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WakeTarget {
    pub mac: MacAddress,
    pub secure_on: Option<SecureOnPassword>,
    pub destination: Destination,
}

impl WakeTarget {
    pub fn packet(&self) -> MagicPacket {
        packet::build(self.mac, self.secure_on.as_ref())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HostBookError {
    #[error("Could not access host book: {0}")]
    Io(#[from] io::Error),
    #[error("Host book is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Host {title:?} is invalid: {source}")]
    InvalidHost { title: String, source: WakeError },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Updated,
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Hosts kept in a json file, in the order they were added.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct HostBook {
    hosts: Vec<Host>,
}

impl HostBook {
    pub fn load(path: &Path) -> Result<HostBook, HostBookError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HostBook::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Writes the book next to `path` and renames it into place, so a crash
    /// leaves either the old file or the new one.
    pub fn save(&self, path: &Path) -> Result<(), HostBookError> {
        let mut contents = serde_json::to_string_pretty(self)?;
        contents.push('\n');
        let staging = staging_path(path);
        fs::write(&staging, contents)?;
        if let Err(err) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        Ok(())
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn get(&self, title: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.title == title)
    }

    /// Adds `host`, replacing any host with the same title in place.
    /// Hosts that could not be woken are rejected.
    pub fn upsert(&mut self, host: Host) -> Result<Change, HostBookError> {
        if let Err(source) = host.wake_target() {
            return Err(HostBookError::InvalidHost {
                title: host.title,
                source,
            });
        }
        match self.hosts.iter_mut().find(|h| h.title == host.title) {
            Some(existing) => {
                *existing = host;
                Ok(Change::Updated)
            }
            None => {
                self.hosts.push(host);
                Ok(Change::Inserted)
            }
        }
    }

    pub fn remove(&mut self, title: &str) -> Option<Host> {
        let index = self.hosts.iter().position(|h| h.title == title)?;
        Some(self.hosts.remove(index))
    }
}
