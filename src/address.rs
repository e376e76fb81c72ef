//! Server address file.
//!
//! Both endpoints read the quiz server's address from a two-line text file:
//! line 1 is the host, line 2 the decimal port. The server validates what it
//! finds, falls back to `localhost:1234` for anything unusable, and writes
//! the chosen pair back. The client only parses and never validates.
//!
//! The interface and port checks are check-then-bind: the port can be taken
//! between the check and the real bind, which then fails at startup.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 1234;
pub const DEFAULT_INFO_FILE: &str = "server_info.txt";

/// Resolved host and port of the quiz server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Address file errors
#[derive(Debug)]
pub enum AddressError {
    FileRead(PathBuf, io::Error),
    FileWrite(PathBuf, io::Error),
    MissingHost,
    MissingPort,
    InvalidPort(String),
    PortOutOfRange(i64),
    Unresolvable(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::FileRead(path, e) => {
                write!(f, "Failed to read address file '{}': {}", path.display(), e)
            }
            AddressError::FileWrite(path, e) => {
                write!(f, "Failed to write address file '{}': {}", path.display(), e)
            }
            AddressError::MissingHost => write!(f, "Missing host line"),
            AddressError::MissingPort => write!(f, "Missing port line"),
            AddressError::InvalidPort(text) => write!(f, "Invalid port: {}", text),
            AddressError::PortOutOfRange(port) => write!(f, "Port out of range: {}", port),
            AddressError::Unresolvable(host) => write!(f, "Cannot resolve host: {}", host),
        }
    }
}

impl std::error::Error for AddressError {}

impl ServerInfo {
    /// Parse the two-line format.
    pub fn parse(contents: &str) -> Result<Self, AddressError> {
        let mut lines = contents.lines();
        let host = parse_host(lines.next())?;
        let port = parse_port(lines.next())?;
        Ok(ServerInfo { host, port })
    }

    /// Two-line file form, as written by the server.
    pub fn to_file_contents(&self) -> String {
        format!("{}\n{}\n", self.host, self.port)
    }

    /// Load the address for the client, silently defaulting on any problem.
    pub fn load_for_client(path: &Path) -> Self {
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| AddressError::FileRead(path.to_path_buf(), e))
            .and_then(|contents| ServerInfo::parse(&contents));

        match parsed {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Unusable address file, using defaults");
                ServerInfo::default()
            }
        }
    }

    /// Load, validate and persist the address for the server.
    ///
    /// Host and port fall back to their defaults independently. A missing
    /// or unreadable file yields the defaults and is left untouched.
    pub fn resolve_for_server(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No address file, using defaults");
            return ServerInfo::default();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                let e = AddressError::FileRead(path.to_path_buf(), e);
                warn!(error = %e, "Using defaults");
                return ServerInfo::default();
            }
        };

        let mut lines = contents.lines();

        let host = match parse_host(lines.next()) {
            Ok(host) if is_local_host(&host) => host,
            Ok(host) => {
                warn!(%host, "Host is not bound to a local interface, using default");
                DEFAULT_HOST.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Using default host");
                DEFAULT_HOST.to_string()
            }
        };

        let port = match parse_port(lines.next()) {
            Ok(port) if is_port_available(&host, port) => port,
            Ok(port) => {
                warn!(port, "Port is already in use, using default");
                DEFAULT_PORT
            }
            Err(e) => {
                warn!(error = %e, "Using default port");
                DEFAULT_PORT
            }
        };

        let info = ServerInfo { host, port };
        if let Err(e) = info.save(path) {
            warn!(error = %e, "Could not persist server address");
        }

        info!(host = %info.host, port = info.port, "Loaded server address");
        info
    }

    /// Write the two-line form to `path`.
    pub fn save(&self, path: &Path) -> Result<(), AddressError> {
        std::fs::write(path, self.to_file_contents())
            .map_err(|e| AddressError::FileWrite(path.to_path_buf(), e))
    }

    /// Resolve to the first matching socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddressError> {
        resolve(&self.host, self.port)
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| AddressError::Unresolvable(self.host.clone()))
    }
}

fn parse_host(line: Option<&str>) -> Result<String, AddressError> {
    match line.map(str::trim) {
        Some(host) if !host.is_empty() => Ok(host.to_string()),
        _ => Err(AddressError::MissingHost),
    }
}

fn parse_port(line: Option<&str>) -> Result<u16, AddressError> {
    let text = match line.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Err(AddressError::MissingPort),
    };

    let port: i64 = text
        .parse()
        .map_err(|_| AddressError::InvalidPort(text.to_string()))?;

    u16::try_from(port).map_err(|_| AddressError::PortOutOfRange(port))
}

fn resolve(host: &str, port: u16) -> Option<std::vec::IntoIter<SocketAddr>> {
    (host, port).to_socket_addrs().ok()
}

/// True if `host` resolves to an address some local interface owns.
///
/// Checked by binding an ephemeral port, which only succeeds for local
/// addresses.
fn is_local_host(host: &str) -> bool {
    match resolve(host, 0) {
        Some(mut addrs) => addrs.any(|addr| try_bind(addr).is_ok()),
        None => false,
    }
}

/// True if `port` can currently be bound on `host`.
fn is_port_available(host: &str, port: u16) -> bool {
    match resolve(host, port).and_then(|mut addrs| addrs.next()) {
        Some(addr) => try_bind(addr).is_ok(),
        None => false,
    }
}

fn try_bind(addr: SocketAddr) -> io::Result<()> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;
    // Same options as the real listener, so TIME_WAIT leftovers don't count.
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())
}
