use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;

/// Port probed when the settings don't say otherwise
pub const BGP_PORT: u16 = 179;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of a TCP connect attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Reachability {
    Open,
    /// Refused, unreachable or timed out (no code)
    Closed { code: Option<i32> },
    /// The attempt itself failed (E.g. name resolution)
    Error { reason: String },
}

impl Reachability {
    pub fn is_open(&self) -> bool {
        matches!(self, Reachability::Open)
    }
}

impl From<io::Error> for Reachability {
    fn from(err: io::Error) -> Self {
        if let Some(code) = err.raw_os_error() {
            return Reachability::Closed { code: Some(code) };
        }
        match err.kind() {
            io::ErrorKind::TimedOut => Reachability::Closed { code: None },
            _ => Reachability::Error {
                reason: err.to_string(),
            },
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Reachability::Open => write!(f, "open"),
            Reachability::Closed { code: Some(code) } => write!(f, "closed ({})", code),
            Reachability::Closed { code: None } => write!(f, "closed (timeout)"),
            Reachability::Error { reason } => write!(f, "error ({})", reason),
        }
    }
}

/// Open then close a TCP connection to `host:port`
pub async fn tcping(host: &str, port: u16, limit: Duration) -> Reachability {
    let attempt = async {
        let addr = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no address found"))?;
        TcpStream::connect(addr).await
    };
    let reachability = match timeout(limit, attempt).await {
        Ok(Ok(_stream)) => Reachability::Open,
        Ok(Err(err)) => Reachability::from(err),
        Err(_) => Reachability::Closed { code: None },
    };
    debug!("tcping {}:{} -> {}", host, port, reachability);
    reachability
}

/// Checks whether a neighbor answers on its BGP port
#[async_trait]
pub trait Probe: Sync {
    fn port(&self) -> u16;
    async fn probe(&self, host: &str, port: u16) -> Reachability;
}

#[derive(Clone, Copy, Debug)]
pub struct TcpProbe {
    pub port: u16,
    pub timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            port: BGP_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn port(&self) -> u16 {
        self.port
    }

    async fn probe(&self, host: &str, port: u16) -> Reachability {
        tcping(host, port, self.timeout).await
    }
}
