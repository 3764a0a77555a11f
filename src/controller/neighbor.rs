use std::collections::BTreeMap;

use futures::future::join_all;
use serde::Serialize;

use super::probe::{Probe, Reachability};
use crate::config::{Config, NeighborRecord};
use crate::error::{Error, Result};

/// Neighbor names, in configuration order
pub fn list_neighbors(cfg: &Config) -> Vec<&str> {
    cfg.neighbors.iter().map(|n| n.name.as_str()).collect()
}

pub fn get_neighbor<'a>(cfg: &'a Config, name: &str) -> Result<&'a NeighborRecord> {
    cfg.neighbors
        .iter()
        .find(|n| n.name == name)
        .ok_or_else(|| Error::NeighborNotFound(name.to_string()))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NeighborStatus {
    /// Peer accepted a TCP connection on its BGP port
    pub status: bool,
    pub status_addressport: (String, u16),
    pub reachability: Reachability,
}

/// Probe every neighbor's peer address, side by side
pub async fn status_neighbors<P: Probe>(cfg: &Config, probe: &P) -> BTreeMap<String, NeighborStatus> {
    let port = probe.port();
    let probes = cfg.neighbors.iter().map(|neighbor| async move {
        let host = neighbor.peer_address.to_string();
        let reachability = probe.probe(&host, port).await;
        let status = NeighborStatus {
            status: reachability.is_open(),
            status_addressport: (host, port),
            reachability,
        };
        (neighbor.name.clone(), status)
    });
    join_all(probes).await.into_iter().collect()
}
