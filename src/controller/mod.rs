//! Operations over a loaded Config: lookups, maintenance toggles,
//! state files and health/reachability checks
mod neighbor;
mod probe;
mod process;
pub mod shell;

pub use neighbor::{get_neighbor, list_neighbors, status_neighbors, NeighborStatus};
pub use probe::{tcping, Probe, Reachability, TcpProbe, BGP_PORT, DEFAULT_TIMEOUT};
pub use process::{
    disable_process, enable_process, get_process, list_disabled_processes,
    list_enabled_processes, list_processes, state_path, state_process, status_processes,
    HealthState, ProcessStatus, NO_STATE, UNKNOWN_STATE,
};
