use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;

use super::shell;
use crate::config::{Config, ProcessRecord};
use crate::error::{Error, Result};

/// Written by `state` when the healthcheck hook didn't export STATE
pub const NO_STATE: &str = "no state found";
/// Reported by `status` when a process has no state file yet
pub const UNKNOWN_STATE: &str = "UNKNOWN";

/// States the healthcheck helper reports through its `--execute` hooks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthState {
    Init,
    Disabled,
    Rising,
    Falling,
    Up,
    Down,
    Exit,
    End,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            HealthState::Init => "INIT",
            HealthState::Disabled => "DISABLED",
            HealthState::Rising => "RISING",
            HealthState::Falling => "FALLING",
            HealthState::Up => "UP",
            HealthState::Down => "DOWN",
            HealthState::Exit => "EXIT",
            HealthState::End => "END",
        };
        write!(f, "{}", word)
    }
}

impl FromStr for HealthState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(HealthState::Init),
            "DISABLED" => Ok(HealthState::Disabled),
            "RISING" => Ok(HealthState::Rising),
            "FALLING" => Ok(HealthState::Falling),
            "UP" => Ok(HealthState::Up),
            "DOWN" => Ok(HealthState::Down),
            "EXIT" => Ok(HealthState::Exit),
            "END" => Ok(HealthState::End),
            _ => Err(format!("Unknown healthcheck state: {}", s)),
        }
    }
}

/// Process names, in configuration order
pub fn list_processes(cfg: &Config) -> Vec<&str> {
    cfg.processes.iter().map(|p| p.name.as_str()).collect()
}

pub fn get_process<'a>(cfg: &'a Config, name: &str) -> Result<&'a ProcessRecord> {
    cfg.processes
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| Error::ProcessNotFound(name.to_string()))
}

fn is_disabled(process: &ProcessRecord) -> bool {
    process
        .maintenance_file()
        .map(|path| path.exists())
        .unwrap_or(false)
}

/// Processes whose maintenance file exists
pub fn list_disabled_processes(cfg: &Config) -> Vec<&str> {
    cfg.processes
        .iter()
        .filter(|p| is_disabled(p))
        .map(|p| p.name.as_str())
        .collect()
}

pub fn list_enabled_processes(cfg: &Config) -> Vec<&str> {
    cfg.processes
        .iter()
        .filter(|p| !is_disabled(p))
        .map(|p| p.name.as_str())
        .collect()
}

fn maintenance_file<'a>(cfg: &'a Config, name: &str) -> Result<&'a PathBuf> {
    get_process(cfg, name)?
        .maintenance_file()
        .ok_or_else(|| Error::NoMaintenanceFile(name.to_string()))
}

/// Create the maintenance file, returns whether the process is now disabled
pub fn disable_process(cfg: &Config, name: &str) -> Result<bool> {
    let path = maintenance_file(cfg, name)?;
    if !path.exists() {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| Error::io(format!("Creating {}", path.display()), err))?;
        info!("Disabled {} ({} created)", name, path.display());
    }
    Ok(path.exists())
}

/// Remove the maintenance file, returns whether the process is now enabled
pub fn enable_process(cfg: &Config, name: &str) -> Result<bool> {
    let path = maintenance_file(cfg, name)?;
    if path.exists() {
        fs::remove_file(path)
            .map_err(|err| Error::io(format!("Removing {}", path.display()), err))?;
        info!("Enabled {} ({} removed)", name, path.display());
    }
    Ok(!path.exists())
}

pub fn state_path(cfg: &Config, name: &str) -> PathBuf {
    cfg.state.join(name)
}

/// Record the last state reported for a process and return it
pub fn state_process(cfg: &Config, name: &str, state: Option<&str>) -> Result<String> {
    get_process(cfg, name)?;
    let state = state.unwrap_or(NO_STATE);
    if let Err(err) = state.parse::<HealthState>() {
        warn!("{} for process {}", err, name);
    }
    let path = state_path(cfg, name);
    fs::write(&path, state).map_err(|err| Error::io(format!("Writing {}", path.display()), err))?;
    debug!("Wrote state {} to {}", state, path.display());
    Ok(state.to_string())
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessStatus {
    pub state: String,
    pub state_path: PathBuf,
    /// Health command exited 0 within the process timeout
    pub command: bool,
    pub command_check: Option<String>,
}

async fn process_status(cfg: &Config, process: &ProcessRecord) -> ProcessStatus {
    let state_path = state_path(cfg, &process.name);
    let state = fs::read_to_string(&state_path)
        .map(|state| state.trim().to_string())
        .unwrap_or_else(|_| String::from(UNKNOWN_STATE));
    let command_check = process.run.command.clone();
    let command = match &command_check {
        Some(cmd) => shell::check(cmd, Duration::from_secs(process.run.timeout)).await,
        None => false,
    };
    ProcessStatus {
        state,
        state_path,
        command,
        command_check,
    }
}

/// State file and health command result of every process.
/// Health commands run side by side.
pub async fn status_processes(cfg: &Config) -> BTreeMap<String, ProcessStatus> {
    let statuses = join_all(cfg.processes.iter().map(|p| process_status(cfg, p))).await;
    cfg.processes
        .iter()
        .map(|p| p.name.clone())
        .zip(statuses)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::version::VersionInfo;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn config(dir: &TempDir) -> Config {
        let text = format!(
            r#"
            process up {{
                run /usr/bin/python3 -m exabgp healthcheck --cmd "exit 0" --disable {dir}/up.disabled;
            }}
            process down {{
                run /usr/bin/python3 -m exabgp healthcheck --cmd "exit 1" --disable {dir}/down.disabled;
            }}
            process plain {{
                run /usr/local/bin/exabgp-healthcheck --timeout 1;
            }}
            "#,
            dir = dir.path().display()
        );
        let root = parse(&text).unwrap();
        Config::from_root(
            &root,
            Path::new("/etc/exabgp/exabgp.conf"),
            dir.path(),
            VersionInfo::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_get_process() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        assert_eq!(list_processes(&cfg), vec!["up", "down", "plain"]);
        assert_eq!(get_process(&cfg, "down").unwrap().name, "down");
        match get_process(&cfg, "sideways") {
            Err(Error::ProcessNotFound(name)) => assert_eq!(name, "sideways"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_enable_disable() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        let flag = dir.path().join("up.disabled");

        assert!(disable_process(&cfg, "up").unwrap());
        assert!(flag.exists());
        assert!(disable_process(&cfg, "up").unwrap());
        assert_eq!(list_disabled_processes(&cfg), vec!["up"]);
        assert_eq!(list_enabled_processes(&cfg), vec!["down", "plain"]);

        assert!(enable_process(&cfg, "up").unwrap());
        assert!(!flag.exists());
        assert!(enable_process(&cfg, "up").unwrap());
        assert!(list_disabled_processes(&cfg).is_empty());
        assert_eq!(list_enabled_processes(&cfg).len(), 3);
    }

    #[test]
    fn test_no_maintenance_file() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        match disable_process(&cfg, "plain") {
            Err(Error::NoMaintenanceFile(name)) => assert_eq!(name, "plain"),
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(matches!(
            enable_process(&cfg, "plain"),
            Err(Error::NoMaintenanceFile(_))
        ));
        assert!(matches!(
            enable_process(&cfg, "sideways"),
            Err(Error::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_state_process() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        assert_eq!(state_process(&cfg, "up", Some("RISING")).unwrap(), "RISING");
        assert_eq!(
            fs::read_to_string(dir.path().join("up")).unwrap(),
            "RISING"
        );
        assert_eq!(state_process(&cfg, "down", None).unwrap(), NO_STATE);
        // Unknown states are still recorded
        assert_eq!(state_process(&cfg, "down", Some("MAYBE")).unwrap(), "MAYBE");
        assert!(matches!(
            state_process(&cfg, "sideways", Some("UP")),
            Err(Error::ProcessNotFound(_))
        ));
    }

    #[test]
    fn test_health_state() {
        for word in &["INIT", "DISABLED", "RISING", "FALLING", "UP", "DOWN", "EXIT", "END"] {
            let state: HealthState = word.parse().unwrap();
            assert_eq!(&state.to_string(), word);
        }
        assert!("up".parse::<HealthState>().is_err());
    }

    #[tokio::test]
    async fn test_status_processes() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir);
        state_process(&cfg, "up", Some("UP")).unwrap();

        let statuses = status_processes(&cfg).await;
        assert_eq!(statuses.len(), 3);
        assert_eq!(
            statuses["up"],
            ProcessStatus {
                state: String::from("UP"),
                state_path: dir.path().join("up"),
                command: true,
                command_check: Some(String::from("exit 0")),
            }
        );
        assert_eq!(statuses["down"].state, UNKNOWN_STATE);
        assert!(!statuses["down"].command);
        assert!(!statuses["plain"].command);
        assert_eq!(statuses["plain"].command_check, None);
    }
}
