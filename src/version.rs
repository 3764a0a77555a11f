use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use log::debug;
use serde::Serialize;

use crate::controller::shell;
use crate::error::{Error, Result};

/// How long `exabgp --version` may take before it is reported as unknown
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(2);

/// Version of exabgpctl, of the ExaBGP install and of the host
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionInfo(BTreeMap<String, String>);

impl VersionInfo {
    pub const KEYS: [&'static str; 3] = ["exabgp", "exabgpctl", "os"];

    pub async fn collect(exabgp_bin: &str) -> Self {
        Self::collect_within(exabgp_bin, VERSION_TIMEOUT).await
    }

    pub async fn collect_within(exabgp_bin: &str, limit: Duration) -> Self {
        let mut versions = BTreeMap::new();
        versions.insert(
            String::from("exabgpctl"),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        versions.insert(
            String::from("exabgp"),
            exabgp_version(exabgp_bin, limit).await,
        );
        versions.insert(String::from("os"), platform());
        Self(versions)
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownVersionKey(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }
}

/// First line of `exabgp --version` (E.g. "ExaBGP : 4.2.21")
async fn exabgp_version(exabgp_bin: &str, limit: Duration) -> String {
    let cmd = format!("{} --version", exabgp_bin);
    match shell::exec(&cmd, limit).await {
        Ok(result) if result.success() => {
            version_from_line(result.stdout.lines().next().unwrap_or_default())
        }
        Ok(result) if result.timed_out => String::from("unknown"),
        Ok(result) => {
            debug!(
                "'{}' exited with {:?}: {}",
                cmd, result.exit_code, result.stderr
            );
            String::from("unknown")
        }
        Err(err) => {
            debug!("Unable to run '{}': {}", cmd, err);
            String::from("unknown")
        }
    }
}

/// Keep only the number when the line is "ExaBGP : 4.2.21"
fn version_from_line(line: &str) -> String {
    let version = line.rsplit(':').next().unwrap_or_default().trim();
    if version.is_empty() {
        String::from("unknown")
    } else {
        version.to_string()
    }
}

/// Like "Linux-6.1.0-13-amd64-x86_64"
fn platform() -> String {
    let os = std::env::consts::OS;
    let mut name: String = os
        .chars()
        .take(1)
        .flat_map(char::to_uppercase)
        .chain(os.chars().skip(1))
        .collect();
    if let Ok(release) = fs::read_to_string("/proc/sys/kernel/osrelease") {
        name.push('-');
        name.push_str(release.trim());
    }
    name.push('-');
    name.push_str(std::env::consts::ARCH);
    name
}
