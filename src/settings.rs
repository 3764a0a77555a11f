//! exabgpctl's own settings: where ExaBGP lives and how to probe it
//!
//! Values come from (highest first) command line flags / environment,
//! an optional TOML file, then built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Read when `--settings` isn't given, ignored if missing
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/exabgp/exabgpctl.toml";

struct Defaults {}

impl Defaults {
    fn conf() -> PathBuf {
        PathBuf::from("/etc/exabgp/exabgp.conf")
    }

    fn state() -> PathBuf {
        PathBuf::from("/var/lib/exabgp/status")
    }

    fn bgp_port() -> u16 {
        179
    }

    fn probe_timeout_ms() -> u64 {
        1000
    }

    fn exabgp_bin() -> String {
        String::from("exabgp")
    }
}

/// Settings (toml) file representation
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSpec {
    conf: Option<PathBuf>,
    state: Option<PathBuf>,
    bgp_port: Option<u16>,
    probe_timeout_ms: Option<u64>,
    exabgp_bin: Option<String>,
}

impl SettingsSpec {
    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::io(format!("Reading {}", path.display()), err))?;
        toml::from_str(&contents).map_err(|err| Error::Settings {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// ExaBGP configuration file
    pub conf: PathBuf,
    /// Directory holding per-process state files
    pub state: PathBuf,
    /// Port probed on neighbors
    pub bgp_port: u16,
    pub probe_timeout: Duration,
    pub exabgp_bin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_spec(SettingsSpec::default())
    }
}

impl Settings {
    fn from_spec(spec: SettingsSpec) -> Self {
        Self {
            conf: spec.conf.unwrap_or_else(Defaults::conf),
            state: spec.state.unwrap_or_else(Defaults::state),
            bgp_port: spec.bgp_port.unwrap_or_else(Defaults::bgp_port),
            probe_timeout: Duration::from_millis(
                spec.probe_timeout_ms.unwrap_or_else(Defaults::probe_timeout_ms),
            ),
            exabgp_bin: spec.exabgp_bin.unwrap_or_else(Defaults::exabgp_bin),
        }
    }

    /// Merge flags/environment over the settings file over defaults.
    /// An explicit `file` must exist; the default location is optional.
    pub fn resolve(conf: Option<PathBuf>, state: Option<PathBuf>, file: Option<&Path>) -> Result<Self> {
        let spec = match file {
            Some(path) => SettingsSpec::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_SETTINGS_PATH);
                if default.exists() {
                    SettingsSpec::from_file(default)?
                } else {
                    SettingsSpec::default()
                }
            }
        };
        let mut settings = Self::from_spec(spec);
        if let Some(conf) = conf {
            settings.conf = conf;
        }
        if let Some(state) = state {
            settings.state = state;
        }
        debug!("Using settings: {:?}", settings);
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.conf, PathBuf::from("/etc/exabgp/exabgp.conf"));
        assert_eq!(settings.state, PathBuf::from("/var/lib/exabgp/status"));
        assert_eq!(settings.bgp_port, 179);
        assert_eq!(settings.probe_timeout, Duration::from_secs(1));
        assert_eq!(settings.exabgp_bin, "exabgp");
    }

    #[test]
    fn test_resolve_file_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "conf = \"/srv/exabgp.conf\"\nstate = \"/srv/state\"\nbgp_port = 1179\nprobe_timeout_ms = 250"
        )
        .unwrap();

        let settings = Settings::resolve(None, None, Some(file.path())).unwrap();
        assert_eq!(settings.conf, PathBuf::from("/srv/exabgp.conf"));
        assert_eq!(settings.state, PathBuf::from("/srv/state"));
        assert_eq!(settings.bgp_port, 1179);
        assert_eq!(settings.probe_timeout, Duration::from_millis(250));
        assert_eq!(settings.exabgp_bin, "exabgp");

        let settings = Settings::resolve(
            Some(PathBuf::from("/tmp/exabgp.conf")),
            None,
            Some(file.path()),
        )
        .unwrap();
        assert_eq!(settings.conf, PathBuf::from("/tmp/exabgp.conf"));
        assert_eq!(settings.state, PathBuf::from("/srv/state"));
    }

    #[test]
    fn test_resolve_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bgp_prot = 1179").unwrap();
        assert!(matches!(
            Settings::resolve(None, None, Some(file.path())),
            Err(Error::Settings { .. })
        ));
        assert!(matches!(
            Settings::resolve(None, None, Some(Path::new("/nonexistent/exabgpctl.toml"))),
            Err(Error::Io { .. })
        ));
    }
}
