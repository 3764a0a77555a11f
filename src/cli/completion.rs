//! Candidates for shell completion, see demos/exabgpctl.bash
use crate::config::Config;
use crate::controller::{list_disabled_processes, list_enabled_processes, list_neighbors, list_processes};
use crate::output::OutputFormat;
use crate::version::VersionInfo;

#[derive(clap::ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompleteTarget {
    Output,
    /// Any process
    Process,
    /// Processes that can be enabled (currently disabled)
    ProcessEnable,
    /// Processes that can be disabled (currently enabled)
    ProcessDisable,
    Neighbor,
    VersionKey,
}

/// Lowercased names starting with `incomplete` (case-insensitive).
/// Targets needing a config yield nothing without one.
pub fn candidates(
    target: CompleteTarget,
    cfg: Option<&Config>,
    incomplete: &str,
) -> Vec<String> {
    let names: Vec<&str> = match (target, cfg) {
        (CompleteTarget::Output, _) => OutputFormat::NAMES.to_vec(),
        (CompleteTarget::VersionKey, _) => VersionInfo::KEYS.to_vec(),
        (CompleteTarget::Process, Some(cfg)) => list_processes(cfg),
        (CompleteTarget::ProcessEnable, Some(cfg)) => list_disabled_processes(cfg),
        (CompleteTarget::ProcessDisable, Some(cfg)) => list_enabled_processes(cfg),
        (CompleteTarget::Neighbor, Some(cfg)) => list_neighbors(cfg),
        (_, None) => Vec::new(),
    };
    let incomplete = incomplete.to_lowercase();
    let mut names: Vec<String> = names
        .into_iter()
        .map(str::to_lowercase)
        .filter(|name| name.starts_with(&incomplete))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;
    use crate::controller::disable_process;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn test_static_targets() {
        assert_eq!(
            candidates(CompleteTarget::Output, None, ""),
            vec!["flat", "json", "yaml"]
        );
        assert_eq!(
            candidates(CompleteTarget::Output, None, "J"),
            vec!["json"]
        );
        assert_eq!(
            candidates(CompleteTarget::VersionKey, None, "exa"),
            vec!["exabgp", "exabgpctl"]
        );
        assert!(candidates(CompleteTarget::Process, None, "").is_empty());
    }

    #[test]
    fn test_config_targets() {
        let dir = tempdir().unwrap();
        let text = format!(
            r#"
            process Web1 {{ run /usr/bin/exabgp-healthcheck --cmd true --disable {dir}/web1; }}
            process web2 {{ run /usr/bin/exabgp-healthcheck --cmd true --disable {dir}/web2; }}
            process dns {{ run /usr/bin/exabgp-healthcheck --cmd true --disable {dir}/dns; }}
            neighbor 10.0.0.1 {{ local-as 1; peer-as 2; }}
            "#,
            dir = dir.path().display()
        );
        let cfg = Config::from_root(
            &parse(&text).unwrap(),
            Path::new("/etc/exabgp/exabgp.conf"),
            dir.path(),
            VersionInfo::default(),
        )
        .unwrap();
        disable_process(&cfg, "web2").unwrap();

        assert_eq!(
            candidates(CompleteTarget::Process, Some(&cfg), "WEB"),
            vec!["web1", "web2"]
        );
        assert_eq!(
            candidates(CompleteTarget::ProcessEnable, Some(&cfg), ""),
            vec!["web2"]
        );
        assert_eq!(
            candidates(CompleteTarget::ProcessDisable, Some(&cfg), ""),
            vec!["dns", "web1"]
        );
        assert_eq!(
            candidates(CompleteTarget::Neighbor, Some(&cfg), "10."),
            vec!["10.0.0.1"]
        );
    }
}
