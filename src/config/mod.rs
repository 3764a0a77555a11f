mod file;
mod ip;
mod neighbor;
mod process;

pub use file::{parse, Section, Statement};
pub use ip::{IpInfo, IpMap};
pub use neighbor::{ApiBinding, NeighborRecord, ProtocolCounters};
pub use process::{HealthcheckRun, ProcessRecord};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::version::VersionInfo;

/// Check paths, read the ExaBGP config and return the normalized Config.
/// Versions are left empty, see [`VersionInfo::collect`].
pub fn load(settings: &Settings) -> Result<Config> {
    if !settings.conf.exists() {
        return Err(Error::ConfigNotFound(settings.conf.clone()));
    }
    if !settings.state.exists() {
        return Err(Error::StateDirNotFound(settings.state.clone()));
    }
    let root = Section::from_file(&settings.conf)?;
    let config = Config::from_root(
        &root,
        &settings.conf,
        &settings.state,
        VersionInfo::default(),
    )?;
    debug!(
        "Found {} processes and {} neighbors in {}",
        config.processes.len(),
        config.neighbors.len(),
        settings.conf.display()
    );
    Ok(config)
}

/// Everything exabgpctl knows about an ExaBGP instance, rebuilt on each run
#[derive(Debug, Serialize)]
pub struct Config {
    pub path: PathBuf,
    pub state: PathBuf,
    pub version: VersionInfo,
    pub processes: Vec<ProcessRecord>,
    pub neighbors: Vec<NeighborRecord>,
}

impl Config {
    pub fn from_root(
        root: &Section,
        path: &Path,
        state: &Path,
        version: VersionInfo,
    ) -> Result<Self> {
        let templates: HashMap<&str, &Section> = root
            .sections_of("template")
            .flat_map(|template| template.sections_of("neighbor"))
            .filter_map(|neighbor| neighbor.name().map(|name| (name, neighbor)))
            .collect();

        let mut processes: Vec<ProcessRecord> = Vec::new();
        let mut neighbors: Vec<NeighborRecord> = Vec::new();
        let mut add_process = |section: &Section| -> Result<()> {
            let process = ProcessRecord::from_section(section)?;
            if processes.iter().any(|p| p.name == process.name) {
                return Err(Error::DuplicateProcess(process.name));
            }
            processes.push(process);
            Ok(())
        };
        let mut add_neighbor = |section: &Section, group: Option<&Section>| -> Result<()> {
            let mut inherited: Vec<&Section> = Vec::new();
            for stmt in section.statements.iter().filter(|s| s.keyword() == "inherit") {
                for name in stmt.args() {
                    let template = templates.get(name.as_str()).ok_or_else(|| {
                        Error::InvalidNeighbor {
                            neighbor: section.name().unwrap_or_default().to_string(),
                            reason: format!("unknown template '{}'", name),
                        }
                    })?;
                    inherited.push(*template);
                }
            }
            inherited.extend(group);
            let neighbor = NeighborRecord::from_section(section, &inherited)?;
            if neighbors.iter().any(|n| n.name == neighbor.name) {
                return Err(Error::DuplicateNeighbor(neighbor.name));
            }
            neighbors.push(neighbor);
            Ok(())
        };

        for section in &root.sections {
            match section.kind() {
                "process" => add_process(section)?,
                "neighbor" => {
                    // ExaBGP 3.x also declares processes inside neighbors
                    for child in section.sections_of("process") {
                        add_process(child)?;
                    }
                    add_neighbor(section, None)?
                }
                // ExaBGP 3.x groups neighbors and their processes
                "group" => {
                    for child in section.sections_of("process") {
                        add_process(child)?;
                    }
                    for child in section.sections_of("neighbor") {
                        for process in child.sections_of("process") {
                            add_process(process)?;
                        }
                        add_neighbor(child, Some(section))?;
                    }
                }
                "template" => (),
                other => debug!("Ignoring section '{}' line {}", other, section.line),
            }
        }

        let declared: HashSet<&str> = processes.iter().map(|p| p.name.as_str()).collect();
        for neighbor in &neighbors {
            for process in neighbor.api_processes() {
                if !declared.contains(process) {
                    return Err(Error::UnknownProcess {
                        neighbor: neighbor.name.clone(),
                        process: process.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            state: state.to_path_buf(),
            version,
            processes,
            neighbors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn demo_path(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
    }

    fn from_text(text: &str) -> Result<Config> {
        let root = parse(text)?;
        Config::from_root(
            &root,
            Path::new("/etc/exabgp/exabgp.conf"),
            Path::new("/tmp"),
            VersionInfo::default(),
        )
    }

    #[test]
    fn test_load_missing_paths() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.conf = dir.path().join("missing.conf");
        settings.state = dir.path().to_path_buf();
        match load(&settings) {
            Err(Error::ConfigNotFound(path)) => assert_eq!(path, settings.conf),
            other => panic!("Unexpected result: {:?}", other),
        }

        settings.conf = demo_path("exabgp.conf");
        settings.state = dir.path().join("missing");
        match load(&settings) {
            Err(Error::StateDirNotFound(path)) => assert_eq!(path, settings.state),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_load_demo() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.conf = demo_path("exabgp.conf");
        settings.state = dir.path().to_path_buf();
        let config = load(&settings).unwrap();
        assert_eq!(config.path, settings.conf);
        assert_eq!(config.state, settings.state);
        assert_eq!(config.version, VersionInfo::default());

        let mut names: Vec<_> = config.processes.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec!["service1.exabgp.lan", "service2.exabgp.lan", "service3.exabgp.lan"]
        );
        let mut names: Vec<_> = config.neighbors.iter().map(|n| n.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["192.168.0.1", "192.168.0.2"]);

        let process = &config.processes[0];
        assert_eq!(
            process.run.disable,
            Some(PathBuf::from(format!(
                "/tmp/exabgp/maintenance/{}",
                process.name
            )))
        );
        assert_eq!(process.run.community.as_deref(), Some("11223:344"));
        let neighbor = &config.neighbors[0];
        assert_eq!(neighbor.local_as, 12345);
        assert_eq!(neighbor.peer_as, 67890);
    }

    #[test]
    fn test_load_groups() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.conf = demo_path("exabgp3.conf");
        settings.state = dir.path().to_path_buf();
        let config = load(&settings).unwrap();
        assert_eq!(config.processes.len(), 2);
        assert_eq!(config.neighbors.len(), 2);
        for neighbor in &config.neighbors {
            assert_eq!(neighbor.local_as, 12345);
            assert_eq!(neighbor.router_id, Some("192.168.1.1".parse().unwrap()));
        }
    }

    #[test]
    fn test_processes_inside_neighbors() {
        let config = from_text(
            r#"
            neighbor 10.0.0.1 {
                local-as 1; peer-as 2;
                process svc { run /usr/bin/exabgp-healthcheck --cmd /bin/true --disable /tmp/svc; }
            }
            group anycast {
                local-as 1; peer-as 2;
                neighbor 10.0.0.2 {
                    process dns { run /usr/bin/exabgp-healthcheck --cmd /bin/true; }
                }
            }
            "#,
        )
        .unwrap();
        let names: Vec<_> = config.processes.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["svc", "dns"]);
        assert_eq!(config.neighbors.len(), 2);
        assert_eq!(
            config.processes[0].maintenance_file(),
            Some(&PathBuf::from("/tmp/svc"))
        );

        let nested = "neighbor 10.0.0.1 { local-as 1; peer-as 2; \
                      process svc { run /usr/bin/exabgp-healthcheck --cmd /bin/true; } }";
        let top = "process svc { run /usr/bin/exabgp-healthcheck --cmd /bin/true; }";
        match from_text(&format!("{}\n{}", top, nested)) {
            Err(Error::DuplicateProcess(name)) => assert_eq!(name, "svc"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicates() {
        let process = "process a { run /usr/bin/exabgp-healthcheck --cmd /bin/true; }";
        match from_text(&format!("{}\n{}", process, process)) {
            Err(Error::DuplicateProcess(name)) => assert_eq!(name, "a"),
            other => panic!("Unexpected result: {:?}", other),
        }
        let neighbor = "neighbor 10.0.0.1 { local-as 1; peer-as 2; }";
        match from_text(&format!("{}\n{}", neighbor, neighbor)) {
            Err(Error::DuplicateNeighbor(name)) => assert_eq!(name, "10.0.0.1"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_references() {
        match from_text("neighbor 10.0.0.1 { local-as 1; peer-as 2; api { processes [ ghost ]; } }") {
            Err(Error::UnknownProcess { neighbor, process }) => {
                assert_eq!(neighbor, "10.0.0.1");
                assert_eq!(process, "ghost");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(matches!(
            from_text("neighbor 10.0.0.1 { inherit nope; local-as 1; peer-as 2; }"),
            Err(Error::InvalidNeighbor { .. })
        ));
        let config = from_text("environment { log { level INFO; } }").unwrap();
        assert!(config.processes.is_empty());
        assert!(config.neighbors.is_empty());
    }
}
