use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use ipnetwork::IpNetwork;
use serde::Serialize;

use super::file::Section;
use super::ip::{describe_addr, describe_networks, IpMap};
use crate::error::{Error, Result};

/// Arguments accepted by the ExaBGP healthcheck helper, with its defaults
#[derive(Parser, Debug)]
#[clap(name = "healthcheck", rename_all = "kebab-case")]
struct HealthcheckArgs {
    #[clap(short, long)]
    name: Option<String>,
    #[clap(long)]
    disable: Option<PathBuf>,
    #[clap(short, long, alias = "cmd")]
    command: Option<String>,
    #[clap(long, default_value_t = 5)]
    timeout: u64,
    #[clap(long, default_value_t = 5)]
    interval: u64,
    #[clap(long, default_value_t = 1)]
    fast_interval: u64,
    #[clap(long, default_value_t = 3)]
    rise: u32,
    #[clap(long, default_value_t = 3)]
    fall: u32,
    #[clap(long = "ip", parse(try_from_str = parse_network))]
    ips: Vec<IpNetwork>,
    #[clap(long)]
    no_ip_setup: bool,
    #[clap(long = "dynamic")]
    ip_dynamic: bool,
    #[clap(long)]
    label: Option<String>,
    #[clap(long, default_value_t = 0)]
    start_ip: u32,
    #[clap(long)]
    deaggregate_networks: bool,
    #[clap(long)]
    next_hop: Option<IpAddr>,
    #[clap(long)]
    community: Option<String>,
    #[clap(long)]
    extended_community: Option<String>,
    #[clap(long)]
    large_community: Option<String>,
    #[clap(long)]
    as_path: Option<String>,
    #[clap(long)]
    withdraw_on_down: bool,
    #[clap(long, default_value_t = 100)]
    up_metric: u32,
    #[clap(long, default_value_t = 1000)]
    down_metric: u32,
    #[clap(long, default_value_t = 500)]
    disabled_metric: u32,
    #[clap(long)]
    local_preference: Option<u32>,
    #[clap(long)]
    path_id: Option<u32>,
    #[clap(long)]
    execute: Vec<String>,
    #[clap(long)]
    up_execute: Vec<String>,
    #[clap(long)]
    down_execute: Vec<String>,
    #[clap(long)]
    disabled_execute: Vec<String>,
    #[clap(long)]
    sudo: bool,
    #[clap(long)]
    user: Option<String>,
    #[clap(long)]
    group: Option<String>,
    #[clap(long)]
    pid: Option<PathBuf>,
    #[clap(short, long)]
    debug: bool,
    #[clap(short, long)]
    silent: bool,
    #[clap(long)]
    no_syslog: bool,
    #[clap(long, default_value = "daemon")]
    syslog_facility: String,
    #[clap(long)]
    no_ack: bool,
}

/// Networks must be given by their network address (10.0.0.0/24, not 10.0.0.1/24)
fn parse_network(value: &str) -> std::result::Result<IpNetwork, String> {
    let network: IpNetwork = value.parse().map_err(|err| format!("{}", err))?;
    if network.ip() != network.network() {
        return Err(format!("{} has host bits set", value));
    }
    Ok(network)
}

/// Normalized healthcheck settings of a process
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthcheckRun {
    pub name: Option<String>,
    pub command: Option<String>,
    /// Maintenance flag file: the process is disabled while it exists
    pub disable: Option<PathBuf>,
    pub timeout: u64,
    pub interval: u64,
    pub fast_interval: u64,
    pub rise: u32,
    pub fall: u32,
    pub ips: IpMap,
    pub next_hop: IpMap,
    pub ip_setup: bool,
    pub ip_dynamic: bool,
    pub label: Option<String>,
    pub start_ip: u32,
    pub deaggregate_networks: bool,
    pub community: Option<String>,
    pub extended_community: Option<String>,
    pub large_community: Option<String>,
    pub as_path: Option<String>,
    pub withdraw_on_down: bool,
    pub up_metric: u32,
    pub down_metric: u32,
    pub disabled_metric: u32,
    pub local_preference: Option<u32>,
    pub path_id: Option<u32>,
    pub execute: Vec<String>,
    pub up_execute: Vec<String>,
    pub down_execute: Vec<String>,
    pub disabled_execute: Vec<String>,
    pub sudo: bool,
    pub user: Option<String>,
    pub group: Option<String>,
    pub pid: Option<PathBuf>,
    pub debug: bool,
    pub silent: bool,
    pub syslog: bool,
    pub syslog_facility: String,
    pub ack: bool,
}

impl From<HealthcheckArgs> for HealthcheckRun {
    fn from(args: HealthcheckArgs) -> Self {
        Self {
            ips: describe_networks(&args.ips),
            next_hop: args.next_hop.map(describe_addr).unwrap_or_default(),
            name: args.name,
            command: args.command,
            disable: args.disable,
            timeout: args.timeout,
            interval: args.interval,
            fast_interval: args.fast_interval,
            rise: args.rise,
            fall: args.fall,
            ip_setup: !args.no_ip_setup,
            ip_dynamic: args.ip_dynamic,
            label: args.label,
            start_ip: args.start_ip,
            deaggregate_networks: args.deaggregate_networks,
            community: args.community,
            extended_community: args.extended_community,
            large_community: args.large_community,
            as_path: args.as_path,
            withdraw_on_down: args.withdraw_on_down,
            up_metric: args.up_metric,
            down_metric: args.down_metric,
            disabled_metric: args.disabled_metric,
            local_preference: args.local_preference,
            path_id: args.path_id,
            execute: args.execute,
            up_execute: args.up_execute,
            down_execute: args.down_execute,
            disabled_execute: args.disabled_execute,
            sudo: args.sudo,
            user: args.user,
            group: args.group,
            pid: args.pid,
            debug: args.debug,
            silent: args.silent,
            syslog: !args.no_syslog,
            syslog_facility: args.syslog_facility,
            ack: !args.no_ack,
        }
    }
}

/// Where the healthcheck options start in a `run` command line
///   `run /usr/bin/exabgp-healthcheck --cmd ...` or `run python -m exabgp healthcheck --cmd ...`
fn healthcheck_args(run: &[String]) -> &[String] {
    let start = run
        .iter()
        .take_while(|word| !word.starts_with("--"))
        .position(|word| {
            word == "healthcheck" || word.ends_with("/healthcheck") || word.ends_with("-healthcheck")
        })
        .map(|i| i + 1)
        .unwrap_or_else(|| run.len().min(1));
    &run[start..]
}

impl HealthcheckRun {
    /// Parse a process `run` command line
    pub fn parse(run: &[String]) -> std::result::Result<Self, String> {
        let argv = std::iter::once("healthcheck").chain(healthcheck_args(run).iter().map(String::as_str));
        HealthcheckArgs::try_parse_from(argv)
            .map(HealthcheckRun::from)
            .map_err(|err| {
                let message = err.to_string();
                message
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ")
                    .to_string()
            })
    }
}

/// A `process` declaration: an ExaBGP healthcheck helper
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub name: String,
    pub encoder: String,
    /// `run` statement as written
    pub command_line: Vec<String>,
    pub run: HealthcheckRun,
    /// Statements not modeled above
    pub options: BTreeMap<String, String>,
}

impl ProcessRecord {
    pub(super) fn from_section(section: &Section) -> Result<Self> {
        let name = section.name().unwrap_or_default().to_string();
        let invalid = |reason: String| Error::Healthcheck {
            process: name.clone(),
            reason,
        };
        if name.is_empty() {
            return Err(Error::Syntax {
                line: section.line,
                reason: String::from("process without a name"),
            });
        }
        let command_line = section
            .statement("run")
            .map(|stmt| stmt.args().to_vec())
            .ok_or_else(|| invalid(String::from("missing run statement")))?;
        let run = HealthcheckRun::parse(&command_line).map_err(invalid)?;
        let encoder = section
            .statement("encoder")
            .map(|stmt| stmt.value())
            .unwrap_or_else(|| String::from("text"));
        let options = section
            .statements
            .iter()
            .filter(|stmt| !matches!(stmt.keyword(), "run" | "encoder"))
            .map(|stmt| (stmt.keyword().to_string(), stmt.value()))
            .collect();

        Ok(Self {
            name,
            encoder,
            command_line,
            run,
            options,
        })
    }

    /// Maintenance flag file, if the healthcheck declares one
    pub fn maintenance_file(&self) -> Option<&PathBuf> {
        self.run.disable.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::parse;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_healthcheck_defaults() {
        let run = HealthcheckRun::parse(&words("/usr/bin/exabgp-healthcheck")).unwrap();
        assert_eq!(run.timeout, 5);
        assert_eq!(run.interval, 5);
        assert_eq!(run.fast_interval, 1);
        assert_eq!((run.rise, run.fall), (3, 3));
        assert_eq!(
            (run.up_metric, run.down_metric, run.disabled_metric),
            (100, 1000, 500)
        );
        assert!(run.ip_setup);
        assert!(run.ack);
        assert!(run.syslog);
        assert!(run.ips.is_empty());
        assert!(run.next_hop.is_empty());
        assert_eq!(run.disable, None);
    }

    #[test]
    fn test_healthcheck_options() {
        let run = HealthcheckRun::parse(&words(
            "python -m exabgp healthcheck --name svc --cmd /bin/mycheck --disable /tmp/maint/svc \
             --ip 10.0.0.1/32 --ip 10.0.0.2/32 --next-hop 192.168.1.1 --community 11223:344 \
             --withdraw-on-down --timeout 2 --execute /bin/a --execute /bin/b --no-ack",
        ))
        .unwrap();
        assert_eq!(run.name.as_deref(), Some("svc"));
        assert_eq!(run.command.as_deref(), Some("/bin/mycheck"));
        assert_eq!(run.disable, Some(PathBuf::from("/tmp/maint/svc")));
        assert_eq!(
            run.ips.keys().collect::<Vec<_>>(),
            vec!["10.0.0.1/32", "10.0.0.2/32"]
        );
        assert!(run.next_hop.contains_key("192.168.1.1"));
        assert_eq!(run.community.as_deref(), Some("11223:344"));
        assert!(run.withdraw_on_down);
        assert_eq!(run.timeout, 2);
        assert_eq!(run.execute, vec!["/bin/a", "/bin/b"]);
        assert!(!run.ack);
    }

    #[test]
    fn test_healthcheck_program_without_marker() {
        let run = HealthcheckRun::parse(&words("/opt/check.py --command /bin/true")).unwrap();
        assert_eq!(run.command.as_deref(), Some("/bin/true"));
    }

    #[test]
    fn test_healthcheck_errors() {
        let err = HealthcheckRun::parse(&words("/usr/bin/exabgp-healthcheck --bogus")).unwrap_err();
        assert!(err.contains("--bogus"), "{}", err);
        assert!(HealthcheckRun::parse(&words("healthcheck --timeout soon")).is_err());
        assert!(HealthcheckRun::parse(&words("healthcheck --ip not-an-ip")).is_err());
        let err = HealthcheckRun::parse(&words("healthcheck --ip 10.0.0.1/24")).unwrap_err();
        assert!(err.contains("10.0.0.1/24 has host bits set"), "{}", err);
        let run = HealthcheckRun::parse(&words("healthcheck --ip 10.0.0.0/24 --ip 2001:db8::1")).unwrap();
        assert_eq!(run.ips.len(), 2);
    }

    #[test]
    fn test_process_from_section() {
        let root = parse(
            r#"process svc {
                run /usr/bin/exabgp-healthcheck --cmd "/bin/check --fast" --disable /tmp/svc;
                encoder json;
                respawn true;
            }"#,
        )
        .unwrap();
        let process = ProcessRecord::from_section(&root.sections[0]).unwrap();
        assert_eq!(process.name, "svc");
        assert_eq!(process.encoder, "json");
        assert_eq!(process.run.command.as_deref(), Some("/bin/check --fast"));
        assert_eq!(process.maintenance_file(), Some(&PathBuf::from("/tmp/svc")));
        assert_eq!(process.options.get("respawn").map(String::as_str), Some("true"));

        let root = parse("process svc { run /usr/bin/exabgp-healthcheck --ip 192.168.1.1/24; }").unwrap();
        match ProcessRecord::from_section(&root.sections[0]) {
            Err(Error::Healthcheck { process, reason }) => {
                assert_eq!(process, "svc");
                assert!(reason.contains("host bits"), "{}", reason);
            }
            other => panic!("Unexpected result: {:?}", other),
        }

        let root = parse("process svc { encoder text; }").unwrap();
        match ProcessRecord::from_section(&root.sections[0]) {
            Err(Error::Healthcheck { process, .. }) => assert_eq!(process, "svc"),
            other => panic!("Unexpected result: {:?}", other),
        }
    }
}
