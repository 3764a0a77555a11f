//! # exabgpctl
//!
//! Admin CLI for an ExaBGP instance and its healthcheck processes.
//! It reads the ExaBGP configuration on every run (`/etc/exabgp/exabgp.conf` by default,
//! `--conf` or `EXABGPCTL_CONF` to change it) and acts on the files ExaBGP's
//! healthcheck helper watches: maintenance files (`--disable`) and state files.
//!
//! ## Features
//! - [x] Dump the normalized configuration (processes & neighbors)
//! - [x] Enable/disable processes for maintenance
//! - [x] Record healthcheck states (`--execute` hook)
//! - [x] Health command & neighbor TCP reachability status
//! - [x] JSON, YAML & flat (`key=value`) output
//! - [x] Bash completion (see `demos/exabgpctl.bash`)
//!
//! # Processes
//!
//! ```sh
//! $ exabgpctl process list
//! [
//!     "service1.exabgp.lan",
//!     "service2.exabgp.lan",
//!     "service3.exabgp.lan"
//! ]
//! $ exabgpctl process disable service1.exabgp.lan
//! true
//! $ exabgpctl -o flat process list --disable
//! [0]=service1.exabgp.lan
//! $ exabgpctl process enable service1.exabgp.lan
//! true
//! ```
//!
//! Process details:
//! ```sh
//! $ exabgpctl -o flat process show service1.exabgp.lan | grep -v ips__
//! command_line[0]=/usr/bin/python3
//! command_line[1]=-m
//! ...
//! encoder=text
//! name=service1.exabgp.lan
//! run__command=curl -sf http://127.0.0.1/health
//! run__community=11223:344
//! run__disable=/tmp/exabgp/maintenance/service1.exabgp.lan
//! ...
//! ```
//!
//! The healthcheck helper can report its state changes with
//! `--execute "exabgpctl process state service1.exabgp.lan"`, STATE is read from the environment:
//! ```sh
//! $ STATE=UP exabgpctl process state service1.exabgp.lan
//! UP
//! $ exabgpctl -o yaml process status
//! ---
//! service1.exabgp.lan:
//!   command: true
//!   command_check: curl -sf http://127.0.0.1/health
//!   state: UP
//!   state_path: /var/lib/exabgp/status/service1.exabgp.lan
//! ...
//! ```
//!
//! # Neighbors
//!
//! ```sh
//! $ exabgpctl -o flat neighbor status
//! 192.168.0.1__reachability__result=open
//! 192.168.0.1__status=true
//! 192.168.0.1__status_addressport[0]=192.168.0.1
//! 192.168.0.1__status_addressport[1]=179
//! 192.168.0.2__reachability__code=111
//! 192.168.0.2__reachability__result=closed
//! 192.168.0.2__status=false
//! 192.168.0.2__status_addressport[0]=192.168.0.2
//! 192.168.0.2__status_addressport[1]=179
//! ```
//!
//! # Everything else
//!
//! ```sh
//! $ exabgpctl dump | jq '.neighbors[].rib'
//! $ exabgpctl status
//! $ exabgpctl version exabgp
//! 4.2.21
//! $ EDITOR=nano exabgpctl edit
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use futures::future::join;
use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::config::Config;
use crate::controller::{self, NeighborStatus, ProcessStatus};
use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::settings::Settings;

mod completion;
mod context;
mod editor;

pub use completion::{candidates, CompleteTarget};
pub use context::Context;
pub use editor::{edit, edit_with};

#[derive(Parser, Debug)]
#[clap(name = "exabgpctl", version, rename_all = "kebab-case")]
/// ExaBGP admin CLI for managing processes
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Output format
    #[clap(short, long, arg_enum, default_value = "json")]
    pub output: OutputFormat,
    /// Enable debug logs
    #[clap(short, long)]
    pub debug: bool,
    /// ExaBGP configuration file [default: /etc/exabgp/exabgp.conf]
    #[clap(long, env = "EXABGPCTL_CONF")]
    pub conf: Option<PathBuf>,
    /// Healthcheck state directory [default: /var/lib/exabgp/status]
    #[clap(long, env = "EXABGPCTL_STATE")]
    pub state: Option<PathBuf>,
    /// exabgpctl settings file [default: /etc/exabgp/exabgpctl.toml, if present]
    #[clap(long, env = "EXABGPCTL_SETTINGS")]
    pub settings: Option<PathBuf>,
}

impl Args {
    pub fn settings(&self) -> Result<Settings> {
        Settings::resolve(
            self.conf.clone(),
            self.state.clone(),
            self.settings.as_deref(),
        )
    }
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Dump configuration, useful with jq
    Dump,
    /// Status of all processes and neighbors
    Status,
    /// Versions of exabgpctl, ExaBGP and the OS
    Version {
        /// Only print this version (exabgpctl, exabgp, os)
        key: Option<String>,
    },
    /// Edit the ExaBGP configuration ($VISUAL, $EDITOR or vi)
    Edit,
    /// Manage processes
    #[clap(alias = "p", subcommand)]
    Process(ProcessCommand),
    /// Manage neighbors
    #[clap(alias = "n", subcommand)]
    Neighbor(NeighborCommand),
    /// Completion candidates, one per line
    #[clap(hide = true)]
    Complete {
        #[clap(arg_enum)]
        target: CompleteTarget,
        #[clap(default_value = "")]
        incomplete: String,
    },
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum ProcessCommand {
    /// List processes (sorted)
    List {
        /// Only processes in maintenance
        #[clap(short, long, conflicts_with = "enable")]
        disable: bool,
        /// Only processes not in maintenance
        #[clap(short, long)]
        enable: bool,
    },
    /// Process details
    Show { process: String },
    /// Take a process out of maintenance (removes its maintenance file)
    Enable { process: String },
    /// Put a process in maintenance (creates its maintenance file)
    Disable { process: String },
    /// Record the healthcheck state of a process
    State {
        process: String,
        /// State to record, set by the healthcheck helper's --execute hooks
        #[clap(long, env = "STATE")]
        state_value: Option<String>,
    },
    /// State and health command result of all processes
    Status,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum NeighborCommand {
    /// Neighbor details
    Show { neighbor: String },
    /// List neighbors (sorted)
    List,
    /// TCP reachability of all neighbors
    Status,
}

#[derive(Debug, Serialize)]
struct Status {
    processes: BTreeMap<String, ProcessStatus>,
    neighbors: BTreeMap<String, NeighborStatus>,
}

fn sorted(names: Vec<&str>) -> Vec<&str> {
    names.into_iter().sorted().collect()
}

/// Run a command, printing its result to `out`
pub async fn run_cmd<W: Write>(args: &Args, out: &mut W) -> Result<()> {
    if let Command::Complete { target, incomplete } = &args.cmd {
        return complete(args, *target, incomplete, out);
    }

    if let Command::Edit = &args.cmd {
        // A config that fails to load must still be editable
        let settings = args.settings()?;
        if !settings.conf.exists() {
            return Err(Error::ConfigNotFound(settings.conf));
        }
        return edit(&settings.conf);
    }

    let mut ctx = Context::create(args)?;
    if matches!(args.cmd, Command::Dump | Command::Version { .. }) {
        ctx.collect_version().await;
    }
    let cfg = &ctx.cfg;
    match &args.cmd {
        Command::Dump => ctx.print(out, cfg)?,
        Command::Status => {
            let probe = ctx.probe();
            let (processes, neighbors) = join(
                controller::status_processes(cfg),
                controller::status_neighbors(cfg, &probe),
            )
            .await;
            ctx.print(
                out,
                &Status {
                    processes,
                    neighbors,
                },
            )?
        }
        Command::Version { key } => match key {
            Some(key) => ctx.print(out, cfg.version.get(key)?)?,
            None => ctx.print(out, &cfg.version)?,
        },
        Command::Process(process) => match process {
            ProcessCommand::List { disable, enable } => {
                let names = if *disable {
                    controller::list_disabled_processes(cfg)
                } else if *enable {
                    controller::list_enabled_processes(cfg)
                } else {
                    controller::list_processes(cfg)
                };
                ctx.print(out, &sorted(names))?
            }
            ProcessCommand::Show { process } => {
                ctx.print(out, controller::get_process(cfg, process)?)?
            }
            ProcessCommand::Enable { process } => {
                ctx.print(out, &controller::enable_process(cfg, process)?)?
            }
            ProcessCommand::Disable { process } => {
                ctx.print(out, &controller::disable_process(cfg, process)?)?
            }
            ProcessCommand::State {
                process,
                state_value,
            } => {
                let state = controller::state_process(cfg, process, state_value.as_deref())?;
                ctx.print(out, &state)?
            }
            ProcessCommand::Status => ctx.print(out, &controller::status_processes(cfg).await)?,
        },
        Command::Neighbor(neighbor) => match neighbor {
            NeighborCommand::Show { neighbor } => {
                ctx.print(out, controller::get_neighbor(cfg, neighbor)?)?
            }
            NeighborCommand::List => ctx.print(out, &sorted(controller::list_neighbors(cfg)))?,
            NeighborCommand::Status => {
                let probe = ctx.probe();
                ctx.print(out, &controller::status_neighbors(cfg, &probe).await)?
            }
        },
        // Answered before loading the config
        Command::Edit | Command::Complete { .. } => (),
    }
    Ok(())
}

/// Completion must not fail: without a loadable config only
/// the static targets have candidates
fn complete<W: Write>(
    args: &Args,
    target: CompleteTarget,
    incomplete: &str,
    out: &mut W,
) -> Result<()> {
    let cfg: Option<Config> = match Context::create(args) {
        Ok(ctx) => Some(ctx.cfg),
        Err(err) => {
            debug!("No completion from config: {}", err);
            None
        }
    };
    for name in candidates(target, cfg.as_ref(), incomplete) {
        writeln!(out, "{}", name).map_err(|err| Error::io("Writing output", err))?;
    }
    Ok(())
}

/// exabgpctl entry point, returns the process exit code
pub async fn exabgpctl(args: &Args) -> i32 {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match run_cmd(args, &mut out).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", err.to_string().red());
            1
        }
    }
}
