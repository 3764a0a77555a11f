use std::io::Write;

use serde::Serialize;

use super::Args;
use crate::config::{self, Config};
use crate::controller::TcpProbe;
use crate::error::Result;
use crate::output::OutputFormat;
use crate::settings::Settings;
use crate::version::VersionInfo;

/// What every command runs against: the freshly loaded ExaBGP config
/// and how to print results
#[derive(Debug)]
pub struct Context {
    pub cfg: Config,
    pub settings: Settings,
    pub output: OutputFormat,
}

impl Context {
    pub fn create(args: &Args) -> Result<Self> {
        let settings = args.settings()?;
        let cfg = config::load(&settings)?;
        Ok(Self {
            cfg,
            settings,
            output: args.output,
        })
    }

    /// Fill in the config's versions, only `dump` and `version` show them
    pub async fn collect_version(&mut self) {
        self.cfg.version = VersionInfo::collect(&self.settings.exabgp_bin).await;
    }

    /// Probe used by the neighbor status commands
    pub fn probe(&self) -> TcpProbe {
        TcpProbe {
            port: self.settings.bgp_port,
            timeout: self.settings.probe_timeout,
        }
    }

    pub fn print<W: Write, T: Serialize + ?Sized>(&self, out: &mut W, data: &T) -> Result<()> {
        self.output.write(out, data)
    }
}
