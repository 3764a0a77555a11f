use clap::Parser;
use env_logger::Builder;
use log::{debug, LevelFilter};

use exabgpctl::cli::{exabgpctl, Args};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let (exabgpctl_level, other_level) = if args.debug {
        (LevelFilter::Debug, LevelFilter::Warn)
    } else {
        (LevelFilter::Warn, LevelFilter::Warn)
    };
    Builder::new()
        .filter(Some("exabgpctl"), exabgpctl_level)
        .filter(None, other_level)
        .init();
    debug!("Logging at levels {}/{}", exabgpctl_level, other_level);

    std::process::exit(exabgpctl(&args).await);
}
