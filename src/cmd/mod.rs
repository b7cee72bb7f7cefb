//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`], [`init`], or [`validate`]. Each handler
//! lives in its own submodule.

pub mod init;
pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::EdgeProxyError;

pub async fn dispatch(cli: Cli) -> Result<(), EdgeProxyError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Init(ref args)) => init::execute(args),
        Some(Commands::Validate(ref args)) => validate::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  edge-proxy v{version}: edge forwarding proxy\n\n  \
         No command provided. To get started:\n\n    \
         edge-proxy init                   Generate a starter config\n    \
         edge-proxy run                    Start the proxy (auto-detects ./edge-proxy.yaml)\n    \
         edge-proxy run -c dual.yaml       Start with a specific config file\n    \
         edge-proxy --help                 See all commands and options\n"
    );
}
