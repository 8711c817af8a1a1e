use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a manifest without serving it.
    Validate {
        /// Path to the manifest (JSON or YAML, auto-detected).
        path: PathBuf,
    },
    /// Print the dependency plan of every flow.
    Plan {
        path: PathBuf,
    },
    /// Bind the manifest and serve its listeners until interrupted.
    Serve {
        path: PathBuf,

        /// Address of the built-in HTTP listener.
        #[arg(long, default_value = "127.0.0.1:8080")]
        http: SocketAddr,
    },
}
