use clap::Parser;

mod cmd;
mod commands;
mod exit_codes;

use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "weir", version, about = "Declarative flow orchestration gateway")]
struct Cli {
    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command));
    std::process::exit(exit_code);
}

async fn run_command(command: Command) -> i32 {
    match command {
        Command::Validate { path } => cmd::validate::validate_cmd(&path).await,
        Command::Plan { path } => cmd::plan::plan_cmd(&path).await,
        Command::Serve { path, http } => cmd::serve::serve_cmd(&path, http).await,
    }
}
