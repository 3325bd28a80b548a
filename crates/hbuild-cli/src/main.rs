mod cmd_build;
mod cmd_config;
mod cmd_graph;
mod cmd_history;
mod cmd_log;
mod cmd_status;
mod cmd_watch;
mod context;
mod logging;
#[cfg(feature = "tui")]
mod tui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use context::Context;

#[derive(Parser)]
#[command(name = "hbctl", version, about = "Monitor and drive an hbuild build server")]
struct Cli {
    /// Config file (default: <config_dir>/hbuild/client.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Server base URL, overrides config and HBUILD_SERVER
    #[arg(long, global = true)]
    server: Option<String>,
    /// Debug logging to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show package build states, or one package in detail
    Status {
        /// Package name
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a package's build log
    Log {
        /// Package name, or `package[stage]` for one stage
        name: String,
        /// Keep printing new output until Ctrl-C
        #[arg(short, long)]
        follow: bool,
        /// Poll snapshots instead of streaming (with --follow)
        #[arg(long)]
        poll: bool,
    },
    /// Lay out the dependency graph
    Graph {
        /// Output the laid-out graph as JSON
        #[arg(long)]
        json: bool,
        /// Flow left to right instead of top to bottom
        #[arg(long)]
        horizontal: bool,
    },
    /// List past build jobs
    History {
        /// Maximum number of jobs to show (0 = all)
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Submit a build for a package
    Build {
        /// Package name
        name: String,
        /// Build a single stage only
        #[arg(long)]
        stage: Option<String>,
    },
    /// Read or edit client configuration
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
    /// Live view of packages, logs and graph
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let tui_mode = matches!(cli.cmd, Command::Watch) && cfg!(feature = "tui");
    logging::init(cli.verbose, tui_mode);

    let ctx = Context::load(cli.config, cli.server)?;

    match cli.cmd {
        Command::Status { name, json } => cmd_status::execute(&ctx, name.as_deref(), json),
        Command::Log { name, follow, poll } => {
            if follow {
                cmd_log::follow(&ctx, &name, poll)
            } else {
                cmd_log::print(&ctx, &name)
            }
        }
        Command::Graph { json, horizontal } => cmd_graph::execute(&ctx, json, horizontal),
        Command::History { limit } => cmd_history::execute(&ctx, limit),
        Command::Build { name, stage } => cmd_build::execute(&ctx, &name, stage.as_deref()),
        Command::Config { cmd } => cmd_config::run(cmd, &ctx),
        Command::Watch => cmd_watch::execute(&ctx),
    }
}
