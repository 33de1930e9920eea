#![cfg(not(tarpaulin_include))]

use clap::Parser;
use macro_dashboard::config::{DEFAULT_BIND, ProjectLayout, ROOT_ENV_VAR};
use macro_dashboard::server::{self, ServerConfig, UpdateCommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Name of the updater executable installed next to this binary.
const UPDATER_BIN: &str = "update-dashboard";

#[derive(Parser, Debug)]
#[command(name = "dashboard-server", version, about = "Serve the macro dashboard locally")]
struct Args {
    /// Project root containing `dashboard/` and `output/`
    #[arg(long, env = ROOT_ENV_VAR, default_value = ".")]
    root: PathBuf,

    /// Address to listen on
    #[arg(long, default_value_t = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Directory to serve (defaults to `<root>/dashboard`)
    #[arg(long)]
    dashboard_dir: Option<PathBuf>,

    /// Program and arguments run on `POST /update`
    /// (defaults to the bundled `update-dashboard --root <root>`)
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "PROGRAM ARGS")]
    update_command: Vec<String>,
}

fn default_update_command(root: &Path) -> std::io::Result<UpdateCommand> {
    let program = std::env::current_exe()?.with_file_name(UPDATER_BIN);
    Ok(UpdateCommand::new(program)
        .arg("--root")
        .arg(root.display().to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    macro_dashboard::init_logging();
    let args = Args::parse();

    let layout = ProjectLayout::new(&args.root);
    let update = match args.update_command.split_first() {
        Some((program, rest)) => UpdateCommand {
            program: program.into(),
            args: rest.to_vec(),
        },
        None => default_update_command(&args.root)?,
    };

    let config = ServerConfig {
        bind: args.bind,
        dashboard_dir: args.dashboard_dir.unwrap_or_else(|| layout.dashboard_dir()),
        update,
    };

    server::run(config).await
}
