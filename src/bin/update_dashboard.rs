#![cfg(not(tarpaulin_include))]

use chrono::Local;
use clap::Parser;
use macro_dashboard::config::{ProjectLayout, ROOT_ENV_VAR};
use macro_dashboard::updater::{self, UpdatePaths};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "update-dashboard",
    version,
    about = "Copy dashboard/data.json into the workbook and the inline page data"
)]
struct Args {
    /// Project root containing `dashboard/` and `output/`
    #[arg(long, env = ROOT_ENV_VAR, default_value = ".")]
    root: PathBuf,

    /// Dashboard data file (defaults to `<root>/dashboard/data.json`)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Workbook to update (defaults to `<root>/output/spreadsheet/macro_dashboard.xlsx`)
    #[arg(long)]
    workbook: Option<PathBuf>,

    /// Page with the inline data block (defaults to `<root>/dashboard/index.html`)
    #[arg(long)]
    html: Option<PathBuf>,
}

fn main() -> ExitCode {
    macro_dashboard::init_logging();
    let args = Args::parse();

    let defaults = UpdatePaths::from(&ProjectLayout::new(&args.root));
    let paths = UpdatePaths {
        data_json: args.data.unwrap_or(defaults.data_json),
        workbook: args.workbook.unwrap_or(defaults.workbook),
        html: args.html.unwrap_or(defaults.html),
    };

    match updater::run(&paths, Local::now().date_naive()) {
        Ok(summary) => {
            log::info!(
                "{} summary rows, {} country sheets, {} indicator rows, page updated: {}",
                summary.summary_rows,
                summary.country_sheets,
                summary.indicator_rows,
                summary.html_updated
            );
            println!("Updated Excel from dashboard/data.json");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
