#![cfg(not(tarpaulin_include))]

use clap::Parser;
use macro_dashboard::config::{ProjectLayout, ROOT_ENV_VAR};
use macro_dashboard::env_file::EnvFile;
use macro_dashboard::mailer::{GmailCredentials, Mailer};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "send-gmail", version, about = "Send a Gmail notification.")]
struct Args {
    #[arg(long)]
    to: String,

    #[arg(long)]
    subject: String,

    #[arg(long)]
    body: String,

    /// Project root whose `.env` holds the credentials
    #[arg(long, env = ROOT_ENV_VAR, default_value = ".")]
    root: PathBuf,

    /// File holding GMAIL_ADDRESS and GMAIL_APP_PASSWORD (defaults to `<root>/.env`)
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl Args {
    fn env_file(&self) -> PathBuf {
        self.env_file
            .clone()
            .unwrap_or_else(|| ProjectLayout::new(&self.root).env_file())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    macro_dashboard::init_logging();
    let args = Args::parse();

    let env = EnvFile::load(args.env_file())?;
    let credentials = GmailCredentials::from_env(&env)?;

    let mailer = Mailer::gmail(credentials)?;
    mailer.send(&args.to, &args.subject, &args.body)?;

    Ok(())
}
