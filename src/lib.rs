/*!
# Macro Dashboard Tools

Small utilities that keep a weekly macro-economic dashboard up to date.

## Overview

The dashboard itself is a static site (`dashboard/index.html` plus assets)
backed by a JSON document (`dashboard/data.json`) and an Excel workbook
(`output/spreadsheet/macro_dashboard.xlsx`). Three binaries operate on it:

- **dashboard-server**: serves the dashboard directory over HTTP and runs the
  updater when the page sends `POST /update`.
- **update-dashboard**: copies values from `data.json` into fixed cells of
  the workbook and refreshes the JSON payload embedded in `index.html`.
- **send-gmail**: sends a single plaintext notification through Gmail's SMTP
  relay, using credentials from a local `.env` file.

## Modules

- **config**: default file locations relative to the project root
- **env_file**: `key=value` environment file loader
- **data**: serde model of the dashboard JSON document
- **workbook**: `.xlsx` read/write with A1-style cell addressing
- **updater**: workbook cell mapping and inline HTML payload replacement
- **mailer**: Gmail SMTP sender (requires the `web` feature)
- **server**: static file server with the update trigger (requires the `web` feature)
*/

use std::io::Write;
use std::path::Path;

pub mod config;
pub mod data;
pub mod env_file;
#[cfg(feature = "web")]
pub mod mailer;
#[cfg(feature = "web")]
pub mod server;
pub mod updater;
pub mod workbook;

pub use config::ProjectLayout;
pub use data::DashboardData;
pub use env_file::EnvFile;
pub use updater::{UpdateError, UpdatePaths};
pub use workbook::{CellRef, CellValue, Sheet, SheetMut, Workbook, WorkbookError};

/// Initialise `env_logger` with an `info` default, overridable via `RUST_LOG`.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Write to a temporary sibling of `path`, then rename it into place so
/// readers never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_can_be_initialised_twice() {
        init_logging();
        init_logging();
    }

    #[test]
    fn atomic_write_replaces_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
