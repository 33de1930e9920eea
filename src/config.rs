use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the project root when `--root` is absent.
pub const ROOT_ENV_VAR: &str = "DASHBOARD_ROOT";

/// Address the dashboard server binds to by default.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

/// Default file locations for a dashboard project.
///
/// ```text
/// <root>/
///   .env
///   dashboard/index.html
///   dashboard/data.json
///   output/spreadsheet/macro_dashboard.xlsx
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dashboard_dir(&self) -> PathBuf {
        self.root.join("dashboard")
    }

    pub fn data_json(&self) -> PathBuf {
        self.dashboard_dir().join("data.json")
    }

    pub fn index_html(&self) -> PathBuf {
        self.dashboard_dir().join("index.html")
    }

    pub fn workbook(&self) -> PathBuf {
        self.root
            .join("output")
            .join("spreadsheet")
            .join("macro_dashboard.xlsx")
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_paths_from_root() {
        let layout = ProjectLayout::new("/srv/finance");
        assert_eq!(layout.dashboard_dir(), PathBuf::from("/srv/finance/dashboard"));
        assert_eq!(layout.data_json(), PathBuf::from("/srv/finance/dashboard/data.json"));
        assert_eq!(layout.index_html(), PathBuf::from("/srv/finance/dashboard/index.html"));
        assert_eq!(
            layout.workbook(),
            PathBuf::from("/srv/finance/output/spreadsheet/macro_dashboard.xlsx")
        );
        assert_eq!(layout.env_file(), PathBuf::from("/srv/finance/.env"));
        assert_eq!(DEFAULT_BIND.to_string(), "127.0.0.1:8000");
    }
}
