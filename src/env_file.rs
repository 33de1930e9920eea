//! Loader for `.env`-style `key=value` files.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("failed to read {path}: {source}")]
pub struct EnvFileError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// Variables read from an environment file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: Vec<(String, String)>,
}

impl EnvFile {
    /// Read and parse `path`. A missing file yields an empty set.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnvFileError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(text) => {
                let env = Self::parse(&text);
                debug!("loaded {} variables from {}", env.len(), path.display());
                Ok(env)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no env file at {}", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(EnvFileError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse `key=value` lines. Blank lines, `#` comments and lines without
    /// `=` are skipped; the first occurrence of a key wins.
    pub fn parse(text: &str) -> Self {
        let mut env = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || env.get(key).is_some() {
                continue;
            }
            env.vars.push((key.to_string(), value.to_string()));
        }
        env
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Resolve `key` against the process environment first, then this file.
    pub fn resolve<F>(&self, key: &str, process_env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        process_env(key).or_else(|| self.get(key).map(str::to_string))
    }
}
