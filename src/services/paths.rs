//! Data directory resolution
//!
//! Precedence: explicit `--data-dir`, then `EXPENSETRACK_HOME`, then
//! `~/.expensetrack`.

use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::types::{ExpenseError, Result};

/// Environment variable overriding the default data directory
pub const HOME_ENV: &str = "EXPENSETRACK_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve and create the data directory
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let root = match explicit {
            Some(path) => path,
            None => match std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
                Some(env) => PathBuf::from(env),
                None => BaseDirs::new()
                    .ok_or_else(|| ExpenseError::Config("Cannot determine home directory".into()))?
                    .home_dir()
                    .join(".expensetrack"),
            },
        };
        fs::create_dir_all(&root)?;
        tracing::debug!(path = %root.display(), "using data directory");
        Ok(Self { root })
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expenses_file(&self) -> PathBuf {
        self.root.join("expenses.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }
}
