//! Taxonomy (categories, subcategories, cards) persistence

use std::path::{Path, PathBuf};

use crate::services::store::{read_existing, write_atomic, StoreLock};
use crate::types::{ExpenseError, Result, Taxonomy, TAXONOMY_VERSION};

pub struct TaxonomyStore {
    path: PathBuf,
}

impl TaxonomyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the taxonomy, seeding defaults on first use and merging default
    /// cards into older files. The merged result is written back.
    pub fn load(&self) -> Result<Taxonomy> {
        let _lock = StoreLock::exclusive(&self.path)?;
        let taxonomy = self.read()?;
        self.write(&taxonomy)?;
        Ok(taxonomy)
    }

    pub fn save(&self, taxonomy: &Taxonomy) -> Result<()> {
        let _lock = StoreLock::exclusive(&self.path)?;
        self.write(taxonomy)
    }

    /// Load, apply `edit`, save, all under one exclusive lock. Returns the
    /// edited taxonomy; nothing is written when `edit` fails.
    pub fn modify<F>(&self, edit: F) -> Result<Taxonomy>
    where
        F: FnOnce(&mut Taxonomy) -> Result<()>,
    {
        let _lock = StoreLock::exclusive(&self.path)?;
        let mut taxonomy = self.read()?;
        edit(&mut taxonomy)?;
        self.write(&taxonomy)?;
        Ok(taxonomy)
    }

    fn read(&self) -> Result<Taxonomy> {
        let mut taxonomy = match read_existing(&self.path)? {
            Some(content) => {
                let stored: Taxonomy = serde_json::from_str(&content).map_err(|e| {
                    ExpenseError::Config(format!(
                        "Invalid config file {}: {}",
                        self.path.display(),
                        e
                    ))
                })?;
                if stored.version > TAXONOMY_VERSION {
                    return Err(ExpenseError::Config(format!(
                        "config version {} is newer than supported version {}",
                        stored.version, TAXONOMY_VERSION
                    )));
                }
                stored
            }
            None => {
                tracing::info!(path = %self.path.display(), "seeding default taxonomy");
                Taxonomy::default()
            }
        };

        taxonomy.merge_defaults();
        taxonomy.version = TAXONOMY_VERSION;
        Ok(taxonomy)
    }

    fn write(&self, taxonomy: &Taxonomy) -> Result<()> {
        let content = serde_json::to_string_pretty(taxonomy)
            .map_err(|e| ExpenseError::Config(format!("Serialization failed: {}", e)))?;
        write_atomic(&self.path, &content)
    }
}
