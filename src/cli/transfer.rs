//! `export`, `import` and `reset` subcommands

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};

use super::Context;
use crate::services::migration::local_offset;
use crate::services::transfer::{read_csv, read_json, write_csv, write_json};
use crate::services::RecordStore;
use crate::types::{ExpenseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransferFormat {
    /// Versioned JSON backup
    Json,
    Csv,
}

impl TransferFormat {
    /// Guess from the file extension; anything but `.csv` is JSON
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// Export all expenses as JSON backup or CSV
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = TransferFormat::Json)]
    pub format: TransferFormat,

    /// Write to FILE instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        let records = ctx.records().list()?;
        let offset = local_offset();

        let content = match self.format {
            TransferFormat::Json => write_json(&records, offset)?,
            TransferFormat::Csv => {
                let mut buf = Vec::new();
                write_csv(&records, offset, &mut buf)?;
                String::from_utf8(buf)
                    .map_err(|e| ExpenseError::Csv(format!("CSV encoding error: {e}")))?
            }
        };

        match self.output {
            Some(path) => {
                fs::write(&path, content)?;
                tracing::info!(count = records.len(), path = %path.display(), "exported expenses");
                Ok(format!(
                    "Exported {} expense(s) to {}",
                    records.len(),
                    path.display()
                ))
            }
            None => Ok(content),
        }
    }
}

/// Import expenses (insert or replace by id)
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON backup or CSV file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// File format (default: from extension)
    #[arg(long, value_enum)]
    pub format: Option<TransferFormat>,
}

impl ImportArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        let format = self
            .format
            .unwrap_or_else(|| TransferFormat::from_path(&self.file));

        let batch = match format {
            TransferFormat::Json => read_json(&fs::read_to_string(&self.file)?)?,
            TransferFormat::Csv => read_csv(fs::File::open(&self.file)?)?,
        };

        let skipped = batch.skipped;
        let categories: Vec<(String, String)> = batch
            .records
            .iter()
            .map(|r| (r.category.clone(), r.subcategory.clone()))
            .collect();

        let written = ctx.records().upsert_many(batch.records)?;
        ctx.taxonomy().modify(|t| {
            for (category, subcategory) in &categories {
                t.ensure_subcategory(category, subcategory);
            }
            Ok(())
        })?;

        let mut out = format!("Imported {} expense(s)", written);
        if skipped > 0 {
            out.push_str(&format!(", skipped {} without id", skipped));
        }
        Ok(out)
    }
}

/// Delete all expenses
#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Confirm deleting every expense
    #[arg(long)]
    pub yes: bool,
}

impl ResetArgs {
    pub fn run(self, ctx: &Context) -> Result<String> {
        if !self.yes {
            return Err(ExpenseError::Validation(
                "refusing to delete all expenses without --yes".into(),
            ));
        }
        ctx.records().clear()?;
        Ok("All expenses deleted.".to_string())
    }
}
