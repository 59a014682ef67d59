mod config;
mod expense;
mod insights;
pub mod render;
mod transfer;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::init_tracing;
use crate::services::{DataDir, JsonRecordStore, TaxonomyStore};
use crate::types::Result;

use config::ConfigCommands;
use expense::{AddArgs, DeleteArgs, EditArgs, ListArgs};
use insights::InsightsArgs;
use transfer::{ExportArgs, ImportArgs, ResetArgs};

/// Personal expense tracker with spending insights
#[derive(Parser)]
#[command(name = "expensetrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Data directory (default: $EXPENSETRACK_HOME or ~/.expensetrack)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a new expense
    Add(AddArgs),

    /// Change an existing expense
    Edit(EditArgs),

    /// Delete an expense
    Delete(DeleteArgs),

    /// List expenses, newest first
    List(ListArgs),

    /// Show spending insights for a period
    Insights(InsightsArgs),

    /// Export all expenses as JSON backup or CSV
    Export(ExportArgs),

    /// Import expenses from a JSON backup or CSV (insert or replace by id)
    Import(ImportArgs),

    /// Delete all expenses
    Reset(ResetArgs),

    /// Manage categories, subcategories and cards
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Stores rooted at the resolved data directory
pub struct Context {
    data_dir: DataDir,
}

impl Context {
    pub fn new(data_dir: DataDir) -> Self {
        Self { data_dir }
    }

    pub fn records(&self) -> JsonRecordStore {
        JsonRecordStore::new(self.data_dir.expenses_file())
    }

    pub fn taxonomy(&self) -> TaxonomyStore {
        TaxonomyStore::new(self.data_dir.config_file())
    }
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        init_tracing(self.verbose);
        let ctx = Context::new(DataDir::resolve(self.data_dir)?);
        let output = self.command.run(&ctx)?;
        if !output.is_empty() {
            println!("{}", output);
        }
        Ok(())
    }
}

impl Commands {
    /// Execute and return what should be printed on stdout
    fn run(self, ctx: &Context) -> Result<String> {
        match self {
            Commands::Add(args) => args.run(ctx),
            Commands::Edit(args) => args.run(ctx),
            Commands::Delete(args) => args.run(ctx),
            Commands::List(args) => args.run(ctx),
            Commands::Insights(args) => args.run(ctx),
            Commands::Export(args) => args.run(ctx),
            Commands::Import(args) => args.run(ctx),
            Commands::Reset(args) => args.run(ctx),
            Commands::Config(cmd) => cmd.run(ctx),
        }
    }
}
