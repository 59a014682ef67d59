//! `config` subcommands for the category taxonomy and card list

use clap::Subcommand;

use super::Context;
use crate::types::{ExpenseError, Result, Taxonomy};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print categories, subcategories and cards
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    AddCategory {
        name: String,
    },

    RenameCategory {
        old: String,
        new: String,
    },

    AddSubcategory {
        category: String,
        name: String,
    },

    RenameSubcategory {
        category: String,
        old: String,
        new: String,
    },

    AddCard {
        name: String,
    },

    RenameCard {
        old: String,
        new: String,
    },
}

impl ConfigCommands {
    pub fn run(self, ctx: &Context) -> Result<String> {
        let store = ctx.taxonomy();

        let message = match self {
            Self::Show { json } => {
                let taxonomy = store.load()?;
                return if json {
                    serde_json::to_string_pretty(&taxonomy)
                        .map_err(|e| ExpenseError::Config(format!("Serialization failed: {}", e)))
                } else {
                    Ok(render_taxonomy(&taxonomy))
                };
            }
            Self::AddCategory { name } => {
                store.modify(|t| t.add_category(&name))?;
                format!("Added category {}", name.trim())
            }
            Self::RenameCategory { old, new } => {
                store.modify(|t| t.rename_category(&old, &new))?;
                format!("Renamed category {} to {}", old.trim(), new.trim())
            }
            Self::AddSubcategory { category, name } => {
                store.modify(|t| t.add_subcategory(&category, &name))?;
                format!("Added subcategory {} to {}", name.trim(), category.trim())
            }
            Self::RenameSubcategory { category, old, new } => {
                store.modify(|t| t.rename_subcategory(&category, &old, &new))?;
                format!(
                    "Renamed subcategory {} to {} in {}",
                    old.trim(),
                    new.trim(),
                    category.trim()
                )
            }
            Self::AddCard { name } => {
                store.modify(|t| t.add_card(&name))?;
                format!("Added card {}", name.trim())
            }
            Self::RenameCard { old, new } => {
                store.modify(|t| t.rename_card(&old, &new))?;
                format!("Renamed card {} to {}", old.trim(), new.trim())
            }
        };

        tracing::info!(path = %store.path().display(), "taxonomy updated");
        Ok(message)
    }
}

fn render_taxonomy(taxonomy: &Taxonomy) -> String {
    let mut out = String::from("Categories\n");
    for entry in &taxonomy.categories {
        out.push_str(&format!(
            "  {}: {}\n",
            entry.name,
            entry.subcategories.join(", ")
        ));
    }
    out.push_str("\nCards\n");
    for card in &taxonomy.cards {
        out.push_str(&format!("  {}\n", card));
    }
    out
}
