//! User taxonomy: categories, subcategories and cards

use serde::{Deserialize, Serialize};

use super::expense::DEFAULT_SUBCATEGORY;
use super::{ExpenseError, Result};

/// Current on-disk taxonomy version
pub const TAXONOMY_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub subcategories: Vec<String>,
}

/// Category → subcategory tree plus the card list.
///
/// Order is display order; new entries are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub version: u32,
    pub categories: Vec<CategoryEntry>,
    pub cards: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        let seed: [(&str, &[&str]); 9] = [
            ("Alimentação", &["Mercado", "Restaurante", "Delivery", "Café"]),
            (
                "Transporte",
                &["Uber/99", "Combustível", "Estacionamento", "Ônibus/Metrô"],
            ),
            (
                "Casa",
                &["Aluguel", "Condomínio", "Luz", "Água", "Internet", "Manutenção"],
            ),
            ("Saúde", &["Farmácia", "Médico", "Exames", "Academia"]),
            ("Assinaturas", &["Streaming", "Apps", "Outros"]),
            ("Compras", &["Roupas", "Eletrônicos", "Presentes"]),
            ("Lazer", &["Cinema", "Viagem", "Jogos"]),
            ("Educação", &["Cursos", "Livros"]),
            ("Outros", &["Diversos"]),
        ];

        Self {
            version: TAXONOMY_VERSION,
            categories: seed
                .iter()
                .map(|(name, subs)| CategoryEntry {
                    name: name.to_string(),
                    subcategories: subs.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
            cards: ["Itaú", "Sam’s Clube", "Carrefour", "C&A", "Riachuello", "iFood"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

fn clean_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ExpenseError::Validation(format!("{} name is empty", what)));
    }
    Ok(name.to_string())
}

impl Taxonomy {
    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn category(&self, name: &str) -> Option<&CategoryEntry> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn category_mut(&mut self, name: &str) -> Result<&mut CategoryEntry> {
        self.categories
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| ExpenseError::NotFound(format!("category {:?}", name)))
    }

    /// Subcategories of `category`, or the default one for unknown categories
    pub fn subcategories(&self, category: &str) -> Vec<String> {
        self.category(category)
            .map(|c| c.subcategories.clone())
            .unwrap_or_else(|| vec![DEFAULT_SUBCATEGORY.to_string()])
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = clean_name(name, "category")?;
        if self.category(&name).is_some() {
            return Err(ExpenseError::Duplicate(format!("category {:?}", name)));
        }
        self.categories.push(CategoryEntry {
            name,
            subcategories: vec![DEFAULT_SUBCATEGORY.to_string()],
        });
        Ok(())
    }

    pub fn rename_category(&mut self, old: &str, new: &str) -> Result<()> {
        let new = clean_name(new, "category")?;
        if new != old.trim() && self.category(&new).is_some() {
            return Err(ExpenseError::Duplicate(format!("category {:?}", new)));
        }
        self.category_mut(old.trim())?.name = new;
        Ok(())
    }

    pub fn add_subcategory(&mut self, category: &str, name: &str) -> Result<()> {
        let name = clean_name(name, "subcategory")?;
        let entry = self.category_mut(category.trim())?;
        if entry.subcategories.contains(&name) {
            return Err(ExpenseError::Duplicate(format!(
                "subcategory {:?} in {:?}",
                name, entry.name
            )));
        }
        entry.subcategories.push(name);
        Ok(())
    }

    pub fn rename_subcategory(&mut self, category: &str, old: &str, new: &str) -> Result<()> {
        let new = clean_name(new, "subcategory")?;
        let old = old.trim();
        let entry = self.category_mut(category.trim())?;
        if new != old && entry.subcategories.contains(&new) {
            return Err(ExpenseError::Duplicate(format!(
                "subcategory {:?} in {:?}",
                new, entry.name
            )));
        }
        let slot = entry
            .subcategories
            .iter_mut()
            .find(|s| s.as_str() == old)
            .ok_or_else(|| ExpenseError::NotFound(format!("subcategory {:?}", old)))?;
        *slot = new;
        Ok(())
    }

    pub fn add_card(&mut self, name: &str) -> Result<()> {
        let name = clean_name(name, "card")?;
        if self.cards.contains(&name) {
            return Err(ExpenseError::Duplicate(format!("card {:?}", name)));
        }
        self.cards.push(name);
        Ok(())
    }

    pub fn rename_card(&mut self, old: &str, new: &str) -> Result<()> {
        let new = clean_name(new, "card")?;
        let old = old.trim();
        if new != old && self.cards.contains(&new) {
            return Err(ExpenseError::Duplicate(format!("card {:?}", new)));
        }
        let slot = self
            .cards
            .iter_mut()
            .find(|c| c.as_str() == old)
            .ok_or_else(|| ExpenseError::NotFound(format!("card {:?}", old)))?;
        *slot = new;
        Ok(())
    }

    /// Add the category if missing. Returns true when something changed.
    pub fn ensure_category(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.category(name).is_some() {
            return false;
        }
        self.categories.push(CategoryEntry {
            name: name.to_string(),
            subcategories: vec![DEFAULT_SUBCATEGORY.to_string()],
        });
        true
    }

    /// Add the category and subcategory if missing. Returns true when something changed.
    pub fn ensure_subcategory(&mut self, category: &str, name: &str) -> bool {
        let category = category.trim();
        let name = name.trim();
        if category.is_empty() || name.is_empty() {
            return false;
        }
        let mut changed = self.ensure_category(category);
        if let Some(entry) = self.categories.iter_mut().find(|c| c.name == category) {
            if !entry.subcategories.iter().any(|s| s == name) {
                entry.subcategories.push(name.to_string());
                changed = true;
            }
        }
        changed
    }

    /// Append default cards the stored list is missing; restore default
    /// categories when none are stored. Returns true when something changed.
    pub fn merge_defaults(&mut self) -> bool {
        let defaults = Self::default();
        let mut changed = false;

        for card in defaults.cards {
            if !self.cards.contains(&card) {
                self.cards.push(card);
                changed = true;
            }
        }

        if self.categories.is_empty() {
            self.categories = defaults.categories;
            changed = true;
        }

        changed
    }
}
