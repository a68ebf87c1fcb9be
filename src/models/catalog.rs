use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Marketplace;

/// One product row. References are stored as scraped; normalization happens
/// at comparison time. `id` is assigned once and never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub reference_primary: Option<String>,
    pub reference_secondary: Option<String>,
    pub price_primary: Option<f64>,
    pub price_secondary: Option<f64>,
    pub availability_primary: Option<String>,
    pub availability_secondary: Option<String>,
    pub source_url_primary: Option<String>,
    pub source_url_secondary: Option<String>,
}

impl CatalogEntry {
    pub fn new(id: i64, name: String, category_id: i64) -> Self {
        Self {
            id,
            name,
            category_id,
            reference_primary: None,
            reference_secondary: None,
            price_primary: None,
            price_secondary: None,
            availability_primary: None,
            availability_secondary: None,
            source_url_primary: None,
            source_url_secondary: None,
        }
    }

    pub fn price_for(&self, role: Marketplace) -> Option<f64> {
        match role {
            Marketplace::Primary => self.price_primary,
            Marketplace::Secondary => self.price_secondary,
        }
    }

    /// Price used to corroborate a reference match: the candidate's own role
    /// when known, otherwise whatever the other marketplace reported.
    pub fn known_price(&self, role: Marketplace) -> Option<f64> {
        self.price_for(role).or_else(|| self.price_for(role.other()))
    }
}

/// The full product table for one merge pass. Updates happen in place,
/// inserts append; rows are never deleted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_id(&self) -> i64 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0)
    }

    /// Exact listing-URL containment, either marketplace role.
    pub fn contains_url(&self, url: &str) -> bool {
        if url.is_empty() {
            return false;
        }
        self.entries.iter().any(|e| {
            e.source_url_primary.as_deref() == Some(url)
                || e.source_url_secondary.as_deref() == Some(url)
        })
    }

    /// Indices of entries whose category falls under `scope_id`.
    pub fn indices_in_scope(&self, categories: &CategoryTable, scope_id: i64) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| categories.in_scope(e.category_id, scope_id))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn push(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }
}

/// Read-mostly category reference data. The core only looks categories up,
/// it never creates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    categories: Vec<Category>,
    by_id: HashMap<i64, usize>,
}

impl CategoryTable {
    pub fn new(categories: Vec<Category>) -> Self {
        let by_id = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();
        Self { categories, by_id }
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.by_id.get(&id).map(|&i| &self.categories[i])
    }

    pub fn children_of(&self, parent_id: i64) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.parent_id == parent_id)
            .collect()
    }

    /// A category is in scope when it is the scope itself or a direct child.
    pub fn in_scope(&self, category_id: i64, scope_id: i64) -> bool {
        category_id == scope_id
            || self
                .get(category_id)
                .map(|c| c.parent_id == scope_id)
                .unwrap_or(false)
    }
}

/// EAV attribute definition, keyed by (normalized name, category_id).
/// Created lazily on first sight, immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

/// EAV value triple. Identity is (product_id, attribute_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    pub product_id: i64,
    pub attribute_id: i64,
    pub value: String,
}
