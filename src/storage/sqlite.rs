use async_trait::async_trait;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::models::{
    AttributeDefinition, AttributeValue, Catalog, CatalogEntry, Category, CategoryTable,
};
use crate::storage::Storage;

pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open SQLite database")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Shape of the JSON seed file: a spreadsheet export of the two read tables.
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    products: Vec<CatalogEntry>,
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                reference_primary TEXT,
                reference_secondary TEXT,
                price_primary REAL,
                price_secondary REAL,
                availability_primary TEXT,
                availability_secondary TEXT,
                source_url_primary TEXT,
                source_url_secondary TEXT
            );
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                parent_id INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS attributes (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                UNIQUE (name, category_id)
            );
            CREATE TABLE IF NOT EXISTS attribute_values (
                product_id INTEGER NOT NULL,
                attribute_id INTEGER NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (product_id, attribute_id)
            );
            CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);",
        )?;

        info!("Database migration completed");
        Ok(())
    }

    async fn load_catalog(&self) -> Result<Catalog> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, name, category_id, reference_primary, reference_secondary,
                    price_primary, price_secondary, availability_primary,
                    availability_secondary, source_url_primary, source_url_secondary
             FROM products ORDER BY id",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(CatalogEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category_id: row.get(2)?,
                    reference_primary: row.get(3)?,
                    reference_secondary: row.get(4)?,
                    price_primary: row.get(5)?,
                    price_secondary: row.get(6)?,
                    availability_primary: row.get(7)?,
                    availability_secondary: row.get(8)?,
                    source_url_primary: row.get(9)?,
                    source_url_secondary: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Catalog::new(entries))
    }

    async fn save_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Snapshot rewrite, same as replacing the whole sheet.
        tx.execute("DELETE FROM products", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (
                    id, name, category_id, reference_primary, reference_secondary,
                    price_primary, price_secondary, availability_primary,
                    availability_secondary, source_url_primary, source_url_secondary
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for e in &catalog.entries {
                stmt.execute(params![
                    e.id,
                    e.name,
                    e.category_id,
                    e.reference_primary,
                    e.reference_secondary,
                    e.price_primary,
                    e.price_secondary,
                    e.availability_primary,
                    e.availability_secondary,
                    e.source_url_primary,
                    e.source_url_secondary,
                ])?;
            }
        }

        tx.commit()?;
        info!(rows = catalog.len(), "catalog snapshot saved");
        Ok(())
    }

    async fn load_categories(&self) -> Result<CategoryTable> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT id, name, parent_id FROM categories ORDER BY id")?;
        let categories = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    parent_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CategoryTable::new(categories))
    }

    async fn load_attributes(&self) -> Result<(Vec<AttributeDefinition>, Vec<AttributeValue>)> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare("SELECT id, name, category_id FROM attributes ORDER BY id")?;
        let definitions = stmt
            .query_map([], |row| {
                Ok(AttributeDefinition {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category_id: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt =
            conn.prepare("SELECT product_id, attribute_id, value FROM attribute_values")?;
        let values = stmt
            .query_map([], |row| {
                Ok(AttributeValue {
                    product_id: row.get(0)?,
                    attribute_id: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((definitions, values))
    }

    async fn save_attributes(
        &self,
        definitions: &[AttributeDefinition],
        values: &[AttributeValue],
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO attributes (id, name, category_id) VALUES (?1, ?2, ?3)",
            )?;
            for d in definitions {
                stmt.execute(params![d.id, d.name, d.category_id])?;
            }

            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO attribute_values (product_id, attribute_id, value)
                 VALUES (?1, ?2, ?3)",
            )?;
            for v in values {
                stmt.execute(params![v.product_id, v.attribute_id, v.value])?;
            }
        }

        tx.commit()?;
        info!(
            definitions = definitions.len(),
            values = values.len(),
            "attribute tables saved"
        );
        Ok(())
    }

    async fn import_from_json(&self, json_path: &str) -> Result<()> {
        if !Path::new(json_path).exists() {
            info!("No JSON seed file to import");
            return Ok(());
        }

        let content = std::fs::read_to_string(json_path)
            .with_context(|| format!("Failed to read seed file {json_path}"))?;
        let seed: SeedFile = serde_json::from_str(&content)
            .with_context(|| format!("Malformed seed file {json_path}"))?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO categories (id, name, parent_id) VALUES (?1, ?2, ?3)",
            )?;
            for c in &seed.categories {
                stmt.execute(params![c.id, c.name, c.parent_id])?;
            }

            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO products (
                    id, name, category_id, reference_primary, reference_secondary,
                    price_primary, price_secondary, availability_primary,
                    availability_secondary, source_url_primary, source_url_secondary
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for e in &seed.products {
                stmt.execute(params![
                    e.id,
                    e.name,
                    e.category_id,
                    e.reference_primary,
                    e.reference_secondary,
                    e.price_primary,
                    e.price_secondary,
                    e.availability_primary,
                    e.availability_secondary,
                    e.source_url_primary,
                    e.source_url_secondary,
                ])?;
            }
        }

        tx.commit()?;
        info!(
            categories = seed.categories.len(),
            products = seed.products.len(),
            "seed imported from {json_path}"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn memory_storage() -> SqliteStorage {
        let storage = SqliteStorage {
            conn: Arc::new(Mutex::new(Connection::open_in_memory().unwrap())),
        };
        storage.migrate().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn catalog_round_trips_through_snapshot_save() {
        let storage = memory_storage().await;

        let mut entry = CatalogEntry::new(1, "Canon Pixma MG2541S".to_string(), 11);
        entry.reference_primary = Some("MG2541S".to_string());
        entry.price_primary = Some(120.0);
        let catalog = Catalog::new(vec![entry]);

        storage.save_catalog(&catalog).await.unwrap();
        let loaded = storage.load_catalog().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries[0].id, 1);
        assert_eq!(loaded.entries[0].reference_primary.as_deref(), Some("MG2541S"));
        assert_eq!(loaded.entries[0].price_primary, Some(120.0));
        assert_eq!(loaded.entries[0].reference_secondary, None);
    }

    #[tokio::test]
    async fn attribute_values_are_upserted_on_resave() {
        let storage = memory_storage().await;

        let defs = vec![AttributeDefinition {
            id: 1,
            name: "Puissance".to_string(),
            category_id: 10,
        }];
        let values = vec![AttributeValue {
            product_id: 1,
            attribute_id: 1,
            value: "650 VA".to_string(),
        }];
        storage.save_attributes(&defs, &values).await.unwrap();

        let replaced = vec![AttributeValue {
            product_id: 1,
            attribute_id: 1,
            value: "700 VA".to_string(),
        }];
        storage.save_attributes(&defs, &replaced).await.unwrap();

        let (loaded_defs, loaded_values) = storage.load_attributes().await.unwrap();
        assert_eq!(loaded_defs.len(), 1);
        assert_eq!(loaded_values.len(), 1);
        assert_eq!(loaded_values[0].value, "700 VA");
    }
}
