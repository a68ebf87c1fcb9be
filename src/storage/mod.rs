use async_trait::async_trait;
use anyhow::Result;

use crate::models::{AttributeDefinition, AttributeValue, Catalog, CategoryTable};

mod sqlite;
pub use sqlite::SqliteStorage;

/// Persistence collaborator. The merge core only sees full snapshots going in
/// and out; how they are stored is this trait's business.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn migrate(&self) -> Result<()>;
    async fn load_catalog(&self) -> Result<Catalog>;
    /// Full-snapshot rewrite of the product table, transactional.
    async fn save_catalog(&self, catalog: &Catalog) -> Result<()>;
    async fn load_categories(&self) -> Result<CategoryTable>;
    async fn load_attributes(&self) -> Result<(Vec<AttributeDefinition>, Vec<AttributeValue>)>;
    async fn save_attributes(
        &self,
        definitions: &[AttributeDefinition],
        values: &[AttributeValue],
    ) -> Result<()>;
    /// Seed catalog and categories from a JSON export, once, on an empty db.
    async fn import_from_json(&self, json_path: &str) -> Result<()>;
}
