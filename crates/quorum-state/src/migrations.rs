//! SurrealDB schema initialization
//!
//! Sets up the similarity table with write-once permissions and lookup
//! indexes. Safe to call multiple times (idempotent).

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Table holding similarity records.
pub const SIMILARITY_TABLE: &str = "similarity_records";

/// Initialize all quorum tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing quorum SurrealDB schema");
    init_similarity_table(db).await?;
    info!("quorum schema initialization complete");
    Ok(())
}

/// Initialize `similarity_records` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE similarity_records {
///   record_id:    STRING (unique)
///   question:     STRING
///   signature:    STRING (indexed)
///   chosen_key:   STRING (indexed)
///   quality:      FLOAT
///   recorded_at:  DATETIME (indexed)
/// }
/// ```
///
/// Rows are write-once: update and delete permissions are `NONE`.
async fn init_similarity_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing similarity_records table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS similarity_records
            SCHEMALESS
            PERMISSIONS
                FOR select, create FULL
                FOR update, delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_record_id ON TABLE similarity_records COLUMNS record_id UNIQUE;

        -- Exact-match lookups by question digest
        DEFINE INDEX IF NOT EXISTS idx_signature ON TABLE similarity_records COLUMNS signature;

        DEFINE INDEX IF NOT EXISTS idx_chosen_key ON TABLE similarity_records COLUMNS chosen_key;

        DEFINE INDEX IF NOT EXISTS idx_recorded_at ON TABLE similarity_records COLUMNS recorded_at;
    "#;

    db.query(sql).await?.check()?;
    info!("similarity_records table initialized");
    Ok(())
}
