use anyhow::{Context, Result};
use itertools::Itertools;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};

use crate::model::{
    Collection, Conformity, ConformityEdit, ConformityQuery, DocumentFilter, Id, NewConformity,
};
use crate::store::mem::ensure_document_id;
use crate::store::traits::{ConformityStore, DocumentStore};

const MIGRATIONS: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        seq BIGSERIAL,
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        data JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS documents_data_idx ON documents USING GIN (data)",
    r#"
    CREATE TABLE IF NOT EXISTS conformities (
        seq BIGSERIAL,
        id TEXT PRIMARY KEY,
        main_type TEXT NOT NULL,
        main_type_id TEXT NOT NULL,
        rel_type TEXT NOT NULL,
        rel_type_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS conformities_main_idx ON conformities (main_type, main_type_id)",
    "CREATE INDEX IF NOT EXISTS conformities_rel_idx ON conformities (rel_type, rel_type_id)",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Create the document and conformity tables if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in MIGRATIONS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to run database migrations")?;
        }
        log::info!("Database schema is up to date");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_documents(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Value>> {
        let limit = limit.unwrap_or(i64::MAX);
        let rows: Vec<PgRow> = match filter {
            DocumentFilter::All => {
                sqlx::query(
                    "SELECT data FROM documents WHERE collection = $1 ORDER BY seq LIMIT $2",
                )
                .bind(collection.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            DocumentFilter::Id(id) => {
                sqlx::query(
                    "SELECT data FROM documents WHERE collection = $1 AND id = $2 ORDER BY seq LIMIT $3",
                )
                .bind(collection.as_str())
                .bind(id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            DocumentFilter::IdIn(ids) => {
                sqlx::query(
                    "SELECT data FROM documents WHERE collection = $1 AND id = ANY($2) ORDER BY seq LIMIT $3",
                )
                .bind(collection.as_str())
                .bind(ids)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            DocumentFilter::FieldEq(key, value) if value.is_null() => {
                sqlx::query(
                    r#"
                    SELECT data FROM documents
                    WHERE collection = $1 AND (data -> $2 IS NULL OR data -> $2 = 'null'::jsonb)
                    ORDER BY seq LIMIT $3
                    "#,
                )
                .bind(collection.as_str())
                .bind(key)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            DocumentFilter::FieldEq(key, value) => {
                // Scalars also match array members, e.g. {"tagIds": "t1"}
                sqlx::query(
                    r#"
                    SELECT data FROM documents
                    WHERE collection = $1
                      AND (data -> $2 = $3
                           OR (jsonb_typeof(data -> $2) = 'array'
                               AND jsonb_typeof($3) <> 'array'
                               AND data -> $2 @> jsonb_build_array($3)))
                    ORDER BY seq LIMIT $4
                    "#,
                )
                .bind(collection.as_str())
                .bind(key)
                .bind(value)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .with_context(|| format!("Failed to query '{}' with {}", collection, filter.to_json()))?;

        rows.into_iter()
            .map(|row| row.try_get::<Value, _>("data").context("Failed to decode document"))
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresStore {
    async fn find(&self, collection: Collection, filter: &DocumentFilter) -> Result<Vec<Value>> {
        self.fetch_documents(collection, filter, None).await
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &DocumentFilter,
    ) -> Result<Option<Value>> {
        Ok(self
            .fetch_documents(collection, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn upsert_document(&self, collection: Collection, mut document: Value) -> Result<Id> {
        let id = ensure_document_id(&mut document)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET
                data = EXCLUDED.data,
                updated_at = NOW()
            "#,
        )
        .bind(collection.as_str())
        .bind(&id)
        .bind(&document)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert document into '{}'", collection))?;

        Ok(id)
    }

    async fn delete_document(&self, collection: Collection, id: &Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete document from '{}'", collection))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl ConformityStore for PostgresStore {
    async fn saved_conformity(&self, query: &ConformityQuery) -> Result<Vec<Id>> {
        let rows = sqlx::query(
            r#"
            SELECT CASE
                       WHEN main_type = $1 AND main_type_id = $2 AND rel_type = ANY($3)
                       THEN rel_type_id
                       ELSE main_type_id
                   END AS related_id
            FROM conformities
            WHERE (main_type = $1 AND main_type_id = $2 AND rel_type = ANY($3))
               OR (rel_type = $1 AND rel_type_id = $2 AND main_type = ANY($3))
            ORDER BY seq
            "#,
        )
        .bind(&query.main_type)
        .bind(&query.main_type_id)
        .bind(&query.rel_types)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch saved conformities")?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("related_id"))
            .unique()
            .collect())
    }

    async fn add_conformity(&self, edge: NewConformity) -> Result<Conformity> {
        let conformity = Conformity::new(edge);
        insert_conformity(&self.pool, &conformity).await?;
        Ok(conformity)
    }

    async fn edit_conformity(&self, edit: &ConformityEdit) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start conformity transaction")?;

        sqlx::query(
            r#"
            DELETE FROM conformities
            WHERE (main_type = $1 AND main_type_id = $2 AND rel_type = $3)
               OR (rel_type = $1 AND rel_type_id = $2 AND main_type = $3)
            "#,
        )
        .bind(&edit.main_type)
        .bind(&edit.main_type_id)
        .bind(&edit.rel_type)
        .execute(&mut *tx)
        .await
        .context("Failed to clear conformities")?;

        for rel_type_id in edit.rel_type_ids.iter().unique() {
            let conformity = Conformity::new(NewConformity {
                main_type: edit.main_type.clone(),
                main_type_id: edit.main_type_id.clone(),
                rel_type: edit.rel_type.clone(),
                rel_type_id: rel_type_id.clone(),
            });
            insert_conformity(&mut *tx, &conformity).await?;
        }

        tx.commit()
            .await
            .context("Failed to commit conformity changes")?;
        Ok(())
    }

    async fn remove_conformities(&self, entity_type: &str, entity_id: &Id) -> Result<usize> {
        let result = sqlx::query(
            r#"
            DELETE FROM conformities
            WHERE (main_type = $1 AND main_type_id = $2)
               OR (rel_type = $1 AND rel_type_id = $2)
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .execute(&self.pool)
        .await
        .context("Failed to remove conformities")?;

        Ok(result.rows_affected() as usize)
    }
}

async fn insert_conformity<'e, E>(executor: E, conformity: &Conformity) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO conformities (id, main_type, main_type_id, rel_type, rel_type_id, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&conformity.id)
    .bind(&conformity.main_type)
    .bind(&conformity.main_type_id)
    .bind(&conformity.rel_type)
    .bind(&conformity.rel_type_id)
    .bind(conformity.created_at)
    .execute(executor)
    .await
    .context("Failed to insert conformity")?;

    Ok(())
}
