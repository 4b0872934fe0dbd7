use crate::i18n::TranslatableField;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Identifies the entity that owns a set of translatable fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    pub translations: TranslatableField,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// All translatable fields of one entity, keyed by field name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    #[serde(flatten)]
    pub entity: EntityRef,
    pub fields: BTreeMap<String, FieldRecord>,
}

impl EntityRecord {
    /// Field mappings without timestamps.
    pub fn translations(&self) -> BTreeMap<String, TranslatableField> {
        self.fields
            .iter()
            .map(|(name, record)| (name.clone(), record.translations.clone()))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity {entity_type}/{entity_id} already has translatable content")]
    AlreadyExists {
        entity_type: String,
        entity_id: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    fn already_exists(entity: &EntityRef) -> Self {
        StoreError::AlreadyExists {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
        }
    }
}

type MemoryTables = HashMap<EntityRef, BTreeMap<String, FieldRecord>>;

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory(Arc<Mutex<MemoryTables>>),
}

/// Persistence for translatable fields.
///
/// Every mutation runs as one atomic read-modify-write per entity: the
/// PostgreSQL backend holds row locks for the duration of a transaction, the
/// in-memory backend holds its mutex. Concurrent updates to different language
/// keys of the same field therefore both survive.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connect to PostgreSQL and create tables
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        let db = Self {
            backend: Backend::Postgres(pool),
        };
        db.run_migrations().await?;
        Ok(db)
    }

    /// A process-local store with the same contract as PostgreSQL
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(Mutex::new(HashMap::new()))),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.backend, Backend::Memory(_))
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let Backend::Postgres(pool) = &self.backend else {
            return Ok(());
        };

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translatable_fields (
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                field_name TEXT NOT NULL,
                translations JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (entity_type, entity_id, field_name)
            )",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Load every translatable field of an entity
    pub async fn load_entity(
        &self,
        entity: &EntityRef,
    ) -> Result<Option<EntityRecord>, StoreError> {
        let fields = match &self.backend {
            Backend::Postgres(pool) => {
                let rows = sqlx::query_as::<_, FieldRow>(SELECT_FIELDS)
                    .bind(&entity.entity_type)
                    .bind(&entity.entity_id)
                    .fetch_all(pool)
                    .await?;
                rows_to_fields(rows)
            }
            Backend::Memory(tables) => tables.lock().await.get(entity).cloned().unwrap_or_default(),
        };

        if fields.is_empty() {
            return Ok(None);
        }

        Ok(Some(EntityRecord {
            entity: entity.clone(),
            fields,
        }))
    }

    /// Create all fields of a new entity in one transaction
    pub async fn create_entity(
        &self,
        entity: &EntityRef,
        fields: BTreeMap<String, TranslatableField>,
    ) -> Result<EntityRecord, StoreError> {
        let now = Utc::now();

        match &self.backend {
            Backend::Postgres(pool) => {
                let mut tx = pool.begin().await?;

                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS (
                        SELECT 1 FROM translatable_fields WHERE entity_type = $1 AND entity_id = $2
                    )",
                )
                .bind(&entity.entity_type)
                .bind(&entity.entity_id)
                .fetch_one(&mut *tx)
                .await?;

                if exists {
                    return Err(StoreError::already_exists(entity));
                }

                for (name, translations) in &fields {
                    let result = sqlx::query(
                        "INSERT INTO translatable_fields
                            (entity_type, entity_id, field_name, translations, created_at, updated_at)
                         VALUES ($1, $2, $3, $4, $5, $5)",
                    )
                    .bind(&entity.entity_type)
                    .bind(&entity.entity_id)
                    .bind(name)
                    .bind(Json(translations.entries()))
                    .bind(now)
                    .execute(&mut *tx)
                    .await;

                    if let Err(e) = result {
                        if is_unique_violation(&e) {
                            return Err(StoreError::already_exists(entity));
                        }
                        return Err(e.into());
                    }
                }

                tx.commit().await?;
            }
            Backend::Memory(tables) => {
                let mut tables = tables.lock().await;
                if tables.get(entity).is_some_and(|fields| !fields.is_empty()) {
                    return Err(StoreError::already_exists(entity));
                }
                tables.insert(entity.clone(), records_at(&fields, now, now));
            }
        }

        Ok(EntityRecord {
            entity: entity.clone(),
            fields: records_at(&fields, now, now),
        })
    }

    /// Atomically read, change and write back the fields of an entity.
    ///
    /// `apply` receives the current mappings and returns the fields to write
    /// (any subset, new fields included) plus a value handed back to the
    /// caller. Fields it does not return are left untouched. If `apply` fails
    /// nothing is written. Returns `Ok(None)` when the entity has no fields.
    pub async fn modify_entity<T, E, F>(&self, entity: &EntityRef, apply: F) -> Result<Option<T>, E>
    where
        F: FnOnce(
            &BTreeMap<String, TranslatableField>,
        ) -> Result<(BTreeMap<String, TranslatableField>, T), E>,
        E: From<StoreError>,
    {
        let now = Utc::now();

        match &self.backend {
            Backend::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(StoreError::from)?;

                let rows = sqlx::query_as::<_, FieldRow>(&format!("{SELECT_FIELDS} FOR UPDATE"))
                    .bind(&entity.entity_type)
                    .bind(&entity.entity_id)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(StoreError::from)?;

                if rows.is_empty() {
                    return Ok(None);
                }

                let current = translations_of(&rows_to_fields(rows));
                let (changed, output) = apply(&current)?;

                for (name, translations) in &changed {
                    // Existing rows are locked and `translations` is a superset of
                    // them. A field missing from `current` may be inserted
                    // concurrently; merging on conflict keeps both writers' keys.
                    sqlx::query(
                        "INSERT INTO translatable_fields
                            (entity_type, entity_id, field_name, translations, created_at, updated_at)
                         VALUES ($1, $2, $3, $4, $5, $5)
                         ON CONFLICT (entity_type, entity_id, field_name) DO UPDATE
                         SET translations = translatable_fields.translations || EXCLUDED.translations,
                             updated_at = EXCLUDED.updated_at",
                    )
                    .bind(&entity.entity_type)
                    .bind(&entity.entity_id)
                    .bind(name)
                    .bind(Json(translations.entries()))
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::from)?;
                }

                tx.commit().await.map_err(StoreError::from)?;
                Ok(Some(output))
            }
            Backend::Memory(tables) => {
                let mut tables = tables.lock().await;
                let Some(fields) = tables.get_mut(entity).filter(|fields| !fields.is_empty()) else {
                    return Ok(None);
                };

                let (changed, output) = apply(&translations_of(fields))?;

                for (name, translations) in changed {
                    fields
                        .entry(name)
                        .and_modify(|record| {
                            record.translations = translations.clone();
                            record.updated_at = now;
                        })
                        .or_insert_with(|| FieldRecord {
                            translations,
                            created_at: now,
                            updated_at: now,
                        });
                }

                Ok(Some(output))
            }
        }
    }

    /// Remove every field of an entity. Returns whether anything was removed.
    pub async fn delete_entity(&self, entity: &EntityRef) -> Result<bool, StoreError> {
        match &self.backend {
            Backend::Postgres(pool) => {
                let result = sqlx::query(
                    "DELETE FROM translatable_fields WHERE entity_type = $1 AND entity_id = $2",
                )
                .bind(&entity.entity_type)
                .bind(&entity.entity_id)
                .execute(pool)
                .await?;

                Ok(result.rows_affected() > 0)
            }
            Backend::Memory(tables) => Ok(tables
                .lock()
                .await
                .remove(entity)
                .is_some_and(|fields| !fields.is_empty())),
        }
    }

    /// Check that the store is reachable
    pub async fn ping(&self) -> Result<(), StoreError> {
        if let Backend::Postgres(pool) = &self.backend {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

const SELECT_FIELDS: &str = "SELECT field_name, translations, created_at, updated_at
     FROM translatable_fields
     WHERE entity_type = $1 AND entity_id = $2
     ORDER BY field_name";

type FieldRow = (String, Json<BTreeMap<String, String>>, DateTime<Utc>, DateTime<Utc>);

fn rows_to_fields(rows: Vec<FieldRow>) -> BTreeMap<String, FieldRecord> {
    rows.into_iter()
        .map(|(name, Json(entries), created_at, updated_at)| {
            (
                name,
                FieldRecord {
                    translations: TranslatableField::from_entries(entries),
                    created_at,
                    updated_at,
                },
            )
        })
        .collect()
}

fn translations_of(fields: &BTreeMap<String, FieldRecord>) -> BTreeMap<String, TranslatableField> {
    fields
        .iter()
        .map(|(name, record)| (name.clone(), record.translations.clone()))
        .collect()
}

fn records_at(
    fields: &BTreeMap<String, TranslatableField>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> BTreeMap<String, FieldRecord> {
    fields
        .iter()
        .map(|(name, translations)| {
            (
                name.clone(),
                FieldRecord {
                    translations: translations.clone(),
                    created_at,
                    updated_at,
                },
            )
        })
        .collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
