//! Translation service: ties the language registry, the content schema and
//! storage together for the operations exposed over HTTP.

use crate::db::{Database, EntityRecord, EntityRef, StoreError};
use crate::i18n::{
    apply_granular_update, EntryState, FieldViolation, Language, LanguageRegistry,
    TranslatableField, TranslationInput, TranslationMetrics, TranslationValidator,
    ValidationError, ViolationKind,
};
use crate::schema::{ContentSchema, EntitySchema, FieldSpec};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown entity type '{0}'")]
    UnknownEntityType(String),

    #[error("entity type '{entity_type}' has no translatable field '{field}'")]
    UnknownField { entity_type: String, field: String },

    #[error("{entity_type}/{entity_id} has no translatable content")]
    NotFound {
        entity_type: String,
        entity_id: String,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    fn not_found(entity: &EntityRef) -> Self {
        ServiceError::NotFound {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
        }
    }
}

/// Every translatable field of an entity resolved to one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContent {
    #[serde(flatten)]
    pub entity: EntityRef,
    pub language: Language,
    /// Text direction of `language`
    pub dir: &'static str,
    pub fields: BTreeMap<String, String>,
    /// Fields served in another language, with the code actually used
    pub fallbacks: BTreeMap<String, &'static str>,
}

/// Outcome of a granular translation update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationUpdated {
    #[serde(flatten)]
    pub entity: EntityRef,
    pub field: String,
    pub language: Language,
    pub value: String,
    pub previous_state: EntryState,
    pub state: EntryState,
    pub translations: TranslatableField,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct TranslationService {
    registry: Arc<LanguageRegistry>,
    schema: &'static ContentSchema,
    db: Database,
    metrics: &'static TranslationMetrics,
}

impl TranslationService {
    pub fn new(registry: Arc<LanguageRegistry>, db: Database) -> Self {
        Self {
            registry,
            schema: ContentSchema::get(),
            db,
            metrics: TranslationMetrics::global(),
        }
    }

    /// Report to `metrics` instead of the process-wide counters.
    pub fn with_metrics(mut self, metrics: &'static TranslationMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn metrics(&self) -> &'static TranslationMetrics {
        self.metrics
    }

    fn entity_schema(&self, entity_type: &str) -> Result<&'static EntitySchema, ServiceError> {
        self.schema
            .entity(entity_type)
            .ok_or_else(|| ServiceError::UnknownEntityType(entity_type.to_string()))
    }

    fn field_spec(
        &self,
        entity_type: &str,
        field: &str,
    ) -> Result<&'static FieldSpec, ServiceError> {
        self.entity_schema(entity_type)?
            .field(field)
            .ok_or_else(|| ServiceError::UnknownField {
                entity_type: entity_type.to_string(),
                field: field.to_string(),
            })
    }

    /// Create every translatable field of a new entity at once.
    ///
    /// All required fields must be supplied and every supplied field must
    /// carry text in at least one language.
    pub async fn create_content(
        &self,
        entity: &EntityRef,
        input: &BTreeMap<String, TranslationInput>,
    ) -> Result<EntityRecord, ServiceError> {
        let schema = self.entity_schema(&entity.entity_type)?;
        let mut violations = unknown_fields(schema, input);
        let mut fields = BTreeMap::new();

        for spec in schema.required_fields() {
            if !input.contains_key(spec.name) {
                violations.push(FieldViolation::new(spec.name, None, ViolationKind::Required));
            }
        }

        for (name, value) in input {
            let Some(spec) = schema.field(name) else {
                continue;
            };
            match TranslationValidator::validate_new_field(
                &self.registry,
                name,
                &spec.constraint,
                value,
            ) {
                Ok(field) => {
                    fields.insert(name.clone(), field);
                }
                Err(e) => violations.extend(e.violations),
            }
        }

        if !violations.is_empty() {
            warn!(
                "Rejected content for {}/{}: {} violation(s)",
                entity.entity_type,
                entity.entity_id,
                violations.len()
            );
            return Err(ValidationError { violations }.into());
        }

        let record = self.db.create_entity(entity, fields).await?;
        info!(
            "Created {}/{} with {} translatable field(s)",
            entity.entity_type,
            entity.entity_id,
            record.fields.len()
        );
        Ok(record)
    }

    /// Update several fields of an existing entity, merging the supplied
    /// entries into each stored mapping.
    pub async fn update_content(
        &self,
        entity: &EntityRef,
        input: &BTreeMap<String, TranslationInput>,
    ) -> Result<EntityRecord, ServiceError> {
        let schema = self.entity_schema(&entity.entity_type)?;
        let violations = unknown_fields(schema, input);
        if !violations.is_empty() {
            return Err(ValidationError { violations }.into());
        }

        let registry = Arc::clone(&self.registry);
        let changed = self
            .db
            .modify_entity::<_, ServiceError, _>(entity, |current| {
                let mut violations = Vec::new();
                let mut changed = BTreeMap::new();

                for (name, value) in input {
                    let Some(spec) = schema.field(name) else {
                        continue;
                    };
                    let existing = current.get(name).cloned().unwrap_or_default();
                    match TranslationValidator::validate_merge(
                        &registry,
                        name,
                        &spec.constraint,
                        &existing,
                        value,
                    ) {
                        Ok(merged) => {
                            changed.insert(name.clone(), merged);
                        }
                        Err(e) => violations.extend(e.violations),
                    }
                }

                if violations.is_empty() {
                    let count = changed.len();
                    Ok((changed, count))
                } else {
                    Err(ServiceError::from(ValidationError { violations }))
                }
            })
            .await?
            .ok_or_else(|| ServiceError::not_found(entity))?;

        info!(
            "Updated {} field(s) of {}/{}",
            changed, entity.entity_type, entity.entity_id
        );

        self.db
            .load_entity(entity)
            .await?
            .ok_or_else(|| ServiceError::not_found(entity))
    }

    /// Destroy every translatable field of an entity.
    pub async fn delete_content(&self, entity: &EntityRef) -> Result<(), ServiceError> {
        self.entity_schema(&entity.entity_type)?;

        if !self.db.delete_entity(entity).await? {
            return Err(ServiceError::not_found(entity));
        }

        info!("Deleted translatable content of {}/{}", entity.entity_type, entity.entity_id);
        Ok(())
    }

    /// Resolve every field of an entity to `language`.
    pub async fn resolve_content(
        &self,
        entity: &EntityRef,
        language: Language,
    ) -> Result<ResolvedContent, ServiceError> {
        self.entity_schema(&entity.entity_type)?;

        let record = self
            .db
            .load_entity(entity)
            .await?
            .ok_or_else(|| ServiceError::not_found(entity))?;

        let mut fields = BTreeMap::new();
        let mut fallbacks = BTreeMap::new();

        for (name, field) in &record.fields {
            let resolved = field
                .translations
                .resolve_detailed(&self.registry, language.code());
            self.metrics.record_resolution(resolved.source);
            if let (true, Some(code)) = (resolved.is_fallback(), resolved.language) {
                fallbacks.insert(name.clone(), code);
            }
            fields.insert(name.clone(), resolved.text.to_string());
        }

        Ok(ResolvedContent {
            entity: entity.clone(),
            language,
            dir: if self.registry.is_rtl(language.code()) {
                "rtl"
            } else {
                "ltr"
            },
            fields,
            fallbacks,
        })
    }

    /// Full per-language mappings of every field, for editing tools.
    pub async fn translations(&self, entity: &EntityRef) -> Result<EntityRecord, ServiceError> {
        self.entity_schema(&entity.entity_type)?;

        self.db
            .load_entity(entity)
            .await?
            .ok_or_else(|| ServiceError::not_found(entity))
    }

    /// Set one language entry of one field, leaving sibling entries intact.
    pub async fn update_translation(
        &self,
        entity: &EntityRef,
        field: &str,
        code: &str,
        value: &str,
    ) -> Result<TranslationUpdated, ServiceError> {
        let spec = self.field_spec(&entity.entity_type, field)?;
        let registry = Arc::clone(&self.registry);

        let result = self
            .db
            .modify_entity::<_, ServiceError, _>(entity, |current| {
                let existing = current.get(field).cloned().unwrap_or_default();
                let update = apply_granular_update(
                    &registry,
                    field,
                    &spec.constraint,
                    &existing,
                    code,
                    value,
                )
                .map_err(ServiceError::from)?;

                let mut changed = BTreeMap::new();
                if update.is_change(&existing) {
                    changed.insert(field.to_string(), update.field.clone());
                }
                Ok((changed, update))
            })
            .await;

        let metrics = self.metrics;
        let update = match result {
            Ok(Some(update)) => update,
            Ok(None) => return Err(ServiceError::not_found(entity)),
            Err(e) => {
                metrics.record_update_rejected();
                warn!(
                    "Rejected translation {}/{} {}[{}]: {}",
                    entity.entity_type, entity.entity_id, field, code, e
                );
                return Err(e);
            }
        };

        metrics.record_update_applied();
        info!(
            "Translation {}/{} {}[{}]: {:?} -> {:?}",
            entity.entity_type, entity.entity_id, field, update.language, update.from, update.to
        );
        if !update.warnings.is_empty() {
            warn!(
                "Translation quality warnings for {}/{} {}[{}]: {:?}",
                entity.entity_type, entity.entity_id, field, update.language, update.warnings
            );
        }

        Ok(TranslationUpdated {
            entity: entity.clone(),
            field: field.to_string(),
            language: update.language,
            value: update.value,
            previous_state: update.from,
            state: update.to,
            translations: update.field,
            warnings: update.warnings,
        })
    }
}

fn unknown_fields(
    schema: &EntitySchema,
    input: &BTreeMap<String, TranslationInput>,
) -> Vec<FieldViolation> {
    input
        .keys()
        .filter(|name| schema.field(name).is_none())
        .map(|name| FieldViolation::new(name, None, ViolationKind::UnknownField))
        .collect()
}
