//! Record schemas and the builder that turns items into records.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{HarvestError, HarvestResult};
use crate::extract::extractor::{ExtractionOutcome, FieldExtractor};
use crate::extract::field::{FieldKind, FieldSpec};
use crate::extract::timestamp::TimestampResolver;
use crate::traits::item::ItemView;
use crate::types::record::{FieldValue, Record};

/// How an identity value is normalized before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyNormalization {
    /// Compare as rendered
    #[default]
    Exact,

    /// Trim and collapse whitespace
    Text,

    /// Trim, drop the fragment and any trailing slash
    Url,
}

/// The field that identifies a record across observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityKey {
    pub field: String,

    #[serde(default)]
    pub normalize: KeyNormalization,
}

impl IdentityKey {
    pub fn new(field: impl Into<String>, normalize: KeyNormalization) -> Self {
        Self {
            field: field.into(),
            normalize,
        }
    }

    /// Normalized identity of a record, or `None` if it has none.
    pub fn key_of(&self, record: &Record) -> Option<String> {
        let value = record.get(&self.field)?;
        if value.is_absent() {
            return None;
        }
        let key = self.normalize(&value.to_cell());
        (!key.is_empty()).then_some(key)
    }

    pub fn normalize(&self, raw: &str) -> String {
        match self.normalize {
            KeyNormalization::Exact => raw.to_string(),
            KeyNormalization::Text => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            KeyNormalization::Url => {
                let trimmed = raw.trim();
                let without_fragment = trimmed.split('#').next().unwrap_or_default();
                without_fragment.trim_end_matches('/').to_string()
            }
        }
    }
}

/// Which fields to build from each item, and how to identify the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub identity: IdentityKey,

    pub fields: Vec<FieldSpec>,

    /// Base for relative URL values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub timestamps: TimestampResolver,
}

impl RecordSchema {
    pub fn new(identity: IdentityKey) -> Self {
        Self {
            identity,
            fields: Vec::new(),
            base_url: None,
            timestamps: TimestampResolver::default(),
        }
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the schema can build records at all.
    pub fn validate(&self) -> HarvestResult<()> {
        if self.fields.is_empty() {
            return Err(HarvestError::Config("schema has no fields".to_string()));
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(HarvestError::Config(format!(
                    "duplicate field name: {}",
                    field.name
                )));
            }
            if field.strategies.is_empty() && field.machine.is_none() {
                return Err(HarvestError::Config(format!(
                    "field {} has no strategies",
                    field.name
                )));
            }
            for strategy in &field.strategies {
                strategy.validate().map_err(|e| {
                    HarvestError::Config(format!("field {}: {e}", field.name))
                })?;
            }
        }

        if self.field(&self.identity.field).is_none() {
            return Err(HarvestError::Config(format!(
                "identity field {} is not in the schema",
                self.identity.field
            )));
        }

        self.parsed_base_url()?;
        Ok(())
    }

    fn parsed_base_url(&self) -> HarvestResult<Option<Url>> {
        self.base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| HarvestError::Config(format!("invalid base_url {raw}: {e}")))
            })
            .transpose()
    }
}

/// Builds records from items according to a schema.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    schema: RecordSchema,
    extractor: FieldExtractor,
}

impl RecordBuilder {
    /// Validate the schema and prepare an extractor for it.
    pub fn new(schema: RecordSchema) -> HarvestResult<Self> {
        schema.validate()?;

        let mut extractor = FieldExtractor::new().with_resolver(schema.timestamps.clone());
        if let Some(base_url) = schema.parsed_base_url()? {
            extractor = extractor.with_base_url(base_url);
        }

        Ok(Self { schema, extractor })
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.schema.identity
    }

    /// Build one record, or `None` if the item misses a required field or
    /// its identity.
    pub fn build<I: ItemView + ?Sized>(
        &self,
        item: &I,
        collected_at: DateTime<Utc>,
    ) -> Option<Record> {
        let mut record = Record::new();

        for field in &self.schema.fields {
            let value = match self.extractor.extract(item, field, collected_at) {
                ExtractionOutcome::Found(value) => value,
                ExtractionOutcome::Absent if field.required => {
                    debug!(field = %field.name, "Required field absent, skipping item");
                    return None;
                }
                ExtractionOutcome::Absent => self.default_for(field, collected_at),
            };
            record.insert(field.name.clone(), value);
        }

        if self.schema.identity.key_of(&record).is_none() {
            debug!(field = %self.schema.identity.field, "Item has no identity, skipping");
            return None;
        }

        Some(record)
    }

    fn default_for(&self, field: &FieldSpec, collected_at: DateTime<Utc>) -> FieldValue {
        if let Some(value) = field
            .default
            .as_deref()
            .and_then(|raw| self.extractor.coerce(field.kind, raw, collected_at))
        {
            return value;
        }
        match field.kind {
            FieldKind::Count => FieldValue::Count(0),
            _ => FieldValue::Absent,
        }
    }
}
