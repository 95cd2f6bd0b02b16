//! Table schemas: remote field metadata kept locally and reused across uploads.
//!
//! A schema is pulled once from the fields endpoint ([`pull_schema`]), saved with a
//! [`SchemaStore`], optionally annotated with packer arguments ([`TableSchema::add_field_args`]),
//! and then supplies everything an upload needs: the declaration map, the field-ID map and the
//! ingestion [`Schema`] for the columns of a source file.
//!
//! Stored form (`<base>/schemas/<name>.json`):
//!
//! ```json
//! {"dbid": "bq1234", "fields": {"Duration": {"id": 9, "type": "duration", "args": {"unit": "seconds"}}}}
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, LoaderResult};
use crate::processing::{ColumnDeclaration, Declarations, FieldIdMap};
use crate::profiles::{check_name, list_json_stems, remove_if_exists};
use crate::registry::Registry;
use crate::transport::{RecordsClient, RemoteField};
use crate::types::{DataType, Field, Schema};

/// Labels the fields endpoint returns for address sub-fields without their parent's name.
const ADDRESS_JUNK_LABELS: [&str; 6] = ["Street 1", "Street 2", "City", "State/Region", "Postal Code", "Country"];

/// Suffixes appended to an address field's label; the n-th suffix has field ID `id + n + 1`.
pub const ADDRESS_SUFFIXES: [&str; 6] = [
    ": Street 1",
    ": Street 2",
    ": City",
    ": State/Region",
    ": Postal Code",
    ": Country",
];

/// One remote field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub id: u64,
    /// Registry type name, or the remote name when the registry does not know it.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Named packer arguments (`unit`, `format`, `template`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args: BTreeMap<String, String>,
}

impl FieldSchema {
    pub fn new(id: u64, field_type: impl Into<String>) -> Self {
        Self {
            id,
            field_type: field_type.into(),
            args: BTreeMap::new(),
        }
    }

    /// Declaration with the named arguments laid out positionally.
    ///
    /// Known arguments come first in the order the packer expects; unknown names follow in
    /// sorted order so the argument-count check reports them.
    pub fn declaration(&self, registry: &Registry) -> ColumnDeclaration {
        let required = registry
            .get(&self.field_type)
            .map(|info| info.required_args())
            .unwrap_or(&[]);

        let mut decl = ColumnDeclaration::new(self.field_type.clone());
        for name in required {
            if let Some(v) = self.args.get(*name) {
                decl = decl.with_arg(v.clone());
            }
        }
        for (name, v) in &self.args {
            if !required.contains(&name.as_str()) {
                decl = decl.with_arg(v.clone());
            }
        }
        decl
    }
}

/// Field metadata of one remote table, keyed by field label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(rename = "dbid")]
    pub table_id: String,
    pub fields: BTreeMap<String, FieldSchema>,
}

impl TableSchema {
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Build a schema from the fields endpoint's answer.
    ///
    /// Bare address sub-field labels are skipped and every address field is expanded into
    /// `"<label>: Street 1"` .. `"<label>: Country"` text fields with IDs `id+1` .. `id+6`.
    pub fn from_remote(table_id: impl Into<String>, remote: &[RemoteField], registry: &Registry) -> Self {
        let mut schema = Self::new(table_id);
        for field in remote {
            if ADDRESS_JUNK_LABELS.contains(&field.label.as_str()) {
                continue;
            }
            let field_type = registry
                .canonical_name(&field.field_type)
                .map(str::to_string)
                .unwrap_or_else(|| field.field_type.clone());

            if field_type == "address" {
                for (offset, suffix) in (1u64..).zip(ADDRESS_SUFFIXES) {
                    schema.fields.insert(
                        format!("{}{suffix}", field.label),
                        FieldSchema::new(field.id + offset, "text"),
                    );
                }
            }
            schema
                .fields
                .insert(field.label.clone(), FieldSchema::new(field.id, field_type));
        }
        schema
    }

    /// Declarations for every field, using the built-in registry.
    pub fn declarations(&self) -> Declarations {
        self.declarations_with(Registry::builtin())
    }

    pub fn declarations_with(&self, registry: &Registry) -> Declarations {
        self.fields
            .iter()
            .map(|(label, f)| (label.clone(), f.declaration(registry)))
            .collect()
    }

    /// Field label -> field ID.
    pub fn field_ids(&self) -> FieldIdMap {
        self.fields
            .iter()
            .map(|(label, f)| (label.clone(), f.id.to_string()))
            .collect()
    }

    /// Field ID of the field labelled `label`.
    pub fn field_id(&self, label: &str) -> LoaderResult<u64> {
        self.fields
            .get(label)
            .map(|f| f.id)
            .ok_or_else(|| self.unknown_field(label))
    }

    /// Ingestion schema for a file's columns: each known field is read as its type's natural
    /// data type; anything else is read as text.
    pub fn ingestion_schema<S: AsRef<str>>(&self, columns: &[S]) -> Schema {
        let registry = Registry::builtin();
        Schema::new(
            columns
                .iter()
                .map(|c| {
                    let name = c.as_ref();
                    let data_type = self
                        .fields
                        .get(name)
                        .and_then(|f| registry.get(&f.field_type))
                        .map(|info| info.ingest_as)
                        .unwrap_or(DataType::Utf8);
                    Field::new(name, data_type)
                })
                .collect(),
        )
    }

    /// Merge `args` into the arguments of each named field, overriding same-named ones.
    pub fn add_field_args<S: AsRef<str>>(&mut self, fields: &[S], args: &BTreeMap<String, String>) -> LoaderResult<()> {
        self.check_fields(fields)?;
        for name in fields {
            if let Some(f) = self.fields.get_mut(name.as_ref()) {
                f.args.extend(args.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        Ok(())
    }

    /// Replace the arguments of each named field with `args`.
    pub fn set_field_args<S: AsRef<str>>(&mut self, fields: &[S], args: &BTreeMap<String, String>) -> LoaderResult<()> {
        self.check_fields(fields)?;
        for name in fields {
            if let Some(f) = self.fields.get_mut(name.as_ref()) {
                f.args = args.clone();
            }
        }
        Ok(())
    }

    fn check_fields<S: AsRef<str>>(&self, fields: &[S]) -> LoaderResult<()> {
        match fields.iter().find(|f| !self.fields.contains_key(f.as_ref())) {
            Some(missing) => Err(self.unknown_field(missing.as_ref())),
            None => Ok(()),
        }
    }

    fn unknown_field(&self, label: &str) -> LoaderError {
        LoaderError::TableSchema {
            message: format!("field '{label}' is not in the schema of table {}", self.table_id),
        }
    }
}

/// Fetch and reshape the field list of `table_id`.
pub async fn pull_schema(client: &RecordsClient, table_id: &str) -> LoaderResult<TableSchema> {
    let remote = client.fetch_fields(table_id).await?;
    let schema = TableSchema::from_remote(table_id, &remote, Registry::builtin());
    tracing::info!(table_id, remote_fields = remote.len(), fields = schema.fields.len(), "pulled table schema");
    Ok(schema)
}

/// Directory of saved table schemas.
#[derive(Debug, Clone)]
pub struct SchemaStore {
    dir: PathBuf,
}

impl SchemaStore {
    /// Store under `<base>/schemas`.
    pub fn new(base: &Path) -> Self {
        Self {
            dir: base.join("schemas"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read(&self, name: &str) -> LoaderResult<TableSchema> {
        let path = self.path(name)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(LoaderError::TableSchema {
                message: format!("schema '{name}' does not exist"),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Save `schema` as `name`, replacing any previous copy.
    pub fn write(&self, name: &str, schema: &TableSchema) -> LoaderResult<()> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string_pretty(schema)?)?;
        tracing::debug!(schema = name, path = %path.display(), "schema saved");
        Ok(())
    }

    pub fn list(&self) -> LoaderResult<Vec<String>> {
        list_json_stems(&self.dir)
    }

    /// Remove `name`. Returns whether a schema was removed.
    pub fn delete(&self, name: &str) -> LoaderResult<bool> {
        remove_if_exists(&self.path(name)?)
    }

    fn path(&self, name: &str) -> LoaderResult<PathBuf> {
        check_name(name).map_err(|message| LoaderError::TableSchema { message })?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}
