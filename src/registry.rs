//! Column-type registry: the closed table of declared column types.
//!
//! Each entry maps a type name to a human description and to what the transform engine does with
//! a column of that type: drop it, pack it with a [`PackerKind`], or refuse it as unsupported.
//! The table is built once ([`Registry::builtin`]) and is read-only afterwards.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::types::DataType;

/// Which packer family a column type uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackerKind {
    /// Pass-through ([`crate::pack::pack_default`]).
    Default,
    /// [`crate::pack::pack_duration`].
    Duration,
    /// [`crate::pack::pack_date`].
    Date,
    /// [`crate::pack::pack_datetime`].
    DateTime,
    /// [`crate::pack::pack_phone`].
    Phone,
}

impl PackerKind {
    /// Names of the positional declaration arguments this packer requires.
    pub fn required_args(self) -> &'static [&'static str] {
        match self {
            PackerKind::Default => &[],
            PackerKind::Duration => &["unit"],
            PackerKind::Date | PackerKind::DateTime => &["format"],
            PackerKind::Phone => &["template"],
        }
    }
}

/// What the transform engine does with a column of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Omit the column from the output.
    Drop,
    /// Pack every value with this packer family.
    Pack(PackerKind),
    /// Recognised type with no packer; using it is a configuration error.
    Unsupported,
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTypeInfo {
    /// Canonical type name.
    pub name: &'static str,
    /// Alternative names (remote field-type spellings).
    pub aliases: &'static [&'static str],
    /// Human description, shown by the CLI.
    pub description: &'static str,
    /// Dispatch target.
    pub role: ColumnRole,
    /// The raw data type a CSV column of this type is read as.
    pub ingest_as: DataType,
}

impl ColumnTypeInfo {
    /// Required declaration argument names (empty for drop/unsupported types).
    pub fn required_args(&self) -> &'static [&'static str] {
        match self.role {
            ColumnRole::Pack(kind) => kind.required_args(),
            ColumnRole::Drop | ColumnRole::Unsupported => &[],
        }
    }
}

/// Immutable mapping from type name (or alias) to [`ColumnTypeInfo`].
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<ColumnTypeInfo>,
    by_name: BTreeMap<&'static str, usize>,
}

impl Registry {
    /// Build a registry from entries. Later entries win on name collisions.
    pub fn new(entries: Vec<ColumnTypeInfo>) -> Self {
        let mut by_name = BTreeMap::new();
        for (idx, e) in entries.iter().enumerate() {
            by_name.insert(e.name, idx);
            for alias in e.aliases {
                by_name.insert(*alias, idx);
            }
        }
        Self { entries, by_name }
    }

    /// The process-wide built-in registry.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: LazyLock<Registry> = LazyLock::new(|| Registry::new(builtin_entries()));
        &BUILTIN
    }

    /// Look up a type by canonical name or alias.
    pub fn get(&self, name: &str) -> Option<&ColumnTypeInfo> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// Canonical name for `name`, resolving aliases.
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        self.get(name).map(|info| info.name)
    }

    /// Iterate entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnTypeInfo> {
        self.entries.iter()
    }
}

fn entry(
    name: &'static str,
    aliases: &'static [&'static str],
    role: ColumnRole,
    ingest_as: DataType,
    description: &'static str,
) -> ColumnTypeInfo {
    ColumnTypeInfo {
        name,
        aliases,
        description,
        role,
        ingest_as,
    }
}

fn builtin_entries() -> Vec<ColumnTypeInfo> {
    use ColumnRole::{Drop, Pack, Unsupported};
    use DataType::{Bool, Numeric, Utf8};

    vec![
        entry("drop", &[], Drop, Utf8, "column is not uploaded"),
        entry("numeric", &[], Pack(PackerKind::Default), Numeric, "int or float data"),
        entry("numeric-percent", &["percent"], Pack(PackerKind::Default), Numeric, "floats from zero to one inclusive"),
        entry("numeric-rating", &["rating"], Pack(PackerKind::Default), Numeric, "integer from one to five"),
        entry("numeric-currency", &["currency"], Pack(PackerKind::Default), Numeric, "float indicating currency"),
        entry("record-id", &["recordid"], Pack(PackerKind::Default), Numeric, "integer record id; the default merge field"),
        entry(
            "checkbox",
            &[],
            Pack(PackerKind::Default),
            Bool,
            "boolean; true/false, yes/no, y/n, t/f, 1/0 (case-insensitive)",
        ),
        entry("text", &[], Pack(PackerKind::Default), Utf8, "string of text"),
        entry("rich-text", &[], Pack(PackerKind::Default), Utf8, "html text"),
        entry("multi-line-text", &["text-multi-line"], Pack(PackerKind::Default), Utf8, "text with '\\n' for newlines"),
        entry("multiple-choice-text", &["text-multiple-choice"], Pack(PackerKind::Default), Utf8, "string naming the selected option"),
        entry("url", &[], Pack(PackerKind::Default), Utf8, "string of a url"),
        entry("email", &["email-address"], Pack(PackerKind::Default), Utf8, "email address as a string"),
        entry(
            "address",
            &[],
            Pack(PackerKind::Default),
            Utf8,
            "composite field; upload its ': Street 1' .. ': Country' sub-fields as separate columns",
        ),
        entry(
            "duration",
            &[],
            Pack(PackerKind::Duration),
            Numeric,
            "duration; argument: unit ('seconds' or 'milliseconds'), sent as milliseconds",
        ),
        entry(
            "date",
            &[],
            Pack(PackerKind::Date),
            Utf8,
            "date as a string or date value; argument: strftime format, e.g. '%m.%d.%Y'",
        ),
        entry(
            "datetime",
            &["timestamp"],
            Pack(PackerKind::DateTime),
            Utf8,
            "datetime as a string or datetime value; argument: strftime format, e.g. '%d%b%Y:%H:%M:%S.%f'",
        ),
        entry(
            "phone",
            &["phone-number"],
            Pack(PackerKind::Phone),
            Utf8,
            "phone number string; argument: template where '#' marks a digit, e.g. '(###) ###-#### x###'",
        ),
        entry("multi-select", &[], Unsupported, Utf8, "list of strings (not supported)"),
        entry("time-of-day", &["timeofday"], Unsupported, Utf8, "military time hh:mm:ss.sss (not supported)"),
        entry("user", &[], Unsupported, Utf8, "user object with an id (not supported)"),
        entry("list-user", &["multiuser"], Unsupported, Utf8, "list of user objects (not supported)"),
        entry("file-attachment", &["file"], Unsupported, Utf8, "not supported"),
        entry("lookup", &[], Unsupported, Utf8, "not supported"),
        entry("summary", &[], Unsupported, Utf8, "not supported"),
    ]
}
