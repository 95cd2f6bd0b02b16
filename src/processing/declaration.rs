//! Per-column type declarations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Column name -> declaration.
pub type Declarations = HashMap<String, ColumnDeclaration>;

/// A column's declared type tag plus its positional, type-specific arguments.
///
/// Parses from `"type"` or `"type:arg"`. Only the first `:` splits, so datetime formats keep
/// their colons: `"datetime:%d%b%Y:%H:%M:%S.%f"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDeclaration {
    /// Registry type name.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Positional arguments bound to the packer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl ColumnDeclaration {
    /// Declaration with no arguments.
    pub fn new(column_type: impl Into<String>) -> Self {
        Self {
            column_type: column_type.into(),
            args: Vec::new(),
        }
    }

    /// Append a positional argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The `drop` declaration.
    pub fn drop_column() -> Self {
        Self::new("drop")
    }
}

impl FromStr for ColumnDeclaration {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, arg) = match s.split_once(':') {
            Some((tag, arg)) => (tag.trim(), Some(arg)),
            None => (s.trim(), None),
        };
        if tag.is_empty() {
            return Err(LoaderError::Declaration {
                message: format!("'{s}' has an empty column type"),
            });
        }
        let decl = Self::new(tag);
        Ok(match arg {
            Some(a) => decl.with_arg(a),
            None => decl,
        })
    }
}

impl fmt::Display for ColumnDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.column_type)?;
        for a in &self.args {
            write!(f, ":{a}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_tag() {
        let d: ColumnDeclaration = "numeric".parse().unwrap();
        assert_eq!(d, ColumnDeclaration::new("numeric"));
    }

    #[test]
    fn splits_on_first_colon_only() {
        let d: ColumnDeclaration = "datetime:%d%b%Y:%H:%M:%S.%f".parse().unwrap();
        assert_eq!(d.column_type, "datetime");
        assert_eq!(d.args, vec!["%d%b%Y:%H:%M:%S.%f".to_string()]);
        assert_eq!(d.to_string(), "datetime:%d%b%Y:%H:%M:%S.%f");
    }

    #[test]
    fn empty_tag_is_rejected() {
        let err = ":seconds".parse::<ColumnDeclaration>().unwrap_err();
        assert!(matches!(err, LoaderError::Declaration { .. }));
        assert!(err.is_configuration());
        assert!(err.to_string().contains("':seconds'"));
    }

    #[test]
    fn serde_uses_type_key_and_omits_empty_args() {
        let d = ColumnDeclaration::new("duration").with_arg("seconds");
        assert_eq!(
            serde_json::to_string(&d).unwrap(),
            r#"{"type":"duration","args":["seconds"]}"#
        );
        let text: ColumnDeclaration = serde_json::from_str(r#"{"type":"text"}"#).unwrap();
        assert_eq!(text, ColumnDeclaration::new("text"));
        assert_eq!(serde_json::to_string(&text).unwrap(), r#"{"type":"text"}"#);
    }
}
