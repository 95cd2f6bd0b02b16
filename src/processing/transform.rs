//! Transform engine: applies declared packers to every column of a [`DataSet`].
//!
//! The engine works in two phases:
//!
//! 1. **Plan** (sequential): every dataset column is resolved against its declaration and the
//!    [`Registry`]. Undeclared columns, unknown/unsupported types and bad arguments fail here,
//!    before any value is packed.
//! 2. **Pack** (parallel, one rayon task per column): the bound [`Packer`] is applied to every
//!    value in row order. The first failing column in dataset order is reported, wrapped with
//!    its name and declared type.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{LoaderError, LoaderResult, PackError};
use crate::pack::{check_format, digit_slots, DurationUnit, PackedValue, Packer};
use crate::registry::{ColumnRole, ColumnTypeInfo, PackerKind, Registry};
use crate::types::{DataSet, Schema};

use super::declaration::{ColumnDeclaration, Declarations};

/// A resolved, ready-to-run column: which dataset column, which bound packer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Dataset column name.
    pub column: String,
    /// Dataset column index.
    pub index: usize,
    /// Declared type, as written in the declaration.
    pub column_type: String,
    /// Packer with its arguments bound.
    pub packer: Packer,
}

/// One packed output column, aligned by row with the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedColumn {
    /// Column name (same as the input column).
    pub name: String,
    /// Declared type.
    pub column_type: String,
    /// `None` is the absent marker.
    pub values: Vec<Option<PackedValue>>,
}

/// Output of [`transform`]: the non-dropped columns, each entry absent or `{"value": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedDataSet {
    /// Packed columns in input order.
    pub columns: Vec<PackedColumn>,
    row_count: usize,
}

impl PackedDataSet {
    /// Build from columns. Every column should have `row_count` values; [`super::assemble()`]
    /// rejects columns that do not.
    pub fn new(columns: Vec<PackedColumn>, row_count: usize) -> Self {
        Self { columns, row_count }
    }

    /// Number of rows (kept even when every column was dropped).
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Look up a packed column by name.
    pub fn column(&self, name: &str) -> Option<&PackedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Transform `dataset` using the built-in [`Registry`].
///
/// Every dataset column must have a declaration; declare unwanted columns as `drop`.
///
/// ```rust
/// use std::collections::HashMap;
///
/// use qbase_loader::pack::PackedValue;
/// use qbase_loader::processing::{transform, ColumnDeclaration};
/// use qbase_loader::types::{DataSet, Value};
///
/// let ds = DataSet::from_columns(vec![
///     ("nums".to_string(), vec![Value::Int64(1), Value::Null]),
///     ("durr".to_string(), vec![Value::Int64(5), Value::Int64(10)]),
/// ]);
/// let decls = HashMap::from([
///     ("nums".to_string(), ColumnDeclaration::new("numeric")),
///     ("durr".to_string(), ColumnDeclaration::new("duration").with_arg("seconds")),
/// ]);
///
/// let packed = transform(&ds, &decls).unwrap();
/// assert_eq!(packed.column("nums").unwrap().values[1], None);
/// assert_eq!(
///     packed.column("durr").unwrap().values[0],
///     Some(PackedValue::new(5000))
/// );
/// ```
pub fn transform(dataset: &DataSet, declarations: &Declarations) -> LoaderResult<PackedDataSet> {
    transform_with(dataset, declarations, Registry::builtin())
}

/// Transform `dataset` using an explicit registry.
pub fn transform_with(
    dataset: &DataSet,
    declarations: &Declarations,
    registry: &Registry,
) -> LoaderResult<PackedDataSet> {
    let plans = plan_columns(&dataset.schema, declarations, registry)?;

    let results: Vec<LoaderResult<PackedColumn>> = plans
        .par_iter()
        .map(|plan| pack_column(dataset, plan))
        .collect();
    let columns = results.into_iter().collect::<LoaderResult<Vec<_>>>()?;

    info!(
        rows = dataset.row_count(),
        columns = columns.len(),
        dropped = dataset.column_count() - columns.len(),
        "transformed dataset"
    );
    Ok(PackedDataSet::new(columns, dataset.row_count()))
}

/// Resolve every schema field to a [`ColumnPlan`]; dropped columns produce no plan.
pub fn plan_columns(
    schema: &Schema,
    declarations: &Declarations,
    registry: &Registry,
) -> LoaderResult<Vec<ColumnPlan>> {
    let mut plans = Vec::with_capacity(schema.fields.len());
    for (index, field) in schema.fields.iter().enumerate() {
        let decl = declarations
            .get(&field.name)
            .ok_or_else(|| LoaderError::MissingDeclaration {
                column: field.name.clone(),
            })?;
        let info = registry
            .get(&decl.column_type)
            .ok_or_else(|| LoaderError::UnknownColumnType {
                column: field.name.clone(),
                column_type: decl.column_type.clone(),
            })?;

        match info.role {
            ColumnRole::Drop => {
                debug!(column = %field.name, "dropping column");
            }
            ColumnRole::Unsupported => {
                return Err(LoaderError::UnsupportedColumnType {
                    column: field.name.clone(),
                    column_type: decl.column_type.clone(),
                });
            }
            ColumnRole::Pack(kind) => {
                let packer = bind_packer(&field.name, decl, info, kind)?;
                debug!(column = %field.name, declaration = %decl, "planned column");
                plans.push(ColumnPlan {
                    column: field.name.clone(),
                    index,
                    column_type: decl.column_type.clone(),
                    packer,
                });
            }
        }
    }
    Ok(plans)
}

/// Check the declaration's arguments and bind them to a [`Packer`].
fn bind_packer(
    column: &str,
    decl: &ColumnDeclaration,
    info: &ColumnTypeInfo,
    kind: PackerKind,
) -> LoaderResult<Packer> {
    let names = info.required_args();
    if decl.args.len() != names.len() {
        return Err(LoaderError::ArgumentCount {
            column: column.to_string(),
            column_type: decl.column_type.clone(),
            expected: names.len(),
            names: if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            },
            found: decl.args.len(),
        });
    }

    let invalid = |argument: &str, message: String| LoaderError::InvalidArgument {
        column: column.to_string(),
        column_type: decl.column_type.clone(),
        argument: argument.to_string(),
        message,
    };

    Ok(match kind {
        PackerKind::Default => Packer::Default,
        PackerKind::Duration => {
            let unit: DurationUnit = decl.args[0]
                .parse()
                .map_err(|e: PackError| invalid(&decl.args[0], e.to_string()))?;
            Packer::Duration(unit)
        }
        PackerKind::Date | PackerKind::DateTime => {
            let format = &decl.args[0];
            check_format(format).map_err(|m| invalid(format, m))?;
            if kind == PackerKind::Date {
                Packer::Date(format.clone())
            } else {
                Packer::DateTime(format.clone())
            }
        }
        PackerKind::Phone => {
            let template = &decl.args[0];
            let slots = digit_slots(template);
            if slots < 10 {
                return Err(invalid(
                    template,
                    format!("template has {slots} '#' digit positions, at least 10 are required"),
                ));
            }
            Packer::Phone(template.clone())
        }
    })
}

fn pack_column(dataset: &DataSet, plan: &ColumnPlan) -> LoaderResult<PackedColumn> {
    let values = dataset
        .column(plan.index)
        .enumerate()
        .map(|(row0, raw)| {
            plan.packer.pack(raw).map_err(|source| LoaderError::Pack {
                column: plan.column.clone(),
                column_type: plan.column_type.clone(),
                row: row0 + 1,
                source,
            })
        })
        .collect::<LoaderResult<Vec<_>>>()?;

    debug!(
        column = %plan.column,
        present = values.iter().filter(|v| v.is_some()).count(),
        "packed column"
    );
    Ok(PackedColumn {
        name: plan.column.clone(),
        column_type: plan.column_type.clone(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::Value;

    fn decls(entries: &[(&str, &str)]) -> Declarations {
        entries
            .iter()
            .map(|(c, d)| (c.to_string(), d.parse::<ColumnDeclaration>().unwrap()))
            .collect()
    }

    fn sample() -> DataSet {
        DataSet::from_columns(vec![
            ("nums".to_string(), vec![Value::Int64(1), Value::Null]),
            ("durr".to_string(), vec![Value::Int64(5), Value::Int64(10)]),
            (
                "when".to_string(),
                vec![Value::Utf8("11.22.1972".to_string()), Value::Null],
            ),
        ])
    }

    #[test]
    fn packs_declared_columns_and_drops_others() {
        let ds = sample();
        let out = transform(
            &ds,
            &decls(&[("nums", "numeric"), ("durr", "duration:seconds"), ("when", "drop")]),
        )
        .unwrap();

        assert_eq!(out.row_count(), 2);
        assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["nums", "durr"]);
        assert_eq!(
            out.column("nums").unwrap().values,
            vec![Some(PackedValue::new(1)), None]
        );
        assert_eq!(
            out.column("durr").unwrap().values,
            vec![Some(PackedValue::new(5000)), Some(PackedValue::new(10000))]
        );
    }

    #[test]
    fn date_argument_is_bound_per_column() {
        let ds = sample();
        let out = transform(
            &ds,
            &decls(&[("nums", "drop"), ("durr", "drop"), ("when", "date:%m.%d.%Y")]),
        )
        .unwrap();
        assert_eq!(
            out.column("when").unwrap().values,
            vec![Some(PackedValue::new("1972-11-22")), None]
        );
    }

    #[test]
    fn undeclared_column_fails_fast() {
        let err = transform(&sample(), &decls(&[("nums", "numeric"), ("durr", "drop")])).unwrap_err();
        assert!(matches!(err, LoaderError::MissingDeclaration { ref column } if column == "when"));
    }

    #[test]
    fn extra_declarations_are_ignored() {
        let out = transform(
            &sample(),
            &decls(&[
                ("nums", "numeric"),
                ("durr", "drop"),
                ("when", "drop"),
                ("not_in_dataset", "text"),
            ]),
        )
        .unwrap();
        assert_eq!(out.columns.len(), 1);
    }

    #[test]
    fn unsupported_type_names_the_column() {
        let err = transform(
            &sample(),
            &decls(&[("nums", "lookup"), ("durr", "drop"), ("when", "drop")]),
        )
        .unwrap_err();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("'nums'"), "{msg}");
        assert!(msg.contains("not supported"), "{msg}");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = transform(
            &sample(),
            &decls(&[("nums", "numberish"), ("durr", "drop"), ("when", "drop")]),
        )
        .unwrap_err();
        assert!(matches!(err, LoaderError::UnknownColumnType { .. }));
    }

    #[test]
    fn missing_or_extra_arguments_are_configuration_errors() {
        let err = transform(
            &sample(),
            &decls(&[("nums", "numeric"), ("durr", "duration"), ("when", "drop")]),
        )
        .unwrap_err();
        assert!(matches!(err, LoaderError::ArgumentCount { expected: 1, found: 0, .. }));
        assert!(err.to_string().contains("'durr'"));

        let err = transform(
            &sample(),
            &decls(&[("nums", "numeric:x"), ("durr", "drop"), ("when", "drop")]),
        )
        .unwrap_err();
        assert!(matches!(err, LoaderError::ArgumentCount { expected: 0, found: 1, .. }));
    }

    #[test]
    fn bad_unit_format_or_template_fail_at_plan_time() {
        for bad in ["duration:minutes", "date:%Q", "phone:###-####"] {
            let err = transform(
                &sample(),
                &decls(&[("nums", "drop"), ("durr", bad), ("when", "drop")]),
            )
            .unwrap_err();
            assert!(matches!(err, LoaderError::InvalidArgument { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn packer_failure_aborts_with_column_context() {
        let ds = DataSet::from_columns(vec![(
            "when".to_string(),
            vec![Value::Utf8("11.22.1972".to_string()), Value::Utf8("bogus".to_string())],
        )]);
        let err = transform(&ds, &decls(&[("when", "date:%m.%d.%Y")])).unwrap_err();
        match err {
            LoaderError::Pack {
                column,
                column_type,
                row,
                source,
            } => {
                assert_eq!(column, "when");
                assert_eq!(column_type, "date");
                assert_eq!(row, 2);
                assert!(matches!(source, PackError::DateParse { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn first_failing_column_in_dataset_order_is_reported() {
        let ds = DataSet::from_columns(vec![
            ("a".to_string(), vec![Value::Bool(true)]),
            ("b".to_string(), vec![Value::Bool(true)]),
        ]);
        let d: Declarations = HashMap::from([
            ("a".to_string(), ColumnDeclaration::new("duration").with_arg("seconds")),
            ("b".to_string(), ColumnDeclaration::new("date").with_arg("%Y")),
        ]);
        for _ in 0..8 {
            let err = transform(&ds, &d).unwrap_err();
            assert!(matches!(err, LoaderError::Pack { ref column, .. } if column == "a"));
        }
    }

    #[test]
    fn aliases_are_accepted() {
        let ds = DataSet::from_columns(vec![(
            "tel".to_string(),
            vec![Value::Utf8("9205551234".to_string())],
        )]);
        let out = transform(&ds, &decls(&[("tel", "phone-number:##########")])).unwrap();
        assert_eq!(out.columns[0].column_type, "phone-number");
        assert_eq!(
            out.columns[0].values,
            vec![Some(PackedValue::new("(920) 555-1234"))]
        );
    }
}
