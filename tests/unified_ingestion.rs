use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use polars::df;

use qbase_loader::ingestion::{
    dataset_from_frame, ingest_from_path, source_columns, IngestionFormat, IngestionOptions, IngestionRequest,
};
use qbase_loader::types::{DataType, Field, Schema, Value};
use qbase_loader::LoaderError;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("qbase-loader-unified-{nanos}{ext}"))
}

fn name_hours_schema() -> Schema {
    Schema::new(vec![
        Field::new("Name", DataType::Utf8),
        Field::new("Hours", DataType::Numeric),
    ])
}

#[test]
fn csv_and_json_are_detected_by_extension() {
    let opts = IngestionOptions::default();
    let csv = ingest_from_path("tests/fixtures/contacts.csv", &name_hours_schema(), &opts).unwrap();
    let json = ingest_from_path("tests/fixtures/contacts.json", &name_hours_schema(), &opts).unwrap();
    let ndjson = ingest_from_path("tests/fixtures/contacts.ndjson", &name_hours_schema(), &opts).unwrap();

    assert_eq!(csv.rows, json.rows);
    assert_eq!(ndjson.row_count(), 2);
    assert_eq!(csv.rows[0], vec![Value::Utf8("Ada".to_string()), Value::Int64(3600)]);
}

#[test]
fn explicit_format_reads_files_without_extension() {
    let path = tmp_file("");
    std::fs::write(&path, "Name,Hours\nAda,5\n").unwrap();

    let err = ingest_from_path(&path, &name_hours_schema(), &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, LoaderError::SchemaMismatch { .. }));

    let req = IngestionRequest {
        path: path.clone(),
        schema: name_hours_schema(),
        options: IngestionOptions {
            format: Some(IngestionFormat::Csv),
        },
    };
    let ds = req.run().unwrap();
    assert_eq!(ds.rows[0][1], Value::Int64(5));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_extension_is_rejected() {
    let err = ingest_from_path("contacts.xlsx", &name_hours_schema(), &IngestionOptions::default()).unwrap_err();
    assert!(err.to_string().contains("cannot infer format from extension 'xlsx'"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ingest_from_path(
        "tests/fixtures/does_not_exist.json",
        &name_hours_schema(),
        &IngestionOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, LoaderError::Io(_)));
}

#[test]
fn source_columns_follow_the_file() {
    let cols = source_columns("tests/fixtures/contacts.csv", None).unwrap();
    assert_eq!(cols.first().map(String::as_str), Some("Name"));
    assert_eq!(cols.len(), 6);
}

#[test]
fn dataframe_converts_to_dataset() {
    let df = df!(
        "Name" => ["Ada", "Grace"],
        "Hours" => [Some(3600i64), None],
        "Active" => [true, false],
    )
    .unwrap();

    let ds = dataset_from_frame(&df).unwrap();
    assert_eq!(ds.schema.fields[1], Field::new("Hours", DataType::Int64));
    assert_eq!(
        ds.rows[0],
        vec![Value::Utf8("Ada".to_string()), Value::Int64(3600), Value::Bool(true)]
    );
    assert_eq!(ds.rows[1][1], Value::Null);
}
