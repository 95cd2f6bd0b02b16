use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;

use qbase_loader::ingestion::parquet::{ingest_parquet_from_path, read_parquet_columns};
use qbase_loader::types::{DataType, Field, Schema, Value};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("qbase-loader-{name}-{nanos}.parquet"))
}

const SHIFTS_SCHEMA: &str = r#"
    message schema {
      REQUIRED BINARY name (UTF8);
      REQUIRED INT64 seconds;
      REQUIRED INT32 start (DATE);
      REQUIRED INT64 clocked_in (TIMESTAMP_MILLIS);
      REQUIRED BOOLEAN active;
    }
"#;

/// 2024-03-01 as days since the Unix epoch.
const START_DAYS: i32 = 19_783;

fn clocked_in() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn write_shifts_parquet(path: &PathBuf) {
    let schema = Arc::new(parse_message_type(SHIFTS_SCHEMA).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();

    let millis = clocked_in().and_utc().timestamp_millis();
    let mut rg = writer.next_row_group().unwrap();
    let mut col_idx: usize = 0;
    while let Some(mut col) = rg.next_column().unwrap() {
        match col.untyped() {
            ColumnWriter::ByteArrayColumnWriter(w) => {
                w.write_batch(&[ByteArray::from("Ada"), ByteArray::from("Grace")], None, None)
                    .unwrap();
            }
            ColumnWriter::Int64ColumnWriter(w) => {
                // `seconds` (col 1) and `clocked_in` (col 3) are both INT64.
                if col_idx == 3 {
                    w.write_batch(&[millis, millis + 60_000], None, None).unwrap();
                } else {
                    w.write_batch(&[3600_i64, 5400_i64], None, None).unwrap();
                }
            }
            ColumnWriter::Int32ColumnWriter(w) => {
                w.write_batch(&[START_DAYS, START_DAYS + 1], None, None).unwrap();
            }
            ColumnWriter::BoolColumnWriter(w) => {
                w.write_batch(&[true, false], None, None).unwrap();
            }
            _ => panic!("unexpected column writer in test"),
        }
        col.close().unwrap();
        col_idx += 1;
    }
    rg.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn ingest_parquet_with_logical_temporal_types() {
    let path = tmp_file("shifts");
    write_shifts_parquet(&path);

    let schema = Schema::new(vec![
        Field::new("name", DataType::Utf8),
        Field::new("seconds", DataType::Numeric),
        Field::new("start", DataType::Date),
        Field::new("clocked_in", DataType::DateTime),
        Field::new("active", DataType::Bool),
    ]);
    let ds = ingest_parquet_from_path(&path, &schema).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Utf8("Ada".to_string()),
            Value::Int64(3600),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Value::DateTime(clocked_in()),
            Value::Bool(true),
        ]
    );
    assert_eq!(
        ds.rows[1][2],
        Value::Date(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn text_schema_keeps_temporal_columns_structured() {
    let path = tmp_file("shifts-text");
    write_shifts_parquet(&path);

    let schema = Schema::new(vec![Field::new("start", DataType::Utf8)]);
    let ds = ingest_parquet_from_path(&path, &schema).unwrap();
    assert!(matches!(ds.rows[0][0], Value::Date(_)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn columns_and_missing_column_error() {
    let path = tmp_file("shifts-cols");
    write_shifts_parquet(&path);

    assert_eq!(
        read_parquet_columns(&path).unwrap(),
        vec!["name", "seconds", "start", "clocked_in", "active"]
    );

    let schema = Schema::new(vec![Field::new("overtime", DataType::Numeric)]);
    let err = ingest_parquet_from_path(&path, &schema).unwrap_err();
    assert!(err.to_string().contains("missing required column 'overtime'"));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn wrong_type_is_a_parse_error_with_row() {
    let path = tmp_file("shifts-bad");
    write_shifts_parquet(&path);

    let schema = Schema::new(vec![Field::new("name", DataType::Bool)]);
    let err = ingest_parquet_from_path(&path, &schema).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("row 1"));
    assert!(msg.contains("column 'name'"));

    let _ = std::fs::remove_file(&path);
}
