use chrono::NaiveDate;
use qbase_loader::ingestion::csv::{ingest_csv_from_path, ingest_csv_from_reader, read_csv_headers};
use qbase_loader::types::{DataType, Field, Schema, Value};
use qbase_loader::LoaderError;

fn contacts_schema() -> Schema {
    Schema::new(vec![
        Field::new("Name", DataType::Utf8),
        Field::new("Hours", DataType::Numeric),
        Field::new("Start", DataType::Date),
        Field::new("Active", DataType::Bool),
    ])
}

#[test]
fn ingest_csv_from_path_happy_path() {
    let ds = ingest_csv_from_path("tests/fixtures/contacts.csv", &contacts_schema()).unwrap();

    assert_eq!(ds.row_count(), 3);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Utf8("Ada".to_string()),
            Value::Int64(3600),
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Value::Bool(true),
        ]
    );
    // Empty cells are null; "y" is a boolean.
    assert_eq!(ds.rows[1][1], Value::Null);
    assert_eq!(ds.rows[2][2], Value::Null);
    assert_eq!(ds.rows[2][3], Value::Bool(true));
}

#[test]
fn headers_are_read_in_file_order() {
    assert_eq!(
        read_csv_headers("tests/fixtures/contacts.csv").unwrap(),
        vec!["Name", "Phone", "Hours", "Start", "Active", "Notes"]
    );
}

#[test]
fn ingest_csv_allows_reordered_columns() {
    let input = "Active,Start,Hours,Name\nno,2024-01-02,1.5,Ada\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let ds = ingest_csv_from_reader(&mut rdr, &contacts_schema()).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Utf8("Ada".to_string()));
    assert_eq!(ds.rows[0][1], Value::Float64(1.5));
    assert_eq!(ds.rows[0][3], Value::Bool(false));
}

#[test]
fn ingest_csv_errors_on_missing_required_column() {
    let input = "Name,Hours,Start\nAda,1,2024-01-02\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    let err = ingest_csv_from_reader(&mut rdr, &contacts_schema()).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required column 'Active'"));
}

#[test]
fn ingest_csv_parse_errors_carry_row_and_column() {
    let input = "Name,Hours,Start,Active\nAda,1,2024-01-02,yes\nGrace,lots,2024-01-03,no\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    match ingest_csv_from_reader(&mut rdr, &contacts_schema()).unwrap_err() {
        LoaderError::ParseError { row, column, raw, .. } => {
            // Header is row 1.
            assert_eq!(row, 3);
            assert_eq!(column, "Hours");
            assert_eq!(raw, "lots");
        }
        other => panic!("unexpected error: {other}"),
    }
}
