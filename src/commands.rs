//! Command implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use qbase_loader::config::{Settings, base_dir};
use qbase_loader::ingestion::{IngestionFormat, IngestionOptions, ingest_from_path, source_columns};
use qbase_loader::pack::{DATE_WIRE_FORMAT, DATETIME_WIRE_FORMAT};
use qbase_loader::processing::{ColumnDeclaration, Declarations, assemble, batch, transform};
use qbase_loader::profiles::{ProfileStore, ProfileUpdate};
use qbase_loader::registry::{ColumnRole, Registry};
use qbase_loader::schema::{SchemaStore, pull_schema};
use qbase_loader::transport::{
    CompositeObserver, FetchRequest, FileObserver, RecordsClient, TracingObserver, UploadMode, UploadObserver,
    fetch, upload,
};
use qbase_loader::types::{DataSet, Field, Schema, Value};
use qbase_loader::{LoaderError, LoaderResult};

use crate::cli::{FetchArgs, FieldArgs, ProfileCommand, ProfileSetArgs, RecordsCommand, SchemaCommand, UploadArgs};

pub fn run_types() {
    for info in Registry::builtin().iter() {
        let role = match info.role {
            ColumnRole::Drop => "drop",
            ColumnRole::Pack(_) => "pack",
            ColumnRole::Unsupported => "unsupported",
        };
        let args = info.required_args().join(", ");
        println!("{:<22} {:<12} {:<10} {}", info.name, role, args, info.description);
        if !info.aliases.is_empty() {
            println!("{:<22} aliases: {}", "", info.aliases.join(", "));
        }
    }
}

pub fn run_profile(command: ProfileCommand) -> LoaderResult<()> {
    let store = ProfileStore::new(&base_dir()?);
    match command {
        ProfileCommand::Set(ProfileSetArgs {
            name,
            host,
            user,
            token,
            temp_token,
        }) => {
            let profile = store.set(
                &name,
                ProfileUpdate {
                    host,
                    user,
                    token,
                    temp_token,
                },
            )?;
            if let Err(e) = profile.validate(&name) {
                eprintln!("warning: {e}");
            }
        }
        ProfileCommand::Show { name } => {
            let profile = store.get(&name)?.ok_or_else(|| LoaderError::Profile {
                message: format!("profile '{name}' does not exist"),
            })?;
            let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "<unset>".to_string());
            println!("QB-Realm-Hostname: {}", show(&profile.realm_hostname));
            println!("User-Agent:        {}", show(&profile.user_agent));
            println!(
                "Authorization:     {}",
                profile
                    .authorization
                    .as_deref()
                    .map(redact_token)
                    .unwrap_or_else(|| "<unset>".to_string())
            );
            match profile.validate(&name) {
                Ok(()) => println!("valid"),
                Err(e) => println!("invalid: {e}"),
            }
        }
        ProfileCommand::List => {
            for name in store.list()? {
                println!("{name}");
            }
        }
        ProfileCommand::Delete { name } => {
            if !store.delete(&name)? {
                eprintln!("profile '{name}' does not exist");
            }
        }
    }
    Ok(())
}

fn redact_token(auth: &str) -> String {
    match auth.rsplit_once('_') {
        Some((head, tail)) if tail.chars().count() > 4 => {
            let hidden = tail.chars().count() - 4;
            let shown: String = tail.chars().skip(hidden).collect();
            format!("{head}_{}{shown}", "*".repeat(hidden))
        }
        _ => "<redacted>".to_string(),
    }
}

pub async fn run_schema(command: SchemaCommand) -> LoaderResult<()> {
    let base = base_dir()?;
    let store = SchemaStore::new(&base);
    match command {
        SchemaCommand::Pull {
            table_id,
            profile,
            name,
        } => {
            let credentials = ProfileStore::new(&base).credentials(&profile)?;
            let settings = Settings::load(&base)?;
            let client = RecordsClient::with_base_url(&credentials, &settings.api.base_url)?;
            let schema = pull_schema(&client, &table_id).await?;
            let name = name.unwrap_or(table_id);
            store.write(&name, &schema)?;
            println!("saved schema '{name}' with {} fields", schema.fields.len());
        }
        SchemaCommand::Show { name } => {
            let schema = store.read(&name)?;
            println!("table {}", schema.table_id);
            for (label, field) in &schema.fields {
                let args = field
                    .args
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{:>6}  {:<40} {:<22} {args}", field.id, label, field.field_type);
            }
        }
        SchemaCommand::List => {
            for name in store.list()? {
                println!("{name}");
            }
        }
        SchemaCommand::Delete { name } => {
            if !store.delete(&name)? {
                eprintln!("schema '{name}' does not exist");
            }
        }
        SchemaCommand::SetArgs(args) => update_args(&store, args, true)?,
        SchemaCommand::AddArgs(args) => update_args(&store, args, false)?,
    }
    Ok(())
}

fn update_args(store: &SchemaStore, args: FieldArgs, replace: bool) -> LoaderResult<()> {
    let mut schema = store.read(&args.name)?;
    let named: BTreeMap<String, String> = args.args.into_iter().collect();
    if replace {
        schema.set_field_args(&args.fields, &named)?;
    } else {
        schema.add_field_args(&args.fields, &named)?;
    }
    store.write(&args.name, &schema)
}

/// Returns whether every batch was accepted.
pub async fn run_upload(args: UploadArgs) -> LoaderResult<bool> {
    let base = base_dir()?;
    let settings = Settings::load(&base)?;
    let table = SchemaStore::new(&base).read(&args.schema)?;
    let format = args.format.map(IngestionFormat::from);

    let columns = source_columns(&args.file, format)?;
    let declarations = build_declarations(&table.declarations(), &args, &columns)?;
    let schema = ingestion_schema(&table.ingestion_schema(&columns), &declarations);
    let dataset = ingest_from_path(&args.file, &schema, &IngestionOptions { format })?;
    let field_ids = table.field_ids();

    let mut options = settings.upload_options();
    if let Some(size) = args.batch_size {
        options.batch_size = size;
    }
    if let Some(n) = args.concurrent {
        options.mode = UploadMode::Concurrent { max_in_flight: n };
    }
    options.upsert.merge_field_id = args.merge_field;
    options.upsert.fields_to_return = args.return_fields.clone();

    if args.dry_run {
        return dry_run(&args.file, &dataset, &declarations, &field_ids, options.batch_size);
    }

    let profile = args.profile.as_deref().ok_or_else(|| LoaderError::Profile {
        message: "an upload needs --profile".to_string(),
    })?;
    let credentials = ProfileStore::new(&base).credentials(profile)?;
    let client = RecordsClient::with_base_url(&credentials, &settings.api.base_url)?;

    let mut observers: Vec<Arc<dyn UploadObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(path) = &args.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }
    options.observer = Some(Arc::new(CompositeObserver::new(observers)));

    let report = upload(&client, &table.table_id, &dataset, &declarations, &field_ids, &options).await?;
    let totals = report.totals();
    println!(
        "{} of {} batches accepted, {} records sent: {} created, {} updated, {} unchanged, {} line errors",
        report.outcomes.iter().filter(|o| o.is_success()).count(),
        report.batch_count,
        report.records_sent(),
        totals.created,
        totals.updated,
        totals.unchanged,
        totals.line_errors,
    );
    if !args.return_fields.is_empty() {
        for outcome in &report.outcomes {
            if let Ok(response) = &outcome.result {
                for row in &response.data {
                    println!("{row}");
                }
            }
        }
    }
    for failed in report.failures() {
        if let Err(e) = &failed.result {
            eprintln!("batch {} failed: {e}", failed.index + 1);
        }
    }
    if report.skipped() > 0 {
        eprintln!("{} batches were not sent", report.skipped());
    }
    Ok(report.is_success())
}

pub async fn run_records(command: RecordsCommand) -> LoaderResult<()> {
    match command {
        RecordsCommand::Fetch(args) => run_fetch(args).await,
    }
}

async fn run_fetch(args: FetchArgs) -> LoaderResult<()> {
    let base = base_dir()?;
    let settings = Settings::load(&base)?;
    let table = SchemaStore::new(&base).read(&args.schema)?;
    let credentials = ProfileStore::new(&base).credentials(&args.profile)?;
    let client = RecordsClient::with_base_url(&credentials, &settings.api.base_url)?;

    let request = FetchRequest {
        columns: args.columns,
        sort: args.sort,
        skip: args.skip,
        limit: args.limit,
    };
    let dataset = fetch(&client, &table, &request).await?;

    match &args.output {
        Some(path) => {
            write_csv(std::fs::File::create(path)?, &dataset)?;
            println!("wrote {} records to {}", dataset.row_count(), path.display());
        }
        None => write_csv(io::stdout().lock(), &dataset)?,
    }
    Ok(())
}

fn write_csv<W: io::Write>(out: W, dataset: &DataSet) -> LoaderResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(dataset.schema.field_names())?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(csv_cell))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Utf8(s) => s.clone(),
        Value::Date(d) => d.format(DATE_WIRE_FORMAT).to_string(),
        Value::DateTime(dt) => dt.format(DATETIME_WIRE_FORMAT).to_string(),
        other => other.to_string(),
    }
}

/// Schema declarations, then `--declare` overrides, then `drop` for unmatched columns.
fn build_declarations(base: &Declarations, args: &UploadArgs, columns: &[String]) -> LoaderResult<Declarations> {
    let mut declarations = base.clone();
    for (column, decl) in &args.declarations {
        declarations.insert(column.clone(), decl.parse()?);
    }
    if args.drop_unmatched {
        for column in columns {
            declarations
                .entry(column.clone())
                .or_insert_with(ColumnDeclaration::drop_column);
        }
    }
    Ok(declarations)
}

/// Re-type columns whose declaration was overridden on the command line.
fn ingestion_schema(schema: &Schema, declarations: &Declarations) -> Schema {
    let registry = Registry::builtin();
    Schema::new(
        schema
            .fields
            .iter()
            .map(|f| {
                let data_type = declarations
                    .get(&f.name)
                    .and_then(|d| registry.get(&d.column_type))
                    .map(|info| info.ingest_as)
                    .unwrap_or(f.data_type);
                Field::new(f.name.clone(), data_type)
            })
            .collect(),
    )
}

fn dry_run(
    file: &Path,
    dataset: &DataSet,
    declarations: &Declarations,
    field_ids: &qbase_loader::processing::FieldIdMap,
    batch_size: usize,
) -> LoaderResult<bool> {
    let packed = transform(dataset, declarations)?;
    let records = assemble(&packed, field_ids)?;
    let first = records.first().map(|r| r.to_plain_json());
    let batches = batch(records, batch_size)?;
    println!(
        "{}: {} rows, {} packed columns, {} batches",
        file.display(),
        dataset.row_count(),
        packed.columns.len(),
        batches.len()
    );
    if let Some(first) = first {
        println!("{}", serde_json::to_string_pretty(&first)?);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetched_rows_write_as_csv() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let ds = DataSet::from_columns(vec![
            ("Name".to_string(), vec![Value::Utf8("Ada, L.".to_string()), Value::Null]),
            ("Start".to_string(), vec![Value::Date(start), Value::Null]),
            ("Hours".to_string(), vec![Value::Int64(3_600_000), Value::Float64(1.5)]),
        ]);
        let mut out = Vec::new();
        write_csv(&mut out, &ds).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Name,Start,Hours\n\"Ada, L.\",2024-03-01,3600000\n,,1.5\n");
    }

    #[test]
    fn token_tail_is_kept() {
        assert_eq!(
            redact_token("QB-USER-TOKEN b12345_abc_0_abcdefghijklmnopqrstuv"),
            "QB-USER-TOKEN b12345_abc_0_******************stuv"
        );
        assert_eq!(redact_token("short"), "<redacted>");
    }
}
