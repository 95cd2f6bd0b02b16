//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use qbase_loader::ingestion::IngestionFormat;
use qbase_loader::transport::SortOrder;

#[derive(Parser)]
#[command(
    name = "qbase-loader",
    version,
    about = "Pack tabular files by column type and upsert them into a remote table",
    long_about = "Pack CSV, JSON or Parquet files by declared column type and upsert them into a \
                  remote table in batches.\n\n\
                  Profiles hold request credentials; table schemas hold field IDs, types and \
                  packer arguments. Both are stored under $QBASE_LOADER_HOME (or the platform \
                  data directory)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the column types and their arguments.
    Types,

    /// Manage connection profiles.
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Manage stored table schemas.
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// Pack a file and upsert it into a table.
    Upload(UploadArgs),

    /// Read records from a table.
    #[command(subcommand)]
    Records(RecordsCommand),
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Create a profile or update some of its values.
    Set(ProfileSetArgs),
    /// Print a profile (token redacted) and whether it is usable.
    Show { name: String },
    /// List profile names.
    List,
    /// Delete a profile.
    Delete { name: String },
}

#[derive(Args)]
pub struct ProfileSetArgs {
    pub name: String,

    /// Realm name, e.g. `demo` for demo.quickbase.com.
    #[arg(long)]
    pub host: Option<String>,

    /// User agent (defaults to the profile name).
    #[arg(long)]
    pub user: Option<String>,

    /// API token without its `QB-USER-TOKEN` prefix.
    #[arg(long)]
    pub token: Option<String>,

    /// The token is a temporary token.
    #[arg(long)]
    pub temp_token: bool,
}

#[derive(Subcommand)]
pub enum SchemaCommand {
    /// Download a table's fields and save them as a schema.
    Pull {
        /// Remote table ID.
        table_id: String,
        /// Profile authorizing the request.
        #[arg(long, short)]
        profile: String,
        /// Name to save the schema under (defaults to the table ID).
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a schema.
    Show { name: String },
    /// List schema names.
    List,
    /// Delete a schema.
    Delete { name: String },
    /// Replace the packer arguments of some fields.
    SetArgs(FieldArgs),
    /// Add or override packer arguments of some fields.
    AddArgs(FieldArgs),
}

#[derive(Args)]
pub struct FieldArgs {
    /// Schema name.
    pub name: String,

    /// Field label (repeatable).
    #[arg(long = "field", short, required = true)]
    pub fields: Vec<String>,

    /// Argument as `name=value`, e.g. `unit=seconds` (repeatable).
    #[arg(long = "arg", short, value_parser = parse_key_value)]
    pub args: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Json,
    Parquet,
}

impl From<FormatArg> for IngestionFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => IngestionFormat::Csv,
            FormatArg::Json => IngestionFormat::Json,
            FormatArg::Parquet => IngestionFormat::Parquet,
        }
    }
}

#[derive(Args)]
pub struct UploadArgs {
    /// Source file (.csv, .json, .ndjson, .parquet).
    pub file: PathBuf,

    /// Stored schema describing the destination table.
    #[arg(long, short)]
    pub schema: String,

    /// Profile authorizing the requests.
    #[arg(long, short, required_unless_present = "dry_run")]
    pub profile: Option<String>,

    /// Source format (inferred from the extension when omitted).
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Column declaration overriding the schema, as `column=type[:arg]` (repeatable).
    #[arg(long = "declare", short, value_parser = parse_key_value)]
    pub declarations: Vec<(String, String)>,

    /// Declare file columns that are not in the schema as `drop`.
    #[arg(long)]
    pub drop_unmatched: bool,

    /// Records per request (overrides config.toml).
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Send up to N requests at once instead of one batch at a time.
    #[arg(long, value_name = "N")]
    pub concurrent: Option<usize>,

    /// Field ID used to match existing records.
    #[arg(long)]
    pub merge_field: Option<u64>,

    /// Field ID whose values the API echoes back for each record (repeatable).
    #[arg(long = "return-field", value_name = "ID")]
    pub return_fields: Vec<u64>,

    /// Append per-batch results to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Pack and batch without sending anything; print the first record.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum RecordsCommand {
    /// Query records and write them as CSV.
    Fetch(FetchArgs),
}

#[derive(Args)]
pub struct FetchArgs {
    /// Stored schema describing the table.
    pub schema: String,

    /// Profile authorizing the request.
    #[arg(long, short)]
    pub profile: String,

    /// Field label to select (repeatable, in output order).
    #[arg(long = "column", short, required = true)]
    pub columns: Vec<String>,

    /// Sort key as `label` or `label:desc` (repeatable, most significant first).
    #[arg(long = "sort", value_parser = parse_sort)]
    pub sort: Vec<(String, SortOrder)>,

    /// Records to skip from the top.
    #[arg(long, default_value_t = 0)]
    pub skip: u64,

    /// Maximum records to return.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Write the CSV here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// `label[:asc|desc]`. Only a trailing `asc`/`desc` is split off, so labels may contain `:`.
fn parse_sort(s: &str) -> Result<(String, SortOrder), String> {
    let (label, order) = match s.rsplit_once(':') {
        Some((label, o)) if o.trim().eq_ignore_ascii_case("desc") => (label, SortOrder::Desc),
        Some((label, o)) if o.trim().eq_ignore_ascii_case("asc") => (label, SortOrder::Asc),
        _ => (s, SortOrder::Asc),
    };
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("expected `label[:asc|desc]`, got `{s}`"));
    }
    Ok((label.to_string(), order))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected `name=value`, got `{s}`"))
}
