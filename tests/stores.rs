use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use qbase_loader::config::Settings;
use qbase_loader::profiles::{ProfileStore, ProfileUpdate};
use qbase_loader::schema::{SchemaStore, TableSchema};
use qbase_loader::transport::UploadMode;
use qbase_loader::LoaderError;

fn tmp_base(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("qbase-loader-stores-{tag}-{nanos}"))
}

#[test]
fn schema_store_round_trip_and_args() {
    let base = tmp_base("schemas");
    let store = SchemaStore::new(&base);

    let text = std::fs::read_to_string("tests/fixtures/contacts_schema.json").unwrap();
    let table: TableSchema = serde_json::from_str(&text).unwrap();
    store.write("contacts", &table).unwrap();
    assert_eq!(store.list().unwrap(), vec!["contacts"]);

    let mut loaded = store.read("contacts").unwrap();
    assert_eq!(loaded, table);

    let args = BTreeMap::from([("format".to_string(), "%d.%m.%Y".to_string())]);
    loaded.add_field_args(&["Start"], &args).unwrap();
    store.write("contacts", &loaded).unwrap();
    assert_eq!(
        store.read("contacts").unwrap().declarations()["Start"].to_string(),
        "date:%d.%m.%Y"
    );

    assert!(store.delete("contacts").unwrap());
    assert!(matches!(
        store.read("contacts"),
        Err(LoaderError::TableSchema { .. })
    ));

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn profile_store_produces_credentials() {
    let base = tmp_base("profiles");
    let store = ProfileStore::new(&base);

    store
        .set(
            "ops",
            ProfileUpdate {
                host: Some("demo".to_string()),
                token: Some("b12345_abc_0_abcdefghijklmnopqrstuv".to_string()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

    let creds = store.credentials("ops").unwrap();
    assert_eq!(creds.realm_hostname, "demo.quickbase.com");
    assert_eq!(creds.user_agent, "ops");

    let written = std::fs::read_to_string(base.join("profiles").join("ops.json")).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(raw["QB-Realm-Hostname"], "demo.quickbase.com");
    assert_eq!(raw.as_object().unwrap().len(), 3);

    let _ = std::fs::remove_dir_all(&base);
}

#[test]
fn settings_file_overrides_defaults() {
    let base = tmp_base("config");
    std::fs::create_dir_all(&base).unwrap();
    std::fs::write(
        base.join("config.toml"),
        "[api]\nbase_url = \"http://127.0.0.1:8080\"\n\n[upload]\nmax_batch = 500\nmode = \"concurrent\"\n",
    )
    .unwrap();

    let settings = Settings::load(&base).unwrap();
    assert_eq!(settings.api.base_url, "http://127.0.0.1:8080");
    let opts = settings.upload_options();
    assert_eq!(opts.batch_size, 500);
    assert_eq!(opts.mode, UploadMode::Concurrent { max_in_flight: 4 });

    let _ = std::fs::remove_dir_all(&base);
}
