use genie_assistant::{
    catalog::ProductRecord, ConfigStore, DocumentIngestor, FileConfigStore, Knowledge,
    StoreConfiguration,
};
use std::{collections::BTreeMap, fs, sync::Arc, thread};

fn sample_configurations() -> Vec<StoreConfiguration> {
    let mut with_documents = StoreConfiguration::new("Docs Shop");
    with_documents.add_document(DocumentIngestor::ingest("faq.md", "# FAQ\nAsk us."));
    with_documents.add_document(DocumentIngestor::ingest("terms.txt", ""));
    with_documents.products.push(ProductRecord {
        id: "sku-1".to_string(),
        name: "Shelf".to_string(),
        price: "€80".to_string(),
        category: "Home".to_string(),
        description: "Oak shelf.".to_string(),
        stock_status: "Low Stock".to_string(),
        image_url: None,
        extra: BTreeMap::from([("width".to_string(), "120cm".to_string())]),
    });

    vec![
        StoreConfiguration::default(),
        StoreConfiguration::with_policies("Empty Policies", ""),
        StoreConfiguration::demo(),
        with_documents,
    ]
}

#[test]
fn file_store_round_trips_configurations() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path(), "genie_config");

    for config in sample_configurations() {
        store.save(&config);
        assert_eq!(store.load(), Some(config));
    }
}

#[test]
fn file_store_load_without_save_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path().join("not-created-yet"), "genie_config");

    assert!(store.load().is_none());
    assert!(matches!(store.try_load(), Ok(None)));
}

#[test]
fn file_store_creates_directory_and_leaves_no_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path().join("nested"), "shop");

    store.save(&StoreConfiguration::demo());

    let entries: Vec<String> = fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["shop.json".to_string()]);
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut entries: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    entries
}

#[test]
fn concurrent_saves_leave_one_complete_value() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileConfigStore::new(dir.path(), "shop"));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let mut config = StoreConfiguration::demo();
                config.store_name = format!("Shop {n}");
                for _ in 0..10 {
                    store.try_save(&config).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let loaded = store.try_load().unwrap().unwrap();
    assert!(loaded.store_name.starts_with("Shop "));
    assert_eq!(loaded.products, StoreConfiguration::demo().products);
    assert_eq!(dir_entries(dir.path()), vec!["shop.json".to_string()]);
}

#[test]
fn failed_rename_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path(), "shop");
    fs::create_dir(store.path()).unwrap();
    fs::write(store.path().join("occupied"), "x").unwrap();

    assert!(store.try_save(&StoreConfiguration::demo()).is_err());
    assert_eq!(dir_entries(dir.path()), vec!["shop.json".to_string()]);
}

#[test]
fn corrupt_file_loads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path(), "genie_config");
    fs::write(store.path(), "{\"storeName\": ").unwrap();

    assert!(store.load().is_none());
    assert!(store.try_load().is_err());
}

#[test]
fn save_failure_does_not_panic() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "a file, not a directory").unwrap();
    let store = FileConfigStore::new(&blocker, "genie_config");

    store.save(&StoreConfiguration::demo());

    assert!(store.try_save(&StoreConfiguration::demo()).is_err());
    assert!(store.load().is_none());
}

#[test]
fn saved_json_uses_store_configuration_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileConfigStore::new(dir.path(), "genie_config");
    store.save(&StoreConfiguration::demo());

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();

    assert_eq!(value["storeName"], "WooGemini Demo Shop");
    assert!(value["policies"].is_string());
    assert_eq!(value["products"][3]["stockStatus"], "Out of Stock");
    assert!(matches!(
        serde_json::from_value::<StoreConfiguration>(value).unwrap().knowledge,
        Knowledge::Policies(_)
    ));
}
