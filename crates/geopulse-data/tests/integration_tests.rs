//! Integration tests for the data pipeline.
//!
//! These tests build a raw zone in a temporary directory, run the pipeline
//! against it and read the processed zone back the way front ends do.

use geopulse_data::{
    Cleaner, DataLayout, DatasetLoader, Pipeline, PipelineConfig, PipelineError, Provider,
    SourceDescriptor, SourceRegistry, StorageFormat, Zone, pipeline::DatasetStatus,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const ARMS_IMPORTS: &str = "\
Arms Category,1950,1951,1952
Aircraft,120,,98
Ships,15,22,
Missiles,,4,7
";

const TOP_EXPORTS: &str = "\
Rank 1950-2022,Supplier,Total
1,United States,650000
2,Russia,
3,France,75000
";

const GDP: &str = "\
Country Name,Country Code,1960 [YR1960],1961 [YR1961],1962 [YR1962]
Aruba,ABW,,1.2,1.4
Chad,TCD,0.3,,0.5
";

fn write_raw(root: &Path, relative: &str, content: &str) {
    let path = DataLayout::new(root).resolve(relative, Zone::Raw);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seeded_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_raw(dir.path(), "sipri/imports.csv", ARMS_IMPORTS);
    write_raw(dir.path(), "sipri/top_exports.csv", TOP_EXPORTS);
    write_raw(dir.path(), "world_bank/gdp.csv", GDP);
    dir
}

fn test_registry() -> SourceRegistry {
    SourceRegistry::new(vec![
        SourceDescriptor::new("all_arms_imports", Provider::Sipri, "sipri/imports.csv")
            .index_column("Arms Category"),
        SourceDescriptor::new("top_200_arms_exports", Provider::Sipri, "sipri/top_exports.csv")
            .index_column("Rank 1950-2022"),
        SourceDescriptor::new("gdp", Provider::WorldBank, "world_bank/gdp.csv")
            .index_column("Country Name")
            .cleaner(Cleaner::NormalizeYearHeaders),
    ])
    .unwrap()
}

fn config(root: &Path, format: StorageFormat) -> PipelineConfig {
    PipelineConfig::builder()
        .data_root(root)
        .storage_format(format)
        .build()
        .unwrap()
}

fn pipeline(root: &Path, registry: SourceRegistry) -> Pipeline {
    Pipeline::builder()
        .config(config(root, StorageFormat::Csv))
        .registry(registry)
        .build()
        .unwrap()
}

fn snapshot_zone(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let zone = DataLayout::new(root).zone_dir(Zone::Processed);
    fs::read_dir(zone)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            (name, fs::read(&path).unwrap())
        })
        .collect()
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_full_pipeline_all_datasets_succeed() {
    let root = seeded_root();
    let report = pipeline(root.path(), test_registry()).run().unwrap();

    assert_eq!(
        report.succeeded_names(),
        vec!["all_arms_imports", "top_200_arms_exports", "gdp"]
    );
    assert!(!report.has_failures());
    assert!(report.is_ok(true));

    let files: Vec<String> = snapshot_zone(root.path()).into_keys().collect();
    assert_eq!(
        files,
        vec![
            "_manifest.json",
            "all_arms_imports.csv",
            "gdp.csv",
            "top_200_arms_exports.csv"
        ]
    );
}

#[test]
fn test_processed_tables_have_no_missing_values() {
    let root = seeded_root();
    pipeline(root.path(), test_registry()).run().unwrap();

    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();

    for (name, table) in collection.iter() {
        for column in table.frame().get_columns() {
            assert_eq!(column.null_count(), 0, "nulls left in {}.{}", name, column.name());
        }
    }
}

#[test]
fn test_year_headers_are_normalized() {
    let root = seeded_root();
    pipeline(root.path(), test_registry()).run().unwrap();

    let written = fs::read_to_string(
        DataLayout::new(root.path()).resolve("gdp.csv", Zone::Processed),
    )
    .unwrap();
    let header = written.lines().next().unwrap();
    assert_eq!(header, "Country Name,Country Code,1960,1961,1962");
}

#[test]
fn test_pipeline_is_idempotent() {
    let root = seeded_root();
    let pipeline = pipeline(root.path(), test_registry());

    pipeline.run().unwrap();
    let first = snapshot_zone(root.path());
    pipeline.run().unwrap();
    let second = snapshot_zone(root.path());

    assert_eq!(first, second);
}

#[test]
fn test_missing_source_is_isolated() {
    let root = seeded_root();
    let registry = SourceRegistry::new(vec![
        SourceDescriptor::new("all_arms_imports", Provider::Sipri, "sipri/imports.csv")
            .index_column("Arms Category"),
        SourceDescriptor::new("vanished", Provider::Sipri, "sipri/does_not_exist.csv"),
        SourceDescriptor::new("gdp", Provider::WorldBank, "world_bank/gdp.csv")
            .index_column("Country Name")
            .cleaner(Cleaner::NormalizeYearHeaders),
    ])
    .unwrap();

    let report = pipeline(root.path(), registry).run().unwrap();

    assert_eq!(report.succeeded_names(), vec!["all_arms_imports", "gdp"]);
    assert_eq!(report.failed_names(), vec!["vanished"]);
    match &report.outcomes[1].status {
        DatasetStatus::Failed { code, .. } => assert_eq!(code, "SOURCE_MISSING"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.is_ok(false));
    assert!(!report.is_ok(true));

    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    assert_eq!(collection.list_datasets(), vec!["all_arms_imports", "gdp"]);
}

fn assert_middle_dataset_skipped(root: &Path, middle: SourceDescriptor, expected_code: &str) {
    let registry = SourceRegistry::new(vec![
        SourceDescriptor::new("all_arms_imports", Provider::Sipri, "sipri/imports.csv")
            .index_column("Arms Category"),
        middle,
        SourceDescriptor::new("gdp", Provider::WorldBank, "world_bank/gdp.csv")
            .index_column("Country Name")
            .cleaner(Cleaner::NormalizeYearHeaders),
    ])
    .unwrap();

    let report = pipeline(root, registry).run().unwrap();

    assert_eq!(report.succeeded_names(), vec!["all_arms_imports", "gdp"]);
    assert_eq!(report.failed().count(), 1);
    match &report.outcomes[1].status {
        DatasetStatus::Failed { code, .. } => assert_eq!(code, expected_code),
        other => panic!("expected failure, got {:?}", other),
    }

    let zone = DataLayout::new(root).zone_dir(Zone::Processed);
    let name = &report.outcomes[1].name;
    assert!(!zone.join(format!("{}.csv", name)).exists());

    let collection = DatasetLoader::new(DataLayout::new(root)).load_all().unwrap();
    assert_eq!(collection.list_datasets(), vec!["all_arms_imports", "gdp"]);
    assert_eq!(
        collection.get_dataset("gdp").unwrap().index_column(),
        Some("Country Name")
    );
}

#[test]
fn test_malformed_source_is_isolated() {
    let root = seeded_root();
    write_raw(
        root.path(),
        "bloomberg/budget.csv",
        "Description,2020,2021\nBudget,1,2\nPersonnel,3,4,999,888\n",
    );

    let middle = SourceDescriptor::new("defense_budget", Provider::Bloomberg, "bloomberg/budget.csv")
        .index_column("Description");
    assert_middle_dataset_skipped(root.path(), middle, "PARSE_ERROR");
}

#[test]
fn test_unknown_index_column_is_isolated() {
    let root = seeded_root();

    let middle =
        SourceDescriptor::new("top_200_arms_exports", Provider::Sipri, "sipri/top_exports.csv")
            .index_column("Rank 1950-2023");
    assert_middle_dataset_skipped(root.path(), middle, "PARSE_ERROR");
}

#[test]
fn test_cleaner_failure_is_isolated() {
    let root = seeded_root();
    write_raw(
        root.path(),
        "world_bank/population.csv",
        "Country Name,1960 [YR1960],1960 [YR1961]\nAruba,54608,55811\n",
    );

    let middle = SourceDescriptor::new("population", Provider::WorldBank, "world_bank/population.csv")
        .index_column("Country Name")
        .cleaner(Cleaner::NormalizeYearHeaders);
    assert_middle_dataset_skipped(root.path(), middle, "CLEANING_FAILED");
}

#[test]
fn test_all_sources_missing_is_total_failure() {
    let root = TempDir::new().unwrap();
    let registry = SourceRegistry::new(vec![
        SourceDescriptor::new("a", Provider::Sipri, "sipri/a.csv"),
        SourceDescriptor::new("b", Provider::Bloomberg, "bloomberg/b.csv"),
    ])
    .unwrap();

    let report = pipeline(root.path(), registry).run().unwrap();

    assert!(report.is_total_failure());
    assert!(!report.is_ok(false));
    let files: Vec<String> = snapshot_zone(root.path()).into_keys().collect();
    assert_eq!(files, vec!["_manifest.json"]);
}

#[test]
fn test_stale_outputs_are_removed() {
    let root = seeded_root();
    let zone = DataLayout::new(root.path()).zone_dir(Zone::Processed);
    fs::create_dir_all(&zone).unwrap();
    fs::write(zone.join("old_dataset.csv"), "a,b\n1,2\n").unwrap();

    pipeline(root.path(), test_registry()).run().unwrap();

    assert!(!zone.join("old_dataset.csv").exists());
    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    assert!(!collection.contains("old_dataset"));
}

#[test]
fn test_parquet_run_round_trips_through_loader() {
    let root = seeded_root();
    Pipeline::builder()
        .config(config(root.path(), StorageFormat::Parquet))
        .registry(test_registry())
        .build()
        .unwrap()
        .run()
        .unwrap();

    let zone = DataLayout::new(root.path()).zone_dir(Zone::Processed);
    assert!(zone.join("gdp.parquet").is_file());

    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    let gdp = collection.get_dataset("gdp").unwrap();
    assert_eq!(gdp.index_column(), Some("Country Name"));
    assert_eq!(gdp.provider(), Provider::WorldBank);
    assert_eq!(gdp.shape(), (2, 4));
}

// ============================================================================
// Loader / Read Contract Tests
// ============================================================================

#[test]
fn test_loader_sees_every_successful_dataset() {
    let root = seeded_root();
    let registry = test_registry();
    let (report, produced) = pipeline(root.path(), registry.clone())
        .run_collect()
        .unwrap();

    let loaded = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();

    let mut expected = report.succeeded_names();
    expected.sort();
    assert_eq!(loaded.list_datasets(), expected);
    assert_eq!(produced.list_datasets(), expected);

    for (name, table) in loaded.iter() {
        let source = registry.get(name).unwrap();
        assert_eq!(table.index_column(), source.load_options.index_column.as_deref());
        assert_eq!(table.provider(), source.provider);
    }
}

#[test]
fn test_split_view_shape() {
    let root = seeded_root();
    pipeline(root.path(), test_registry()).run().unwrap();

    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    let imports = collection.get_dataset("all_arms_imports").unwrap();
    let split = imports.to_split().unwrap();

    assert_eq!(split.columns, vec!["1950", "1951", "1952"]);
    assert_eq!(
        split.index,
        vec![
            serde_json::json!("Aircraft"),
            serde_json::json!("Ships"),
            serde_json::json!("Missiles")
        ]
    );
    assert_eq!(split.data.len(), 3);
    assert!(split.data.iter().all(|row| row.len() == 3));
    assert_eq!(split.data[0][1], serde_json::json!(0));
}

#[test]
fn test_unrun_pipeline_reads_as_empty() {
    let root = TempDir::new().unwrap();
    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();

    assert!(collection.is_empty());
    assert!(matches!(
        collection.get_dataset("gdp"),
        Err(PipelineError::NoDataLoaded)
    ));
}

#[test]
fn test_unknown_dataset_is_not_found() {
    let root = seeded_root();
    pipeline(root.path(), test_registry()).run().unwrap();

    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    let err = collection.get_dataset("nonexistent").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, PipelineError::DatasetNotFound(name) if name == "nonexistent"));
}

// ============================================================================
// Registry Tests
// ============================================================================

#[test]
fn test_json_registry_drives_the_pipeline() {
    let root = seeded_root();
    let registry_path = root.path().join("registry.json");
    fs::write(
        &registry_path,
        r#"{
            "sources": [
                {
                    "name": "gdp",
                    "provider": "world_bank",
                    "path": "world_bank/gdp.csv",
                    "load_options": { "index_column": "Country Name" },
                    "cleaners": ["normalize_year_headers"]
                }
            ]
        }"#,
    )
    .unwrap();

    let registry = SourceRegistry::from_json_file(&registry_path).unwrap();
    let report = pipeline(root.path(), registry).run().unwrap();

    assert_eq!(report.succeeded_names(), vec!["gdp"]);
    let collection = DatasetLoader::new(DataLayout::new(root.path()))
        .load_all()
        .unwrap();
    assert_eq!(
        collection.get_dataset("gdp").unwrap().column_labels(),
        vec!["Country Code", "1960", "1961", "1962"]
    );
}

#[test]
fn test_registry_rejects_escaping_paths() {
    let err = SourceRegistry::new(vec![SourceDescriptor::new(
        "escape",
        Provider::Other,
        "../outside.csv",
    )])
    .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_CONFIG");
}
