//! End-to-end tests for catalist-scan
//!
//! Builds a miniature archive on disk, plans batches from a manifest, runs
//! scans against a real result store, and exports the catalog.

use std::fs;
use std::path::Path;

use catalist_core::{ProjectConfig, ProjectId};
use catalist_scan::{
    update_catalog, write_csv, ArchiveLister, BatchPlanner, CatalogIndex, FacetExtractor,
    RunMode, Scanner, TaskRunner, TIME_UNDEFINED,
};
use catalist_store::ResultStore;
use flate2::read::GzDecoder;
use tempfile::TempDir;

const FACET_RULE: [&str; 10] = [
    "mip_era",
    "activity_id",
    "institution_id",
    "source_id",
    "experiment_id",
    "member_id",
    "table_id",
    "variable_id",
    "grid_label",
    "version",
];

const DS_RLDS: &str =
    "c3s-cmip6-test.CMIP.INM.INM-CM5-0.historical.r1i1p1f1.Amon.rlds.gr1.v20190610";
const DS_TAS: &str =
    "c3s-cmip6-test.CMIP.INM.INM-CM5-0.historical.r1i1p1f1.Amon.tas.gr1.v20190610";
const DS_MRSOFC: &str =
    "c3s-cmip6-test.ScenarioMIP.MPI-M.MPI-ESM1-2-LR.ssp370.r1i1p1f1.fx.mrsofc.gn.v20190815";

fn project_config(root: &Path) -> ProjectConfig {
    ProjectConfig {
        base_dir: root.join("archive"),
        catalog_dir: root.join("catalog"),
        csv_dir: root.join("catalog/c3s-cmip6-test"),
        datasets_file: root.join("c3s-cmip6-datasets.txt"),
        facet_rule: FACET_RULE.iter().map(|s| s.to_string()).collect(),
    }
}

/// Create one archive file for a dataset, returning its absolute path.
fn seed_file(config: &ProjectConfig, ds_id: &str, filename: &str, size: usize) {
    let id = catalist_core::DatasetId::parse(ds_id).unwrap();
    let dir = id.directory(&config.base_dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(filename), vec![0u8; size]).unwrap();
}

fn seed_archive(config: &ProjectConfig) {
    seed_file(
        config,
        DS_RLDS,
        "rlds_Amon_INM-CM5-0_historical_r1i1p1f1_gr1_185001-194912.nc",
        251,
    );
    seed_file(
        config,
        DS_TAS,
        "tas_Amon_INM-CM5-0_historical_r1i1p1f1_gr1_185001-201412.nc",
        512,
    );
    seed_file(
        config,
        DS_MRSOFC,
        "mrsofc_fx_MPI-ESM1-2-LR_ssp370_r1i1p1f1_gn.nc",
        64,
    );
}

fn write_manifest(config: &ProjectConfig, ids: &[&str]) {
    let mut body = ids.join("\n");
    body.push('\n');
    fs::write(&config.datasets_file, body).unwrap();
}

#[test]
fn batches_then_scan_then_export() {
    let tmp = TempDir::new().unwrap();
    let config = project_config(tmp.path());
    let project = ProjectId::new("c3s-cmip6-test").unwrap();
    seed_archive(&config);
    write_manifest(&config, &[DS_RLDS, DS_TAS, DS_MRSOFC]);

    // One dataset per batch: three batch files, one nonempty line each
    let planner = BatchPlanner::new(&project, &config, 1);
    assert_eq!(planner.create_batches().unwrap(), 3);
    for n in 1..=3u32 {
        let batch = config
            .catalog_dir
            .join("c3s-cmip6-test/batches")
            .join(format!("batch_{n:04}.txt"));
        assert!(batch.is_file(), "missing {}", batch.display());
        let text = fs::read_to_string(&batch).unwrap();
        assert_eq!(text.lines().filter(|l| !l.trim().is_empty()).count(), 1);
    }

    // Scan all batches
    let store = ResultStore::for_project(&config.catalog_dir, &project).unwrap();
    let lister = ArchiveLister::new(&config.base_dir);
    let extractor = FacetExtractor::new(&config.base_dir, &config.facet_rule);
    let scanner = Scanner::new(&store, &lister, &extractor, false);
    let runner = TaskRunner::new(&scanner, &planner, RunMode::Local);

    let summary = runner.run_tasks(&[1, 2, 3]).unwrap();
    assert_eq!(summary.datasets, 3);
    assert_eq!(summary.files.succeeded, 3);
    assert_eq!(store.count_failures().unwrap(), 0);

    let ids = store.successful_dataset_ids().unwrap();
    assert!(ids.contains(DS_RLDS));
    assert!(ids.contains(DS_MRSOFC));

    // Recorded content for the timed dataset
    let paths = store.successful_paths().unwrap();
    let rlds_path = paths.iter().find(|p| p.contains("rlds_")).unwrap();
    let content = store.content(rlds_path).unwrap().unwrap();
    assert_eq!(content.ds_id, DS_RLDS);
    assert_eq!(content.size, 251);
    assert_eq!(content.facet("variable_id"), Some("rlds"));
    assert_eq!(content.facet("version"), Some("v20190610"));
    assert_eq!(
        content.path,
        "CMIP/INM/INM-CM5-0/historical/r1i1p1f1/Amon/rlds/gr1/v20190610/\
         rlds_Amon_INM-CM5-0_historical_r1i1p1f1_gr1_185001-194912.nc"
    );

    // Export and read back
    let entries = store.all_content().unwrap();
    assert_eq!(entries.len(), 3);
    let (csv_path, stamp) = write_csv(&entries, &project, &config).unwrap();
    update_catalog(&project, &csv_path, stamp, &config.catalog_dir).unwrap();

    let file = fs::File::open(&csv_path).unwrap();
    let mut reader = csv::Reader::from_reader(GzDecoder::new(file));
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers[0], "ds_id");
    assert!(headers.contains(&"start_time".to_string()));

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    assert_eq!(rows.len(), 3);

    let start_col = headers.iter().position(|h| h == "start_time").unwrap();
    let end_col = headers.iter().position(|h| h == "end_time").unwrap();
    let rlds_row = rows.iter().find(|r| r[0] == DS_RLDS).unwrap();
    assert_eq!(rlds_row[start_col], "1850-01-01T00:00:00");
    let tas_row = rows.iter().find(|r| r[0] == DS_TAS).unwrap();
    assert_eq!(tas_row[end_col], "2014-12-31T23:59:59");
    let fx_row = rows.iter().find(|r| r[0] == DS_MRSOFC).unwrap();
    assert_eq!(fx_row[start_col], TIME_UNDEFINED);
    assert_eq!(fx_row[end_col], TIME_UNDEFINED);

    // Index records where and how to read the export
    let index = CatalogIndex::read_from(&config.catalog_dir).unwrap();
    let source = &index.sources["c3s-cmip6-test"];
    assert!(source.path.ends_with(".csv.gz"));
    assert_eq!(source.csv_kwargs.compression, "gzip");
    assert_eq!(source.csv_kwargs.dtype["level"], "object");
}

#[test]
fn failed_extraction_is_isolated_and_retried() {
    let tmp = TempDir::new().unwrap();
    let config = project_config(tmp.path());
    let project = ProjectId::new("c3s-cmip6-test").unwrap();
    seed_archive(&config);

    // A dataset id with too few facets: its files list fine but extraction
    // fails, exercising the scan-failure path end to end.
    let bad_id = "c3s-cmip6-test.CMIP.INM";
    seed_file(&config, bad_id, "broken_185001-185012.nc", 8);
    write_manifest(&config, &[DS_RLDS, bad_id]);

    let planner = BatchPlanner::new(&project, &config, 2);
    planner.create_batches().unwrap();

    let store = ResultStore::for_project(&config.catalog_dir, &project).unwrap();
    let lister = ArchiveLister::new(&config.base_dir);
    let extractor = FacetExtractor::new(&config.base_dir, &config.facet_rule);
    let scanner = Scanner::new(&store, &lister, &extractor, false);
    let runner = TaskRunner::new(&scanner, &planner, RunMode::Local);

    let summary = runner.run_tasks(&[1]).unwrap();
    assert_eq!(summary.files.failed, 1);
    assert_eq!(summary.files.succeeded, 1);
    assert_eq!(store.count_failures().unwrap(), 1);
    assert!(store.successful_dataset_ids().unwrap().contains(DS_RLDS));

    // A second run skips the successes and retries only the failure
    let summary = runner.run_tasks(&[1]).unwrap();
    assert_eq!(summary.files.failed, 1);
    assert_eq!(summary.files.succeeded, 0);
    assert_eq!(store.count_failures().unwrap(), 1);
}

#[test]
fn worker_mode_matches_local_results() {
    let tmp = TempDir::new().unwrap();
    let config = project_config(tmp.path());
    let project = ProjectId::new("c3s-cmip6-test").unwrap();
    seed_archive(&config);
    write_manifest(&config, &[DS_RLDS, DS_TAS, DS_MRSOFC]);

    let planner = BatchPlanner::new(&project, &config, 1);
    planner.create_batches().unwrap();

    let store = ResultStore::for_project(&config.catalog_dir, &project).unwrap();
    let lister = ArchiveLister::new(&config.base_dir);
    let extractor = FacetExtractor::new(&config.base_dir, &config.facet_rule);
    let scanner = Scanner::new(&store, &lister, &extractor, false);
    let runner = TaskRunner::new(&scanner, &planner, RunMode::Workers(2));

    let summary = runner.run_tasks(&[1, 2, 3]).unwrap();
    assert_eq!(summary.datasets, 3);
    assert_eq!(summary.files.succeeded, 3);
    assert_eq!(store.successful_dataset_ids().unwrap().len(), 3);
}
