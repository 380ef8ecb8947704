mod common;

use std::fs;
use std::path::Path;

use slip_ensemble::{
    write_table, EnsembleBuilder, EnsembleConfig, EnsembleError, EnsembleManifest,
    OverwritePolicy, ParameterTable,
};
use tempfile::tempdir;

#[test]
fn defaults_describe_the_standard_layout() {
    let config = EnsembleConfig::default();
    let base = Path::new("/data");
    assert_eq!(
        config.ensemble_root(base),
        base.join("tohoku").join("okada-fault-random")
    );
    assert_eq!(
        config.run_log_path(base),
        base.join("tohoku/okada-fault-random/run_log.txt")
    );
    assert_eq!(config.overwrite, OverwritePolicy::Overwrite);
    assert_eq!(config.executable, "xgeoclaw");
}

#[test]
fn partial_yaml_keeps_defaults() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ensemble.yaml");
    fs::write(
        &path,
        "name: trial\nparallelism: 4\noverwrite: refuse\nlayout:\n  subdir: runs\ngrid:\n  spacing: 0.25\n",
    )
    .expect("write config");

    let config = EnsembleConfig::load(&path).expect("load");
    assert_eq!(config.name, "trial");
    assert_eq!(config.parallelism, 4);
    assert_eq!(config.overwrite, OverwritePolicy::Refuse);
    assert_eq!(config.layout.run_log, "run_log.txt");
    assert_eq!(config.grid.spacing, 0.25);
    assert_eq!(config.grid.padding, 1.0);
    assert_eq!(config.fault.strike, 195.0);

    let builder = EnsembleBuilder::from_config(&config, dir.path());
    assert_eq!(builder.root(), dir.path().join("runs"));
    assert_eq!(builder.run_log_path(), dir.path().join("runs").join("run_log.txt"));
}

#[test]
fn invalid_yaml_is_serde_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("ensemble.yaml");
    fs::write(&path, "parallelism: [not, a, number]\n").expect("write config");
    let err = EnsembleConfig::load(&path).expect_err("bad type");
    assert!(matches!(err, EnsembleError::Serde(_)));

    let err = EnsembleConfig::load(&dir.path().join("absent.yaml")).expect_err("missing");
    assert!(matches!(err, EnsembleError::Io(_)));
}

#[test]
fn manifest_records_runs_and_failures() {
    let dir = tempdir().expect("tempdir");
    let table_path = dir.path().join("random_sample.txt");
    let table = ParameterTable::from_rows(vec![vec![10.0, 20.0], vec![f64::NAN, 1.0]])
        .expect("table");
    write_table(&table_path, &table).expect("write table");

    let root = dir.path().join("ensemble");
    let ensemble = common::builder(&root).build(&table).expect("build");
    let manifest = EnsembleManifest::from_ensemble("trial", "xgeoclaw", &ensemble, &table_path)
        .expect("manifest");
    assert_eq!(manifest.total_runs, 2);
    assert_eq!(manifest.runs.len(), 1);
    assert_eq!(manifest.runs[0].prefix, "run_0");
    assert_eq!(manifest.failures.len(), 1);
    assert_eq!(manifest.failures[0].code, "surface-nonfinite");
    assert_eq!(manifest.provenance.input_sha256.len(), 64);

    let path = root.join("ensemble.json");
    manifest.write(&path).expect("write manifest");
    let loaded = EnsembleManifest::load(&path).expect("load manifest");
    assert_eq!(loaded.runs, manifest.runs);
    assert_eq!(loaded.failures, manifest.failures);
    assert_eq!(
        loaded.content_hash().expect("hash"),
        manifest.content_hash().expect("hash")
    );
}
