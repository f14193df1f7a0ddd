//! Integration tests for batch rendering over discovered waves.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use wavebook::content::Section;
use wavebook::render::{JsonBackend, MarkdownBackend};
use wavebook::{
    discover, run_batch, BatchConfig, BatchDriver, CrossTabSpec, DataSource, Document, ErrorKind,
    LoaderConfig, RenderOutcome, RunParameters, Template,
};

/// Write a small wave file whose `wave` column names the wave it came from.
fn write_wave(path: &Path, wave: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        path,
        format!("wave,approve,weight\n{wave},Approve,1.5\n{wave},Disapprove,0.5\n"),
    )
    .unwrap();
}

fn wave_template() -> Template {
    Template::new("Survey {{source_label}}")
        .with_loader(
            LoaderConfig::new()
                .with_weight("weight")
                .with_required("approve"),
        )
        .with_section(Section::Text {
            text: "Results for {{source_label}} (source {{source_index}}).".to_string(),
        })
        .with_section(Section::Table {
            table: CrossTabSpec::one_way("wave"),
            caption: None,
        })
}

fn runs(dir: &TempDir, labels: &[(usize, &str)], ext: &str) -> Vec<RunParameters> {
    labels
        .iter()
        .map(|(index, label)| {
            let stem = label.replace(' ', "-").to_lowercase();
            RunParameters::new(*index, *label, dir.path().join(format!("out/{stem}.{ext}")))
        })
        .collect()
}

fn read_document(path: &PathBuf) -> Document {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_outputs_follow_run_list_not_discovery_order() {
    let dir = TempDir::new().unwrap();
    let sources: Vec<DataSource> = ["Mar16", "Jan16", "Oct16"]
        .iter()
        .enumerate()
        .map(|(i, wave)| {
            let path = dir.path().join(format!("{wave}/{wave} public.csv"));
            write_wave(&path, wave);
            DataSource::new(i + 1, path)
        })
        .collect();

    let runs = runs(
        &dir,
        &[(1, "January 2016"), (2, "March 2016"), (3, "October 2016")],
        "json",
    );
    let driver = BatchDriver::new(wave_template(), Box::new(JsonBackend::new())).unwrap();
    let report = driver.run(&sources, &runs).unwrap();

    let labels: Vec<&str> = report.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["January 2016", "March 2016", "October 2016"]);
    assert_eq!(report.succeeded(), 3);

    let titles: Vec<String> = runs
        .iter()
        .map(|r| read_document(&r.output).title)
        .collect();
    assert_eq!(
        titles,
        ["Survey January 2016", "Survey March 2016", "Survey October 2016"]
    );

    let recorded: Vec<&str> = report
        .provenance
        .sources
        .iter()
        .map(|s| s.label.as_str())
        .collect();
    assert_eq!(recorded, labels);
}

#[test]
fn test_run_list_maps_labels_to_the_right_files() {
    let dir = TempDir::new().unwrap();
    for wave in ["Mar16", "Jan16", "Oct16"] {
        write_wave(&dir.path().join(format!("{wave}/{wave} public.csv")), wave);
    }

    // Lexical discovery: Jan16, Mar16, Oct16.
    let sources = discover(dir.path(), r"public\.csv$").unwrap();
    let runs = runs(
        &dir,
        &[(2, "March 2016"), (1, "January 2016"), (3, "October 2016")],
        "md",
    );
    let driver = BatchDriver::new(wave_template(), Box::new(MarkdownBackend::new())).unwrap();
    let report = driver.run(&sources, &runs).unwrap();
    assert!(!report.has_failures());

    let march = fs::read_to_string(&runs[0].output).unwrap();
    assert!(march.starts_with("# Survey March 2016"));
    assert!(march.contains("Mar16"));
    assert!(march.contains("(source 2)"));
    assert!(!march.contains("Jan16"));

    let january = fs::read_to_string(&runs[1].output).unwrap();
    assert!(january.contains("Jan16"));
}

#[test]
fn test_one_failing_source_does_not_stop_the_batch() {
    let dir = TempDir::new().unwrap();
    let sources: Vec<DataSource> = (1..=4)
        .map(|i| {
            let path = dir.path().join(format!("data/w{i}.csv"));
            write_wave(&path, &format!("W{i}"));
            DataSource::new(i, path)
        })
        .collect();
    // Source 2 drifted: the required column is gone.
    fs::write(&sources[1].path, "wave,weight\nW2,1.0\n").unwrap();

    let runs = runs(
        &dir,
        &[(1, "Wave 1"), (2, "Wave 2"), (3, "Wave 3"), (4, "Wave 4")],
        "md",
    );
    let driver = BatchDriver::new(wave_template(), Box::new(MarkdownBackend::new()))
        .unwrap()
        .with_provenance_dir(dir.path().join("provenance"));
    let report = driver.run(&sources, &runs).unwrap();

    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 1);
    match &report.results[1].outcome {
        RenderOutcome::Failed { kind, message } => {
            assert_eq!(*kind, ErrorKind::DataQuality);
            assert!(message.contains("approve"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    for i in [0, 2, 3] {
        assert!(report.results[i].is_success());
        assert!(runs[i].output.exists());
    }
    assert!(!runs[1].output.exists());

    let provenance = report.provenance_path.unwrap();
    assert!(provenance.exists());
    assert_eq!(report.provenance.sources.len(), 3);
    assert!(report.provenance.sources.iter().all(|s| s.hash.starts_with("sha256:")));
}

#[test]
fn test_run_batch_from_config_files() {
    let dir = TempDir::new().unwrap();
    for wave in ["Jan16", "Mar16"] {
        write_wave(&dir.path().join(format!("data/{wave} public.csv")), wave);
    }
    // Excluded by the pattern.
    write_wave(&dir.path().join("data/Jan16 public backup.csv"), "Backup");

    fs::write(
        dir.path().join("report.json"),
        serde_json::to_string(&wave_template()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("batch.json"),
        r#"{
            "data_root": "data",
            "pattern": "public\\.csv$",
            "template": "report.json",
            "format": "markdown",
            "runs": [
                {"source_index": 1, "label": "January 2016", "output": "out/jan16.md"},
                {"source_index": 2, "label": "March 2016", "output": "out/mar16.md"}
            ]
        }"#,
    )
    .unwrap();

    let config = BatchConfig::load(dir.path().join("batch.json")).unwrap();
    let report = run_batch(&config).unwrap();

    assert_eq!(report.succeeded(), 2);
    assert!(dir.path().join("out/jan16.md").exists());
    assert!(dir.path().join("out/mar16.md").exists());
    let provenance = report.provenance_path.unwrap();
    assert!(provenance.starts_with(dir.path().join("provenance")));
}

#[test]
fn test_empty_discovery_aborts_before_processing() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(
        dir.path().join("report.json"),
        serde_json::to_string(&wave_template()).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.path().join("batch.json"),
        r#"{
            "data_root": "data",
            "pattern": "public\\.csv$",
            "template": "report.json",
            "runs": [{"source_index": 1, "label": "January 2016", "output": "out/jan16.md"}]
        }"#,
    )
    .unwrap();

    let config = BatchConfig::load(dir.path().join("batch.json")).unwrap();
    let err = run_batch(&config).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!dir.path().join("provenance").exists());
}
