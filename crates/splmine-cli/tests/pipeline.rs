//! End-to-end runs over a synthetic release package.

use std::io::{Cursor, Write};
use std::path::Path;

use splmine_cli::{run_dedup, run_explore, run_extract, ExtractOptions};
use splmine_consolidate::DedupConfig;
use splmine_core::{ClusterPolicy, SkipReason, SplMineConfig};

const NS: &str = "urn:hl7-org:v3";

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn label(id: &str, version: Option<u32>, indication: &str) -> String {
    let version = version
        .map(|v| format!(r#"<versionNumber value="{v}"/>"#))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<document xmlns="{NS}">
  <id root="{id}"/>
  <setId root="set-{id}"/>
  {version}
  <component><structuredBody>
    <component><section>
      <code code="34067-9" displayName="INDICATIONS &amp; USAGE SECTION"/>
      <text><paragraph>{indication}</paragraph></text>
    </section></component>
    <component><section>
      <code code="34084-4" displayName="ADVERSE REACTIONS SECTION"/>
      <text><paragraph>Headache and nausea.</paragraph></text>
    </section></component>
  </structuredBody></component>
</document>"#
    )
}

/// Release package: three good labels, one without a version and one
/// corrupt inner archive.
fn write_release(dir: &Path) -> std::path::PathBuf {
    let labels = [
        ("D1", Some(1), "Treat high blood pressure in adults."),
        ("D2", Some(2), "Treat high blood pressure in adult patients."),
        ("D3", Some(1), "Used for migraine relief."),
        ("D4", None, "Treats flu."),
    ];
    let inner: Vec<(String, Vec<u8>)> = labels
        .iter()
        .map(|(id, version, text)| {
            let xml = label(id, *version, text);
            let name = format!("{id}.xml");
            (
                format!("prescription/{id}.zip"),
                zip_bytes(&[(name.as_str(), xml.as_bytes())]),
            )
        })
        .collect();

    let mut entries: Vec<(&str, &[u8])> = inner
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    entries.push(("prescription/broken.zip", b"PK\x03\x04 truncated"));

    let path = dir.join("dm_spl_release_human_rx_part1.zip");
    std::fs::write(&path, zip_bytes(&entries)).unwrap();
    path
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

#[test]
fn test_extract_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let release = write_release(dir.path());
    let config = SplMineConfig {
        working_dir: dir.path().join("data"),
        strip_heading: true,
        ..Default::default()
    };
    let options = ExtractOptions {
        inputs: vec![release],
        jsonl: Some(dir.path().join("indications.jsonl")),
        summary: Some(dir.path().join("summary.json")),
        ..Default::default()
    };

    let outcome = run_extract(&config, &options).unwrap();
    assert_eq!(outcome.output, dir.path().join("data/results/indications.csv"));

    let summary = &outcome.summary;
    assert_eq!(summary.documents_scanned, 4);
    assert_eq!(summary.inner_archives, 5);
    assert_eq!(summary.skipped.get(SkipReason::MissingVersion), 1);
    assert_eq!(summary.skipped.get(SkipReason::ArchiveCorrupt), 1);
    assert_eq!(summary.records_extracted, 3);
    assert_eq!(summary.near_duplicates, 1);
    assert_eq!(summary.records_retained, 2);
    assert_eq!(summary.records_written, 2);

    let rows = read_rows(&outcome.output);
    assert_eq!(rows[0], vec!["set_id", "xml_id", "version_number", "length", "indication"]);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1][..3], ["set-D1", "D1", "1"]);
    assert_eq!(rows[2][1], "D3");
    assert_eq!(rows[2][4], "Used for migraine relief.");

    let jsonl = std::fs::read_to_string(dir.path().join("indications.jsonl")).unwrap();
    assert_eq!(jsonl.lines().count(), 2);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("summary.json")).unwrap())
            .unwrap();
    assert_eq!(saved["recordsWritten"], 2);
    assert_eq!(saved["skipped"]["missingVersion"], 1);
}

#[test]
fn test_extract_without_dedup_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let release = write_release(dir.path());
    let config = SplMineConfig {
        dedup: false,
        ..Default::default()
    };
    let output = dir.path().join("all.csv");
    let options = ExtractOptions {
        inputs: vec![release],
        output: Some(output.clone()),
        ..Default::default()
    };
    let outcome = run_extract(&config, &options).unwrap();
    assert!(outcome.dedup.is_none());
    assert_eq!(outcome.summary.records_written, 3);
}

#[test]
fn test_dedup_existing_extract() {
    let dir = tempfile::tempdir().unwrap();
    let release = write_release(dir.path());
    let all = dir.path().join("all.csv");
    let config = SplMineConfig {
        dedup: false,
        strip_heading: true,
        ..Default::default()
    };
    run_extract(
        &config,
        &ExtractOptions {
            inputs: vec![release],
            output: Some(all.clone()),
            ..Default::default()
        },
    )
    .unwrap();

    let strict = dir.path().join("strict.csv");
    let outcome = run_dedup(
        &all,
        &strict,
        &DedupConfig::new(1.0, ClusterPolicy::FirstAnchor).unwrap(),
    )
    .unwrap();
    assert_eq!(outcome.written, 3);

    let loose = dir.path().join("loose.csv");
    let outcome = run_dedup(&all, &loose, &DedupConfig::default()).unwrap();
    assert_eq!(outcome.report.near_removed, 1);
    assert_eq!(outcome.written, 2);
}

#[test]
fn test_unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let release = write_release(dir.path());
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();
    let options = ExtractOptions {
        inputs: vec![release],
        output: Some(blocker.join("out.csv")),
        ..Default::default()
    };
    let err = run_extract(&SplMineConfig::default(), &options).unwrap_err();
    assert!(matches!(err, splmine_core::Error::Output(_)));
}

#[test]
fn test_explore_writes_tables() {
    let dir = tempfile::tempdir().unwrap();
    let release = write_release(dir.path());
    let terms = dir.path().join("terms.txt");
    std::fs::write(&terms, "# conditions\nhypertension\nblood pressure\nmigraine\n").unwrap();
    let out = dir.path().join("explore");

    let outcome = run_explore(&[release], &terms, &out).unwrap();
    assert_eq!(outcome.documents, 4);
    assert_eq!(outcome.codes, 2);

    let codes = read_rows(&outcome.code_table);
    assert_eq!(codes[0], vec!["code", "display_name", "occurrences", "matches"]);
    assert_eq!(codes[1], vec!["34067-9", "INDICATIONS & USAGE SECTION", "4", "3"]);
    assert_eq!(codes[2], vec!["34084-4", "ADVERSE REACTIONS SECTION", "4", "0"]);

    let dist = read_rows(&outcome.code_dist_table);
    assert_eq!(
        dist[0],
        vec!["code", "display_name", "occurrences", "matches", "term_distribution"]
    );
    assert_eq!(
        dist[1],
        vec!["34067-9", "INDICATIONS & USAGE SECTION", "4", "3", "blood pressure: 2; migraine: 1"]
    );
    assert_eq!(dist[2][4], "");

    let terms = read_rows(&outcome.term_table);
    assert_eq!(terms[1], vec!["blood pressure", "2"]);
    assert_eq!(terms[2], vec!["migraine", "1"]);
}

fn two_section_label(first: &str, second: &str) -> String {
    let section = |text: &str| {
        format!(
            r#"<component><section><code code="34067-9"/><text><paragraph>{text}</paragraph></text></section></component>"#
        )
    };
    format!(
        r#"<document xmlns="{NS}"><id root="D1"/><setId root="set-D1"/><versionNumber value="1"/><component><structuredBody>{}{}</structuredBody></component></document>"#,
        section(first),
        section(second)
    )
}

fn extract_single(xml: &str) -> (tempfile::TempDir, splmine_cli::ExtractOutcome) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("label.xml");
    std::fs::write(&input, xml).unwrap();
    let options = ExtractOptions {
        inputs: vec![input],
        output: Some(dir.path().join("out.csv")),
        ..Default::default()
    };
    let outcome = run_extract(&SplMineConfig::default(), &options).unwrap();
    (dir, outcome)
}

#[test]
fn test_two_sections_differing_in_whitespace_are_exact_duplicates() {
    let (_dir, outcome) = extract_single(&two_section_label("Treats flu.", "Treats\tflu."));
    let report = outcome.dedup.unwrap();
    assert_eq!(outcome.summary.records_extracted, 2);
    assert_eq!(report.exact_removed, 1);
    assert_eq!(report.near_removed, 0);
    assert_eq!(outcome.summary.records_written, 1);
}

#[test]
fn test_two_sections_differing_in_punctuation_are_near_duplicates() {
    let (_dir, outcome) = extract_single(&two_section_label("Treats flu.", "Treats flu "));
    let report = outcome.dedup.unwrap();
    assert_eq!(outcome.summary.records_extracted, 2);
    assert_eq!(report.exact_removed, 0);
    assert_eq!(report.near_removed, 1);

    let rows = read_rows(&outcome.output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][4], "Treats flu.");
}

#[test]
fn test_extract_directory_of_release_packages() {
    let dir = tempfile::tempdir().unwrap();
    let download = dir.path().join("download");
    std::fs::create_dir_all(&download).unwrap();
    write_release(&download);
    let options = ExtractOptions {
        inputs: vec![download],
        output: Some(dir.path().join("out.csv")),
        ..Default::default()
    };

    let outcome = run_extract(&SplMineConfig::default(), &options).unwrap();
    assert_eq!(outcome.summary.documents_scanned, 4);
    assert_eq!(outcome.summary.inner_archives, 5);
    assert_eq!(outcome.summary.records_extracted, 3);
    assert_eq!(outcome.summary.records_retained, 2);
    assert_eq!(outcome.summary.nested_archives_ignored, 0);
}

#[test]
fn test_extract_defaults_to_download_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = SplMineConfig {
        working_dir: dir.path().join("data"),
        ..Default::default()
    };
    write_release(&config.data_paths().unwrap().download);

    let outcome = run_extract(&config, &ExtractOptions::default()).unwrap();
    assert_eq!(outcome.output, dir.path().join("data/results/indications.csv"));
    assert_eq!(outcome.summary.records_extracted, 3);
}
