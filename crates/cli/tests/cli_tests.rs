// Integration tests for the `smeta` binary.
// Run with: cargo test -p smeta-cli --test cli_tests -- --nocapture

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use zip::write::SimpleFileOptions;

fn smeta() -> Command {
    Command::new(env!("CARGO_BIN_EXE_smeta"))
}

/// Run with an explicit settings file so the user's config dir is never touched.
fn run(settings: &Path, args: &[&str]) -> Output {
    smeta()
        .arg("--config")
        .arg(settings)
        .args(args)
        .output()
        .expect("run smeta")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn write_settings(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("settings.json");
    std::fs::write(&path, body).unwrap();
    path
}

fn default_settings(dir: &Path) -> PathBuf {
    write_settings(dir, "{\n    // defaults\n}\n")
}

/// One ГрандСМЕТА section with one inline-priced item.
fn grandsmeta_workbook() -> Vec<u8> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    let plain = Format::new();
    ws.write_string(0, 0, "ЛОКАЛЬНЫЙ СМЕТНЫЙ РАСЧЕТ").unwrap();
    ws.merge_range(1, 0, 1, 10, "Раздел 1. Демонтаж", &plain).unwrap();
    ws.write_number(2, 0, 1.0).unwrap();
    ws.write_string(2, 1, "ФЕР46-04-001-01").unwrap();
    ws.write_string(2, 2, "Разборка кладки").unwrap();
    ws.write_string(2, 3, "м3").unwrap();
    ws.write_number(2, 4, 2.0).unwrap();
    ws.write_number(2, 10, 100.0).unwrap();
    ws.merge_range(3, 2, 3, 7, "Итого по разделу 1", &plain).unwrap();
    ws.write_number(3, 10, 100.0).unwrap();
    wb.save_to_buffer().unwrap()
}

fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buf.into_inner()
}

fn read_back(path: &Path) -> Vec<Vec<Data>> {
    let mut wb: Xlsx<_> = open_workbook(path).unwrap();
    let name = wb.sheet_names()[0].clone();
    let range = wb.worksheet_range(&name).unwrap();
    range.rows().map(|r| r.to_vec()).collect()
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

#[test]
fn process_single_workbook_to_xlsx() {
    let dir = tempfile::tempdir().unwrap();
    let settings = default_settings(dir.path());
    let input = dir.path().join("смета.xlsx");
    std::fs::write(&input, grandsmeta_workbook()).unwrap();
    let out = dir.path().join("result.xlsx");

    let output = run(
        &settings,
        &["process", input.to_str().unwrap(), "-d", "ГрандСМЕТА", "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("wrote 2 row(s)"), "{}", stdout(&output));

    let sheet = read_back(&out);
    assert_eq!(sheet.len(), 3);
    assert_eq!(sheet[1][2], Data::String("Раздел 1. Демонтаж".into()));
    assert_eq!(sheet[1][5], Data::Float(100.0));
    assert_eq!(sheet[2][0], Data::Float(1.0));
    assert_eq!(sheet[2][1], Data::String("ФЕР46-04-001-01".into()));
}

#[test]
fn process_uses_default_dialect_and_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();
    let settings = write_settings(
        dir.path(),
        &format!(
            "{{\n  \"dialects.default\": \"ГрандСМЕТА\",\n  \"output.directory\": {}\n}}",
            serde_json::to_string(out_dir.to_str().unwrap()).unwrap()
        ),
    );
    let input = dir.path().join("Объект 7.xlsx");
    std::fs::write(&input, grandsmeta_workbook()).unwrap();

    let output = run(&settings, &["-q", "process", input.to_str().unwrap(), "--format", "csv"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let csv = std::fs::read_to_string(out_dir.join("Объект 7_processed.csv")).unwrap();
    assert!(csv.lines().any(|l| l == "1,ФЕР46-04-001-01,Разборка кладки,м3,2,100"), "{csv}");
}

#[test]
fn process_zip_with_broken_member() {
    let dir = tempfile::tempdir().unwrap();
    let settings = default_settings(dir.path());
    let good = grandsmeta_workbook();
    let archive = dir.path().join("objects.zip");
    std::fs::write(
        &archive,
        zip_of(&[("a.xlsx", good.as_slice()), ("b.xlsx", &b"broken"[..]), ("notes.txt", &b"skip"[..])]),
    )
    .unwrap();
    let out = dir.path().join("objects.json");

    let output = run(
        &settings,
        &["process", archive.to_str().unwrap(), "-d", "ГрандСМЕТА", "-o", out.to_str().unwrap(), "-f", "json", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("failed: b.xlsx"));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("JSON report");
    assert_eq!(report["dialect"], "ГрандСМЕТА");
    assert_eq!(report["rows"], 2);
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["file"], "a.xlsx");
    assert_eq!(files[0]["ok"], true);
    assert_eq!(files[1]["ok"], false);

    let strict = run(
        &settings,
        &["process", archive.to_str().unwrap(), "-d", "ГрандСМЕТА", "-o", out.to_str().unwrap(), "--strict"],
    );
    assert_eq!(strict.status.code(), Some(11));
}

#[test]
fn process_failures_map_to_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let settings = default_settings(dir.path());
    let broken = dir.path().join("broken.xlsx");
    std::fs::write(&broken, b"not a workbook").unwrap();
    let text = dir.path().join("notes.txt");
    std::fs::write(&text, b"hello").unwrap();
    let good = dir.path().join("good.xlsx");
    std::fs::write(&good, grandsmeta_workbook()).unwrap();

    let all_failed = run(&settings, &["process", broken.to_str().unwrap(), "-d", "ГрандСМЕТА"]);
    assert_eq!(all_failed.status.code(), Some(10));
    assert!(stderr(&all_failed).contains("error: no input file could be processed"));

    let unsupported = run(&settings, &["process", text.to_str().unwrap(), "-d", "ГрандСМЕТА"]);
    assert_eq!(unsupported.status.code(), Some(12));

    let unknown = run(&settings, &["process", good.to_str().unwrap(), "-d", "Гранд"]);
    assert_eq!(unknown.status.code(), Some(20));
    assert!(stderr(&unknown).contains("hint:"));

    let no_dialect = run(&settings, &["process", good.to_str().unwrap()]);
    assert_eq!(no_dialect.status.code(), Some(2));
}

#[test]
fn malformed_settings_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let settings = write_settings(dir.path(), "{ \"log.level\": [ }");
    let output = run(&settings, &["dialects"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).starts_with("error: invalid settings"));
}

// ---------------------------------------------------------------------------
// inspect
// ---------------------------------------------------------------------------

#[test]
fn inspect_lists_row_roles() {
    let dir = tempfile::tempdir().unwrap();
    let settings = default_settings(dir.path());
    let input = dir.path().join("s.xlsx");
    std::fs::write(&input, grandsmeta_workbook()).unwrap();

    let output = run(&settings, &["inspect", input.to_str().unwrap(), "-d", "ГрандСМЕТА", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let doc: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let roles: Vec<(u64, &str)> = doc["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["row"].as_u64().unwrap(), r["role"].as_str().unwrap()))
        .collect();
    assert_eq!(roles, vec![(2, "section_header"), (3, "item"), (4, "section_footer")]);
    assert_eq!(doc["rows"][0]["anchor"], "A2");
    assert_eq!(doc["rows"][2]["total"], "K4");

    let table = run(&settings, &["inspect", input.to_str().unwrap(), "-d", "ГрандСМЕТА"]);
    assert!(stdout(&table).contains("section_footer     total K4"), "{}", stdout(&table));
}

// ---------------------------------------------------------------------------
// dialects
// ---------------------------------------------------------------------------

#[test]
fn dialects_lists_builtins_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    let dialect_dir = dir.path().join("dialects");
    std::fs::create_dir(&dialect_dir).unwrap();

    let base = default_settings(dir.path());
    let shown = run(&base, &["dialect", "show", "ГрандСМЕТА"]);
    assert!(shown.status.success());
    let custom = stdout(&shown).replacen("name = \"ГрандСМЕТА\"", "name = \"ГрандСМЕТА-кастом\"", 1);
    std::fs::write(dialect_dir.join("custom.toml"), custom).unwrap();

    let settings = write_settings(
        dir.path(),
        &format!(
            "{{ \"dialects.directory\": {} }}",
            serde_json::to_string(dialect_dir.to_str().unwrap()).unwrap()
        ),
    );
    let output = run(&settings, &["dialects", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let entries: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"ГрандСМЕТА-кастом"));
    assert!(names.contains(&"Турбосметчик-3"));
    let ts2 = entries.iter().find(|e| e["name"] == "Турбосметчик-2").unwrap();
    assert_eq!(ts2["family"], "Турбосметчик");
}

#[test]
fn dialect_validate_accepts_shown_and_rejects_broken() {
    let dir = tempfile::tempdir().unwrap();
    let settings = default_settings(dir.path());

    let shown = run(&settings, &["dialect", "show", "Смета ру"]);
    assert!(shown.status.success());
    let good = dir.path().join("good.toml");
    std::fs::write(&good, stdout(&shown)).unwrap();

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "name = \"x\"\n[header]\nspan = \"K:A\"\n").unwrap();

    let ok = run(&settings, &["dialect", "validate", good.to_str().unwrap()]);
    assert!(ok.status.success(), "stderr: {}", stderr(&ok));
    assert!(stdout(&ok).contains("(Смета ру)"));

    let failed = run(&settings, &["dialect", "validate", good.to_str().unwrap(), bad.to_str().unwrap()]);
    assert_eq!(failed.status.code(), Some(21));
    assert!(stderr(&failed).contains("1 of 2 dialect file(s) invalid"));
}

#[test]
fn dialects_groups_by_family() {
    let dir = tempfile::tempdir().unwrap();
    let settings = write_settings(dir.path(), "{ \"dialects.default\": \"Турбосметчик-2\" }");
    let output = run(&settings, &["dialects"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Турбосметчик:\n  Турбосметчик-1\n  Турбосметчик-2 (default)\n  Турбосметчик-3\n"), "{text}");
    assert!(text.lines().any(|l| l == "ГрандСМЕТА"));
}
