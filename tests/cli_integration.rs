use std::fs;
use std::path::Path;
use std::process::Command;

const MEMBERSHIP: &str = "patient_id,month_year\n\
    1,2024-01-01\n1,2024-02-01\n1,2024-03-01\n1,2024-05-01\n1,2024-06-01\n\
    2,2023-12-01\n2,2024-01-01\n";

const VISITS: &str = "patient_id,date,outpatient_visit_count\n\
    1,2024-01-05,2\n1,2024-01-05,1\n1,2024-01-10,1\n\
    2,2023-12-24,1\n";

fn write_inputs(root: &Path) {
    let data = root.join("data");
    fs::create_dir_all(&data).expect("create data dir");
    fs::write(data.join("patient_id_month_year.csv"), MEMBERSHIP).expect("write membership");
    fs::write(data.join("outpatient_visits_file.csv"), VISITS).expect("write visits");
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_enrollment-spans"))
}

#[test]
fn bare_invocation_uses_conventional_locations() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    write_inputs(temp_dir.path());

    let status = bin()
        .current_dir(temp_dir.path())
        .env("RUST_LOG", "warn")
        .status()
        .expect("run binary");
    assert!(status.success());

    let result = fs::read_to_string(temp_dir.path().join("result.csv")).expect("read result");
    assert_eq!(
        result,
        "patient_id,enrollment_start_date,enrollment_end_date,ct_outpatient_visits,ct_days_with_outpatient_visit\n\
         1,2024-01-01,2024-03-31,4,2\n\
         1,2024-05-01,2024-06-30,0,0\n\
         2,2023-12-01,2024-01-31,1,1\n"
    );
    assert!(temp_dir.path().join("patient_enrollment_span.csv").exists());
}

#[test]
fn missing_input_fails_without_output() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");

    let output = bin()
        .current_dir(temp_dir.path())
        .arg("run")
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
    assert!(!temp_dir.path().join("result.csv").exists());
}

#[test]
fn json_summary_then_validate() {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    write_inputs(temp_dir.path());
    let out_dir = temp_dir.path().join("out");

    let output = bin()
        .arg("run")
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--json")
        .env("RUST_LOG", "off")
        .output()
        .expect("run binary");
    assert!(output.status.success());

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse summary json");
    assert_eq!(summary["span_rows"], 3);
    assert_eq!(summary["distinct_day_value_count"], 3);
    assert_eq!(summary["gap_tolerance_days"], 2);

    let result = out_dir.join("result.csv");
    let ok = bin()
        .arg("validate")
        .arg("--result")
        .arg(&result)
        .arg("--expect-rows")
        .arg("3")
        .arg("--expect-distinct-days")
        .arg("3")
        .status()
        .expect("run validate");
    assert!(ok.success());

    let wrong = bin()
        .arg("validate")
        .arg("--result")
        .arg(&result)
        .arg("--expect-rows")
        .arg("4")
        .status()
        .expect("run validate");
    assert!(!wrong.success());
}
