// End-to-end tests for the `dbrecon` binary.
// Run with: cargo test -p dbrecon-cli --test cli_tests

use std::path::Path;
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn dbrecon(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbrecon"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("DBRECON_LOG_FILE")
        .output()
        .expect("spawn dbrecon")
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

const CSV_JOB: &str = r#"
[jobs.accounts]
join_keys = ["id"]

[jobs.accounts.source1]
name = "ledger"
kind = "csv"
path = "ledger.csv"

[jobs.accounts.source2]
name = "bank"
kind = "csv"
path = "bank.csv"
"#;

fn csv_fixture(bank: &str) -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "ledger.csv", "id,amount,status\n1,10.5,open\n2,20,closed\n");
    write(dir.path(), "bank.csv", bank);
    write(dir.path(), "jobs.toml", CSV_JOB);
    dir
}

#[test]
fn perfect_match_exits_zero() {
    let dir = csv_fixture("id,amount,status\n2,20,closed\n1,10.5,open\n");
    let out = dbrecon(&["run", "jobs.toml"], dir.path());

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("  Perfect Matches: 1\n    Jobs: accounts\n"));
    assert!(text.contains("  Match Percentage: 100.00%"));

    let job_dir = dir.path().join("output").join("accounts");
    assert!(job_dir.join("comparison_report.csv").exists());
    assert!(job_dir.join("differences_only.csv").exists());
    assert!(job_dir.join("summary_report.txt").exists());
    assert!(job_dir.join("comparison_summary.txt").exists());
    assert!(job_dir.join("comparison_summary.json").exists());
}

#[test]
fn differences_exit_one() {
    let dir = csv_fixture("id,amount,status\n1,10.5,open\n2,20,open\n3,1,new\n");
    let out = dbrecon(&["run", "jobs.toml"], dir.path());

    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("  Matching Status: DIFFERENCES FOUND"));
    assert!(text.contains("  Only in Source2: 1"));

    let diff = std::fs::read_to_string(
        dir.path().join("output/accounts/differences_only.csv"),
    )
    .unwrap();
    // header + id 2 + id 3
    assert_eq!(diff.lines().count(), 3);
}

#[test]
fn failed_job_exits_four_and_records_error() {
    let dir = tempdir().unwrap();
    write(dir.path(), "ledger.csv", "id\n1\n");
    write(dir.path(), "bank.csv", "id\n1\n");
    write(
        dir.path(),
        "jobs.toml",
        &format!(
            "{CSV_JOB}\n[jobs.broken]\njoin_keys = [\"id\"]\n\n\
             [jobs.broken.source1]\nkind = \"csv\"\npath = \"missing.csv\"\n\n\
             [jobs.broken.source2]\nkind = \"csv\"\npath = \"bank.csv\"\n"
        ),
    );

    let out = dbrecon(&["run", "jobs.toml"], dir.path());
    assert_eq!(out.status.code(), Some(4), "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("output/comparison_summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["execution_status"]["total_jobs"], 2);
    assert_eq!(json["execution_status"]["failed_jobs"][0], "broken");
    assert_eq!(json["matching_status"]["jobs_with_perfect_match"][0], "accounts");

    let jobs = json["jobs"].as_array().unwrap();
    assert_eq!(jobs[0]["job_name"], "accounts");
    assert_eq!(jobs[0]["metrics"]["match_percentage"], 100.0);
    let reports = jobs[0]["output_files"]["reports"].as_array().unwrap();
    assert_eq!(reports[0]["type"], "full_csv");
    assert_eq!(jobs[1]["job_name"], "broken");
    assert_eq!(jobs[1]["matching_status"], "N/A");
    assert!(jobs[1]["error"].as_str().unwrap().contains("missing.csv"));
}

#[test]
fn sqlite_source_against_csv() {
    let dir = tempdir().unwrap();
    let conn = rusqlite::Connection::open(dir.path().join("ledger.db")).unwrap();
    conn.execute_batch(
        "CREATE TABLE accounts (cust_no INTEGER, amount REAL);
         INSERT INTO accounts VALUES (1, 10.0), (2, 20.0);",
    )
    .unwrap();
    drop(conn);
    write(dir.path(), "crm.csv", "ref;amount\nEXT-001;10.0\next-2;20.0\n");
    write(
        dir.path(),
        "jobs.toml",
        r#"
[jobs.customers]
join_keys = [
    { column = "customer_id", source1_column = "cust_no", source2_column = "ref", source2_transform = "remove_prefix_and_int" },
]

[jobs.customers.source1]
kind = "sqlite"
path = "ledger.db"
query = "SELECT cust_no, amount FROM accounts"

[jobs.customers.source2]
kind = "csv"
path = "crm.csv"
delimiter = ";"
"#,
    );

    let out = dbrecon(&["run", "jobs.toml", "--job", "customers"], dir.path());
    assert_eq!(out.status.code(), Some(0), "stdout: {}\nstderr: {}", stdout(&out), stderr(&out));
}

#[test]
fn unknown_transform_is_invalid_config() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "jobs.toml",
        r#"
[jobs.a]
join_keys = [{ column = "id", source1_transform = "reverse" }]
source1 = { kind = "csv", path = "a.csv" }
source2 = { kind = "csv", path = "b.csv" }
"#,
    );

    let out = dbrecon(&["run", "jobs.toml"], dir.path());
    assert_eq!(out.status.code(), Some(3));
    let err = stderr(&out);
    assert!(err.contains("error: "));
    assert!(err.contains("hint:  run `dbrecon transforms`"));
}

#[test]
fn missing_config_is_usage_error() {
    let dir = tempdir().unwrap();
    let out = dbrecon(&["run", "nope.toml"], dir.path());
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("nope.toml"));
}

#[test]
fn unknown_job_is_usage_error() {
    let dir = csv_fixture("id,amount,status\n");
    let out = dbrecon(&["run", "jobs.toml", "--job", "nope"], dir.path());
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("job 'nope' not found"));
}

#[test]
fn validate_does_not_touch_sources() {
    // neither CSV exists
    let dir = tempdir().unwrap();
    write(dir.path(), "jobs.toml", CSV_JOB);

    let out = dbrecon(&["validate", "jobs.toml"], dir.path());
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("accounts: csv ledger"));
    assert!(text.contains("keys [id]"));
    assert!(text.ends_with("ok: 1 job(s)\n"));
    assert!(!dir.path().join("output").exists());
}

#[test]
fn transforms_lists_names() {
    let dir = tempdir().unwrap();
    let out = dbrecon(&["transforms"], dir.path());
    assert_eq!(out.status.code(), Some(0));
    let names: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"remove_prefix_and_int".to_string()));
    assert!(names.contains(&"extract_digits".to_string()));
}

#[test]
fn log_file_receives_events() {
    let dir = csv_fixture("id,amount,status\n1,10.5,open\n2,20,closed\n");
    let out = dbrecon(&["run", "jobs.toml", "--log-file", "recon.log"], dir.path());
    assert_eq!(out.status.code(), Some(0));

    let log = std::fs::read_to_string(dir.path().join("recon.log")).unwrap();
    assert!(log.contains("PERFECT MATCH"));
    assert!(!log.contains('\u{1b}'));
}
