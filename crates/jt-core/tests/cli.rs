//! CLI tests for the jt-core binary: payloads, formats and exit codes.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Command with config discovery pointed at an empty directory.
fn jt_core(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("jt-core").expect("jt-core binary should exist");
    cmd.env_remove("JT_NETWORK")
        .env_remove("JT_SETTINGS")
        .env_remove("JT_LOG")
        .env_remove("RUST_LOG")
        .env("JT_CONFIG_DIR", home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ============================================================================
// check / compile
// ============================================================================

mod check {
    use super::*;

    #[test]
    fn valid_network_passes() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(jt_core(home.path()).arg("check").arg(fixture("sprinkler.json")));
        assert_eq!(out["command"], "check");
        assert_eq!(out["status"], "ok");
        assert_eq!(out["network"]["variables"], 3);
        assert!(out["run_id"].as_str().is_some());
    }

    #[test]
    fn yaml_network_passes() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .arg("check")
            .arg(fixture("diamond.yaml"))
            .assert()
            .success();
    }

    #[test]
    fn cyclic_network_is_rejected() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .arg("check")
            .arg(fixture("cyclic.json"))
            .assert()
            .code(11)
            .stderr(predicate::str::contains("ERR_NETWORK"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .arg("check")
            .arg(home.path().join("absent.json"))
            .assert()
            .code(21)
            .stderr(predicate::str::contains("ERR_IO"));
    }

    #[test]
    fn no_network_anywhere_is_an_args_error() {
        let home = TempDir::new().unwrap();
        jt_core(home.path()).arg("check").assert().code(10);
    }

    #[test]
    fn network_found_through_env() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .env("JT_NETWORK", fixture("sprinkler.json"))
            .arg("check")
            .assert()
            .success();
    }

    #[test]
    fn strict_rejects_unnormalized_rows() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("loose.json");
        std::fs::write(
            &path,
            r#"{"COIN": {"states": ["H", "T"], "cpt": {"H": 0.5, "T": 0.6}}}"#,
        )
        .unwrap();
        jt_core(home.path()).arg("check").arg(&path).assert().success();
        jt_core(home.path())
            .args(["check", "--strict"])
            .arg(&path)
            .assert()
            .code(11);
    }
}

mod compile {
    use super::*;

    #[test]
    fn diamond_forest_shape() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(jt_core(home.path()).arg("compile").arg(fixture("diamond.yaml")));
        assert_eq!(out["command"], "compile");
        assert_eq!(out["cliques"].as_array().unwrap().len(), 4);
        assert_eq!(out["separators"].as_array().unwrap().len(), 3);
        assert_eq!(out["fill_edges"].as_array().unwrap().len(), 2);
        assert_eq!(out["components"], 1);
        assert_eq!(out["running_intersection"], true);
    }

    #[test]
    fn summary_format_is_one_line() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["--format", "summary", "compile"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("compiled 3 variables: 1 cliques"));
    }
}

// ============================================================================
// infer / query
// ============================================================================

mod infer {
    use super::*;

    fn marginal(out: &Value, name: &str, state: &str) -> f64 {
        out["marginals"][name][state].as_f64().expect("marginal present")
    }

    #[test]
    fn prior_marginals() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(jt_core(home.path()).arg("infer").arg(fixture("sprinkler.json")));
        assert!((marginal(&out, "GRASS_WET", "T") - 0.4484).abs() < 1e-9);
        assert!((out["evidence_probability"].as_f64().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn evidence_flag_conditions_marginals() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(
            jt_core(home.path())
                .args(["infer", "-e", "RAIN=T"])
                .arg(fixture("sprinkler.json")),
        );
        assert!((marginal(&out, "SPRINKLER", "T") - 0.01).abs() < 1e-12);
        assert_eq!(marginal(&out, "RAIN", "T"), 1.0);
        assert_eq!(out["evidence"]["RAIN"], "T");
        assert!((out["evidence_probability"].as_f64().unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn iterative_traversal_gives_same_answer() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(
            jt_core(home.path())
                .args(["--traversal", "iterative", "infer", "-e", "F=f0"])
                .arg(fixture("diamond.yaml")),
        );
        let recursive = json_stdout(
            jt_core(home.path())
                .args(["infer", "-e", "F=f0"])
                .arg(fixture("diamond.yaml")),
        );
        assert_eq!(out["marginals"], recursive["marginals"]);
    }

    #[test]
    fn precision_from_settings_file() {
        let home = TempDir::new().unwrap();
        let settings = home.path().join("settings.toml");
        std::fs::write(&settings, "schema_version = \"1.0.0\"\n\n[output]\nprecision = 2\n")
            .unwrap();
        let out = json_stdout(
            jt_core(home.path())
                .arg("--settings")
                .arg(&settings)
                .arg("infer")
                .arg(fixture("sprinkler.json")),
        );
        assert_eq!(marginal(&out, "SPRINKLER", "T"), 0.32);
    }

    #[test]
    fn precision_above_maximum_is_rejected() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["infer", "--precision", "40"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .code(10);
    }

    #[test]
    fn unknown_variable_is_a_query_error() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["infer", "-e", "HAIL=T"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .code(12)
            .stderr(predicate::str::contains("HAIL"));
    }

    #[test]
    fn malformed_assignment_is_rejected_by_the_parser() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["infer", "-e", "RAIN"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("NAME=STATE"));
    }

    #[test]
    fn markdown_format_renders_table() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["-f", "md", "infer"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("# Posterior Marginals"))
            .stdout(predicate::str::contains("| Variable | State | Probability |"));
    }
}

mod query {
    use super::*;

    #[test]
    fn conditional_probability() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(
            jt_core(home.path())
                .args(["query", "--event", "SPRINKLER=T", "--given", "RAIN=T"])
                .arg(fixture("sprinkler.json")),
        );
        assert!((out["probability"].as_f64().unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(out["given"]["RAIN"], "T");
    }

    #[test]
    fn joint_under_evidence() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(
            jt_core(home.path())
                .args(["query", "--event", "RAIN=T", "--event", "SPRINKLER=F"])
                .args(["-e", "GRASS_WET=T"])
                .arg(fixture("sprinkler.json")),
        );
        // P(R=T, S=F, W=T) = 0.2 * 0.99 * 0.8 over P(W=T) = 0.4484.
        let want = 0.2 * 0.99 * 0.8 / 0.4484;
        assert!((out["probability"].as_f64().unwrap() - want).abs() < 1e-4);
    }

    #[test]
    fn summary_format_prints_expression() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["-f", "summary", "query", "--event", "SPRINKLER=T", "--given", "RAIN=T"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .success()
            .stdout(predicate::str::starts_with("P(SPRINKLER=T | RAIN=T) = 0.01"));
    }

    #[test]
    fn event_is_required() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .arg("query")
            .arg(fixture("sprinkler.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("--event"));
    }

    #[test]
    fn unknown_state_is_a_query_error() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["query", "--event", "RAIN=maybe"])
            .arg(fixture("sprinkler.json"))
            .assert()
            .code(12)
            .stderr(predicate::str::contains("ERR_QUERY"));
    }
}

// ============================================================================
// schema / version
// ============================================================================

mod schema {
    use super::*;

    #[test]
    fn list_names_types() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["schema", "--list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Network"))
            .stdout(predicate::str::contains("QueryReport"));
    }

    #[test]
    fn default_schema_is_json() {
        let home = TempDir::new().unwrap();
        let out = json_stdout(jt_core(home.path()).arg("schema"));
        assert!(out.is_object());
    }

    #[test]
    fn unknown_schema_fails() {
        let home = TempDir::new().unwrap();
        jt_core(home.path())
            .args(["schema", "Plan"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("unknown schema type"));
    }
}

#[test]
fn version_reports_schema_versions() {
    let home = TempDir::new().unwrap();
    let out = json_stdout(jt_core(home.path()).arg("version"));
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(out["config_schema_version"], "1.0.0");
}
