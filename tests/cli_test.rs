use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(cargo_bin!("payserve"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--max-retries"))
        .stdout(predicate::str::contains("--base-delay-ms"))
        .stdout(predicate::str::contains("--admission-shards"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut cmd = Command::new(cargo_bin!("payserve"));
    cmd.args(["--port", "0"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("port must be non-zero"));
}

#[test]
fn test_out_of_range_failure_rate_is_rejected() {
    let mut cmd = Command::new(cargo_bin!("payserve"));
    cmd.args(["--gateway-failure-rate", "2"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("gateway failure rate"));
}
