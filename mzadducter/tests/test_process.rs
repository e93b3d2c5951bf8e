use std::{error::Error, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzadducter")?;

    cmd.arg("not_real.mzML").args(["-f", "C12H11N", "-o", "-"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"));
    Ok(())
}

#[test]
fn test_malformed_time_range() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzadducter")?;

    cmd.arg("not_real.mzML")
        .args(["-f", "C12H11N", "-o", "-"])
        .args(["-r", "a-z"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse time range start invalid float literal",
    ));
    Ok(())
}

#[test]
fn test_malformed_adduct() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzadducter")?;

    cmd.arg("not_real.mzML")
        .args(["-f", "C12H11N", "-o", "-"])
        .args(["-a", "[%s + Q]:Q:add"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("\"Q\" is not an element"));

    let mut cmd = Command::cargo_bin("mzadducter")?;
    cmd.arg("not_real.mzML")
        .args(["-f", "C12H11N", "-o", "-"])
        .args(["-a", "[%s + K]:K:add"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("exactly one"));
    Ok(())
}

#[test]
fn test_malformed_analyte() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzadducter")?;

    cmd.arg("not_real.mzML").args(["-f", "C12Xx", "-o", "-"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("UnknownElement"));
    Ok(())
}
