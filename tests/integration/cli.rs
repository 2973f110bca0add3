use anyhow::Result;
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_successful_run_exits_zero() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"name": "svi"}"#);
    project.write("out.txt", "hello #{name}\n");

    project.svi().args(["-i", "vars.json", "out.txt"]).assert().success();

    assert_eq!(project.read("out.txt")?, "hello svi\n");
    Ok(())
}

#[test]
fn test_environment_configuration() -> Result<()> {
    let project = TestProject::new()?;
    project.write("base.json", r#"{"env": "base", "name": "svi"}"#);
    project.write("prod.json", r#"{"env": "prod"}"#);
    project.write("a.txt", "#{env}\n");
    project.write("b.txt", "<<name>>\n");

    project
        .svi()
        .env("SVI_INPUT", "base.json; prod.json;")
        .env("SVI_OUTPUT", "a.txt;b.txt")
        .env("SVI_OPENING", "<<")
        .env("SVI_CLOSING", ">>")
        .assert()
        .success();

    assert_eq!(project.read("a.txt")?, "#{env}\n");
    assert_eq!(project.read("b.txt")?, "svi\n");
    Ok(())
}

#[test]
fn test_missing_input_exits_one() -> Result<()> {
    let project = TestProject::new()?;
    project.write("out.txt", "#{a}\n");

    project
        .svi()
        .args(["-i", "absent.json", "out.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("absent.json"));

    assert_eq!(project.read("out.txt")?, "#{a}\n");
    Ok(())
}

#[test]
fn test_key_collision_exits_one() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"key": "plain"}"#);
    project.write("secrets.json", r#"{"key": "also plain"}"#);
    project.write("out.txt", "#{key}\n");

    project
        .svi()
        .args(["-i", "vars.json", "-s", "secrets.json", "out.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("key"));

    assert_eq!(project.read("out.txt")?, "#{key}\n");
    Ok(())
}

#[test]
fn test_no_outputs_is_an_error() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", "{}");

    project.svi().args(["-i", "vars.json"]).assert().code(1);
    Ok(())
}

#[test]
fn test_quiet_run_logs_nothing() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"a": "1"}"#);
    project.write("out.txt", "#{a}\n");

    project
        .svi()
        .args(["-q", "-i", "vars.json", "out.txt"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
    Ok(())
}

#[test]
fn test_secret_values_stay_out_of_logs() -> Result<()> {
    let project = TestProject::new()?;
    project.write(
        "secrets.json",
        r#"{"db": {"password": {"type": "aws-sm-dictionary", "secretId": "prod/db", "key": "password"}}}"#,
    );
    project.write("store.json", r#"{"prod/db": {"password": "hunter2"}}"#);
    project.write("out.txt", "#{db.password}\n");

    project
        .svi()
        .args(["-s", "secrets.json", "--secret-store", "store.json", "-v", "out.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("hunter2").not());

    assert_eq!(project.read("out.txt")?, "hunter2\n");
    Ok(())
}

#[test]
fn test_help_lists_environment_variables() {
    let project = TestProject::new().unwrap();
    project
        .svi()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SVI_INPUT").and(predicate::str::contains("SVI_OUTPUT")));
}
