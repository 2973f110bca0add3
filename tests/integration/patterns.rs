use anyhow::Result;
use svi_cli::cli::run;
use svi_cli::core::{SviError, find_svi_error};
use tokio_util::sync::CancellationToken;

use crate::common::TestProject;

#[tokio::test]
async fn test_output_glob_walks_subdirectories() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"v": "1"}"#);
    project.write("deploy/a.yml", "#{v}\n");
    project.write("deploy/nested/b.YML", "#{v}\n");
    project.write("deploy/c.txt", "#{v}\n");

    let summary =
        run(&project.config(&["deploy/*.yml"], &["vars.json"]), CancellationToken::new()).await?;

    assert_eq!(summary.files, 2);
    assert_eq!(project.read("deploy/a.yml")?, "1\n");
    assert_eq!(project.read("deploy/nested/b.YML")?, "1\n");
    assert_eq!(project.read("deploy/c.txt")?, "#{v}\n");
    Ok(())
}

#[tokio::test]
async fn test_glob_options_narrow_matches() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"v": "1"}"#);
    project.write("deploy/a.yml", "#{v}\n");
    project.write("deploy/B.YML", "#{v}\n");
    project.write("deploy/nested/c.yml", "#{v}\n");

    let mut config = project.config(&["deploy/*.yml"], &["vars.json"]);
    config.recurse_subdirectories = false;
    config.ignore_case = false;
    let summary = run(&config, CancellationToken::new()).await?;

    assert_eq!(summary.files, 1);
    assert_eq!(project.read("deploy/a.yml")?, "1\n");
    assert_eq!(project.read("deploy/B.YML")?, "#{v}\n");
    assert_eq!(project.read("deploy/nested/c.yml")?, "#{v}\n");
    Ok(())
}

#[tokio::test]
async fn test_overlapping_outputs_are_rewritten_once() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"v": "1"}"#);
    project.write("out/a.yml", "#{v}\n");

    let summary = run(
        &project.config(&["out/a.yml", "out/*.yml"], &["vars.json"]),
        CancellationToken::new(),
    )
    .await?;

    assert_eq!(summary.files, 1);
    assert_eq!(project.read("out/a.yml")?, "1\n");
    Ok(())
}

#[tokio::test]
async fn test_missing_source_file() -> Result<()> {
    let project = TestProject::new()?;
    project.write("out.txt", "#{v}\n");

    let err = run(&project.config(&["out.txt"], &["absent.json"]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(find_svi_error(&err), Some(SviError::InvalidPath { .. })));
    assert_eq!(project.read("out.txt")?, "#{v}\n");
    Ok(())
}
