use anyhow::Result;
use svi_cli::cli::run;
use svi_cli::core::{SviError, find_svi_error};
use svi_cli::test_utils::fixtures::{HIERARCHY, HIERARCHY_BEFORE};
use tokio_util::sync::CancellationToken;

use crate::common::TestProject;

fn layered_project() -> Result<TestProject> {
    let project = TestProject::new()?;
    for (index, content) in HIERARCHY.iter().enumerate() {
        project.write(&format!("vars/{index}.json"), content);
    }
    project.write("out.yml", HIERARCHY_BEFORE);
    Ok(project)
}

#[tokio::test]
async fn test_last_source_wins() -> Result<()> {
    let project = layered_project()?;
    let config = project.config(&["out.yml"], &["vars/0.json", "vars/1.json", "vars/2.json"]);

    run(&config, CancellationToken::new()).await?;

    assert_eq!(project.read("out.yml")?, "env: c\nbase: from-a\n");
    Ok(())
}

#[tokio::test]
async fn test_reversed_order_reverses_winner() -> Result<()> {
    let project = layered_project()?;
    let config = project.config(&["out.yml"], &["vars/2.json", "vars/1.json", "vars/0.json"]);

    run(&config, CancellationToken::new()).await?;

    assert_eq!(project.read("out.yml")?, "env: a\nbase: from-a\n");
    Ok(())
}

#[tokio::test]
async fn test_glob_sources_merge_in_name_order() -> Result<()> {
    let project = layered_project()?;
    let config = project.config(&["out.yml"], &["vars/*.json"]);

    run(&config, CancellationToken::new()).await?;

    assert_eq!(project.read("out.yml")?, "env: c\nbase: from-a\n");
    Ok(())
}

#[tokio::test]
async fn test_references_resolve_after_merge() -> Result<()> {
    let project = TestProject::new()?;
    project.write("base.json", r#"{"url": "https://#{host}/api", "host": "dev.local"}"#);
    project.write("prod.json", r#"{"host": "prod.example.com"}"#);
    project.write("out.txt", "#{url}\n");

    let config = project.config(&["out.txt"], &["base.json", "prod.json"]);
    run(&config, CancellationToken::new()).await?;

    assert_eq!(project.read("out.txt")?, "https://prod.example.com/api\n");
    Ok(())
}

#[tokio::test]
async fn test_malformed_source_aborts_before_outputs() -> Result<()> {
    let project = TestProject::new()?;
    project.write("good.json", r#"{"a": "1"}"#);
    project.write("bad.json", r#"{"a": "#);
    project.write("out.txt", "#{a}\n");

    let config = project.config(&["out.txt"], &["good.json", "bad.json"]);
    let err = run(&config, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(find_svi_error(&err), Some(SviError::JsonParse { .. })));
    assert_eq!(project.read("out.txt")?, "#{a}\n");
    Ok(())
}
