use anyhow::Result;
use svi_cli::cli::run;
use svi_cli::test_utils::fixtures::{SCENARIOS, Scenario};
use tokio_util::sync::CancellationToken;

use crate::common::TestProject;

async fn check(scenario: Scenario) -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", scenario.input);
    project.write("out.txt", scenario.before);

    run(&project.config(&["out.txt"], &["vars.json"]), CancellationToken::new()).await?;

    assert_eq!(project.read("out.txt")?, scenario.after, "scenario {}", scenario.name);
    assert!(!project.path().join("out.txt.injected").exists());
    Ok(())
}

#[tokio::test]
async fn test_all_scenarios() -> Result<()> {
    for scenario in SCENARIOS {
        check(scenario).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_second_run_is_a_no_op() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r##"{"a": "1", "b": {"c": "#{a}-2"}}"##);
    project.write("out.txt", "#{a} #{b.c}\n");
    let config = project.config(&["out.txt"], &["vars.json"]);

    run(&config, CancellationToken::new()).await?;
    let first = project.read("out.txt")?;
    run(&config, CancellationToken::new()).await?;

    assert_eq!(first, "1 1-2\n");
    assert_eq!(project.read("out.txt")?, first);
    Ok(())
}

#[tokio::test]
async fn test_whole_value_and_inline_functions() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r##"{"token": "#{abc | base64}", "plain": "x|y"}"##);
    project.write("out.txt", "#{token} #{plain} #{żółw | base64}\n");

    run(&project.config(&["out.txt"], &["vars.json"]), CancellationToken::new()).await?;

    assert_eq!(project.read("out.txt")?, "YWJj x|y xbzDs8WCdw==\n");
    Ok(())
}

#[tokio::test]
async fn test_missing_reference_stays_in_place() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r##"{"a": "#{missing}/x"}"##);
    project.write("out.txt", "#{a} #{other}\n");

    run(&project.config(&["out.txt"], &["vars.json"]), CancellationToken::new()).await?;

    assert_eq!(project.read("out.txt")?, "#{missing}/x #{other}\n");
    Ok(())
}

#[tokio::test]
async fn test_custom_tokens() -> Result<()> {
    let project = TestProject::new()?;
    project.write("vars.json", r#"{"host": "db", "url": "pg://${{host}}"}"#);
    project.write("out.txt", "${{url}} #{host}\n");

    let mut config = project.config(&["out.txt"], &["vars.json"]);
    config.tokens = svi_cli::config::TokenPair::new("${{", "}}")?;
    run(&config, CancellationToken::new()).await?;

    assert_eq!(project.read("out.txt")?, "pg://db #{host}\n");
    Ok(())
}
