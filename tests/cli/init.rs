use anyhow::{Context, Result};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::{CliTest, run};

#[test]
fn test_init_creates_config() -> Result<()> {
    let test = CliTest::new()?;

    let out = run(test.command().arg("init"))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "\u{2713} Created .ngflagsrc.json\n");
    assert!(test.root().join(".ngflagsrc.json").exists());

    let content = test.read_file(".ngflagsrc.json")?;
    let parsed: Value = serde_json::from_str(&content).context("Config should be valid JSON")?;
    assert_eq!(parsed["flagSetType"], "LDFlagSet");
    assert_eq!(parsed["includes"], serde_json::json!(["src"]));
    assert_eq!(parsed["ignoreTestFiles"], true);
    assert!(content.contains("\n  \""), "Config should use 2-space indentation");

    Ok(())
}

#[test]
fn test_init_fails_if_exists() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(".ngflagsrc.json", "{}")?;

    let out = run(test.command().arg("init"))?;

    assert_eq!(out.code, Some(2));
    assert_eq!(out.stderr, "Error: .ngflagsrc.json already exists\n");
    assert_eq!(test.read_file(".ngflagsrc.json")?, "{}");

    Ok(())
}

#[test]
fn test_init_config_is_used_by_extract() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file(
        "src/a.ts",
        "interface LDFlagSet { [key: string]: unknown }\ndeclare const flags: LDFlagSet;\nflags['from-default-config'];\n",
    )?;

    run(test.command().arg("init"))?;
    let out = run(&mut test.extract_command())?;

    assert_eq!(out.stdout, "from-default-config\n");

    Ok(())
}
