use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::{CliTest, run};

const FLAGS_TS: &str = r#"export interface LDFlagSet {
  [key: string]: unknown;
}
"#;

const DASHBOARD_TS: &str = r#"import { Component } from '@angular/core';
import { LDFlagSet } from './flags';

@Component({
  selector: 'app-dashboard',
  templateUrl: './dashboard.component.html',
})
export class DashboardComponent {
  flags!: LDFlagSet;

  get showBanner(): boolean {
    return this.flags['promo-banner'] === true;
  }
}
"#;

const DASHBOARD_HTML: &str = r#"<h1>Dashboard</h1>
@if (flags['new-dashboard']) {
  <span>new</span>
}
<p>{{ flags['promo-banner'] }}</p>
"#;

const CART_TS: &str = r#"import { Component } from '@angular/core';
import { LDFlagSet } from '../app/flags';

@Component({
  selector: 'app-cart',
  template: `<button *ngIf="flags['new-checkout']">Pay</button>`,
})
export class CartComponent {
  flags!: LDFlagSet;
}
"#;

fn app() -> Result<CliTest> {
    CliTest::with_files(&[
        ("src/app/flags.ts", FLAGS_TS),
        ("src/app/dashboard.component.ts", DASHBOARD_TS),
        ("src/app/dashboard.component.html", DASHBOARD_HTML),
        ("src/shop/cart.component.ts", CART_TS),
    ])
}

#[test]
fn test_extract_lists_flags() -> Result<()> {
    let test = app()?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "new-checkout\nnew-dashboard\npromo-banner\n");
    assert_eq!(out.stderr, "\u{2713} Found 3 flags (4 reads) in 3 files\n");
    Ok(())
}

#[test]
fn test_extract_locations() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().arg("--locations"))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(
        out.stdout,
        "new-checkout
  src/shop/cart.component.ts:6:35 [template]
new-dashboard
  src/app/dashboard.component.html:2:12 [template]
promo-banner
  src/app/dashboard.component.html:5:13 [template]
  src/app/dashboard.component.ts:12:23 [component]
"
    );
    Ok(())
}

#[test]
fn test_extract_json() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().arg("--json"))?;

    assert_eq!(out.code, Some(0));
    let value: Value = serde_json::from_str(&out.stdout)?;
    assert_eq!(
        value["promo-banner"],
        json!([
            { "path": "src/app/dashboard.component.html", "line": 5, "column": 13, "source": "template" },
            { "path": "src/app/dashboard.component.ts", "line": 12, "column": 23, "source": "component" },
        ])
    );
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["new-checkout", "new-dashboard", "promo-banner"]);
    Ok(())
}

#[test]
fn test_extract_locations_conflicts_with_json() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().args(["--locations", "--json"]))?;

    assert_eq!(out.code, Some(2));
    assert!(out.stdout.is_empty());
    Ok(())
}

#[test]
fn test_extract_filters_by_flag_and_source() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().args([
        "--locations",
        "--flag",
        "promo-banner",
        "--source",
        "component",
    ]))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(
        out.stdout,
        "promo-banner\n  src/app/dashboard.component.ts:12:23 [component]\n"
    );
    Ok(())
}

#[test]
fn test_extract_filters_by_path() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().args(["--path", "src/shop/**"]))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "new-checkout\n");
    Ok(())
}

#[test]
fn test_extract_writes_output_file() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().args(["--output", "flags.txt"]))?;

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.is_empty());
    assert_eq!(
        test.read_file("flags.txt")?,
        "new-checkout\nnew-dashboard\npromo-banner\n"
    );
    assert!(out.stderr.contains("wrote flags.txt"));
    Ok(())
}

#[test]
fn test_extract_source_root_argument() -> Result<()> {
    let test = CliTest::new()?;
    test.write_file("web/src/app/flags.ts", FLAGS_TS)?;
    test.write_file("web/src/shop/cart.component.ts", CART_TS)?;

    let out = run(test.extract_command().args(["--source-root", "web", "--locations"]))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(
        out.stdout,
        "new-checkout\n  src/shop/cart.component.ts:6:35 [template]\n"
    );
    Ok(())
}

#[test]
fn test_extract_same_template_url_in_two_directories() -> Result<()> {
    let component = |flag_type_import: &str| {
        format!(
            "{}\n@Component({{ selector: 'x', templateUrl: './panel.component.html' }})\nexport class PanelComponent {{\n  flags!: LDFlagSet;\n}}\n",
            flag_type_import
        )
    };
    let test = CliTest::with_files(&[
        ("src/flags.ts", FLAGS_TS),
        ("src/admin/panel.component.ts", &component("import { LDFlagSet } from '../flags';")),
        ("src/admin/panel.component.html", "{{ flags['admin-panel'] }}\n"),
        ("src/shop/panel.component.ts", &component("import { LDFlagSet } from '../flags';")),
        ("src/shop/panel.component.html", "<div>{{ flags['shop-panel'] }}</div>\n"),
    ])?;

    let out = run(test.extract_command().arg("--locations"))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(
        out.stdout,
        "admin-panel
  src/admin/panel.component.html:1:10 [template]
shop-panel
  src/shop/panel.component.html:1:15 [template]
"
    );
    Ok(())
}

const PROMO_TS: &str = r#"import { Component } from '@angular/core';
import { LDFlagSet } from './app/flags';

@Component({
  selector: 'app-promo',
  template: '<p title="café">{{ flags[\'beta\'] }}</p>',
})
export default class PromoComponent {
  flags!: LDFlagSet;
}
"#;

#[test]
fn test_extract_default_export_with_escaped_inline_template() -> Result<()> {
    let test = CliTest::with_files(&[
        ("src/app/flags.ts", FLAGS_TS),
        ("src/promo.component.ts", PROMO_TS),
    ])?;

    let out = run(test.extract_command().arg("--locations"))?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "beta\n  src/promo.component.ts:6:39 [template]\n");
    assert_eq!(out.stderr, "\u{2713} Found 1 flag (1 read) in 2 files\n");
    Ok(())
}

#[test]
fn test_extract_ignores_lookalike_types() -> Result<()> {
    let test = CliTest::with_files(&[(
        "src/a.ts",
        "declare const flags: Record<string, unknown>;\nflags['not-a-flag'];\n",
    )])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.is_empty());
    assert_eq!(out.stderr, "\u{2713} Found 0 flags (0 reads) in 1 file\n");
    Ok(())
}

const DYNAMIC_KEY_TS: &str = r#"interface LDFlagSet { [key: string]: unknown }

export class FlagService {
  flags!: LDFlagSet;

  isOn(name: string) {
    return this.flags[name];
  }

  get beta() {
    return this.flags['beta'];
  }
}
"#;

#[test]
fn test_extract_reports_unresolved_keys() -> Result<()> {
    let test = CliTest::with_files(&[("src/flag.service.ts", DYNAMIC_KEY_TS)])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "beta\n");
    assert!(
        out.stderr
            .starts_with("warning: \"name\"  unresolved-key\n  --> src/flag.service.ts:7:23\n"),
        "unexpected stderr: {}",
        out.stderr
    );
    assert!(out.stderr.contains("7 |     return this.flags[name];\n"));
    assert!(out.stderr.contains("Found 1 flag (1 read) in 1 file, 1 warning"));
    Ok(())
}

#[test]
fn test_extract_strict_fails_on_warnings() -> Result<()> {
    let test = CliTest::with_files(&[("src/flag.service.ts", DYNAMIC_KEY_TS)])?;

    let out = run(test.extract_command().arg("--strict"))?;

    assert_eq!(out.code, Some(1));
    assert_eq!(out.stdout, "beta\n");
    Ok(())
}

#[test]
fn test_extract_strict_passes_without_warnings() -> Result<()> {
    let test = app()?;

    let out = run(test.extract_command().arg("--strict"))?;

    assert_eq!(out.code, Some(0));
    Ok(())
}

#[test]
fn test_extract_missing_template_is_a_warning() -> Result<()> {
    let test = CliTest::with_files(&[(
        "src/gone.component.ts",
        "@Component({ templateUrl: './gone.component.html' })\nexport class GoneComponent {}\n",
    )])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(0));
    assert!(out.stderr.contains("missing-template"));
    assert!(out.stderr.contains("--> src/gone.component.ts:1:"));
    assert!(out.stderr.contains("template of GoneComponent skipped"));
    Ok(())
}

#[test]
fn test_extract_malformed_template_is_fatal() -> Result<()> {
    let test = CliTest::with_files(&[
        (
            "src/broken.component.ts",
            "@Component({ templateUrl: './broken.component.html' })\nexport class BrokenComponent {}\n",
        ),
        ("src/broken.component.html", "@if (ready) {\n  <p>never closed</p>\n"),
    ])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(2));
    assert!(out.stdout.is_empty());
    assert!(
        out.stderr.starts_with("Error: Failed to parse template: "),
        "unexpected stderr: {}",
        out.stderr
    );
    assert!(out.stderr.contains("broken.component.html"));
    Ok(())
}

const TOGGLES_TS: &str = "interface Toggles { [key: string]: boolean }\ndeclare const t: Toggles;\nt['dark-mode'];\n";

#[test]
fn test_extract_flag_set_type_from_config() -> Result<()> {
    let test = CliTest::with_files(&[
        ("src/toggles.ts", TOGGLES_TS),
        (".ngflagsrc.json", r#"{ "flagSetType": "Toggles" }"#),
    ])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(0));
    assert_eq!(out.stdout, "dark-mode\n");
    Ok(())
}

#[test]
fn test_extract_flag_set_type_argument() -> Result<()> {
    let test = CliTest::with_files(&[("src/toggles.ts", TOGGLES_TS)])?;

    let default = run(&mut test.extract_command())?;
    assert!(default.stdout.is_empty());

    let out = run(test.extract_command().args(["--flag-set-type", "Toggles"]))?;
    assert_eq!(out.stdout, "dark-mode\n");
    Ok(())
}

#[test]
fn test_extract_invalid_config_is_an_error() -> Result<()> {
    let test = CliTest::with_files(&[
        ("src/toggles.ts", TOGGLES_TS),
        (".ngflagsrc.json", r#"{ "ignores": ["[invalid"] }"#),
    ])?;

    let out = run(&mut test.extract_command())?;

    assert_eq!(out.code, Some(2));
    assert!(out.stderr.contains("Invalid glob pattern in 'ignores'"));
    Ok(())
}

#[test]
fn test_extract_is_deterministic() -> Result<()> {
    let test = app()?;

    let first = run(test.extract_command().arg("--json"))?;
    let second = run(test.extract_command().arg("--json"))?;

    assert_eq!(first.stdout, second.stdout);
    Ok(())
}

#[test]
fn test_no_command_prints_help() -> Result<()> {
    let test = CliTest::new()?;

    let out = run(&mut test.command())?;

    assert_eq!(out.code, Some(0));
    assert!(out.stdout.contains("extract"));
    assert!(out.stdout.contains("init"));
    Ok(())
}
