//! CLI routing against real settings files.

use clap::Parser;
use rx_context::cli::{Cli, RunContext};
use rx_context::config::Settings;
use rx_context::rx::ShapeKind;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("rx-context.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_demo_command_reports_every_shape() {
    let cli = Cli::try_parse_from(["rx-context", "demo", "--rounds", "2"]).unwrap();
    let context = RunContext::with_settings(Settings::default(), None);

    let output = context.execute(&cli.command).unwrap();
    assert!(output.starts_with("context propagation: enabled"));
    for shape in ShapeKind::ALL {
        assert!(output.contains(shape.type_name()), "missing {}", shape);
    }
    assert!(output.contains("request-1"));
    assert!(output.ends_with("10/10 subscriptions observed their assembly context"));
}

#[test]
fn test_demo_honors_disabled_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[propagation]\nenabled = false\n");

    let context = RunContext::new(Some(path)).unwrap();
    assert!(!context.settings().propagation.enabled);

    let report = context.run_demo(false, 1).unwrap();
    assert!(!report.propagation_enabled);
    assert!(!report.all_propagated());
    assert!(report.render().ends_with("0/5 subscriptions observed their assembly context"));
}

#[test]
fn test_config_command_prints_effective_settings() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[logging]\nlevel = \"debug\"\nformat = \"json\"\n");

    let context = RunContext::new(Some(path)).unwrap();
    let cli = Cli::try_parse_from(["rx-context", "config"]).unwrap();
    let output = context.execute(&cli.command).unwrap();

    let parsed: Settings = toml::from_str(&output).unwrap();
    assert_eq!(parsed.logging.level, "debug");
    assert_eq!(parsed.logging.format, "json");
    assert!(parsed.propagation.enabled);
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = RunContext::new(Some(dir.path().join("absent.toml")));
    assert!(result.is_err());
}
