//! End-to-end runs of the mailer without a relay

use bulk_mailer::{execute, Cli};
use clap::Parser;
use email::BatchResult;
use std::collections::HashMap;
use std::path::Path;

fn cli(csv: &Path, extra: &[&str]) -> Cli {
    let mut args = vec!["bulk-mailer".to_string(), "--csv".to_string(), csv.display().to_string()];
    args.extend(extra.iter().map(|s| s.to_string()));
    Cli::parse_from(args)
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_dry_run_counts_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    std::fs::write(
        &csv,
        "email,first_name,attachment\n\
         ,NoAddress,\n\
         b@example.com,Bob,/definitely/not/here.pdf\n\
         c@example.com,Cleo,\n",
    )
    .unwrap();

    let result = execute(&cli(&csv, &["--dry-run"]), &env(&[])).await.unwrap();

    assert_eq!(result, BatchResult { total: 3, sent: 2, failed: 1 });
}

#[tokio::test]
async fn test_dry_run_with_custom_template() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    let template = dir.path().join("body.txt");
    std::fs::write(&csv, "Email,FirstName,plan\na@example.com,Ada,Pro\n").unwrap();
    std::fs::write(&template, "Hi {first_name}, you are on {plan}.").unwrap();

    let args = cli(&csv, &["--dry-run", "--template", template.to_str().unwrap()]);
    let result = execute(&args, &env(&[("SMTP_USER", "ops@example.com")])).await.unwrap();

    assert_eq!(result.sent, 1);
}

#[tokio::test]
async fn test_unknown_placeholder_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    let template = dir.path().join("body.txt");
    std::fs::write(&csv, "email\na@example.com\n").unwrap();
    std::fs::write(&template, "Hi {nickname}").unwrap();

    let args = cli(&csv, &["--dry-run", "--template", template.to_str().unwrap()]);
    let err = execute(&args, &env(&[])).await.unwrap_err();

    assert!(err.to_string().contains("nickname"));
}

#[tokio::test]
async fn test_missing_csv_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let args = cli(&dir.path().join("absent.csv"), &["--dry-run"]);

    let err = execute(&args, &env(&[])).await.unwrap_err();

    assert!(err.to_string().contains("Failed to read recipients"));
}

#[tokio::test]
async fn test_live_run_requires_smtp_user() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "email\na@example.com\n").unwrap();

    let err = execute(&cli(&csv, &[]), &env(&[])).await.unwrap_err();

    assert!(err.to_string().contains("SMTP_USER"));
}

#[tokio::test]
async fn test_invalid_port_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "email\na@example.com\n").unwrap();

    let err = execute(&cli(&csv, &["--dry-run"]), &env(&[("SMTP_PORT", "not-a-port")]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Invalid configuration"));
}

mod binary_tests {
    use std::process::Command;

    fn mailer(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_bulk-mailer"))
            .current_dir(dir)
            .args(["--env-file", "missing.env", "--log-file", "mailer.log"])
            .args(args)
            .env_remove("SMTP_USER")
            .env_remove("RUST_LOG")
            .env_remove("APP_ENV")
            .output()
            .unwrap()
    }

    #[test]
    fn test_fatal_error_exits_one_and_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();

        let output = mailer(dir.path(), &["--csv", "absent.csv", "--dry-run"]);

        assert_eq!(output.status.code(), Some(1));
        let console = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(console.matches("Failed to read recipients").count(), 1, "{console}");
    }

    #[test]
    fn test_completed_dry_run_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("people.csv"), "email\na@example.com\n,\n").unwrap();

        let output = mailer(dir.path(), &["--csv", "people.csv", "--dry-run"]);

        assert_eq!(output.status.code(), Some(0));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Finished. Total: 2 sent: 1 failed: 1"), "{stdout}");
        assert!(dir.path().join("mailer.log").exists());
    }
}
