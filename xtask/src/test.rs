use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Integration and property suites under `crates/overlay/tests`.
const OVERLAY_SUITES: &[&str] = &["integration_kickoff", "tear_line_proptest"];

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    let run_unit = !integration_only;
    let run_integration = !unit_only;

    if run_unit {
        run_suite("Unit tests", &["test", "--lib", "--workspace"], true)?;
    }

    if run_integration {
        let mut args = vec!["test", "-p", "overlay"];
        for &suite in OVERLAY_SUITES {
            args.extend(["--test", suite]);
        }
        run_suite("Integration tests", &args, true)?;
    }

    // Doc examples are informative; a failure is reported but not fatal.
    run_suite("Doc tests", &["test", "--doc", "--workspace"], false)?;

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn run_suite(label: &str, args: &[&str], fatal: bool) -> Result<()> {
    println!("{}", format!("  Running {}...", label.to_lowercase()).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {}", label.to_lowercase()))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ {} passed {} in {:.2}s",
                label,
                extract_test_summary(&stdout),
                start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else if fatal {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{label} failed");
    } else {
        eprintln!("{}", format!("  ⚠ {label} failed").yellow().bold());
    }
    println!();
    Ok(())
}

fn extract_test_summary(output: &str) -> String {
    // Look for lines like "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if line.contains("test result:") {
            if let Some(summary) = line.split("test result:").nth(1) {
                return summary.trim().to_string();
            }
        }
    }
    "(summary not available)".to_string()
}
