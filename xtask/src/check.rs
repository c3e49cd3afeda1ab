use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::cargo::run_step;

/// Embedded target the no_std crates must build for.
const TARGET: &str = "thumbv7em-none-eabihf";

/// One `cargo check` invocation that must pass.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
}

const STEPS: &[Step] = &[
    Step {
        label: "overlay (host, tracing)",
        args: &["check", "-p", "overlay", "--features", "std,tracing"],
    },
    Step {
        label: "platform (no_std)",
        args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
    },
    Step {
        label: "overlay (no_std, defmt)",
        args: &["check", "-p", "overlay", "--target", TARGET, "--features", "defmt"],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking overlay builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        run_step(&format!("Checking {}", step.label), step.args)?;
        println!();
    }

    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if clippy_output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
        // Don't fail on clippy warnings, just show them
    }
    println!();

    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if fmt_output.status.success() {
        println!("{}", "  ✓ Formatting check passed".green());
    } else {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
