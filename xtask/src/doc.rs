use anyhow::Result;
use colored::Colorize;

use crate::cargo::run_step;

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let mut args = vec![
        "doc", "-p", "platform", "-p", "overlay", "--no-deps", "--features", "overlay/std",
    ];
    if open {
        args.push("--open");
    }
    run_step("Building rustdoc", &args)?;

    if !open {
        println!(
            "   {}",
            "See target/doc/overlay/index.html, or pass --open".dimmed()
        );
    }
    println!();
    Ok(())
}
