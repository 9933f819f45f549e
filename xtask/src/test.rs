use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// One `cargo test` invocation and how much a failure matters.
struct Suite {
    label: &'static str,
    args: &'static [&'static str],
    required: bool,
}

const UNIT: Suite = Suite {
    label: "Unit tests",
    args: &["test", "--workspace", "--lib"],
    required: true,
};

const INTEGRATION: [Suite; 2] = [
    Suite {
        label: "Integration tests",
        args: &["test", "--workspace", "--tests"],
        required: true,
    },
    // DisplayConfig deserialization only exists with the serde feature.
    Suite {
        label: "fbdbi serde tests",
        args: &["test", "-p", "fbdbi", "--features", "serde", "--test", "window_update"],
        required: true,
    },
];

const DOC: Suite = Suite {
    label: "Doc tests",
    args: &["test", "--workspace", "--doc"],
    required: false,
};

fn run_suite(suite: &Suite) -> Result<()> {
    println!("{}", format!("  Running {}...", suite.label.to_lowercase()).cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(suite.args)
        .output()
        .with_context(|| format!("Failed to run {}", suite.label.to_lowercase()))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        if !suite.required {
            eprintln!("{}", format!("  ⚠ {} failed", suite.label).yellow().bold());
            println!();
            return Ok(());
        }
        eprintln!("{}", format!("  ✗ {} failed", suite.label).red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{} failed", suite.label);
    }

    println!(
        "{}",
        format!(
            "  ✓ {} passed {} in {:.2}s",
            suite.label,
            extract_test_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        run_suite(&UNIT)?;
    }
    if !unit_only {
        for suite in &INTEGRATION {
            run_suite(suite)?;
        }
    }
    if !unit_only && !integration_only {
        run_suite(&DOC)?;
    }

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

/// Totals of every "test result:" line cargo printed.
fn extract_test_summary(output: &str) -> String {
    let (mut passed, mut failed, mut ignored) = (0u32, 0u32, 0u32);
    let mut seen = false;
    for line in output.lines() {
        let Some(summary) = line.split("test result:").nth(1) else {
            continue;
        };
        seen = true;
        for part in summary.split(';') {
            let mut words = part.split_whitespace().rev();
            let (Some(kind), Some(count)) = (words.next(), words.next()) else {
                continue;
            };
            let Ok(count) = count.parse::<u32>() else {
                continue;
            };
            match kind {
                "passed" => passed = passed.saturating_add(count),
                "failed" => failed = failed.saturating_add(count),
                "ignored" => ignored = ignored.saturating_add(count),
                _ => {}
            }
        }
    }
    if !seen {
        return "(summary not available)".to_string();
    }
    format!("({passed} passed, {failed} failed, {ignored} ignored)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_adds_up_every_binary() {
        let output = "test result: ok. 5 passed; 0 failed; 1 ignored; 0 measured; 0 filtered out\n\
                      test result: ok. 3 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out";
        assert_eq!(extract_test_summary(output), "(8 passed, 0 failed, 1 ignored)");
        assert_eq!(extract_test_summary("no tests"), "(summary not available)");
    }
}
