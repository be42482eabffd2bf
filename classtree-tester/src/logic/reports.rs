use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use classtree_game::Catalog;

use super::ScenarioResult;

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    // Overall stats
    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(passed_tests, total_tests))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    // Individual results
    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }

    Ok(())
}

/// Shape of one built catalog: node counts, histograms and shortfalls.
pub fn generate_catalog_summary(out: &mut dyn Write, seed: u64, catalog: &Catalog) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🌳 Catalog Summary".bright_green().bold())?;
    writeln!(out, "{}", "==================".green())?;
    writeln!(
        out,
        "Seed {seed}: {} nodes, {} rules, {} iterations",
        catalog.generated_classes.len(),
        catalog.unlock_rules.len(),
        catalog.report.stats.iterations
    )?;

    for (base, count) in catalog.per_base_counts() {
        writeln!(
            out,
            "   {base:10} {count:4} nodes, common path {}/10",
            catalog.common_path(base).len()
        )?;
    }

    let depths = catalog
        .depth_histogram()
        .iter()
        .enumerate()
        .map(|(idx, count)| format!("{}:{count}", idx + 1))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "   Depths:   {depths}")?;

    let rarities = catalog
        .rarity_histogram()
        .iter()
        .map(|(tier, count)| format!("{tier}:{count}"))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "   Rarities: {rarities}")?;

    let stats = &catalog.report.stats;
    writeln!(
        out,
        "   Discarded: {} (duplicate ids {}, duplicate parents {}, invariant rejections {})",
        stats.discarded(),
        stats.duplicate_ids,
        stats.duplicate_parents,
        stats.invariant_rejections
    )?;

    if catalog.report.is_complete() {
        writeln!(out, "   Construction: {}", "complete".green())?;
    } else {
        writeln!(out, "   Construction: {}", "incomplete".yellow())?;
        for (base, shortfall) in catalog.report.shortfalls() {
            writeln!(out, "     • {base}: {shortfall:?}")?;
        }
    }

    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Class Tree Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(
        out,
        "- **Success rate**: {:.1}%\n",
        success_rate(passed_tests, total_tests)
    )?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (passed as f64 / total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::build_catalog;

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Tree Invariants".to_string(),
            seed: 7,
            passed,
            iterations_run: 3,
            successful_iterations: if passed { 3 } else { 2 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["Iteration 3 (seed 9, target 250): broken".to_string()]
            },
            average_duration: Duration::from_millis(4),
            performance_data: vec![Duration::from_millis(4)],
        }
    }

    fn render(f: impl FnOnce(&mut dyn Write) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_report_lists_failures() {
        let results = [sample_result(true), sample_result(false)];
        let text = render(|out| generate_console_report(out, &results, Duration::from_secs(1)));
        assert!(text.contains("Logic Test Results Summary"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("broken"));
        assert!(text.contains("Performance Summary"));
    }

    #[test]
    fn markdown_report_has_sections() {
        let text = render(|out| generate_markdown_report(out, &[sample_result(false)]));
        assert!(text.starts_with("# Class Tree Logic Test Results"));
        assert!(text.contains("- **Failed**: 1"));
        assert!(text.contains("### ❌ Tree Invariants (seed 7)"));
    }

    #[test]
    fn json_report_is_an_array() {
        let text = render(|out| generate_json_report(out, &[sample_result(true)]));
        let parsed: Vec<ScenarioResult> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].seed, 7);
    }

    #[test]
    fn catalog_summary_covers_every_base() {
        let catalog = build_catalog(3, 50).unwrap();
        let text = render(|out| generate_catalog_summary(out, 3, &catalog));
        assert!(text.contains("Catalog Summary"));
        for key in ["warrior", "priest", "mage", "thief", "wanderer"] {
            assert!(text.contains(key), "{key} missing");
        }
        assert!(text.contains("Depths:   1:"));
    }
}
