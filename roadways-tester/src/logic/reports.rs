use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;
use super::playability::{PlayabilityAggregate, PlayabilityRecord, steer_mode_label};

#[allow(clippy::cast_precision_loss)]
fn success_rate(results: &[ScenarioResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    (passed as f64 / results.len() as f64) * 100.0
}

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
    aggregates: &[PlayabilityAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
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

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.average_duration),
        results.iter().max_by_key(|r| r.average_duration),
    ) {
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
        writeln!(out)?;
    }

    if !aggregates.is_empty() {
        writeln!(out, "{}", "🚌 Playability Summary".bright_magenta().bold())?;
        writeln!(out, "{}", "=====================".magenta())?;
        for agg in aggregates {
            writeln!(
                out,
                "{} ({} runs): win {:.1}% | distance {:.0}±{:.0} km | minutes {:.0}±{:.0} | events {:.1} | collisions {:.1}",
                agg.scenario_name.bold(),
                agg.iterations,
                agg.win_rate * 100.0,
                agg.mean_distance_km,
                agg.std_distance_km,
                agg.mean_minutes,
                agg.std_minutes,
                agg.mean_events,
                agg.mean_collisions
            )?;
            if !agg.loss_causes.is_empty() {
                let causes = agg
                    .loss_causes
                    .iter()
                    .map(|(cause, share)| format!("{cause} {:.1}%", share * 100.0))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(out, "   Losses: {causes}")?;
            }
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(out, "# Roadways Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {}", total_tests - passed_tests)?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {} {}\n", status, result.scenario_name)?;
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

pub fn generate_csv_report<W: Write + ?Sized>(
    out: &mut W,
    records: &[PlayabilityRecord],
) -> Result<()> {
    writeln!(
        out,
        "strategy,steer_mode,seed,ending,cause,minutes,distance_km,location,satisfaction,bus_condition,fuel,events,collisions,steps"
    )?;
    for record in records {
        let m = &record.metrics;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            record.strategy,
            steer_mode_label(record.steer_mode),
            record.seed_value,
            m.ending_type,
            m.ending_cause,
            m.minutes_elapsed,
            m.distance_km,
            m.final_location,
            m.satisfaction,
            m.bus_condition,
            m.fuel,
            m.events_seen,
            m.collisions,
            m.steps
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::DrivingStrategy;
    use crate::logic::game_tester::PlayabilityMetrics;
    use roadways_game::SteerMode;
    use std::collections::BTreeMap;

    fn result(name: &str, passed: bool) -> ScenarioResult {
        ScenarioResult::from_iterations(
            name,
            2,
            if passed { 2 } else { 1 },
            if passed {
                Vec::new()
            } else {
                vec!["fuel ran dry".to_string()]
            },
            vec![Duration::from_millis(3)],
        )
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn markdown_lists_failures() {
        let text = render(|out| {
            generate_markdown_report(out, &[result("Smoke", true), result("Fuel", false)])
        });
        assert!(text.starts_with("# Roadways Logic Test Results"));
        assert!(text.contains("- **Failed**: 1"));
        assert!(text.contains("  - fuel ran dry"));
    }

    #[test]
    fn console_includes_playability() {
        let aggregate = PlayabilityAggregate {
            scenario_name: "Balanced - Collision".to_string(),
            strategy: DrivingStrategy::Balanced,
            steer_mode: SteerMode::Collision,
            iterations: 3,
            win_rate: 0.5,
            mean_distance_km: 300.0,
            std_distance_km: 10.0,
            mean_minutes: 200.0,
            std_minutes: 5.0,
            mean_events: 4.0,
            mean_collisions: 1.0,
            loss_causes: BTreeMap::from([("fuel".to_string(), 0.5)]),
        };
        let text = render(|out| {
            generate_console_report(out, &[result("Smoke", true)], &[aggregate], Duration::ZERO)
        });
        assert!(text.contains("Playability Summary"));
        assert!(text.contains("Balanced - Collision"));
        assert!(text.contains("fuel 50.0%"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let record = PlayabilityRecord {
            scenario_name: "Speedy - Dodge".to_string(),
            strategy: DrivingStrategy::Speedy,
            steer_mode: SteerMode::Dodge,
            seed_label: "9".to_string(),
            seed_value: 9,
            metrics: PlayabilityMetrics {
                ending_type: "Game Over".to_string(),
                ending_cause: "fuel".to_string(),
                final_location: "Karnal".to_string(),
                ..PlayabilityMetrics::default()
            },
        };
        let text = render(|out| generate_csv_report(out, &[record]));
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("strategy,steer_mode,seed,ending"));
        assert!(lines.next().unwrap().starts_with("Speedy,Dodge,9,Game Over,fuel"));
    }

    #[test]
    fn json_round_trips_results() {
        let text = render(|out| generate_json_report(out, &[result("Smoke", true)]));
        let parsed: Vec<ScenarioResult> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0].scenario_name, "Smoke");
    }
}
