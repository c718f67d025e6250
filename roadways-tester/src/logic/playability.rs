use anyhow::{Context, Result};
use roadways_game::SteerMode;
use std::collections::BTreeMap;

use crate::common::scenario::full_trip::strategy_plan;
use crate::logic::game_tester::PlayabilityMetrics;
use crate::logic::seeds::SeedInfo;
use crate::logic::{DrivingStrategy, GameTester, SimulationPlan};

#[derive(Debug, Clone)]
pub struct PlayabilityRecord {
    pub scenario_name: String,
    pub strategy: DrivingStrategy,
    pub steer_mode: SteerMode,
    pub seed_label: String,
    pub seed_value: u64,
    pub metrics: PlayabilityMetrics,
}

#[derive(Debug, Clone)]
pub struct PlayabilityAggregate {
    pub scenario_name: String,
    pub strategy: DrivingStrategy,
    pub steer_mode: SteerMode,
    pub iterations: usize,
    pub win_rate: f64,
    pub mean_distance_km: f64,
    pub std_distance_km: f64,
    pub mean_minutes: f64,
    pub std_minutes: f64,
    pub mean_events: f64,
    pub mean_collisions: f64,
    /// Share of runs lost to each cause, keyed by cause label.
    pub loss_causes: BTreeMap<String, f64>,
}

const PLAYABILITY_SCENARIOS: &[(DrivingStrategy, SteerMode)] = &[
    (DrivingStrategy::Cautious, SteerMode::Collision),
    (DrivingStrategy::Speedy, SteerMode::Collision),
    (DrivingStrategy::Balanced, SteerMode::Collision),
    (DrivingStrategy::MonteCarlo, SteerMode::Collision),
    (DrivingStrategy::Balanced, SteerMode::Dodge),
    (DrivingStrategy::MonteCarlo, SteerMode::Dodge),
];

pub fn run_playability_analysis(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
) -> Result<Vec<PlayabilityRecord>> {
    run_playability_analysis_with(tester, seeds, iterations, |strategy, steer_mode| {
        strategy_plan(strategy).with_steer_mode(steer_mode)
    })
}

fn run_playability_analysis_with<F>(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
    mut plan_builder: F,
) -> Result<Vec<PlayabilityRecord>>
where
    F: FnMut(DrivingStrategy, SteerMode) -> SimulationPlan,
{
    let iterations = iterations.max(1);
    let mut records = Vec::with_capacity(seeds.len() * PLAYABILITY_SCENARIOS.len() * iterations);

    for &(strategy, steer_mode) in PLAYABILITY_SCENARIOS {
        for seed in seeds {
            for iteration in 0..iterations {
                let iteration_offset = u64::try_from(iteration).unwrap_or(0);
                let iteration_seed = seed.seed.wrapping_add(iteration_offset);
                let plan = plan_builder(strategy, steer_mode);
                let summary = tester.run_plan(&plan, iteration_seed);
                let context = format!(
                    "Playability expectation failed for strategy {strategy}, steer {}, seed {} (iteration {})",
                    steer_mode_label(steer_mode),
                    seed.display(),
                    iteration + 1
                );
                for expectation in &plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .with_context(|| context.clone())?;
                }

                records.push(PlayabilityRecord {
                    scenario_name: format!("{strategy} - {}", steer_mode_label(steer_mode)),
                    strategy,
                    steer_mode,
                    seed_label: seed.display(),
                    seed_value: iteration_seed,
                    metrics: summary.metrics,
                });
            }
        }
    }

    log::info!("playability | {} records", records.len());
    Ok(records)
}

pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut aggregates: BTreeMap<String, AggregateBuilder> = BTreeMap::new();
    for record in records {
        aggregates
            .entry(record.scenario_name.clone())
            .or_insert_with(|| AggregateBuilder::new(record))
            .ingest(&record.metrics);
    }
    aggregates
        .into_values()
        .map(AggregateBuilder::finish)
        .collect()
}

#[must_use]
pub const fn steer_mode_label(mode: SteerMode) -> &'static str {
    match mode {
        SteerMode::Collision => "Collision",
        SteerMode::Dodge => "Dodge",
    }
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    scenario_name: String,
    strategy: DrivingStrategy,
    steer_mode: SteerMode,
    iterations: u32,
    wins: u32,
    stats_distance: RunningStats,
    stats_minutes: RunningStats,
    events_sum: u32,
    collisions_sum: u32,
    losses: BTreeMap<String, u32>,
}

impl AggregateBuilder {
    fn new(record: &PlayabilityRecord) -> Self {
        Self {
            scenario_name: record.scenario_name.clone(),
            strategy: record.strategy,
            steer_mode: record.steer_mode,
            iterations: 0,
            wins: 0,
            stats_distance: RunningStats::default(),
            stats_minutes: RunningStats::default(),
            events_sum: 0,
            collisions_sum: 0,
            losses: BTreeMap::new(),
        }
    }

    fn ingest(&mut self, metrics: &PlayabilityMetrics) {
        self.iterations += 1;
        if metrics.won {
            self.wins += 1;
        } else if metrics.ending_type == "Game Over" {
            *self.losses.entry(metrics.ending_cause.clone()).or_default() += 1;
        }
        self.stats_distance.add(f64::from(metrics.distance_km));
        self.stats_minutes.add(f64::from(metrics.minutes_elapsed));
        self.events_sum = self.events_sum.saturating_add(metrics.events_seen);
        self.collisions_sum = self.collisions_sum.saturating_add(metrics.collisions);
    }

    fn finish(self) -> PlayabilityAggregate {
        let denom = f64::from(self.iterations.max(1));
        PlayabilityAggregate {
            scenario_name: self.scenario_name,
            strategy: self.strategy,
            steer_mode: self.steer_mode,
            iterations: usize::try_from(self.iterations).unwrap_or(usize::MAX),
            win_rate: f64::from(self.wins) / denom,
            mean_distance_km: self.stats_distance.mean(),
            std_distance_km: self.stats_distance.std_dev(),
            mean_minutes: self.stats_minutes.mean(),
            std_minutes: self.stats_minutes.std_dev(),
            mean_events: f64::from(self.events_sum) / denom,
            mean_collisions: f64::from(self.collisions_sum) / denom,
            loss_causes: self
                .losses
                .into_iter()
                .map(|(cause, count)| (cause, f64::from(count) / denom))
                .collect(),
        }
    }
}

/// Welford accumulator.
#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / f64::from(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::TesterAssets;
    use std::sync::Arc;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    fn record(name: &str, won: bool, cause: &str, distance: i32) -> PlayabilityRecord {
        let metrics = PlayabilityMetrics {
            won,
            ending_type: if won { "Victory" } else { "Game Over" }.to_string(),
            ending_cause: cause.to_string(),
            distance_km: distance,
            minutes_elapsed: 100,
            events_seen: 2,
            ..PlayabilityMetrics::default()
        };
        PlayabilityRecord {
            scenario_name: name.to_string(),
            strategy: DrivingStrategy::Balanced,
            steer_mode: SteerMode::Collision,
            seed_label: "1".to_string(),
            seed_value: 1,
            metrics,
        }
    }

    #[test]
    fn generates_records_for_each_scenario() {
        let seeds = vec![SeedInfo::from_numeric(1337)];
        let records = run_playability_analysis(&tester(), &seeds, 1).unwrap();
        assert_eq!(records.len(), PLAYABILITY_SCENARIOS.len());
        assert!(records.iter().all(|r| r.metrics.ending_type != "Unfinished"));
    }

    #[test]
    fn iterations_offset_the_seed() {
        let seeds = vec![SeedInfo::from_numeric(10)];
        let records = run_playability_analysis(&tester(), &seeds, 2).unwrap();
        assert_eq!(records.len(), PLAYABILITY_SCENARIOS.len() * 2);
        assert_eq!(records[0].seed_value, 10);
        assert_eq!(records[1].seed_value, 11);
    }

    #[test]
    fn aggregates_rates_and_spread() {
        let records = vec![
            record("A", true, "None", 530),
            record("A", false, "fuel", 190),
            record("A", false, "fuel", 150),
            record("A", false, "overtime", 270),
        ];
        let aggregates = aggregate_playability(&records);
        assert_eq!(aggregates.len(), 1);
        let agg = &aggregates[0];
        assert_eq!(agg.iterations, 4);
        assert!((agg.win_rate - 0.25).abs() < 1e-9);
        assert!((agg.loss_causes["fuel"] - 0.5).abs() < 1e-9);
        assert!((agg.loss_causes["overtime"] - 0.25).abs() < 1e-9);
        assert!((agg.mean_distance_km - 285.0).abs() < 1e-9);
        assert!(agg.std_distance_km > 0.0);
        assert!((agg.mean_events - 2.0).abs() < 1e-9);
    }

    #[test]
    fn running_stats_handles_single_sample() {
        let mut stats = RunningStats::default();
        assert!(stats.mean().abs() < f64::EPSILON);
        stats.add(4.0);
        assert!((stats.mean() - 4.0).abs() < f64::EPSILON);
        assert!(stats.std_dev().abs() < f64::EPSILON);
    }
}
