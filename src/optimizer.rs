//! The evolutionary loop: generational replacement with tournament
//! selection, elitism, periodic local search, and early stopping.

use std::collections::{HashMap, HashSet};

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::GaConfig;
use crate::entities::{Schedule, Stadium, Team};
use crate::evaluator::{evaluate, ConstraintReport, EvaluationContext};
use crate::operators::{apply_mutation, crossover_round_swap, mutate_swap_matches};
use crate::repair::Repairer;
use crate::seeders::seed_population;

/// One candidate schedule plus its evaluated fitness. `Population` owns a
/// `Vec<Individual>` exclusively; cloning copies the match vector by value.
#[derive(Debug, Clone)]
pub struct Individual {
    pub schedule: Schedule,
    pub fitness: f64,
}

pub type Population = Vec<Individual>;

/// Five parallel per-generation series, one entry appended per generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub best_fitness: Vec<f64>,
    pub avg_fitness: Vec<f64>,
    pub worst_fitness: Vec<f64>,
    pub diversity: Vec<f64>,
    pub valid_count: Vec<usize>,
}

/// Input collaborators the driver needs across its whole run. Owned, not
/// borrowed, because the optimizer must outlive any one `optimize()` call's
/// caller-supplied references.
pub struct LeagueInputs {
    pub teams: Vec<Team>,
    /// Carried for downstream consumers only; `shared_stadiums` is derived
    /// straight from `teams`' `home_stadium_id`, not from these records.
    pub stadiums: Vec<Stadium>,
    pub distances: HashMap<(String, String), f64>,
    pub derby_pairs: HashSet<(u32, u32)>,
    /// Opaque `YYYY-MM-DD` strings, never parsed by the core.
    pub special_dates: Vec<String>,
}

pub struct GaOptimizer {
    config: GaConfig,
    inputs: LeagueInputs,
    shared_stadiums: HashMap<u32, HashSet<u32>>,
    rng: StdRng,
    pub history: History,
    pub best_ever: Option<Individual>,
}

impl GaOptimizer {
    pub fn new(inputs: LeagueInputs, config: GaConfig) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        let shared_stadiums = crate::entities::shared_stadiums(&inputs.teams);
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self { config, inputs, shared_stadiums, rng, history: History::default(), best_ever: None })
    }

    fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            teams: &self.inputs.teams,
            shared_stadiums: &self.shared_stadiums,
            distances: &self.inputs.distances,
            region_assignment: &self.config.region_assignment,
            derby_pairs: &self.inputs.derby_pairs,
            soft_weights: &self.config.soft_weights,
            penalty_weights: &self.config.penalty_weights,
        }
    }

    fn evaluate_schedule(&self, schedule: Schedule) -> Individual {
        let report = evaluate(&schedule, &self.context());
        Individual { schedule, fitness: report.fitness }
    }

    fn evaluate_population(&self, population: Vec<Schedule>) -> Population {
        if self.config.parallel_evaluation {
            return population
                .into_par_iter()
                .map(|schedule| {
                    let report = evaluate(&schedule, &self.context());
                    Individual { schedule, fitness: report.fitness }
                })
                .collect();
        }
        population.into_iter().map(|s| self.evaluate_schedule(s)).collect()
    }

    fn initial_population(&mut self) -> Population {
        let shares = (
            self.config.init_strategies.random,
            self.config.init_strategies.round_robin,
            self.config.init_strategies.balanced,
            self.config.init_strategies.stadium_aware,
        );
        let schedules = seed_population(self.config.population_size, shares, &self.inputs.teams, &self.shared_stadiums, &mut self.rng);
        self.evaluate_population(schedules)
    }

    fn tournament_select<'p>(&mut self, population: &'p Population) -> &'p Individual {
        let mut best: Option<&Individual> = None;
        for _ in 0..self.config.tournament_size {
            let candidate = &population[self.rng.random_range(0..population.len())];
            if best.map(|b| candidate.fitness > b.fitness).unwrap_or(true) {
                best = Some(candidate);
            }
        }
        best.expect("tournament_size is validated to be >= 2")
    }

    fn select_generation(&mut self, population: &Population) -> Vec<Schedule> {
        (0..population.len()).map(|_| self.tournament_select(population).schedule.clone()).collect()
    }

    fn crossover_pass(&mut self, mut offspring: Vec<Schedule>) -> Vec<Schedule> {
        let mut i = 0;
        while i + 1 < offspring.len() {
            if self.rng.random_bool(self.config.crossover_prob) {
                let (child1, child2) = crossover_round_swap(&offspring[i], &offspring[i + 1], &mut self.rng);
                offspring[i] = child1;
                offspring[i + 1] = child2;
            }
            i += 2;
        }
        offspring
    }

    fn mutation_pass(&mut self, offspring: Vec<Schedule>) -> Vec<Schedule> {
        offspring.into_iter().map(|s| apply_mutation(&s, self.config.mutation_prob, &mut self.rng)).collect()
    }

    fn repair_pass(&mut self, offspring: Vec<Schedule>) -> Vec<Schedule> {
        if !self.config.use_repair {
            return offspring;
        }
        let repairer = Repairer::new(&self.inputs.teams, &self.shared_stadiums);
        offspring.into_iter().map(|s| repairer.quick_repair(&s, &mut self.rng)).collect()
    }

    fn apply_elitism(&self, population: &Population, mut offspring: Population) -> Population {
        if self.config.n_elites == 0 {
            return offspring;
        }
        let mut sorted_parents = population.clone();
        sorted_parents.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());
        let elites = &sorted_parents[..self.config.n_elites];

        offspring.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap());
        for (slot, elite) in offspring.iter_mut().zip(elites.iter()) {
            *slot = elite.clone();
        }
        offspring
    }

    fn update_history(&mut self, population: &Population) {
        let fitnesses: Vec<f64> = population.iter().map(|i| i.fitness).collect();
        let best = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let worst = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        let avg = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;

        let mean = avg;
        let variance = fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / fitnesses.len() as f64;
        let diversity = ((variance.sqrt() / 50.0) * 100.0).clamp(0.0, 100.0);

        let valid_count = population
            .iter()
            .filter(|i| evaluate(&i.schedule, &self.context()).is_valid)
            .count();

        self.history.best_fitness.push(best);
        self.history.avg_fitness.push(avg);
        self.history.worst_fitness.push(worst);
        self.history.diversity.push(diversity);
        self.history.valid_count.push(valid_count);
    }

    fn local_search_one(&mut self, individual: &Individual) -> Individual {
        let mut current = individual.clone();
        for _ in 0..10 {
            let neighbour_schedule = mutate_swap_matches(&current.schedule, &mut self.rng);
            let neighbour = self.evaluate_schedule(neighbour_schedule);
            if neighbour.fitness > current.fitness {
                current = neighbour;
            }
        }
        current
    }

    fn apply_local_search(&mut self, mut population: Population) -> Population {
        let n_improve = (population.len() / 10).max(1);

        let mut by_fitness_desc: Vec<usize> = (0..population.len()).collect();
        by_fitness_desc.sort_by(|&a, &b| population[b].fitness.partial_cmp(&population[a].fitness).unwrap());
        let best_indices = &by_fitness_desc[..n_improve.min(population.len())];

        let improved: Vec<Individual> = best_indices.iter().map(|&i| self.local_search_one(&population[i])).collect();

        let mut by_fitness_asc: Vec<usize> = (0..population.len()).collect();
        by_fitness_asc.sort_by(|&a, &b| population[a].fitness.partial_cmp(&population[b].fitness).unwrap());
        let worst_indices = &by_fitness_asc[..improved.len().min(population.len())];

        for (&idx, imp) in worst_indices.iter().zip(improved.into_iter()) {
            population[idx] = imp;
        }
        population
    }

    /// Runs the generational loop to `n_generations` or until early
    /// stopping fires, and returns the best-ever individual.
    pub fn optimize(&mut self) -> Individual {
        info!("starting GA optimization: population={}, generations={}", self.config.population_size, self.config.n_generations);

        let mut population = self.initial_population();

        let progress = ProgressBar::new(self.config.n_generations as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template(" [{elapsed_precise}] {bar:40.green/white} gen {pos}/{len} | best={msg}")
                .progress_chars("%>="),
        );

        let mut last_best = f64::NEG_INFINITY;
        let mut stall = 0usize;

        for gen in 1..=self.config.n_generations {
            let selected = self.select_generation(&population);
            let crossed = self.crossover_pass(selected);
            let mutated = self.mutation_pass(crossed);
            let repaired = self.repair_pass(mutated);
            let offspring = self.evaluate_population(repaired);

            let mut next_population = self.apply_elitism(&population, offspring);

            if self.config.use_local_search && gen % self.config.local_search_frequency == 0 {
                info!("applying local search at generation {gen}");
                next_population = self.apply_local_search(next_population);
            }

            population = next_population;
            self.update_history(&population);
            self.track_best(&population);

            let current_best = *self.history.best_fitness.last().unwrap();
            progress.set_message(&format!("{current_best:.2}"));
            progress.set_position(gen as u64);

            if self.config.early_stopping {
                let improvement = current_best - last_best;
                if improvement < self.config.early_stopping_min_improvement {
                    stall += 1;
                } else {
                    stall = 0;
                }
                last_best = current_best;

                if stall >= self.config.early_stopping_patience {
                    info!("early stopping at generation {gen} after {stall} stalled generations");
                    break;
                }
            }
        }

        progress.finish_with_message("done");
        self.best_ever.clone().expect("best_ever is always set after the initial population is tracked")
    }

    fn track_best(&mut self, population: &Population) {
        let current_best = population.iter().max_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap());
        if let Some(candidate) = current_best {
            let improves = self.best_ever.as_ref().map(|b| candidate.fitness > b.fitness).unwrap_or(true);
            if improves {
                self.best_ever = Some(candidate.clone());
            }
        }
    }

    /// Re-evaluates the best-ever individual and returns its full report.
    pub fn best_report(&self) -> Option<ConstraintReport> {
        self.best_ever.as_ref().map(|ind| evaluate(&ind.schedule, &self.context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SurfaceKind;

    fn demo_league(n: usize) -> LeagueInputs {
        let teams: Vec<Team> = (1..=n as u32)
            .map(|id| Team { id, name: format!("Team {id}"), short_name: format!("T{id}"), city: format!("City {id}"), home_stadium_id: id })
            .collect();
        let stadiums = teams
            .iter()
            .map(|t| Stadium { id: t.home_stadium_id, name: format!("Arena {}", t.id), city: t.city.clone(), capacity: 20_000, has_lighting: true, surface: SurfaceKind::Natural })
            .collect();
        LeagueInputs { teams, stadiums, distances: HashMap::new(), derby_pairs: HashSet::new(), special_dates: Vec::new() }
    }

    #[test]
    fn s1_round_robin_seed_alone_is_structurally_sound() {
        let inputs = demo_league(14);
        let schedule = crate::seeders::seed_round_robin(&inputs.teams);
        let shared = crate::entities::shared_stadiums(&inputs.teams);
        let region_assignment = HashMap::new();
        let ctx = EvaluationContext {
            teams: &inputs.teams,
            shared_stadiums: &shared,
            distances: &inputs.distances,
            region_assignment: &region_assignment,
            derby_pairs: &inputs.derby_pairs,
            soft_weights: &crate::config::SoftWeights::default(),
            penalty_weights: &crate::config::PenaltyWeights::default(),
        };
        let report = evaluate(&schedule, &ctx);
        assert!(report.is_valid);
        assert!(report.weighted_soft >= 0.0 && report.weighted_soft <= 100.0);
    }

    #[test]
    fn s6_history_length_matches_generations_and_best_is_monotonic() {
        let inputs = demo_league(8);
        let config = GaConfig { population_size: 20, n_generations: 10, early_stopping: false, random_seed: Some(42), ..GaConfig::quick_test() };
        let mut optimizer = GaOptimizer::new(inputs, config).unwrap();
        optimizer.optimize();

        assert_eq!(optimizer.history.best_fitness.len(), 10);
        for window in optimizer.history.best_fitness.windows(2) {
            assert!(window[1] >= window[0] - 1e-9, "best-ever tracked fitness should be non-decreasing generation to generation in this driver's own history of maxima so far");
        }
        for &count in &optimizer.history.valid_count {
            assert!(count <= 20);
        }
    }

    #[test]
    fn determinism_with_fixed_seed() {
        let config = GaConfig { population_size: 20, n_generations: 5, random_seed: Some(99), early_stopping: false, ..GaConfig::quick_test() };
        let mut opt1 = GaOptimizer::new(demo_league(8), config.clone()).unwrap();
        let best1 = opt1.optimize();

        let mut opt2 = GaOptimizer::new(demo_league(8), config).unwrap();
        let best2 = opt2.optimize();

        assert_eq!(best1.fitness, best2.fitness);
    }
}
