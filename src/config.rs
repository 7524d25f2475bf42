//! Typed GA configuration, eager validation, and presets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share of the initial population produced by each seeding strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitStrategies {
    pub random: f64,
    pub round_robin: f64,
    pub balanced: f64,
    pub stadium_aware: f64,
}

impl Default for InitStrategies {
    fn default() -> Self {
        Self { random: 0.40, round_robin: 0.20, balanced: 0.20, stadium_aware: 0.20 }
    }
}

impl InitStrategies {
    fn sum(&self) -> f64 {
        self.random + self.round_robin + self.balanced + self.stadium_aware
    }
}

/// Weights for the five soft constraints, summing to 1 (within tolerance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftWeights {
    pub home_away_balance: f64,
    pub travel_distance: f64,
    pub competitive_balance: f64,
    pub rest_days_fairness: f64,
    pub derby_distribution: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            home_away_balance: 0.25,
            travel_distance: 0.30,
            competitive_balance: 0.20,
            rest_days_fairness: 0.15,
            derby_distribution: 0.10,
        }
    }
}

impl SoftWeights {
    fn sum(&self) -> f64 {
        self.home_away_balance
            + self.travel_distance
            + self.competitive_balance
            + self.rest_days_fairness
            + self.derby_distribution
    }
}

/// Penalty weights applied to each hard-constraint violation count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub all_matchups: f64,
    pub no_consecutive: f64,
    pub one_match_per_round: f64,
    pub stadium_conflict: f64,
    pub correct_stadium: f64,
    pub total_matches: f64,
    pub matches_per_round: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            all_matchups: 1000.0,
            no_consecutive: 500.0,
            one_match_per_round: 1000.0,
            stadium_conflict: 800.0,
            correct_stadium: 500.0,
            total_matches: 1000.0,
            matches_per_round: 1000.0,
        }
    }
}

impl PenaltyWeights {
    fn all_non_negative(&self) -> bool {
        self.all_matchups >= 0.0
            && self.no_consecutive >= 0.0
            && self.one_match_per_round >= 0.0
            && self.stadium_conflict >= 0.0
            && self.correct_stadium >= 0.0
            && self.total_matches >= 0.0
            && self.matches_per_round >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    pub population_size: usize,
    pub n_generations: usize,
    pub crossover_prob: f64,
    pub mutation_prob: f64,
    pub tournament_size: usize,
    pub n_elites: usize,
    pub init_strategies: InitStrategies,
    pub soft_weights: SoftWeights,
    pub penalty_weights: PenaltyWeights,
    pub use_repair: bool,
    pub max_repair_iterations: usize,
    pub early_stopping: bool,
    pub early_stopping_patience: usize,
    pub early_stopping_min_improvement: f64,
    pub use_local_search: bool,
    pub local_search_frequency: usize,
    pub random_seed: Option<u64>,
    /// Evaluate the population with `rayon` instead of serially. Off by
    /// default: the documented determinism guarantee only holds for serial
    /// evaluation.
    pub parallel_evaluation: bool,
    /// City -> region classification for `competitive_balance`. Caller
    /// supplied, never hard-coded.
    pub region_assignment: HashMap<String, crate::entities::Region>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            n_generations: 1000,
            crossover_prob: 0.8,
            mutation_prob: 0.2,
            tournament_size: 3,
            n_elites: 2,
            init_strategies: InitStrategies::default(),
            soft_weights: SoftWeights::default(),
            penalty_weights: PenaltyWeights::default(),
            use_repair: true,
            max_repair_iterations: 50,
            early_stopping: true,
            early_stopping_patience: 100,
            early_stopping_min_improvement: 0.01,
            use_local_search: false,
            local_search_frequency: 50,
            random_seed: None,
            parallel_evaluation: false,
            region_assignment: HashMap::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population_size must be >= 10, got {0}")]
    PopulationTooSmall(usize),
    #[error("n_generations must be >= 1, got {0}")]
    NoGenerations(usize),
    #[error("crossover_prob must be in [0,1], got {0}")]
    CrossoverProbOutOfRange(f64),
    #[error("mutation_prob must be in [0,1], got {0}")]
    MutationProbOutOfRange(f64),
    #[error("tournament_size must be in [2, population_size], got {tournament_size} with population {population_size}")]
    TournamentSizeOutOfRange { tournament_size: usize, population_size: usize },
    #[error("n_elites must be in [0, population_size), got {n_elites} with population {population_size}")]
    TooManyElites { n_elites: usize, population_size: usize },
    #[error("init_strategies shares must sum to 1 (±0.01), got {0}")]
    InitStrategiesDontSumToOne(f64),
    #[error("soft_weights must sum to 1 (±0.01), got {0}")]
    SoftWeightsDontSumToOne(f64),
    #[error("penalty_weights must all be non-negative")]
    NegativePenaltyWeight,
    #[error("max_repair_iterations must be >= 1, got {0}")]
    NoRepairIterations(usize),
    #[error("early_stopping_patience must be >= 1, got {0}")]
    NoPatience(usize),
    #[error("early_stopping_min_improvement must be >= 0, got {0}")]
    NegativeMinImprovement(f64),
    #[error("local_search_frequency must be >= 1, got {0}")]
    NoLocalSearchFrequency(usize),
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 10 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.n_generations < 1 {
            return Err(ConfigError::NoGenerations(self.n_generations));
        }
        if !(0.0..=1.0).contains(&self.crossover_prob) {
            return Err(ConfigError::CrossoverProbOutOfRange(self.crossover_prob));
        }
        if !(0.0..=1.0).contains(&self.mutation_prob) {
            return Err(ConfigError::MutationProbOutOfRange(self.mutation_prob));
        }
        if self.tournament_size < 2 || self.tournament_size > self.population_size {
            return Err(ConfigError::TournamentSizeOutOfRange {
                tournament_size: self.tournament_size,
                population_size: self.population_size,
            });
        }
        if self.n_elites >= self.population_size {
            return Err(ConfigError::TooManyElites {
                n_elites: self.n_elites,
                population_size: self.population_size,
            });
        }
        let init_sum = self.init_strategies.sum();
        if (init_sum - 1.0).abs() > 0.01 {
            return Err(ConfigError::InitStrategiesDontSumToOne(init_sum));
        }
        let soft_sum = self.soft_weights.sum();
        if (soft_sum - 1.0).abs() > 0.01 {
            return Err(ConfigError::SoftWeightsDontSumToOne(soft_sum));
        }
        if !self.penalty_weights.all_non_negative() {
            return Err(ConfigError::NegativePenaltyWeight);
        }
        if self.max_repair_iterations < 1 {
            return Err(ConfigError::NoRepairIterations(self.max_repair_iterations));
        }
        if self.early_stopping_patience < 1 {
            return Err(ConfigError::NoPatience(self.early_stopping_patience));
        }
        if self.early_stopping_min_improvement < 0.0 {
            return Err(ConfigError::NegativeMinImprovement(self.early_stopping_min_improvement));
        }
        if self.local_search_frequency < 1 {
            return Err(ConfigError::NoLocalSearchFrequency(self.local_search_frequency));
        }
        Ok(())
    }

    /// Small population, few generations, short patience. For fast local runs.
    pub fn quick_test() -> Self {
        Self {
            population_size: 50,
            n_generations: 100,
            early_stopping_patience: 20,
            ..Default::default()
        }
    }

    /// Large population, many generations, local search enabled. For a
    /// serious optimization run.
    pub fn production() -> Self {
        Self {
            population_size: 300,
            n_generations: 2000,
            crossover_prob: 0.85,
            mutation_prob: 0.15,
            tournament_size: 5,
            n_elites: 5,
            use_local_search: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GaConfig::default().validate().unwrap();
    }

    #[test]
    fn quick_test_and_production_presets_are_valid() {
        GaConfig::quick_test().validate().unwrap();
        GaConfig::production().validate().unwrap();
    }

    #[test]
    fn rejects_tiny_population() {
        let cfg = GaConfig { population_size: 5, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::PopulationTooSmall(5)));
    }

    #[test]
    fn rejects_tournament_larger_than_population() {
        let cfg = GaConfig { population_size: 10, tournament_size: 11, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::TournamentSizeOutOfRange { .. })));
    }

    #[test]
    fn rejects_elites_at_population_size() {
        let cfg = GaConfig { population_size: 10, n_elites: 10, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::TooManyElites { .. })));
    }

    #[test]
    fn rejects_skewed_soft_weights() {
        let cfg = GaConfig {
            soft_weights: SoftWeights { home_away_balance: 0.9, ..SoftWeights::default() },
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::SoftWeightsDontSumToOne(_))));
    }
}
