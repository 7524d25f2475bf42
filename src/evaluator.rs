//! Hard/soft constraint evaluation and fitness scalarization.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::{PenaltyWeights, SoftWeights};
use crate::entities::{Match, Region, Schedule, Team};

/// The seven hard-constraint violation counts, in the order the core
/// always reports them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HardViolations {
    pub all_matchups: u32,
    pub no_consecutive: u32,
    pub one_match_per_round: u32,
    pub stadium_conflict: u32,
    pub correct_stadium: u32,
    pub total_matches: u32,
    pub matches_per_round: u32,
}

impl HardViolations {
    pub fn total(&self) -> u32 {
        self.all_matchups
            + self.no_consecutive
            + self.one_match_per_round
            + self.stadium_conflict
            + self.correct_stadium
            + self.total_matches
            + self.matches_per_round
    }

    pub fn is_valid(&self) -> bool {
        self.total() == 0
    }
}

/// The five soft-constraint scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftScores {
    pub home_away_balance: f64,
    pub travel_distance: f64,
    pub competitive_balance: f64,
    pub rest_days_fairness: f64,
    pub derby_distribution: f64,
}

impl SoftScores {
    pub fn weighted(&self, weights: &SoftWeights) -> f64 {
        let total_weight = weights.home_away_balance
            + weights.travel_distance
            + weights.competitive_balance
            + weights.rest_days_fairness
            + weights.derby_distribution;
        if total_weight <= 0.0 {
            return 0.0;
        }
        let total = self.home_away_balance * weights.home_away_balance
            + self.travel_distance * weights.travel_distance
            + self.competitive_balance * weights.competitive_balance
            + self.rest_days_fairness * weights.rest_days_fairness
            + self.derby_distribution * weights.derby_distribution;
        total / total_weight
    }
}

/// Full evaluation result for a schedule: per-constraint verdicts/counts,
/// soft scores, and the scalar fitness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub is_valid: bool,
    pub hard: HardViolations,
    pub soft: SoftScores,
    pub weighted_soft: f64,
    pub fitness: f64,
}

/// Groups a schedule's matches by round number once, for reuse across the
/// per-round checks below.
fn matches_by_round(schedule: &Schedule) -> HashMap<u32, Vec<&Match>> {
    let mut rounds: HashMap<u32, Vec<&Match>> = HashMap::new();
    for m in &schedule.matches {
        rounds.entry(m.round).or_default().push(m);
    }
    rounds
}

fn count_all_matchups(schedule: &Schedule, teams: &[Team]) -> u32 {
    let mut counts: HashMap<(u32, u32), i64> = HashMap::new();
    for m in &schedule.matches {
        *counts.entry(m.directed_matchup()).or_insert(0) += 1;
    }
    let mut violations: i64 = 0;
    for a in teams {
        for b in teams {
            if a.id == b.id {
                continue;
            }
            let count = *counts.get(&(a.id, b.id)).unwrap_or(&0);
            violations += (count - 1).abs();
        }
    }
    violations as u32
}

fn count_no_consecutive(schedule: &Schedule, total_rounds: u32) -> u32 {
    let rounds = matches_by_round(schedule);
    let mut violations = 0u32;
    for r in 1..total_rounds {
        let current: HashSet<(u32, u32)> = rounds
            .get(&r)
            .map(|ms| ms.iter().map(|m| m.unordered_matchup()).collect())
            .unwrap_or_default();
        if current.is_empty() {
            continue;
        }
        if let Some(next) = rounds.get(&(r + 1)) {
            for m in next {
                if current.contains(&m.unordered_matchup()) {
                    violations += 1;
                }
            }
        }
    }
    violations
}

fn count_one_match_per_round(schedule: &Schedule, teams: &[Team]) -> u32 {
    let rounds = matches_by_round(schedule);
    let mut violations = 0i64;
    for matches in rounds.values() {
        let mut appearances: HashMap<u32, i64> = HashMap::new();
        for team in teams {
            appearances.insert(team.id, 0);
        }
        for m in matches {
            *appearances.entry(m.home_team_id).or_insert(0) += 1;
            *appearances.entry(m.away_team_id).or_insert(0) += 1;
        }
        for count in appearances.values() {
            violations += (count - 1).abs();
        }
    }
    violations as u32
}

fn count_stadium_conflict(schedule: &Schedule, shared_stadiums: &HashMap<u32, HashSet<u32>>) -> u32 {
    if shared_stadiums.is_empty() {
        return 0;
    }
    let rounds = matches_by_round(schedule);
    let mut violations = 0i64;
    for matches in rounds.values() {
        let mut home_uses: HashMap<u32, i64> = HashMap::new();
        for m in matches {
            *home_uses.entry(m.stadium_id).or_insert(0) += 1;
        }
        for (stadium_id, uses) in home_uses {
            if shared_stadiums.contains_key(&stadium_id) {
                violations += (uses - 1).max(0);
            }
        }
    }
    violations as u32
}

fn count_correct_stadium(schedule: &Schedule, teams_by_id: &HashMap<u32, &Team>) -> u32 {
    schedule
        .matches
        .iter()
        .filter(|m| teams_by_id[&m.home_team_id].home_stadium_id != m.stadium_id)
        .count() as u32
}

fn count_total_matches(schedule: &Schedule, n_teams: usize) -> u32 {
    let expected = (n_teams * (n_teams - 1)) as i64;
    (schedule.matches.len() as i64 - expected).unsigned_abs() as u32
}

fn count_matches_per_round(schedule: &Schedule, n_teams: usize, total_rounds: u32) -> u32 {
    let expected = (n_teams / 2) as i64;
    let rounds = matches_by_round(schedule);
    let mut violations = 0i64;
    for r in 1..=total_rounds {
        let actual = rounds.get(&r).map(|ms| ms.len()).unwrap_or(0) as i64;
        violations += (actual - expected).abs();
    }
    violations as u32
}

pub fn evaluate_hard_constraints(
    schedule: &Schedule,
    teams: &[Team],
    shared_stadiums: &HashMap<u32, HashSet<u32>>,
) -> HardViolations {
    let n_teams = teams.len();
    let total_rounds = 2 * (n_teams as u32 - 1);
    let teams_by_id: HashMap<u32, &Team> = teams.iter().map(|t| (t.id, t)).collect();

    HardViolations {
        all_matchups: count_all_matchups(schedule, teams),
        no_consecutive: count_no_consecutive(schedule, total_rounds),
        one_match_per_round: count_one_match_per_round(schedule, teams),
        stadium_conflict: count_stadium_conflict(schedule, shared_stadiums),
        correct_stadium: count_correct_stadium(schedule, &teams_by_id),
        total_matches: count_total_matches(schedule, n_teams),
        matches_per_round: count_matches_per_round(schedule, n_teams, total_rounds),
    }
}

fn home_away_balance(schedule: &Schedule, teams: &[Team]) -> f64 {
    let mut penalty = 0.0;
    for team in teams {
        let mut matches = schedule.matches_involving_team(team.id);
        matches.sort_by_key(|m| m.round);

        let (mut consecutive_home, mut consecutive_away) = (0u32, 0u32);
        let (mut max_home, mut max_away) = (0u32, 0u32);
        for m in matches {
            if m.home_team_id == team.id {
                consecutive_home += 1;
                consecutive_away = 0;
                max_home = max_home.max(consecutive_home);
            } else {
                consecutive_away += 1;
                consecutive_home = 0;
                max_away = max_away.max(consecutive_away);
            }
        }
        if max_home > 3 {
            penalty += (max_home - 3) as f64 * 5.0;
        }
        if max_away > 3 {
            penalty += (max_away - 3) as f64 * 5.0;
        }
    }
    (100.0 - penalty).max(0.0)
}

fn travel_distance(
    schedule: &Schedule,
    teams: &[Team],
    teams_by_id: &HashMap<u32, &Team>,
    distances: &HashMap<(String, String), f64>,
) -> f64 {
    let n = teams.len() as f64;
    let expected = 2.0 * 500.0 * n * (n - 1.0);

    let mut total = 0.0;
    for team in teams {
        for m in schedule.away_matches_of(team.id) {
            let home_team = teams_by_id[&m.home_team_id];
            let dist = distances.get(&(team.city.clone(), home_team.city.clone())).copied().unwrap_or(0.0);
            total += dist * 2.0;
        }
    }

    if total <= expected {
        100.0
    } else {
        (100.0 - 50.0 * (total - expected) / expected).max(0.0)
    }
}

fn region_of(region_assignment: &HashMap<String, Region>, city: &str) -> Region {
    region_assignment.get(city).copied().unwrap_or(Region::Unknown)
}

fn competitive_balance(
    schedule: &Schedule,
    teams: &[Team],
    teams_by_id: &HashMap<u32, &Team>,
    region_assignment: &HashMap<String, Region>,
) -> f64 {
    let mut penalty = 0.0;
    for team in teams {
        let mut matches = schedule.matches_involving_team(team.id);
        matches.sort_by_key(|m| m.round);

        if matches.len() < 3 {
            continue;
        }
        for window in matches.windows(3) {
            let regions: HashSet<Region> = window
                .iter()
                .map(|m| {
                    let opponent_id = if m.home_team_id == team.id { m.away_team_id } else { m.home_team_id };
                    let opponent_city = teams_by_id[&opponent_id].city.as_str();
                    region_of(region_assignment, opponent_city)
                })
                .collect();
            if regions.len() == 1 {
                penalty += 5.0;
            }
        }
    }
    (100.0 - penalty).max(0.0)
}

fn rest_days_fairness(schedule: &Schedule, teams: &[Team]) -> f64 {
    let mut penalty = 0.0;
    for team in teams {
        let mut rounds: Vec<u32> = schedule.matches_involving_team(team.id).iter().map(|m| m.round).collect();
        rounds.sort_unstable();
        for pair in rounds.windows(2) {
            if pair[1] - pair[0] > 1 {
                penalty += 5.0;
            }
        }
    }
    (100.0 - penalty).max(0.0)
}

fn derby_distribution(schedule: &Schedule, derby_pairs: &HashSet<(u32, u32)>) -> f64 {
    if derby_pairs.is_empty() {
        return 100.0;
    }
    let mut rounds: Vec<u32> = schedule
        .matches
        .iter()
        .filter(|m| derby_pairs.contains(&m.unordered_matchup()))
        .map(|m| m.round)
        .collect();
    if rounds.is_empty() {
        return 100.0;
    }
    rounds.sort_unstable();

    let mut score = 100.0;
    for pair in rounds.windows(2) {
        if pair[1] - pair[0] < 3 {
            score -= 10.0;
        }
    }
    score.max(0.0)
}

pub fn evaluate_soft_constraints(
    schedule: &Schedule,
    teams: &[Team],
    distances: &HashMap<(String, String), f64>,
    region_assignment: &HashMap<String, Region>,
    derby_pairs: &HashSet<(u32, u32)>,
) -> SoftScores {
    let teams_by_id: HashMap<u32, &Team> = teams.iter().map(|t| (t.id, t)).collect();
    SoftScores {
        home_away_balance: home_away_balance(schedule, teams),
        travel_distance: travel_distance(schedule, teams, &teams_by_id, distances),
        competitive_balance: competitive_balance(schedule, teams, &teams_by_id, region_assignment),
        rest_days_fairness: rest_days_fairness(schedule, teams),
        derby_distribution: derby_distribution(schedule, derby_pairs),
    }
}

fn penalty_total(hard: &HardViolations, weights: &PenaltyWeights) -> f64 {
    hard.all_matchups as f64 * weights.all_matchups
        + hard.no_consecutive as f64 * weights.no_consecutive
        + hard.one_match_per_round as f64 * weights.one_match_per_round
        + hard.stadium_conflict as f64 * weights.stadium_conflict
        + hard.correct_stadium as f64 * weights.correct_stadium
        + hard.total_matches as f64 * weights.total_matches
        + hard.matches_per_round as f64 * weights.matches_per_round
}

/// Collaborators the evaluator needs on every call. Bundled so the GA
/// driver and tests can pass them around as one value instead of five.
pub struct EvaluationContext<'a> {
    pub teams: &'a [Team],
    pub shared_stadiums: &'a HashMap<u32, HashSet<u32>>,
    pub distances: &'a HashMap<(String, String), f64>,
    pub region_assignment: &'a HashMap<String, Region>,
    pub derby_pairs: &'a HashSet<(u32, u32)>,
    pub soft_weights: &'a SoftWeights,
    pub penalty_weights: &'a PenaltyWeights,
}

/// Evaluates a schedule fully and returns the report. Pure and
/// deterministic given its inputs (P6).
pub fn evaluate(schedule: &Schedule, ctx: &EvaluationContext) -> ConstraintReport {
    let hard = evaluate_hard_constraints(schedule, ctx.teams, ctx.shared_stadiums);
    let soft = evaluate_soft_constraints(schedule, ctx.teams, ctx.distances, ctx.region_assignment, ctx.derby_pairs);
    let weighted_soft = soft.weighted(ctx.soft_weights);
    let fitness = weighted_soft - penalty_total(&hard, ctx.penalty_weights);

    ConstraintReport { is_valid: hard.is_valid(), hard, soft, weighted_soft, fitness }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SurfaceKind;

    fn team(id: u32, city: &str, stadium_id: u32) -> Team {
        Team { id, name: format!("Team {id}"), short_name: format!("T{id}"), city: city.to_string(), home_stadium_id: stadium_id }
    }

    #[test]
    fn hard_all_zero_iff_valid() {
        let teams = vec![team(1, "A", 1), team(2, "B", 2), team(3, "C", 3), team(4, "D", 4)];
        let matches = vec![
            Match { id: 1, home_team_id: 1, away_team_id: 2, stadium_id: 1, round: 1 },
            Match { id: 2, home_team_id: 3, away_team_id: 4, stadium_id: 3, round: 1 },
        ];
        let schedule = Schedule::new(matches);
        let shared = HashMap::new();
        let hard = evaluate_hard_constraints(&schedule, &teams, &shared);
        assert!(!hard.is_valid());
        assert_eq!(hard.total_matches, (4 * 3) - 2);
    }

    #[test]
    fn fitness_is_deterministic() {
        let teams = vec![team(1, "A", 1), team(2, "B", 2)];
        let matches = vec![
            Match { id: 1, home_team_id: 1, away_team_id: 2, stadium_id: 1, round: 1 },
            Match { id: 2, home_team_id: 2, away_team_id: 1, stadium_id: 2, round: 2 },
        ];
        let schedule = Schedule::new(matches);
        let shared = HashMap::new();
        let distances = HashMap::new();
        let regions = HashMap::new();
        let derbies = HashSet::new();
        let soft_weights = SoftWeights::default();
        let penalty_weights = PenaltyWeights::default();
        let ctx = EvaluationContext {
            teams: &teams,
            shared_stadiums: &shared,
            distances: &distances,
            region_assignment: &regions,
            derby_pairs: &derbies,
            soft_weights: &soft_weights,
            penalty_weights: &penalty_weights,
        };
        let r1 = evaluate(&schedule, &ctx);
        let r2 = evaluate(&schedule, &ctx);
        assert_eq!(r1.fitness, r2.fitness);
    }

    #[test]
    fn derby_distribution_scores_s4_example() {
        let pairs: HashSet<(u32, u32)> = [(1, 2), (1, 3), (2, 3)].into_iter().collect();
        let matches = vec![
            Match { id: 1, home_team_id: 1, away_team_id: 2, stadium_id: 1, round: 5 },
            Match { id: 2, home_team_id: 1, away_team_id: 3, stadium_id: 1, round: 7 },
            Match { id: 3, home_team_id: 2, away_team_id: 3, stadium_id: 2, round: 20 },
        ];
        let schedule = Schedule::new(matches);
        assert_eq!(derby_distribution(&schedule, &pairs), 90.0);
    }

    #[test]
    fn no_derby_pairs_scores_100() {
        let schedule = Schedule::new(vec![]);
        assert_eq!(derby_distribution(&schedule, &HashSet::new()), 100.0);
    }
}
