//! Genetic operators: crossovers and mutations. All return new
//! individuals; parents/inputs are left untouched.

use std::collections::{HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::entities::{Match, Schedule};

/// Tagged variant covering every crossover and mutation, per the "closed
/// records over sum types" design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    CrossoverRoundSwap,
    CrossoverUniform,
    CrossoverSinglePoint,
    MutateSwapMatches,
    MutateSwapRounds,
    MutateShuffleRound,
    MutateReverseHomeAway,
    MutateMoveMatch,
}

const MUTATIONS: [Operator; 5] = [
    Operator::MutateSwapMatches,
    Operator::MutateSwapRounds,
    Operator::MutateShuffleRound,
    Operator::MutateReverseHomeAway,
    Operator::MutateMoveMatch,
];

fn total_rounds_of(a: &Schedule, b: &Schedule) -> u32 {
    a.total_rounds().max(b.total_rounds())
}

/// Takes `primary`'s matches whose round is in `keep_rounds` (deduped by
/// unordered matchup), then fills in whatever unordered matchups are
/// still missing from `secondary`.
fn merge_by_rounds(primary: &Schedule, secondary: &Schedule, keep_rounds: &HashSet<u32>) -> Schedule {
    let mut used: HashSet<(u32, u32)> = HashSet::new();
    let mut matches = Vec::new();

    for m in &primary.matches {
        if keep_rounds.contains(&m.round) {
            let key = m.unordered_matchup();
            if used.insert(key) {
                matches.push(*m);
            }
        }
    }
    for m in &secondary.matches {
        let key = m.unordered_matchup();
        if used.insert(key) {
            matches.push(*m);
        }
    }

    Schedule::new(matches)
}

/// Picks a random subset of rounds from parent1, fills the rest from
/// parent2, and mirrors the pairing for the second offspring.
pub fn crossover_round_swap(parent1: &Schedule, parent2: &Schedule, rng: &mut impl Rng) -> (Schedule, Schedule) {
    let total_rounds = total_rounds_of(parent1, parent2);
    let subset_size = rng.random_range(1..total_rounds.max(2));

    let mut rounds: Vec<u32> = (1..=total_rounds).collect();
    rounds.shuffle(rng);
    let keep: HashSet<u32> = rounds[..subset_size as usize].iter().copied().collect();

    (merge_by_rounds(parent1, parent2, &keep), merge_by_rounds(parent2, parent1, &keep))
}

/// For each directed matchup present in either parent, flips a coin to
/// decide which parent donates to which offspring.
pub fn crossover_uniform(parent1: &Schedule, parent2: &Schedule, rng: &mut impl Rng) -> (Schedule, Schedule) {
    let p1: HashMap<(u32, u32), Match> = parent1.matches.iter().map(|m| (m.directed_matchup(), *m)).collect();
    let p2: HashMap<(u32, u32), Match> = parent2.matches.iter().map(|m| (m.directed_matchup(), *m)).collect();

    let all_keys: HashSet<(u32, u32)> = p1.keys().chain(p2.keys()).copied().collect();

    let mut offspring1 = Vec::new();
    let mut offspring2 = Vec::new();

    for key in all_keys {
        if rng.random_bool(0.5) {
            if let Some(m) = p1.get(&key) {
                offspring1.push(*m);
            }
            if let Some(m) = p2.get(&key) {
                offspring2.push(*m);
            }
        } else {
            if let Some(m) = p2.get(&key) {
                offspring1.push(*m);
            }
            if let Some(m) = p1.get(&key) {
                offspring2.push(*m);
            }
        }
    }

    (Schedule::new(offspring1), Schedule::new(offspring2))
}

/// Cuts at a random round: offspring1 takes parent1's rounds `1..=c`,
/// offspring2 mirrors with parent2.
pub fn crossover_single_point(parent1: &Schedule, parent2: &Schedule, rng: &mut impl Rng) -> (Schedule, Schedule) {
    let total_rounds = total_rounds_of(parent1, parent2);
    let cut = rng.random_range(1..total_rounds.max(2));
    let keep: HashSet<u32> = (1..=cut).collect();

    (merge_by_rounds(parent1, parent2, &keep), merge_by_rounds(parent2, parent1, &keep))
}

pub fn mutate_swap_matches(schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    let mut mutated = schedule.clone();
    if mutated.matches.len() < 2 {
        return mutated;
    }
    let idx1 = rng.random_range(0..mutated.matches.len());
    let mut idx2 = rng.random_range(0..mutated.matches.len());
    while idx2 == idx1 {
        idx2 = rng.random_range(0..mutated.matches.len());
    }
    let r1 = mutated.matches[idx1].round;
    let r2 = mutated.matches[idx2].round;
    mutated.matches[idx1].round = r2;
    mutated.matches[idx2].round = r1;
    mutated
}

pub fn mutate_swap_rounds(schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    let mut mutated = schedule.clone();
    let total_rounds = mutated.total_rounds();
    if total_rounds < 2 {
        return mutated;
    }
    let round1 = rng.random_range(1..=total_rounds);
    let mut round2 = rng.random_range(1..=total_rounds);
    while round2 == round1 {
        round2 = rng.random_range(1..=total_rounds);
    }
    for m in mutated.matches.iter_mut() {
        if m.round == round1 {
            m.round = round2;
        } else if m.round == round2 {
            m.round = round1;
        }
    }
    mutated
}

/// Transfers a single match's round with a match from another round —
/// this is the only form that has any effect (a no-op shuffle has no
/// observable meaning for a round-keyed schedule).
pub fn mutate_shuffle_round(schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    let mut mutated = schedule.clone();
    let total_rounds = mutated.total_rounds();
    if total_rounds < 2 {
        return mutated;
    }
    let round_a = rng.random_range(1..=total_rounds);
    let mut round_b = rng.random_range(1..=total_rounds);
    while round_b == round_a {
        round_b = rng.random_range(1..=total_rounds);
    }

    let idx_a = mutated.matches.iter().enumerate().filter(|(_, m)| m.round == round_a).map(|(i, _)| i).collect::<Vec<_>>();
    let idx_b = mutated.matches.iter().enumerate().filter(|(_, m)| m.round == round_b).map(|(i, _)| i).collect::<Vec<_>>();

    if let (Some(&i), Some(&j)) = (idx_a.choose(rng), idx_b.choose(rng)) {
        mutated.matches[i].round = round_b;
        mutated.matches[j].round = round_a;
    }
    mutated
}

pub fn mutate_reverse_home_away(schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    let mut mutated = schedule.clone();
    if mutated.matches.is_empty() {
        return mutated;
    }
    let idx = rng.random_range(0..mutated.matches.len());
    let m = mutated.matches[idx];
    let mirror_idx = mutated.matches.iter().position(|other| other.home_team_id == m.away_team_id && other.away_team_id == m.home_team_id);

    if let Some(j) = mirror_idx {
        let r1 = mutated.matches[idx].round;
        let r2 = mutated.matches[j].round;
        mutated.matches[idx].round = r2;
        mutated.matches[j].round = r1;
    }
    mutated
}

pub fn mutate_move_match(schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    let mut mutated = schedule.clone();
    if mutated.matches.is_empty() {
        return mutated;
    }
    let total_rounds = mutated.total_rounds().max(1);
    let idx = rng.random_range(0..mutated.matches.len());
    mutated.matches[idx].round = rng.random_range(1..=total_rounds);
    mutated
}

fn apply_operator(op: Operator, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
    match op {
        Operator::MutateSwapMatches => mutate_swap_matches(schedule, rng),
        Operator::MutateSwapRounds => mutate_swap_rounds(schedule, rng),
        Operator::MutateShuffleRound => mutate_shuffle_round(schedule, rng),
        Operator::MutateReverseHomeAway => mutate_reverse_home_away(schedule, rng),
        Operator::MutateMoveMatch => mutate_move_match(schedule, rng),
        Operator::CrossoverRoundSwap | Operator::CrossoverUniform | Operator::CrossoverSinglePoint => {
            unreachable!("apply_mutation only dispatches mutation operators")
        }
    }
}

/// With probability `mutation_prob`, picks one mutation uniformly and
/// applies it once; otherwise returns a clone of `schedule` unchanged.
pub fn apply_mutation(schedule: &Schedule, mutation_prob: f64, rng: &mut impl Rng) -> Schedule {
    if !rng.random_bool(mutation_prob) {
        return schedule.clone();
    }
    let op = *MUTATIONS.choose(rng).expect("MUTATIONS is non-empty");
    apply_operator(op, schedule, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Team;
    use crate::seeders::seed_round_robin;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demo_teams(n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|id| Team { id, name: format!("Team {id}"), short_name: format!("T{id}"), city: format!("City {id}"), home_stadium_id: id })
            .collect()
    }

    fn directed_set(s: &Schedule) -> HashSet<(u32, u32)> {
        s.matches.iter().map(|m| m.directed_matchup()).collect()
    }

    #[test]
    fn round_reassignment_mutations_preserve_directed_matchups() {
        let teams = demo_teams(8);
        let schedule = seed_round_robin(&teams);
        let mut rng = StdRng::seed_from_u64(11);

        let before = directed_set(&schedule);
        for op in [Operator::MutateSwapMatches, Operator::MutateSwapRounds, Operator::MutateShuffleRound, Operator::MutateReverseHomeAway, Operator::MutateMoveMatch] {
            let mutated = apply_operator(op, &schedule, &mut rng);
            assert_eq!(directed_set(&mutated), before, "{op:?} changed the matchup set");
        }
    }

    #[test]
    fn crossovers_never_duplicate_a_directed_matchup_in_one_offspring() {
        let teams = demo_teams(8);
        let p1 = seed_round_robin(&teams);
        let mut p2 = seed_round_robin(&teams);
        p2.matches.reverse();
        let mut rng = StdRng::seed_from_u64(3);

        for (o1, o2) in [
            crossover_round_swap(&p1, &p2, &mut rng),
            crossover_uniform(&p1, &p2, &mut rng),
            crossover_single_point(&p1, &p2, &mut rng),
        ] {
            for offspring in [&o1, &o2] {
                let mut seen = HashSet::new();
                for m in &offspring.matches {
                    assert!(seen.insert(m.directed_matchup()), "duplicate directed matchup in offspring");
                }
            }
        }
    }

    #[test]
    fn mutation_probability_zero_is_a_no_op() {
        let teams = demo_teams(8);
        let schedule = seed_round_robin(&teams);
        let mut rng = StdRng::seed_from_u64(5);
        let mutated = apply_mutation(&schedule, 0.0, &mut rng);
        assert_eq!(mutated.matches, schedule.matches);
    }
}
