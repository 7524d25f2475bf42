//! Population initialization strategies.
//!
//! Every seeder returns a sequence of exactly `N*(N-1)` matches with
//! `stadium = home team's home stadium`, possibly violating the
//! one-match-per-round / all-matchups invariants — repair fixes those up
//! downstream.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::entities::{Match, Schedule, Team};

fn all_possible_matches(teams: &[Team]) -> Vec<Match> {
    let mut matches = Vec::with_capacity(teams.len() * (teams.len() - 1));
    let mut id = 1;
    for pair in teams.iter().permutations(2) {
        let (home, away) = (pair[0], pair[1]);
        matches.push(Match {
            id,
            home_team_id: home.id,
            away_team_id: away.id,
            stadium_id: home.home_stadium_id,
            round: 0,
        });
        id += 1;
    }
    matches
}

/// Shuffle all directed matchups and greedily drop them into rounds,
/// skipping any match whose team is already booked that round. Matches
/// that never fit are dropped; repair reintroduces them.
pub fn seed_random(teams: &[Team], rng: &mut impl Rng) -> Schedule {
    let n = teams.len();
    let matches_per_round = n / 2;

    let mut pool = all_possible_matches(teams);
    pool.shuffle(rng);

    let mut matches = Vec::new();
    let mut round = 1u32;
    let mut teams_in_round: HashSet<u32> = HashSet::new();
    let mut count_in_round = 0usize;

    for mut m in pool {
        if teams_in_round.contains(&m.home_team_id) || teams_in_round.contains(&m.away_team_id) {
            continue;
        }
        m.round = round;
        teams_in_round.insert(m.home_team_id);
        teams_in_round.insert(m.away_team_id);
        matches.push(m);
        count_in_round += 1;
        if count_in_round == matches_per_round {
            round += 1;
            teams_in_round.clear();
            count_in_round = 0;
        }
    }

    Schedule::new(matches)
}

/// Circle-method construction: fixes team 0, rotates the rest. Feasible
/// by construction for even N.
pub fn seed_round_robin(teams: &[Team]) -> Schedule {
    let n = teams.len();
    let mut positions: Vec<usize> = (0..n).collect();
    let mut matches = Vec::with_capacity(n * (n - 1));
    let mut id = 1u32;

    for round_idx in 0..(n - 1) {
        let round_number = (round_idx + 1) as u32;
        for i in 0..(n / 2) {
            let left = positions[i];
            let right = positions[n - 1 - i];
            let (home_idx, away_idx) = if round_idx % 2 == 0 { (left, right) } else { (right, left) };
            let home = &teams[home_idx];
            let away = &teams[away_idx];
            matches.push(Match {
                id,
                home_team_id: home.id,
                away_team_id: away.id,
                stadium_id: home.home_stadium_id,
                round: round_number,
            });
            id += 1;
        }
        if n > 2 {
            positions[1..].rotate_right(1);
        }
    }

    let first_leg_len = matches.len();
    let second_leg_offset = (n - 1) as u32;
    for i in 0..first_leg_len {
        let original = matches[i];
        let away_team = teams.iter().find(|t| t.id == original.away_team_id).expect("match references unknown team");
        matches.push(Match {
            id,
            home_team_id: original.away_team_id,
            away_team_id: original.home_team_id,
            stadium_id: away_team.home_stadium_id,
            round: original.round + second_leg_offset,
        });
        id += 1;
    }

    Schedule::new(matches)
}

/// Partitions each team's fixtures into home/away queues and alternates
/// which half of the league gets home priority each round.
pub fn seed_balanced(teams: &[Team], rng: &mut impl Rng) -> Schedule {
    let n = teams.len();
    let total_rounds = 2 * (n as u32 - 1);
    let matches_per_round = n / 2;

    let all = all_possible_matches(teams);
    let mut home_queues: HashMap<u32, Vec<Match>> = teams.iter().map(|t| (t.id, Vec::new())).collect();
    let mut away_queues: HashMap<u32, Vec<Match>> = teams.iter().map(|t| (t.id, Vec::new())).collect();
    for m in all {
        home_queues.get_mut(&m.home_team_id).unwrap().push(m);
        away_queues.get_mut(&m.away_team_id).unwrap().push(m);
    }
    for q in home_queues.values_mut() {
        q.shuffle(rng);
    }
    for q in away_queues.values_mut() {
        q.shuffle(rng);
    }

    let mut matches = Vec::new();
    let mut id = 1u32;

    for round in 1..=total_rounds {
        let mut available_teams: Vec<u32> = teams.iter().map(|t| t.id).collect();
        available_teams.shuffle(rng);
        let home_priority: HashSet<u32> = available_teams[..matches_per_round].iter().copied().collect();

        let mut teams_in_round: HashSet<u32> = HashSet::new();

        for team_id in &available_teams {
            if teams_in_round.contains(team_id) {
                continue;
            }
            let candidate = if home_priority.contains(team_id) && !home_queues[team_id].is_empty() {
                home_queues.get_mut(team_id).unwrap().pop()
            } else if !away_queues[team_id].is_empty() {
                away_queues.get_mut(team_id).unwrap().pop()
            } else if !home_queues[team_id].is_empty() {
                home_queues.get_mut(team_id).unwrap().pop()
            } else {
                None
            };

            let Some(m) = candidate else { continue };
            let opponent = if m.home_team_id == *team_id { m.away_team_id } else { m.home_team_id };
            if teams_in_round.contains(&opponent) {
                continue;
            }

            teams_in_round.insert(m.home_team_id);
            teams_in_round.insert(m.away_team_id);
            matches.push(Match { id, round, ..m });
            id += 1;
        }
    }

    Schedule::new(matches)
}

/// Shuffles all matches, then greedily fills each round avoiding team
/// clashes and shared-stadium clashes.
pub fn seed_stadium_aware(teams: &[Team], shared_stadiums: &HashMap<u32, HashSet<u32>>, rng: &mut impl Rng) -> Schedule {
    let n = teams.len();
    let total_rounds = 2 * (n as u32 - 1);
    let matches_per_round = n / 2;

    let mut remaining = all_possible_matches(teams);
    remaining.shuffle(rng);

    let mut matches = Vec::new();
    let mut id = 1u32;

    for round in 1..=total_rounds {
        let mut teams_in_round: HashSet<u32> = HashSet::new();
        let mut stadiums_in_round: HashSet<u32> = HashSet::new();
        let mut round_count = 0usize;
        let mut i = 0usize;

        while i < remaining.len() && round_count < matches_per_round {
            let m = remaining[i];
            let team_conflict = teams_in_round.contains(&m.home_team_id) || teams_in_round.contains(&m.away_team_id);
            let stadium_conflict = shared_stadiums.contains_key(&m.stadium_id) && stadiums_in_round.contains(&m.stadium_id);

            if team_conflict || stadium_conflict {
                i += 1;
                continue;
            }

            teams_in_round.insert(m.home_team_id);
            teams_in_round.insert(m.away_team_id);
            stadiums_in_round.insert(m.stadium_id);
            matches.push(Match { id, round, ..m });
            id += 1;
            round_count += 1;
            remaining.remove(i);
        }
    }

    Schedule::new(matches)
}

/// Mixes the four strategies according to configured shares. Integer
/// counts floor to the share; stadium-aware (the last strategy) absorbs
/// whatever remainder the floors leave behind.
pub fn seed_population(
    population_size: usize,
    shares: (f64, f64, f64, f64),
    teams: &[Team],
    shared_stadiums: &HashMap<u32, HashSet<u32>>,
    rng: &mut impl Rng,
) -> Vec<Schedule> {
    let (random_share, round_robin_share, balanced_share, _stadium_aware_share) = shares;

    let n_random = (population_size as f64 * random_share) as usize;
    let n_round_robin = (population_size as f64 * round_robin_share) as usize;
    let n_balanced = (population_size as f64 * balanced_share) as usize;
    let n_stadium_aware = population_size - n_random - n_round_robin - n_balanced;

    let mut population = Vec::with_capacity(population_size);
    for _ in 0..n_random {
        population.push(seed_random(teams, rng));
    }
    for _ in 0..n_round_robin {
        population.push(seed_round_robin(teams));
    }
    for _ in 0..n_balanced {
        population.push(seed_balanced(teams, rng));
    }
    for _ in 0..n_stadium_aware {
        population.push(seed_stadium_aware(teams, shared_stadiums, rng));
    }
    population
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demo_teams(n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|id| Team {
                id,
                name: format!("Team {id}"),
                short_name: format!("T{id}"),
                city: format!("City {id}"),
                home_stadium_id: id,
            })
            .collect()
    }

    #[test]
    fn round_robin_seeder_is_structurally_complete() {
        let teams = demo_teams(14);
        let schedule = seed_round_robin(&teams);

        assert_eq!(schedule.matches.len(), 14 * 13);

        for a in &teams {
            for b in &teams {
                if a.id == b.id {
                    continue;
                }
                let count = schedule.matches.iter().filter(|m| m.home_team_id == a.id && m.away_team_id == b.id).count();
                assert_eq!(count, 1, "missing or duplicated directed matchup ({}, {})", a.id, b.id);
            }
        }

        for round in 1..=26u32 {
            let in_round = schedule.matches_in_round(round);
            assert_eq!(in_round.len(), 7);
            let mut teams_seen = HashSet::new();
            for m in in_round {
                assert!(teams_seen.insert(m.home_team_id));
                assert!(teams_seen.insert(m.away_team_id));
            }
        }

        for m in &schedule.matches {
            let home = teams.iter().find(|t| t.id == m.home_team_id).unwrap();
            assert_eq!(m.stadium_id, home.home_stadium_id);
        }
    }

    #[test]
    fn mixing_policy_produces_exact_population_size() {
        let teams = demo_teams(14);
        let shared = HashMap::new();
        let mut rng = StdRng::seed_from_u64(7);
        let population = seed_population(50, (0.4, 0.2, 0.2, 0.2), &teams, &shared, &mut rng);
        assert_eq!(population.len(), 50);
    }

    #[test]
    fn all_seeders_only_use_home_teams_stadium() {
        let teams = demo_teams(8);
        let shared = HashMap::new();
        let mut rng = StdRng::seed_from_u64(1);
        for schedule in [seed_random(&teams, &mut rng), seed_balanced(&teams, &mut rng), seed_stadium_aware(&teams, &shared, &mut rng)] {
            for m in &schedule.matches {
                let home = teams.iter().find(|t| t.id == m.home_team_id).unwrap();
                assert_eq!(m.stadium_id, home.home_stadium_id);
            }
        }
    }
}
