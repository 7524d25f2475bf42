//! Phase-ordered feasibility repair. Each phase makes one kind of
//! violation monotonically better; later phases may reintroduce earlier
//! violations, which is fine — selection pressure finishes the job.

use std::collections::{HashMap, HashSet};

use log::warn;
use rand::Rng;

use crate::entities::{Match, Schedule, Team};

pub struct Repairer<'a> {
    pub teams: &'a [Team],
    pub shared_stadiums: &'a HashMap<u32, HashSet<u32>>,
}

impl<'a> Repairer<'a> {
    pub fn new(teams: &'a [Team], shared_stadiums: &'a HashMap<u32, HashSet<u32>>) -> Self {
        Self { teams, shared_stadiums }
    }

    fn n_teams(&self) -> usize {
        self.teams.len()
    }

    fn total_rounds(&self) -> u32 {
        2 * (self.n_teams() as u32 - 1)
    }

    /// Runs all four phases in order, each up to `max_iterations` passes.
    pub fn repair(&self, schedule: &Schedule, max_iterations: usize, rng: &mut impl Rng) -> Schedule {
        let mut repaired = self.ensure_all_matchups(schedule, rng);

        for _ in 0..max_iterations {
            if self.check_one_match_per_round(&repaired) {
                break;
            }
            repaired = self.fix_one_match_per_round(&repaired, rng);
        }
        if !self.check_one_match_per_round(&repaired) {
            warn!("one_match_per_round repair exhausted its iteration budget");
        }

        for _ in 0..max_iterations {
            if self.check_no_consecutive_opponents(&repaired) {
                break;
            }
            repaired = self.fix_consecutive_opponents(&repaired, rng);
        }
        if !self.check_no_consecutive_opponents(&repaired) {
            warn!("no_consecutive_opponents repair exhausted its iteration budget");
        }

        for _ in 0..max_iterations {
            if self.check_stadium_conflicts(&repaired) {
                break;
            }
            repaired = self.fix_stadium_conflicts(&repaired, rng);
        }
        if !self.check_stadium_conflicts(&repaired) {
            warn!("stadium_conflict repair exhausted its iteration budget");
        }

        repaired
    }

    /// Runs only Phase 2 (one_match_per_round) for a cheap mid-generation pass.
    pub fn quick_repair(&self, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
        self.fix_one_match_per_round(schedule, rng)
    }

    fn ensure_all_matchups(&self, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
        let mut counts: HashMap<(u32, u32), u32> = HashMap::new();
        for m in &schedule.matches {
            *counts.entry(m.directed_matchup()).or_insert(0) += 1;
        }

        let mut matches = schedule.matches.clone();
        let mut next_id = matches.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let total_rounds = self.total_rounds();

        for a in self.teams {
            for b in self.teams {
                if a.id == b.id {
                    continue;
                }
                if *counts.get(&(a.id, b.id)).unwrap_or(&0) == 0 {
                    matches.push(Match {
                        id: next_id,
                        home_team_id: a.id,
                        away_team_id: b.id,
                        stadium_id: a.home_stadium_id,
                        round: rng.random_range(1..=total_rounds),
                    });
                    next_id += 1;
                }
            }
        }

        Schedule::new(matches)
    }

    fn check_one_match_per_round(&self, schedule: &Schedule) -> bool {
        let total_rounds = self.total_rounds();
        for round in 1..=total_rounds {
            let mut seen = HashSet::new();
            for m in schedule.matches_in_round(round) {
                if !seen.insert(m.home_team_id) || !seen.insert(m.away_team_id) {
                    return false;
                }
            }
        }
        true
    }

    fn find_available_round(&self, schedule: &Schedule, m: &Match, rng: &mut impl Rng) -> u32 {
        let total_rounds = self.total_rounds();
        for round in 1..=total_rounds {
            let occupied: HashSet<u32> = schedule
                .matches_in_round(round)
                .iter()
                .flat_map(|other| [other.home_team_id, other.away_team_id])
                .collect();
            if !occupied.contains(&m.home_team_id) && !occupied.contains(&m.away_team_id) {
                return round;
            }
        }
        rng.random_range(1..=total_rounds)
    }

    fn fix_one_match_per_round(&self, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
        let mut repaired = schedule.clone();
        let total_rounds = self.total_rounds();

        for round in 1..=total_rounds {
            let mut appearances: HashMap<u32, u32> = HashMap::new();
            for m in repaired.matches_in_round(round) {
                *appearances.entry(m.home_team_id).or_insert(0) += 1;
                *appearances.entry(m.away_team_id).or_insert(0) += 1;
            }
            let violating: HashSet<u32> = appearances.into_iter().filter(|(_, count)| *count > 1).map(|(team, _)| team).collect();
            if violating.is_empty() {
                continue;
            }

            if let Some(idx) = repaired.matches.iter().position(|m| m.round == round && (violating.contains(&m.home_team_id) || violating.contains(&m.away_team_id))) {
                let target = self.find_available_round(&repaired, &repaired.matches[idx], rng);
                repaired.matches[idx].round = target;
            }
        }

        repaired
    }

    fn check_no_consecutive_opponents(&self, schedule: &Schedule) -> bool {
        let total_rounds = self.total_rounds();
        for round in 1..total_rounds {
            let current: HashSet<(u32, u32)> = schedule.matches_in_round(round).iter().map(|m| m.unordered_matchup()).collect();
            for m in schedule.matches_in_round(round + 1) {
                if current.contains(&m.unordered_matchup()) {
                    return false;
                }
            }
        }
        true
    }

    fn fix_consecutive_opponents(&self, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
        let mut repaired = schedule.clone();
        let total_rounds = self.total_rounds();

        for round in 1..total_rounds {
            let current: HashSet<(u32, u32)> = repaired.matches_in_round(round).iter().map(|m| m.unordered_matchup()).collect();
            let next_indices: Vec<usize> = repaired
                .matches
                .iter()
                .enumerate()
                .filter(|(_, m)| m.round == round + 1)
                .map(|(i, _)| i)
                .collect();

            for idx in next_indices {
                let matchup = repaired.matches[idx].unordered_matchup();
                if !current.contains(&matchup) {
                    continue;
                }
                let candidates: Vec<u32> = ((round + 2)..=total_rounds).collect();
                let new_round = if candidates.is_empty() {
                    rng.random_range(1..=total_rounds)
                } else {
                    candidates[rng.random_range(0..candidates.len())]
                };
                repaired.matches[idx].round = new_round;
            }
        }

        repaired
    }

    fn check_stadium_conflicts(&self, schedule: &Schedule) -> bool {
        if self.shared_stadiums.is_empty() {
            return true;
        }
        let total_rounds = self.total_rounds();
        for round in 1..=total_rounds {
            let mut home_uses: HashMap<u32, u32> = HashMap::new();
            for m in schedule.matches_in_round(round) {
                *home_uses.entry(m.stadium_id).or_insert(0) += 1;
            }
            for (stadium_id, uses) in home_uses {
                if self.shared_stadiums.contains_key(&stadium_id) && uses > 1 {
                    return false;
                }
            }
        }
        true
    }

    fn find_round_without_stadium_conflict(&self, schedule: &Schedule, m: &Match, rng: &mut impl Rng) -> u32 {
        let total_rounds = self.total_rounds();
        for round in 1..=total_rounds {
            let round_matches = schedule.matches_in_round(round);
            let stadium_used = round_matches.iter().any(|other| other.stadium_id == m.stadium_id);
            let occupied: HashSet<u32> = round_matches.iter().flat_map(|other| [other.home_team_id, other.away_team_id]).collect();
            if !stadium_used && !occupied.contains(&m.home_team_id) && !occupied.contains(&m.away_team_id) {
                return round;
            }
        }
        rng.random_range(1..=total_rounds)
    }

    fn fix_stadium_conflicts(&self, schedule: &Schedule, rng: &mut impl Rng) -> Schedule {
        let mut repaired = schedule.clone();
        let total_rounds = self.total_rounds();

        for round in 1..=total_rounds {
            let mut by_stadium: HashMap<u32, Vec<usize>> = HashMap::new();
            for (i, m) in repaired.matches.iter().enumerate() {
                if m.round == round {
                    by_stadium.entry(m.stadium_id).or_default().push(i);
                }
            }
            for (stadium_id, indices) in by_stadium {
                if !self.shared_stadiums.contains_key(&stadium_id) || indices.len() <= 1 {
                    continue;
                }
                for &idx in &indices[1..] {
                    let m = repaired.matches[idx];
                    let target = self.find_round_without_stadium_conflict(&repaired, &m, rng);
                    repaired.matches[idx].round = target;
                }
            }
        }

        repaired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demo_teams(n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|id| Team { id, name: format!("Team {id}"), short_name: format!("T{id}"), city: format!("City {id}"), home_stadium_id: id })
            .collect()
    }

    #[test]
    fn ensure_all_matchups_fills_every_missing_directed_pair() {
        let teams = demo_teams(6);
        let shared = HashMap::new();
        let repairer = Repairer::new(&teams, &shared);
        let mut rng = StdRng::seed_from_u64(1);

        let schedule = Schedule::new(vec![]);
        let repaired = repairer.repair(&schedule, 10, &mut rng);

        assert_eq!(repaired.matches.len(), 6 * 5);
        for a in &teams {
            for b in &teams {
                if a.id == b.id {
                    continue;
                }
                assert_eq!(repaired.matches.iter().filter(|m| m.home_team_id == a.id && m.away_team_id == b.id).count(), 1);
            }
        }
    }

    #[test]
    fn repair_reduces_one_match_per_round_violations() {
        let teams = demo_teams(4);
        let shared = HashMap::new();
        let repairer = Repairer::new(&teams, &shared);
        let mut rng = StdRng::seed_from_u64(2);

        let matches = vec![
            Match { id: 1, home_team_id: 1, away_team_id: 2, stadium_id: 1, round: 1 },
            Match { id: 2, home_team_id: 1, away_team_id: 3, stadium_id: 1, round: 1 },
            Match { id: 3, home_team_id: 2, away_team_id: 4, stadium_id: 2, round: 2 },
            Match { id: 4, home_team_id: 3, away_team_id: 4, stadium_id: 3, round: 2 },
        ];
        let schedule = Schedule::new(matches);
        assert!(!repairer.check_one_match_per_round(&schedule));

        let fixed = repairer.fix_one_match_per_round(&schedule, &mut rng);
        let violations_before: usize = (1..=repairer.total_rounds())
            .map(|r| {
                let mut seen = HashSet::new();
                schedule.matches_in_round(r).iter().filter(|m| !seen.insert(m.home_team_id) || !seen.insert(m.away_team_id)).count()
            })
            .sum();
        let violations_after: usize = (1..=repairer.total_rounds())
            .map(|r| {
                let mut seen = HashSet::new();
                fixed.matches_in_round(r).iter().filter(|m| !seen.insert(m.home_team_id) || !seen.insert(m.away_team_id)).count()
            })
            .sum();
        assert!(violations_after <= violations_before);
    }
}
