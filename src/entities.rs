//! Core value types: teams, stadiums, matches, and the schedule that
//! collects them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A club competing in the league. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub city: String,
    pub home_stadium_id: u32,
}

/// Playing surface of a stadium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Natural,
    Artificial,
}

/// A venue. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stadium {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub capacity: u32,
    pub has_lighting: bool,
    pub surface: SurfaceKind,
}

/// Coarse geographic grouping used by the competitive-balance soft
/// constraint. Supplied by the caller via a city -> region map, never
/// hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    Central,
    South,
    Unknown,
}

/// A single fixture. `round` is 0 while unassigned, else in `[1, R]`.
/// Only `round` changes once the match is minted; the rest are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: u32,
    pub home_team_id: u32,
    pub away_team_id: u32,
    pub stadium_id: u32,
    pub round: u32,
}

impl Match {
    /// The directed matchup `(home, away)`.
    pub fn directed_matchup(&self) -> (u32, u32) {
        (self.home_team_id, self.away_team_id)
    }

    /// The unordered matchup, used for consecutive-opponent and derby checks.
    pub fn unordered_matchup(&self) -> (u32, u32) {
        if self.home_team_id < self.away_team_id {
            (self.home_team_id, self.away_team_id)
        } else {
            (self.away_team_id, self.home_team_id)
        }
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == team_id || self.away_team_id == team_id
    }
}

/// A candidate double round-robin schedule: an unordered multiset of
/// matches plus an optional cached fitness. Order carries no meaning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub matches: Vec<Match>,
    pub fitness: Option<f64>,
}

impl Schedule {
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches, fitness: None }
    }

    pub fn matches_in_round(&self, round: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.round == round).collect()
    }

    pub fn matches_involving_team(&self, team_id: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.involves(team_id)).collect()
    }

    pub fn home_matches_of(&self, team_id: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.home_team_id == team_id).collect()
    }

    pub fn away_matches_of(&self, team_id: u32) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.away_team_id == team_id).collect()
    }

    pub fn total_rounds(&self) -> u32 {
        self.matches.iter().map(|m| m.round).max().unwrap_or(0)
    }
}

/// Builds the stadium -> teams map restricted to stadiums shared by
/// more than one team (derived, rebuilt as needed, never authoritative).
pub fn shared_stadiums(teams: &[Team]) -> HashMap<u32, HashSet<u32>> {
    let mut by_stadium: HashMap<u32, HashSet<u32>> = HashMap::new();
    for team in teams {
        by_stadium.entry(team.home_stadium_id).or_default().insert(team.id);
    }
    by_stadium.retain(|_, teams| teams.len() > 1);
    by_stadium
}

/// Symmetric (city, city) -> km lookup with zero on the diagonal,
/// built from a sparse input map (triangle inequality not required).
pub fn symmetric_distance_matrix(
    distances: &HashMap<(String, String), f64>,
) -> HashMap<(String, String), f64> {
    let mut matrix = HashMap::new();
    for ((a, b), dist) in distances {
        matrix.insert((a.clone(), b.clone()), *dist);
        matrix.insert((b.clone(), a.clone()), *dist);
    }
    matrix
}

pub fn derby_pair(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u32, stadium_id: u32) -> Team {
        Team { id, name: format!("Team {id}"), short_name: format!("T{id}"), city: format!("City {id}"), home_stadium_id: stadium_id }
    }

    #[test]
    fn directed_and_unordered_matchup_agree_up_to_order() {
        let m = Match { id: 1, home_team_id: 3, away_team_id: 7, stadium_id: 1, round: 1 };
        assert_eq!(m.directed_matchup(), (3, 7));
        assert_eq!(m.unordered_matchup(), (3, 7));
        let reverse = Match { id: 2, home_team_id: 7, away_team_id: 3, stadium_id: 1, round: 2 };
        assert_eq!(reverse.unordered_matchup(), m.unordered_matchup());
    }

    #[test]
    fn shared_stadiums_only_keeps_stadiums_with_multiple_teams() {
        let teams = vec![team(1, 100), team(2, 100), team(3, 200)];
        let shared = shared_stadiums(&teams);
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.get(&100).unwrap().len(), 2);
        assert!(!shared.contains_key(&200));
    }

    #[test]
    fn symmetric_distance_matrix_reflects_both_directions() {
        let mut distances = HashMap::new();
        distances.insert(("A".to_string(), "B".to_string()), 120.0);
        let matrix = symmetric_distance_matrix(&distances);
        assert_eq!(matrix[&("A".to_string(), "B".to_string())], 120.0);
        assert_eq!(matrix[&("B".to_string(), "A".to_string())], 120.0);
    }

    #[test]
    fn derby_pair_is_order_independent() {
        assert_eq!(derby_pair(5, 2), derby_pair(2, 5));
    }

    #[test]
    fn schedule_round_queries_filter_correctly() {
        let matches = vec![
            Match { id: 1, home_team_id: 1, away_team_id: 2, stadium_id: 1, round: 1 },
            Match { id: 2, home_team_id: 3, away_team_id: 1, stadium_id: 3, round: 2 },
        ];
        let schedule = Schedule::new(matches);
        assert_eq!(schedule.matches_in_round(1).len(), 1);
        assert_eq!(schedule.matches_involving_team(1).len(), 2);
        assert_eq!(schedule.home_matches_of(1).len(), 1);
        assert_eq!(schedule.away_matches_of(1).len(), 1);
        assert_eq!(schedule.total_rounds(), 2);
    }
}
