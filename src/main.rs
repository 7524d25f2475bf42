// External crates
use clap::Parser;
use log::{error, info};

// Local modules
use cli::Cli;
use scheduler_ga::config::GaConfig;
use scheduler_ga::entities::{self, Region, Stadium, SurfaceKind, Team};
use scheduler_ga::logging;
use scheduler_ga::optimizer::{GaOptimizer, LeagueInputs};
use scheduler_ga::statistics::Statistics;

mod cli;

/// Builds a small demo league: one stadium per team, a synthetic
/// city-distance matrix, three geographic regions, and one derby pair
/// between the first two teams.
fn demo_league(n_teams: usize) -> (LeagueInputs, std::collections::HashMap<String, Region>) {
    let teams: Vec<Team> = (1..=n_teams as u32)
        .map(|id| Team {
            id,
            name: format!("Team {id}"),
            short_name: format!("T{id}"),
            city: format!("City {id}"),
            home_stadium_id: id,
        })
        .collect();

    let stadiums: Vec<Stadium> = teams
        .iter()
        .map(|t| Stadium {
            id: t.home_stadium_id,
            name: format!("{} Arena", t.name),
            city: t.city.clone(),
            capacity: 30_000,
            has_lighting: true,
            surface: SurfaceKind::Natural,
        })
        .collect();

    let mut distances = std::collections::HashMap::new();
    for a in &teams {
        for b in &teams {
            if a.id >= b.id {
                continue;
            }
            let km = (b.id - a.id) as f64 * 85.0;
            distances.insert((a.city.clone(), b.city.clone()), km);
        }
    }
    let distances = entities::symmetric_distance_matrix(&distances);

    let mut region_assignment = std::collections::HashMap::new();
    let third = (n_teams / 3).max(1);
    for (i, team) in teams.iter().enumerate() {
        let region = if i < third {
            Region::North
        } else if i < 2 * third {
            Region::Central
        } else {
            Region::South
        };
        region_assignment.insert(team.city.clone(), region);
    }

    let mut derby_pairs = std::collections::HashSet::new();
    if teams.len() >= 2 {
        derby_pairs.insert(entities::derby_pair(teams[0].id, teams[1].id));
    }

    (LeagueInputs { teams, stadiums, distances, derby_pairs, special_dates: Vec::new() }, region_assignment)
}

fn main() {
    let cli = Cli::parse();
    logging::init_logger(&cli.log_file, cli.log_enabled);
    info!("logger initialized");

    if cli.teams < 4 || cli.teams % 2 != 0 {
        error!("--teams must be an even number >= 4, got {}", cli.teams);
        std::process::exit(1);
    }

    let (inputs, region_assignment) = demo_league(cli.teams);

    let mut config = match cli.preset.as_str() {
        "production" => GaConfig::production(),
        _ => GaConfig::quick_test(),
    };
    config.random_seed = Some(cli.seed);
    config.region_assignment = region_assignment;

    let mut optimizer = match GaOptimizer::new(inputs, config) {
        Ok(optimizer) => optimizer,
        Err(e) => {
            error!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    info!("running optimization over a {}-team league", cli.teams);
    let best = optimizer.optimize();

    if let Some(report) = optimizer.best_report() {
        info!("best fitness: {:.2}", best.fitness);
        info!("hard violations: {:?}", report.hard);
        info!("soft scores: {:?}", report.soft);
        info!("is_valid: {}", report.is_valid);
    }

    Statistics::generate_statistics(&optimizer.history.best_fitness);
    info!("run completed");
}
