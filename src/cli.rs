use clap::Parser;

/// Command-line interface for the double round-robin schedule generator.
#[derive(Parser, Debug)]
#[command(name = "scheduler-ga", version = "0.1.0", about = "Evolves double round-robin league schedules")]
pub struct Cli {
    /// Number of teams in the demo league (must be even)
    #[arg(long = "teams", default_value_t = 14)]
    pub teams: usize,

    /// Config preset to run
    #[arg(long = "preset", default_value = "quick-test", value_parser = ["quick-test", "production"])]
    pub preset: String,

    /// Random seed for reproducibility
    #[arg(long = "seed", default_value_t = 42)]
    pub seed: u64,

    /// Path to the run log
    #[arg(long = "log-file", default_value = "scheduler-ga.log")]
    pub log_file: String,

    /// Enable or disable logging
    #[arg(long = "log", default_value_t = true)]
    pub log_enabled: bool,
}
