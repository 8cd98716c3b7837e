use clap::Parser;

#[derive(Parser)]
#[command(name = "campus-crawler", about = "Polite, restartable crawler over a set of UCI subdomains")]
pub struct Cli {
    /// Path to config file
    #[arg(long, default_value = "config.ini")]
    pub config_file: String,

    /// Wipe any existing discovery state and start over from the seeds
    #[arg(long)]
    pub restart: bool,
}
