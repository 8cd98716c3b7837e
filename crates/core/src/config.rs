use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub local: LocalConfig,
    pub connection: ConnectionConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub robots: RobotsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    pub save_file: String,
    #[serde(default = "default_threads_count")]
    pub threads_count: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    pub seed_urls: Vec<String>,
    #[serde(default = "default_time_delay")]
    pub time_delay: f64,
    #[serde(default = "default_allowed_suffixes")]
    pub allowed_host_suffixes: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RobotsConfig {
    #[serde(default)]
    pub user_agents: Vec<String>,
}

fn default_threads_count() -> usize {
    20
}

fn default_user_agent() -> String {
    "ir_project_crawler".to_string()
}

fn default_time_delay() -> f64 {
    0.5
}

fn default_allowed_suffixes() -> Vec<String> {
    vec![
        ".ics.uci.edu".to_string(),
        ".cs.uci.edu".to_string(),
        ".informatics.uci.edu".to_string(),
        ".stat.uci.edu".to_string(),
    ]
}
