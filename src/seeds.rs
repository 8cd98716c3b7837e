/// Default seeds used when the config file's `crawler.seed_urls` is empty.
/// Mirrors the course assignment's usual starting points across the allowed
/// UCI subdomains.
pub const DEFAULT_SEEDS: &[&str] = &[
    "https://www.ics.uci.edu/",
    "https://www.cs.uci.edu/",
    "https://www.informatics.uci.edu/",
    "https://www.stat.uci.edu/",
];
