use std::time::{Duration, Instant};

use dashmap::DashMap;

/// The downloader's own per-host spacing, independent of the frontier's.
/// Folds the original's two free-standing `domain_last_accessed` /
/// `domain_locks` globals into one object owned by the downloader.
pub struct HostPoliteness {
    last_access: DashMap<String, Instant>,
    delay: Duration,
}

impl HostPoliteness {
    pub fn new(delay: Duration) -> Self {
        Self {
            last_access: DashMap::new(),
            delay,
        }
    }

    /// Sleeps, if necessary, until `delay` has elapsed since this host was
    /// last accessed, then records the new access time.
    pub async fn wait_for_turn(&self, host: &str) {
        loop {
            let wait = self
                .last_access
                .get(host)
                .and_then(|last| self.delay.checked_sub(last.elapsed()));
            match wait {
                Some(remaining) if !remaining.is_zero() => tokio::time::sleep(remaining).await,
                _ => break,
            }
        }
        self.last_access.insert(host.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_visit_to_same_host_is_delayed() {
        let politeness = HostPoliteness::new(Duration::from_millis(40));
        let t0 = Instant::now();
        politeness.wait_for_turn("a.ics.uci.edu").await;
        politeness.wait_for_turn("a.ics.uci.edu").await;
        assert!(t0.elapsed() >= Duration::from_millis(35));
    }

    #[tokio::test]
    async fn different_hosts_do_not_delay_each_other() {
        let politeness = HostPoliteness::new(Duration::from_millis(500));
        let t0 = Instant::now();
        politeness.wait_for_turn("a.ics.uci.edu").await;
        politeness.wait_for_turn("b.ics.uci.edu").await;
        assert!(t0.elapsed() < Duration::from_millis(100));
    }
}
