use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use url::Url;

use crate::low_info::tokenize;

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "aren't", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can't", "cannot", "could", "couldn't", "did", "didn't",
        "do", "does", "doesn't", "doing", "don't", "down", "during", "each", "few", "for",
        "from", "further", "had", "hadn't", "has", "hasn't", "have", "haven't", "having", "he",
        "he'd", "he'll", "he's", "her", "here", "here's", "hers", "herself", "him", "himself",
        "his", "how", "how's", "i", "i'd", "i'll", "i'm", "i've", "if", "in", "into", "is",
        "isn't", "it", "it's", "its", "itself", "let's", "me", "more", "most", "mustn't", "my",
        "myself", "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "ought",
        "our", "ours", "ourselves", "out", "over", "own", "same", "shan't", "she", "she'd",
        "she'll", "she's", "should", "shouldn't", "so", "some", "such", "than", "that", "that's",
        "the", "their", "theirs", "them", "themselves", "then", "there", "there's", "these",
        "they", "they'd", "they'll", "they're", "they've", "this", "those", "through", "to",
        "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd", "we'll", "we're",
        "we've", "were", "weren't", "what", "what's", "when", "when's", "where", "where's",
        "which", "while", "who", "who's", "whom", "why", "why's", "with", "won't", "would",
        "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect()
});

#[derive(Default)]
struct ReportState {
    unique_pages: HashSet<String>,
    longest_page_url: Option<String>,
    longest_page_words: usize,
    word_freq: HashMap<String, u64>,
    subdomain_counts: HashMap<String, u64>,
}

/// Owns every piece of shared report state behind one lock, so the worker
/// pool's concurrent pages never race on the longest-page or word-frequency
/// counters.
#[derive(Default)]
pub struct ReportSink {
    state: Mutex<ReportState>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&self, url: &Url, body_text: &str) {
        let mut state = self.state.lock().unwrap();

        let defragged = {
            let mut u = url.clone();
            u.set_fragment(None);
            u.to_string()
        };
        state.unique_pages.insert(defragged.clone());

        let word_count = tokenize(body_text).count();
        if word_count > state.longest_page_words {
            state.longest_page_words = word_count;
            state.longest_page_url = Some(defragged);
        }

        for token in tokenize(body_text) {
            if STOPWORDS.contains(token.as_str()) {
                continue;
            }
            *state.word_freq.entry(token).or_insert(0) += 1;
        }

        if let Some(host) = url.host_str() {
            let host = host.to_ascii_lowercase();
            *state.subdomain_counts.entry(host).or_insert(0) += 1;
        }
    }

    /// Writes the four diagnostic reports into `dir`, creating it if needed.
    pub fn write_reports(&self, dir: &std::path::Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let state = self.state.lock().unwrap();

        let mut unique_pages_out = format!("Unique pages: {}\n\n", state.unique_pages.len());
        let mut sorted_pages: Vec<_> = state.unique_pages.iter().collect();
        sorted_pages.sort();
        for page in sorted_pages {
            unique_pages_out.push_str(page);
            unique_pages_out.push('\n');
        }
        std::fs::write(dir.join("unique_pages.txt"), unique_pages_out)?;

        let longest_page_out = format!(
            "Longest page (num of words): {}\nURL: {}\n",
            state.longest_page_words,
            state.longest_page_url.as_deref().unwrap_or("")
        );
        std::fs::write(dir.join("longest_page.txt"), longest_page_out)?;

        let mut words: Vec<_> = state.word_freq.iter().collect();
        words.sort_by(|(w1, c1), (w2, c2)| c2.cmp(c1).then_with(|| w1.cmp(w2)));
        let mut common_words_out = String::new();
        for (word, count) in words.into_iter().take(50) {
            common_words_out.push_str(&format!("{word}, {count}\n"));
        }
        std::fs::write(dir.join("common_words.txt"), common_words_out)?;

        let mut hosts: Vec<_> = state.subdomain_counts.keys().cloned().collect();
        hosts.sort();
        let mut subdomains_out = String::new();
        for host in hosts {
            subdomains_out.push_str(&format!("{host}, {}\n", state.subdomain_counts[&host]));
        }
        std::fs::write(dir.join("subdomains.txt"), subdomains_out)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_longest_page_and_subdomains() {
        let sink = ReportSink::new();
        let short = Url::parse("http://a.ics.uci.edu/short").unwrap();
        let long = Url::parse("http://b.ics.uci.edu/long").unwrap();
        sink.record_page(&short, "only a few words");
        sink.record_page(&long, &"word ".repeat(50));

        let state = sink.state.lock().unwrap();
        assert_eq!(state.longest_page_url.as_deref(), Some("http://b.ics.uci.edu/long"));
        assert_eq!(state.unique_pages.len(), 2);
        assert_eq!(state.subdomain_counts["a.ics.uci.edu"], 1);
    }

    #[test]
    fn stopwords_are_excluded_from_frequencies() {
        let sink = ReportSink::new();
        let url = Url::parse("http://a.ics.uci.edu/").unwrap();
        sink.record_page(&url, "the the the crawler crawler");
        let state = sink.state.lock().unwrap();
        assert!(!state.word_freq.contains_key("the"));
        assert_eq!(state.word_freq["crawler"], 2);
    }
}
