use std::collections::HashMap;

const MIN_WORDS: usize = 100;
const UNIQUE_RATIO_SAMPLE: usize = 500;
const MIN_UNIQUE_RATIO: f64 = 0.05;
const SENTENCE_MIN_LEN: usize = 30;
const SENTENCE_REPEAT_THRESHOLD: usize = 10;
const SENTENCE_SAMPLE: usize = 300;

/// Maximal runs of alphanumeric characters, lowercased. Unicode letters and
/// digits count, matching the "allow non-English characters" intent.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    std::iter::from_fn(move || {
        loop {
            match chars.next() {
                Some(ch) if ch.is_alphanumeric() => {
                    for lower in ch.to_lowercase() {
                        current.push(lower);
                    }
                }
                Some(_) => {
                    if !current.is_empty() {
                        let tok = std::mem::take(&mut current);
                        return Some(tok);
                    }
                }
                None => {
                    if !current.is_empty() {
                        let tok = std::mem::take(&mut current);
                        return Some(tok);
                    }
                    return None;
                }
            }
        }
    })
}

fn has_min_words(text: &str) -> bool {
    tokenize(text).take(MIN_WORDS).count() >= MIN_WORDS
}

fn has_repeated_tokens(text: &str) -> bool {
    let mut total = 0usize;
    let mut unique = std::collections::HashSet::new();
    for tok in tokenize(text).take(UNIQUE_RATIO_SAMPLE) {
        total += 1;
        unique.insert(tok);
    }
    if total == 0 {
        return true;
    }
    (unique.len() as f64 / total as f64) < MIN_UNIQUE_RATIO
}

fn has_repeated_sentences(text: &str) -> bool {
    let sentences = split_sentences(text);
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for raw in sentences {
        let collapsed = collapse_whitespace(raw.trim().to_lowercase());
        if collapsed.len() < SENTENCE_MIN_LEN {
            continue;
        }
        total += 1;
        let count = counts.entry(collapsed).or_insert(0);
        *count += 1;
        if *count >= SENTENCE_REPEAT_THRESHOLD {
            return true;
        }
        if total >= SENTENCE_SAMPLE {
            break;
        }
    }
    false
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let ch = bytes[i];
        if ch == b'\n' || ch == b'.' || ch == b'!' || ch == b'?' {
            out.push(&text[start..i]);
            // skip the delimiter and any following whitespace/newlines
            i += 1;
            while i < bytes.len() && (bytes[i] as char).is_whitespace() {
                i += 1;
            }
            start = i;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

fn collapse_whitespace(s: String) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if the page should be treated as low-information junk and its
/// outbound links discarded.
pub fn is_low_info(text: &str) -> bool {
    !has_min_words(text) || has_repeated_tokens(text) || has_repeated_sentences(text)
}
