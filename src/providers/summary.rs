use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::wikipedia::WikipediaSummary;
use super::Summarizer;

pub const SUMMARY_CHARS: usize = 220;
pub const SUMMARY_LANGUAGES: &[&str] = &["en", "ja", "tr"];

const EATERY_KEYWORDS: &[&str] = &[
    "cafe", "coffee", "ramen", "sushi", "izakaya", "yakitori", "noodle", "donburi", "tonkatsu",
];

/// One way of finding a description. `Ok(None)` means "no entry here, try the next one".
#[async_trait]
pub trait SummaryStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn lookup(&self, title: &str) -> Result<Option<String>>;
}

/// Strategies tried in order, then a keyword-based default.
pub struct SummaryChain {
    strategies: Vec<Box<dyn SummaryStrategy>>,
    max_chars: usize,
}

impl SummaryChain {
    pub fn new(strategies: Vec<Box<dyn SummaryStrategy>>) -> Self {
        Self {
            strategies,
            max_chars: SUMMARY_CHARS,
        }
    }

    /// English, Japanese, then Turkish Wikipedia.
    pub fn wikipedia(http: Client) -> Self {
        let strategies = SUMMARY_LANGUAGES
            .iter()
            .map(|lang| Box::new(WikipediaSummary::new(http.clone(), lang)) as Box<dyn SummaryStrategy>)
            .collect();
        Self::new(strategies)
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl Summarizer for SummaryChain {
    async fn summarize(&self, title: &str) -> String {
        for strategy in &self.strategies {
            match strategy.lookup(title).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    return clip(text.trim(), self.max_chars);
                }
                Ok(_) => continue,
                Err(e) => {
                    debug!(strategy = strategy.name(), "summary lookup failed: {:#}", e);
                }
            }
        }
        generic_description(title).to_string()
    }
}

pub fn generic_description(title: &str) -> &'static str {
    let lowered = title.to_lowercase();
    if EATERY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        "Casual local eatery."
    } else {
        "Notable local spot."
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut clipped: String = text.chars().take(max_chars).collect();
        clipped.push('…');
        clipped
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Reply {
        Text(&'static str),
        Missing,
        Fail,
    }

    struct Fixed {
        name: &'static str,
        reply: Reply,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SummaryStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn lookup(&self, _title: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(Some(text.to_string())),
                Reply::Missing => Ok(None),
                Reply::Fail => Err(anyhow!("connection reset")),
            }
        }
    }

    fn strategy(name: &'static str, reply: Reply, calls: &Arc<AtomicUsize>) -> Box<dyn SummaryStrategy> {
        Box::new(Fixed {
            name,
            reply,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn test_first_hit_wins_after_misses_and_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = SummaryChain::new(vec![
            strategy("en", Reply::Missing, &calls),
            strategy("ja", Reply::Fail, &calls),
            strategy("tr", Reply::Text("  Bir cami.  "), &calls),
            strategy("de", Reply::Text("unused"), &calls),
        ]);
        assert_eq!(chain.summarize("Süleymaniye").await, "Bir cami.");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_blank_text_falls_through_to_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = SummaryChain::new(vec![strategy("en", Reply::Text("   "), &calls)]);
        assert_eq!(chain.summarize("Afuri Ramen").await, "Casual local eatery.");
        assert_eq!(chain.summarize("Old Bridge").await, "Notable local spot.");
    }

    #[tokio::test]
    async fn test_long_summaries_are_clipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = SummaryChain::new(vec![strategy("en", Reply::Text("abcdefghij"), &calls)])
            .with_max_chars(4);
        assert_eq!(chain.summarize("Letters").await, "abcd…");
    }

    #[test]
    fn test_clip_keeps_short_text() {
        assert_eq!(clip("short", 220), "short");
    }
}
