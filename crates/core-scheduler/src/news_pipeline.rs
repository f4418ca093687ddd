//! NewsTimeline (component H, spec §4.H): three phases anchored to the
//! market timezone — accumulation, synthesis, validation — operating
//! against the NewsProvider and Model collaborators and persisting through
//! `core_store::Store`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use core_models::{NarrativeSynthesis, NewsRecommendation, NewsTimeline};
use core_prompting::{Model, NewsProvider};
use core_store::Store;
use tokio::sync::Semaphore;

use crate::error::SchedulerError;

/// Synthesis concurrency is capped at the Model's own in-flight limit (spec
/// §5: "Synthesis in NewsTimeline uses its own bounded worker pool capped
/// at Model's limit").
const MODEL_CONCURRENCY: usize = 1;

pub struct NewsPipeline {
    news_provider: Arc<dyn NewsProvider>,
    model: Arc<dyn Model>,
}

impl NewsPipeline {
    pub fn new(news_provider: Arc<dyn NewsProvider>, model: Arc<dyn Model>) -> Self {
        Self {
            news_provider,
            model,
        }
    }

    /// Accumulation phase: pulls news for every tracked symbol, dedups by
    /// article id (via `NewsTimeline::push_article`), and persists. No LLM
    /// involvement. Returns the number of genuinely new articles across all
    /// symbols.
    pub async fn accumulate(
        &self,
        store: &Store,
        symbols: &[String],
        date: NaiveDate,
        since: chrono::DateTime<Utc>,
    ) -> Result<usize, SchedulerError> {
        let mut new_count = 0;
        for symbol in symbols {
            let mut timeline = store
                .read_news_timeline(symbol, date)?
                .unwrap_or_else(|| NewsTimeline::new(symbol.clone(), date));

            let articles = self
                .news_provider
                .get_news(std::slice::from_ref(symbol), since)
                .await
                .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;

            for article in articles {
                if timeline.push_article(article) {
                    new_count += 1;
                }
            }
            store.write_news_timeline(&timeline)?;
        }
        Ok(new_count)
    }

    /// Synthesis phase: for each symbol with a non-empty timeline, sends the
    /// chronological article list to the Model and stores the resulting
    /// `NarrativeSynthesis`. Runs with a bounded worker pool capped at the
    /// Model's own concurrency limit, so "parallel" here means pipelined
    /// requests against a single-tenant model server, not true concurrency.
    pub async fn synthesize(
        &self,
        store: &Store,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<usize, SchedulerError> {
        let semaphore = Arc::new(Semaphore::new(MODEL_CONCURRENCY));
        let mut synthesized = 0;

        for symbol in symbols {
            let Some(mut timeline) = store.read_news_timeline(symbol, date)? else {
                continue;
            };
            if timeline.articles.is_empty() {
                continue;
            }

            let _permit = semaphore.acquire().await.expect("semaphore not closed");
            let prompt = render_synthesis_prompt(&timeline);
            let raw = self
                .model
                .complete(&prompt)
                .await
                .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;
            drop(_permit);

            if let Some(synthesis) = parse_synthesis(&raw) {
                timeline.record_synthesis(synthesis);
                store.write_news_timeline(&timeline)?;
                synthesized += 1;
            }
        }
        Ok(synthesized)
    }

    /// Validation phase: pulls breaking news since the synthesis was
    /// recorded; if any arrived, marks the synthesis stale without
    /// rewriting the recommendation.
    pub async fn validate(
        &self,
        store: &Store,
        symbols: &[String],
        date: NaiveDate,
    ) -> Result<usize, SchedulerError> {
        let mut staled = 0;
        for symbol in symbols {
            let Some(mut timeline) = store.read_news_timeline(symbol, date)? else {
                continue;
            };
            let Some(synthesis) = &timeline.synthesis else {
                continue;
            };
            let since = synthesis.synthesized_at;

            let breaking = self
                .news_provider
                .get_news(std::slice::from_ref(symbol), since)
                .await
                .map_err(|e| SchedulerError::BrokerProbe(e.to_string()))?;

            let mut any_new = false;
            for article in breaking {
                if timeline.push_article(article) {
                    any_new = true;
                }
            }
            if any_new {
                timeline.mark_stale();
                staled += 1;
            }
            store.write_news_timeline(&timeline)?;
        }
        Ok(staled)
    }
}

fn render_synthesis_prompt(timeline: &NewsTimeline) -> String {
    let mut prompt = format!(
        "Analyze the evolution of the following news timeline for {}. \
         Detect contradictions between articles and produce a single \
         recommendation and confidence.\n\n",
        timeline.symbol
    );
    for article in &timeline.articles {
        prompt.push_str(&format!(
            "- [{}] {} ({})\n",
            article.timestamp.to_rfc3339(),
            article.headline,
            article.source
        ));
    }
    prompt.push_str(
        "\nRespond with exactly one JSON object: {\"narrative\": string, \
         \"net_sentiment\": number, \"confidence\": number, \"key_themes\": \
         [string], \"contradictions\": [string], \"recommendation\": \
         \"BUY\"|\"SELL\"|\"HOLD\"|\"WAIT_FOR_CLARITY\", \"reasoning\": string}",
    );
    prompt
}

fn parse_synthesis(raw: &str) -> Option<NarrativeSynthesis> {
    let value = core_prompting::extract_json(raw).ok()?;
    let recommendation = match value.get("recommendation")?.as_str()? {
        "BUY" => NewsRecommendation::Buy,
        "SELL" => NewsRecommendation::Sell,
        "HOLD" => NewsRecommendation::Hold,
        "WAIT_FOR_CLARITY" => NewsRecommendation::WaitForClarity,
        _ => return None,
    };
    Some(NarrativeSynthesis {
        narrative: value.get("narrative")?.as_str()?.to_string(),
        net_sentiment: value.get("net_sentiment")?.as_f64()?,
        confidence: value.get("confidence")?.as_f64()?,
        key_themes: value
            .get("key_themes")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        contradictions: value
            .get("contradictions")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        recommendation,
        reasoning: value
            .get("reasoning")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        synthesized_at: Utc::now(),
        stale: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_models::NewsArticle;
    use core_prompting::test_support::{FakeNewsProvider, ScenarioModel};
    use std::collections::BTreeSet;
    use tempfile::tempdir;

    fn article(id: &str, headline: &str) -> NewsArticle {
        NewsArticle {
            id: id.to_string(),
            timestamp: Utc::now(),
            headline: headline.to_string(),
            summary: "summary".to_string(),
            source: "wire".to_string(),
            symbols: BTreeSet::from(["AAPL".to_string()]),
            sentiment: None,
            importance: None,
        }
    }

    #[tokio::test]
    async fn accumulate_dedups_across_repeated_calls() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let provider = Arc::new(
            FakeNewsProvider::new().with_articles("AAPL", vec![article("a1", "headline one")]),
        );
        let pipeline = NewsPipeline::new(provider, Arc::new(ScenarioModel::new("fake")));
        let date = Utc::now().date_naive();
        let since = Utc::now() - chrono::Duration::days(1);

        let first = pipeline
            .accumulate(&store, &["AAPL".to_string()], date, since)
            .await
            .unwrap();
        let second = pipeline
            .accumulate(&store, &["AAPL".to_string()], date, since)
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn synthesize_is_a_noop_for_empty_timelines() {
        let dir = tempdir().unwrap();
        let store = Store::open_in_memory(dir.path()).unwrap();
        let pipeline = NewsPipeline::new(
            Arc::new(FakeNewsProvider::new()),
            Arc::new(ScenarioModel::new("fake")),
        );
        let date = Utc::now().date_naive();

        let synthesized = pipeline
            .synthesize(&store, &["AAPL".to_string()], date)
            .await
            .unwrap();
        assert_eq!(synthesized, 0);
    }
}
