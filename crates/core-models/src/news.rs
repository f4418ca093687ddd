use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Source URL, or a hash of headline+timestamp when the provider has no
    /// stable URL.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub symbols: BTreeSet<String>,
    pub sentiment: Option<f64>,
    pub importance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsRecommendation {
    Buy,
    Sell,
    Hold,
    WaitForClarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSynthesis {
    pub narrative: String,
    pub net_sentiment: f64,
    pub confidence: f64,
    pub key_themes: Vec<String>,
    pub contradictions: Vec<String>,
    pub recommendation: NewsRecommendation,
    pub reasoning: String,
    pub synthesized_at: DateTime<Utc>,
    /// Set true when breaking news arrived after synthesis during the
    /// validation phase; confidence is halved but the recommendation is not
    /// rewritten.
    pub stale: bool,
}

/// Per (symbol, trading-date) ordered sequence of articles plus, once the
/// synthesis phase has run, a narrative synthesis.
///
/// Invariants enforced here: articles are deduplicated by id; at most one
/// synthesis is written during the synthesis window, subsequent writes
/// during that window are rejected as revisions instead (appended to
/// `revisions`, never overwriting `synthesis`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsTimeline {
    pub symbol: String,
    pub date: NaiveDate,
    pub articles: Vec<NewsArticle>,
    pub synthesis: Option<NarrativeSynthesis>,
    pub revisions: Vec<NarrativeSynthesis>,
}

impl NewsTimeline {
    pub fn new(symbol: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            articles: Vec::new(),
            synthesis: None,
            revisions: Vec::new(),
        }
    }

    /// Append an article, deduplicating by id. Returns `true` if the article
    /// was new.
    pub fn push_article(&mut self, article: NewsArticle) -> bool {
        if self.articles.iter().any(|a| a.id == article.id) {
            return false;
        }
        self.articles.push(article);
        true
    }

    /// Record a synthesis. The first call for this timeline sets `synthesis`;
    /// every subsequent call is appended to `revisions` and does not disturb
    /// the original.
    pub fn record_synthesis(&mut self, synthesis: NarrativeSynthesis) {
        if self.synthesis.is_none() {
            self.synthesis = Some(synthesis);
        } else {
            self.revisions.push(synthesis);
        }
    }

    /// Mark the current synthesis stale (confidence halved) after breaking
    /// news arrives during the validation phase. Does not rewrite the
    /// recommendation.
    pub fn mark_stale(&mut self) {
        if let Some(synthesis) = &mut self.synthesis {
            synthesis.stale = true;
            synthesis.confidence *= 0.5;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str) -> NewsArticle {
        NewsArticle {
            id: id.to_string(),
            timestamp: Utc::now(),
            headline: "headline".to_string(),
            summary: "summary".to_string(),
            source: "wire".to_string(),
            symbols: BTreeSet::from(["AAPL".to_string()]),
            sentiment: None,
            importance: None,
        }
    }

    fn synthesis(confidence: f64) -> NarrativeSynthesis {
        NarrativeSynthesis {
            narrative: "n".to_string(),
            net_sentiment: 0.2,
            confidence,
            key_themes: vec![],
            contradictions: vec![],
            recommendation: NewsRecommendation::Hold,
            reasoning: "r".to_string(),
            synthesized_at: Utc::now(),
            stale: false,
        }
    }

    #[test]
    fn push_article_dedups_by_id() {
        let mut timeline = NewsTimeline::new("AAPL", Utc::now().date_naive());
        assert!(timeline.push_article(article("a1")));
        assert!(!timeline.push_article(article("a1")));
        assert_eq!(timeline.articles.len(), 1);
    }

    #[test]
    fn second_synthesis_is_a_revision_not_an_overwrite() {
        let mut timeline = NewsTimeline::new("AAPL", Utc::now().date_naive());
        timeline.record_synthesis(synthesis(0.8));
        timeline.record_synthesis(synthesis(0.9));
        assert_eq!(timeline.synthesis.as_ref().unwrap().confidence, 0.8);
        assert_eq!(timeline.revisions.len(), 1);
    }

    #[test]
    fn mark_stale_halves_confidence_without_rewriting_recommendation() {
        let mut timeline = NewsTimeline::new("AAPL", Utc::now().date_naive());
        timeline.record_synthesis(synthesis(0.8));
        timeline.mark_stale();
        let s = timeline.synthesis.unwrap();
        assert!(s.stale);
        assert_eq!(s.confidence, 0.4);
        assert_eq!(s.recommendation, NewsRecommendation::Hold);
    }
}
