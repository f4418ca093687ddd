//! PromptAssembler (component C, spec §4.C): given a `QueryContext` and a
//! `DataBundle`, selects components, sorts by priority descending (ties
//! broken by declaration order), filters by relevance, renders each, and
//! joins with a blank-line separator.

use core_models::{IndicatorSet, NewsArticle, OvernightSummary, Position, PromptComponent, QueryContext};

use crate::components::{
    ComparativeDataComponent, MarketRegimeComponent, NewsComponent, OvernightContextComponent,
    PortfolioSummaryComponent, PositionDataComponent, QueryTypeComponent, ResponseFormatComponent,
    TaskInstructionComponent, TechnicalDataComponent, TradingProfileComponent, TriggerComponent,
};

/// Everything a single assembly call might render, gathered by the caller
/// (TradingAgent / OvernightPipeline) before invoking PromptAssembler.
/// Unused fields for a given query_type are simply left empty/`None` — the
/// corresponding component's `is_relevant` filters it out regardless.
#[derive(Debug, Clone, Default)]
pub struct DataBundle {
    pub primary_indicators: Option<IndicatorSet>,
    pub primary_position: Option<Position>,
    pub portfolio_positions: Vec<Position>,
    pub news: Vec<NewsArticle>,
    pub market_regime_label: Option<String>,
    pub comparative: Vec<(String, IndicatorSet)>,
    pub overnight_summary: Option<OvernightSummary>,
}

pub struct PromptAssembler;

impl PromptAssembler {
    pub fn assemble(ctx: &QueryContext, bundle: &DataBundle) -> String {
        let mut registry: Vec<Box<dyn PromptComponent>> = Vec::new();

        registry.push(Box::new(QueryTypeComponent));
        registry.push(Box::new(TriggerComponent));
        registry.push(Box::new(TradingProfileComponent));

        if let Some(indicators) = &bundle.primary_indicators {
            registry.push(Box::new(TechnicalDataComponent {
                indicators: indicators.clone(),
            }));
        }
        if let Some(position) = &bundle.primary_position {
            registry.push(Box::new(PositionDataComponent {
                position: position.clone(),
            }));
        }
        if !bundle.portfolio_positions.is_empty() {
            registry.push(Box::new(PortfolioSummaryComponent {
                positions: bundle.portfolio_positions.clone(),
            }));
        }
        registry.push(Box::new(NewsComponent {
            articles: bundle.news.clone(),
        }));
        if let Some(label) = &bundle.market_regime_label {
            registry.push(Box::new(MarketRegimeComponent {
                label: label.clone(),
            }));
        }
        if !bundle.comparative.is_empty() {
            registry.push(Box::new(ComparativeDataComponent {
                rows: bundle.comparative.clone(),
            }));
        }
        if let Some(summary) = &bundle.overnight_summary {
            registry.push(Box::new(OvernightContextComponent {
                summary: summary.clone(),
            }));
        }

        registry.push(Box::new(TaskInstructionComponent));
        registry.push(Box::new(ResponseFormatComponent));

        // Stable sort on priority (descending) preserves registry push order
        // as the tie-break, matching "ties broken by declaration order".
        registry.sort_by(|a, b| b.priority().cmp(&a.priority()));

        registry
            .iter()
            .filter(|c| c.is_relevant(ctx))
            .map(|c| c.render(ctx))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_models::{DetailLevel, ExpectedFormat, QueryType, Trigger, TradingProfile};

    fn ctx(query_type: QueryType) -> QueryContext {
        QueryContext {
            query_type,
            trigger: Trigger::ScheduledCycle,
            profile: TradingProfile::Moderate,
            primary_symbol: Some("AAPL".to_string()),
            comparison_symbols: vec![],
            portfolio_state: None,
            overnight_context: None,
            expected_format: ExpectedFormat::StandardDecision,
            include_news: true,
            include_market_regime: false,
            detail_level: DetailLevel::Standard,
        }
    }

    #[test]
    fn always_included_components_appear_for_new_opportunity() {
        let prompt = PromptAssembler::assemble(&ctx(QueryType::NewOpportunity), &DataBundle::default());
        assert!(prompt.contains("Query type"));
        assert!(prompt.contains("Trigger"));
        assert!(prompt.contains("Trading profile"));
        assert!(prompt.contains("Respond with exactly one JSON object"));
    }

    #[test]
    fn technical_data_included_when_indicators_present_for_new_opportunity() {
        let bundle = DataBundle {
            primary_indicators: Some(IndicatorSet::insufficient_data("AAPL")),
            ..Default::default()
        };
        let prompt = PromptAssembler::assemble(&ctx(QueryType::NewOpportunity), &bundle);
        assert!(prompt.contains("Technical data for AAPL"));
    }

    #[test]
    fn position_data_only_included_for_position_review() {
        let position = Position {
            symbol: "AAPL".to_string(),
            qty: rust_decimal::Decimal::TEN,
            avg_entry_price: rust_decimal::Decimal::ONE_HUNDRED,
            current_price: rust_decimal::Decimal::ONE_HUNDRED,
            market_value: rust_decimal::Decimal::ONE_HUNDRED,
            unrealized_pnl_abs: rust_decimal::Decimal::ZERO,
            unrealized_pnl_pct: rust_decimal::Decimal::ZERO,
            days_held: 3,
        };
        let bundle = DataBundle {
            primary_position: Some(position),
            ..Default::default()
        };

        let review_prompt = PromptAssembler::assemble(&ctx(QueryType::PositionReview), &bundle);
        assert!(review_prompt.contains("YOU ALREADY OWN"));

        let new_opportunity_prompt =
            PromptAssembler::assemble(&ctx(QueryType::NewOpportunity), &bundle);
        assert!(!new_opportunity_prompt.contains("YOU ALREADY OWN"));
    }

    #[test]
    fn task_instruction_has_no_concrete_copy_pasteable_figures() {
        let prompt = PromptAssembler::assemble(&ctx(QueryType::NewOpportunity), &DataBundle::default());
        assert!(!prompt.contains("confidence: 7"));
    }
}
