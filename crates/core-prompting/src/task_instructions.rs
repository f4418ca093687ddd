//! TaskInstruction templates, keyed by query type (spec §4.C).
//!
//! These deliberately contain abstract structural guidance only — no
//! concrete price levels, confidence numbers, or example reasoning text.
//! ResponseParser's anti-copy-paste guard (spec §4.D step 5) rejects any
//! response whose `reasoning` field is an exact substring of one of these
//! strings, so a template that shipped a plausible-sounding example sentence
//! would make that guard unable to tell a genuine (if similar) analysis from
//! the model parroting the prompt back.

use core_models::QueryType;

pub fn task_instruction_text(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::NewOpportunity => {
            "Evaluate whether to open a new position in the given symbol. Weigh the \
             technical signals and any recent news against the trading profile's posture. \
             Decide buy or hold; do not propose sell on a symbol not currently held. State \
             your reasoning in terms of the specific indicators and events shown above, not \
             generic market commentary."
        }
        QueryType::PositionReview => {
            "Evaluate the held position shown above. Decide whether to hold or sell, \
             weighing the position's unrealized performance, the current technical picture, \
             and any overnight synthesis recommendation. Do not propose buy on a position \
             already held. Reference the specific entry price, current price, and indicator \
             values shown above in your reasoning."
        }
        QueryType::PortfolioAudit => {
            "Review the full portfolio summary and comparative data above. Identify which \
             positions are outperforming or underperforming the others and why, using the \
             specific figures shown. Produce a ranking, not a single action."
        }
        QueryType::ComparativeAnalysis => {
            "Compare the symbols presented above on their technical and news standing. \
             Identify a winner and, if warranted, a runner-up and a symbol to avoid, citing \
             the specific distinguishing figures rather than restating the prompt."
        }
        QueryType::TradePostmortem => {
            "Review the closed position's entry and exit technical snapshots above. Assess \
             whether the original decision was well-supported given what was known at entry, \
             and what, if anything, the exit technical picture would have changed about that \
             decision."
        }
        QueryType::MarketRegime => {
            "Characterize the current market regime from the data above: trending, \
             range-bound, or volatile, and in which direction. Support the characterization \
             with the specific indicator readings shown."
        }
        QueryType::SectorRotation => {
            "Assess whether capital should rotate between sectors given the comparative data \
             above, citing the specific relative strength figures shown rather than general \
             sector reputation."
        }
        QueryType::RiskAssessment => {
            "Assess the risk profile of the proposed action given the account and position \
             data above, citing the specific exposure and concentration figures shown."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_query_type_has_a_template() {
        for qt in [
            QueryType::NewOpportunity,
            QueryType::PositionReview,
            QueryType::PortfolioAudit,
            QueryType::ComparativeAnalysis,
            QueryType::TradePostmortem,
            QueryType::MarketRegime,
            QueryType::SectorRotation,
            QueryType::RiskAssessment,
        ] {
            assert!(!task_instruction_text(qt).is_empty());
        }
    }
}
