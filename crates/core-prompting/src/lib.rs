//! The Modular Prompt & Response Subsystem (spec §1 item 2): PromptAssembler
//! (component C), ResponseParser (component D), and RiskGate (component E),
//! plus the collaborator traits (Broker/Model/NewsProvider/AlertSink, spec
//! §6) TradingAgent and OvernightPipeline depend on.

pub mod collaborators;
pub mod components;
pub mod error;
pub mod json_extract;
pub mod logging_alert_sink;
pub mod model_client;
pub mod prompt_assembler;
pub mod response_parser;
pub mod risk_gate;
pub mod task_instructions;

pub mod test_support;

pub use collaborators::{
    Alert, AlertSeverity, AlertSink, Broker, MarketStatus, Model, NewsProvider, Order, OrderSide,
    OrderStatus,
};
pub use error::PromptingError;
pub use json_extract::extract_json;
pub use logging_alert_sink::LoggingAlertSink;
pub use model_client::HttpModelClient;
pub use prompt_assembler::{DataBundle, PromptAssembler};
pub use response_parser::{
    Comparison, ComparisonCandidate, DataRequest, ModelDecision, ParseOutcome, ParsedResult,
    ResponseParser,
};
pub use risk_gate::{ProposedTrade, RiskGate};
pub use task_instructions::task_instruction_text;
