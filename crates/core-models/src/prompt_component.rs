use crate::query_context::QueryContext;

/// A polymorphic, fixed-at-compile-time unit of prompt text.
///
/// Concrete variants (QueryType, Trigger, TradingProfile, TechnicalData,
/// PositionData, PortfolioSummary, News, MarketRegime, ComparativeData,
/// TaskInstruction, ResponseFormat, OvernightContext) live in the prompting
/// crate, which owns rendering logic and data access; this trait is the
/// shared seam so PromptAssembler can hold a fixed registry of trait objects.
/// Per spec §9, the component set is fixed at compile time — an
/// "extension" component is a new variant implementing this trait, never
/// reflective discovery.
pub trait PromptComponent: Send + Sync {
    /// Sort key for assembly order; ties are broken by declaration order in
    /// the registry.
    fn priority(&self) -> i32;

    /// Whether this component applies to the given query context.
    fn is_relevant(&self, ctx: &QueryContext) -> bool;

    /// Render this component's text for the given context. Must be a pure
    /// function of `ctx` and the component's own data (deterministic prompt
    /// assembly, spec §8).
    fn render(&self, ctx: &QueryContext) -> String;

    /// Stable name for logging/debugging.
    fn name(&self) -> &str;
}
