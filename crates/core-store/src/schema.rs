/// DDL for the embedded LearningStore database (spec §4.F / §6). One table
/// per durable record type; `daily_performance` is keyed by date, everything
/// else by (symbol, timestamp) or an opaque id.
pub const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS decisions (
    symbol TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    shares INTEGER NOT NULL,
    price_snapshot TEXT NOT NULL,
    confidence INTEGER NOT NULL,
    sentiment TEXT NOT NULL,
    reasoning TEXT NOT NULL,
    risk_factors_json TEXT NOT NULL,
    quality_scores_json TEXT NOT NULL,
    llm_raw_response TEXT NOT NULL,
    trigger_kind TEXT NOT NULL,
    query_type TEXT NOT NULL,
    executed INTEGER NOT NULL,
    execution_outcome_json TEXT NOT NULL,
    PRIMARY KEY (symbol, timestamp)
);

CREATE TABLE IF NOT EXISTS llm_interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    symbol TEXT,
    model TEXT NOT NULL,
    raw_prompt TEXT NOT NULL,
    raw_response TEXT NOT NULL,
    parsed_classification TEXT,
    latency_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS patterns (
    id TEXT PRIMARY KEY,
    pattern_type TEXT NOT NULL,
    conditions_json TEXT NOT NULL,
    success_rate REAL NOT NULL,
    sample_size INTEGER NOT NULL,
    avg_return REAL NOT NULL,
    risk_reward REAL NOT NULL,
    discovered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS daily_performance (
    date TEXT PRIMARY KEY,
    pnl TEXT NOT NULL,
    win_rate REAL NOT NULL,
    trades INTEGER NOT NULL,
    regime_label TEXT NOT NULL
);
"#;
