//! API-shaped output types for `GET /api/insights/mental-state`, distinct
//! from the persisted [`vesper_core::domain::MentalStateScore`] row: these
//! carry derived presentation fields (`data_source`, pattern/recommendation
//! text) that are never written back to storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use vesper_core::domain::MentalStateSource;
use vesper_core::ids::EventId;

/// Single mental state data point on the 0-10 energy/stress scale used
/// throughout the calculator, per `mental_state_service.py`.
#[derive(Debug, Clone, Serialize)]
pub struct MentalStatePoint {
    pub timestamp: DateTime<Utc>,
    pub energy_score: f64,
    pub stress_score: f64,
    pub confidence: f64,
    pub data_source: MentalStateSource,
    pub event_id: Option<EventId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyMentalStateStats {
    pub avg_energy: f64,
    pub avg_stress: f64,
    pub peak_energy_time: String,
    pub peak_stress_time: String,
    pub optimal_state_minutes: i64,
    pub burnout_risk_minutes: i64,
    pub recovery_periods: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentalStatePattern {
    pub pattern_type: String,
    pub description: String,
    pub frequency: String,
    pub impact: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskIndicators {
    pub burnout_risk: RiskLevel,
    pub stress_level: RiskLevel,
    pub energy_level: RiskLevel,
    pub needs_intervention: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MentalStateInsights {
    pub current_state: MentalStatePoint,
    pub timeline_24h: Vec<MentalStatePoint>,
    pub timeline_7d: Vec<MentalStatePoint>,
    pub daily_stats: DailyMentalStateStats,
    pub patterns: Vec<MentalStatePattern>,
    pub recommendations: Vec<String>,
    pub risk_indicators: RiskIndicators,
}
