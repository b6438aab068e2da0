use sqlx::{PgPool, Row};
use vesper_core::domain::{MentalStateScore, MentalStateSource};
use vesper_core::ids::{EventId, MentalStateScoreId};

use crate::error::Result;

#[derive(Clone)]
pub struct MentalStateScoreRepo {
    pool: PgPool,
}

impl MentalStateScoreRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Within the last 30 days, per spec.md §4.5.
    pub async fn recent_for_user(&self, username: &str) -> Result<Vec<MentalStateScore>> {
        let rows = sqlx::query(
            "SELECT * FROM mental_state_scores WHERE username = $1 AND timestamp >= now() - interval '30 days' ORDER BY timestamp",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_score).collect())
    }

    pub async fn insert(&self, score: &MentalStateScore) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mental_state_scores (id, username, timestamp, energy, stress, confidence, data_source, event_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(score.id.0)
        .bind(&score.username)
        .bind(score.timestamp)
        .bind(score.energy)
        .bind(score.stress)
        .bind(score.confidence)
        .bind(score.data_source.to_string())
        .bind(score.event_id.map(|e| e.0))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_score(row: sqlx::postgres::PgRow) -> MentalStateScore {
    let source_str: String = row.get("data_source");
    let event_id: Option<uuid::Uuid> = row.get("event_id");
    MentalStateScore {
        id: MentalStateScoreId::from_uuid(row.get("id")),
        username: row.get("username"),
        timestamp: row.get("timestamp"),
        energy: row.get("energy"),
        stress: row.get("stress"),
        confidence: row.get("confidence"),
        data_source: parse_source(&source_str),
        event_id: event_id.map(EventId::from_uuid),
    }
}

fn parse_source(s: &str) -> MentalStateSource {
    match s {
        "event" => MentalStateSource::Event,
        "interpolated" => MentalStateSource::Interpolated,
        _ => MentalStateSource::Baseline,
    }
}
