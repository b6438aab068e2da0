use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Row};
use vesper_core::domain::DailyReflection;

use crate::error::Result;

#[derive(Clone)]
pub struct DailyReflectionRepo {
    pool: PgPool,
}

impl DailyReflectionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, reflection: &DailyReflection) -> Result<()> {
        let gratitude = serde_json::to_value(&reflection.gratitude)?;
        let challenges = serde_json::to_value(&reflection.challenges)?;
        let learning = serde_json::to_value(&reflection.learning)?;
        let connections = serde_json::to_value(&reflection.connections)?;
        let looking_forward = serde_json::to_value(&reflection.looking_forward)?;

        sqlx::query(
            r#"
            INSERT INTO daily_reflections
                (username, local_date, gratitude, challenges, learning, connections, looking_forward, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (username, local_date) DO UPDATE SET
                gratitude = EXCLUDED.gratitude,
                challenges = EXCLUDED.challenges,
                learning = EXCLUDED.learning,
                connections = EXCLUDED.connections,
                looking_forward = EXCLUDED.looking_forward
            "#,
        )
        .bind(&reflection.username)
        .bind(reflection.local_date)
        .bind(gratitude)
        .bind(challenges)
        .bind(learning)
        .bind(connections)
        .bind(looking_forward)
        .bind(reflection.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, username: &str, local_date: NaiveDate) -> Result<Option<DailyReflection>> {
        let row = sqlx::query("SELECT * FROM daily_reflections WHERE username = $1 AND local_date = $2")
            .bind(username)
            .bind(local_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_reflection))
    }
}

fn row_to_reflection(row: sqlx::postgres::PgRow) -> DailyReflection {
    let gratitude: serde_json::Value = row.get("gratitude");
    let challenges: serde_json::Value = row.get("challenges");
    let learning: serde_json::Value = row.get("learning");
    let connections: serde_json::Value = row.get("connections");
    let looking_forward: serde_json::Value = row.get("looking_forward");
    DailyReflection {
        username: row.get("username"),
        local_date: row.get("local_date"),
        gratitude: serde_json::from_value(gratitude).unwrap_or_default(),
        challenges: serde_json::from_value(challenges).unwrap_or_default(),
        learning: serde_json::from_value(learning).unwrap_or_default(),
        connections: serde_json::from_value(connections).unwrap_or_default(),
        looking_forward: serde_json::from_value(looking_forward).unwrap_or_default(),
        created_at: row.get::<chrono::DateTime<Utc>, _>("created_at"),
    }
}
