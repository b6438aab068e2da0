use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use vesper_core::domain::{ActivityType, Event, EventStatus};
use vesper_core::ids::EventId;

use crate::error::Result;

#[derive(Clone)]
pub struct EventRepo {
    pool: PgPool,
}

impl EventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ongoing_for_user(&self, username: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query("SELECT * FROM events WHERE username = $1 AND event_status = 'ongoing' ORDER BY start_timestamp")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_event).collect())
    }

    /// Excludes `dropped`, per spec.md §4.5's `events_by_range` contract.
    pub async fn by_range(&self, username: &str, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM events
            WHERE username = $1
              AND event_status != 'dropped'
              AND start_timestamp <= $3
              AND end_timestamp >= $2
            ORDER BY start_timestamp
            "#,
        )
        .bind(username)
        .bind(t0)
        .bind(t1)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_event).collect())
    }

    pub async fn count_for_user(&self, username: &str) -> Result<i64> {
        let row = sqlx::query("SELECT count(*) AS n FROM events WHERE username = $1 AND event_status != 'dropped'")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    pub async fn upsert(&self, event: &Event) -> Result<()> {
        let topic_labels = serde_json::to_value(&event.topic_labels)?;
        let mood_labels = serde_json::to_value(&event.mood_labels)?;
        let people_involved = serde_json::to_value(&event.people_involved)?;

        sqlx::query(
            r#"
            INSERT INTO events (
                id, username, event_status, start_timestamp, end_timestamp,
                last_processed_at, time_range, duration_minutes, title, summary,
                story, location, activity_type, interaction_dynamic, inferred_impact,
                topic_labels, mood_labels, people_involved, one_sentence_summary,
                action_item, mood_score, stress_level, energy_level
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23
            )
            ON CONFLICT (id) DO UPDATE SET
                event_status = EXCLUDED.event_status,
                start_timestamp = EXCLUDED.start_timestamp,
                end_timestamp = EXCLUDED.end_timestamp,
                last_processed_at = EXCLUDED.last_processed_at,
                time_range = EXCLUDED.time_range,
                duration_minutes = EXCLUDED.duration_minutes,
                title = EXCLUDED.title,
                summary = EXCLUDED.summary,
                story = EXCLUDED.story,
                location = EXCLUDED.location,
                activity_type = EXCLUDED.activity_type,
                interaction_dynamic = EXCLUDED.interaction_dynamic,
                inferred_impact = EXCLUDED.inferred_impact,
                topic_labels = EXCLUDED.topic_labels,
                mood_labels = EXCLUDED.mood_labels,
                people_involved = EXCLUDED.people_involved,
                one_sentence_summary = EXCLUDED.one_sentence_summary,
                action_item = EXCLUDED.action_item,
                mood_score = EXCLUDED.mood_score,
                stress_level = EXCLUDED.stress_level,
                energy_level = EXCLUDED.energy_level
            "#,
        )
        .bind(event.id.0)
        .bind(&event.username)
        .bind(event.event_status.to_string())
        .bind(event.start_timestamp)
        .bind(event.end_timestamp)
        .bind(event.last_processed_at)
        .bind(&event.time_range)
        .bind(event.duration_minutes)
        .bind(&event.title)
        .bind(&event.summary)
        .bind(&event.story)
        .bind(&event.location)
        .bind(event.activity_type.to_string())
        .bind(&event.interaction_dynamic)
        .bind(&event.inferred_impact)
        .bind(topic_labels)
        .bind(mood_labels)
        .bind(people_involved)
        .bind(&event.one_sentence_summary)
        .bind(&event.action_item)
        .bind(event.mood_score)
        .bind(event.stress_level)
        .bind(event.energy_level)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Users whose UTC-day of completed events has stabilized — no event
    /// touched in the last `reflection_delay_seconds` — and that don't
    /// already have a `daily_reflections` row, per SPEC_FULL.md §3's
    /// reflection pass. `local_date` here is the event's own UTC date.
    pub async fn stabilized_days(&self, reflection_delay_seconds: i64) -> Result<Vec<(String, chrono::NaiveDate)>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT e.username, (e.start_timestamp AT TIME ZONE 'UTC')::date AS local_date
            FROM events e
            WHERE e.event_status = 'completed'
              AND e.last_processed_at < now() - make_interval(secs => $1)
              AND NOT EXISTS (
                  SELECT 1 FROM daily_reflections dr
                  WHERE dr.username = e.username
                    AND dr.local_date = (e.start_timestamp AT TIME ZONE 'UTC')::date
              )
            "#,
        )
        .bind(reflection_delay_seconds as f64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.get("username"), r.get("local_date"))).collect())
    }

    pub async fn by_id(&self, id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query("SELECT * FROM events WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_event))
    }
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Event {
    let status_str: String = row.get("event_status");
    let activity_str: String = row.get("activity_type");
    let topic_labels: serde_json::Value = row.get("topic_labels");
    let mood_labels: serde_json::Value = row.get("mood_labels");
    let people_involved: serde_json::Value = row.get("people_involved");

    Event {
        id: EventId::from_uuid(row.get("id")),
        username: row.get("username"),
        event_status: status_str.parse().unwrap_or(EventStatus::Ongoing),
        start_timestamp: row.get("start_timestamp"),
        end_timestamp: row.get("end_timestamp"),
        last_processed_at: row.get("last_processed_at"),
        time_range: row.get("time_range"),
        duration_minutes: row.get("duration_minutes"),
        title: row.get("title"),
        summary: row.get("summary"),
        story: row.get("story"),
        location: row.get("location"),
        activity_type: parse_activity_type(&activity_str),
        interaction_dynamic: row.get("interaction_dynamic"),
        inferred_impact: row.get("inferred_impact"),
        topic_labels: serde_json::from_value(topic_labels).unwrap_or_default(),
        mood_labels: serde_json::from_value(mood_labels).unwrap_or_default(),
        people_involved: serde_json::from_value(people_involved).unwrap_or_default(),
        one_sentence_summary: row.get("one_sentence_summary"),
        action_item: row.get("action_item"),
        mood_score: row.get("mood_score"),
        stress_level: row.get("stress_level"),
        energy_level: row.get("energy_level"),
    }
}

fn parse_activity_type(s: &str) -> ActivityType {
    match s {
        "work" => ActivityType::Work,
        "exercise" => ActivityType::Exercise,
        "social" => ActivityType::Social,
        "learning" => ActivityType::Learning,
        "self_care" => ActivityType::SelfCare,
        "chores" => ActivityType::Chores,
        "commute" => ActivityType::Commute,
        "meal" => ActivityType::Meal,
        "leisure" => ActivityType::Leisure,
        _ => ActivityType::Unknown,
    }
}
