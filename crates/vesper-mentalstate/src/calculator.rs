//! Three-layer mental state calculator (SPEC_FULL.md §4.4), grounded
//! point-for-point in `mental_state_service.py`'s `MentalStateCalculator`:
//! natural circadian baseline, event impacts (in-event, lingering decay,
//! anticipation), and a personal historical adjustment, combined with
//! interaction-effect feedback loops and a proximity-based confidence score.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use vesper_core::domain::{ActivityType, Event, MentalStateScore, MentalStateSource};
use vesper_core::ids::EventId;
use vesper_storage::repo::{EventRepo, MentalStateScoreRepo};

use crate::curves::{interpolate_curve, ENERGY_CURVE, STRESS_CURVE};
use crate::error::Result;
use crate::insights::{
    DailyMentalStateStats, MentalStateInsights, MentalStatePattern, MentalStatePoint, RiskIndicators, RiskLevel,
};

pub struct MentalStateCalculator {
    events: EventRepo,
    scores: MentalStateScoreRepo,
}

impl MentalStateCalculator {
    pub fn new(events: EventRepo, scores: MentalStateScoreRepo) -> Self {
        Self { events, scores }
    }

    /// Full insights payload for `GET /api/insights/mental-state`.
    pub async fn insights(&self, username: &str, tz: Tz) -> Result<MentalStateInsights> {
        let now = Utc::now().with_timezone(&tz);
        let start = now - Duration::hours(24);
        let timeline_24h = self.calculate_timeline(username, start, Some(now), 30).await?;
        let timeline_7d = self.weekly_trend(username, now).await?;

        let today_start = local_midnight(now);
        let today_points: Vec<MentalStatePoint> =
            timeline_24h.iter().filter(|p| p.timestamp >= today_start).cloned().collect();
        let daily_stats =
            if today_points.is_empty() { default_daily_stats() } else { calculate_daily_stats(&today_points, tz) };

        let current_state = self.calculate_point(username, now).await?;

        let recent_points: Vec<MentalStatePoint> = if timeline_24h.len() >= 10 {
            timeline_24h[timeline_24h.len() - 10..].to_vec()
        } else {
            timeline_24h.clone()
        };
        let patterns = detect_patterns(&timeline_7d, tz);
        let recommendations = generate_recommendations(&current_state, &recent_points, &patterns);
        let risk_indicators = assess_risks(&timeline_24h);

        Ok(MentalStateInsights {
            current_state,
            timeline_24h,
            timeline_7d,
            daily_stats,
            patterns,
            recommendations,
            risk_indicators,
        })
    }

    /// Points from `start` to `end` (defaulting to now, never past now), at
    /// `interval_minutes` spacing.
    pub async fn calculate_timeline(
        &self,
        username: &str,
        start: DateTime<Tz>,
        end: Option<DateTime<Tz>>,
        interval_minutes: i64,
    ) -> Result<Vec<MentalStatePoint>> {
        let tz = start.timezone();
        let now = Utc::now().with_timezone(&tz);
        let mut end_time = end.unwrap_or(now);
        if end_time > now {
            end_time = now;
        }

        let mut points = Vec::new();
        let mut current = start;
        while current <= end_time {
            points.push(self.calculate_point(username, current).await?);
            current += Duration::minutes(interval_minutes);
        }
        Ok(points)
    }

    /// One point at `local_time`: baseline + event impacts + personal
    /// adjustment, combined through the interaction-effect feedback loops.
    pub async fn calculate_point(&self, username: &str, local_time: DateTime<Tz>) -> Result<MentalStatePoint> {
        let tz = local_time.timezone();
        let timestamp = local_time.with_timezone(&Utc);

        let (base_energy, base_stress) = natural_baseline(local_time);

        let window_events = self.events.by_range(username, timestamp - Duration::hours(6), timestamp + Duration::hours(6)).await?;
        let (energy_delta, stress_delta, event_id) = event_impacts(&window_events, timestamp);

        let historical = self.scores.recent_for_user(username).await?;
        let (personal_energy, personal_stress) = personal_adjustment(local_time, &historical, tz);

        let final_energy = base_energy + energy_delta + personal_energy;
        let final_stress = base_stress + stress_delta + personal_stress;
        let (final_energy, final_stress) = apply_interaction_effects(final_energy, final_stress);
        let final_energy = final_energy.clamp(0.0, 10.0);
        let final_stress = final_stress.clamp(0.0, 10.0);

        let lookback_events = self.events.by_range(username, timestamp - Duration::days(1), timestamp).await?;
        let time_since_event = time_since_last_event(&lookback_events, timestamp);
        let confidence = confidence_score(event_id.is_some(), time_since_event);

        let data_source = if event_id.is_some() {
            MentalStateSource::Event
        } else if energy_delta.abs() > 0.1 || stress_delta.abs() > 0.1 {
            MentalStateSource::Interpolated
        } else {
            MentalStateSource::Baseline
        };

        Ok(MentalStatePoint {
            timestamp,
            energy_score: round1(final_energy),
            stress_score: round1(final_stress),
            confidence: round2(confidence),
            data_source,
            event_id,
        })
    }

    async fn weekly_trend(&self, username: &str, end_date: DateTime<Tz>) -> Result<Vec<MentalStatePoint>> {
        let tz = end_date.timezone();
        let start_date = end_date - Duration::days(7);
        let now = Utc::now().with_timezone(&tz);
        let actual_end = end_date.min(now);

        let mut points = Vec::new();
        let mut current = start_date;
        while current <= actual_end {
            points.push(self.calculate_point(username, current).await?);
            current += Duration::hours(1);
        }
        Ok(points)
    }
}

fn local_midnight(t: DateTime<Tz>) -> DateTime<Tz> {
    t.timezone()
        .with_ymd_and_hms(t.year(), t.month(), t.day(), 0, 0, 0)
        .single()
        .unwrap_or(t)
}

/// Universal circadian energy/stress baseline, before any event or personal
/// adjustment. Weekends get 30% less stress and 10% more energy.
fn natural_baseline(local_time: DateTime<Tz>) -> (f64, f64) {
    let hour = local_time.hour() as f64 + local_time.minute() as f64 / 60.0;
    let is_weekend = local_time.weekday().num_days_from_monday() >= 5;

    let mut energy = interpolate_curve(ENERGY_CURVE, hour);
    let mut stress = interpolate_curve(STRESS_CURVE, hour);

    if is_weekend {
        stress *= 0.7;
        energy *= 1.1;
    }

    (energy, stress)
}

/// How nearby events shift energy/stress: direct deltas while inside an
/// event, exponentially decaying "lingering" effects afterward (stress
/// decays 30% slower than energy), and small anticipation bumps for an
/// imminent work/social event.
fn event_impacts(events: &[Event], timestamp: DateTime<Utc>) -> (f64, f64, Option<EventId>) {
    let mut energy_delta = 0.0;
    let mut stress_delta = 0.0;
    let mut current_event_id = None;

    for event in events {
        if event.start_timestamp <= timestamp && timestamp <= event.end_timestamp {
            current_event_id = Some(event.id);
            energy_delta = event.energy_level - 5.5;
            stress_delta = event.stress_level - 5.0;
        } else if event.end_timestamp < timestamp {
            let hours_passed = (timestamp - event.end_timestamp).num_seconds() as f64 / 3600.0;
            let decay = (-0.5 * hours_passed).exp();

            let energy_impact = (event.energy_level - 5.5) * decay;
            let stress_impact = (event.stress_level - 5.0) * decay;

            energy_delta += energy_impact;
            stress_delta += stress_impact * 1.3;
        } else if event.start_timestamp > timestamp {
            let hours_until = (event.start_timestamp - timestamp).num_seconds() as f64 / 3600.0;
            if hours_until <= 1.0 {
                match event.activity_type {
                    ActivityType::Work => stress_delta += 0.5,
                    ActivityType::Social => {
                        energy_delta += 0.3;
                        if event.interaction_dynamic == "tense" {
                            stress_delta += 0.4;
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    (energy_delta, stress_delta, current_event_id)
}

/// Deviation of this user's own history from the universal baseline at
/// similar times (same hour ±1, same weekday/weekend bucket), weighted at
/// 30%. Requires at least 3 historical samples or contributes nothing.
fn personal_adjustment(local_time: DateTime<Tz>, historical: &[MentalStateScore], tz: Tz) -> (f64, f64) {
    let hour = local_time.hour() as i64;
    let is_weekend = local_time.weekday().num_days_from_monday() >= 5;

    let similar: Vec<&MentalStateScore> = historical
        .iter()
        .filter(|p| {
            let local = p.timestamp.with_timezone(&tz);
            let same_hour_bucket = (local.hour() as i64 - hour).abs() <= 1;
            let same_day_type = (local.weekday().num_days_from_monday() >= 5) == is_weekend;
            same_hour_bucket && same_day_type
        })
        .collect();

    if similar.len() < 3 {
        return (0.0, 0.0);
    }

    let avg_energy = mean(&similar.iter().map(|p| p.energy).collect::<Vec<_>>());
    let avg_stress = mean(&similar.iter().map(|p| p.stress).collect::<Vec<_>>());
    let (expected_energy, expected_stress) = natural_baseline(local_time);

    ((avg_energy - expected_energy) * 0.3, (avg_stress - expected_stress) * 0.3)
}

/// Feedback loops between energy and stress: high stress drains energy, very
/// low energy raises stress vulnerability, and energy/stress reinforce each
/// other at the optimal and danger-zone extremes.
fn apply_interaction_effects(mut energy: f64, mut stress: f64) -> (f64, f64) {
    if stress > 7.0 {
        energy -= (stress - 7.0) * 0.3;
    }
    if energy < 3.0 {
        stress += (3.0 - energy) * 0.2;
    }
    if energy > 7.0 && stress < 3.0 {
        energy *= 1.1;
        stress *= 0.9;
    }
    if energy < 3.0 && stress > 7.0 {
        energy *= 0.9;
        stress *= 1.1;
    }
    (energy, stress)
}

fn time_since_last_event(events: &[Event], timestamp: DateTime<Utc>) -> Option<f64> {
    let mut last_end: Option<DateTime<Utc>> = None;
    for event in events {
        if event.end_timestamp < timestamp {
            if last_end.map_or(true, |cur| event.end_timestamp > cur) {
                last_end = Some(event.end_timestamp);
            }
        }
    }
    last_end.map(|end| (timestamp - end).num_seconds() as f64 / 3600.0)
}

fn confidence_score(has_event: bool, time_since_event_hours: Option<f64>) -> f64 {
    if has_event {
        return 0.95;
    }
    if let Some(hours) = time_since_event_hours {
        if hours < 0.5 {
            return 0.85;
        } else if hours < 2.0 {
            return 0.70;
        } else if hours < 4.0 {
            return 0.50;
        }
    }
    0.30
}

fn default_daily_stats() -> DailyMentalStateStats {
    DailyMentalStateStats {
        avg_energy: 5.0,
        avg_stress: 5.0,
        peak_energy_time: "N/A".to_string(),
        peak_stress_time: "N/A".to_string(),
        optimal_state_minutes: 0,
        burnout_risk_minutes: 0,
        recovery_periods: 0,
    }
}

fn calculate_daily_stats(points: &[MentalStatePoint], tz: Tz) -> DailyMentalStateStats {
    let energies: Vec<f64> = points.iter().map(|p| p.energy_score).collect();
    let stresses: Vec<f64> = points.iter().map(|p| p.stress_score).collect();

    let peak_energy_idx = argmax(&energies);
    let peak_stress_idx = argmax(&stresses);

    let optimal_count = points.iter().filter(|p| p.energy_score > 7.0 && p.stress_score < 3.0).count();
    let burnout_count = points.iter().filter(|p| p.energy_score < 3.0 && p.stress_score > 7.0).count();

    let mut recovery_count = 0;
    for w in points.windows(2) {
        if w[0].stress_score - w[1].stress_score >= 2.0 {
            recovery_count += 1;
        }
    }

    DailyMentalStateStats {
        avg_energy: round1(mean(&energies)),
        avg_stress: round1(mean(&stresses)),
        peak_energy_time: points[peak_energy_idx].timestamp.with_timezone(&tz).format("%H:%M").to_string(),
        peak_stress_time: points[peak_stress_idx].timestamp.with_timezone(&tz).format("%H:%M").to_string(),
        optimal_state_minutes: (optimal_count * 30) as i64,
        burnout_risk_minutes: (burnout_count * 30) as i64,
        recovery_periods: recovery_count,
    }
}

fn detect_patterns(points: &[MentalStatePoint], tz: Tz) -> Vec<MentalStatePattern> {
    let mut patterns = Vec::new();

    let afternoon: Vec<f64> =
        points.iter().filter(|p| (13..=15).contains(&p.timestamp.with_timezone(&tz).hour())).map(|p| p.energy_score).collect();
    if !afternoon.is_empty() && mean(&afternoon) < 5.0 {
        patterns.push(MentalStatePattern {
            pattern_type: "afternoon_dip".to_string(),
            description: "Consistent energy drop in early afternoon".to_string(),
            frequency: "Daily".to_string(),
            impact: "Reduces productivity, may benefit from break or light activity".to_string(),
        });
    }

    let morning: Vec<f64> =
        points.iter().filter(|p| (7..=10).contains(&p.timestamp.with_timezone(&tz).hour())).map(|p| p.stress_score).collect();
    if !morning.is_empty() && mean(&morning) > 6.0 {
        patterns.push(MentalStatePattern {
            pattern_type: "morning_stress".to_string(),
            description: "High stress levels during morning hours".to_string(),
            frequency: "Most weekdays".to_string(),
            impact: "May affect entire day's mood and energy".to_string(),
        });
    }

    patterns
}

fn generate_recommendations(
    current: &MentalStatePoint,
    recent_trend: &[MentalStatePoint],
    patterns: &[MentalStatePattern],
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if current.energy_score < 3.0 && current.stress_score > 7.0 {
        recommendations.push("High burnout risk detected. Consider taking a break immediately.".to_string());
    } else if current.energy_score < 4.0 {
        recommendations.push("Low energy detected. A short walk or healthy snack might help.".to_string());
    } else if current.stress_score > 7.0 {
        recommendations.push("High stress levels. Try deep breathing or a 5-minute meditation.".to_string());
    }

    if recent_trend.len() >= 3 {
        let last_three = &recent_trend[recent_trend.len() - 3..];
        if last_three.iter().all(|p| p.stress_score > 6.0) {
            recommendations.push("Sustained high stress detected. Schedule some recovery time.".to_string());
        }
    }

    for pattern in patterns {
        match pattern.pattern_type.as_str() {
            "afternoon_dip" => recommendations.push("Consider scheduling less demanding tasks for early afternoon.".to_string()),
            "morning_stress" => recommendations.push("Try a calming morning routine to reduce stress buildup.".to_string()),
            _ => {}
        }
    }

    recommendations.truncate(3);
    recommendations
}

fn assess_risks(points: &[MentalStatePoint]) -> RiskIndicators {
    if points.is_empty() {
        return RiskIndicators {
            burnout_risk: RiskLevel::Low,
            stress_level: RiskLevel::Low,
            energy_level: RiskLevel::Low,
            needs_intervention: false,
        };
    }

    let burnout_count = points.iter().filter(|p| p.energy_score < 3.0 && p.stress_score > 7.0).count();
    let high_stress_count = points.iter().filter(|p| p.stress_score > 7.0).count();
    let low_energy_count = points.iter().filter(|p| p.energy_score < 3.0).count();

    let burnout_risk = if burnout_count > 4 {
        RiskLevel::High
    } else if burnout_count > 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    let stress_level = if high_stress_count > 10 {
        RiskLevel::High
    } else if high_stress_count > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    let energy_level = if low_energy_count > 10 {
        RiskLevel::High
    } else if low_energy_count > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskIndicators {
        burnout_risk,
        stress_level,
        energy_level,
        needs_intervention: burnout_count > 4 || high_stress_count > 15,
    }
}

fn argmax(xs: &[f64]) -> usize {
    xs.iter().enumerate().fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) }).0
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: DateTime<Utc>, end: DateTime<Utc>, energy: f64, stress: f64) -> Event {
        let mut e = Event::new_ongoing("alice", "t".into(), "s".into(), "story".into(), start, end);
        e.energy_level = energy;
        e.stress_level = stress;
        e
    }

    #[test]
    fn event_impacts_uses_direct_deltas_inside_event() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let end = start + Duration::minutes(30);
        let events = vec![event(start, end, 9.0, 2.0)];
        let (energy_delta, stress_delta, id) = event_impacts(&events, start + Duration::minutes(10));
        assert_eq!(energy_delta, 9.0 - 5.5);
        assert_eq!(stress_delta, 2.0 - 5.0);
        assert!(id.is_some());
    }

    #[test]
    fn event_impacts_decay_after_event_ends() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let end = start + Duration::minutes(30);
        let events = vec![event(start, end, 9.0, 2.0)];
        let (energy_delta, _stress_delta, id) = event_impacts(&events, end + Duration::hours(2));
        assert!(id.is_none());
        assert!(energy_delta.abs() < 0.5);
    }

    #[test]
    fn interaction_effects_drain_energy_under_high_stress() {
        let (energy, _stress) = apply_interaction_effects(5.0, 9.0);
        assert!(energy < 5.0);
    }

    #[test]
    fn interaction_effects_optimal_zone_boosts_energy() {
        let (energy, stress) = apply_interaction_effects(8.0, 2.0);
        assert!(energy > 8.0);
        assert!(stress < 2.0);
    }

    #[test]
    fn confidence_drops_with_time_since_event() {
        assert_eq!(confidence_score(true, None), 0.95);
        assert_eq!(confidence_score(false, Some(0.1)), 0.85);
        assert_eq!(confidence_score(false, Some(1.0)), 0.70);
        assert_eq!(confidence_score(false, Some(3.0)), 0.50);
        assert_eq!(confidence_score(false, Some(10.0)), 0.30);
        assert_eq!(confidence_score(false, None), 0.30);
    }

    #[test]
    fn assess_risks_flags_needs_intervention() {
        let points: Vec<MentalStatePoint> = (0..16)
            .map(|i| MentalStatePoint {
                timestamp: DateTime::from_timestamp(1_700_000_000 + i * 3600, 0).unwrap(),
                energy_score: 5.0,
                stress_score: 8.0,
                confidence: 0.5,
                data_source: MentalStateSource::Baseline,
                event_id: None,
            })
            .collect();
        let risks = assess_risks(&points);
        assert!(risks.needs_intervention);
    }
}
