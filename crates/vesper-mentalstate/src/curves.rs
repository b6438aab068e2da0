//! Circadian baseline curves, ported point-for-point from
//! `mental_state_service.py`'s `energy_curve`/`stress_curve` dicts.

/// (hour, energy) anchor points, ascending by hour.
pub const ENERGY_CURVE: &[(i64, f64)] = &[
    (0, 3.0),
    (3, 2.5),
    (6, 4.0),
    (9, 6.5),
    (11, 7.5),
    (13, 6.0),
    (14, 5.5),
    (16, 6.5),
    (18, 6.0),
    (20, 5.0),
    (21, 4.5),
    (23, 3.5),
];

/// (hour, stress) anchor points, ascending by hour.
pub const STRESS_CURVE: &[(i64, f64)] = &[
    (0, 1.5),
    (3, 1.0),
    (6, 2.0),
    (9, 4.0),
    (12, 5.0),
    (15, 5.5),
    (18, 4.0),
    (21, 2.5),
    (23, 1.8),
];

fn value_at(curve: &[(i64, f64)], hour: i64) -> f64 {
    curve.iter().find(|&&(h, _)| h == hour).map(|&(_, v)| v).unwrap_or(0.0)
}

/// Linear interpolation between the two anchor points surrounding `hour`,
/// wrapping around midnight. `hour` is a decimal hour-of-day (`hour +
/// minute/60.0`).
pub fn interpolate_curve(curve: &[(i64, f64)], hour: f64) -> f64 {
    let prev_hour = curve
        .iter()
        .map(|&(h, _)| h)
        .filter(|&h| (h as f64) <= hour)
        .max()
        .unwrap_or_else(|| curve.last().unwrap().0 - 24);
    let next_hour = curve
        .iter()
        .map(|&(h, _)| h)
        .filter(|&h| (h as f64) > hour)
        .min()
        .unwrap_or_else(|| curve.first().unwrap().0 + 24);

    let mut prev_hour = prev_hour;
    let mut next_hour = next_hour;
    if (prev_hour as f64) > hour {
        prev_hour -= 24;
    }
    if (next_hour as f64) < hour {
        next_hour += 24;
    }

    let prev_val = value_at(curve, prev_hour.rem_euclid(24));
    let next_val = value_at(curve, next_hour.rem_euclid(24));

    if next_hour == prev_hour {
        return prev_val;
    }

    let alpha = (hour - prev_hour as f64) / (next_hour - prev_hour) as f64;
    prev_val + alpha * (next_val - prev_val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_anchor_returns_anchor_value() {
        assert_eq!(interpolate_curve(ENERGY_CURVE, 11.0), 7.5);
    }

    #[test]
    fn interpolates_between_anchors() {
        let v = interpolate_curve(ENERGY_CURVE, 12.0);
        assert!(v > 6.0 && v < 7.5);
    }

    #[test]
    fn wraps_around_midnight() {
        let v = interpolate_curve(ENERGY_CURVE, 23.75);
        assert!(v > 3.0 && v < 3.5);
    }
}
