//! Trigger engine (§4.7): a pure predicate deciding whether conditions
//! warrant synthesizing a new indicator. Takes no action itself — it only
//! reports a decision and the reasons behind it.

use crate::types::{TriggerConditions, TriggerDecision};

/// Rolling 30-day IC below this level counts as underperformance.
pub const IC_UNDERPERFORMANCE_THRESHOLD: f64 = 0.02;

/// Consecutive days of IC decay before the decay condition fires.
pub const DECAY_DAYS_THRESHOLD: u32 = 5;

/// Minimum days since the last synthesis attempt before trying again.
pub const COOLDOWN_DAYS: u32 = 30;

/// Mean of the most recent `min(30, history.len())` IC values.
///
/// `history` is ordered oldest-to-newest, as every other series in this
/// crate is.
pub fn rolling_ic_30day(history: &[f64]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let window = history.len().min(30);
    let recent = &history[history.len() - window..];
    recent.iter().sum::<f64>() / window as f64
}

/// Count consecutive decaying entries walking `history` from newest to
/// oldest: an entry counts if it is below `threshold` or strictly less
/// than the next-newer entry; counting stops at the first entry that is
/// both at-or-above `threshold` and not declining.
pub fn decay_days(history: &[f64], threshold: f64) -> u32 {
    let n = history.len();
    if n == 0 {
        return 0;
    }
    let mut count = 0u32;
    for i in (0..n).rev() {
        let below_threshold = history[i] < threshold;
        let declining = i + 1 < n && history[i] < history[i + 1];
        if below_threshold || declining {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// Decide whether generation should trigger.
///
/// Firing requires every one of: a detected regime gap, rolling 30-day IC
/// below the underperformance threshold, sustained IC decay, the
/// cool-down having elapsed, and spare indicator capacity. All five are
/// necessary — any one condition failing blocks the trigger.
/// `days_since_last_attempt = None` means generation has never been
/// attempted and always satisfies the cool-down.
pub fn should_trigger_generation(conditions: &TriggerConditions) -> TriggerDecision {
    let mut reasons = Vec::new();

    let regime_gap = conditions.regime_gap_detected;
    if !regime_gap {
        reasons.push("no regime gap detected".to_string());
    }

    let ic_below_threshold = conditions.rolling_ic_30day < IC_UNDERPERFORMANCE_THRESHOLD;
    if !ic_below_threshold {
        reasons.push(format!(
            "rolling 30-day IC {:.4} not below underperformance threshold {:.4}",
            conditions.rolling_ic_30day, IC_UNDERPERFORMANCE_THRESHOLD
        ));
    }

    let decaying = conditions.ic_decay_days >= DECAY_DAYS_THRESHOLD;
    if !decaying {
        reasons.push(format!(
            "IC decay streak {} below required {} consecutive days",
            conditions.ic_decay_days, DECAY_DAYS_THRESHOLD
        ));
    }

    let underperforming = ic_below_threshold || decaying;

    let cooldown_satisfied = conditions
        .days_since_last_attempt
        .map(|d| d >= COOLDOWN_DAYS)
        .unwrap_or(true);
    if !cooldown_satisfied {
        reasons.push(format!(
            "cool-down not satisfied ({} days since last attempt, need >= {})",
            conditions.days_since_last_attempt.unwrap_or(0),
            COOLDOWN_DAYS
        ));
    }

    let capacity_available = conditions.active_indicator_count < conditions.max_indicator_capacity;
    if !capacity_available {
        reasons.push(format!(
            "indicator capacity reached ({}/{})",
            conditions.active_indicator_count, conditions.max_indicator_capacity
        ));
    }

    let should_trigger = regime_gap
        && underperforming
        && ic_below_threshold
        && decaying
        && cooldown_satisfied
        && capacity_available;

    let summary = if should_trigger {
        "trigger conditions met; proceeding to indicator synthesis".to_string()
    } else if !regime_gap {
        "no regime gap detected; synthesis not warranted".to_string()
    } else if !ic_below_threshold || !decaying {
        "regime gap present but IC has not sufficiently underperformed or decayed".to_string()
    } else if !cooldown_satisfied {
        "trigger signal present but blocked by cool-down".to_string()
    } else {
        "trigger signal present but blocked by indicator capacity".to_string()
    };

    TriggerDecision {
        should_trigger,
        reasons,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_conditions() -> TriggerConditions {
        TriggerConditions {
            regime_gap_detected: true,
            rolling_ic_30day: 0.01,
            ic_decay_days: 7,
            days_since_last_attempt: Some(45),
            active_indicator_count: 10,
            max_indicator_capacity: 20,
        }
    }

    #[test]
    fn test_seed_scenario_s6_triggers() {
        let decision = should_trigger_generation(&base_conditions());
        assert!(decision.should_trigger);
    }

    #[test]
    fn test_seed_scenario_s6_cooldown_blocks() {
        let mut c = base_conditions();
        c.days_since_last_attempt = Some(20);
        let decision = should_trigger_generation(&c);
        assert!(!decision.should_trigger);
        assert!(decision.reasons.iter().any(|r| r.contains("cool-down")));
    }

    #[test]
    fn test_no_trigger_when_all_healthy() {
        let mut c = base_conditions();
        c.regime_gap_detected = false;
        c.rolling_ic_30day = 0.05;
        c.ic_decay_days = 0;
        let decision = should_trigger_generation(&c);
        assert!(!decision.should_trigger);
    }

    #[test]
    fn test_regime_gap_alone_is_not_sufficient() {
        let mut c = base_conditions();
        c.rolling_ic_30day = 0.05;
        c.ic_decay_days = 0;
        let decision = should_trigger_generation(&c);
        assert!(!decision.should_trigger);
    }

    #[test]
    fn test_never_attempted_satisfies_cooldown() {
        let mut c = base_conditions();
        c.days_since_last_attempt = None;
        let decision = should_trigger_generation(&c);
        assert!(decision.should_trigger);
    }

    #[test]
    fn test_capacity_blocks_trigger() {
        let mut c = base_conditions();
        c.active_indicator_count = 20;
        c.max_indicator_capacity = 20;
        let decision = should_trigger_generation(&c);
        assert!(!decision.should_trigger);
        assert!(decision.reasons.iter().any(|r| r.contains("capacity")));
    }

    #[test]
    fn test_monotonic_in_days_since_last_attempt() {
        let mut blocked = base_conditions();
        blocked.days_since_last_attempt = Some(10);
        let mut allowed = base_conditions();
        allowed.days_since_last_attempt = Some(60);
        let d_blocked = should_trigger_generation(&blocked);
        let d_allowed = should_trigger_generation(&allowed);
        assert!(!d_blocked.should_trigger);
        assert!(d_allowed.should_trigger);
    }

    #[test]
    fn test_monotonic_non_increasing_in_active_indicator_count() {
        let mut low = base_conditions();
        low.active_indicator_count = 10;
        let mut high = base_conditions();
        high.active_indicator_count = high.max_indicator_capacity;
        let d_low = should_trigger_generation(&low);
        let d_high = should_trigger_generation(&high);
        assert!(d_low.should_trigger);
        assert!(!d_high.should_trigger);
    }

    #[test]
    fn test_rolling_ic_30day_averages_recent_window() {
        let history: Vec<f64> = (0..40).map(|i| i as f64 * 0.001).collect();
        let rolling = rolling_ic_30day(&history);
        let expected: f64 = history[10..].iter().sum::<f64>() / 30.0;
        assert!((rolling - expected).abs() < 1e-12);
    }

    #[test]
    fn test_rolling_ic_30day_short_history_uses_full_length() {
        let history = vec![0.01, 0.02, 0.03];
        let rolling = rolling_ic_30day(&history);
        assert!((rolling - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_decay_days_counts_consecutive_declining_or_below_threshold() {
        // Oldest to newest: healthy, healthy, then three consecutive
        // entries below the 0.02 threshold.
        let history = vec![0.05, 0.05, 0.03, 0.015, 0.01, 0.005];
        let count = decay_days(&history, 0.02);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_decay_days_zero_when_latest_is_healthy_and_not_declining() {
        let history = vec![0.01, 0.02, 0.03, 0.05];
        let count = decay_days(&history, 0.02);
        assert_eq!(count, 0);
    }
}
