use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Inclusive minute range a configured duration is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationBounds {
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl DurationBounds {
    pub const fn new(min_minutes: u32, max_minutes: u32) -> Self {
        Self {
            min_minutes,
            max_minutes,
        }
    }

    pub fn clamp(&self, minutes: u32) -> u32 {
        minutes.clamp(self.min_minutes, self.max_minutes)
    }

    fn validate(&self, field: &str) -> Result<()> {
        if self.min_minutes == 0 {
            return Err(CoreError::invalid_config(field, "lower bound must be at least one minute"));
        }
        if self.min_minutes > self.max_minutes {
            return Err(CoreError::invalid_config(
                field,
                format!(
                    "lower bound {} exceeds upper bound {}",
                    self.min_minutes, self.max_minutes
                ),
            ));
        }
        Ok(())
    }
}

pub const DEFAULT_WORK_BOUNDS: DurationBounds = DurationBounds::new(20, 120);
pub const DEFAULT_REST_BOUNDS: DurationBounds = DurationBounds::new(1, 10);

/// Rules the state machine applies to user input and phase entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPolicy {
    pub work_bounds: DurationBounds,
    pub rest_bounds: DurationBounds,
    /// Block input during rests too.
    pub hard_mode: bool,
    /// Rest overlay messages, rotated by completed cycle count.
    pub break_activities: Vec<String>,
    pub night_message: String,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            work_bounds: DEFAULT_WORK_BOUNDS,
            rest_bounds: DEFAULT_REST_BOUNDS,
            hard_mode: false,
            break_activities: default_break_activities(),
            night_message: default_night_message(),
        }
    }
}

impl SessionPolicy {
    pub fn validate(&self) -> Result<()> {
        self.work_bounds.validate("work_bounds")?;
        self.rest_bounds.validate("rest_bounds")
    }

    /// Validate and clamp requested minutes, returning (work, rest) seconds.
    ///
    /// Zero is rejected rather than clamped: it is never a meaningful request.
    pub fn durations(&self, work_minutes: u32, rest_minutes: u32) -> Result<(u64, u64)> {
        if work_minutes == 0 {
            return Err(CoreError::invalid_config("work_minutes", "must be greater than zero"));
        }
        if rest_minutes == 0 {
            return Err(CoreError::invalid_config("rest_minutes", "must be greater than zero"));
        }
        let work = self.work_bounds.clamp(work_minutes);
        let rest = self.rest_bounds.clamp(rest_minutes);
        if work != work_minutes || rest != rest_minutes {
            tracing::debug!(
                requested_work = work_minutes,
                requested_rest = rest_minutes,
                work,
                rest,
                "durations clamped to policy bounds"
            );
        }
        Ok((u64::from(work) * 60, u64::from(rest) * 60))
    }

    pub fn break_message(&self, cycle: u32) -> &str {
        if self.break_activities.is_empty() {
            return "Break time";
        }
        let idx = cycle as usize % self.break_activities.len();
        &self.break_activities[idx]
    }
}

/// Parse a user-typed minute count.
pub fn parse_minutes(field: &str, input: &str) -> Result<u32> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| CoreError::invalid_config(field, format!("'{input}' is not a whole number of minutes")))
}

pub fn default_break_activities() -> Vec<String> {
    [
        "Take time to read and reflect",
        "Step away from the screen and rest your eyes",
        "Go for a short walk",
        "Do some light stretching",
        "Practice deep breathing",
        "Hydrate yourself",
        "Tidy up your workspace",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub fn default_night_message() -> String {
    "It's late night hours. Please get some rest.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_clamped_into_bounds() {
        let policy = SessionPolicy::default();
        assert_eq!(policy.durations(25, 5).unwrap(), (1500, 300));
        assert_eq!(policy.durations(5, 30).unwrap(), (1200, 600));
        assert_eq!(policy.durations(500, 1).unwrap(), (7200, 60));
    }

    #[test]
    fn zero_minutes_is_invalid_config() {
        let policy = SessionPolicy::default();
        let err = policy.durations(0, 5).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { ref field, .. } if field == "work_minutes"));
        assert!(policy.durations(25, 0).is_err());
    }

    #[test]
    fn non_numeric_minutes_is_invalid_config() {
        assert_eq!(parse_minutes("work_minutes", " 45 ").unwrap(), 45);
        assert!(matches!(
            parse_minutes("work_minutes", "forty"),
            Err(CoreError::InvalidConfig { .. })
        ));
        assert!(parse_minutes("rest_minutes", "-3").is_err());
    }

    #[test]
    fn inverted_bounds_fail_validation() {
        let policy = SessionPolicy {
            work_bounds: DurationBounds::new(90, 30),
            ..SessionPolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(SessionPolicy::default().validate().is_ok());
    }

    #[test]
    fn break_messages_rotate_by_cycle() {
        let policy = SessionPolicy {
            break_activities: vec!["a".into(), "b".into()],
            ..SessionPolicy::default()
        };
        assert_eq!(policy.break_message(0), "a");
        assert_eq!(policy.break_message(1), "b");
        assert_eq!(policy.break_message(2), "a");

        let empty = SessionPolicy {
            break_activities: vec![],
            ..SessionPolicy::default()
        };
        assert_eq!(empty.break_message(3), "Break time");
    }
}
