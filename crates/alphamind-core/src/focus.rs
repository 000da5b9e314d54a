//! Converts completed focus intervals into productive hours.

use crate::error::ValidationError;
use crate::storage::ProgressConfig;

/// Hours credited per completed focus interval, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusCycles {
    hours_per_cycle: f64,
}

impl Default for FocusCycles {
    fn default() -> Self {
        Self::from_config(&ProgressConfig::default())
    }
}

impl FocusCycles {
    pub fn new(hours_per_cycle: f64) -> Self {
        Self { hours_per_cycle }
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(config.hours_per_cycle)
    }

    pub fn hours_per_cycle(&self) -> f64 {
        self.hours_per_cycle
    }

    /// Total hours for `cycles` completed intervals.
    pub fn hours(&self, cycles: u32) -> f64 {
        round2(f64::from(cycles) * self.hours_per_cycle)
    }

    /// Running total after one more interval on top of `prior` completed ones.
    pub fn complete_cycle(&self, prior: u32) -> f64 {
        self.hours(prior.saturating_add(1))
    }

    /// Best estimate of how many intervals produced `hours`.
    ///
    /// # Errors
    /// `InvalidValue` when `hours` stands for more intervals than can be counted.
    pub fn cycles_from_hours(&self, hours: f64) -> Result<u32, ValidationError> {
        if hours.is_nan() || hours <= 0.0 || self.hours_per_cycle <= 0.0 {
            return Ok(0);
        }
        let cycles = (hours / self.hours_per_cycle).round();
        if cycles >= f64::from(u32::MAX) {
            return Err(ValidationError::InvalidValue {
                field: "productive_hours".to_string(),
                message: format!("{hours} hours is beyond the focus cycle count"),
            });
        }
        Ok(cycles as u32)
    }

    /// Cycle count and running total once one more interval lands on top of
    /// `prior_hours`.
    pub fn next_after(&self, prior_hours: f64) -> Result<(u32, f64), ValidationError> {
        let cycles = self.cycles_from_hours(prior_hours)?.saturating_add(1);
        Ok((cycles, self.hours(cycles)))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_cycles_is_one_point_two_six_hours() {
        let focus = FocusCycles::default();
        assert_eq!(focus.hours(3), 1.26);
        assert_eq!(focus.complete_cycle(2), 1.26);
    }

    #[test]
    fn zero_cycles_is_zero_hours() {
        assert_eq!(FocusCycles::default().hours(0), 0.0);
    }

    #[test]
    fn cycles_are_recovered_from_stored_hours() {
        let focus = FocusCycles::default();
        for cycles in [0, 1, 3, 7, 24] {
            assert_eq!(focus.cycles_from_hours(focus.hours(cycles)), Ok(cycles));
        }
        assert_eq!(focus.cycles_from_hours(-1.0), Ok(0));
        assert_eq!(focus.cycles_from_hours(f64::NAN), Ok(0));
    }

    #[test]
    fn next_after_adds_one_cycle() {
        let focus = FocusCycles::default();
        assert_eq!(focus.next_after(0.0), Ok((1, 0.42)));
        assert_eq!(focus.next_after(0.84), Ok((3, 1.26)));
    }

    #[test]
    fn oversized_totals_are_rejected() {
        let focus = FocusCycles::default();
        assert!(matches!(
            focus.cycles_from_hours(1e10),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(focus.cycles_from_hours(f64::INFINITY).is_err());
        assert!(focus.next_after(1e10).is_err());
    }

    #[test]
    fn custom_rate() {
        let focus = FocusCycles::new(0.5);
        assert_eq!(focus.hours(3), 1.5);
    }
}
