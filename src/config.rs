// Copyright (c) 2026-present, mmap-flat-map contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Default ratio of `max_load` to capacity
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.875;

/// Options used when creating a fresh table
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Options {
    pub(crate) max_load_factor: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl Options {
    /// Sets the maximum load factor.
    ///
    /// The table accepts `ceil(capacity * max_load_factor)` elements and
    /// never more. Lower values keep probe sequences shorter at the cost of
    /// buffer space.
    ///
    /// Defaults to 0.875.
    ///
    /// # Panics
    ///
    /// Panics if the factor is not within `(0.0, 1.0]`.
    #[must_use]
    pub fn max_load_factor(mut self, factor: f32) -> Self {
        assert!(
            factor > 0.0 && factor <= 1.0,
            "max load factor must be within (0.0, 1.0]",
        );
        self.max_load_factor = factor;
        self
    }

    /// Returns the configured maximum load factor.
    #[must_use]
    pub fn get_max_load_factor(&self) -> f32 {
        self.max_load_factor
    }
}

/// Element count threshold for a capacity.
#[must_use]
pub fn max_load_for(capacity: usize, max_load_factor: f32) -> usize {
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "capacities are far below the f64 mantissa limit, the result is clamped"
    )]
    let max_load = (capacity as f64 * f64::from(max_load_factor)).ceil() as usize;

    max_load.min(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn max_load_rounds_up() {
        assert_eq!(3, max_load_for(3, DEFAULT_MAX_LOAD_FACTOR));
        assert_eq!(26, max_load_for(29, DEFAULT_MAX_LOAD_FACTOR));
        assert_eq!(15, max_load_for(29, 0.5));
        assert_eq!(29, max_load_for(29, 1.0));
        assert_eq!(0, max_load_for(0, DEFAULT_MAX_LOAD_FACTOR));
    }

    #[test]
    fn options_builder() {
        let options = Options::default();
        assert!((options.get_max_load_factor() - 0.875).abs() < f32::EPSILON);

        let options = options.max_load_factor(0.5);
        assert!((options.get_max_load_factor() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    #[should_panic(expected = "max load factor")]
    fn options_reject_zero_load_factor() {
        let _ = Options::default().max_load_factor(0.0);
    }
}
