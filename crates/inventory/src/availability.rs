//! Derived availability state.

use serde::{Deserialize, Serialize};

/// Derived view of one record's sellable state.
///
/// `available` is the only trustworthy "can I sell this?" signal; callers must
/// never trust externally supplied values for these fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: u64,
    pub is_out_of_stock: bool,
    pub is_low_stock: bool,
}

impl Availability {
    /// Recompute the derived fields from the raw counters.
    ///
    /// `available = max(0, total - reserved - sold)`, in saturating arithmetic.
    pub fn recompute(total: u64, reserved: u64, sold: u64, threshold: u64) -> Self {
        let available = total.saturating_sub(reserved).saturating_sub(sold);
        Self {
            available,
            is_out_of_stock: available == 0,
            is_low_stock: available > 0 && available <= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fully_stocked_record_is_neither_low_nor_out() {
        let a = Availability::recompute(10, 0, 0, 5);
        assert_eq!(a.available, 10);
        assert!(!a.is_out_of_stock);
        assert!(!a.is_low_stock);
    }

    #[test]
    fn available_at_threshold_is_low() {
        let a = Availability::recompute(10, 3, 2, 5);
        assert_eq!(a.available, 5);
        assert!(a.is_low_stock);
        assert!(!a.is_out_of_stock);
    }

    #[test]
    fn zero_available_is_out_not_low() {
        let a = Availability::recompute(10, 4, 6, 5);
        assert_eq!(a.available, 0);
        assert!(a.is_out_of_stock);
        assert!(!a.is_low_stock);
    }

    #[test]
    fn overcommitted_counters_clamp_to_zero() {
        let a = Availability::recompute(5, 4, 3, 2);
        assert_eq!(a.available, 0);
        assert!(a.is_out_of_stock);
    }

    #[test]
    fn zero_threshold_never_reports_low() {
        let a = Availability::recompute(10, 0, 9, 0);
        assert_eq!(a.available, 1);
        assert!(!a.is_low_stock);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for all counters, `available = max(0, total - reserved - sold)`,
        /// out-of-stock iff available is zero, low iff 0 < available <= threshold.
        #[test]
        fn derived_fields_follow_counters(
            total in 0u64..1_000_000,
            reserved in 0u64..1_000_000,
            sold in 0u64..1_000_000,
            threshold in 0u64..1_000,
        ) {
            let a = Availability::recompute(total, reserved, sold, threshold);

            let expected = (total as i128 - reserved as i128 - sold as i128).max(0) as u64;
            prop_assert_eq!(a.available, expected);
            prop_assert_eq!(a.is_out_of_stock, a.available == 0);
            prop_assert_eq!(a.is_low_stock, a.available > 0 && a.available <= threshold);
            prop_assert!(!(a.is_out_of_stock && a.is_low_stock));
        }
    }
}
