//! Aggregation engine: pure functions from entity snapshots to derived views.
//!
//! Nothing here touches the store or mutates its inputs. Sparse data (missing
//! joins, empty collections) degrades to zero or empty outputs; no function in
//! this module returns an error.

pub mod attendance;
pub mod grades;
pub mod rollups;

/// One-decimal rounding used for every presented percentage:
/// `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_off_half_up() {
        assert_eq!(round_off_1_decimal(0.0), 0.0);
        assert_eq!(round_off_1_decimal(3.54), 3.5);
        assert_eq!(round_off_1_decimal(3.55), 3.6);
        assert_eq!(round_off_1_decimal(200.0 / 3.0), 66.7);
    }
}
