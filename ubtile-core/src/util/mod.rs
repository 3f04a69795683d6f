//! Collection of integer utility functions used throughout tiling.
//!
//! All helpers operate on `i64` since shapes and byte counts are handled as signed 64-bit
//! values. Negative operands are not a supported use case. A zero divisor never faults: the
//! unchecked helpers return the numerator unchanged, while the `checked_*` helpers return `None`
//! so that callers which consider a zero divisor a configuration bug can report it.

/// Divide `x` by `y` and round up towards infinity. For example, `21/5 = 4.2` thus
/// `ceil_div(21, 5) == 5`. Returns `x` if `y` is zero.
#[inline]
pub fn ceil_div(x: i64, y: i64) -> i64 {
    checked_ceil_div(x, y).unwrap_or(x)
}

/// Like [`ceil_div`], but returns `None` if `y` is zero.
#[inline]
pub fn checked_ceil_div(x: i64, y: i64) -> Option<i64> {
    if y == 0 {
        return None;
    }

    let (q, r) = (x / y, x % y);
    if r != 0 && (x >= 0) == (y >= 0) {
        Some(q + 1)
    } else {
        Some(q)
    }
}

/// Round `x` down to the nearest multiple of `y`. Returns `x` if `y` is zero.
#[inline]
pub fn floor_align(x: i64, y: i64) -> i64 {
    checked_floor_align(x, y).unwrap_or(x)
}

/// Like [`floor_align`], but returns `None` if `y` is zero.
#[inline]
pub fn checked_floor_align(x: i64, y: i64) -> Option<i64> {
    if y == 0 {
        None
    } else {
        Some((x / y) * y)
    }
}

/// Round `x` up to the nearest multiple of `y`. Returns `x` if `y` is zero.
#[inline]
pub fn ceil_align(x: i64, y: i64) -> i64 {
    if y == 0 {
        x
    } else {
        ceil_div(x, y) * y
    }
}

/// Remainder of `x / y`, or `x` itself if `y` is zero.
#[inline]
pub fn rem_or_self(x: i64, y: i64) -> i64 {
    if y == 0 {
        x
    } else {
        x % y
    }
}

/// Largest power of two that is less than or equal to `v`, or `1` if `v < 2`.
pub fn nearest_power_of_two(v: i64) -> i64 {
    if v < 2 {
        1
    } else {
        1 << (63 - (v as u64).leading_zeros())
    }
}

/// Number of times `v` can be halved before it drops to one (`floor(log2(v))`).
pub fn floor_log2(mut v: i64) -> i64 {
    let mut n = 0;
    while v > 1 {
        v >>= 1;
        n += 1;
    }
    n
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(0, 5), 0);
        assert_eq!(ceil_div(1, 5), 1);
        assert_eq!(ceil_div(9, 5), 2);
        assert_eq!(ceil_div(10, 5), 2);
        assert_eq!(ceil_div(11, 5), 3);
        assert_eq!(ceil_div(6000, 4464), 2);

        // Division by zero hands back the numerator.
        assert_eq!(ceil_div(7, 0), 7);
        assert_eq!(checked_ceil_div(7, 0), None);
        assert_eq!(checked_ceil_div(7, 2), Some(4));
    }

    #[test]
    fn test_align() {
        assert_eq!(floor_align(17873, 32), 17856);
        assert_eq!(floor_align(31, 32), 0);
        assert_eq!(floor_align(64, 32), 64);
        assert_eq!(floor_align(13, 0), 13);
        assert_eq!(checked_floor_align(13, 0), None);

        assert_eq!(ceil_align(0, 32), 0);
        assert_eq!(ceil_align(1, 32), 32);
        assert_eq!(ceil_align(32, 32), 32);
        assert_eq!(ceil_align(33, 32), 64);
        assert_eq!(ceil_align(13, 0), 13);

        assert_eq!(rem_or_self(10, 4), 2);
        assert_eq!(rem_or_self(10, 0), 10);
    }

    #[test]
    fn test_align_randomized() {
        let mut rng = SmallRng::seed_from_u64(0);

        for _ in 0..1000 {
            let x = rng.gen_range(0..1_000_000i64);
            let block = 1 << rng.gen_range(0..10);

            let up = ceil_align(x, block);
            assert_eq!(up % block, 0);
            assert!(up >= x && up - x < block);

            let down = floor_align(x, block);
            assert_eq!(down % block, 0);
            assert!(down <= x && x - down < block);
        }
    }

    #[test]
    fn test_power_of_two() {
        assert_eq!(nearest_power_of_two(-3), 1);
        assert_eq!(nearest_power_of_two(0), 1);
        assert_eq!(nearest_power_of_two(1), 1);
        assert_eq!(nearest_power_of_two(2), 2);
        assert_eq!(nearest_power_of_two(3), 2);
        assert_eq!(nearest_power_of_two(1023), 512);
        assert_eq!(nearest_power_of_two(1024), 1024);
        assert_eq!(nearest_power_of_two(i64::MAX), 1 << 62);

        assert_eq!(floor_log2(0), 0);
        assert_eq!(floor_log2(1), 0);
        assert_eq!(floor_log2(2), 1);
        assert_eq!(floor_log2(7), 2);
        assert_eq!(floor_log2(1024), 10);
    }
}
