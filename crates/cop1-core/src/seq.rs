//! Modulo-256 sequence number comparisons.
//!
//! COP-1 frame sequence numbers wrap at 256, so "before" and "after" only
//! have a meaning relative to a window of `K` numbers. Every decision the
//! FOP takes about a reported N(R) goes through these functions.

/// Returns `true` if `b` is one of the `window` numbers immediately
/// following `a`, i.e. `a < b` within the window.
#[must_use]
pub fn less_than(a: u8, b: u8, window: u8) -> bool {
    let distance = b.wrapping_sub(a);
    distance != 0 && distance <= window
}

/// Returns `true` if `a` is one of the `window` numbers immediately
/// following `b`, i.e. `a > b` within the window.
#[must_use]
pub fn greater_than(a: u8, b: u8, window: u8) -> bool {
    less_than(b, a, window)
}

/// `a >= b` within the window.
#[must_use]
pub fn greater_or_equal(a: u8, b: u8, window: u8) -> bool {
    a == b || greater_than(a, b, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn less_than_is_mirror_of_greater_than() {
        for window in 1..=255u8 {
            for a in [0u8, 1, 7, 127, 128, 200, 250, 255] {
                for b in 0..=255u8 {
                    assert_eq!(
                        less_than(a, b, window),
                        greater_than(b, a, window),
                        "a={a} b={b} k={window}"
                    );
                }
            }
        }
    }

    #[test]
    fn window_across_wraparound() {
        let inside: Vec<u8> = (251..=255).chain(0..=4).collect();
        for b in 0..=255u8 {
            assert_eq!(less_than(250, b, 10), inside.contains(&b), "b={b}");
        }
    }

    #[test]
    fn equal_numbers_are_never_less_or_greater() {
        for window in [1u8, 10, 255] {
            assert!(!less_than(42, 42, window));
            assert!(!greater_than(42, 42, window));
            assert!(greater_or_equal(42, 42, window));
        }
    }

    #[test]
    fn window_of_one() {
        assert!(less_than(255, 0, 1));
        assert!(!less_than(255, 1, 1));
        assert!(greater_or_equal(0, 255, 1));
        assert!(!greater_or_equal(1, 255, 1));
    }
}
