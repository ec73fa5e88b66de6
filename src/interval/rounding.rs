//! Rounding-mode discipline, collected in one module per the design notes:
//! every forward and projection primitive in [`super`] routes its bound
//! computation through [`widen_out`] rather than touching FPU control
//! registers directly. Stable Rust has no portable, safe way to flip the
//! hardware rounding mode, so outward rounding is approximated by computing
//! in round-to-nearest and then stepping each bound outward to the next
//! representable `f64` (and a few extra steps for the transcendental
//! functions, whose libm implementations are not guaranteed correctly
//! rounded). This keeps every bound a conservative superset at the cost of
//! a handful of ULPs of extra width — see the Open Questions entry in
//! `DESIGN.md`.

/// Number of ULPs of slack applied after elementary (correctly-rounded-ish)
/// arithmetic: `+ - * /`, `sqrt`.
const ELEMENTARY_SLACK: u32 = 1;

/// Slack applied after transcendental libm calls (`exp`, `log`, `sin`, `cos`,
/// `tan`), whose implementations may be off by a few ULPs.
const TRANSCENDENTAL_SLACK: u32 = 4;

fn step_down(mut x: f64, n: u32) -> f64 {
    for _ in 0..n {
        x = x.next_down();
    }
    x
}

fn step_up(mut x: f64, n: u32) -> f64 {
    for _ in 0..n {
        x = x.next_up();
    }
    x
}

/// Widens `(lo, hi)` outward by the elementary slack. `lo`/`hi` must already
/// be finite or infinite (never NaN).
pub fn widen_out(lo: f64, hi: f64) -> (f64, f64) {
    (step_down(lo, ELEMENTARY_SLACK), step_up(hi, ELEMENTARY_SLACK))
}

/// Widens outward by the transcendental slack.
pub fn widen_out_transcendental(lo: f64, hi: f64) -> (f64, f64) {
    (
        step_down(lo, TRANSCENDENTAL_SLACK),
        step_up(hi, TRANSCENDENTAL_SLACK),
    )
}

/// Rounds a single value downward (used when only a lower bound is derived).
pub fn round_down(x: f64) -> f64 {
    step_down(x, ELEMENTARY_SLACK)
}

/// Rounds a single value upward (used when only an upper bound is derived).
pub fn round_up(x: f64) -> f64 {
    step_up(x, ELEMENTARY_SLACK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_out_is_strictly_outward_on_ordinary_values() {
        let (lo, hi) = widen_out(1.0, 2.0);
        assert!(lo < 1.0);
        assert!(hi > 2.0);
    }

    #[test]
    fn widen_out_preserves_infinities() {
        let (lo, hi) = widen_out(f64::NEG_INFINITY, f64::INFINITY);
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }
}
