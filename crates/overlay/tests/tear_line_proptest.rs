//! Property-based tests for the tear-safe scan line.
//! Verifies the wraparound rule holds for every panel height, not just the
//! reference panel.

#![allow(clippy::arithmetic_side_effects)]

use overlay::compute_tear_safe_line;

proptest::proptest! {
    /// The result always names a real scan line of the frame.
    #[test]
    fn tear_line_stays_in_frame(total in 1u32..4096, dst in 0u32..4096, lead in 0u32..64) {
        let dst = dst % total;
        let line = compute_tear_safe_line(dst, total, lead);
        assert!(line < total, "line {} outside frame of {} lines", line, total);
    }

    /// Within the frame, the line is exactly `lead` rows above the target.
    #[test]
    fn tear_line_subtracts_lead(dst in 0u32..4096, lead in 0u32..64) {
        if lead <= dst {
            assert_eq!(compute_tear_safe_line(dst, 4096, lead), dst - lead);
        }
    }

    /// Past the top, the line wraps into the previous frame.
    #[test]
    fn tear_line_wraps_backward(total in 64u32..4096, dst in 0u32..64, lead in 0u32..64) {
        if lead > dst {
            assert_eq!(
                compute_tear_safe_line(dst, total, lead),
                (total - 1) - (lead - dst)
            );
        }
    }

    /// Leads longer than the frame still land inside it.
    #[test]
    fn oversized_lead_stays_in_frame(total in 1u32..16, dst in 0u32..16, lead in 16u32..10_000) {
        let dst = dst % total;
        assert!(compute_tear_safe_line(dst, total, lead) < total);
    }
}

/// Worked examples on the 800-line reference panel.
#[test]
fn reference_panel_examples() {
    assert_eq!(compute_tear_safe_line(100, 800, 4), 96);
    assert_eq!(compute_tear_safe_line(1, 800, 4), 796);
    assert_eq!(compute_tear_safe_line(0, 0, 4), 0);
}
