//! Interval math shared by availability scans and booking validation.
//!
//! All intervals are half-open: an appointment occupies `[start, end)`, so
//! one ending at 11:00 never conflicts with one starting at 11:00.

pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

/// A candidate must lie entirely inside one schedule interval. Two adjacent
/// intervals are never merged, so a candidate spanning their shared boundary
/// does not fit either of them.
pub fn fits_within_schedule<T: PartialOrd>(
    candidate_start: T,
    candidate_end: T,
    schedule_start: T,
    schedule_end: T,
) -> bool {
    candidate_start >= schedule_start && candidate_end <= schedule_end
}
