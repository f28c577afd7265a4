//! Bounded forward-fill imputation.
//!
//! Gaps up to `max_run` consecutive slots are filled with the last
//! observed value. Longer gaps stay unfilled — the signal's contribution
//! is lost for that span only, and the caller records an `ImputationGap`
//! for it. Leading gaps (no prior value to carry) are never fillable.

/// An unfillable span left behind after bounded forward-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnfilledSpan {
    /// Index of the first still-missing slot.
    pub start: usize,
    pub len: usize,
}

/// Forward-fill `column` in place, up to `max_run` consecutive slots per
/// gap. Returns the spans that remained unfilled.
pub fn forward_fill_bounded(column: &mut [Option<f64>], max_run: usize) -> Vec<UnfilledSpan> {
    let mut unfilled = Vec::new();
    let mut last_value: Option<f64> = None;
    let mut i = 0;

    while i < column.len() {
        match column[i] {
            Some(v) => {
                last_value = Some(v);
                i += 1;
            }
            None => {
                let gap_start = i;
                while i < column.len() && column[i].is_none() {
                    i += 1;
                }
                let gap_len = i - gap_start;

                match last_value {
                    Some(v) if gap_len <= max_run => {
                        for slot in &mut column[gap_start..gap_start + gap_len] {
                            *slot = Some(v);
                        }
                    }
                    _ => {
                        unfilled.push(UnfilledSpan {
                            start: gap_start,
                            len: gap_len,
                        });
                    }
                }
            }
        }
    }

    unfilled
}
