//! Stage execution: serial and parallel.

pub mod parallel;
pub mod serial;

/// The outcome of running a stage (or a single branch within one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    FailedCritical,
    FailedNonCritical,
}

impl Verdict {
    pub fn from_step_result(critical: bool, succeeded: bool) -> Self {
        if succeeded {
            Verdict::Ok
        } else if critical {
            Verdict::FailedCritical
        } else {
            Verdict::FailedNonCritical
        }
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Verdict::Ok)
    }
}
