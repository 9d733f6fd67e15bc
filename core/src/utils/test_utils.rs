use parking_lot::Mutex;

use crate::split::Split;
use crate::writer::SplitReporter;

/// Keeps every truncation warning as `(observed, max)`.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    warnings: Mutex<Vec<(usize, usize)>>,
}

impl RecordingReporter {
    pub(crate) fn warnings(&self) -> Vec<(usize, usize)> {
        self.warnings.lock().clone()
    }
}

impl SplitReporter for RecordingReporter {
    fn max_locations_exceeded(&self, _split: &dyn Split, observed: usize, max: usize) {
        self.warnings.lock().push((observed, max));
    }
}
