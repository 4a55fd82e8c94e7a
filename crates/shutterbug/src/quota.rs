//! Print quota tracker
//!
//! Counts dispatched prints and raises a warning every `print_quota` prints
//! so the operator knows to reload paper and ink. The warning is cleared
//! only by an explicit operator action (a shutdown-button press).

use std::path::Path;

use tracing::{debug, info, warn};

use crate::hardware::Printer;

/// Result of one [`QuotaTracker::record_print`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintOutcome {
    /// Printing is disabled; nothing was dispatched or counted.
    Skipped,
    /// Dispatched and counted.
    Recorded { count: u64, warning_raised: bool },
}

/// Print counter plus the recurring quota warning.
pub struct QuotaTracker {
    quota: u32,
    printing_enabled: bool,
    count: u64,
    warning: bool,
    printer: Box<dyn Printer>,
}

impl QuotaTracker {
    pub fn new(quota: u32, printing_enabled: bool, printer: Box<dyn Printer>) -> Self {
        Self {
            quota: quota.max(1),
            printing_enabled,
            count: 0,
            warning: false,
            printer,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn quota(&self) -> u32 {
        self.quota
    }

    pub fn warning(&self) -> bool {
        self.warning
    }

    pub fn printing_enabled(&self) -> bool {
        self.printing_enabled
    }

    /// Send a composite to the printer and count it.
    ///
    /// The count goes up even when the printer reports a failure; the
    /// spooler is fire-and-forget and its problems are only logged.
    pub fn record_print(&mut self, path: &Path) -> PrintOutcome {
        if !self.printing_enabled {
            debug!("printing disabled, not printing {}", path.display());
            return PrintOutcome::Skipped;
        }

        if let Err(e) = self.printer.dispatch(path) {
            warn!("print dispatch for {} failed: {}", path.display(), e);
        }

        self.count += 1;
        let warning_raised = self.count % u64::from(self.quota) == 0;
        if warning_raised {
            self.warning = true;
            info!(
                "print quota reached: {} prints (every {}), warning raised",
                self.count, self.quota
            );
        }

        PrintOutcome::Recorded {
            count: self.count,
            warning_raised,
        }
    }

    /// Clear the warning. Returns whether it was set.
    pub fn clear_warning(&mut self) -> bool {
        let was_set = self.warning;
        if was_set {
            info!("print quota warning cleared at {} prints", self.count);
        }
        self.warning = false;
        was_set
    }
}

impl std::fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("quota", &self.quota)
            .field("printing_enabled", &self.printing_enabled)
            .field("count", &self.count)
            .field("warning", &self.warning)
            .finish_non_exhaustive()
    }
}
