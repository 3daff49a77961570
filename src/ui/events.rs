use crate::error::LookupError;
use crate::lookup::SearchReport;
use crate::store::SearchSnapshot;

/// Messages sent from background lookups to the UI loop.
pub(crate) enum BackgroundEvent {
    /// One more request settled.
    Progress { completed: usize, total: usize },
    /// The search is over; `snapshot` is what it was started with.
    SearchFinished {
        snapshot: SearchSnapshot,
        outcome: Result<SearchReport, LookupError>,
    },
}
