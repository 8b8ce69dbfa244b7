use tracing::{error, info};

use crate::positions::position::PositionId;

pub const SNAPSHOT_FAILED_MESSAGE: &str = "Failed to fetch positions, try again later.";
pub const TICK_STREAM_FAILED_MESSAGE: &str =
    "Failed to fetch current prices. Displayed values may be outdated.";

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// Routes notifications into the application log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        info!(target: "notifications", "{message}");
    }

    fn notify_error(&self, message: &str) {
        error!(target: "notifications", "{message}");
    }
}

pub fn closed_positions_message(ids: &[PositionId]) -> String {
    let ids = ids
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!("Closed position no. {ids}.")
}
