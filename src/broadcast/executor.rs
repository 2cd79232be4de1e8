use std::time::Duration;

use tracing::{debug, info, warn};

use crate::store::ChatRef;
use crate::telegram::{ChatGateway, MessageRef, TelegramError};

/// Tally of one broadcast run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub success: usize,
    pub failed: usize,
}

/// Copies `source` to every destination, one at a time.
///
/// A flood wait is honored and the copy retried once; any error on the
/// retry counts as a failure. `delay` is slept after every destination,
/// whatever the outcome.
pub async fn broadcast_to_targets<G>(
    gateway: &G,
    destinations: &[ChatRef],
    source: MessageRef,
    delay: Duration,
) -> BroadcastReport
where
    G: ChatGateway + ?Sized,
{
    let mut report = BroadcastReport::default();
    info!(
        "Broadcasting message {} from {} to {} chats",
        source.message_id,
        source.chat_id,
        destinations.len()
    );

    for destination in destinations {
        match copy_with_retry(gateway, destination, source).await {
            Ok(()) => {
                debug!("Copied to {}", destination);
                report.success += 1;
            }
            Err(TelegramError::PeerUnavailable(reason)) => {
                warn!("Skipping {}: {}", destination, reason);
                report.failed += 1;
            }
            Err(e) => {
                warn!("Failed to copy to {}: {}", destination, e);
                report.failed += 1;
            }
        }

        tokio::time::sleep(delay).await;
    }

    info!(
        "Broadcast done: {} succeeded, {} failed",
        report.success, report.failed
    );
    report
}

async fn copy_with_retry<G>(
    gateway: &G,
    destination: &ChatRef,
    source: MessageRef,
) -> Result<(), TelegramError>
where
    G: ChatGateway + ?Sized,
{
    match gateway.copy_message(destination, source).await {
        Err(TelegramError::FloodWait(seconds)) => {
            warn!(
                "Flood wait while copying to {}, sleeping {}s before retrying",
                destination, seconds
            );
            tokio::time::sleep(Duration::from_secs(u64::from(seconds))).await;
            gateway.copy_message(destination, source).await
        }
        other => other,
    }
}
