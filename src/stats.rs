//! Statistics aggregation.
//!
//! Walks the store's contact list and computes per-contact message counts
//! within the analysis window. The owner's own identifier is excluded when
//! the store can name it; a contact with no messages still yields
//! zero-valued stats so it stays visible in the graph.
//!
//! Failure handling is asymmetric on purpose: not being able to enumerate
//! contacts aborts the run, while a read failure for one contact's messages
//! only skips that contact.

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{ContactStats, TimeWindow};
use crate::progress::{ExtractProgressEvent, ExtractProgressReporter};
use crate::store::ChatStore;

/// How often the scan loop emits a progress event.
const PROGRESS_EVERY: u64 = 50;

pub async fn collect_stats(
    store: &dyn ChatStore,
    window: &TimeWindow,
    progress: &dyn ExtractProgressReporter,
) -> Result<Vec<ContactStats>> {
    let owner_id = store.owner_id().await;
    match &owner_id {
        Some(id) => debug!("owner identifier: {}", id),
        None => debug!("owner identifier unknown; no contact will be excluded"),
    }

    let contacts = store.list_contacts().await?;
    let total = contacts.len() as u64;
    progress.report(ExtractProgressEvent::Listing { total });

    let mut stats = Vec::with_capacity(contacts.len());
    let mut scanned = 0u64;
    let mut skipped = 0u64;

    for contact in contacts {
        scanned += 1;
        if scanned % PROGRESS_EVERY == 0 {
            progress.report(ExtractProgressEvent::Scanning { n: scanned, total });
        }

        if owner_id.as_deref() == Some(contact.id.as_str()) {
            continue;
        }

        let messages = match store.list_messages(&contact.id, window).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("skipping contact {}: {}", contact.id, e);
                skipped += 1;
                continue;
            }
        };

        if messages.is_empty() {
            stats.push(ContactStats::empty(contact));
            continue;
        }

        let outgoing = messages.iter().filter(|m| m.is_outgoing).count() as u64;
        let incoming = messages.len() as u64 - outgoing;
        stats.push(ContactStats::new(contact, outgoing, incoming));
    }

    if skipped > 0 {
        warn!("{} contact(s) skipped due to read errors", skipped);
    }
    debug!("aggregated statistics for {} contact(s)", stats.len());

    Ok(stats)
}
