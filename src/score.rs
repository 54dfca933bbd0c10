//! Interaction scoring.
//!
//! Converts per-contact message statistics into a bounded `[0, 100]`
//! relationship-strength score. Three components multiply together:
//!
//! 1. a log-damped volume base, so high-traffic groups don't dominate;
//! 2. a balance term in `[0, 1]` rewarding bidirectional exchange:
//!    one-way inbound traffic (broadcast-style senders) caps low, one-way
//!    outbound slightly higher, symmetric exchange approaches 1.0;
//! 3. a group factor discounting group conversations by the owner's
//!    participation rate.

use crate::models::{ContactStats, ScoredContact};

/// Pure scoring function. A contact with no messages scores exactly 0.
pub fn interaction_score(stats: &ContactStats) -> f64 {
    let total = stats.total_count;
    let outgoing = stats.outgoing_count;
    let incoming = stats.incoming_count;

    if total == 0 {
        return 0.0;
    }

    let base = (total as f64 + 1.0).ln() * 10.0;

    let balance = if outgoing == 0 {
        // Only the other side talks (official accounts, notification bots).
        0.15 + (0.05 * (incoming as f64 + 1.0).ln()).min(0.15)
    } else if incoming == 0 {
        // Only the owner talks; attention given but not returned.
        0.25 + (0.05 * (outgoing as f64 + 1.0).ln()).min(0.15)
    } else {
        let ratio = outgoing.min(incoming) as f64 / outgoing.max(incoming) as f64;
        0.5 + ratio * 0.5
    };

    let group_factor = if stats.contact.is_group() {
        let speak_ratio = outgoing as f64 / total as f64;
        if speak_ratio > 0.10 {
            0.9
        } else if speak_ratio > 0.05 {
            0.8
        } else {
            0.7
        }
    } else {
        1.0
    };

    (base * balance * group_factor).clamp(0.0, 100.0)
}

/// Score a batch, preserving order.
pub fn score_contacts(stats: Vec<ContactStats>) -> Vec<ScoredContact> {
    stats
        .into_iter()
        .map(|s| {
            let score = interaction_score(&s);
            ScoredContact::new(s, score)
        })
        .collect()
}
