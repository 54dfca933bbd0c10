//! Core data models used throughout chatgraph.
//!
//! These types represent the contacts, message records, and per-contact
//! statistics that flow through the extraction and scoring pipeline. They
//! are constructed once per run and never mutated afterwards; the
//! constructors enforce the invariants so downstream code can rely on them.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::error::{AnalysisError, Result};

/// Identifier suffix marking a group conversation.
pub const GROUP_SUFFIX: &str = "@chatroom";

/// Identifier prefix marking an official (broadcast-style) account.
pub const OFFICIAL_PREFIX: &str = "gh_";

/// A conversation partner or group addressable by a unique identifier.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    /// Display name: nickname, falling back to the user-set remark, falling
    /// back to the identifier itself.
    pub name: String,
}

impl Contact {
    pub fn new(id: impl Into<String>, nickname: Option<String>, remark: Option<String>) -> Self {
        let id = id.into();
        let name = nickname
            .filter(|s| !s.is_empty())
            .or_else(|| remark.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| id.clone());
        Self { id, name }
    }

    pub fn is_group(&self) -> bool {
        self.id.ends_with(GROUP_SUFFIX)
    }

    pub fn is_official(&self) -> bool {
        self.id.starts_with(OFFICIAL_PREFIX)
    }
}

/// A single message within a contact's window.
#[derive(Debug, Clone, Copy)]
pub struct MessageRecord {
    pub timestamp: DateTime<Utc>,
    /// True when the account owner sent the message.
    pub is_outgoing: bool,
}

/// Inclusive analysis window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(AnalysisError::InvalidTimeRange(format!(
                "start {} is after end {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a window from two optional calendar dates (`YYYY-MM-DD`).
    ///
    /// The end bound is widened to 23:59:59 of its day so a single-day
    /// window covers the whole day. With both dates absent the window is
    /// the 365 days ending now.
    pub fn from_dates(since: Option<&str>, until: Option<&str>) -> Result<Self> {
        let now = Utc::now();
        let start = match since {
            Some(s) => {
                let date = parse_date(s)?;
                Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
            }
            None => now - Duration::days(365),
        };
        let end = match until {
            Some(s) => {
                let date = parse_date(s)?;
                Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap())
            }
            None => now,
        };
        Self::new(start, end)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Window bounds formatted for the artifact (`time_range`).
    pub fn labels(&self) -> [String; 2] {
        [
            self.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.end.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| AnalysisError::InvalidTimeRange(format!("'{}': {}", s, e)))
}

/// Per-contact message statistics within the analysis window.
///
/// `outgoing + incoming == total` and `0 <= send_ratio <= 1` hold by
/// construction.
#[derive(Debug, Clone)]
pub struct ContactStats {
    pub contact: Contact,
    pub total_count: u64,
    pub outgoing_count: u64,
    pub incoming_count: u64,
    pub send_ratio: f64,
}

impl ContactStats {
    pub fn new(contact: Contact, outgoing: u64, incoming: u64) -> Self {
        let total = outgoing + incoming;
        let send_ratio = if total > 0 {
            outgoing as f64 / total as f64
        } else {
            0.0
        };
        Self {
            contact,
            total_count: total,
            outgoing_count: outgoing,
            incoming_count: incoming,
            send_ratio,
        }
    }

    /// A contact with no messages in the window. Kept in the output so the
    /// contact stays visible in the graph with score 0.
    pub fn empty(contact: Contact) -> Self {
        Self::new(contact, 0, 0)
    }
}

/// ContactStats plus the computed interaction score in `[0, 100]`.
#[derive(Debug, Clone)]
pub struct ScoredContact {
    pub stats: ContactStats,
    pub interaction_score: f64,
}

impl ScoredContact {
    pub fn new(stats: ContactStats, interaction_score: f64) -> Self {
        debug_assert!((0.0..=100.0).contains(&interaction_score));
        Self {
            stats,
            interaction_score,
        }
    }
}

/// Per-contact detail record mirrored into the artifact's `nodeDetails`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub id: String,
    pub name: String,
    pub total_msgs: u64,
    pub sent_msgs: u64,
    pub received_msgs: u64,
    pub is_group: bool,
    pub send_ratio: f64,
    pub interaction_score: f64,
}

impl From<&ScoredContact> for NodeDetail {
    fn from(sc: &ScoredContact) -> Self {
        let s = &sc.stats;
        Self {
            id: s.contact.id.clone(),
            name: s.contact.name.clone(),
            total_msgs: s.total_count,
            sent_msgs: s.outgoing_count,
            received_msgs: s.incoming_count,
            is_group: s.contact.is_group(),
            send_ratio: s.send_ratio,
            interaction_score: sc.interaction_score,
        }
    }
}
