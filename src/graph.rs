//! Graph construction.
//!
//! Maps scored contacts into the node/edge/category records consumed by the
//! force-graph viewer. The account owner is a fixed accent-colored node
//! pinned at the origin; every contact links to it with an edge whose
//! weight, width, and opacity all derive from the interaction score.
//!
//! Node color encodes relative strength: each score is normalized by the
//! batch maximum and mapped through a two-segment hue ramp, blue (240)
//! through purple (300) to red (360), so stronger relationships read
//! visually warmer. Both ramp segments evaluate to hue 300 at the 0.5
//! boundary; the ramp is continuous and strictly monotonic.

use serde::Serialize;

use crate::models::{NodeDetail, ScoredContact, TimeWindow};

/// Identifier of the synthetic owner node.
pub const OWNER_NODE_ID: &str = "me";

const OWNER_NODE_SIZE: f64 = 50.0;
const OWNER_NODE_COLOR: &str = "#FF4500";

/// Fallback normalization ceiling when the batch has no usable maximum.
const DEFAULT_MAX_SCORE: f64 = 50.0;

/// Category indices, in legend order.
const CATEGORY_SELF: usize = 0;
const CATEGORY_CONTACT: usize = 1;
const CATEGORY_GROUP: usize = 2;
const CATEGORY_OFFICIAL: usize = 3;

const CATEGORY_LABELS: [&str; 4] = ["Me", "Contacts", "Groups", "Official Accounts"];

#[derive(Debug, Clone, Serialize)]
pub struct NodeStyle {
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "symbolSize")]
    pub symbol_size: f64,
    pub category: usize,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
    #[serde(rename = "itemStyle")]
    pub item_style: NodeStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeStyle {
    pub width: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub value: f64,
    #[serde(rename = "lineStyle")]
    pub line_style: EdgeStyle,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub name: String,
}

/// The complete serializable bundle consumed by the viewer. Built once per
/// run and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct GraphArtifact {
    #[serde(rename = "legendData")]
    pub legend_data: Vec<String>,
    #[serde(rename = "nodesData")]
    pub nodes_data: Vec<GraphNode>,
    #[serde(rename = "linksData")]
    pub links_data: Vec<GraphEdge>,
    #[serde(rename = "categoriesData")]
    pub categories_data: Vec<Category>,
    #[serde(rename = "nodeDetails")]
    pub node_details: Vec<NodeDetail>,
    pub time_range: [String; 2],
}

/// Build the graph artifact from an ordered batch of scored contacts.
///
/// Output order is the input order; callers sort and truncate beforehand.
/// The owner node is always emitted first.
pub fn build_graph(contacts: &[ScoredContact], window: &TimeWindow) -> GraphArtifact {
    let mut nodes = Vec::with_capacity(contacts.len() + 1);
    let mut links = Vec::with_capacity(contacts.len());

    nodes.push(GraphNode {
        id: OWNER_NODE_ID.to_string(),
        name: CATEGORY_LABELS[CATEGORY_SELF].to_string(),
        symbol_size: OWNER_NODE_SIZE,
        category: CATEGORY_SELF,
        value: 100.0,
        x: Some(0.0),
        y: Some(0.0),
        fixed: Some(true),
        item_style: NodeStyle {
            color: OWNER_NODE_COLOR.to_string(),
        },
    });

    let max_score = contacts
        .iter()
        .map(|c| c.interaction_score)
        .fold(f64::MIN, f64::max);
    // Non-empty all-zero batches would otherwise divide by zero.
    let max_score = if max_score > 0.0 {
        max_score
    } else {
        DEFAULT_MAX_SCORE
    };

    for sc in contacts {
        let stats = &sc.stats;
        let contact = &stats.contact;
        let score = sc.interaction_score;

        let normalized = score / max_score;
        nodes.push(GraphNode {
            id: contact.id.clone(),
            name: contact.name.clone(),
            symbol_size: node_size(contact.is_group(), stats.total_count),
            category: category_for(contact),
            value: score,
            x: None,
            y: None,
            fixed: None,
            item_style: NodeStyle {
                color: node_color(normalized),
            },
        });

        links.push(GraphEdge {
            source: OWNER_NODE_ID.to_string(),
            target: contact.id.clone(),
            value: score,
            line_style: EdgeStyle {
                width: score / 10.0,
                opacity: score / 100.0,
            },
        });
    }

    GraphArtifact {
        legend_data: CATEGORY_LABELS.iter().map(|s| s.to_string()).collect(),
        nodes_data: nodes,
        links_data: links,
        categories_data: CATEGORY_LABELS
            .iter()
            .map(|s| Category {
                name: s.to_string(),
            })
            .collect(),
        node_details: contacts.iter().map(NodeDetail::from).collect(),
        time_range: window.labels(),
    }
}

/// Official-account prefix wins over the group suffix, everything else is a
/// one-to-one contact.
fn category_for(contact: &crate::models::Contact) -> usize {
    if contact.is_official() {
        CATEGORY_OFFICIAL
    } else if contact.is_group() {
        CATEGORY_GROUP
    } else {
        CATEGORY_CONTACT
    }
}

/// Groups get a higher floor but a slower-growing, lower ceiling than
/// individuals, so busy 1:1 contacts can outgrow small groups without large
/// groups swamping the layout.
fn node_size(is_group: bool, total_count: u64) -> f64 {
    let damped = (total_count as f64 + 1.0).ln();
    if is_group {
        35.0 + (damped * 2.0).min(15.0)
    } else {
        15.0 + (damped * 3.0).min(25.0)
    }
}

/// Hue for a normalized score in `[0, 1]`: 240→300 over the lower half,
/// 300→360 over the upper half. Both segments meet at exactly 300.
pub(crate) fn hue_for(normalized: f64) -> f64 {
    if normalized <= 0.5 {
        240.0 + normalized * 2.0 * 60.0
    } else {
        300.0 + (normalized - 0.5) * 2.0 * 60.0
    }
}

fn node_color(normalized: f64) -> String {
    let (r, g, b) = hsl_to_rgb(hue_for(normalized) % 360.0, 1.0, 0.5);
    format!("rgb({},{},{})", r, g, b)
}

/// Standard HSL→RGB conversion; `h` in degrees `[0, 360)`.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0) as u8,
        ((g1 + m) * 255.0) as u8,
        ((b1 + m) * 255.0) as u8,
    )
}
