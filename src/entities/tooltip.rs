use std::collections::BTreeSet;

use serde::Serialize;

use super::NOT_AVAILABLE;
use super::class_index::ClassMembershipIndex;
use super::facet::FacetRecord;

/// Names per tooltip line when none is requested.
pub const DEFAULT_NAMES_PER_LINE: usize = 4;

/// A therapeutic-class row with every drug that shares its class label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipRow {
    #[serde(flatten)]
    pub record: FacetRecord,
    pub peers: BTreeSet<String>,
}

impl TooltipRow {
    /// Peers in sorted order, `per_line` names per line (at least one).
    pub fn tooltip_lines(&self, per_line: usize) -> Vec<String> {
        let names: Vec<&str> = self.peers.iter().map(String::as_str).collect();
        names
            .chunks(per_line.max(1))
            .map(|chunk| chunk.join(", "))
            .collect()
    }

    /// Display text for the tooltip; empty when the label has no peers.
    pub fn tooltip_text(&self, per_line: usize) -> String {
        self.tooltip_lines(per_line).join("\n")
    }
}

fn peers_for(label: &str, index: &ClassMembershipIndex) -> BTreeSet<String> {
    let label = label.trim();
    if label.is_empty() || label == NOT_AVAILABLE {
        return BTreeSet::new();
    }
    index.members(label).cloned().unwrap_or_default()
}

/// Attaches index peers to each row. Peers come from the index, not from the
/// rows, so drugs outside the current selection still appear.
pub fn attach_tooltips(rows: &[FacetRecord], index: &ClassMembershipIndex) -> Vec<TooltipRow> {
    rows.iter()
        .map(|record| TooltipRow {
            peers: peers_for(&record.value, index),
            record: record.clone(),
        })
        .collect()
}
