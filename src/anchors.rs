use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::entity::{Entity, EntityGraph, EntityKind};

/// Reverse index from anchors to the interaction lines bound to them.
///
/// Built in one pass over the primary interactions and read-only afterwards.
#[derive(Debug, Default)]
pub struct AnchorIndex {
    primary: Vec<String>,
    attachments: HashMap<String, Vec<String>>,
    branches: HashSet<String>,
}

impl AnchorIndex {
    pub fn build(graph: &EntityGraph) -> Self {
        let mut index = AnchorIndex::default();
        for interaction in primary_interactions(graph) {
            index.primary.push(interaction.id.clone());
            for point in &interaction.line_points {
                let Some(target_id) = point.attached_to.as_deref() else {
                    continue;
                };
                let is_anchor = graph
                    .get(target_id)
                    .is_some_and(|target| target.is(&EntityKind::Anchor));
                if !is_anchor {
                    continue;
                }
                debug!(interaction = %interaction.id, anchor = %target_id, "line bound to anchor");
                index.branches.insert(interaction.id.clone());
                index
                    .attachments
                    .entry(target_id.to_string())
                    .or_default()
                    .push(interaction.id.clone());
            }
        }
        index
    }

    /// Primary interaction ids in pathway containment order.
    pub fn primary(&self) -> &[String] {
        &self.primary
    }

    /// Interactions attached to `anchor_id`, in encounter order.
    pub fn attachments(&self, anchor_id: &str) -> &[String] {
        self.attachments
            .get(anchor_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_branch_attachment(&self, interaction_id: &str) -> bool {
        self.branches.contains(interaction_id)
    }
}

/// Top-level interaction lines without a cross-reference of their own.
pub fn primary_interactions(graph: &EntityGraph) -> impl Iterator<Item = &Entity> + '_ {
    graph
        .top_level()
        .filter(|entity| entity.is(&EntityKind::Interaction) && !entity.has_cross_ref())
}
