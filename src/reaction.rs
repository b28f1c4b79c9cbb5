use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::anchors::AnchorIndex;
use crate::entity::{Entity, EntityGraph, EntityKind, Marker};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Catalysis,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactantRef {
    pub name: String,
    pub cross_ref_id: String,
}

/// Reaction read off one conversion line. `left` and `right` only hold ChEBI-identified molecules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub left: Vec<ReactantRef>,
    pub right: Vec<ReactantRef>,
    pub catalysis: Vec<ReactantRef>,
}

impl Reaction {
    fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            left: Vec::new(),
            right: Vec::new(),
            catalysis: Vec::new(),
        }
    }

    fn bucket_mut(&mut self, side: Side) -> &mut Vec<ReactantRef> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
            Side::Catalysis => &mut self.catalysis,
        }
    }

    /// One-line `id: a + b → c` rendering.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} → {}",
            self.id,
            join_names(&self.left),
            join_names(&self.right)
        )
    }
}

fn join_names(reactants: &[ReactantRef]) -> String {
    reactants
        .iter()
        .map(|reactant| reactant.name.as_str())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Assemble one reaction per root interaction, in primary interaction order.
pub fn assemble_reactions(graph: &EntityGraph, index: &AnchorIndex) -> Vec<Reaction> {
    index
        .primary()
        .iter()
        .filter(|id| !index.is_branch_attachment(id))
        .filter_map(|id| graph.get(id))
        .filter_map(|interaction| assemble_reaction(graph, index, interaction))
        .collect()
}

pub fn assemble_reaction(
    graph: &EntityGraph,
    index: &AnchorIndex,
    interaction: &Entity,
) -> Option<Reaction> {
    let Some((left, right)) = main_sides(interaction) else {
        debug!(interaction = %interaction.id, "no conversion marker on main ends, skipping");
        return None;
    };

    let mut collected: Vec<(Side, Option<&str>)> = vec![(Side::Left, left), (Side::Right, right)];
    for anchor_id in &interaction.branch_point_ids {
        let attached = index.attachments(anchor_id);
        if attached.is_empty() {
            debug!(interaction = %interaction.id, anchor = %anchor_id, "anchor has no attachments");
        }
        for attachment_id in attached {
            let Some(attachment) = graph.get(attachment_id) else {
                warn!(anchor = %anchor_id, attachment = %attachment_id, "attached line not found");
                continue;
            };
            if let Some(contribution) = classify_attachment(attachment, &interaction.id, anchor_id)
            {
                collected.push(contribution);
            }
        }
    }

    let mut reaction = Reaction::empty(&interaction.id);
    for (side, id) in collected {
        let Some(id) = id else {
            debug!(interaction = %interaction.id, ?side, "line end not bound to an element");
            continue;
        };
        for participant in flatten(graph, id) {
            if let Some(reactant) = project(participant, side) {
                reaction.bucket_mut(side).push(reactant);
            }
        }
    }
    Some(reaction)
}

/// Left and right seeds of a main line, oriented by the one end that carries the conversion arrow.
fn main_sides(interaction: &Entity) -> Option<(Option<&str>, Option<&str>)> {
    match (&interaction.start_marker, &interaction.end_marker) {
        (Some(Marker::Conversion), Some(Marker::Conversion)) => None,
        (_, Some(Marker::Conversion)) => Some((interaction.endpoint(0), interaction.endpoint(1))),
        (Some(Marker::Conversion), _) => Some((interaction.endpoint(1), interaction.endpoint(0))),
        _ => None,
    }
}

/// Side and element contributed by a line hanging off one of the main line's anchors.
fn classify_attachment<'g>(
    attachment: &'g Entity,
    interaction_id: &str,
    anchor_id: &str,
) -> Option<(Side, Option<&'g str>)> {
    match (&attachment.start_marker, &attachment.end_marker) {
        (None, None) => {
            // Skip the anchor too, so a connector drawn from the anchor outward still yields its molecule.
            let other = attachment
                .line_endpoint_ids
                .iter()
                .flatten()
                .map(String::as_str)
                .find(|id| *id != interaction_id && *id != anchor_id);
            Some((Side::Left, other))
        }
        (_, Some(Marker::Conversion)) => Some((Side::Right, attachment.endpoint(1))),
        (Some(Marker::Conversion), _) => Some((Side::Right, attachment.endpoint(0))),
        (_, Some(Marker::Catalysis)) => Some((Side::Catalysis, attachment.endpoint(0))),
        (Some(Marker::Catalysis), _) => Some((Side::Catalysis, attachment.endpoint(1))),
        (Some(Marker::Other(_)), _) | (_, Some(Marker::Other(_))) => {
            debug!(attachment = %attachment.id, "attachment marker carries no reaction role");
            None
        }
    }
}

/// Resolve an id, expanding a group into its direct members.
fn flatten<'g>(graph: &'g EntityGraph, id: &str) -> Vec<&'g Entity> {
    let Some(entity) = graph.get(id) else {
        warn!(id = %id, "reactant not found in entity graph");
        return Vec::new();
    };
    if !entity.is(&EntityKind::Group) {
        return vec![entity];
    }
    entity
        .contained_ids
        .iter()
        .filter_map(|member_id| {
            let member = graph.get(member_id);
            if member.is_none() {
                warn!(group = %entity.id, member = %member_id, "group member not found");
            }
            member
        })
        .collect()
}

fn project(entity: &Entity, side: Side) -> Option<ReactantRef> {
    if !entity.is(&EntityKind::DataNode) {
        return None;
    }
    if side != Side::Catalysis && entity.chebi_id().is_none() {
        debug!(entity = %entity.id, ?side, "dropping reactant without ChEBI reference");
        return None;
    }
    Some(ReactantRef {
        name: entity.label.clone().unwrap_or_default(),
        cross_ref_id: entity.cross_ref_id.clone().unwrap_or_default(),
    })
}
