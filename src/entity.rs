use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

pub const CHEBI_DATA_SOURCE: &str = "ChEBI";

/// Element kinds the reaction resolver cares about; everything else is carried as `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    DataNode,
    Interaction,
    Anchor,
    Group,
    Other(String),
}

impl From<String> for EntityKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "DataNode" => EntityKind::DataNode,
            "Interaction" => EntityKind::Interaction,
            "Anchor" => EntityKind::Anchor,
            "Group" => EntityKind::Group,
            _ => EntityKind::Other(value),
        }
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::DataNode => "DataNode".to_string(),
            EntityKind::Interaction => "Interaction".to_string(),
            EntityKind::Anchor => "Anchor".to_string(),
            EntityKind::Group => "Group".to_string(),
            EntityKind::Other(name) => name,
        }
    }
}

/// Decoration at one end of an interaction line.
///
/// `Other` keeps arrows, inhibition bars and the rest of the MIM vocabulary
/// distinct from "no marker": a line carrying one of them is not a plain
/// connector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Marker {
    Conversion,
    Catalysis,
    Other(String),
}

impl Marker {
    /// Accepts GPML (`mim-conversion`), pvjson (`MimConversion`) and bare (`conversion`) spellings.
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.strip_prefix("mim").unwrap_or(&normalized) {
            "conversion" => Marker::Conversion,
            "catalysis" => Marker::Catalysis,
            _ => Marker::Other(value.to_string()),
        }
    }
}

impl From<String> for Marker {
    fn from(value: String) -> Self {
        Marker::parse(&value)
    }
}

impl From<Marker> for String {
    fn from(marker: Marker) -> Self {
        match marker {
            Marker::Conversion => "conversion".to_string(),
            Marker::Catalysis => "catalysis".to_string(),
            Marker::Other(name) => name,
        }
    }
}

/// An empty marker string means an undecorated line end.
fn marker_or_none<'de, D>(deserializer: D) -> Result<Option<Marker>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.is_empty()).map(Marker::from))
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinePoint {
    #[serde(default)]
    pub attached_to: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub element_kind: EntityKind,
    #[serde(default)]
    pub cross_ref_data_source: Option<String>,
    #[serde(default)]
    pub cross_ref_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub contained_ids: Vec<String>,
    #[serde(default)]
    pub line_endpoint_ids: Vec<Option<String>>,
    #[serde(default)]
    pub branch_point_ids: Vec<String>,
    #[serde(default, deserialize_with = "marker_or_none")]
    pub start_marker: Option<Marker>,
    #[serde(default, deserialize_with = "marker_or_none")]
    pub end_marker: Option<Marker>,
    #[serde(default)]
    pub line_points: Vec<LinePoint>,
}

impl Entity {
    pub fn new(id: impl Into<String>, element_kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            element_kind,
            cross_ref_data_source: None,
            cross_ref_id: None,
            label: None,
            contained_ids: Vec::new(),
            line_endpoint_ids: Vec::new(),
            branch_point_ids: Vec::new(),
            start_marker: None,
            end_marker: None,
            line_points: Vec::new(),
        }
    }

    pub fn is(&self, kind: &EntityKind) -> bool {
        &self.element_kind == kind
    }

    /// Id bound to the start (0) or end (1) of the line.
    pub fn endpoint(&self, index: usize) -> Option<&str> {
        self.line_endpoint_ids
            .get(index)
            .and_then(|id| id.as_deref())
    }

    pub fn has_cross_ref(&self) -> bool {
        self.cross_ref_data_source
            .as_deref()
            .is_some_and(|source| !source.is_empty())
    }

    /// ChEBI identifier of a molecule node, if it carries a usable one.
    pub fn chebi_id(&self) -> Option<&str> {
        let source = self.cross_ref_data_source.as_deref()?;
        if !source.eq_ignore_ascii_case(CHEBI_DATA_SOURCE) {
            return None;
        }
        self.cross_ref_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contained_ids: Vec<String>,
}

/// Parsed diagram: every element by id plus the pathway's top-level containment list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityGraph {
    pub pathway: Pathway,
    #[serde(default)]
    pub entities_by_id: HashMap<String, Entity>,
}

impl EntityGraph {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse entity graph JSON")
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities_by_id.get(id)
    }

    /// Top-level entities in containment order; dangling ids are skipped.
    pub fn top_level(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.pathway
            .contained_ids
            .iter()
            .filter_map(|id| self.entities_by_id.get(id))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn molecule(id: &str, label: &str, chebi: &str) -> Entity {
        let mut entity = Entity::new(id, EntityKind::DataNode);
        entity.label = Some(label.to_string());
        entity.cross_ref_data_source = Some(CHEBI_DATA_SOURCE.to_string());
        entity.cross_ref_id = Some(chebi.to_string());
        entity
    }

    pub fn protein(id: &str, label: &str) -> Entity {
        let mut entity = Entity::new(id, EntityKind::DataNode);
        entity.label = Some(label.to_string());
        entity
    }

    pub fn anchor(id: &str) -> Entity {
        Entity::new(id, EntityKind::Anchor)
    }

    pub fn group(id: &str, members: &[&str]) -> Entity {
        let mut entity = Entity::new(id, EntityKind::Group);
        entity.contained_ids = members.iter().map(|m| m.to_string()).collect();
        entity
    }

    /// A two-point line bound to `start` and `end`, with anchors on it.
    pub fn line(
        id: &str,
        start: &str,
        end: &str,
        start_marker: Option<Marker>,
        end_marker: Option<Marker>,
        anchors: &[&str],
    ) -> Entity {
        let mut entity = Entity::new(id, EntityKind::Interaction);
        entity.line_endpoint_ids = vec![Some(start.to_string()), Some(end.to_string())];
        entity.line_points = vec![
            LinePoint {
                attached_to: Some(start.to_string()),
            },
            LinePoint {
                attached_to: Some(end.to_string()),
            },
        ];
        entity.start_marker = start_marker;
        entity.end_marker = end_marker;
        entity.branch_point_ids = anchors.iter().map(|a| a.to_string()).collect();
        entity
    }

    /// Graph where every interaction is listed at top level in the given order.
    pub fn graph(entities: Vec<Entity>) -> EntityGraph {
        let contained_ids = entities
            .iter()
            .filter(|entity| entity.is(&EntityKind::Interaction))
            .map(|entity| entity.id.clone())
            .collect();
        EntityGraph {
            pathway: Pathway {
                id: Some("pathway".to_string()),
                name: Some("Test pathway".to_string()),
                contained_ids,
            },
            entities_by_id: entities
                .into_iter()
                .map(|entity| (entity.id.clone(), entity))
                .collect(),
        }
    }
}
