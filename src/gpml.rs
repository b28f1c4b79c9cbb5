use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::entity::{Entity, EntityGraph, EntityKind, LinePoint, Marker, Pathway};

/// Build the entity graph for a GPML 2013a (WikiPathways) document.
pub fn parse_gpml(xml: &str) -> Result<EntityGraph> {
    let doc = Document::parse(xml).context("Failed to parse GPML XML")?;
    let pathway_node = doc
        .descendants()
        .find(|node| node.has_tag_name("Pathway"))
        .ok_or_else(|| anyhow!("GPML file missing Pathway element"))?;

    let mut entities = HashMap::new();
    let mut top_level = Vec::new();
    // GroupId -> ids of the elements referencing it, in document order.
    let mut members: HashMap<String, Vec<String>> = HashMap::new();
    let mut groups = Vec::new();

    for node in pathway_node.children().filter(|node| node.is_element()) {
        let entity = match node.tag_name().name() {
            "DataNode" => parse_data_node(&node),
            "Interaction" => parse_line(&node, EntityKind::Interaction, &mut entities),
            "GraphicalLine" => parse_line(
                &node,
                EntityKind::Other("GraphicalLine".to_string()),
                &mut entities,
            ),
            "Group" => {
                let group = parse_group(&node);
                if let (Some(group), Some(group_id)) = (&group, attr(&node, "GroupId")) {
                    groups.push((group.id.clone(), group_id.to_string()));
                }
                group
            }
            "Label" | "Shape" => parse_other(&node),
            _ => continue,
        };
        let Some(entity) = entity else {
            debug!(element = node.tag_name().name(), "skipping element without id");
            continue;
        };

        match attr(&node, "GroupRef") {
            Some(group_ref) => members
                .entry(group_ref.to_string())
                .or_default()
                .push(entity.id.clone()),
            None => top_level.push(entity.id.clone()),
        }
        insert_entity(&mut entities, entity);
    }

    for (id, group_id) in groups {
        if let Some(group) = entities.get_mut(&id) {
            group.contained_ids = members.remove(&group_id).unwrap_or_default();
        }
    }

    Ok(EntityGraph {
        pathway: Pathway {
            id: None,
            name: attr(&pathway_node, "Name").map(str::to_string),
            contained_ids: top_level,
        },
        entities_by_id: entities,
    })
}

fn insert_entity(entities: &mut HashMap<String, Entity>, entity: Entity) {
    let id = entity.id.clone();
    if entities.insert(id.clone(), entity).is_some() {
        warn!(id = %id, "duplicate GraphId, keeping the last element");
    }
}

fn parse_data_node(node: &Node) -> Option<Entity> {
    let mut entity = Entity::new(attr(node, "GraphId")?, EntityKind::DataNode);
    entity.label = text_label(node);
    apply_xref(node, &mut entity);
    Some(entity)
}

fn parse_group(node: &Node) -> Option<Entity> {
    // Interactions bind to a group's GraphId; older files only carry GroupId.
    let id = attr(node, "GraphId").or_else(|| attr(node, "GroupId"))?;
    let mut entity = Entity::new(id, EntityKind::Group);
    entity.label = text_label(node);
    Some(entity)
}

fn parse_other(node: &Node) -> Option<Entity> {
    let mut entity = Entity::new(
        attr(node, "GraphId")?,
        EntityKind::Other(node.tag_name().name().to_string()),
    );
    entity.label = text_label(node);
    Some(entity)
}

/// Parse an interaction-like line; its anchors become entities of their own.
fn parse_line(
    node: &Node,
    kind: EntityKind,
    entities: &mut HashMap<String, Entity>,
) -> Option<Entity> {
    let mut entity = Entity::new(attr(node, "GraphId")?, kind);
    apply_xref(node, &mut entity);

    let Some(graphics) = node.children().find(|child| child.has_tag_name("Graphics")) else {
        return Some(entity);
    };

    let points: Vec<Node> = graphics
        .children()
        .filter(|child| child.has_tag_name("Point"))
        .collect();
    entity.line_points = points
        .iter()
        .map(|point| LinePoint {
            attached_to: attr(point, "GraphRef").map(str::to_string),
        })
        .collect();
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        entity.line_endpoint_ids = vec![
            attr(first, "GraphRef").map(str::to_string),
            attr(last, "GraphRef").map(str::to_string),
        ];
        entity.start_marker = arrow_head(first);
        entity.end_marker = arrow_head(last);
    }

    for anchor in graphics.children().filter(|child| child.has_tag_name("Anchor")) {
        let Some(anchor_id) = attr(&anchor, "GraphId") else {
            continue;
        };
        entity.branch_point_ids.push(anchor_id.to_string());
        insert_entity(entities, Entity::new(anchor_id, EntityKind::Anchor));
    }
    Some(entity)
}

fn arrow_head(point: &Node) -> Option<Marker> {
    // "Line" is GPML's explicit "no decoration".
    attr(point, "ArrowHead")
        .filter(|value| *value != "Line")
        .map(Marker::parse)
}

fn apply_xref(node: &Node, entity: &mut Entity) {
    let Some(xref) = node.children().find(|child| child.has_tag_name("Xref")) else {
        return;
    };
    entity.cross_ref_data_source = attr(&xref, "Database").map(str::to_string);
    entity.cross_ref_id = attr(&xref, "ID").map(str::to_string);
}

fn text_label(node: &Node) -> Option<String> {
    attr(node, "TextLabel").map(|label| label.replace('\r', ""))
}

/// Attribute value, with empty strings treated as absent.
fn attr<'a>(node: &Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::AnchorIndex;
    use crate::reaction::{assemble_reactions, ReactantRef};

    const HEXOKINASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Pathway xmlns="http://pathvisio.org/GPML/2013a" Name="Hexokinase step" Organism="Homo sapiens">
  <DataNode TextLabel="Glucose" GraphId="glc" Type="Metabolite">
    <Graphics CenterX="100" CenterY="100" Width="80" Height="20"/>
    <Xref Database="ChEBI" ID="CHEBI:4167"/>
  </DataNode>
  <DataNode TextLabel="Glucose-6-phosphate" GraphId="g6p" Type="Metabolite">
    <Graphics CenterX="400" CenterY="100" Width="80" Height="20"/>
    <Xref Database="ChEBI" ID="CHEBI:4170"/>
  </DataNode>
  <DataNode TextLabel="ATP" GraphId="atp" Type="Metabolite">
    <Graphics CenterX="200" CenterY="40" Width="60" Height="20"/>
    <Xref Database="ChEBI" ID="CHEBI:15422"/>
  </DataNode>
  <DataNode TextLabel="ADP" GraphId="adp" Type="Metabolite">
    <Graphics CenterX="300" CenterY="40" Width="60" Height="20"/>
    <Xref Database="ChEBI" ID="CHEBI:16761"/>
  </DataNode>
  <DataNode TextLabel="HK1" GraphId="hk1" Type="GeneProduct" GroupRef="cplx">
    <Graphics CenterX="250" CenterY="180" Width="60" Height="20"/>
    <Xref Database="Entrez Gene" ID="3098"/>
  </DataNode>
  <DataNode TextLabel="Mg2+" GraphId="mg" Type="Metabolite" GroupRef="cplx">
    <Graphics CenterX="250" CenterY="200" Width="60" Height="20"/>
    <Xref Database="ChEBI" ID="CHEBI:18420"/>
  </DataNode>
  <Interaction GraphId="main">
    <Graphics ZOrder="12288" LineThickness="1.0">
      <Point X="140" Y="100" GraphRef="glc" RelX="1.0" RelY="0.0"/>
      <Point X="360" Y="100" GraphRef="g6p" RelX="-1.0" RelY="0.0" ArrowHead="mim-conversion"/>
      <Anchor Position="0.3" Shape="None" GraphId="a1"/>
      <Anchor Position="0.7" Shape="None" GraphId="a2"/>
      <Anchor Position="0.5" Shape="None" GraphId="a3"/>
    </Graphics>
    <Xref Database="" ID=""/>
  </Interaction>
  <Interaction GraphId="atp-in">
    <Graphics ZOrder="12288" LineThickness="1.0">
      <Point X="200" Y="50" GraphRef="atp" RelX="0.0" RelY="1.0"/>
      <Point X="206" Y="100" GraphRef="a1" RelX="0.0" RelY="0.0"/>
    </Graphics>
    <Xref Database="" ID=""/>
  </Interaction>
  <Interaction GraphId="adp-out">
    <Graphics ZOrder="12288" LineThickness="1.0">
      <Point X="294" Y="100" GraphRef="a2" RelX="0.0" RelY="0.0"/>
      <Point X="300" Y="50" GraphRef="adp" RelX="0.0" RelY="1.0" ArrowHead="mim-conversion"/>
    </Graphics>
    <Xref Database="" ID=""/>
  </Interaction>
  <Interaction GraphId="cat">
    <Graphics ZOrder="12288" LineThickness="1.0">
      <Point X="250" Y="170" GraphRef="grp" RelX="0.0" RelY="-1.0"/>
      <Point X="250" Y="100" GraphRef="a3" RelX="0.0" RelY="0.0" ArrowHead="mim-catalysis"/>
    </Graphics>
    <Xref Database="" ID=""/>
  </Interaction>
  <Label TextLabel="Glycolysis&#xD;&#xA;step 1" GraphId="lbl">
    <Graphics CenterX="50" CenterY="20" Width="80" Height="20"/>
  </Label>
  <Group GroupId="cplx" GraphId="grp" Style="Complex"/>
  <InfoBox CenterX="0" CenterY="0"/>
</Pathway>"#;

    fn reactant(name: &str, id: &str) -> ReactantRef {
        ReactantRef {
            name: name.to_string(),
            cross_ref_id: id.to_string(),
        }
    }

    #[test]
    fn parses_entities() {
        let graph = parse_gpml(HEXOKINASE).unwrap();

        assert_eq!(graph.pathway.name.as_deref(), Some("Hexokinase step"));
        assert_eq!(
            graph.pathway.contained_ids,
            ["glc", "g6p", "atp", "adp", "main", "atp-in", "adp-out", "cat", "lbl", "grp"]
        );

        let glucose = graph.get("glc").unwrap();
        assert_eq!(glucose.element_kind, EntityKind::DataNode);
        assert_eq!(glucose.label.as_deref(), Some("Glucose"));
        assert_eq!(glucose.chebi_id(), Some("CHEBI:4167"));

        let main = graph.get("main").unwrap();
        assert_eq!(main.line_endpoint_ids, [Some("glc".to_string()), Some("g6p".to_string())]);
        assert_eq!(main.start_marker, None);
        assert_eq!(main.end_marker, Some(Marker::Conversion));
        assert_eq!(main.branch_point_ids, ["a1", "a2", "a3"]);
        assert!(!main.has_cross_ref());
        assert_eq!(graph.get("a2").unwrap().element_kind, EntityKind::Anchor);

        let complex = graph.get("grp").unwrap();
        assert_eq!(complex.element_kind, EntityKind::Group);
        assert_eq!(complex.contained_ids, ["hk1", "mg"]);

        assert_eq!(
            graph.get("lbl").unwrap().label.as_deref(),
            Some("Glycolysis\nstep 1")
        );
    }

    #[test]
    fn resolves_hexokinase_reaction() {
        let graph = parse_gpml(HEXOKINASE).unwrap();
        let index = AnchorIndex::build(&graph);
        let reactions = assemble_reactions(&graph, &index);

        assert_eq!(reactions.len(), 1);
        let reaction = &reactions[0];
        assert_eq!(reaction.id, "main");
        assert_eq!(
            reaction.left,
            [reactant("Glucose", "CHEBI:4167"), reactant("ATP", "CHEBI:15422")]
        );
        assert_eq!(
            reaction.right,
            [reactant("Glucose-6-phosphate", "CHEBI:4170"), reactant("ADP", "CHEBI:16761")]
        );
        assert_eq!(
            reaction.catalysis,
            [reactant("HK1", "3098"), reactant("Mg2+", "CHEBI:18420")]
        );
        assert_eq!(
            reaction.summary(),
            "main: Glucose + ATP → Glucose-6-phosphate + ADP"
        );
    }

    #[test]
    fn line_arrow_head_means_no_marker() {
        let xml = r#"<Pathway Name="p">
  <Interaction GraphId="i">
    <Graphics>
      <Point X="0" Y="0" GraphRef="a" ArrowHead="Line"/>
      <Point X="1" Y="0" ArrowHead="Arrow"/>
    </Graphics>
  </Interaction>
</Pathway>"#;
        let graph = parse_gpml(xml).unwrap();
        let line = graph.get("i").unwrap();

        assert_eq!(line.start_marker, None);
        assert_eq!(line.end_marker, Some(Marker::Other("Arrow".to_string())));
        assert_eq!(line.line_endpoint_ids, [Some("a".to_string()), None]);
    }

    #[test]
    fn rejects_documents_without_pathway() {
        let err = parse_gpml("<Sbgn/>").unwrap_err();
        assert!(err.to_string().contains("missing Pathway"));
        assert!(parse_gpml("not xml").is_err());
    }
}
