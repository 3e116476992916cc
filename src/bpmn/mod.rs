//! BPMN 2.0 interchange: a writer that turns a document plus its layout into
//! `definitions` XML with diagram interchange, and a structural validator.

mod validate;

pub use validate::{ValidationReport, validate_bpmn};

use std::collections::HashSet;

use log::debug;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use thiserror::Error;

use crate::ir::{ActorKind, FlowDocument};
use crate::layout::{Layout, NodeLayout};

pub const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const TARGET_NS: &str = "http://bpmn.io/schema/bpmn";

#[derive(Debug, Error)]
pub enum BpmnError {
    #[error("node '{0}' has no layout bounds")]
    MissingBounds(String),
    #[error("node '{0}' has a non-positive or non-finite size")]
    InvalidBounds(String),
    #[error("edge '{0}' has fewer than two waypoints")]
    MissingWaypoints(String),
    #[error("failed to write XML: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("generated XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

struct BpmnWriter {
    writer: Writer<Vec<u8>>,
}

impl BpmnWriter {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn element(name: &str, attrs: &[(&str, &str)]) -> BytesStart<'static> {
        let mut elem = BytesStart::new(name.to_string());
        for &attr in attrs {
            elem.push_attribute(attr);
        }
        elem
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), BpmnError> {
        self.writer.write_event(Event::Start(Self::element(name, attrs)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), BpmnError> {
        self.writer.write_event(Event::Empty(Self::element(name, attrs)))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), BpmnError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), BpmnError> {
        self.start(name, attrs)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn bounds(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), BpmnError> {
        let (x, y, width, height) = (coord(x), coord(y), coord(width), coord(height));
        self.empty(
            "dc:Bounds",
            &[("x", x.as_str()), ("y", y.as_str()), ("width", width.as_str()), ("height", height.as_str())],
        )
    }

    fn finish(self) -> Result<String, BpmnError> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }
}

/// Two decimals without trailing zeros.
fn coord(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    format!("{rounded}")
}

fn display_name<'a>(name: &'a str, id: &'a str) -> &'a str {
    if name.trim().is_empty() { id } else { name }
}

/// Checks that every node the document declares was placed and every routed edge
/// carries a drawable path.
fn check_geometry(doc: &FlowDocument, layout: &Layout) -> Result<(), BpmnError> {
    let declared = doc
        .tasks
        .iter()
        .map(|task| task.id.as_str())
        .chain(doc.gateways.iter().map(|gateway| gateway.id.as_str()))
        .filter(|id| !id.is_empty());
    for id in declared {
        let node = layout
            .node(id)
            .ok_or_else(|| BpmnError::MissingBounds(id.to_string()))?;
        let valid = [node.x, node.y, node.width, node.height]
            .iter()
            .all(|value| value.is_finite())
            && node.width > 0.0
            && node.height > 0.0;
        if !valid {
            return Err(BpmnError::InvalidBounds(id.to_string()));
        }
    }
    if let Some(edge) = layout.edges.iter().find(|edge| edge.points.len() < 2) {
        return Err(BpmnError::MissingWaypoints(edge.id.clone()));
    }
    Ok(())
}

/// Serializes the document as BPMN 2.0 XML: one collaboration with a single
/// participant, one process whose lane set mirrors the layout lanes, and a
/// diagram carrying the layout geometry.
pub fn to_bpmn_xml(doc: &FlowDocument, layout: &Layout) -> Result<String, BpmnError> {
    check_geometry(doc, layout)?;

    let flow_id = if doc.metadata.id.trim().is_empty() {
        "flow"
    } else {
        doc.metadata.id.as_str()
    };
    let title = doc.metadata.title.as_str();
    let definitions_id = format!("Definitions_{flow_id}");
    let collaboration_id = format!("Collaboration_{flow_id}");
    let participant_id = format!("Participant_{flow_id}");
    let process_id = format!("Process_{flow_id}");

    let mut out = BpmnWriter::new();
    out.writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.start(
        "bpmn2:definitions",
        &[
            ("xmlns:bpmn2", BPMN_NS),
            ("xmlns:bpmndi", BPMNDI_NS),
            ("xmlns:dc", DC_NS),
            ("xmlns:di", DI_NS),
            ("xmlns:xsi", XSI_NS),
            ("id", definitions_id.as_str()),
            ("targetNamespace", TARGET_NS),
            ("xsi:schemaLocation", "http://www.omg.org/spec/BPMN/20100524/MODEL BPMN20.xsd"),
        ],
    )?;

    out.start("bpmn2:collaboration", &[("id", collaboration_id.as_str())])?;
    out.empty(
        "bpmn2:participant",
        &[("id", participant_id.as_str()), ("name", title), ("processRef", process_id.as_str())],
    )?;
    out.end("bpmn2:collaboration")?;

    write_process(&mut out, doc, layout, &process_id, title)?;

    out.start("bpmndi:BPMNDiagram", &[("id", format!("BPMNDiagram_{flow_id}").as_str())])?;
    out.start(
        "bpmndi:BPMNPlane",
        &[("id", format!("BPMNPlane_{flow_id}").as_str()), ("bpmnElement", collaboration_id.as_str())],
    )?;
    write_shapes(&mut out, layout, flow_id, &participant_id)?;
    for edge in &layout.edges {
        out.start(
            "bpmndi:BPMNEdge",
            &[("id", format!("BPMNEdge_{}", edge.id).as_str()), ("bpmnElement", edge.id.as_str())],
        )?;
        for &(x, y) in &edge.points {
            out.empty("di:waypoint", &[("x", coord(x).as_str()), ("y", coord(y).as_str())])?;
        }
        out.end("bpmndi:BPMNEdge")?;
    }
    out.end("bpmndi:BPMNPlane")?;
    out.end("bpmndi:BPMNDiagram")?;

    out.end("bpmn2:definitions")?;
    let xml = out.finish()?;
    debug!(bytes = xml.len(), edges = layout.edges.len(); "serialized BPMN");
    Ok(xml)
}

fn write_process(
    out: &mut BpmnWriter,
    doc: &FlowDocument,
    layout: &Layout,
    process_id: &str,
    title: &str,
) -> Result<(), BpmnError> {
    out.start(
        "bpmn2:process",
        &[("id", process_id), ("name", title), ("isExecutable", "false")],
    )?;

    if !layout.lanes.is_empty() {
        out.start("bpmn2:laneSet", &[("id", format!("LaneSet_{process_id}").as_str())])?;
        for lane in &layout.lanes {
            out.start(
                "bpmn2:lane",
                &[
                    ("id", format!("Lane_{}", lane.participant_id).as_str()),
                    ("name", display_name(&lane.label, &lane.participant_id)),
                ],
            )?;
            for node in layout.nodes_in_lane(lane.index) {
                out.text_element("bpmn2:flowNodeRef", &[], &node.id)?;
            }
            out.end("bpmn2:lane")?;
        }
        out.end("bpmn2:laneSet")?;
    }

    let mut emitted: HashSet<&str> = HashSet::new();
    for task in &doc.tasks {
        if task.id.is_empty() || !emitted.insert(task.id.as_str()) {
            continue;
        }
        let element = match doc.actor(&task.actor_id).map(|actor| actor.kind) {
            Some(ActorKind::System) => "bpmn2:serviceTask",
            _ => "bpmn2:userTask",
        };
        let attrs = [("id", task.id.as_str()), ("name", display_name(&task.name, &task.id))];
        write_flow_node(out, element, &attrs, task.notes.as_deref())?;
    }
    for gateway in &doc.gateways {
        if gateway.id.is_empty() || !emitted.insert(gateway.id.as_str()) {
            continue;
        }
        let element = format!("bpmn2:{}", gateway.kind.bpmn_element());
        let attrs = [("id", gateway.id.as_str()), ("name", display_name(&gateway.name, &gateway.id))];
        write_flow_node(out, &element, &attrs, gateway.notes.as_deref())?;
    }

    for edge in &layout.edges {
        let mut attrs = vec![
            ("id", edge.id.as_str()),
            ("sourceRef", edge.from.as_str()),
            ("targetRef", edge.to.as_str()),
        ];
        if let Some(name) = edge.name.as_deref() {
            attrs.push(("name", name));
        }
        match edge.condition.as_deref() {
            Some(condition) => {
                out.start("bpmn2:sequenceFlow", &attrs)?;
                out.text_element(
                    "bpmn2:conditionExpression",
                    &[("xsi:type", "bpmn2:tFormalExpression")],
                    condition,
                )?;
                out.end("bpmn2:sequenceFlow")?;
            }
            None => out.empty("bpmn2:sequenceFlow", &attrs)?,
        }
    }

    out.end("bpmn2:process")
}

fn write_flow_node(
    out: &mut BpmnWriter,
    element: &str,
    attrs: &[(&str, &str)],
    notes: Option<&str>,
) -> Result<(), BpmnError> {
    match notes.filter(|notes| !notes.trim().is_empty()) {
        Some(notes) => {
            out.start(element, attrs)?;
            out.text_element("bpmn2:documentation", &[], notes)?;
            out.end(element)
        }
        None => out.empty(element, attrs),
    }
}

fn write_shapes(
    out: &mut BpmnWriter,
    layout: &Layout,
    flow_id: &str,
    participant_id: &str,
) -> Result<(), BpmnError> {
    let (px, py, pw, ph) = match (layout.lanes.first(), layout.lanes.last()) {
        (Some(first), Some(last)) => (
            first.x,
            first.y,
            first.width,
            last.y + last.height - first.y,
        ),
        _ => (0.0, 0.0, layout.width, layout.height),
    };
    out.start(
        "bpmndi:BPMNShape",
        &[
            ("id", format!("BPMNShape_Participant_{flow_id}").as_str()),
            ("bpmnElement", participant_id),
            ("isHorizontal", "true"),
        ],
    )?;
    out.bounds(px, py, pw, ph)?;
    out.end("bpmndi:BPMNShape")?;

    for lane in &layout.lanes {
        out.start(
            "bpmndi:BPMNShape",
            &[
                ("id", format!("BPMNShape_Lane_{}", lane.participant_id).as_str()),
                ("bpmnElement", format!("Lane_{}", lane.participant_id).as_str()),
                ("isHorizontal", "true"),
            ],
        )?;
        out.bounds(lane.x, lane.y, lane.width, lane.height)?;
        out.end("bpmndi:BPMNShape")?;
    }

    for node in layout.nodes.values() {
        write_node_shape(out, node)?;
    }
    Ok(())
}

fn write_node_shape(out: &mut BpmnWriter, node: &NodeLayout) -> Result<(), BpmnError> {
    out.start(
        "bpmndi:BPMNShape",
        &[("id", format!("BPMNShape_{}", node.id).as_str()), ("bpmnElement", node.id.as_str())],
    )?;
    out.bounds(node.x, node.y, node.width, node.height)?;
    out.end("bpmndi:BPMNShape")
}
