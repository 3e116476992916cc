use std::collections::HashSet;

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Outcome of a structural BPMN check. Valid when no errors were collected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Element tree keyed by local names; namespace prefixes are dropped.
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    fn id_or_unknown(&self) -> &str {
        self.attr("id").unwrap_or("unknown")
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| format!("XML parsing error at byte {}: {err}", reader.buffer_position()))?;
        let finished = match event {
            Event::Start(start) => {
                stack.push(XmlElement::from_start(&start).map_err(|err| err.to_string())?);
                None
            }
            Event::Empty(start) => Some(XmlElement::from_start(&start).map_err(|err| err.to_string())?),
            Event::End(_) => stack.pop(),
            Event::Eof => break,
            _ => None,
        };
        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if root.is_none() => root = Some(element),
                None => return Err("XML parsing error: multiple root elements".to_string()),
            }
        }
    }

    if !stack.is_empty() {
        return Err("XML parsing error: unexpected end of document".to_string());
    }
    root.ok_or_else(|| "XML parsing error: no root element".to_string())
}

/// Structural BPMN 2.0 checks: root element and required attributes,
/// collaboration and process presence, shape bounds, edge waypoints, and
/// reference integrity of participants and sequence flows.
pub fn validate_bpmn(xml: &str) -> ValidationReport {
    let mut report = ValidationReport::default();
    let root = match parse_tree(xml) {
        Ok(root) => root,
        Err(message) => {
            report.error(message);
            return report;
        }
    };

    if root.name != "definitions" {
        report.error(format!("Root element must be 'definitions', found: {}", root.name));
    }
    for attr in ["id", "targetNamespace"] {
        if root.attr(attr).is_none() {
            report.error(format!("definitions element missing required '{attr}' attribute"));
        }
    }

    validate_collaboration(&root, &mut report);
    validate_processes(&root, &mut report);
    validate_diagram(&root, &mut report);
    validate_references(&root, &mut report);

    debug!(errors = report.errors.len(); "validated BPMN document");
    report
}

fn validate_collaboration(root: &XmlElement, report: &mut ValidationReport) {
    for collaboration in root.children("collaboration") {
        if collaboration.attr("id").is_none() {
            report.error("collaboration element missing required 'id' attribute");
        }
        let mut participants = collaboration.children("participant").peekable();
        if participants.peek().is_none() {
            report.error("collaboration must contain at least one participant");
        }
        for participant in participants {
            if participant.attr("id").is_none() {
                report.error("participant element missing required 'id' attribute");
            }
            if participant.attr("processRef").is_none() {
                report.error(format!(
                    "participant {} missing 'processRef' attribute",
                    participant.id_or_unknown()
                ));
            }
        }
    }
}

fn is_task(name: &str) -> bool {
    matches!(name, "task" | "userTask" | "serviceTask")
}

fn is_gateway(name: &str) -> bool {
    matches!(name, "exclusiveGateway" | "parallelGateway" | "inclusiveGateway")
}

fn validate_processes(root: &XmlElement, report: &mut ValidationReport) {
    let mut processes = root.children("process").peekable();
    if processes.peek().is_none() {
        report.error("definitions must contain at least one process");
        return;
    }
    for process in processes {
        let Some(process_id) = process.attr("id") else {
            report.error("process element missing required 'id' attribute");
            continue;
        };
        for child in &process.children {
            if is_task(&child.name) && child.attr("id").is_none() {
                report.error(format!("Task in process {process_id} missing 'id' attribute"));
            }
            if is_gateway(&child.name) && child.attr("id").is_none() {
                report.error(format!("Gateway in process {process_id} missing 'id' attribute"));
            }
        }
        for flow in process.children("sequenceFlow") {
            if flow.attr("id").is_none() {
                report.error(format!("sequenceFlow in process {process_id} missing 'id' attribute"));
            }
            for attr in ["sourceRef", "targetRef"] {
                if flow.attr(attr).is_none() {
                    report.error(format!(
                        "sequenceFlow {} missing '{attr}' attribute",
                        flow.id_or_unknown()
                    ));
                }
            }
        }
    }
}

fn validate_diagram(root: &XmlElement, report: &mut ValidationReport) {
    let mut diagrams = root.children("BPMNDiagram").peekable();
    if diagrams.peek().is_none() {
        warn!("no BPMNDiagram element found; the model has no layout");
        return;
    }
    for diagram in diagrams {
        if diagram.attr("id").is_none() {
            report.error("BPMNDiagram element missing required 'id' attribute");
        }
        let mut planes = diagram.children("BPMNPlane").peekable();
        if planes.peek().is_none() {
            report.error(format!(
                "BPMNDiagram {} missing BPMNPlane element",
                diagram.id_or_unknown()
            ));
            continue;
        }
        for plane in planes {
            if plane.attr("id").is_none() {
                report.error("BPMNPlane element missing required 'id' attribute");
            }
            if plane.attr("bpmnElement").is_none() {
                report.error("BPMNPlane element missing required 'bpmnElement' attribute");
            }
            for shape in plane.children("BPMNShape") {
                validate_shape(shape, report);
            }
            for edge in plane.children("BPMNEdge") {
                validate_edge(edge, report);
            }
        }
    }
}

fn validate_shape(shape: &XmlElement, report: &mut ValidationReport) {
    let id = shape.id_or_unknown();
    if shape.attr("id").is_none() {
        report.error("BPMNShape element missing required 'id' attribute");
    }
    if shape.attr("bpmnElement").is_none() {
        report.error(format!("BPMNShape {id} missing 'bpmnElement' attribute"));
    }
    let mut bounds = shape.children("Bounds").peekable();
    if bounds.peek().is_none() {
        report.error(format!("BPMNShape {id} missing Bounds element"));
    }
    for bound in bounds {
        for attr in ["x", "y", "width", "height"] {
            match bound.attr(attr) {
                None => report.error(format!("Bounds in BPMNShape {id} missing '{attr}' attribute")),
                Some(value) if value.parse::<f64>().is_err() => report.error(format!(
                    "Bounds in BPMNShape {id} has non-numeric '{attr}': {value}"
                )),
                Some(_) => {}
            }
        }
    }
}

fn validate_edge(edge: &XmlElement, report: &mut ValidationReport) {
    let id = edge.id_or_unknown();
    if edge.attr("id").is_none() {
        report.error("BPMNEdge element missing required 'id' attribute");
    }
    if edge.attr("bpmnElement").is_none() {
        report.error(format!("BPMNEdge {id} missing 'bpmnElement' attribute"));
    }
    let waypoints: Vec<&XmlElement> = edge.children("waypoint").collect();
    if waypoints.len() < 2 {
        report.error(format!("BPMNEdge {id} must have at least 2 waypoints"));
    }
    for waypoint in waypoints {
        if waypoint.attr("x").is_none() || waypoint.attr("y").is_none() {
            report.error(format!("waypoint in BPMNEdge {id} missing 'x' or 'y' attribute"));
        }
    }
}

fn validate_references(root: &XmlElement, report: &mut ValidationReport) {
    let mut known: HashSet<&str> = HashSet::new();
    let mut process_ids: HashSet<&str> = HashSet::new();
    for process in root.children("process") {
        let Some(process_id) = process.attr("id") else {
            continue;
        };
        known.insert(process_id);
        process_ids.insert(process_id);
        for child in &process.children {
            if is_task(&child.name) || is_gateway(&child.name) {
                if let Some(id) = child.attr("id") {
                    known.insert(id);
                }
            }
        }
    }

    for collaboration in root.children("collaboration") {
        if let Some(id) = collaboration.attr("id") {
            known.insert(id);
        }
        for participant in collaboration.children("participant") {
            if let Some(id) = participant.attr("id") {
                known.insert(id);
            }
            if let Some(process_ref) = participant.attr("processRef") {
                if !process_ids.contains(process_ref) {
                    report.error(format!(
                        "participant {} references non-existent process: {process_ref}",
                        participant.id_or_unknown()
                    ));
                }
            }
        }
    }

    for process in root.children("process") {
        for flow in process.children("sequenceFlow") {
            let flow_id = flow.id_or_unknown();
            for attr in ["sourceRef", "targetRef"] {
                if let Some(target) = flow.attr(attr) {
                    if !known.contains(target) {
                        report.error(format!(
                            "sequenceFlow {flow_id} {attr} references non-existent element: {target}"
                        ));
                    }
                }
            }
        }
    }
}
