use std::collections::{HashMap, HashSet};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ir::FlowDocument;

static ID_INVALID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());
static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\r\n]+\s*").unwrap());

/// Label text that cannot close a quoted mermaid string or break a line.
pub fn sanitize_label(text: &str) -> String {
    let text = text.replace('"', "'");
    LINE_BREAK_RE.replace_all(&text, " ").trim().to_string()
}

/// Node id restricted to `[A-Za-z0-9_]`, never starting with a digit and never
/// the `end` keyword.
pub fn sanitize_id(id: &str) -> String {
    let mut clean = ID_INVALID_RE.replace_all(id, "_").into_owned();
    let starts_with_digit = clean.chars().next().is_none_or(|c| c.is_ascii_digit());
    if starts_with_digit || clean.eq_ignore_ascii_case("end") {
        clean.insert_str(0, "n_");
    }
    clean
}

struct IdMap {
    ids: HashMap<String, String>,
    taken: HashSet<String>,
}

impl IdMap {
    fn new() -> Self {
        Self {
            ids: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    /// `None` when the id was already declared.
    fn declare(&mut self, id: &str) -> Option<String> {
        if id.is_empty() || self.ids.contains_key(id) {
            return None;
        }
        let base = sanitize_id(id);
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        self.ids.insert(id.to_string(), candidate.clone());
        Some(candidate)
    }

    fn get(&self, id: &str) -> Option<&str> {
        self.ids.get(id).map(String::as_str)
    }
}

/// Renders the document as a top-down mermaid flowchart: tasks as boxes,
/// gateways as rhombi, and flows as arrows labeled with their condition.
pub fn generate_mermaid(doc: &FlowDocument) -> String {
    let mut lines = vec!["flowchart TD".to_string()];
    let mut ids = IdMap::new();

    for task in &doc.tasks {
        if let Some(id) = ids.declare(&task.id) {
            let label = if task.name.trim().is_empty() { &task.id } else { &task.name };
            lines.push(format!("    {id}[\"{}\"]", sanitize_label(label)));
        }
    }
    for gateway in &doc.gateways {
        if let Some(id) = ids.declare(&gateway.id) {
            let label = if gateway.name.trim().is_empty() { &gateway.id } else { &gateway.name };
            lines.push(format!("    {id}{{\"{}\"}}", sanitize_label(label)));
        }
    }
    if lines.len() > 1 {
        lines.push(String::new());
    }

    for flow in &doc.flows {
        let (Some(from), Some(to)) = (ids.get(&flow.from), ids.get(&flow.to)) else {
            debug!("skipping flow '{}' with an unresolved endpoint", flow.id);
            continue;
        };
        match flow.condition.as_deref().map(sanitize_label).filter(|c| !c.is_empty()) {
            Some(condition) => lines.push(format!("    {from} -->|\"{condition}\"| {to}")),
            None => lines.push(format!("    {from} --> {to}")),
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
