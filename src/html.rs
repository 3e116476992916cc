use crate::ir::FlowDocument;
use crate::render::escape_xml;

const STYLE: &str = "body { font-family: \"Segoe UI\", sans-serif; margin: 24px; background-color: #fafafa; }
.panel { background: #fff; border-radius: 8px; padding: 16px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); margin-bottom: 24px; }
h1 { font-size: 24px; margin-bottom: 8px; }
h2 { font-size: 18px; margin-top: 0; }
ul { margin: 8px 0 0 20px; }
svg { width: 100%; height: auto; border: 1px solid #ddd; border-radius: 8px; background: #fff; }";

/// Review page for a rendered diagram: document metadata, the swimlane SVG
/// inline, element counts and the open issues.
pub fn render_html(doc: &FlowDocument, svg: &str) -> String {
    let meta = &doc.metadata;
    let title = escape_xml(or_dash(&meta.title));
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\"/>\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!("<style>\n{STYLE}\n</style>\n"));
    html.push_str("</head>\n<body>\n");

    html.push_str("<div class=\"panel\">\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str(&format!(
        "<p>ID: {} / Source: {} / Last updated: {}</p>\n",
        escape_xml(or_dash(&meta.id)),
        escape_xml(or_dash(&meta.source)),
        escape_xml(or_dash(&meta.last_updated))
    ));
    html.push_str("</div>\n");

    html.push_str("<div class=\"panel\">\n<h2>Swimlane view</h2>\n");
    html.push_str(svg);
    html.push_str("\n</div>\n");

    html.push_str("<div class=\"panel\">\n<h2>Summary</h2>\n");
    html.push_str(&format!(
        "<p>Actors: {} / Phases: {} / Tasks: {} / Gateways: {}</p>\n",
        doc.actors.len(),
        doc.phases.len(),
        doc.tasks.len(),
        doc.gateways.len()
    ));
    html.push_str("<h3>Issues</h3>\n<ul>\n");
    if doc.issues.is_empty() {
        html.push_str("<li>No issues recorded</li>\n");
    }
    for issue in &doc.issues {
        html.push_str(&format!("<li>{}</li>\n", escape_xml(&issue.note)));
    }
    html.push_str("</ul>\n</div>\n</body>\n</html>\n");
    html
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}
