use std::path::Path;

use flowlane::layout::{FALLBACK_LANE_ID, FALLBACK_LANE_LABEL, RouteKind};
use flowlane::theme::Theme;
use flowlane::{
    FlowDocument, Layout, LayoutConfig, compute_layout, generate_mermaid, parse_document, render_html,
    render_svg, to_bpmn_xml, validate_bpmn,
};

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

fn load_fixture(name: &str) -> FlowDocument {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let input = std::fs::read_to_string(&path).expect("fixture read failed");
    parse_document(&input).expect("parse failed")
}

fn layout_fixture(name: &str) -> (FlowDocument, Layout) {
    let doc = load_fixture(name);
    let layout = compute_layout(&doc, &LayoutConfig::default());
    (doc, layout)
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    let fixtures = [
        "purchase.json",
        "cyclic.json",
        "dangling.json",
        "empty.json",
        "no_actors.json",
        "lenient.json",
    ];
    let theme = Theme::bpmn_default();
    let config = LayoutConfig::default();
    for fixture in fixtures {
        let doc = load_fixture(fixture);
        let layout = compute_layout(&doc, &config);
        let svg = render_svg(&layout, &theme, &config);
        assert_valid_svg(&svg, fixture);
        assert!(render_html(&doc, &svg).contains(&svg), "{fixture}: html lacks the diagram");

        let xml = to_bpmn_xml(&doc, &layout).unwrap_or_else(|err| panic!("{fixture}: {err}"));
        let report = validate_bpmn(&xml);
        assert!(report.is_valid(), "{fixture}: {:?}", report.errors);

        assert!(generate_mermaid(&doc).starts_with("flowchart TD\n"), "{fixture}");
    }
}

#[test]
fn purchase_lanes_follow_actor_order() {
    let (_, layout) = layout_fixture("purchase.json");
    let ids: Vec<&str> = layout
        .lanes
        .iter()
        .map(|lane| lane.participant_id.as_str())
        .collect();
    assert_eq!(ids, vec!["applicant", "manager", "procurement", "erp"]);
    assert_eq!(layout.nodes["t_request"].lane_index, 0);
    assert_eq!(layout.nodes["t_revise"].lane_index, 0);
    assert_eq!(layout.nodes["t_order"].lane_index, 3);
}

#[test]
fn purchase_gateway_sits_with_its_predecessor() {
    let (_, layout) = layout_fixture("purchase.json");
    let review = &layout.nodes["t_review"];
    let gateway = &layout.nodes["g_approve"];
    assert_eq!(gateway.lane_index, review.lane_index);
    assert_eq!(gateway.rank_index, review.rank_index + 1);
    assert!(gateway.kind.is_gateway());
}

#[test]
fn purchase_ranks_respect_flow_order() {
    let (_, layout) = layout_fixture("purchase.json");
    let rank = |id: &str| layout.nodes[id].rank_index;
    assert_eq!(rank("t_request"), 0);
    assert_eq!(rank("t_review"), 1);
    assert_eq!(rank("g_approve"), 2);
    assert_eq!(rank("t_quote"), 3);
    assert_eq!(rank("t_revise"), 3);
    assert_eq!(rank("t_order"), 4);
    assert_eq!(layout.ranks[0].phase_label.as_deref(), Some("Request"));
    assert!(layout.nodes["t_request"].x < layout.nodes["t_order"].x);
}

#[test]
fn purchase_back_edge_is_routed_orthogonally() {
    let (_, layout) = layout_fixture("purchase.json");
    let back = layout.edge("f5").expect("f5 routed");
    assert_eq!(back.route, RouteKind::Orthogonal);
    assert_eq!(back.points.len(), 4);
    assert_eq!(back.points[0], layout.nodes["t_revise"].right_mid());
    assert_eq!(back.points[3], layout.nodes["t_review"].left_mid());
    for pair in back.points.windows(2) {
        assert!(pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1);
    }
}

#[test]
fn purchase_bpmn_carries_semantics_and_geometry() {
    let (doc, layout) = layout_fixture("purchase.json");
    let xml = to_bpmn_xml(&doc, &layout).unwrap();
    assert!(xml.contains("<bpmn2:serviceTask id=\"t_order\""));
    assert!(xml.contains("<bpmn2:userTask id=\"t_review\" name=\"Review request\"/>"));
    assert!(xml.contains("<bpmn2:lane id=\"Lane_erp\" name=\"ERP\">"));
    assert_eq!(xml.matches("<bpmn2:conditionExpression").count(), 2);
    assert_eq!(xml.matches("<bpmndi:BPMNEdge").count(), 6);
    // participant, 4 lanes, 6 nodes
    assert_eq!(xml.matches("<bpmndi:BPMNShape").count(), 11);
}

#[test]
fn purchase_review_page_lists_issues() {
    let (doc, layout) = layout_fixture("purchase.json");
    let svg = render_svg(&layout, &Theme::bpmn_default(), &LayoutConfig::default());
    let html = render_html(&doc, &svg);
    assert!(html.contains("<title>Purchase Request</title>"));
    assert!(html.contains("Source: procurement-interview.md / Last updated: 2025-03-14"));
    assert!(html.contains("Actors: 4 / Phases: 3 / Tasks: 5 / Gateways: 1"));
    assert!(html.contains("<li>Approval threshold for small purchases is UNKNOWN</li>"));
}

#[test]
fn cyclic_fixture_terminates_with_distinct_ranks() {
    let (_, layout) = layout_fixture("cyclic.json");
    let mut ranks: Vec<usize> = layout.nodes.values().map(|node| node.rank_index).collect();
    ranks.sort_unstable();
    assert_eq!(ranks, vec![0, 1, 2]);
    assert_eq!(layout.edges.len(), 3);
}

#[test]
fn dangling_fixture_drops_unresolved_flows() {
    let (doc, layout) = layout_fixture("dangling.json");
    assert_eq!(doc.flows.len(), 3);
    assert_eq!(layout.edges.len(), 1);
    assert_eq!(layout.edges[0].id, "f1");
    let xml = to_bpmn_xml(&doc, &layout).unwrap();
    assert!(!xml.contains("invoice"));
    assert!(!xml.contains("audit"));
}

#[test]
fn empty_fixture_is_minimum_canvas() {
    let (_, layout) = layout_fixture("empty.json");
    assert!(layout.nodes.is_empty());
    assert!(layout.lanes.is_empty());
    let (width, height) = LayoutConfig::default().min_canvas();
    assert_eq!((layout.width, layout.height), (width, height));
}

#[test]
fn actorless_fixture_shares_one_lane() {
    let (doc, layout) = layout_fixture("no_actors.json");
    assert_eq!(layout.lanes.len(), 1);
    assert_eq!(layout.lanes[0].participant_id, FALLBACK_LANE_ID);
    assert_eq!(layout.lanes[0].label, FALLBACK_LANE_LABEL);
    assert!(layout.nodes.values().all(|node| node.lane_index == 0));
    assert_eq!(layout.edges.len(), 2);

    let xml = to_bpmn_xml(&doc, &layout).unwrap();
    assert!(xml.contains("<bpmn2:lane id=\"Lane_default_lane\" name=\"Participant\">"));
    let svg = render_svg(&layout, &Theme::bpmn_default(), &LayoutConfig::default());
    assert!(svg.contains(">Participant</tspan>"));
}

#[test]
fn lenient_fixture_synthesizes_flow_ids() {
    let (doc, layout) = layout_fixture("lenient.json");
    assert_eq!(doc.tasks.len(), 2);
    assert_eq!(layout.edges.len(), 1);
    assert_eq!(layout.edges[0].id, "flow_1");
    let xml = to_bpmn_xml(&doc, &layout).unwrap();
    assert!(xml.contains("<bpmn2:sequenceFlow id=\"flow_1\" sourceRef=\"t1\" targetRef=\"t2\"/>"));
}

#[test]
fn custom_config_changes_geometry() {
    let doc = load_fixture("purchase.json");
    let mut config = LayoutConfig::default();
    config.rank_spacing = 200.0;
    config.lane_min_height = 300.0;
    let wide = compute_layout(&doc, &config);
    let narrow = compute_layout(&doc, &LayoutConfig::default());
    assert!(wide.width > narrow.width);
    assert!(wide.height > narrow.height);
    assert!(wide.lanes.iter().all(|lane| lane.height >= 300.0));
}
