use std::path::Path;

use cfgview::parser::ParseError;
use cfgview::provider::EmptyContentProvider;
use cfgview::render::{Branch, RenderState};
use cfgview::surface::MonospaceMeasurer;
use cfgview::{Config, Graph, GraphRenderer, parse_graph, render_svg};

fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("{}: {err}", path.display()))
}

fn load(name: &str) -> Graph {
    parse_graph(&fixture(name), Box::new(EmptyContentProvider)).expect("fixture parses")
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.render.fast_text = true;
    config
}

fn prepared(name: &str) -> (Graph, GraphRenderer) {
    let mut graph = load(name);
    let mut renderer = GraphRenderer::new(&fast_config());
    let state = renderer.preprocess(&MonospaceMeasurer::default(), &mut graph);
    assert_eq!(state, &RenderState::Ready, "{name}");
    (graph, renderer)
}

#[test]
fn render_all_fixtures() {
    // Keep this list explicit so new fixtures must be added intentionally.
    for name in ["branch.json5", "switch.json5", "loop.json5", "provided.json5"] {
        let mut graph = parse_graph(
            &fixture(name),
            Box::new(cfgview::provider::DebugContentProvider::new(1)),
        )
        .unwrap();
        let svg = render_svg(&mut graph, &fast_config(), None);
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
        assert!(svg.contains("<polyline"), "{name}: no edges drawn");
        assert!(!svg.contains("unable to display graph"), "{name}: error display");
    }
}

#[test]
fn two_way_branch_places_targets_on_one_rank() {
    let (_, renderer) = prepared("branch.json5");
    let layout = renderer.layout().unwrap();
    assert_eq!(layout.vertices[0].rank, 0);
    assert_eq!(layout.vertices[1].rank, 1);
    assert_eq!(layout.vertices[2].rank, 1);
    assert_eq!(layout.vertices[1].center_y, layout.vertices[2].center_y);

    let mut branches: Vec<Branch> = renderer.edge_routes().iter().map(|r| r.branch).collect();
    branches.sort_by_key(|b| *b as u8);
    assert_eq!(branches, vec![Branch::True, Branch::False]);
}

#[test]
fn five_way_switch_has_one_direct_middle_edge() {
    let (_, renderer) = prepared("switch.json5");
    let layout = renderer.layout().unwrap();
    let routes: Vec<_> = renderer
        .edge_routes()
        .iter()
        .filter(|route| route.source == 0)
        .collect();
    assert_eq!(routes.len(), 5);

    let count = |branch| routes.iter().filter(|r| r.branch == branch).count();
    assert_eq!(count(Branch::True), 2);
    assert_eq!(count(Branch::False), 2);
    assert_eq!(count(Branch::Direct), 1);

    let mut by_x: Vec<_> = routes.iter().map(|r| (layout.vertices[r.target].center_x, r)).collect();
    by_x.sort_by(|a, b| a.0.total_cmp(&b.0));
    assert_eq!(by_x[2].1.branch, Branch::Direct);
    let source_mid = layout.vertices[0].center_x;
    assert_eq!(by_x[2].1.start_offset(source_mid), 0.0);
    assert!(by_x[0].1.start_offset(source_mid) < by_x[1].1.start_offset(source_mid));
    assert!(by_x[3].1.start_offset(source_mid) > 0.0);
}

#[test]
fn back_edge_enters_the_loop_header_from_below() {
    let (_, renderer) = prepared("loop.json5");
    let layout = renderer.layout().unwrap();
    let back = renderer
        .edge_routes()
        .iter()
        .find(|route| route.source == 2 && route.target == 1)
        .expect("latch edge");
    let header = &layout.vertices[1];
    let latch = &layout.vertices[2];
    assert!(latch.rank > header.rank);

    let end = *back.points.last().unwrap();
    assert_eq!(end, (header.center_x, header.bottom()));
    for pair in back.points.windows(2) {
        assert!(pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1);
    }
}

#[test]
fn layout_is_deterministic() {
    let (_, first) = prepared("switch.json5");
    let (_, second) = prepared("switch.json5");
    assert_eq!(first.layout(), second.layout());
    assert_eq!(first.edge_routes(), second.edge_routes());
}

#[test]
fn single_line_vertex_is_only_vertical_padding_tall() {
    let (_, renderer) = prepared("branch.json5");
    let metrics = renderer.metrics();
    assert_eq!(metrics[1].height, 40.0);
    assert!(metrics[0].height > metrics[1].height);
}

#[test]
fn provider_fills_vertices_without_lines() {
    let graph = parse_graph(
        &fixture("provided.json5"),
        Box::new(cfgview::provider::DebugContentProvider::new(4)),
    )
    .unwrap();
    assert_eq!(graph.vertex_count(), 3);
    assert!(graph.vertices().iter().all(|v| !v.lines.is_empty()));
    assert_eq!(graph.root().index(), 1);
}

#[test]
fn malformed_documents_are_rejected() {
    let parse = |src: &str| parse_graph(src, Box::new(EmptyContentProvider));
    assert!(matches!(parse("{ vertices: [] }"), Err(ParseError::Empty)));
    assert!(matches!(
        parse("{ vertices: [{ id: 1 }, { id: 1 }] }"),
        Err(ParseError::DuplicateVertex(1))
    ));
    assert!(matches!(
        parse("{ vertices: [{ id: 1 }], edges: [{ source: 1, target: 9 }] }"),
        Err(ParseError::UnknownVertex { index: 0, id: 9 })
    ));
    assert!(matches!(parse("{ vertices: [{ id: 1 }], root: 4 }"), Err(ParseError::UnknownRoot(4))));
    assert!(matches!(parse("{ vertices: "), Err(ParseError::Syntax(_))));
}
