use std::time::Duration;

use cfgview::camera::WheelInput;
use cfgview::menu::default_menu;
use cfgview::panel::{PanelEvent, PanelKind, Region};
use cfgview::provider::{DebugContentProvider, sample_graph};
use cfgview::surface::RecordingSurface;
use cfgview::transport::{Delivery, MemoryTransport, Request};
use cfgview::view::FrameOutcome;
use cfgview::{Config, VertexHandle, Workspace};
use serde_json::json;

fn workspace() -> Workspace {
    let mut config = Config::default();
    config.render.fast_text = true;
    Workspace::new(config, default_menu())
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn header_drag_snaps_to_the_grid() {
    let mut ws = workspace();
    let id = ws.open_panel(PanelKind::Strings);
    ws.pointer_down(5.0, 5.0);
    let moved = ws.pointer_move(5.0 + 47.0, 5.0 + 23.0);
    assert_eq!(moved, PanelEvent::Moved { id, x: 40.0, y: 20.0 });
    ws.pointer_up(52.0, 28.0);

    let panel = ws.panels().panel(id).unwrap();
    assert_eq!((panel.x % 20.0, panel.y % 20.0), (0.0, 0.0));
    assert!(!panel.is_elevated());
}

#[test]
fn focus_and_removal_keep_a_single_topmost_panel() {
    let mut ws = workspace();
    for _ in 0..4 {
        ws.open_panel(PanelKind::Text);
    }
    let count = ws.panels().len() as u32;
    for _ in 0..3 {
        ws.activate(&["View", "Clock View"]).unwrap();
        let clock = ws.panels().focused().unwrap();
        ws.close_panel(clock);
        ws.tick(ws.panels().now() + ms(1000));
        assert_eq!(ws.panels().len() as u32, count);
        assert!(ws.panels().panel(clock).is_none());
    }

    let focused = ws.panels().focused().unwrap();
    let top = ws.panels().panel(focused).unwrap().z;
    assert_eq!(top, count);
    assert_eq!(ws.panels().panels().iter().filter(|p| p.focused).count(), 1);
    let mut z: Vec<u32> = ws.panels().panels().iter().map(|p| p.z).collect();
    z.sort_unstable();
    assert_eq!(z, (1..=count).collect::<Vec<_>>());
}

#[test]
fn graph_panel_pans_zooms_and_selects() {
    let mut ws = workspace();
    let graph = sample_graph(Box::new(DebugContentProvider::new(8)));
    let id = ws.open_graph(graph, Some("main".to_string()));
    let mut surface = RecordingSurface::new(601.0, 380.0);
    assert_eq!(ws.frame(id, &mut surface), FrameOutcome::Painted);
    assert_eq!(ws.frame(id, &mut surface), FrameOutcome::Idle);

    assert!(ws.wheel(300.0, 200.0, WheelInput::lines(-40.0)));
    assert!((ws.view(id).unwrap().camera().zoom() - 1.2).abs() < 1e-5);
    assert_eq!(ws.frame(id, &mut surface), FrameOutcome::Painted);
    // Header and empty workspace take no wheel input.
    assert!(!ws.wheel(300.0, 10.0, WheelInput::lines(-40.0)));
    assert!(!ws.wheel(900.0, 200.0, WheelInput::lines(-40.0)));

    ws.tick(ms(5000));
    let before = ws.view(id).unwrap().camera().position();
    ws.pointer_down(100.0, 100.0);
    ws.pointer_move(160.0, 130.0);
    ws.pointer_up(160.0, 130.0);
    assert_ne!(ws.view(id).unwrap().camera().position(), before);
    assert_eq!(ws.view(id).unwrap().graph().selected(), None);

    // Click a visible box once the suppression window has passed.
    ws.tick(ms(5500));
    ws.frame(id, &mut surface);
    let view = ws.view(id).unwrap();
    let (target, sx, sy) = view
        .renderer()
        .vertex_drawings()
        .iter()
        .map(|d| {
            let (sx, sy) = view
                .camera()
                .canvas_to_screen(d.x + d.width / 2.0, d.y + d.height / 2.0);
            (d.id, sx, sy)
        })
        .find(|(_, sx, sy)| (10.0..560.0).contains(sx) && (10.0..340.0).contains(sy))
        .expect("a vertex inside the panel body");
    let panel = ws.panels().panel(id).unwrap();
    let (wx, wy) = (panel.x + sx, panel.y + 20.0 + sy);
    assert_eq!(ws.panels().hit_test(wx, wy).map(|hit| hit.1), Some(Region::Body));
    ws.pointer_down(wx, wy);
    ws.pointer_up(wx, wy);
    assert_eq!(ws.view(id).unwrap().graph().selected(), Some(VertexHandle::new(target)));
}

#[test]
fn wheel_zoom_is_clamped() {
    let mut ws = workspace();
    let id = ws.open_panel(PanelKind::Graph);
    ws.wheel(100.0, 100.0, WheelInput::lines(-100_000.0));
    assert_eq!(ws.view(id).unwrap().camera().zoom(), 5.0);
    ws.wheel(100.0, 100.0, WheelInput::pixels(100_000.0));
    assert_eq!(ws.view(id).unwrap().camera().zoom(), 0.1);
    ws.wheel(100.0, 100.0, WheelInput::pixels(f32::NAN));
    assert_eq!(ws.view(id).unwrap().camera().zoom(), 0.1);
}

#[test]
fn collapsed_graph_panel_is_not_painted() {
    let mut ws = workspace();
    let id = ws.open_panel(PanelKind::Graph);
    let mut surface = RecordingSurface::new(601.0, 380.0);
    let drop_button = (601.0 - 30.0, 10.0);
    assert_eq!(
        ws.pointer_down(drop_button.0, drop_button.1),
        PanelEvent::ExpandToggled { id, expanded: false }
    );
    assert_eq!(ws.frame(id, &mut surface), FrameOutcome::Suppressed);
    assert!(surface.commands().is_empty());
    ws.pointer_down(drop_button.0, drop_button.1);
    assert_eq!(ws.frame(id, &mut surface), FrameOutcome::Painted);
}

#[test]
fn closing_releases_bindings_and_discards_late_responses() {
    let mut ws = workspace();
    let mut transport = MemoryTransport::new();
    let keep = ws.open_panel(PanelKind::Strings);
    let closing = ws.open_panel(PanelKind::Graph);

    let ticket = ws
        .send(&mut transport, closing, Request::new("lex", json!({ "line": 3 })), true)
        .unwrap();
    ws.send(&mut transport, keep, Request::new("strings", json!(null)), true);
    assert_eq!(transport.sent().len(), 2);

    ws.tick(ms(100));
    assert!(ws.close_panel(closing));
    assert!(ws.tick(ms(600)).is_empty());
    assert!(ws.view(closing).is_some());
    assert_eq!(ws.tick(ms(1100)), vec![closing]);
    assert!(ws.view(closing).is_none());
    assert!(ws.panels().bound_regions(closing).is_empty());
    assert_eq!(ws.panels().focused(), Some(keep));

    let late = format!(r#"{{"status":"ok","ticket":{},"data":[]}}"#, ticket.0);
    assert_eq!(
        ws.receive(&late).unwrap(),
        Delivery::Discarded { method: "lex".to_string() }
    );
    let delivery = ws.receive(r#"{"status":"ok","data":["hello"]}"#).unwrap();
    assert!(matches!(delivery, Delivery::Deliver { owner, .. } if owner == keep));
    assert!(ws.pending().is_empty());
}
