use std::collections::BTreeMap;
use std::time::Duration;

use crate::camera::WheelInput;
use crate::config::Config;
use crate::ir::Graph;
use crate::menu::{Menu, MenuError};
use crate::panel::{PanelEvent, PanelId, PanelKind, PanelManager, PanelSpec, PointerPhase, Region};
use crate::provider::{DebugContentProvider, SimpleRng, random_graph};
use crate::surface::DrawingSurface;
use crate::transport::{Delivery, HostTransport, PendingRequests, Request, Ticket, TransportError};
use crate::view::{FrameOutcome, GraphView};

const GRAPH_PANEL_SIZE: (f32, f32) = (601.0, 400.0);
const CLOCK_PANEL_SIZE: (f32, f32) = (201.0, 200.0);

/// The debugger surface: floating panels, the graph views living in graph panels, the
/// toolbar menu and requests in flight to the host.
pub struct Workspace {
    config: Config,
    menu: Menu,
    panels: PanelManager,
    views: BTreeMap<PanelId, GraphView>,
    pending: PendingRequests,
    touch_target: Option<PanelId>,
    now: Duration,
    next_seed: u64,
    exit_requested: bool,
}

impl Workspace {
    pub fn new(config: Config, menu: Menu) -> Self {
        Self {
            panels: PanelManager::new(&config.panel),
            config,
            menu,
            views: BTreeMap::new(),
            pending: PendingRequests::new(),
            touch_target: None,
            now: Duration::ZERO,
            next_seed: 1,
            exit_requested: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn panels(&self) -> &PanelManager {
        &self.panels
    }

    pub fn view(&self, id: PanelId) -> Option<&GraphView> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: PanelId) -> Option<&mut GraphView> {
        self.views.get_mut(&id)
    }

    pub fn graph_panels(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.views.keys().copied()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Runs the menu action at `path`.
    pub fn activate(&mut self, path: &[&str]) -> Result<(), MenuError> {
        let action = self.menu.resolve(path)?;
        tracing::debug!(path = %path.join("/"), "menu action");
        (*action)(self);
        Ok(())
    }

    /// Opens a panel of `kind`; graph panels get a freshly generated debug graph.
    pub fn open_panel(&mut self, kind: PanelKind) -> PanelId {
        match kind {
            PanelKind::Graph => {
                let seed = self.next_seed;
                self.next_seed += 1;
                let mut rng = SimpleRng::new(seed);
                let graph = random_graph(Box::new(DebugContentProvider::new(seed)), &mut rng);
                self.open_graph(graph, None)
            }
            PanelKind::Clock => self.panels.add_panel(
                PanelSpec::new(kind).sized(CLOCK_PANEL_SIZE.0, CLOCK_PANEL_SIZE.1),
            ),
            _ => self.panels.add_panel(PanelSpec::new(kind)),
        }
    }

    pub fn open_graph(&mut self, graph: Graph, title: Option<String>) -> PanelId {
        let mut spec = PanelSpec::new(PanelKind::Graph).sized(GRAPH_PANEL_SIZE.0, GRAPH_PANEL_SIZE.1);
        spec.title = title;
        let id = self.panels.add_panel(spec);
        let viewport = self.panels.body_size(id).unwrap_or(GRAPH_PANEL_SIZE);
        self.views
            .insert(id, GraphView::new(graph, &self.config, viewport));
        id
    }

    pub fn close_panel(&mut self, id: PanelId) -> bool {
        self.panels.close(id)
    }

    fn forward(&mut self, event: PanelEvent) -> PanelEvent {
        match event {
            PanelEvent::BodyPointer { id, phase, x, y } => {
                let now = self.now;
                if let Some(view) = self.views.get_mut(&id) {
                    match phase {
                        PointerPhase::Down => view.pointer_down(x, y),
                        PointerPhase::Move => view.pointer_move(x, y),
                        PointerPhase::Up => {
                            view.pointer_up(now);
                            view.click(x, y, now);
                        }
                    }
                }
            }
            PanelEvent::Resized { id, .. } => {
                if let (Some(view), Some((width, height))) =
                    (self.views.get_mut(&id), self.panels.body_size(id))
                {
                    view.resize(width, height);
                }
            }
            _ => {}
        }
        event
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> PanelEvent {
        let event = self.panels.pointer_down(x, y);
        self.forward(event)
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> PanelEvent {
        let event = self.panels.pointer_move(x, y);
        self.forward(event)
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) -> PanelEvent {
        let event = self.panels.pointer_up(x, y);
        self.forward(event)
    }

    fn body_origin(&self, id: PanelId) -> Option<(f32, f32)> {
        let panel = self.panels.panel(id)?;
        Some((panel.x, panel.y + self.panels.config().header_height))
    }

    /// Wheel input over a graph panel body zooms its camera.
    pub fn wheel(&mut self, x: f32, y: f32, input: WheelInput) -> bool {
        let Some((id, Region::Body)) = self.panels.hit_test(x, y) else {
            return false;
        };
        match self.views.get_mut(&id) {
            Some(view) => {
                view.wheel(input);
                true
            }
            None => false,
        }
    }

    /// Touch points in workspace coordinates; the panel under the first touch keeps the
    /// gesture until [`Workspace::touch_end`].
    pub fn touch_move(&mut self, points: &[(f32, f32)]) {
        let target = match self.touch_target {
            Some(id) => id,
            None => {
                let Some(&(x, y)) = points.first() else {
                    return;
                };
                let Some((id, Region::Body)) = self.panels.hit_test(x, y) else {
                    return;
                };
                self.panels.focus(id);
                self.touch_target = Some(id);
                id
            }
        };
        let Some((ox, oy)) = self.body_origin(target) else {
            self.touch_target = None;
            return;
        };
        let local: Vec<(f32, f32)> = points.iter().map(|(x, y)| (x - ox, y - oy)).collect();
        if let Some(view) = self.views.get_mut(&target) {
            view.touch_move(&local);
        }
    }

    pub fn touch_end(&mut self) {
        let now = self.now;
        if let Some(view) = self.touch_target.take().and_then(|id| self.views.get_mut(&id)) {
            view.touch_end(now);
        }
    }

    /// Advances panel animations. Panels whose close finished are dropped together with
    /// their graph views; their in-flight requests are abandoned.
    pub fn tick(&mut self, now: Duration) -> Vec<PanelId> {
        self.now = self.now.max(now);
        let removed = self.panels.tick(self.now);
        for id in &removed {
            self.views.remove(id);
            if self.touch_target == Some(*id) {
                self.touch_target = None;
            }
            let abandoned = self.pending.abandon(*id);
            if abandoned > 0 {
                tracing::debug!(panel = %id, abandoned, "panel closed with requests in flight");
            }
        }
        removed
    }

    /// Runs one frame of the graph view in panel `id`.
    pub fn frame(&mut self, id: PanelId, surface: &mut dyn DrawingSurface) -> FrameOutcome {
        let busy = self.panels.is_busy(id);
        match self.views.get_mut(&id) {
            Some(view) => view.frame(surface, busy),
            None => FrameOutcome::Suppressed,
        }
    }

    pub fn send(
        &mut self,
        transport: &mut dyn HostTransport,
        owner: PanelId,
        request: Request,
        expect_response: bool,
    ) -> Option<Ticket> {
        self.pending.send(transport, owner, request, expect_response)
    }

    /// Routes a raw host response; responses for removed panels come back as
    /// [`Delivery::Discarded`].
    pub fn receive(&mut self, raw: &str) -> Result<Delivery, TransportError> {
        let delivery = self.pending.receive_raw(raw);
        if let Err(err) = &delivery {
            tracing::warn!(error = %err, "unreadable host response");
        }
        delivery
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("panels", &self.panels)
            .field("views", &self.views.len())
            .field("pending", &self.pending)
            .field("exit_requested", &self.exit_requested)
            .finish_non_exhaustive()
    }
}
