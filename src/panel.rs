//! Floating panels: focus and z-order, grid-snapped move/resize, expand/collapse and the
//! two-stage close animation.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::config::PanelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PanelId(pub u64);

impl std::fmt::Display for PanelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Graph,
    Strings,
    Breakpoints,
    Clock,
    Text,
}

impl PanelKind {
    pub fn title(self) -> &'static str {
        match self {
            PanelKind::Graph => "Graph View",
            PanelKind::Strings => "Strings",
            PanelKind::Breakpoints => "Breakpoints",
            PanelKind::Clock => "Clock View",
            PanelKind::Text => "Text",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub kind: PanelKind,
    pub title: Option<String>,
    pub position: (f32, f32),
    pub size: Option<(f32, f32)>,
}

impl PanelSpec {
    pub fn new(kind: PanelKind) -> Self {
        Self {
            kind,
            title: None,
            position: (0.0, 0.0),
            size: None,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = (x, y);
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.size = Some((width, height));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Open,
    Closing { started: Duration },
}

/// Close animation stage with its progress in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseStage {
    BodyFade(f32),
    HeaderFade(f32),
    Done,
}

/// Input regions a panel can have bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Header,
    DropButton,
    CloseButton,
    ResizeHandle,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: PanelId,
    pub kind: PanelKind,
    pub title: String,
    pub x: f32,
    pub y: f32,
    /// Expanded size; kept while collapsed.
    pub width: f32,
    pub height: f32,
    pub expanded: bool,
    pub z: u32,
    pub focused: bool,
    pub phase: Phase,
    elevated: bool,
}

impl Panel {
    pub fn rendered_height(&self, config: &PanelConfig) -> f32 {
        if self.expanded {
            self.height
        } else {
            config.header_height
        }
    }

    /// Display z-order; raised to `drag_z_index` while the panel is being dragged.
    pub fn effective_z(&self, config: &PanelConfig) -> u32 {
        if self.elevated {
            config.drag_z_index
        } else {
            self.z
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn is_closing(&self) -> bool {
        matches!(self.phase, Phase::Closing { .. })
    }

    pub fn close_stage(&self, now: Duration, config: &PanelConfig) -> Option<CloseStage> {
        let Phase::Closing { started } = self.phase else {
            return None;
        };
        let elapsed = now.saturating_sub(started).as_millis() as f32;
        let fade = config.close_fade_ms.max(1) as f32;
        let collapse = config.close_collapse_ms.max(1) as f32;
        Some(if elapsed < fade {
            CloseStage::BodyFade(elapsed / fade)
        } else if elapsed < fade + collapse {
            CloseStage::HeaderFade((elapsed - fade) / collapse)
        } else {
            CloseStage::Done
        })
    }

    fn contains(&self, x: f32, y: f32, config: &PanelConfig) -> bool {
        x >= self.x
            && x <= self.x + self.width
            && y >= self.y
            && y <= self.y + self.rendered_height(config)
    }

    fn region_at(&self, x: f32, y: f32, config: &PanelConfig) -> Option<Region> {
        if !self.contains(x, y, config) {
            return None;
        }
        let right = self.x + self.width;
        if y <= self.y + config.header_height {
            let button = config.button_size;
            return Some(if x >= right - button {
                Region::CloseButton
            } else if x >= right - 2.0 * button {
                Region::DropButton
            } else {
                Region::Header
            });
        }
        let handle = config.resize_handle_size;
        let bottom = self.y + self.rendered_height(config);
        if x >= right - handle && y >= bottom - handle {
            return Some(Region::ResizeHandle);
        }
        Some(Region::Body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelEvent {
    None,
    MoveStarted(PanelId),
    Moved { id: PanelId, x: f32, y: f32 },
    ResizeStarted(PanelId),
    Resized { id: PanelId, width: f32, height: f32 },
    GestureEnded(PanelId),
    ExpandToggled { id: PanelId, expanded: bool },
    CloseStarted(PanelId),
    /// Pointer input inside a panel body, in body-local coordinates.
    BodyPointer {
        id: PanelId,
        phase: PointerPhase,
        x: f32,
        y: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Capture {
    Move {
        id: PanelId,
        grab: (f32, f32),
    },
    Resize {
        id: PanelId,
        start: (f32, f32),
        size: (f32, f32),
    },
    Body {
        id: PanelId,
    },
}

impl Capture {
    fn panel(&self) -> PanelId {
        match *self {
            Capture::Move { id, .. } | Capture::Resize { id, .. } | Capture::Body { id } => id,
        }
    }
}

fn snap(value: f32, grid: f32) -> f32 {
    (value / grid).round() * grid
}

#[derive(Debug, Clone)]
pub struct PanelManager {
    config: PanelConfig,
    panels: Vec<Panel>,
    bindings: BTreeMap<PanelId, BTreeSet<Region>>,
    capture: Option<Capture>,
    next_id: u64,
    now: Duration,
}

impl PanelManager {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            config: config.clone(),
            panels: Vec::new(),
            bindings: BTreeMap::new(),
            capture: None,
            next_id: 1,
            now: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.iter().find(|panel| panel.id == id)
    }

    fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.iter_mut().find(|panel| panel.id == id)
    }

    pub fn focused(&self) -> Option<PanelId> {
        self.panels.iter().find(|panel| panel.focused).map(|panel| panel.id)
    }

    /// Panels in paint order, bottom first.
    pub fn stacking_order(&self) -> Vec<PanelId> {
        let mut panels: Vec<&Panel> = self.panels.iter().collect();
        panels.sort_by_key(|panel| panel.effective_z(&self.config));
        panels.into_iter().map(|panel| panel.id).collect()
    }

    pub fn add_panel(&mut self, spec: PanelSpec) -> PanelId {
        let id = PanelId(self.next_id);
        self.next_id += 1;
        let (width, height) = spec
            .size
            .unwrap_or((self.config.default_width, self.config.default_height));
        self.panels.push(Panel {
            id,
            kind: spec.kind,
            title: spec.title.unwrap_or_else(|| spec.kind.title().to_string()),
            x: spec.position.0,
            y: spec.position.1,
            width: width.max(self.config.min_width),
            height: height.max(self.config.min_height),
            expanded: true,
            z: self.panels.len() as u32 + 1,
            focused: false,
            phase: Phase::Open,
            elevated: false,
        });
        self.bindings.insert(
            id,
            BTreeSet::from([
                Region::Header,
                Region::DropButton,
                Region::CloseButton,
                Region::ResizeHandle,
                Region::Body,
            ]),
        );
        tracing::debug!(%id, kind = ?spec.kind, "panel added");
        self.focus(id);
        id
    }

    /// Makes `id` the single focused panel at the top of the stack. Panels above its
    /// previous slot move down one step, so z-orders stay a permutation of `1..=N`.
    pub fn focus(&mut self, id: PanelId) -> bool {
        let Some(previous) = self.panel(id).map(|panel| panel.z) else {
            return false;
        };
        let top = self.panels.len() as u32;
        for panel in &mut self.panels {
            if panel.id == id {
                panel.z = top;
                panel.focused = true;
            } else {
                panel.focused = false;
                if panel.z > previous {
                    panel.z -= 1;
                }
            }
        }
        true
    }

    /// Detaches the panel, releases its bindings and any gesture it holds, then focuses
    /// the highest remaining panel, preferring one that is not closing.
    pub fn remove_panel(&mut self, id: PanelId) -> Option<Panel> {
        let index = self.panels.iter().position(|panel| panel.id == id)?;
        let removed = self.panels.remove(index);
        for panel in &mut self.panels {
            if panel.z > removed.z {
                panel.z -= 1;
            }
        }
        self.bindings.remove(&id);
        if self.capture.is_some_and(|capture| capture.panel() == id) {
            self.capture = None;
        }
        let top = self
            .panels
            .iter()
            .filter(|panel| !panel.is_closing())
            .max_by_key(|panel| panel.z)
            .or_else(|| self.panels.iter().max_by_key(|panel| panel.z))
            .map(|panel| panel.id);
        if let Some(top) = top {
            self.focus(top);
        }
        tracing::debug!(%id, remaining = self.panels.len(), "panel removed");
        Some(removed)
    }

    pub fn is_bound(&self, id: PanelId, region: Region) -> bool {
        self.bindings.get(&id).is_some_and(|regions| regions.contains(&region))
    }

    pub fn bound_regions(&self, id: PanelId) -> Vec<Region> {
        self.bindings
            .get(&id)
            .map(|regions| regions.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of panels with at least one bound input region.
    pub fn bound_panel_count(&self) -> usize {
        self.bindings.len()
    }

    /// Collapsing drops the body and resize handle bindings; expanding restores them.
    pub fn set_expanded(&mut self, id: PanelId, expanded: bool) -> bool {
        let Some(panel) = self.panel_mut(id) else {
            return false;
        };
        if panel.expanded == expanded || panel.is_closing() {
            return false;
        }
        panel.expanded = expanded;
        if let Some(regions) = self.bindings.get_mut(&id) {
            if expanded {
                regions.insert(Region::ResizeHandle);
                regions.insert(Region::Body);
            } else {
                regions.remove(&Region::ResizeHandle);
                regions.remove(&Region::Body);
            }
        }
        if !expanded
            && matches!(self.capture, Some(Capture::Resize { id: captured, .. } | Capture::Body { id: captured }) if captured == id)
        {
            self.capture = None;
        }
        true
    }

    pub fn toggle_expanded(&mut self, id: PanelId) -> Option<bool> {
        let expanded = !self.panel(id)?.expanded;
        self.set_expanded(id, expanded).then_some(expanded)
    }

    /// Starts the close animation. The panel stops taking input immediately and is
    /// removed by [`PanelManager::tick`] once both stages have elapsed.
    pub fn close(&mut self, id: PanelId) -> bool {
        let now = self.now;
        let Some(panel) = self.panel_mut(id) else {
            return false;
        };
        if panel.is_closing() {
            return false;
        }
        panel.phase = Phase::Closing { started: now };
        panel.elevated = false;
        if self.capture.is_some_and(|capture| capture.panel() == id) {
            self.capture = None;
        }
        tracing::debug!(%id, "panel closing");
        true
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advances the clock and removes panels whose close animation finished.
    pub fn tick(&mut self, now: Duration) -> Vec<PanelId> {
        self.now = self.now.max(now);
        let finished: Vec<PanelId> = self
            .panels
            .iter()
            .filter(|panel| panel.close_stage(self.now, &self.config) == Some(CloseStage::Done))
            .map(|panel| panel.id)
            .collect();
        for id in &finished {
            self.remove_panel(*id);
        }
        finished
    }

    /// Topmost open panel under the point and the bound region that was hit.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<(PanelId, Region)> {
        let mut panels: Vec<&Panel> = self.panels.iter().filter(|p| !p.is_closing()).collect();
        panels.sort_by_key(|panel| std::cmp::Reverse(panel.effective_z(&self.config)));
        panels.into_iter().find_map(|panel| {
            let region = panel.region_at(x, y, &self.config)?;
            let region = if self.is_bound(panel.id, region) {
                region
            } else if region == Region::ResizeHandle && self.is_bound(panel.id, Region::Body) {
                Region::Body
            } else {
                return None;
            };
            Some((panel.id, region))
        })
    }

    /// Whether the panel is being moved or resized, is collapsed or is closing.
    pub fn is_busy(&self, id: PanelId) -> bool {
        let gesture = matches!(
            self.capture,
            Some(Capture::Move { id: captured, .. } | Capture::Resize { id: captured, .. }) if captured == id
        );
        gesture
            || self
                .panel(id)
                .is_none_or(|panel| !panel.expanded || panel.is_closing())
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) -> PanelEvent {
        let Some((id, region)) = self.hit_test(x, y) else {
            return PanelEvent::None;
        };
        match region {
            Region::Header => {
                self.focus(id);
                let Some(panel) = self.panel_mut(id) else {
                    return PanelEvent::None;
                };
                panel.elevated = true;
                let grab = (x - panel.x, y - panel.y);
                self.capture = Some(Capture::Move { id, grab });
                PanelEvent::MoveStarted(id)
            }
            Region::DropButton => {
                self.focus(id);
                match self.toggle_expanded(id) {
                    Some(expanded) => PanelEvent::ExpandToggled { id, expanded },
                    None => PanelEvent::None,
                }
            }
            Region::CloseButton => {
                if self.close(id) {
                    PanelEvent::CloseStarted(id)
                } else {
                    PanelEvent::None
                }
            }
            Region::ResizeHandle => {
                self.focus(id);
                let Some(panel) = self.panel(id) else {
                    return PanelEvent::None;
                };
                let size = (panel.width, panel.height);
                self.capture = Some(Capture::Resize {
                    id,
                    start: (x, y),
                    size,
                });
                PanelEvent::ResizeStarted(id)
            }
            Region::Body => {
                self.focus(id);
                self.capture = Some(Capture::Body { id });
                self.body_event(id, PointerPhase::Down, x, y)
            }
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) -> PanelEvent {
        let grid = self.config.grid_size;
        let (min_width, min_height) = (self.config.min_width, self.config.min_height);
        match self.capture {
            None => PanelEvent::None,
            Some(Capture::Move { id, grab }) => {
                let Some(panel) = self.panel_mut(id) else {
                    return PanelEvent::None;
                };
                panel.x = snap(x - grab.0, grid);
                panel.y = snap(y - grab.1, grid);
                PanelEvent::Moved {
                    id,
                    x: panel.x,
                    y: panel.y,
                }
            }
            Some(Capture::Resize { id, start, size }) => {
                let Some(panel) = self.panel_mut(id) else {
                    return PanelEvent::None;
                };
                panel.width = (size.0 + snap(x - start.0, grid)).max(min_width);
                panel.height = (size.1 + snap(y - start.1, grid)).max(min_height);
                PanelEvent::Resized {
                    id,
                    width: panel.width,
                    height: panel.height,
                }
            }
            Some(Capture::Body { id }) => self.body_event(id, PointerPhase::Move, x, y),
        }
    }

    pub fn pointer_up(&mut self, x: f32, y: f32) -> PanelEvent {
        let Some(capture) = self.capture.take() else {
            return PanelEvent::None;
        };
        match capture {
            Capture::Body { id } => self.body_event(id, PointerPhase::Up, x, y),
            Capture::Move { id, .. } | Capture::Resize { id, .. } => {
                if let Some(panel) = self.panel_mut(id) {
                    panel.elevated = false;
                }
                PanelEvent::GestureEnded(id)
            }
        }
    }

    fn body_event(&self, id: PanelId, phase: PointerPhase, x: f32, y: f32) -> PanelEvent {
        let Some(panel) = self.panel(id) else {
            return PanelEvent::None;
        };
        PanelEvent::BodyPointer {
            id,
            phase,
            x: x - panel.x,
            y: y - panel.y - self.config.header_height,
        }
    }

    /// Body size of an expanded panel.
    pub fn body_size(&self, id: PanelId) -> Option<(f32, f32)> {
        let panel = self.panel(id)?;
        Some((panel.width, (panel.height - self.config.header_height).max(0.0)))
    }
}
