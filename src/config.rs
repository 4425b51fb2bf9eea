use crate::theme::Theme;
use anyhow::{Context, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap()
});

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value.trim())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexConfig {
    pub padding_box_horizontal: f32,
    pub padding_box_vertical: f32,
    pub padding_line: f32,
    pub size_border: f32,
    pub shadow_blur: f32,
    /// Shadow offset in canvas units before the zoom factor is applied.
    pub offset_shadow: f32,
    /// Treat the layout position as the box centre rather than its top-left corner.
    pub centering: bool,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            padding_box_horizontal: 10.0,
            padding_box_vertical: 20.0,
            padding_line: 5.0,
            size_border: 1.0,
            shadow_blur: 1.0,
            offset_shadow: 4.0,
            centering: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Fan-out step as a fraction of the source box width.
    pub padding_between_edges: f32,
    pub padding_line: f32,
    pub size_line: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            padding_between_edges: 0.05,
            padding_line: 25.0,
            size_line: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub order_passes: usize,
    pub margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            order_passes: 4,
            margin: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub initial_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub scroll_sensitivity: f32,
    pub trackpad_sensitivity: f32,
    /// Pixel-mode wheel deltas below this magnitude are treated as trackpad input.
    pub trackpad_delta_threshold: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_zoom: 0.1,
            min_zoom: 0.1,
            max_zoom: 5.0,
            scroll_sensitivity: 0.005,
            trackpad_sensitivity: 0.01,
            trackpad_delta_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub grid_size: f32,
    pub header_height: f32,
    pub drag_z_index: u32,
    pub close_fade_ms: u64,
    pub close_collapse_ms: u64,
    pub min_width: f32,
    pub min_height: f32,
    pub default_width: f32,
    pub default_height: f32,
    pub button_size: f32,
    pub resize_handle_size: f32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            header_height: 20.0,
            drag_z_index: 1000,
            close_fade_ms: 500,
            close_collapse_ms: 500,
            min_width: 120.0,
            min_height: 60.0,
            default_width: 600.0,
            default_height: 400.0,
            button_size: 20.0,
            resize_handle_size: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Click-to-select is ignored for this long after a drag that moved the camera.
    pub click_suppress_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            click_suppress_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    /// Fixed-advance text measurement instead of system fonts.
    pub fast_text: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: Theme::dark().background,
            fast_text: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub theme: Theme,
    pub vertex: VertexConfig,
    pub edge: EdgeConfig,
    pub layout: LayoutConfig,
    pub camera: CameraConfig,
    pub panel: PanelConfig,
    pub view: ViewConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    background: Option<String>,
    text_color: Option<String>,
    vertex_border: Option<String>,
    vertex_border_selected: Option<String>,
    vertex_background: Option<String>,
    vertex_shadow: Option<String>,
    vertex_shadow_selected: Option<String>,
    edge_direct: Option<String>,
    edge_true: Option<String>,
    edge_false: Option<String>,
    edge_direct_selected: Option<String>,
    edge_true_selected: Option<String>,
    edge_false_selected: Option<String>,
    error_text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct VertexConfigFile {
    padding_box_horizontal: Option<f32>,
    padding_box_vertical: Option<f32>,
    padding_line: Option<f32>,
    size_border: Option<f32>,
    shadow_blur: Option<f32>,
    offset_shadow: Option<f32>,
    centering: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EdgeConfigFile {
    padding_between_edges: Option<f32>,
    padding_line: Option<f32>,
    size_line: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    order_passes: Option<usize>,
    margin: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CameraConfigFile {
    initial_zoom: Option<f32>,
    min_zoom: Option<f32>,
    max_zoom: Option<f32>,
    scroll_sensitivity: Option<f32>,
    trackpad_sensitivity: Option<f32>,
    trackpad_delta_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PanelConfigFile {
    grid_size: Option<f32>,
    header_height: Option<f32>,
    drag_z_index: Option<u32>,
    close_fade_ms: Option<u64>,
    close_collapse_ms: Option<u64>,
    min_width: Option<f32>,
    min_height: Option<f32>,
    default_width: Option<f32>,
    default_height: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ViewConfigFile {
    click_suppress_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    vertex: Option<VertexConfigFile>,
    edge: Option<EdgeConfigFile>,
    layout: Option<LayoutConfigFile>,
    camera: Option<CameraConfigFile>,
    panel: Option<PanelConfigFile>,
    view: Option<ViewConfigFile>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in config {}", path.display()))
}

/// Applies camelCase overrides from a JSON document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();

    if let Some(name) = parsed.theme.as_deref() {
        match Theme::by_name(name) {
            Some(theme) => config.theme = theme,
            None => bail!("unknown theme {name:?}"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        set(&mut theme.font_family, vars.font_family);
        set(&mut theme.font_size, vars.font_size);
        set(&mut theme.background, vars.background);
        set(&mut theme.text_color, vars.text_color);
        set(&mut theme.vertex_border, vars.vertex_border);
        set(&mut theme.vertex_border_selected, vars.vertex_border_selected);
        set(&mut theme.vertex_background, vars.vertex_background);
        set(&mut theme.vertex_shadow, vars.vertex_shadow);
        set(&mut theme.vertex_shadow_selected, vars.vertex_shadow_selected);
        set(&mut theme.edge_direct, vars.edge_direct);
        set(&mut theme.edge_true, vars.edge_true);
        set(&mut theme.edge_false, vars.edge_false);
        set(&mut theme.edge_direct_selected, vars.edge_direct_selected);
        set(&mut theme.edge_true_selected, vars.edge_true_selected);
        set(&mut theme.edge_false_selected, vars.edge_false_selected);
        set(&mut theme.error_text, vars.error_text);
    }
    config.render.background = config.theme.background.clone();

    if let Some(file) = parsed.vertex {
        let vertex = &mut config.vertex;
        set(&mut vertex.padding_box_horizontal, file.padding_box_horizontal);
        set(&mut vertex.padding_box_vertical, file.padding_box_vertical);
        set(&mut vertex.padding_line, file.padding_line);
        set(&mut vertex.size_border, file.size_border);
        set(&mut vertex.shadow_blur, file.shadow_blur);
        set(&mut vertex.offset_shadow, file.offset_shadow);
        set(&mut vertex.centering, file.centering);
    }

    if let Some(file) = parsed.edge {
        set(&mut config.edge.padding_between_edges, file.padding_between_edges);
        set(&mut config.edge.padding_line, file.padding_line);
        set(&mut config.edge.size_line, file.size_line);
    }

    if let Some(file) = parsed.layout {
        set(&mut config.layout.node_spacing, file.node_spacing);
        set(&mut config.layout.rank_spacing, file.rank_spacing);
        set(&mut config.layout.order_passes, file.order_passes);
        set(&mut config.layout.margin, file.margin);
    }

    if let Some(file) = parsed.camera {
        let camera = &mut config.camera;
        set(&mut camera.initial_zoom, file.initial_zoom);
        set(&mut camera.min_zoom, file.min_zoom);
        set(&mut camera.max_zoom, file.max_zoom);
        set(&mut camera.scroll_sensitivity, file.scroll_sensitivity);
        set(&mut camera.trackpad_sensitivity, file.trackpad_sensitivity);
        set(&mut camera.trackpad_delta_threshold, file.trackpad_delta_threshold);
    }

    if let Some(file) = parsed.panel {
        let panel = &mut config.panel;
        set(&mut panel.grid_size, file.grid_size);
        set(&mut panel.header_height, file.header_height);
        set(&mut panel.drag_z_index, file.drag_z_index);
        set(&mut panel.close_fade_ms, file.close_fade_ms);
        set(&mut panel.close_collapse_ms, file.close_collapse_ms);
        set(&mut panel.min_width, file.min_width);
        set(&mut panel.min_height, file.min_height);
        set(&mut panel.default_width, file.default_width);
        set(&mut panel.default_height, file.default_height);
    }

    if let Some(file) = parsed.view {
        set(&mut config.view.click_suppress_ms, file.click_suppress_ms);
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> anyhow::Result<()> {
    let theme = &config.theme;
    let colors = [
        ("background", &theme.background),
        ("textColor", &theme.text_color),
        ("vertexBorder", &theme.vertex_border),
        ("vertexBorderSelected", &theme.vertex_border_selected),
        ("vertexBackground", &theme.vertex_background),
        ("vertexShadow", &theme.vertex_shadow),
        ("vertexShadowSelected", &theme.vertex_shadow_selected),
        ("edgeDirect", &theme.edge_direct),
        ("edgeTrue", &theme.edge_true),
        ("edgeFalse", &theme.edge_false),
        ("edgeDirectSelected", &theme.edge_direct_selected),
        ("edgeTrueSelected", &theme.edge_true_selected),
        ("edgeFalseSelected", &theme.edge_false_selected),
        ("errorText", &theme.error_text),
    ];
    for (name, value) in colors {
        if !is_hex_color(value) {
            bail!("themeVariables.{name}: {value:?} is not a hex colour");
        }
    }
    if theme.font_size <= 0.0 || !theme.font_size.is_finite() {
        bail!("themeVariables.fontSize must be positive");
    }

    let camera = &config.camera;
    if !(camera.min_zoom > 0.0 && camera.min_zoom <= camera.max_zoom && camera.max_zoom.is_finite())
    {
        bail!(
            "camera zoom bounds must satisfy 0 < minZoom <= maxZoom (got {} and {})",
            camera.min_zoom,
            camera.max_zoom
        );
    }
    if config.panel.grid_size <= 0.0 {
        bail!("panel.gridSize must be positive");
    }
    if config.edge.size_line <= 0.0 {
        bail!("edge.sizeLine must be positive");
    }
    Ok(())
}
