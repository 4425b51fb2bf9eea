pub mod camera;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod menu;
pub mod panel;
pub mod parser;
pub mod provider;
pub mod render;
pub mod surface;
pub mod text_metrics;
pub mod theme;
pub mod transport;
pub mod view;
pub mod workspace;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use ir::{Graph, VertexHandle};
pub use parser::parse_graph;
pub use render::{GraphRenderer, render_svg};
pub use workspace::Workspace;
