use crate::config::{Config, load_config};
use crate::ir::{Graph, VertexHandle};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_graph;
use crate::provider::{DebugContentProvider, SimpleRng, random_graph};
use crate::render::{GraphRenderer, render_svg, write_output_png, write_output_svg};
use crate::surface::MonospaceMeasurer;
use crate::text_metrics::FontMeasurer;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cfgview", version, about = "Control-flow graph viewer: layered layout to SVG/PNG")]
pub struct Args {
    /// Graph document (.json5) or '-' for stdin
    #[arg(short = 'i', long = "input", conflicts_with = "demo")]
    pub input: Option<PathBuf>,

    /// Render a generated debug graph from this seed instead of a document
    #[arg(long = "demo")]
    pub demo: Option<u64>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (camelCase overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Fixed zoom; fits the graph to the viewport when omitted
    #[arg(long = "zoom")]
    pub zoom: Option<f32>,

    /// Select the vertex at this position before rendering
    #[arg(long = "select")]
    pub select: Option<usize>,

    /// Measure text with fixed advances instead of system fonts
    #[arg(long = "fastText")]
    pub fast_text: bool,

    /// Write the computed layout as JSON to this path
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

/// Installs the stderr subscriber; `CFGVIEW_LOG` takes `EnvFilter` directives.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env("CFGVIEW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .try_init();
}

pub fn run() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    config.render.width = args.width;
    config.render.height = args.height;
    config.render.fast_text |= args.fast_text;

    let mut graph = load_graph(&args)?;
    if let Some(position) = args.select {
        if position >= graph.vertex_count() {
            anyhow::bail!(
                "--select {position} is out of range, graph has {} vertices",
                graph.vertex_count()
            );
        }
        graph.select(VertexHandle::new(position));
    }

    if let Some(path) = args.dump_layout.as_deref() {
        dump_layout(path, &mut graph, &config)?;
    }

    let svg = render_svg(&mut graph, &config, args.zoom);
    match args.output_format {
        OutputFormat::Svg => {
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &config.render, &config.theme.font_family)?;
        }
    }
    Ok(())
}

fn load_graph(args: &Args) -> Result<Graph> {
    if let Some(seed) = args.demo {
        let mut rng = SimpleRng::new(seed);
        let graph = random_graph(Box::new(DebugContentProvider::new(seed)), &mut rng);
        tracing::debug!(seed, vertices = graph.vertex_count(), "generated demo graph");
        return Ok(graph);
    }
    let input = read_input(args.input.as_deref())?;
    let graph = parse_graph(&input, Box::new(DebugContentProvider::new(0)))
        .context("parsing graph document")?;
    Ok(graph)
}

fn dump_layout(path: &Path, graph: &mut Graph, config: &Config) -> Result<()> {
    let mut renderer = GraphRenderer::new(config);
    if config.render.fast_text {
        renderer.preprocess(&MonospaceMeasurer::default(), graph);
    } else {
        renderer.preprocess(&FontMeasurer::new(), graph);
    }
    write_layout_dump(path, &renderer, graph)
        .with_context(|| format!("writing layout dump {}", path.display()))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "cfgview", "--demo", "7", "-e", "png", "-o", "out.png", "--zoom", "1.5", "--select",
            "2", "--fastText",
        ])
        .unwrap();
        assert_eq!(args.demo, Some(7));
        assert!(matches!(args.output_format, OutputFormat::Png));
        assert_eq!(args.zoom, Some(1.5));
        assert_eq!(args.select, Some(2));
        assert!(args.fast_text);
    }

    #[test]
    fn input_and_demo_conflict() {
        assert!(Args::try_parse_from(["cfgview", "-i", "g.json5", "--demo", "1"]).is_err());
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        assert_eq!(
            ensure_output(&Some(PathBuf::from("a.png")), "png").unwrap(),
            PathBuf::from("a.png")
        );
    }
}
