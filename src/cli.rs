use crate::bpmn::{to_bpmn_xml, validate_bpmn};
use crate::config::{Config, load_config};
use crate::html::render_html;
use crate::ir::FlowDocument;
use crate::layout::{Layout, compute_layout};
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::mermaid::generate_mermaid;
use crate::parser::parse_document;
use crate::render::{render_svg, write_output_png, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "flowlane",
    version,
    about = "Swimlane layout for business process documents (SVG, PNG, HTML, BPMN 2.0, mermaid)"
)]
pub struct Args {
    /// Input flow document (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for text formats if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout, render)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Raster width for PNG output
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Raster height for PNG output
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Check the BPMN serialization of the document and fail if it is invalid
    #[arg(long = "validate")]
    pub validate: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    /// Review page with the SVG inline
    Html,
    Bpmn,
    Json,
    Mermaid,
}

pub fn run(args: &Args) -> Result<()> {
    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }

    let input = read_input(args.input.as_deref())?;
    let doc = parse_document(&input).context("failed to parse flow document")?;
    let layout = compute_layout(&doc, &config.layout);
    info!(
        nodes = layout.nodes.len(),
        lanes = layout.lanes.len(),
        edges = layout.edges.len();
        "computed layout"
    );

    if args.validate {
        validate(&doc, &layout)?;
    }

    write_output(args, &config, &doc, &layout)
}

fn validate(doc: &FlowDocument, layout: &Layout) -> Result<()> {
    let xml = to_bpmn_xml(doc, layout)?;
    let report = validate_bpmn(&xml);
    if !report.is_valid() {
        for error in &report.errors {
            warn!("{error}");
        }
        anyhow::bail!("BPMN validation failed with {} error(s)", report.errors.len());
    }
    info!("BPMN output is valid");
    Ok(())
}

fn write_output(args: &Args, config: &Config, doc: &FlowDocument, layout: &Layout) -> Result<()> {
    let output = args.output.as_deref();
    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(layout, &config.theme, &config.layout);
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Png => {
            let output = ensure_output(output, "png")?;
            let svg = render_svg(layout, &config.theme, &config.layout);
            write_output_png(&svg, output, &config.render)?;
        }
        OutputFormat::Html => {
            let svg = render_svg(layout, &config.theme, &config.layout);
            write_text(&render_html(doc, &svg), output)?;
        }
        OutputFormat::Bpmn => {
            let xml = to_bpmn_xml(doc, layout)?;
            write_text(&xml, output)?;
        }
        OutputFormat::Json => match output {
            Some(path) => write_layout_dump(path, layout)?,
            None => {
                let json = serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?;
                write_text(&json, None)?;
            }
        },
        OutputFormat::Mermaid => {
            write_text(&generate_mermaid(doc), output)?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("Output path required for {} output", ext))
}

fn write_text(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
