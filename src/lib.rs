pub mod bpmn;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod html;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod mermaid;
pub mod parser;
pub mod render;
pub mod theme;

pub use bpmn::{BpmnError, ValidationReport, to_bpmn_xml, validate_bpmn};
#[cfg(feature = "cli")]
pub use cli::{Args, OutputFormat, run};
pub use config::{Config, LayoutConfig, load_config};
pub use html::render_html;
pub use ir::FlowDocument;
pub use layout::{Layout, compute_layout};
pub use mermaid::generate_mermaid;
pub use parser::{DocumentError, parse_document};
pub use render::render_svg;
