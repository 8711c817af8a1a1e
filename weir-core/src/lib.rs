#![forbid(unsafe_code)]

pub mod checks;
pub mod error;
pub mod parser;
pub mod planner;
pub mod template;
pub mod types;

pub use crate::error::ManifestError;
pub use crate::parser::{parse_manifest_str, ManifestFormat, ParsedManifest};
pub use crate::planner::{analyze, Analysis};
pub use crate::template::{Reference, Section, TemplateError};
pub use crate::types::Manifest;

/// Parse, check and analyze a manifest in one pass. The returned analyses
/// are keyed in flow declaration order.
pub fn load_manifest_str(
    input: &str,
    format: ManifestFormat,
) -> Result<(Manifest, Vec<Analysis>), ManifestError> {
    let parsed = parse_manifest_str(input, format)?;
    checks::check_manifest(&parsed.manifest)?;

    let mut analyses = Vec::with_capacity(parsed.manifest.flows.len());
    for flow in &parsed.manifest.flows {
        analyses.push(planner::analyze(flow)?);
    }

    Ok((parsed.manifest, analyses))
}
