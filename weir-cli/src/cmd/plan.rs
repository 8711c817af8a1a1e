use std::path::Path;

use weir_core::ManifestFormat;

use crate::exit_codes;

pub async fn plan_cmd(path: &Path) -> i32 {
    let input = match std::fs::read_to_string(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: unable to read {}: {e}", path.display());
            return exit_codes::IO_ERROR;
        }
    };

    let (manifest, analyses) = match weir_core::load_manifest_str(&input, ManifestFormat::Auto) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("invalid manifest: {e}");
            return exit_codes::VALIDATION_ERROR;
        }
    };

    for (flow, analysis) in manifest.flows.iter().zip(&analyses) {
        println!("flow {}", flow.name);
        for (depth, level) in analysis.levels.iter().enumerate() {
            println!("  level {depth}: {}", level.join(", "));
        }
    }

    exit_codes::SUCCESS
}
