use std::path::Path;

use weir_core::ManifestFormat;

use crate::exit_codes;

pub async fn validate_cmd(path: &Path) -> i32 {
    let input = match std::fs::read_to_string(path) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("error: unable to read {}: {e}", path.display());
            return exit_codes::IO_ERROR;
        }
    };

    match weir_core::load_manifest_str(&input, ManifestFormat::Auto) {
        Ok((manifest, _)) => {
            println!(
                "ok: {} services, {} flows, {} endpoints",
                manifest.services.len(),
                manifest.flows.len(),
                manifest.endpoints.len()
            );
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("invalid manifest: {e}");
            exit_codes::VALIDATION_ERROR
        }
    }
}
