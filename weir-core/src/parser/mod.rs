use crate::error::ManifestError;
use crate::types::Manifest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedManifest {
    pub manifest: Manifest,
    pub format: ManifestFormat,
}

pub fn parse_manifest_str(
    input: &str,
    format: ManifestFormat,
) -> Result<ParsedManifest, ManifestError> {
    match format {
        ManifestFormat::Json => Ok(ParsedManifest {
            manifest: serde_json::from_str::<Manifest>(input)?,
            format,
        }),
        ManifestFormat::Yaml => Ok(ParsedManifest {
            manifest: serde_yaml::from_str::<Manifest>(input)?,
            format,
        }),
        ManifestFormat::Auto => parse_manifest_auto(input),
    }
}

fn parse_manifest_auto(input: &str) -> Result<ParsedManifest, ManifestError> {
    // Heuristic: JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Manifest>(input) {
            Ok(manifest) => {
                return Ok(ParsedManifest {
                    manifest,
                    format: ManifestFormat::Json,
                })
            }
            Err(e) => {
                if let Ok(manifest) = serde_yaml::from_str::<Manifest>(input) {
                    return Ok(ParsedManifest {
                        manifest,
                        format: ManifestFormat::Yaml,
                    });
                }
                return Err(ManifestError::Json(e));
            }
        }
    }

    match serde_yaml::from_str::<Manifest>(input) {
        Ok(manifest) => Ok(ParsedManifest {
            manifest,
            format: ManifestFormat::Yaml,
        }),
        Err(e) => {
            if let Ok(manifest) = serde_json::from_str::<Manifest>(input) {
                return Ok(ParsedManifest {
                    manifest,
                    format: ManifestFormat::Json,
                });
            }
            Err(ManifestError::Yaml(e))
        }
    }
}
