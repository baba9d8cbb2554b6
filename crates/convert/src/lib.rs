//! Subprocess wrapper around the GDAL vector toolchain.
//!
//! Uploaded files arrive in arbitrary vector formats and projections;
//! everything downstream operates on canonical GeoJSON in EPSG:4326.
//! The conversion itself is delegated to `ogr2ogr`, and layer
//! introspection of packaged-vector files to `ogrinfo`. Both run as
//! child processes under a timeout; a conversion failure is a hard
//! error for the operator to fix, never retried here.

use std::path::Path;
use std::time::Duration;

/// The canonical coordinate reference system for all converted output.
pub const CANONICAL_CRS: &str = "EPSG:4326";

/// Default wall-clock limit for one converter invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Error type for vector conversion operations.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("conversion binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("conversion failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("conversion timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to parse converter output: {0}")]
    ParseError(String),

    #[error("source file not found: {0}")]
    SourceMissing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One layer inside a packaged-vector file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    pub name: String,
    /// Geometry type as reported by the tool (e.g. "Line String"), or
    /// "Unknown" when the index line carries none.
    pub geometry_type: String,
}

/// Handle to the external conversion toolchain.
///
/// Kept behind a struct so tests and alternative deployments can point
/// at different binaries or swap the timeout.
#[derive(Debug, Clone)]
pub struct VectorConverter {
    ogr2ogr_bin: String,
    ogrinfo_bin: String,
    timeout: Duration,
}

impl Default for VectorConverter {
    fn default() -> Self {
        Self::new("ogr2ogr", "ogrinfo", Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl VectorConverter {
    pub fn new(
        ogr2ogr_bin: impl Into<String>,
        ogrinfo_bin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ogr2ogr_bin: ogr2ogr_bin.into(),
            ogrinfo_bin: ogrinfo_bin.into(),
            timeout,
        }
    }

    /// List the layers of a packaged-vector file.
    pub async fn list_layers(&self, source: &Path) -> Result<Vec<LayerInfo>, ConvertError> {
        if !source.exists() {
            return Err(ConvertError::SourceMissing(
                source.to_string_lossy().to_string(),
            ));
        }

        let mut command = tokio::process::Command::new(&self.ogrinfo_bin);
        command.arg("-so").arg("-q").arg(source).kill_on_drop(true);
        let stdout = self.run(command).await?;
        parse_layer_index(&stdout)
    }

    /// Convert `source` to canonical GeoJSON at `dest`.
    ///
    /// `layer` selects one named layer of a packaged-vector file;
    /// `source_crs` overrides the declared source projection (needed
    /// when a GeoJSON upload carries coordinates in a non-canonical
    /// CRS). The output is always reprojected to [`CANONICAL_CRS`].
    pub async fn convert_to_geojson(
        &self,
        source: &Path,
        dest: &Path,
        layer: Option<&str>,
        source_crs: Option<&str>,
    ) -> Result<(), ConvertError> {
        if !source.exists() {
            return Err(ConvertError::SourceMissing(
                source.to_string_lossy().to_string(),
            ));
        }

        let mut command = tokio::process::Command::new(&self.ogr2ogr_bin);
        command.args(["-f", "GeoJSON", "-t_srs", CANONICAL_CRS]);
        if let Some(crs) = source_crs {
            command.args(["-s_srs", crs]);
        }
        command.arg(dest).arg(source);
        if let Some(layer) = layer {
            command.arg(layer);
        }
        command.kill_on_drop(true);

        tracing::info!(
            source = %source.display(),
            dest = %dest.display(),
            layer,
            source_crs,
            "Converting to canonical GeoJSON"
        );
        self.run(command).await?;
        Ok(())
    }

    /// Run a prepared command under the timeout, returning its stdout.
    async fn run(&self, mut command: tokio::process::Command) -> Result<String, ConvertError> {
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ConvertError::Timeout(self.timeout))?
            .map_err(ConvertError::NotFound)?;

        if !output.status.success() {
            return Err(ConvertError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Parse the line-oriented `ogrinfo` layer index.
///
/// Expected lines look like `1: roads (Line String)`; the geometry type
/// suffix is optional. Lines that are not index entries are skipped.
pub fn parse_layer_index(stdout: &str) -> Result<Vec<LayerInfo>, ConvertError> {
    let mut layers = Vec::new();
    for line in stdout.lines() {
        let line = line.trim();
        let Some((ordinal, rest)) = line.split_once(':') else {
            continue;
        };
        if ordinal.trim().parse::<u32>().is_err() {
            continue;
        }
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(ConvertError::ParseError(format!(
                "Layer index line has no layer name: '{line}'"
            )));
        }
        let (name, geometry_type) = match (rest.rfind('('), rest.ends_with(')')) {
            (Some(open), true) => {
                let name = rest[..open].trim();
                let geometry_type = rest[open + 1..rest.len() - 1].trim();
                (name, geometry_type)
            }
            _ => (rest, "Unknown"),
        };
        layers.push(LayerInfo {
            name: name.to_string(),
            geometry_type: if geometry_type.is_empty() {
                "Unknown".to_string()
            } else {
                geometry_type.to_string()
            },
        });
    }
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_typical_layer_index() {
        let stdout = "INFO: Open of `roads.gpkg'\n\
                      1: city_roads (Line String)\n\
                      2: bridges (Multi Line String)\n";
        let layers = parse_layer_index(stdout).unwrap();
        assert_eq!(
            layers,
            vec![
                LayerInfo {
                    name: "city_roads".into(),
                    geometry_type: "Line String".into()
                },
                LayerInfo {
                    name: "bridges".into(),
                    geometry_type: "Multi Line String".into()
                },
            ]
        );
    }

    #[test]
    fn layer_without_geometry_type_is_unknown() {
        let layers = parse_layer_index("1: attributes_only\n").unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].name, "attributes_only");
        assert_eq!(layers[0].geometry_type, "Unknown");
    }

    #[test]
    fn layer_name_containing_parentheses() {
        let layers = parse_layer_index("1: roads (2024 survey) (Line String)\n").unwrap();
        assert_eq!(layers[0].name, "roads (2024 survey)");
        assert_eq!(layers[0].geometry_type, "Line String");
    }

    #[test]
    fn non_index_lines_are_skipped() {
        let stdout = "INFO: Open of `roads.gpkg'\n\
                      using driver `GPKG' successful.\n\
                      1: roads (Line String)\n";
        let layers = parse_layer_index(stdout).unwrap();
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn nameless_index_line_is_a_parse_error() {
        assert_matches!(
            parse_layer_index("1:   \n"),
            Err(ConvertError::ParseError(_))
        );
    }

    #[tokio::test]
    async fn missing_source_is_reported_before_spawning() {
        let converter = VectorConverter::default();
        let err = converter
            .list_layers(Path::new("/nonexistent/upload.gpkg"))
            .await
            .unwrap_err();
        assert_matches!(err, ConvertError::SourceMissing(_));
    }
}
