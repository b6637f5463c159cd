use crate::{DotGraph, RenderError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_DOT_BINARY: &str = "dot";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Svg,
    Pdf,
    Jpg,
    Gif,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Jpg => "jpg",
            Self::Gif => "gif",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "gif" => Ok(Self::Gif),
            other => Err(RenderError::Config(format!(
                "unsupported output format '{other}'"
            ))),
        }
    }
}

/// Turns a DOT file on disk into an image.
pub trait Converter: Send + Sync {
    fn convert(
        &self,
        format: OutputFormat,
        input: &Path,
        output: &Path,
    ) -> Result<(), RenderError>;
}

/// Runs the Graphviz `dot` executable as `dot -T<format> <input> -o <output>`.
///
/// The call blocks until the process exits. There is no timeout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphvizConverter {
    program: String,
}

impl GraphvizConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for GraphvizConverter {
    fn default() -> Self {
        Self::new(DEFAULT_DOT_BINARY)
    }
}

impl Converter for GraphvizConverter {
    fn convert(
        &self,
        format: OutputFormat,
        input: &Path,
        output: &Path,
    ) -> Result<(), RenderError> {
        let result = Command::new(&self.program)
            .arg(format!("-T{format}"))
            .arg(input)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|error| RenderError::Conversion {
                program: self.program.clone(),
                message: format!("failed to start process: {error}"),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(RenderError::Conversion {
                program: self.program.clone(),
                message: format!("{} ({})", result.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_dir: PathBuf,
    pub prefix: String,
    pub output_file: Option<PathBuf>,
    pub format: OutputFormat,
    pub dot_binary: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            prefix: "graph".to_string(),
            output_file: None,
            format: OutputFormat::default(),
            dot_binary: DEFAULT_DOT_BINARY.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|error| {
            RenderError::Config(format!(
                "failed reading render config '{}': {}",
                path.display(),
                error
            ))
        })?;
        serde_json::from_slice(&bytes).map_err(|error| {
            RenderError::Config(format!(
                "failed deserializing render config '{}': {}",
                path.display(),
                error
            ))
        })
    }

    /// Explicit `output_file`, or a timestamped name under `output_dir`.
    pub fn output_path(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        self.output_path_at(&timestamp)
    }

    fn output_path_at(&self, timestamp: &str) -> PathBuf {
        if let Some(output_file) = &self.output_file {
            return output_file.clone();
        }

        let prefix = self.prefix.replace(['/', '.'], "_");
        self.output_dir.join(format!(
            "{prefix}_{timestamp}.{}",
            self.format.extension()
        ))
    }
}

/// Writes DOT text next to the target image and hands it to a [`Converter`].
#[derive(Clone)]
pub struct ImageRenderer {
    config: RenderConfig,
    converter: Arc<dyn Converter>,
}

impl ImageRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let converter = Arc::new(GraphvizConverter::new(config.dot_binary.clone()));
        Self { config, converter }
    }

    pub fn with_converter(config: RenderConfig, converter: Arc<dyn Converter>) -> Self {
        Self { config, converter }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn render_graph(&self, graph: &DotGraph) -> Result<PathBuf, RenderError> {
        self.render(&graph.render())
    }

    /// Writes `<output>.dot`, converts it and returns the image path. The
    /// intermediate file is left in place.
    pub fn render(&self, content: &str) -> Result<PathBuf, RenderError> {
        let output = self.config.output_path();
        let dot_file = dot_file_path(&output);

        if let Some(parent) = dot_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::WriteDot {
                path: dot_file.clone(),
                source,
            })?;
        }
        fs::write(&dot_file, content).map_err(|source| RenderError::WriteDot {
            path: dot_file.clone(),
            source,
        })?;
        debug!(path = %dot_file.display(), bytes = content.len(), "wrote dot file");

        if let Err(error) = self.converter.convert(self.config.format, &dot_file, &output) {
            warn!(path = %output.display(), %error, "image conversion failed");
            return Err(error);
        }

        info!(path = %output.display(), format = %self.config.format, "written image");
        Ok(output)
    }
}

fn dot_file_path(output: &Path) -> PathBuf {
    let mut path = OsString::from(output.as_os_str());
    path.push(".dot");
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_prefix_with_separators_expected_underscored() {
        let config = RenderConfig {
            output_dir: PathBuf::from("/tmp/out"),
            prefix: "github.com/windler/pkg".to_string(),
            ..RenderConfig::default()
        };

        assert_eq!(
            config.output_path_at("20240102030405"),
            PathBuf::from("/tmp/out/github_com_windler_pkg_20240102030405.png")
        );
    }

    #[test]
    fn output_path_explicit_file_expected_used_verbatim() {
        let config = RenderConfig {
            output_file: Some(PathBuf::from("graph.svg")),
            format: OutputFormat::Svg,
            ..RenderConfig::default()
        };

        assert_eq!(config.output_path(), PathBuf::from("graph.svg"));
    }

    #[test]
    fn output_path_format_expected_extension() {
        let config = RenderConfig {
            format: OutputFormat::Pdf,
            prefix: "p".to_string(),
            ..RenderConfig::default()
        };

        let path = config.output_path_at("1");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("p_1.pdf"));
    }

    #[test]
    fn dot_file_path_expected_suffix_appended() {
        assert_eq!(
            dot_file_path(Path::new("out/g.png")),
            PathBuf::from("out/g.png.dot")
        );
    }

    #[test]
    fn output_format_from_str_expected_case_insensitive() {
        assert_eq!("SVG".parse::<OutputFormat>().ok(), Some(OutputFormat::Svg));
        assert_eq!("jpeg".parse::<OutputFormat>().ok(), Some(OutputFormat::Jpg));
        assert!("bmp".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn graphviz_converter_missing_binary_expected_conversion_error() {
        let temp = tempfile::TempDir::new().expect("tempdir should create");
        let converter =
            GraphvizConverter::new(temp.path().join("no-such-dot").display().to_string());

        let error = converter
            .convert(
                OutputFormat::Png,
                &temp.path().join("in.dot"),
                &temp.path().join("out.png"),
            )
            .expect_err("missing binary must fail");
        assert!(matches!(error, RenderError::Conversion { .. }));
    }
}
