// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Boundary to the external rendering tools.
//!
//! The gateway does not interpret slide decks itself. A `SlideRenderer`
//! turns an uploaded deck into a PDF and the PDF into ordered JPEGs; the
//! production implementation shells out to LibreOffice and ImageMagick.

use crate::config::ConversionConfig;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

/// Upload extensions accepted for conversion.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pptx", "ppt"];

const MAX_FILENAME_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {code:?}: {stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} produced no output: {detail}")]
    MissingOutput { tool: String, detail: String },
}

/// External conversion collaborator.
#[async_trait]
pub trait SlideRenderer: Send + Sync {
    /// Render a slide deck to a PDF inside `out_dir`.
    async fn render_to_document(&self, input: &Path, out_dir: &Path)
        -> Result<PathBuf, ConvertError>;

    /// Rasterize a PDF into one JPEG per page, in page order.
    async fn render_to_images(
        &self,
        document: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ConvertError>;
}

/// Renderer that runs `soffice` and ImageMagick `convert`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    config: ConversionConfig,
}

impl CommandRenderer {
    pub fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    async fn run(&self, tool: &str, mut cmd: Command) -> Result<String, ConvertError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = self.config.timeout();
        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| ConvertError::Spawn {
                tool: tool.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(ConvertError::Timeout {
                    tool: tool.to_string(),
                    secs: timeout.as_secs(),
                })
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            tool,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %stderr,
            "External tool finished"
        );

        if !output.status.success() {
            return Err(ConvertError::Failed {
                tool: tool.to_string(),
                code: output.status.code(),
                stderr,
            });
        }
        Ok(stderr)
    }
}

#[async_trait]
impl SlideRenderer for CommandRenderer {
    async fn render_to_document(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<PathBuf, ConvertError> {
        let tool = self.config.soffice_bin.as_str();
        let mut cmd = Command::new(tool);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);

        let stderr = self.run(tool, cmd).await?;

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let pdf = out_dir.join(format!("{}.pdf", stem));
        if !tokio::fs::try_exists(&pdf).await.unwrap_or(false) {
            return Err(ConvertError::MissingOutput {
                tool: tool.to_string(),
                detail: stderr,
            });
        }
        Ok(pdf)
    }

    async fn render_to_images(
        &self,
        document: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ConvertError> {
        let tool = self.config.convert_bin.as_str();
        let mut cmd = Command::new(tool);
        cmd.arg("-density")
            .arg("72")
            .arg("-quality")
            .arg("70")
            .arg(document)
            .arg(out_dir.join("slide-%03d.jpg"));

        let stderr = self.run(tool, cmd).await?;

        let images = collect_slides(out_dir).await.map_err(|err| ConvertError::MissingOutput {
            tool: tool.to_string(),
            detail: err.to_string(),
        })?;
        if images.is_empty() {
            return Err(ConvertError::MissingOutput {
                tool: tool.to_string(),
                detail: stderr,
            });
        }
        Ok(images)
    }
}

/// `slide-NNN.jpg` files in `dir`, sorted by name.
async fn collect_slides(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut slides = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("slide-") && name.ends_with(".jpg") {
            slides.push(entry.path());
        }
    }
    slides.sort();
    Ok(slides)
}

/// Reduce an uploaded filename to `[A-Za-z0-9_.-]`.
///
/// Empty, dot-only or overlong results are replaced by a random
/// `file_xxxxxxxx`.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.len() > MAX_FILENAME_LEN || sanitized.chars().all(|c| c == '.') {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);
        return format!("file_{}", id);
    }
    sanitized
}

/// Lowercased extension of `filename` if it is one we convert.
pub fn accepted_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}
