//! Headless PDF engine.
//!
//! Every call launches its own Chrome process with a throwaway profile in a
//! temporary directory, prints the page and tears everything down. Nothing is
//! pooled between requests.

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RenderConfig;

/// Maximum stderr captured into an error message.
const MAX_STDERR_CHARS: usize = 2_000;

/// How the browser is launched. `Server` adds the flags needed inside
/// containers and serverless runtimes (no sandbox, no /dev/shm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    Interactive,
    Server,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Interactive => f.write_str("interactive"),
            LaunchMode::Server => f.write_str("server"),
        }
    }
}

impl FromStr for LaunchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interactive" | "local" => Ok(LaunchMode::Interactive),
            "server" | "headless" => Ok(LaunchMode::Server),
            other => Err(format!(
                "RENDER_MODE must be 'interactive' or 'server', got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("report template failed: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to launch browser '{binary}' ({mode} launch): {source}")]
    Launch {
        mode: LaunchMode,
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("browser exited with status {status} ({mode} launch): {stderr}")]
    Browser {
        mode: LaunchMode,
        status: i32,
        stderr: String,
    },

    #[error("PDF generation timed out after {elapsed_ms}ms ({mode} launch)")]
    Timeout { mode: LaunchMode, elapsed_ms: u64 },

    #[error("browser produced no PDF output ({mode} launch)")]
    EmptyOutput { mode: LaunchMode },

    #[error("I/O error while preparing the report ({mode} launch): {source}")]
    Io {
        mode: LaunchMode,
        #[source]
        source: std::io::Error,
    },
}

/// Turns an HTML document into PDF bytes. Implementations never return a
/// partial buffer: any failure is an error.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    fn launch_mode(&self) -> LaunchMode;

    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError>;
}

pub struct HeadlessChrome {
    binary: String,
    mode: LaunchMode,
    load_timeout: Duration,
    total_timeout: Duration,
}

impl HeadlessChrome {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            binary: config.chrome_path.clone(),
            mode: config.mode,
            load_timeout: config.load_timeout,
            total_timeout: config.total_timeout,
        }
    }

    /// Command-line flags for one print job. Page size and margins come from
    /// the template's `@page` rule; header and footer are suppressed.
    fn launch_args(&self, profile_dir: &Path, pdf_path: &Path) -> Vec<String> {
        let mut args = vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-extensions".to_string(),
            "--hide-scrollbars".to_string(),
            "--no-pdf-header-footer".to_string(),
            "--run-all-compositor-stages-before-draw".to_string(),
            format!("--timeout={}", self.load_timeout.as_millis()),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--print-to-pdf={}", pdf_path.display()),
        ];
        if self.mode == LaunchMode::Server {
            args.extend(
                ["--no-sandbox", "--disable-dev-shm-usage", "--no-zygote", "--single-process"]
                    .map(String::from),
            );
        }
        args
    }
}

#[async_trait]
impl PdfEngine for HeadlessChrome {
    fn launch_mode(&self) -> LaunchMode {
        self.mode
    }

    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>, RenderError> {
        let mode = self.mode;
        let io_err = |source| RenderError::Io { mode, source };

        // Removed on drop, including on every error path below.
        let workdir = tempfile::tempdir().map_err(io_err)?;
        let html_path = workdir.path().join("report.html");
        let pdf_path = workdir.path().join("report.pdf");
        let profile_dir = workdir.path().join("profile");
        tokio::fs::write(&html_path, html).await.map_err(io_err)?;

        let mut cmd = Command::new(&self.binary);
        cmd.args(self.launch_args(&profile_dir, &pdf_path))
            .arg(format!("file://{}", html_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| RenderError::Launch {
            mode,
            binary: self.binary.clone(),
            source,
        })?;
        debug!(%mode, "Browser launched for PDF render");

        // On timeout the child is dropped here and killed by `kill_on_drop`.
        let output = match tokio::time::timeout(self.total_timeout, child.wait_with_output()).await
        {
            Ok(result) => result.map_err(io_err)?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    mode,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                })
            }
        };

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(RenderError::Browser {
                mode,
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let bytes = match tokio::fs::read(&pdf_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RenderError::EmptyOutput { mode })
            }
            Err(e) => return Err(io_err(e)),
        };
        if !bytes.starts_with(b"%PDF") {
            return Err(RenderError::EmptyOutput { mode });
        }

        info!(
            %mode,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "PDF rendered"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome(mode: LaunchMode, binary: &str) -> HeadlessChrome {
        HeadlessChrome::new(&RenderConfig {
            chrome_path: binary.to_string(),
            mode,
            load_timeout: Duration::from_millis(1_500),
            total_timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_launch_mode_parsing() {
        assert_eq!("Server".parse::<LaunchMode>().unwrap(), LaunchMode::Server);
        assert_eq!(
            "interactive".parse::<LaunchMode>().unwrap(),
            LaunchMode::Interactive
        );
        assert!("lambda".parse::<LaunchMode>().is_err());
    }

    #[test]
    fn test_server_mode_adds_sandbox_flags() {
        let dir = Path::new("/tmp/r");
        let pdf = Path::new("/tmp/r/report.pdf");

        let interactive = chrome(LaunchMode::Interactive, "chromium").launch_args(dir, pdf);
        assert!(!interactive.iter().any(|a| a == "--no-sandbox"));
        assert!(interactive.contains(&"--timeout=1500".to_string()));
        assert!(interactive.contains(&"--print-to-pdf=/tmp/r/report.pdf".to_string()));

        let server = chrome(LaunchMode::Server, "chromium").launch_args(dir, pdf);
        assert!(server.iter().any(|a| a == "--no-sandbox"));
        assert!(server.iter().any(|a| a == "--disable-dev-shm-usage"));
    }

    #[tokio::test]
    async fn test_missing_binary_reports_launch_mode() {
        let engine = chrome(LaunchMode::Server, "/nonexistent/chrome-binary");
        let err = engine.html_to_pdf("<html></html>").await.unwrap_err();
        assert!(matches!(
            err,
            RenderError::Launch {
                mode: LaunchMode::Server,
                ..
            }
        ));
        assert!(err.to_string().contains("server launch"));
    }
}
