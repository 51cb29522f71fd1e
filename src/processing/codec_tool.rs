use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::config::{AppConfig, ToolSetting};
use crate::errors::{AppError, Result};

/// An external program plus fixed leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub base_args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            base_args: Vec::new(),
        }
    }

    pub fn from_setting(setting: &ToolSetting) -> Self {
        Self {
            program: setting.program.clone(),
            base_args: setting.args.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// True when `<program> --version` runs and exits cleanly.
    pub async fn is_available(&self) -> bool {
        match self
            .command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                log::debug!("🔧 [CODEC] {} not usable: {}", self.program, e);
                false
            }
        }
    }

    /// Runs the tool in `work_dir`; a non-zero exit becomes `CodecTool`.
    pub async fn run(&self, args: &[String], work_dir: &Path) -> Result<()> {
        log::debug!("🔧 [CODEC] {} {:?}", self.program, args);

        let output = self
            .command()
            .args(args)
            .current_dir(work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AppError::CodecTool(format!("Failed to start {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("❌ [CODEC] {} failed: {}", self.program, stderr.trim());
            return Err(AppError::CodecTool(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Which FLAC toolchain this process uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecTool {
    /// `metaflac`, edits tags in place.
    Primary(ToolCommand),
    /// `flac`, decodes and re-encodes with tags.
    Fallback(ToolCommand),
    Unavailable,
}

impl CodecTool {
    /// Probes the tools in priority order.
    pub async fn probe(primary: ToolCommand, fallback: ToolCommand) -> Self {
        if primary.is_available().await {
            log::info!("🔧 [CODEC] Using {} for FLAC tags", primary.program);
            CodecTool::Primary(primary)
        } else if fallback.is_available().await {
            log::warn!(
                "⚠️ [CODEC] {} unavailable, FLAC files will be re-encoded with {}",
                primary.program,
                fallback.program
            );
            CodecTool::Fallback(fallback)
        } else {
            log::warn!("⚠️ [CODEC] No FLAC tool found; FLAC tracks will fail");
            CodecTool::Unavailable
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CodecTool::Primary(cmd) => format!("{} (in-place tag edit)", cmd.program),
            CodecTool::Fallback(cmd) => format!("{} (decode and re-encode)", cmd.program),
            CodecTool::Unavailable => "none".to_string(),
        }
    }
}

static CODEC_TOOL: OnceCell<Arc<CodecTool>> = OnceCell::const_new();

/// The process-wide toolchain, probed on first use and then reused.
pub async fn codec_tool(config: &AppConfig) -> Arc<CodecTool> {
    CODEC_TOOL
        .get_or_init(|| async {
            Arc::new(
                CodecTool::probe(
                    ToolCommand::from_setting(&config.metaflac),
                    ToolCommand::from_setting(&config.flac),
                )
                .await,
            )
        })
        .await
        .clone()
}
