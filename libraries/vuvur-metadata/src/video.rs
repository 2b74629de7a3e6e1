/// Video probe - ffprobe wrapper for container dimensions
use crate::error::{MetadataError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Default bound on a single probe invocation
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct VideoProbe {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

impl VideoProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Width and height of the first video stream
    ///
    /// The probe process is killed if it outlives the timeout.
    pub async fn dimensions(&self, input: &Path) -> Result<(u32, u32)> {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("v:0")
            .arg("-show_entries")
            .arg("stream=width,height")
            .arg("-of")
            .arg("json")
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| MetadataError::ProbeTimeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetadataError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        parse_dimensions(&output.stdout)
    }
}

impl Default for VideoProbe {
    fn default() -> Self {
        Self::new("ffprobe", DEFAULT_PROBE_TIMEOUT)
    }
}

fn parse_dimensions(stdout: &[u8]) -> Result<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MetadataError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    match probe.streams.first() {
        Some(ProbeStream {
            width: Some(width),
            height: Some(height),
        }) => Ok((*width, *height)),
        _ => Err(MetadataError::Probe("no video stream".to_string())),
    }
}
