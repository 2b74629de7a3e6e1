//! Bounded concurrent metadata extraction
//!
//! One task per candidate, at most `workers` extracting at once. A failure
//! (error or panic) in one task only affects that file: it is recorded as a
//! failed outcome and the file is still indexed, with empty metadata.

use crate::detector::Candidate;
use std::sync::Arc;
use tokio::sync::Semaphore;
use vuvur_core::{MediaMetadata, MetadataExtractor, ScanStatusHandle, ScannedMedia};

/// Result of extracting one candidate
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub candidate: Candidate,
    /// Extracted metadata, or why extraction failed
    pub result: Result<MediaMetadata, String>,
}

impl ExtractionOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }

    /// Record for the index; failures carry empty metadata
    pub fn into_media(self) -> ScannedMedia {
        let Candidate { file, fingerprint } = self.candidate;
        ScannedMedia {
            path: file.key,
            filename: file.filename,
            kind: file.kind,
            fingerprint,
            metadata: self.result.unwrap_or_default(),
            group_tag: file.group_tag,
        }
    }
}

/// Fans extraction out over a bounded set of workers
#[derive(Clone)]
pub struct ExtractionPool {
    extractor: Arc<dyn MetadataExtractor>,
    workers: usize,
    flush_every: u64,
}

impl ExtractionPool {
    /// Create a pool; `workers` and `flush_every` are clamped to at least 1
    pub fn new(extractor: Arc<dyn MetadataExtractor>, workers: usize, flush_every: u64) -> Self {
        Self {
            extractor,
            workers: workers.max(1),
            flush_every: flush_every.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Extract every candidate
    ///
    /// `status` is advanced once per finished candidate and flushed every
    /// `flush_every` candidates. Outcomes come back in candidate order.
    pub async fn run(
        &self,
        candidates: Vec<Candidate>,
        status: &ScanStatusHandle,
    ) -> Vec<ExtractionOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let semaphore = semaphore.clone();
            let extractor = self.extractor.clone();
            let status = status.clone();
            let flush_every = self.flush_every;
            let path = candidate.file.path.clone();
            let kind = candidate.file.kind;

            let handle = tokio::spawn(async move {
                // Semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();

                let result = match extractor.extract(&path, kind).await {
                    Ok(metadata) => Ok(metadata),
                    Err(e) => {
                        tracing::warn!("Metadata extraction failed for {}: {}", path.display(), e);
                        Err(e.to_string())
                    }
                };

                if status.advance() % flush_every == 0 {
                    flush_status(&status).await;
                }
                result
            });

            handles.push((candidate, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (candidate, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(
                        "Extraction task for {} died: {}",
                        candidate.file.path.display(),
                        e
                    );
                    status.advance();
                    Err(e.to_string())
                }
            };
            outcomes.push(ExtractionOutcome { candidate, result });
        }

        flush_status(status).await;
        outcomes
    }
}

/// Flush on a blocking thread, since it may write the status file
async fn flush_status(status: &ScanStatusHandle) {
    let status = status.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || status.flush()).await {
        tracing::warn!("Scan status flush did not complete: {}", e);
    }
}
