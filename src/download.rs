//! Delivering results to the user.
//!
//! A [`DownloadSink`] is wherever finished files go: a browser download, or a
//! directory ([`DirectorySink`]). Delivering all results follows a fixed
//! policy:
//!
//! | Results | Delivery |
//! |---|---|
//! | 0 | nothing |
//! | 1 | the file itself |
//! | ≥ 2 | one archive named `download.archive_name` |
//! | ≥ 2, no archiver or bundling failed | each file, `download.fallback_pacing_ms` before each |

use crate::archive::{ArchiveEntry, unique_entry_names};
use crate::converter::Converter;
use crate::imaging::ImageBackend;
use crate::types::{RecordId, ResultRecord};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ARCHIVE_MIME: &str = "application/zip";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("no converted result with id {0}")]
    NotFound(RecordId),
    #[error("delivery failed: {0}")]
    Delivery(#[from] io::Error),
}

/// Receives finished files.
pub trait DownloadSink: Send + Sync {
    fn deliver(&self, name: &str, mime_type: &str, bytes: &[u8]) -> io::Result<()>;
}

/// Writes each delivery into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, name: &str, _mime_type: &str, bytes: &[u8]) -> io::Result<()> {
        // Only the final component: upload names must not escape the directory.
        let file_name = Path::new(name).file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{name}' is not a file name"),
            )
        })?;
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(file_name), bytes)
    }
}

/// How [`Converter::download_all`] delivered the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Nothing,
    Single { name: String },
    Archive { name: String, entries: usize },
    Individually { count: usize },
}

fn deliver(sink: &dyn DownloadSink, result: &ResultRecord) -> io::Result<()> {
    sink.deliver(&result.name, result.mime_type, &result.payload)
}

impl<B: ImageBackend> Converter<B> {
    /// Deliver one result.
    pub async fn download_one(
        &self,
        id: RecordId,
        sink: &dyn DownloadSink,
    ) -> Result<(), DownloadError> {
        let registry = self.registry.lock().await;
        let result = registry.result(id).ok_or(DownloadError::NotFound(id))?;
        deliver(sink, result)?;
        debug!(%id, name = %result.name, "delivered result");
        Ok(())
    }

    /// Deliver every result, bundled when there are two or more.
    pub async fn download_all(
        &self,
        sink: &dyn DownloadSink,
    ) -> Result<DownloadOutcome, DownloadError> {
        let registry = self.registry.lock().await;
        let results = registry.results();

        match results {
            [] => return Ok(DownloadOutcome::Nothing),
            [only] => {
                deliver(sink, only)?;
                return Ok(DownloadOutcome::Single {
                    name: only.name.clone(),
                });
            }
            _ => {}
        }

        let settings = &self.settings.download;
        match &self.archiver {
            Some(archiver) => {
                let names = unique_entry_names(results.iter().map(|r| r.name.as_str()));
                let entries: Vec<_> = names
                    .into_iter()
                    .zip(results)
                    .map(|(name, r)| ArchiveEntry {
                        name,
                        bytes: r.payload.clone(),
                    })
                    .collect();
                let count = entries.len();
                match archiver.bundle(entries).await {
                    Ok(bytes) => {
                        sink.deliver(&settings.archive_name, ARCHIVE_MIME, &bytes)?;
                        info!(name = %settings.archive_name, entries = count, "delivered archive");
                        return Ok(DownloadOutcome::Archive {
                            name: settings.archive_name.clone(),
                            entries: count,
                        });
                    }
                    Err(e) => warn!(error = %e, "bundling failed, delivering files individually"),
                }
            }
            None => debug!("no archiver configured, delivering files individually"),
        }

        let pacing = settings.fallback_pacing();
        for result in results {
            tokio::time::sleep(pacing).await;
            deliver(sink, result)?;
        }
        info!(count = results.len(), "delivered results individually");
        Ok(DownloadOutcome::Individually {
            count: results.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveError, Archiver};
    use crate::config::ConverterConfig;
    use crate::format::OutputFormat;
    use crate::handles::MemoryHandles;
    use crate::imaging::backend::tests::{MockBackend, mock_image};
    use crate::types::{ConversionConfig, UploadedFile};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl RecordingSink {
        fn names(&self) -> Vec<String> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .map(|(name, _, _)| name.clone())
                .collect()
        }
    }

    impl DownloadSink for RecordingSink {
        fn deliver(&self, name: &str, mime_type: &str, bytes: &[u8]) -> io::Result<()> {
            self.delivered
                .lock()
                .unwrap()
                .push((name.to_string(), mime_type.to_string(), bytes.to_vec()));
            Ok(())
        }
    }

    struct BrokenArchiver;

    #[async_trait]
    impl Archiver for BrokenArchiver {
        async fn bundle(&self, _entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiveError> {
            Err(ArchiveError::Zip("out of space".into()))
        }
    }

    /// Bundles by concatenating entry names, so tests can see what went in.
    struct ListingArchiver;

    #[async_trait]
    impl Archiver for ListingArchiver {
        async fn bundle(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiveError> {
            let names: Vec<_> = entries.into_iter().map(|e| e.name).collect();
            Ok(names.join("|").into_bytes())
        }
    }

    async fn converted(names: &[&str]) -> Converter<MockBackend> {
        let mut settings = ConverterConfig::default();
        settings.batch.pacing_ms = 0;
        let converter = Converter::new(
            MockBackend::new(),
            Arc::new(MemoryHandles::new()),
            settings,
        );
        converter
            .add_files(
                names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| UploadedFile::new(*n, "image/png", mock_image(10 + i as u32, 10))),
            )
            .await;
        converter
            .run_batch(&ConversionConfig::new(OutputFormat::Png), None)
            .await
            .unwrap();
        converter
    }

    // =========================================================================
    // download_one
    // =========================================================================

    #[tokio::test]
    async fn download_one_delivers_payload() {
        let converter = converted(&["a.jpg"]).await;
        let id = converter.registry().await.results()[0].id;
        let sink = RecordingSink::default();

        converter.download_one(id, &sink).await.unwrap();

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered[0].0, "a.png");
        assert_eq!(delivered[0].1, "image/png");
        assert_eq!(delivered[0].2, b"png:10x10");
    }

    #[tokio::test]
    async fn download_one_unknown_id() {
        let converter = converted(&["a.jpg"]).await;
        let source_id = converter.registry().await.sources()[0].id;

        let result = converter
            .download_one(source_id, &RecordingSink::default())
            .await;
        assert!(matches!(result, Err(DownloadError::NotFound(id)) if id == source_id));
    }

    // =========================================================================
    // download_all
    // =========================================================================

    #[tokio::test]
    async fn nothing_to_download() {
        let converter = converted(&[]).await;
        let sink = RecordingSink::default();
        assert_eq!(
            converter.download_all(&sink).await.unwrap(),
            DownloadOutcome::Nothing
        );
        assert!(sink.names().is_empty());
    }

    #[tokio::test]
    async fn single_result_is_delivered_directly() {
        let converter = converted(&["a.jpg"]).await.with_archiver(Arc::new(ListingArchiver));
        let sink = RecordingSink::default();

        let outcome = converter.download_all(&sink).await.unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Single {
                name: "a.png".into()
            }
        );
        assert_eq!(sink.names(), vec!["a.png"]);
    }

    #[tokio::test]
    async fn several_results_are_bundled_with_unique_names() {
        let converter = converted(&["a.jpg", "a.gif", "b.jpg"])
            .await
            .with_archiver(Arc::new(ListingArchiver));
        let sink = RecordingSink::default();

        let outcome = converter.download_all(&sink).await.unwrap();

        assert_eq!(
            outcome,
            DownloadOutcome::Archive {
                name: "converted-images.zip".into(),
                entries: 3
            }
        );
        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1, ARCHIVE_MIME);
        assert_eq!(delivered[0].2, b"a.png|a (1).png|b.png");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_bundle_falls_back_to_paced_files() {
        let converter = converted(&["a.jpg", "b.jpg"])
            .await
            .with_archiver(Arc::new(BrokenArchiver));
        let sink = RecordingSink::default();

        let start = tokio::time::Instant::now();
        let outcome = converter.download_all(&sink).await.unwrap();

        assert_eq!(outcome, DownloadOutcome::Individually { count: 2 });
        assert_eq!(sink.names(), vec!["a.png", "b.png"]);
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_archiver_delivers_individually() {
        let converter = converted(&["a.jpg", "b.jpg"]).await.without_archiver();
        let sink = RecordingSink::default();

        let outcome = converter.download_all(&sink).await.unwrap();
        assert_eq!(outcome, DownloadOutcome::Individually { count: 2 });
    }

    // =========================================================================
    // DirectorySink
    // =========================================================================

    #[test]
    fn directory_sink_writes_files() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out"));

        sink.deliver("a.png", "image/png", b"data").unwrap();
        assert_eq!(fs::read(tmp.path().join("out/a.png")).unwrap(), b"data");
    }

    #[test]
    fn directory_sink_strips_directories() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path().join("out"));

        sink.deliver("../../escape.png", "image/png", b"x").unwrap();
        assert!(tmp.path().join("out/escape.png").exists());
        assert!(!tmp.path().join("escape.png").exists());
    }

    #[test]
    fn directory_sink_rejects_empty_name() {
        let tmp = TempDir::new().unwrap();
        let sink = DirectorySink::new(tmp.path());
        let err = sink.deliver("..", "image/png", b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
