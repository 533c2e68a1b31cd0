//! Bundling several results into one archive.
//!
//! [`Archiver`] is the injectable bundling capability used by
//! [`download_all`](crate::converter::Converter::download_all). A session
//! without one delivers results individually instead. [`ZipArchiver`]
//! (behind the default `zip` feature) writes an uncompressed ZIP, since the
//! entries are already-compressed images.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(String),
    #[error("Background task failed: {0}")]
    Task(String),
}

/// One file to place in an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Arc<[u8]>,
}

#[async_trait]
pub trait Archiver: Send + Sync {
    /// Produce one archive containing `entries` in order. Entry names are
    /// expected to be unique.
    async fn bundle(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiveError>;
}

/// Make names unique by suffixing repeats: `a.png`, `a (1).png`, `a (2).png`.
pub fn unique_entry_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 1;
        while taken.contains(&candidate) {
            candidate = numbered(name, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn numbered(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{} ({n}){}", &name[..dot], &name[dot..]),
        None => format!("{name} ({n})"),
    }
}

#[cfg(feature = "zip")]
pub use self::zip_impl::ZipArchiver;

#[cfg(feature = "zip")]
mod zip_impl {
    use super::{ArchiveEntry, ArchiveError, Archiver};
    use async_trait::async_trait;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Stored (uncompressed) ZIP archives.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ZipArchiver;

    impl ZipArchiver {
        fn write(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
            let zip_err = |e: zip::result::ZipError| ArchiveError::Zip(e.to_string());
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

            let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
            for entry in entries {
                writer.start_file(entry.name.as_str(), options).map_err(zip_err)?;
                writer.write_all(&entry.bytes)?;
            }
            Ok(writer.finish().map_err(zip_err)?.into_inner())
        }
    }

    #[async_trait]
    impl Archiver for ZipArchiver {
        async fn bundle(&self, entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiveError> {
            tokio::task::spawn_blocking(move || Self::write(&entries))
                .await
                .map_err(|e| ArchiveError::Task(e.to_string()))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_names_pass_through() {
        assert_eq!(unique_entry_names(["a.png", "b.png"]), vec!["a.png", "b.png"]);
    }

    #[test]
    fn repeated_names_get_counters() {
        assert_eq!(
            unique_entry_names(["photo.png", "photo.png", "photo.png", "noext", "noext"]),
            vec!["photo.png", "photo (1).png", "photo (2).png", "noext", "noext (1)"]
        );
    }

    #[test]
    fn counter_skips_names_already_taken() {
        assert_eq!(
            unique_entry_names(["a (1).png", "a.png", "a.png"]),
            vec!["a (1).png", "a.png", "a (2).png"]
        );
    }

    #[cfg(feature = "zip")]
    #[tokio::test]
    async fn zip_contains_entries_in_order() {
        use std::io::{Cursor, Read};

        let entries = vec![
            ArchiveEntry {
                name: "a.png".into(),
                bytes: Arc::from(&b"first"[..]),
            },
            ArchiveEntry {
                name: "b.jpeg".into(),
                bytes: Arc::from(&b"second"[..]),
            },
        ];

        let bytes = ZipArchiver.bundle(entries).await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "a.png");
        let mut content = Vec::new();
        first.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"first");
        drop(first);
        assert_eq!(archive.by_index(1).unwrap().name(), "b.jpeg");
    }

    #[cfg(feature = "zip")]
    #[tokio::test]
    async fn zip_rejects_duplicate_names() {
        let entry = ArchiveEntry {
            name: "same.png".into(),
            bytes: Arc::from(&b"x"[..]),
        };
        let result = ZipArchiver.bundle(vec![entry.clone(), entry]).await;
        assert!(matches!(result, Err(ArchiveError::Zip(_))));
    }
}
