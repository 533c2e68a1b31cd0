//! File registry: uploaded sources and converted results.
//!
//! The registry is the only owner of [`SourceRecord`]s and [`ResultRecord`]s
//! and the only place their display handles are allocated (for sources) or
//! revoked (for both). Every handle that enters the registry leaves it
//! through [`HandleAllocator::revoke`]: on [`remove`](FileRegistry::remove),
//! [`clear`](FileRegistry::clear), [`reset_results`](FileRegistry::reset_results)
//! or when the registry is dropped.

use crate::handles::HandleAllocator;
use crate::types::{RecordId, ResultRecord, SourceRecord, UploadedFile};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Why an upload was not registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddRejection {
    #[error("'{name}' is not an image (declared type '{mime_type}')")]
    NotAnImage { name: String, mime_type: String },
    #[error("'{name}' ({size_bytes} bytes) is already registered")]
    Duplicate { name: String, size_bytes: u64 },
}

/// Outcome of adding several uploads at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<RecordId>,
    /// Uploads rejected for a non-image media type.
    pub invalid: usize,
    /// Uploads skipped because an identical source is already registered.
    pub duplicates: usize,
}

impl AddReport {
    /// Number of uploads that passed the media-type check.
    pub fn accepted_images(&self) -> usize {
        self.added.len() + self.duplicates
    }
}

pub struct FileRegistry {
    handles: Arc<dyn HandleAllocator>,
    sources: Vec<SourceRecord>,
    results: Vec<ResultRecord>,
}

impl FileRegistry {
    pub fn new(handles: Arc<dyn HandleAllocator>) -> Self {
        Self {
            handles,
            sources: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn handles(&self) -> &Arc<dyn HandleAllocator> {
        &self.handles
    }

    /// Registered sources, in upload order.
    pub fn sources(&self) -> &[SourceRecord] {
        &self.sources
    }

    /// Converted results, in conversion order.
    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    pub fn source(&self, id: RecordId) -> Option<&SourceRecord> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn result(&self, id: RecordId) -> Option<&ResultRecord> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Register one upload. Does not decode it.
    pub fn add(&mut self, file: UploadedFile) -> Result<RecordId, AddRejection> {
        if !file.mime_type.starts_with("image/") {
            return Err(AddRejection::NotAnImage {
                name: file.name,
                mime_type: file.mime_type,
            });
        }
        let size_bytes = file.size_bytes();
        if self.sources.iter().any(|s| s.same_source(&file.name, size_bytes)) {
            return Err(AddRejection::Duplicate {
                name: file.name,
                size_bytes,
            });
        }

        let id = RecordId::next();
        let display_handle = self.handles.allocate(file.bytes);
        debug!(%id, name = %file.name, size_bytes, "registered source");
        self.sources.push(SourceRecord {
            id,
            original_name: file.name,
            size_bytes,
            mime_type: file.mime_type,
            display_handle,
        });
        Ok(id)
    }

    /// Register several uploads, counting rejections instead of failing.
    pub fn add_all(&mut self, files: impl IntoIterator<Item = UploadedFile>) -> AddReport {
        let mut report = AddReport::default();
        for file in files {
            match self.add(file) {
                Ok(id) => report.added.push(id),
                Err(AddRejection::NotAnImage { name, mime_type }) => {
                    debug!(%name, %mime_type, "skipped non-image upload");
                    report.invalid += 1;
                }
                Err(AddRejection::Duplicate { name, .. }) => {
                    debug!(%name, "skipped duplicate upload");
                    report.duplicates += 1;
                }
            }
        }
        info!(
            added = report.added.len(),
            invalid = report.invalid,
            duplicates = report.duplicates,
            "upload processed"
        );
        report
    }

    /// Remove a source and release its handle. Returns `false` if absent.
    pub fn remove(&mut self, id: RecordId) -> bool {
        let Some(index) = self.sources.iter().position(|s| s.id == id) else {
            return false;
        };
        let record = self.sources.remove(index);
        debug!(%id, name = %record.original_name, "removed source");
        self.handles.revoke(record.display_handle);
        true
    }

    /// Release every handle and empty both lists.
    pub fn clear(&mut self) {
        for record in self.sources.drain(..) {
            self.handles.revoke(record.display_handle);
        }
        self.reset_results();
    }

    /// Store a converted result.
    pub(crate) fn append_result(&mut self, record: ResultRecord) {
        self.results.push(record);
    }

    /// Release and drop all results, keeping sources.
    pub fn reset_results(&mut self) {
        for record in self.results.drain(..) {
            self.handles.revoke(record.display_handle);
        }
    }
}

impl Drop for FileRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
