//! The converter session.
//!
//! A [`Converter`] owns everything one user session needs: the conversion
//! engine, the file registry, loaded settings, and the optional archiver used
//! for bundled downloads. The presentation layer holds one instance and routes
//! every user action through it. There is no global state.
//!
//! The registry sits behind an async mutex that a batch run holds for its whole
//! duration, so `add`/`remove`/`clear` issued during a run wait until it
//! finishes instead of shifting indices under it. Run exclusion and
//! cancellation share a separate atomic run state (see
//! [`run_batch`](Converter::run_batch)) so a second run is rejected
//! immediately rather than queued.

use crate::archive::Archiver;
use crate::batch::RunState;
use crate::config::ConverterConfig;
use crate::convert::{ConversionEngine, ConvertError};
use crate::handles::HandleAllocator;
use crate::imaging::{ImageBackend, height_for_width, width_for_height};
use crate::registry::{AddRejection, AddReport, FileRegistry};
use crate::types::{ConversionConfig, RecordId, UploadedFile};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// The control the user just edited, with its new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEdit {
    Width(u32),
    Height(u32),
}

pub struct Converter<B> {
    pub(crate) engine: ConversionEngine<B>,
    pub(crate) registry: Mutex<FileRegistry>,
    pub(crate) settings: ConverterConfig,
    pub(crate) archiver: Option<Arc<dyn Archiver>>,
    pub(crate) run_state: RunState,
}

impl<B: ImageBackend> Converter<B> {
    /// Create a session. With the `zip` feature, bundled downloads use
    /// [`ZipArchiver`](crate::archive::ZipArchiver) by default.
    pub fn new(backend: B, handles: Arc<dyn HandleAllocator>, settings: ConverterConfig) -> Self {
        Self {
            engine: ConversionEngine::new(backend, handles.clone()),
            registry: Mutex::new(FileRegistry::new(handles)),
            settings,
            archiver: default_archiver(),
            run_state: RunState::default(),
        }
    }

    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Deliver multi-result downloads one file at a time.
    pub fn without_archiver(mut self) -> Self {
        self.archiver = None;
        self
    }

    pub fn settings(&self) -> &ConverterConfig {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        self.engine.backend()
    }

    /// Initial control values for the presentation layer.
    pub fn default_conversion(&self) -> ConversionConfig {
        self.settings.conversion()
    }

    /// Lock the registry for reading. Waits while a batch is running.
    pub async fn registry(&self) -> MutexGuard<'_, FileRegistry> {
        self.registry.lock().await
    }

    pub async fn add(&self, file: UploadedFile) -> Result<RecordId, AddRejection> {
        self.registry.lock().await.add(file)
    }

    pub async fn add_files(&self, files: impl IntoIterator<Item = UploadedFile>) -> AddReport {
        self.registry.lock().await.add_all(files)
    }

    pub async fn remove(&self, id: RecordId) -> bool {
        self.registry.lock().await.remove(id)
    }

    pub async fn clear(&self) {
        self.registry.lock().await.clear();
    }

    pub fn is_running(&self) -> bool {
        self.run_state.is_running()
    }

    /// Ask the running batch to start no further items. The item in flight
    /// completes normally. No effect when idle.
    pub fn cancel(&self) {
        if self.run_state.request_cancel() {
            debug!("cancellation requested");
        }
    }

    /// The linked value for the other size control.
    ///
    /// Uses the first registered source's header size. Returns `None` when
    /// the aspect lock is off, the edited value is zero, or nothing is
    /// registered.
    pub async fn linked_size(
        &self,
        edit: SizeEdit,
        maintain_aspect_ratio: bool,
    ) -> Result<Option<u32>, ConvertError> {
        let value = match edit {
            SizeEdit::Width(v) | SizeEdit::Height(v) => v,
        };
        if !maintain_aspect_ratio || value == 0 {
            return Ok(None);
        }
        let registry = self.registry.lock().await;
        let Some(first) = registry.sources().first() else {
            return Ok(None);
        };
        let original = self.engine.identify(first).await?.as_tuple();
        Ok(Some(match edit {
            SizeEdit::Width(width) => height_for_width(original, width),
            SizeEdit::Height(height) => width_for_height(original, height),
        }))
    }
}

#[cfg(feature = "zip")]
fn default_archiver() -> Option<Arc<dyn Archiver>> {
    Some(Arc::new(crate::archive::ZipArchiver))
}

#[cfg(not(feature = "zip"))]
fn default_archiver() -> Option<Arc<dyn Archiver>> {
    None
}
