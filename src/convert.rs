//! Conversion engine: one source in, one result out.
//!
//! [`ConversionEngine::convert_one`] resolves the source's display handle,
//! decodes it, computes the output size, rasterizes onto a surface of that
//! size (flattening onto white for formats without alpha), encodes, and
//! wraps the bytes in a [`ResultRecord`].
//!
//! The result's display handle is allocated only after every fallible step
//! has succeeded, so a failed conversion leaves nothing behind.

use crate::format::derive_name;
use crate::handles::HandleAllocator;
use crate::imaging::{
    BackendError, Dimensions, ImageBackend, RasterizeParams, Rgb, resolve_dimensions,
};
use crate::types::{ConversionConfig, RecordId, ResultRecord, SourceRecord};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("could not decode '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("could not encode '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: BackendError,
    },
    #[error("'{name}' did not finish within {limit:?}")]
    Timeout { name: String, limit: Duration },
}

pub struct ConversionEngine<B> {
    backend: B,
    handles: Arc<dyn HandleAllocator>,
}

impl<B: ImageBackend> ConversionEngine<B> {
    pub fn new(backend: B, handles: Arc<dyn HandleAllocator>) -> Self {
        Self { backend, handles }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Header-only size of a registered source.
    pub async fn identify(&self, source: &SourceRecord) -> Result<Dimensions, ConvertError> {
        let bytes = self.source_bytes(source)?;
        self.backend
            .identify(bytes)
            .await
            .map_err(|source_err| ConvertError::Decode {
                name: source.original_name.clone(),
                source: source_err,
            })
    }

    /// Convert one source under `config`.
    pub async fn convert_one(
        &self,
        source: &SourceRecord,
        config: &ConversionConfig,
    ) -> Result<ResultRecord, ConvertError> {
        let name = &source.original_name;
        let decode_err = |e| ConvertError::Decode {
            name: name.clone(),
            source: e,
        };
        let encode_err = |e| ConvertError::Encode {
            name: name.clone(),
            source: e,
        };

        let bytes = self.source_bytes(source)?;
        let decoded = self.backend.decode(bytes).await.map_err(decode_err)?;

        let (width, height) = resolve_dimensions(
            decoded.dimensions.as_tuple(),
            config.target_width.map(NonZeroU32::get),
            config.target_height.map(NonZeroU32::get),
        );
        let format = config.output_format;
        let params = RasterizeParams {
            width,
            height,
            format,
            quality: config.quality,
            background: (!format.supports_alpha()).then_some(Rgb::WHITE),
        };
        debug!(
            %name,
            from = ?decoded.dimensions,
            to = ?(width, height),
            %format,
            "rasterizing"
        );

        let encoded = self
            .backend
            .rasterize(decoded.bitmap, &params)
            .await
            .map_err(encode_err)?;
        if encoded.is_empty() {
            return Err(encode_err(BackendError::Encode(
                "encoder produced no output".into(),
            )));
        }

        let payload: Arc<[u8]> = encoded.into();
        let display_handle = self.handles.allocate(payload.clone());
        Ok(ResultRecord {
            id: RecordId::next(),
            source_id: source.id,
            name: derive_name(name, format.tag()),
            size_bytes: payload.len() as u64,
            mime_type: format.mime_type(),
            format_label: format.label(),
            output_dimensions: Dimensions::new(width, height),
            display_handle,
            payload,
        })
    }

    fn source_bytes(&self, source: &SourceRecord) -> Result<Arc<[u8]>, ConvertError> {
        self.handles
            .resolve(&source.display_handle)
            .ok_or_else(|| ConvertError::Decode {
                name: source.original_name.clone(),
                source: BackendError::Decode("source handle was released".into()),
            })
    }
}
