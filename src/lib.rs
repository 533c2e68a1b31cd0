//! # imgconv
//!
//! The core of a batch image converter: take a set of uploaded images plus a
//! conversion config (target format, quality, optional target size) and
//! produce converted files, one at a time, with per-item failure isolation,
//! progress reporting, and a final summary.
//!
//! The presentation layer (file picker, preview tiles, progress modal,
//! toasts) is not here. It holds one [`Converter`](converter::Converter),
//! feeds it [`UploadedFile`](types::UploadedFile)s and an immutable
//! [`ConversionConfig`](types::ConversionConfig), and renders what comes back.
//!
//! # Pipeline
//!
//! ```text
//! add / add_files      UploadedFile  →  SourceRecord   (registry, display handle)
//! run_batch            SourceRecord  →  ResultRecord   (decode → size → draw → encode)
//! download_one / _all  ResultRecord  →  DownloadSink   (file, or archive of several)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`converter`] | The session: owns registry, engine, settings, archiver |
//! | [`batch`] | Sequential run over all sources: exclusion, progress, pacing, cancel |
//! | [`convert`] | One source → one result |
//! | [`registry`] | Source and result records, handle lifecycle |
//! | [`handles`] | Transient display handles (`blob:`-style references) |
//! | [`format`] | Output formats, MIME mapping, output file names |
//! | [`imaging`] | Dimension math and the pure-Rust decode/encode backend |
//! | [`archive`] | Bundling several results into one ZIP |
//! | [`download`] | Delivering results to a sink |
//! | [`config`] | `imgconv.toml` loading, merging and validation |
//! | [`types`] | Records and the per-run conversion config |
//! | [`output`] | Presentation text: sizes, progress, notices |
//!
//! # Design Decisions
//!
//! ## Sequential Conversion
//!
//! Items are converted strictly one after another. At most one decoded bitmap
//! and one encoded buffer are in flight, and progress events arrive in order.
//! The decode and encode calls are the only suspension points.
//!
//! ## Config Captured Up Front
//!
//! Control state is read into a [`ConversionConfig`](types::ConversionConfig)
//! before a run starts. The core never reaches back into the UI mid-run, so a
//! slider moved during conversion affects the next run, not this one.
//!
//! ## Zero Trace On Failure
//!
//! A failed item produces no result record and allocates no handle: the
//! result's handle is created only after encoding succeeds. Every handle the
//! registry hands out is revoked on remove, clear, the next run's reset, or
//! drop.
//!
//! ## Optional Archiver
//!
//! Bundling is an injectable capability ([`archive::Archiver`]). Without one,
//! or when bundling fails, results are delivered individually with a short
//! pause before each.

pub mod archive;
pub mod batch;
pub mod config;
pub mod convert;
pub mod converter;
pub mod download;
pub mod format;
pub mod handles;
pub mod imaging;
pub mod output;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
