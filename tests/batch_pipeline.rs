//! End-to-end: real pixels through the whole session.
//!
//! Uploads from disk, converts with `RustBackend`, and delivers into a temp
//! directory, checking the decoded outputs rather than mock records.

use image::{ImageFormat, Rgba, RgbaImage};
use imgconv::batch::{BatchEvent, BatchSummary, ItemOutcome};
use imgconv::config::load_config;
use imgconv::converter::{Converter, SizeEdit};
use imgconv::download::{DirectorySink, DownloadOutcome};
use imgconv::format::OutputFormat;
use imgconv::handles::MemoryHandles;
use imgconv::imaging::{Quality, RustBackend};
use imgconv::output::format_progress;
use imgconv::types::{ConversionConfig, UploadedFile};
use std::fs;
use std::path::Path;
use std::sync::{Arc, mpsc};
use tempfile::TempDir;

fn write_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        // left half transparent, right half opaque red
        if x < width / 2 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([255, 0, 0, 255])
        }
    });
    img.save_with_format(path, ImageFormat::Png).unwrap();
}

struct Session {
    tmp: TempDir,
    converter: Converter<RustBackend>,
    handles: Arc<MemoryHandles>,
}

async fn session() -> Session {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("imgconv.toml");
    fs::write(
        &config_path,
        "[batch]\npacing_ms = 0\n\n[download]\narchive_name = \"batch.zip\"\n",
    )
    .unwrap();
    let settings = load_config(&config_path).unwrap();

    let inputs = tmp.path().join("in");
    fs::create_dir_all(&inputs).unwrap();
    write_png(&inputs.join("wide.png"), 200, 100);
    fs::write(inputs.join("broken.png"), b"\x89PNG but not really").unwrap();
    write_png(&inputs.join("square.png"), 300, 300);
    fs::write(inputs.join("notes.txt"), b"hello").unwrap();

    let handles = Arc::new(MemoryHandles::new());
    let converter = Converter::new(RustBackend::new(), handles.clone(), settings);
    let uploads = ["wide.png", "broken.png", "square.png", "notes.txt"]
        .iter()
        .map(|name| UploadedFile::from_path(&inputs.join(name)).unwrap());
    let report = converter.add_files(uploads).await;
    assert_eq!(report.added.len(), 3);
    assert_eq!(report.invalid, 1);

    Session {
        tmp,
        converter,
        handles,
    }
}

#[tokio::test]
async fn converts_registered_images_to_jpeg() {
    let s = session().await;

    let linked = s
        .converter
        .linked_size(SizeEdit::Width(100), true)
        .await
        .unwrap();
    assert_eq!(linked, Some(50));

    let config = ConversionConfig::new(OutputFormat::Jpeg)
        .with_quality(Quality::new(0.8))
        .with_size(Some(100), None);
    let (tx, rx) = mpsc::channel();
    let summary = s.converter.run_batch(&config, Some(tx)).await.unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            succeeded: 2,
            failed: 1,
            total: 3,
            cancelled: false
        }
    );
    let progress: Vec<String> = rx
        .try_iter()
        .filter_map(|e| match e {
            BatchEvent::Progress(p) => Some(format_progress(&p)),
            _ => None,
        })
        .collect();
    assert_eq!(
        progress,
        vec![
            "33% Converting 1 of 3",
            "67% Converting 2 of 3",
            "100% Converting 3 of 3"
        ]
    );

    let registry = s.converter.registry().await;
    let results = registry.results();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0].name, "wide.jpeg");
    assert_eq!(results[0].mime_type, "image/jpeg");
    assert_eq!(results[0].format_label, "JPEG");
    let wide = image::load_from_memory(&results[0].payload).unwrap();
    assert_eq!((wide.width(), wide.height()), (100, 50));
    // transparent half flattened onto white
    let image::Rgb([r, g, b]) = *wide.to_rgb8().get_pixel(10, 25);
    assert!(r > 240 && g > 240 && b > 240);

    assert_eq!(results[1].name, "square.jpeg");
    let square = image::load_from_memory(&results[1].payload).unwrap();
    assert_eq!((square.width(), square.height()), (100, 100));
}

#[tokio::test]
async fn explicit_size_ignores_aspect_ratio() {
    let s = session().await;
    let config = ConversionConfig::new(OutputFormat::Png).with_size(Some(40), Some(40));

    s.converter.run_batch(&config, None).await.unwrap();

    let registry = s.converter.registry().await;
    for result in registry.results() {
        let decoded = image::load_from_memory(&result.payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 40));
        assert_eq!(result.output_dimensions.as_tuple(), (40, 40));
    }
}

#[tokio::test]
async fn oversized_target_fails_items_not_the_run() {
    let s = session().await;
    let huge = ConversionConfig::new(OutputFormat::Png).with_size(Some(60_000), Some(60_000));
    let (tx, rx) = mpsc::channel();

    let summary = s.converter.run_batch(&huge, Some(tx)).await.unwrap();

    assert_eq!(summary.failed, 3);
    assert!(summary.is_total_failure());
    assert!(s.converter.registry().await.results().is_empty());
    let too_large = rx
        .try_iter()
        .filter(|e| match e {
            BatchEvent::Progress(p) => matches!(
                &p.outcome,
                ItemOutcome::Failed { reason } if reason.contains("surface too large")
            ),
            _ => false,
        })
        .count();
    assert_eq!(too_large, 2);

    // The session is still usable.
    let summary = s
        .converter
        .run_batch(&ConversionConfig::new(OutputFormat::Png), None)
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 2);
}

#[tokio::test]
async fn download_single_result_then_clear() {
    let s = session().await;
    s.converter
        .run_batch(&ConversionConfig::new(OutputFormat::Webp), None)
        .await
        .unwrap();

    let id = s.converter.registry().await.results()[1].id;
    let out = s.tmp.path().join("out");
    let sink = DirectorySink::new(&out);
    s.converter.download_one(id, &sink).await.unwrap();

    let bytes = fs::read(out.join("square.webp")).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);

    s.converter.clear().await;
    assert_eq!(s.handles.live(), 0);
    assert_eq!(s.handles.allocated(), s.handles.revoked());
}

#[cfg(feature = "zip")]
#[tokio::test]
async fn download_all_bundles_into_zip() {
    use std::io::{Cursor, Read};

    let s = session().await;
    s.converter
        .run_batch(&ConversionConfig::new(OutputFormat::Bmp), None)
        .await
        .unwrap();

    let out = s.tmp.path().join("out");
    let outcome = s
        .converter
        .download_all(&DirectorySink::new(&out))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DownloadOutcome::Archive {
            name: "batch.zip".into(),
            entries: 2
        }
    );

    let bytes = fs::read(out.join("batch.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).unwrap();
        names.push(entry.name().to_string());
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(image::guess_format(&content).unwrap(), ImageFormat::Bmp);
    }
    assert_eq!(names, vec!["wide.bmp", "square.bmp"]);
}
