//! # Image Processing Module
//!
//! Questo modulo ridimensiona le immagini raster contenute nella directory
//! `Pictures/` del working tree.
//!
//! ## Pipeline per immagine
//!
//! 1. **Formato**: dedotto dall'estensione (case-insensitive, nessuno sniffing
//!    per la codifica). Estensioni non raster (svm, wmf, emf, svg) vengono saltate
//! 2. **Decodifica**: un errore di decodifica interrompe la run
//! 3. **Soglia**: se larghezza e altezza sono entro `max_dimension` il file
//!    resta byte-identico (nessuna ricodifica, nessuna scrittura)
//! 4. **Dimensioni**: il lato lungo diventa `max_dimension`, il corto viene
//!    scalato con troncamento intero; a parità decide il ramo dell'altezza
//! 5. **Resize**: bilineare (`FilterType::Triangle`) su una copia RGBA della
//!    sorgente, così la trasparenza resta intatta
//! 6. **Codifica**: stesso formato dell'estensione, scritto su un file
//!    temporaneo e poi rinominato sopra l'originale
//!
//! ## Esempio
//!
//! ```rust,ignore
//! let optimizer = ImageOptimizer::new(800);
//! let report = optimizer.optimize_archive(tree.path(), &ProgressManager::hidden())?;
//! println!("{}", report.stats.format_summary());
//! ```

use crate::archive::ArchiveEntry;
use crate::config::Config;
use crate::error::OptimizeError;
use crate::file_manager::FileManager;
use crate::progress::{OptimizationStats, ProgressManager};
use image::imageops::{self, FilterType};
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// What happened to one file under `Pictures/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// Already within the threshold, left byte-identical
    Untouched { width: u32, height: u32 },
    /// Downscaled and re-encoded in place
    Resized {
        from: (u32, u32),
        to: (u32, u32),
        original_size: u64,
        new_size: u64,
    },
    /// Not a raster format the codec knows
    Skipped { reason: String },
}

/// Per-file result, named by its path inside the archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ImageOutcome,
}

/// Result of optimizing every picture of a working tree
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub stats: OptimizationStats,
    pub images: Vec<ImageReport>,
}

/// Size of an image scaled so that its longer side equals `max_dimension`.
///
/// Returns `None` when both sides already fit. Width drives only when it is
/// strictly larger than height; the shorter side is truncated and never drops
/// below one pixel.
pub fn scale_to_fit(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }

    let max = u64::from(max_dimension);
    let (new_width, new_height) = if width > height {
        (max, u64::from(height) * max / u64::from(width))
    } else {
        (u64::from(width) * max / u64::from(height), max)
    };

    // both values are bounded by max_dimension, so the casts are lossless
    Some((new_width.max(1) as u32, new_height.max(1) as u32))
}

/// Downscales oversized raster images in place
#[derive(Debug, Clone, Copy)]
pub struct ImageOptimizer {
    max_dimension: u32,
}

impl ImageOptimizer {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_dimension)
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Optimize every file directly inside `root/Pictures`.
    ///
    /// Subdirectories of `Pictures/` are not visited. The first image that
    /// fails to decode or encode aborts the whole pass.
    pub fn optimize_archive(
        &self,
        root: &Path,
        progress: &ProgressManager,
    ) -> Result<OptimizationReport, OptimizeError> {
        let files = FileManager::list_pictures(root)?;
        info!(
            "Optimizing {} pictures (max size {}px)",
            files.len(),
            self.max_dimension
        );
        progress.set_length(files.len() as u64);

        let mut report = OptimizationReport::default();
        for path in files {
            let original_size = path.metadata()?.len();
            let outcome = self.optimize_image(&path)?;

            match &outcome {
                ImageOutcome::Resized {
                    original_size,
                    new_size,
                    ..
                } => report.stats.add_resized(*original_size, *new_size),
                ImageOutcome::Untouched { .. } => report.stats.add_untouched(original_size),
                ImageOutcome::Skipped { .. } => report.stats.add_skipped(original_size),
            }

            let name = ArchiveEntry::from_tree(root, &path, false)
                .map(|entry| entry.name)
                .unwrap_or_else(|| path.display().to_string());
            progress.update(&name);
            report.images.push(ImageReport { name, outcome });
        }

        Ok(report)
    }

    /// Downscale the image at `path` if either side exceeds the threshold.
    ///
    /// # Returns
    /// * `ImageOutcome::Untouched` - the file was not rewritten
    /// * `ImageOutcome::Resized` - the file now holds the smaller re-encoding
    /// * `ImageOutcome::Skipped` - the extension names no raster format
    pub fn optimize_image(&self, path: &Path) -> Result<ImageOutcome, OptimizeError> {
        let Some(format) = FileManager::raster_format(path) else {
            debug!("Skipping non-raster picture: {}", path.display());
            return Ok(ImageOutcome::Skipped {
                reason: format!(
                    "unsupported extension: {}",
                    path.extension()
                        .map(|ext| ext.to_string_lossy().into_owned())
                        .unwrap_or_default()
                ),
            });
        };

        let image = decode(path)?;
        let (width, height) = image.dimensions();

        let Some((new_width, new_height)) = scale_to_fit(width, height, self.max_dimension) else {
            debug!("{} is {}x{}, within limits", path.display(), width, height);
            return Ok(ImageOutcome::Untouched { width, height });
        };

        let original_size = path.metadata()?.len();
        let resized = resize(&image, new_width, new_height);
        encode_in_place(&resized, format, path)?;
        let new_size = path.metadata()?.len();

        info!(
            "Resized {}: {}x{} -> {}x{} ({} -> {})",
            path.display(),
            width,
            height,
            new_width,
            new_height,
            FileManager::format_size(original_size),
            FileManager::format_size(new_size)
        );

        Ok(ImageOutcome::Resized {
            from: (width, height),
            to: (new_width, new_height),
            original_size,
            new_size,
        })
    }
}

fn image_error(path: &Path) -> impl FnOnce(image::ImageError) -> OptimizeError + '_ {
    move |source| OptimizeError::Image {
        path: path.to_path_buf(),
        source,
    }
}

fn decode(path: &Path) -> Result<DynamicImage, OptimizeError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(image_error(path))
}

/// Bilinear resize over a straight RGBA copy of the source.
/// Sources without alpha come back as RGB so encoders like JPEG accept them.
fn resize(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let rgba = image.to_rgba8();
    let resized = imageops::resize(&rgba, width, height, FilterType::Triangle);

    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(resized)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(resized).to_rgb8())
    }
}

/// Encode next to `path`, then rename over it so a failed encode never
/// leaves a truncated file behind.
fn encode_in_place(image: &DynamicImage, format: ImageFormat, path: &Path) -> Result<(), OptimizeError> {
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    encode_to(image, format, tmp.as_file_mut(), path)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Buffered encode. The final flush is checked: a failed tail write must not
/// reach the rename.
fn encode_to<W: Write + Seek>(
    image: &DynamicImage,
    format: ImageFormat,
    out: W,
    path: &Path,
) -> Result<(), OptimizeError> {
    let mut writer = BufWriter::new(out);
    image
        .write_to(&mut writer, ImageOutputFormat::from(format))
        .map_err(image_error(path))?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 40, 40]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_scale_to_fit_width_driven() {
        assert_eq!(scale_to_fit(1600, 1200, 800), Some((800, 600)));
    }

    #[test]
    fn test_scale_to_fit_height_driven() {
        assert_eq!(scale_to_fit(1200, 1600, 800), Some((600, 800)));
    }

    #[test]
    fn test_scale_to_fit_square_uses_height_branch() {
        assert_eq!(scale_to_fit(1000, 1000, 800), Some((800, 800)));
    }

    #[test]
    fn test_scale_to_fit_within_limits() {
        assert_eq!(scale_to_fit(800, 800, 800), None);
        assert_eq!(scale_to_fit(10, 799, 800), None);
    }

    #[test]
    fn test_scale_to_fit_truncates_and_clamps() {
        // 1000 * 800 / 3000 = 266.66 -> 266
        assert_eq!(scale_to_fit(3000, 1000, 800), Some((800, 266)));
        // one side exceeds, the other is tiny
        assert_eq!(scale_to_fit(10_000, 1, 800), Some((800, 1)));
        assert_eq!(scale_to_fit(900, 100, 800), Some((800, 88)));
    }

    #[test]
    fn test_scale_to_fit_large_values_do_not_overflow() {
        assert_eq!(scale_to_fit(u32::MAX, u32::MAX / 2, 65_535), Some((65_535, 32_767)));
    }

    #[test]
    fn test_small_image_left_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("small.png");
        write_png(&path, 640, 480);
        let before = fs::read(&path).unwrap();

        let outcome = ImageOptimizer::new(800).optimize_image(&path).unwrap();

        assert_eq!(outcome, ImageOutcome::Untouched { width: 640, height: 480 });
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_large_png_is_resized_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("large.png");
        write_png(&path, 1600, 1200);

        let outcome = ImageOptimizer::new(800).optimize_image(&path).unwrap();

        assert!(matches!(
            outcome,
            ImageOutcome::Resized { from: (1600, 1200), to: (800, 600), .. }
        ));
        assert_eq!(image::image_dimensions(&path).unwrap(), (800, 600));
    }

    #[test]
    fn test_large_jpeg_is_reencoded_as_jpeg() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("photo.jpg");
        RgbImage::from_pixel(1200, 1600, Rgb([10, 120, 200]))
            .save(&path)
            .unwrap();

        ImageOptimizer::new(800).optimize_image(&path).unwrap();

        let reader = ImageReader::open(&path).unwrap().with_guessed_format().unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::Jpeg));
        assert_eq!(reader.into_dimensions().unwrap(), (600, 800));
    }

    #[test]
    fn test_large_webp_is_reencoded_as_webp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("banner.webp");
        RgbImage::from_pixel(1600, 400, Rgb([30, 160, 90]))
            .save(&path)
            .unwrap();

        let outcome = ImageOptimizer::new(800).optimize_image(&path).unwrap();

        assert!(matches!(
            outcome,
            ImageOutcome::Resized { to: (800, 200), .. }
        ));
        let reader = ImageReader::open(&path).unwrap().with_guessed_format().unwrap();
        assert_eq!(reader.format(), Some(ImageFormat::WebP));
        assert_eq!(reader.into_dimensions().unwrap(), (800, 200));
    }

    /// Accepts seeks but fails every write
    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, _pos: std::io::SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_encode_reports_failed_buffered_write() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])));
        let result = encode_to(&image, ImageFormat::Png, FullDisk, Path::new("tiny.png"));
        assert!(result.is_err());
    }

    #[test]
    fn test_transparency_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overlay.png");
        let mut source = RgbaImage::from_pixel(1000, 1000, Rgba([0, 0, 0, 0]));
        for x in 0..100 {
            for y in 0..100 {
                source.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        source.save(&path).unwrap();

        ImageOptimizer::new(500).optimize_image(&path).unwrap();

        let resized = image::open(&path).unwrap();
        assert!(resized.color().has_alpha());
        assert_eq!(resized.dimensions(), (500, 500));
        let rgba = resized.to_rgba8();
        assert_eq!(rgba.get_pixel(499, 499)[3], 0);
        assert_eq!(rgba.get_pixel(10, 10)[3], 255);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("large.png");
        write_png(&path, 2000, 1000);
        let optimizer = ImageOptimizer::new(800);

        optimizer.optimize_image(&path).unwrap();
        let after_first = fs::read(&path).unwrap();
        let outcome = optimizer.optimize_image(&path).unwrap();

        assert_eq!(outcome, ImageOutcome::Untouched { width: 800, height: 400 });
        assert_eq!(fs::read(&path).unwrap(), after_first);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"definitely not an image").unwrap();

        let err = ImageOptimizer::new(800).optimize_image(&path).unwrap_err();
        match err {
            OptimizeError::Image { path: failed, .. } => assert_eq!(failed, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_raster_picture_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.svm");
        fs::write(&path, b"VCLMTF vector data").unwrap();

        let outcome = ImageOptimizer::new(800).optimize_image(&path).unwrap();
        assert!(matches!(outcome, ImageOutcome::Skipped { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"VCLMTF vector data");
    }

    #[test]
    fn test_optimize_archive_visits_only_top_level_pictures() {
        let root = TempDir::new().unwrap();
        let pictures = root.path().join("Pictures");
        fs::create_dir_all(pictures.join("nested")).unwrap();
        write_png(&pictures.join("big.png"), 1600, 1200);
        write_png(&pictures.join("small.png"), 100, 100);
        write_png(&pictures.join("nested/deep.png"), 1600, 1200);
        fs::write(pictures.join("shape.wmf"), b"wmf").unwrap();
        write_png(&root.path().join("Thumbnails.png"), 1600, 1200);

        let report = ImageOptimizer::new(800)
            .optimize_archive(root.path(), &ProgressManager::hidden())
            .unwrap();

        let names: Vec<&str> = report.images.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Pictures/big.png", "Pictures/shape.wmf", "Pictures/small.png"]
        );
        assert_eq!(report.stats.images_resized, 1);
        assert_eq!(report.stats.images_untouched, 1);
        assert_eq!(report.stats.files_skipped, 1);
        assert_eq!(
            image::image_dimensions(pictures.join("nested/deep.png")).unwrap(),
            (1600, 1200)
        );
        assert_eq!(
            image::image_dimensions(root.path().join("Thumbnails.png")).unwrap(),
            (1600, 1200)
        );
    }

    #[test]
    fn test_optimize_archive_without_pictures() {
        let root = TempDir::new().unwrap();
        let report = ImageOptimizer::new(800)
            .optimize_archive(root.path(), &ProgressManager::hidden())
            .unwrap();
        assert!(report.images.is_empty());
        assert_eq!(report.stats, OptimizationStats::default());
    }
}
