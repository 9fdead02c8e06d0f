//! Image I/O operations service
//!
//! This module separates file I/O operations from the pipeline stages,
//! making the stages testable without touching the file system.

use crate::{
    batch::FileEntry,
    config::OutputFormat,
    error::{EraseError, Result},
    utils::PathValidator,
};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Falls back to content-based format detection when the extension is
    /// wrong or missing.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use whitebg_erase::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("input.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(EraseError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    EraseError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data)
                    .map_err(|content_err| EraseError::image_load_error(path_ref, &content_err))
            },
        }
    }

    /// Save an image in the given lossless format
    ///
    /// Float images are stored as 16-bit since neither output format takes
    /// 32-bit float samples.
    pub fn save_image<P: AsRef<Path>>(
        image: &DynamicImage,
        path: P,
        format: OutputFormat,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            Self::ensure_dir(parent)?;
        }

        let encodable;
        let to_write = match image {
            DynamicImage::ImageRgba32F(_) => {
                encodable = DynamicImage::ImageRgba16(image.to_rgba16());
                &encodable
            },
            DynamicImage::ImageRgb32F(_) => {
                encodable = DynamicImage::ImageRgb16(image.to_rgb16());
                &encodable
            },
            _ => image,
        };

        to_write
            .save_with_format(path_ref, format.image_format())
            .map_err(|e| match e {
                image::ImageError::IoError(io_err) => {
                    EraseError::file_io_error("write image", path_ref, &io_err)
                },
                other => EraseError::Image(other),
            })?;

        log::debug!("Saved image to {}", path_ref.display());
        Ok(())
    }

    /// Create a directory and its parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| EraseError::file_io_error("create directory", dir, &e))
    }

    /// Output path for an entry: `<dst>/<stem>.<ext>`
    #[must_use]
    pub fn output_path(dst: &Path, entry: &FileEntry, format: OutputFormat) -> PathBuf {
        dst.join(format!("{}.{}", entry.stem(), format.extension()))
    }

    /// Copy a source file into a directory, keeping its name
    pub fn copy_to_dir(entry: &FileEntry, dir: &Path) -> Result<PathBuf> {
        let target = dir.join(&entry.name);
        std::fs::copy(&entry.path, &target)
            .map_err(|e| EraseError::file_io_error("copy file", &entry.path, &e))?;
        Ok(target)
    }

    /// List the images directly inside a directory, sorted by file name
    ///
    /// Subdirectories are not entered. Files without a supported image
    /// extension are skipped with a warning; files not matching `pattern`
    /// are skipped silently.
    pub fn scan_directory<P: AsRef<Path>>(
        source_dir: P,
        pattern: Option<&str>,
    ) -> Result<Vec<FileEntry>> {
        let source_dir = source_dir.as_ref();
        PathValidator::validate_is_directory(source_dir)?;

        let pattern = pattern
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    EraseError::invalid_config(format!("Invalid file pattern '{}': {}", p, e))
                })
            })
            .transpose()?;

        let mut entries = Vec::new();
        for dir_entry in WalkDir::new(source_dir).min_depth(1).max_depth(1) {
            let dir_entry = dir_entry.map_err(|e| {
                let io_err: std::io::Error = e.into();
                EraseError::file_io_error("scan directory", source_dir, &io_err)
            })?;
            if !dir_entry.file_type().is_file() {
                continue;
            }

            let entry = FileEntry::new(dir_entry.path());
            if let Some(pattern) = &pattern {
                if !pattern.matches(&entry.name) {
                    continue;
                }
            }
            if !PathValidator::is_supported_image_format(&entry.path) {
                log::warn!("Skipping unsupported file: {}", entry.name);
                continue;
            }
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!(
            "Found {} images in {}",
            entries.len(),
            source_dir.display()
        );
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, Rgba32FImage};
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([200, 100, 50])))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ImageIOService::load_image("definitely_missing.png");
        assert!(matches!(result, Err(EraseError::Io(_))));
    }

    #[test]
    fn test_load_with_wrong_extension() {
        let dir = tempdir().unwrap();
        let png = dir.path().join("real.png");
        write_png(&png);
        let disguised = dir.path().join("real.jpg");
        std::fs::copy(&png, &disguised).unwrap();

        let image = ImageIOService::load_image(&disguised).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn test_load_garbage_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = ImageIOService::load_image(&path).unwrap_err();
        assert!(err.is_io());
        assert!(err.to_string().contains("broken.png"));
    }

    #[test]
    fn test_save_formats_keep_alpha() {
        let dir = tempdir().unwrap();
        let image = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            5,
            5,
            Rgba([1, 2, 3, 0]),
        ));

        for format in [OutputFormat::Png, OutputFormat::Tiff] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            ImageIOService::save_image(&image, &path, format).unwrap();
            let loaded = ImageIOService::load_image(&path).unwrap();
            assert!(loaded.color().has_alpha());
            assert_eq!(loaded.to_rgba8().get_pixel(0, 0)[3], 0);
        }
    }

    #[test]
    fn test_save_float_image() {
        let dir = tempdir().unwrap();
        let image = DynamicImage::ImageRgba32F(Rgba32FImage::from_pixel(
            2,
            2,
            Rgba([1.0, 0.0, 0.0, 1.0]),
        ));
        let path = dir.path().join("float.png");
        ImageIOService::save_image(&image, &path, OutputFormat::Png).unwrap();

        let loaded = ImageIOService::load_image(&path).unwrap();
        assert_eq!(loaded.to_rgba8().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("a.png");
        let image = DynamicImage::new_rgba8(1, 1);
        ImageIOService::save_image(&image, &path, OutputFormat::Png).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_output_path() {
        let entry = FileEntry::new("/src/portrait.v2.JPG");
        assert_eq!(
            ImageIOService::output_path(Path::new("/out"), &entry, OutputFormat::Png),
            Path::new("/out/portrait.v2.png")
        );
        assert_eq!(
            ImageIOService::output_path(Path::new("/out"), &entry, OutputFormat::Tiff),
            Path::new("/out/portrait.v2.tiff")
        );
    }

    #[test]
    fn test_copy_to_dir() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.png");
        write_png(&src);
        let failed = dir.path().join("failed");
        ImageIOService::ensure_dir(&failed).unwrap();
        ImageIOService::ensure_dir(&failed).unwrap();

        let copied = ImageIOService::copy_to_dir(&FileEntry::new(&src), &failed).unwrap();
        assert_eq!(copied, failed.join("a.png"));
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&copied).unwrap());
    }

    #[test]
    fn test_scan_directory_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["c.png", "a.png", "b.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();
        std::fs::write(dir.path().join("sub.png").join("inner.png"), b"x").unwrap();

        let entries = ImageIOService::scan_directory(dir.path(), None).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.jpg", "c.png"]);

        let entries = ImageIOService::scan_directory(dir.path(), Some("*.png")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_scan_directory_errors() {
        let dir = tempdir().unwrap();
        assert!(ImageIOService::scan_directory(dir.path().join("missing"), None).is_err());
        assert!(ImageIOService::scan_directory(dir.path(), Some("[bad")).is_err());
        assert!(ImageIOService::scan_directory(dir.path(), None)
            .unwrap()
            .is_empty());
    }
}
