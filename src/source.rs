use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use rexif::{ExifTag, TagValue};
use sha1::Sha1;

/// Per-photo descriptive metadata shown in overlays. Every field is optional;
/// cameras and export pipelines strip tags freely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMeta {
    pub capture_time: Option<String>,
    pub camera: Option<String>,
    pub aperture: Option<String>,
    pub iso: Option<u32>,
}

impl PhotoMeta {
    pub fn is_empty(&self) -> bool {
        self.capture_time.is_none()
            && self.camera.is_none()
            && self.aperture.is_none()
            && self.iso.is_none()
    }
}

/// External collaborator supplying pixel dimensions and metadata for item
/// paths. Worker pools call this off the host thread, so implementations
/// must be shareable.
pub trait PhotoSource: Send + Sync {
    /// Natural (width, height) of the item, preferably read from a cheap
    /// representative asset rather than the full-resolution original.
    fn probe_dimensions(&self, path: &str) -> Result<(u32, u32)>;

    fn fetch_metadata(&self, path: &str) -> Result<PhotoMeta>;
}

/// Computes the sharded cache location for the given image and extension.
pub fn cache_file_path(cache_base: &Path, image_path: &Path, extension: &str) -> PathBuf {
    let path_str = image_path.to_string_lossy();
    let mut hasher = Sha1::new();
    hasher.update(path_str.as_bytes());
    let hex = hasher.digest().to_string();
    let shard = &hex[..3];
    let name = &hex[3..];
    cache_base.join(shard).join(format!("{name}.{extension}"))
}

/// Filesystem-backed source: item paths are image files under `root`, ratio
/// probes hit a sharded thumbnail cache first, metadata comes from EXIF.
pub struct FsSource {
    root: PathBuf,
    cache_base: PathBuf,
    thumb_size: u32,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>, cache_base: impl Into<PathBuf>, thumb_size: u32) -> Self {
        Self {
            root: root.into(),
            cache_base: cache_base.into(),
            thumb_size,
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Location of the cached thumbnail for `path`, whether or not it has
    /// been generated yet.
    pub fn thumb_path(&self, path: &str) -> PathBuf {
        cache_file_path(&self.cache_base, &self.full_path(path), "jpg")
    }

    /// Generates thumbnails for each image into the sharded cache.
    pub fn build_thumbnails(&self, paths: &[String]) -> Result<()> {
        let tic = Instant::now();
        paths.par_iter().try_for_each(|path| -> Result<()> {
            let full = self.full_path(path);
            let thumb = self.thumb_path(path);
            if thumb.exists() {
                return Ok(());
            }
            if let Some(parent) = thumb.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating thumbnail shard for {path}"))?;
            }
            let img = image::open(&full).with_context(|| format!("decoding {path}"))?;
            let small = img.thumbnail(self.thumb_size, self.thumb_size);
            small
                .to_rgb8()
                .save(&thumb)
                .with_context(|| format!("saving thumbnail for {path}"))?;
            Ok(())
        })?;
        log::info!(
            "built thumbnails for {} images in {} ms",
            paths.len(),
            tic.elapsed().as_millis()
        );
        Ok(())
    }
}

impl PhotoSource for FsSource {
    fn probe_dimensions(&self, path: &str) -> Result<(u32, u32)> {
        let thumb = self.thumb_path(path);
        if thumb.exists() {
            if let Ok(dims) = image::image_dimensions(&thumb) {
                return Ok(dims);
            }
        }
        image::image_dimensions(self.full_path(path))
            .with_context(|| format!("probing dimensions of {path}"))
    }

    fn fetch_metadata(&self, path: &str) -> Result<PhotoMeta> {
        let full = self.full_path(path);
        let exif = rexif::parse_file(&full)
            .map_err(|err| anyhow!("reading exif from {path}: {err}"))?;
        let mut meta = PhotoMeta::default();
        for entry in &exif.entries {
            match entry.tag {
                ExifTag::DateTimeOriginal => {
                    meta.capture_time = Some(entry.value_more_readable.to_string());
                }
                ExifTag::Model => {
                    meta.camera = Some(entry.value_more_readable.trim().to_string());
                }
                ExifTag::FNumber => {
                    meta.aperture = Some(entry.value_more_readable.to_string());
                }
                ExifTag::ISOSpeedRatings => {
                    meta.iso = match &entry.value {
                        TagValue::U16(v) => v.first().map(|&n| n as u32),
                        TagValue::U32(v) => v.first().copied(),
                        _ => None,
                    };
                }
                _ => {}
            }
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_paths_are_sharded_and_stable() {
        let base = Path::new("/tmp/cache");
        let a = cache_file_path(base, Path::new("/photos/x.jpg"), "jpg");
        let b = cache_file_path(base, Path::new("/photos/x.jpg"), "jpg");
        assert_eq!(a, b);
        let shard = a
            .parent()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert_eq!(shard.len(), 3);
        assert!(a.starts_with(base));
        assert!(a.to_string_lossy().ends_with(".jpg"));
    }

    #[test]
    fn distinct_paths_hash_apart() {
        let base = Path::new("/tmp/cache");
        let a = cache_file_path(base, Path::new("/photos/x.jpg"), "jpg");
        let b = cache_file_path(base, Path::new("/photos/y.jpg"), "jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn relative_paths_resolve_under_root() {
        let source = FsSource::new("/library", "/tmp/cache", 512);
        assert_eq!(source.full_path("a/b.jpg"), PathBuf::from("/library/a/b.jpg"));
        assert_eq!(source.full_path("/abs/c.jpg"), PathBuf::from("/abs/c.jpg"));
    }

    #[test]
    fn empty_meta_reports_empty() {
        assert!(PhotoMeta::default().is_empty());
        let meta = PhotoMeta {
            iso: Some(100),
            ..Default::default()
        };
        assert!(!meta.is_empty());
    }
}
