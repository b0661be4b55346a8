//! Photo capture; frames are encoded to PNG in memory and kept in an
//! ordered gallery until deleted or written out.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::info;

use crate::foundation::core::FrameRgba;
use crate::foundation::error::{BoothError, BoothResult};

#[derive(Debug, Clone)]
pub struct Photo {
    /// Monotonic capture index, unique for the gallery's lifetime.
    pub index: u64,
    pub filename: String,
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
}

/// Ordered sequence of captured photos. Growth is unbounded; the caller
/// decides when to delete or flush.
#[derive(Debug, Default)]
pub struct PhotoGallery {
    photos: Vec<Photo>,
    next_index: u64,
}

impl PhotoGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `frame` to PNG and append it. `timestamp_ms` is wall-clock
    /// milliseconds used only for the filename.
    pub fn capture(&mut self, frame: &FrameRgba, timestamp_ms: u64) -> BoothResult<&Photo> {
        let png = encode_png(frame)?;
        let index = self.next_index;
        self.next_index += 1;
        let filename = format!("webcam-effect-{timestamp_ms}-{index}.png");
        info!(%filename, bytes = png.len(), "captured photo");
        self.photos.push(Photo {
            index,
            filename,
            png,
        });
        self.photos
            .last()
            .ok_or_else(|| BoothError::capture("gallery dropped the captured frame"))
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Remove the photo with the given capture index. Returns false if no
    /// such photo exists.
    pub fn remove(&mut self, index: u64) -> bool {
        let before = self.photos.len();
        self.photos.retain(|p| p.index != index);
        self.photos.len() != before
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Write every photo into `dir`, creating it if needed. Returns the
    /// paths written.
    pub fn save_all(&self, dir: &Path) -> BoothResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create photo directory '{}'", dir.display()))?;
        let mut written = Vec::with_capacity(self.photos.len());
        for photo in &self.photos {
            let path = dir.join(&photo.filename);
            std::fs::write(&path, &photo.png)
                .with_context(|| format!("failed to write photo '{}'", path.display()))?;
            written.push(path);
        }
        Ok(written)
    }
}

fn encode_png(frame: &FrameRgba) -> BoothResult<Vec<u8>> {
    let img: image::RgbaImage =
        image::ImageBuffer::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
            || BoothError::capture("frame buffer length does not match its dimensions"),
        )?;
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| BoothError::capture(format!("png encode failed: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Canvas, Rgba8};

    fn test_frame() -> FrameRgba {
        FrameRgba::filled(Canvas::new(16, 12).unwrap(), Rgba8::rgb(50, 100, 150))
    }

    #[test]
    fn capture_appends_and_counts() {
        let mut gallery = PhotoGallery::new();
        gallery.capture(&test_frame(), 1000).unwrap();
        gallery.capture(&test_frame(), 2000).unwrap();
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn filenames_follow_the_pattern() {
        let mut gallery = PhotoGallery::new();
        let photo = gallery.capture(&test_frame(), 1234).unwrap();
        assert_eq!(photo.filename, "webcam-effect-1234-0.png");
        let photo = gallery.capture(&test_frame(), 5678).unwrap();
        assert_eq!(photo.filename, "webcam-effect-5678-1.png");
    }

    #[test]
    fn encoded_payload_is_png() {
        let mut gallery = PhotoGallery::new();
        let photo = gallery.capture(&test_frame(), 0).unwrap();
        assert_eq!(&photo.png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn png_roundtrips_pixel_data() {
        let mut gallery = PhotoGallery::new();
        let photo = gallery.capture(&test_frame(), 0).unwrap();
        let decoded = image::load_from_memory(&photo.png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 12));
        assert_eq!(decoded.get_pixel(3, 3).0, [50, 100, 150, 255]);
    }

    #[test]
    fn remove_targets_the_capture_index() {
        let mut gallery = PhotoGallery::new();
        gallery.capture(&test_frame(), 0).unwrap();
        gallery.capture(&test_frame(), 1).unwrap();
        gallery.capture(&test_frame(), 2).unwrap();
        assert!(gallery.remove(1));
        assert!(!gallery.remove(1));
        assert_eq!(gallery.len(), 2);
        // Indices are stable across removal, not renumbered.
        assert!(gallery.photos().iter().all(|p| p.index != 1));
        gallery.capture(&test_frame(), 3).unwrap();
        assert_eq!(gallery.photos().last().unwrap().index, 3);
    }

    #[test]
    fn clear_empties_the_gallery() {
        let mut gallery = PhotoGallery::new();
        gallery.capture(&test_frame(), 0).unwrap();
        gallery.clear();
        assert!(gallery.is_empty());
    }

    #[test]
    fn save_all_writes_every_photo() {
        let dir = std::env::temp_dir().join(format!("mirrorbooth-photos-{}", std::process::id()));
        let mut gallery = PhotoGallery::new();
        gallery.capture(&test_frame(), 10).unwrap();
        gallery.capture(&test_frame(), 20).unwrap();
        let written = gallery.save_all(&dir).unwrap();
        assert_eq!(written.len(), 2);
        for path in &written {
            assert!(path.exists());
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
