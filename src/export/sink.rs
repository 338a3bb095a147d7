//! Destinations for exported images
//!
//! A sink receives each captured image with its final file name, in part
//! order. Images already handed to a sink are never taken back, even if a
//! later slice fails.

use std::path::{Path, PathBuf};

use crate::error::FileResult;
use crate::file_handler::io;

/// Encoded image produced by the rasterizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Encoded bytes (PNG unless the rasterizer says otherwise)
    pub data: Vec<u8>,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

/// Receives exported images
#[allow(async_fn_in_trait)]
pub trait ImageSink {
    async fn emit(&mut self, file_name: &str, image: &RasterImage) -> FileResult<()>;
}

/// Writes each image into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in emit order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ImageSink for DirectorySink {
    async fn emit(&mut self, file_name: &str, image: &RasterImage) -> FileResult<()> {
        io::ensure_dir(&self.dir).await?;
        let path = self.dir.join(file_name);
        io::write_file_atomic(&path, &image.data).await?;
        log::debug!("Wrote {} ({} bytes)", path.display(), image.data.len());
        self.written.push(path);
        Ok(())
    }
}

/// Keeps images in memory, for previews and tests
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub images: Vec<(String, RasterImage)>,
}

impl ImageSink for MemorySink {
    async fn emit(&mut self, file_name: &str, image: &RasterImage) -> FileResult<()> {
        self.images.push((file_name.to_string(), image.clone()));
        Ok(())
    }
}
