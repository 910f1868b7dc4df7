use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbImage;
use tracing::{debug, info};

use super::error::{Result, SnakeError};
use super::figure::DisplaySurface;

/// Streams every frame to a rerun viewer on the `frame` timeline.
pub struct RerunViewer {
    rec: rerun::RecordingStream,
    frames_logged: i64,
    wait_for_user: bool,
}

impl RerunViewer {
    /// Start a native viewer process and stream to it.
    pub fn spawn(app_id: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_id)
            .spawn()
            .map_err(SnakeError::Viewer)?;
        info!(app_id, "rerun viewer spawned");
        Ok(Self::from_stream(rec, true))
    }

    /// Stream to an existing recording. With `wait_for_user` set, `block`
    /// holds the process until the user confirms on stdin.
    pub fn from_stream(rec: rerun::RecordingStream, wait_for_user: bool) -> Self {
        Self {
            rec,
            frames_logged: 0,
            wait_for_user,
        }
    }

    pub fn frames_logged(&self) -> i64 {
        self.frames_logged
    }
}

impl DisplaySurface for RerunViewer {
    fn draw(&mut self, frame: &RgbImage) -> Result<()> {
        self.rec.set_time_sequence("frame", self.frames_logged);
        let image = rerun::Image::from_rgb24(frame.as_raw().clone(), [frame.width(), frame.height()]);
        self.rec.log("figure", &image).map_err(SnakeError::Viewer)?;
        self.frames_logged += 1;
        Ok(())
    }

    fn block(&mut self) -> Result<()> {
        let _ = self.rec.flush_blocking();
        if !self.wait_for_user {
            return Ok(());
        }

        info!(frames = self.frames_logged, "all frames sent; press Enter once you are done with the viewer");
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(SnakeError::Wait)?;
        Ok(())
    }
}

/// Keeps a single PNG on disk up to date with the latest frame.
///
/// Image viewers that watch the file refresh as the contour evolves.
pub struct PreviewFile {
    path: PathBuf,
}

impl PreviewFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DisplaySurface for PreviewFile {
    fn draw(&mut self, frame: &RgbImage) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SnakeError::Display(e.into()))?;
            }
        }
        frame.save(&self.path).map_err(SnakeError::Display)?;
        debug!(path = %self.path.display(), "preview updated");
        Ok(())
    }

    fn block(&mut self) -> Result<()> {
        info!(path = %self.path.display(), "final frame written");
        Ok(())
    }
}

/// Collects every presented frame in memory.
#[derive(Default)]
pub struct FrameRecorder {
    frames: Vec<RgbImage>,
    pauses: usize,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn last(&self) -> Option<&RgbImage> {
        self.frames.last()
    }

    pub fn pauses(&self) -> usize {
        self.pauses
    }
}

impl DisplaySurface for FrameRecorder {
    fn draw(&mut self, frame: &RgbImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn pause(&mut self, _interval: Duration) {
        self.pauses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn viewer_logs_one_entry_per_frame() {
        let (rec, storage) = rerun::RecordingStreamBuilder::new("nodule_contour_test")
            .memory()
            .unwrap();
        let mut viewer = RerunViewer::from_stream(rec, false);

        let frame = RgbImage::from_pixel(4, 2, Rgb([10, 20, 30]));
        viewer.draw(&frame).unwrap();
        viewer.draw(&frame).unwrap();
        viewer.block().unwrap();

        assert_eq!(viewer.frames_logged(), 2);
        assert!(!storage.take().is_empty());
    }

    #[test]
    fn preview_file_is_overwritten() {
        let dir = std::env::temp_dir().join(format!("nodule_contour_preview_{}", std::process::id()));
        let mut preview = PreviewFile::new(dir.join("nested").join("frame.png"));

        preview.draw(&RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]))).unwrap();
        preview.draw(&RgbImage::from_pixel(3, 1, Rgb([255, 0, 0]))).unwrap();

        let saved = image::open(preview.path()).unwrap().to_rgb8();
        assert_eq!(saved.dimensions(), (3, 1));
        fs::remove_dir_all(&dir).ok();
    }
}
