//! Watch a morphological active contour segment an image.
//!
//! A [`SegmentationBackend`] evolves the level-set and hands each iteration to
//! an [`IterationVisualizer`], which redraws the contour over the source image
//! next to a heatmap of the raw level-set.

pub mod snake;

pub use crate::snake::backend::{GacParams, IterationSink, SegmentationBackend, Threshold};
pub use crate::snake::display::{FrameRecorder, PreviewFile, RerunViewer};
pub use crate::snake::error::SnakeError;
pub use crate::snake::example::{NoduleExample, Preprocess};
pub use crate::snake::figure::{DisplaySurface, Figure, FigureLayout};
pub use crate::snake::grayscale::{load_channel, load_grayscale, rgb_to_gray};
pub use crate::snake::isocontour::{find_isocontour, ContourSet};
pub use crate::snake::morphsnakes::MorphSnakes;
pub use crate::snake::visualizer::{IterationVisualizer, VisualizerState};
