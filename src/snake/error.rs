use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, segmenting or displaying an image.
#[derive(Debug, Error)]
pub enum SnakeError {
    /// The image file could not be opened or decoded.
    #[error("failed to load image {}", .path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A channel index past the end of the pixel layout was requested.
    #[error("channel {requested} requested but the image has {found} channel(s)")]
    MissingChannel { requested: usize, found: usize },

    /// A level-set does not match the shape of the image it is drawn over.
    #[error("dimension mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The display surface failed to present a frame.
    #[error("failed to present frame")]
    Display(#[source] image::ImageError),

    /// The rerun viewer could not be started or fed.
    #[error("viewer failed")]
    Viewer(#[source] rerun::RecordingStreamError),

    #[error("waiting on the viewer failed")]
    Wait(#[source] std::io::Error),

    /// Opaque failure reported by a segmentation backend.
    #[error("segmentation backend failed: {0}")]
    Backend(String),
}

impl SnakeError {
    /// Build a `ShapeMismatch` unless the two shapes agree.
    pub fn check_shape(expected: (usize, usize), found: (usize, usize)) -> Result<()> {
        if expected != found {
            return Err(SnakeError::ShapeMismatch { expected, found });
        }
        Ok(())
    }
}

pub type Result<T> = std::result::Result<T, SnakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_shapes_pass() {
        assert!(SnakeError::check_shape((3, 4), (3, 4)).is_ok());
    }

    #[test]
    fn differing_shapes_report_both() {
        let err = SnakeError::check_shape((3, 4), (4, 4)).unwrap_err();
        assert!(matches!(
            err,
            SnakeError::ShapeMismatch {
                expected: (3, 4),
                found: (4, 4)
            }
        ));
        assert_eq!(err.to_string(), "dimension mismatch: expected (3, 4), found (4, 4)");
    }
}
