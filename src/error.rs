// error.rs — error types for configuration, pose input and map I/O

use std::path::PathBuf;
use thiserror::Error;

/// Failures while resolving or validating the session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cylinder radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("cylinder height must be positive and finite, got {0}")]
    InvalidHeight(f32),
    #[error("projection origin must be finite")]
    NonFiniteOrigin,
    #[error("texture size must be non-zero")]
    InvalidTextureSize,
    #[error("missing value for argument {0}")]
    MissingArgument(String),
    #[error("invalid value {value:?} for argument {arg}")]
    InvalidArgument { arg: String, value: String },
    #[error(transparent)]
    Pose(#[from] PoseError),
}

/// A pose reported by the manipulation side that cannot be turned into a unit rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoseError {
    #[error("orientation quaternion has zero or non-finite length")]
    DegenerateQuaternion,
    #[error("rotation axis has zero or non-finite length")]
    DegenerateAxis,
    #[error("rotation angle is not finite")]
    NonFiniteAngle,
    #[error("sphere position is not finite")]
    NonFinitePosition,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to open map {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode map {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("map image has no pixels")]
    Empty,
    #[error("failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
