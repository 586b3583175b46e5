// lib.rs — 地球仪圆柱投影：投影核心、姿态适配、配置与 CPU 渲染

pub mod config;
pub mod error;
pub mod interaction;
pub mod map;
pub mod projection;
pub mod raster;

pub use config::{LaunchOptions, SessionConfig};
pub use error::{ConfigError, MapError, PoseError};
pub use interaction::{DragMode, DragState, InteractionAdapter, Viewport};
pub use map::EquirectMap;
pub use projection::{
    project, CylinderGeometry, CylinderUv, Orientation, ParameterSet, SpherePose,
    TextureCoordinate,
};
pub use raster::ProjectedTexture;
