// projection.rs — 圆柱面 → 球面 → 等距圆柱贴图坐标 的投影核心
//
// Every texel of the cylinder texture is handled independently: build the point on the
// cylinder wall, cast a ray from the projection origin through it, hit the unit sphere,
// undo the sphere's rotation and read off longitude/latitude.

use crate::error::{ConfigError, PoseError};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Cylinder wrapped around the globe, coaxial with the local Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderGeometry {
    radius: f32,
    height: f32,
}

impl CylinderGeometry {
    pub fn new(radius: f32, height: f32) -> Result<Self, ConfigError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::InvalidRadius(radius));
        }
        if !(height.is_finite() && height > 0.0) {
            return Err(ConfigError::InvalidHeight(height));
        }
        Ok(Self { radius, height })
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Point on the cylinder wall in the cylinder-local frame.
    ///
    /// `u` winds clockwise seen from +Y (θ = -2πu) so the unwrapped map is not mirrored;
    /// `v = 0` is the bottom rim and `v = 1` the top rim.
    pub fn surface_point(&self, uv: CylinderUv) -> Vec3 {
        let theta = -TAU * uv.u;
        Vec3::new(
            theta.sin() * self.radius,
            uv.v * self.height - self.height / 2.0,
            -theta.cos() * self.radius,
        )
    }
}

/// Position on the unwrapped cylinder texture, `u ∈ [0,1)` around, `v ∈ [0,1]` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderUv {
    pub u: f32,
    pub v: f32,
}

impl CylinderUv {
    pub fn new(u: f32, v: f32) -> Self {
        Self { u, v }
    }
}

/// Sample coordinate into the equirectangular source map.
///
/// `s ∈ [0,1)` follows longitude, `t ∈ [0,1]` follows latitude with `t = 1` at the north pole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCoordinate {
    pub s: f32,
    pub t: f32,
}

/// Orientation as delivered by the manipulation side or written in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orientation {
    Quaternion { xyzw: [f32; 4] },
    AxisAngle { axis: [f32; 3], angle_deg: f32 },
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Quaternion {
            xyzw: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl Orientation {
    /// Unit quaternion for this orientation. Both representations land on the same rotation.
    pub fn to_quat(&self) -> Result<Quat, PoseError> {
        match *self {
            Orientation::Quaternion { xyzw } => unit_quat(Quat::from_array(xyzw)),
            Orientation::AxisAngle { axis, angle_deg } => {
                let axis = Vec3::from_array(axis)
                    .try_normalize()
                    .ok_or(PoseError::DegenerateAxis)?;
                if !angle_deg.is_finite() {
                    return Err(PoseError::NonFiniteAngle);
                }
                Ok(Quat::from_axis_angle(axis, angle_deg.to_radians()))
            }
        }
    }

    pub fn from_quat(q: Quat) -> Self {
        Orientation::Quaternion { xyzw: q.to_array() }
    }
}

/// Rescale `q` to unit length, rejecting zero and non-finite input.
pub(crate) fn unit_quat(q: Quat) -> Result<Quat, PoseError> {
    let len = q.length();
    if !len.is_finite() || len <= f32::EPSILON {
        return Err(PoseError::DegenerateQuaternion);
    }
    Ok(q.normalize())
}

/// Position and orientation of the unit sphere in the cylinder-local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpherePose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for SpherePose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl SpherePose {
    pub fn new(position: Vec3, orientation: Quat) -> Result<Self, PoseError> {
        if !position.is_finite() {
            return Err(PoseError::NonFinitePosition);
        }
        Ok(Self {
            position,
            orientation: unit_quat(orientation)?,
        })
    }

    pub fn from_axis_angle(position: Vec3, axis: Vec3, angle: f32) -> Result<Self, PoseError> {
        let axis = axis.try_normalize().ok_or(PoseError::DegenerateAxis)?;
        if !angle.is_finite() {
            return Err(PoseError::NonFiniteAngle);
        }
        Self::new(position, Quat::from_axis_angle(axis, angle))
    }
}

/// Read-only snapshot handed to the kernel. Replaced wholesale on every pose change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSet {
    geometry: CylinderGeometry,
    projection_origin: Vec3,
    sphere_center: Vec3,
    to_sphere_local: Quat,
}

impl ParameterSet {
    pub fn new(geometry: CylinderGeometry, projection_origin: Vec3, pose: &SpherePose) -> Self {
        Self {
            geometry,
            projection_origin,
            sphere_center: pose.position,
            // 球体自身的旋转取逆，把交点转回贴图对齐的未旋转坐标系
            to_sphere_local: pose.orientation.normalize().inverse(),
        }
    }

    pub fn geometry(&self) -> CylinderGeometry {
        self.geometry
    }

    pub fn projection_origin(&self) -> Vec3 {
        self.projection_origin
    }

    pub fn sphere_center(&self) -> Vec3 {
        self.sphere_center
    }

    /// Rotation taking a sphere-relative direction into the sphere's unrotated frame.
    pub fn to_sphere_local(&self) -> Quat {
        self.to_sphere_local
    }
}

/// Source-map coordinate seen through cylinder texel `uv`, or `None` when the ray
/// misses the sphere, only meets it behind the projection origin, or is undefined.
///
/// `src/shader_projection.wgsl` (`fs_main`) runs the same math on the GPU; keep both in step.
pub fn project(uv: CylinderUv, params: &ParameterSet) -> Option<TextureCoordinate> {
    let point = params.geometry.surface_point(uv);
    let hit = forward_hit(params.projection_origin, point, params.sphere_center)?;
    Some(equirectangular(params.to_sphere_local * hit))
}

/// Intersection of the ray `origin → target` with the unit sphere at `center`,
/// returned relative to `center`.
///
/// Always takes the farther root `t_c + sqrt(1 - d²)`. With the origin inside the sphere
/// that is the only root in front of it.
pub fn forward_hit(origin: Vec3, target: Vec3, center: Vec3) -> Option<Vec3> {
    let direction = (target - origin).try_normalize()?;

    let to_center = center - origin;
    let tc = to_center.dot(direction);
    let d_squared = to_center.length_squared() - tc * tc;
    if d_squared > 1.0 {
        return None;
    }

    let distance = tc + (1.0 - d_squared).sqrt();
    // also rejects NaN
    if !(distance > 0.0) {
        return None;
    }

    Some((origin - center) + distance * direction)
}

/// Longitude/latitude of a point on the unrotated unit sphere, scaled to texture space.
pub fn equirectangular(local: Vec3) -> TextureCoordinate {
    let longitude = if local.x == 0.0 {
        if local.z < 0.0 {
            -FRAC_PI_2
        } else {
            FRAC_PI_2
        }
    } else {
        let raw = (local.z / local.x).atan();
        if local.x < 0.0 {
            raw - PI
        } else {
            raw
        }
    };
    let latitude = local.y.clamp(-1.0, 1.0).asin();

    let mut s = (longitude / TAU).rem_euclid(1.0);
    // rem_euclid rounds tiny negatives up to exactly 1.0
    if s >= 1.0 {
        s = 0.0;
    }
    let t = (latitude / PI + 0.5).clamp(0.0, 1.0);

    TextureCoordinate { s, t }
}
