// interaction.rs — 球体姿态的唯一持有者，拖拽后重新生成投影参数

use crate::config::SessionConfig;
use crate::error::{ConfigError, PoseError};
use crate::projection::{unit_quat, CylinderGeometry, ParameterSet, SpherePose};
use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};

/// Owns the live sphere pose plus the fixed session constants.
///
/// The manipulation side reports moves through the setters; the renderer pulls a fresh
/// [`ParameterSet`] with [`InteractionAdapter::on_pose_changed`] and refreshes the whole texture.
#[derive(Debug, Clone)]
pub struct InteractionAdapter {
    geometry: CylinderGeometry,
    projection_origin: Vec3,
    pose: SpherePose,
    initial_pose: SpherePose,
    pub sensitivity_scale: f32,
}

impl InteractionAdapter {
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(
            config.geometry()?,
            config.projection_origin(),
            config.initial_pose()?,
        ))
    }

    pub fn from_parts(
        geometry: CylinderGeometry,
        projection_origin: Vec3,
        initial_pose: SpherePose,
    ) -> Self {
        Self {
            geometry,
            projection_origin,
            pose: initial_pose,
            initial_pose,
            sensitivity_scale: 1.0,
        }
    }

    pub fn geometry(&self) -> CylinderGeometry {
        self.geometry
    }

    pub fn pose(&self) -> SpherePose {
        self.pose
    }

    /// Snapshot of the current pose for the kernel. No side effects, safe to call every tick.
    pub fn on_pose_changed(&self) -> ParameterSet {
        ParameterSet::new(self.geometry, self.projection_origin, &self.pose)
    }

    /// Absolute pose as reported by a gizmo.
    pub fn set_pose(&mut self, position: Vec3, orientation: Quat) -> Result<(), PoseError> {
        self.pose = SpherePose::new(position, orientation)?;
        Ok(())
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), PoseError> {
        if !position.is_finite() {
            return Err(PoseError::NonFinitePosition);
        }
        self.pose.position = position;
        Ok(())
    }

    pub fn translate(&mut self, delta: Vec3) -> Result<(), PoseError> {
        self.set_position(self.pose.position + delta)
    }

    /// Apply a world-space rotation on top of the current orientation.
    pub fn rotate(&mut self, rotation: Quat) -> Result<(), PoseError> {
        let rotation = unit_quat(rotation)?;
        // 增量更新后重新归一化，避免误差累积
        self.pose.orientation = unit_quat(rotation * self.pose.orientation)?;
        Ok(())
    }

    /// Pointer drag over the unwrapped view: horizontal spins the sphere about the
    /// cylinder axis, vertical tilts it about X. A full-width drag is one turn.
    pub fn drag_rotate(&mut self, dx: f32, dy: f32, viewport: Viewport) -> Result<(), PoseError> {
        if !viewport.is_valid() {
            return Ok(());
        }
        let yaw = dx / viewport.width * TAU * self.sensitivity_scale;
        let pitch = dy / viewport.height * PI * self.sensitivity_scale;
        self.rotate(Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch))
    }

    /// Pointer drag moving the sphere in the cylinder's X/Y plane. A full-height drag
    /// covers the cylinder height; a full-width drag covers its diameter.
    pub fn drag_translate(
        &mut self,
        dx: f32,
        dy: f32,
        viewport: Viewport,
    ) -> Result<(), PoseError> {
        if !viewport.is_valid() {
            return Ok(());
        }
        let delta = Vec3::new(
            dx / viewport.width * 2.0 * self.geometry.radius(),
            -dy / viewport.height * self.geometry.height(),
            0.0,
        ) * self.sensitivity_scale;
        self.translate(delta)
    }

    /// Route a pointer delta to the drag behaviour selected by `mode`.
    pub fn apply_drag(
        &mut self,
        mode: DragMode,
        dx: f32,
        dy: f32,
        viewport: Viewport,
    ) -> Result<(), PoseError> {
        match mode {
            DragMode::Rotate => self.drag_rotate(dx, dy, viewport),
            DragMode::Translate => self.drag_translate(dx, dy, viewport),
        }
    }

    pub fn reset(&mut self) {
        self.pose = self.initial_pose;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Rotate,
    Translate,
}

/// Which pointer drags are held, plus the last cursor position seen while dragging.
///
/// Rotation wins when both buttons are down. A release always ends its drag, even when
/// the UI layer has already claimed the event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragState {
    rotating: bool,
    translating: bool,
    last_cursor: Option<(f64, f64)>,
}

impl DragState {
    pub fn press(&mut self, mode: DragMode) {
        match mode {
            DragMode::Rotate => self.rotating = true,
            DragMode::Translate => self.translating = true,
        }
    }

    pub fn release(&mut self, mode: DragMode) {
        match mode {
            DragMode::Rotate => self.rotating = false,
            DragMode::Translate => self.translating = false,
        }
        if self.active().is_none() {
            self.last_cursor = None;
        }
    }

    /// Drop every drag, e.g. when the window loses focus mid-drag.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    pub fn active(&self) -> Option<DragMode> {
        if self.rotating {
            Some(DragMode::Rotate)
        } else if self.translating {
            Some(DragMode::Translate)
        } else {
            None
        }
    }

    /// Record a cursor move. Yields the delta since the previous move while a drag is held;
    /// the first move after a press only sets the anchor.
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<(DragMode, f32, f32)> {
        let mode = self.active()?;
        let delta = self
            .last_cursor
            .map(|(lx, ly)| (mode, (x - lx) as f32, (y - ly) as f32));
        self.last_cursor = Some((x, y));
        delta
    }
}

/// Pixel size of the surface the pointer is dragging over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}
