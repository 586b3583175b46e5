use approx::assert_abs_diff_eq;
use glam::{Quat, Vec3};
use globe_projection::{
    project, CylinderUv, InteractionAdapter, Orientation, SessionConfig, Viewport,
};
use std::f32::consts::FRAC_PI_2;

#[test]
fn config_orientation_forms_give_the_same_parameters() {
    let as_axis = SessionConfig {
        sphere_orientation: Orientation::AxisAngle {
            axis: [1.0, 0.0, 0.0],
            angle_deg: 90.0,
        },
        ..SessionConfig::default()
    };
    let as_quat = SessionConfig {
        sphere_orientation: Orientation::from_quat(Quat::from_rotation_x(FRAC_PI_2)),
        ..SessionConfig::default()
    };

    let a = InteractionAdapter::new(&as_axis).unwrap().on_pose_changed();
    let b = InteractionAdapter::new(&as_quat).unwrap().on_pose_changed();
    assert!(a.to_sphere_local().abs_diff_eq(b.to_sphere_local(), 1e-6));
}

#[test]
fn invalid_geometry_is_refused_at_startup() {
    let config = SessionConfig {
        cylinder_height: 0.0,
        ..SessionConfig::default()
    };
    assert!(InteractionAdapter::new(&config).is_err());
}

#[test]
fn translating_the_sphere_moves_the_projection() {
    let mut adapter = InteractionAdapter::new(&SessionConfig::default()).unwrap();
    let uv = CylinderUv::new(0.0, 0.5);
    let before = project(uv, &adapter.on_pose_changed()).unwrap();

    adapter.translate(Vec3::new(0.0, 0.5, 0.0)).unwrap();
    let after = project(uv, &adapter.on_pose_changed()).unwrap();
    // the sphere moved up, so the equator texel now sees the southern hemisphere
    assert!(after.t < before.t);
}

#[test]
fn horizontal_drag_spins_about_the_cylinder_axis() {
    let mut adapter = InteractionAdapter::new(&SessionConfig::default()).unwrap();
    let viewport = Viewport::new(1000.0, 500.0);
    adapter.drag_rotate(250.0, 0.0, viewport).unwrap();

    let q = adapter.pose().orientation;
    let axis_image = q * Vec3::Y;
    assert!(axis_image.abs_diff_eq(Vec3::Y, 1e-5));
    let (_, angle) = q.to_axis_angle();
    assert_abs_diff_eq!(angle, FRAC_PI_2, epsilon = 1e-5);
}

#[test]
fn snapshot_is_independent_of_later_moves() {
    let mut adapter = InteractionAdapter::new(&SessionConfig::default()).unwrap();
    let snapshot = adapter.on_pose_changed();
    adapter.translate(Vec3::X).unwrap();
    assert_eq!(snapshot.sphere_center(), Vec3::ZERO);
    assert_eq!(adapter.on_pose_changed().sphere_center(), Vec3::X);
}
