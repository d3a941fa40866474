//! Orthographic camera integration tests.

use canopy::OrthographicCamera;
use glam::{Mat4, Vec3, Vec4};
use rstest::rstest;

fn camera_transform(camera: &OrthographicCamera) -> Mat4 {
    Mat4::from_translation(camera.position())
        * Mat4::from_rotation_z(camera.rotation().to_radians())
}

fn assert_consistent(camera: &OrthographicCamera) {
    let expected = camera.projection_matrix() * camera_transform(camera).inverse();
    assert!(
        camera.view_projection_matrix().abs_diff_eq(expected, 1e-5),
        "view-projection out of date: {:?} vs {:?}",
        camera.view_projection_matrix(),
        expected
    );
}

#[rstest]
#[case::widescreen(-1.6, 1.6, -0.9, 0.9)]
#[case::square(-1.0, 1.0, -1.0, 1.0)]
#[case::pixels(0.0, 1280.0, 0.0, 720.0)]
#[case::flipped(0.0, 800.0, 600.0, 0.0)]
fn test_view_projection_stays_consistent(
    #[case] left: f32,
    #[case] right: f32,
    #[case] bottom: f32,
    #[case] top: f32,
) {
    let mut camera = OrthographicCamera::new(left, right, bottom, top);
    assert_consistent(&camera);

    camera.set_position(Vec3::new(0.3, -0.7, 0.0));
    assert_consistent(&camera);

    camera.set_rotation(45.0);
    assert_consistent(&camera);

    camera.set_position(Vec3::new(-2.0, 5.0, 0.0));
    assert_consistent(&camera);

    camera.set_rotation(-130.0);
    assert_consistent(&camera);
}

#[test]
fn test_projection_bounds_map_to_clip_space() {
    let camera = OrthographicCamera::new(-1.6, 1.6, -0.9, 0.9);
    let vp = camera.view_projection_matrix();

    let top_right = vp * Vec4::new(1.6, 0.9, 0.0, 1.0);
    assert!(top_right.truncate().abs_diff_eq(Vec3::new(1.0, 1.0, top_right.z), 1e-5));

    let bottom_left = vp * Vec4::new(-1.6, -0.9, 0.0, 1.0);
    assert!((bottom_left.x + 1.0).abs() < 1e-5);
    assert!((bottom_left.y + 1.0).abs() < 1e-5);
}

#[test]
fn test_moving_right_shifts_geometry_left() {
    let still = OrthographicCamera::new(-1.6, 1.6, -0.9, 0.9);
    let mut moved = still.clone();
    moved.set_position(Vec3::new(1.0, 0.0, 0.0));

    for point in [
        Vec4::new(0.0, 0.0, 0.0, 1.0),
        Vec4::new(0.5, 0.25, 0.0, 1.0),
        Vec4::new(-1.2, 0.8, 0.0, 1.0),
    ] {
        // The moved camera sees the point where the still one sees it shifted by (-1, 0, 0)
        let shifted = point - Vec4::new(1.0, 0.0, 0.0, 0.0);
        let expected = still.view_projection_matrix() * shifted;
        let actual = moved.view_projection_matrix() * point;
        assert!(actual.abs_diff_eq(expected, 1e-5), "{actual:?} != {expected:?}");
    }

    let origin = moved.view_projection_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.x - (-1.0 / 1.6)).abs() < 1e-5);
    assert!(origin.y.abs() < 1e-5);
}

#[test]
fn test_getters_reflect_last_setter() {
    let mut camera = OrthographicCamera::new(-1.0, 1.0, -1.0, 1.0);
    camera.set_rotation(30.0);
    camera.set_position(Vec3::new(1.0, 2.0, 0.0));
    camera.set_rotation(60.0);

    assert_eq!(camera.rotation(), 60.0);
    assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 0.0));
    assert!(camera
        .view_matrix()
        .abs_diff_eq(camera_transform(&camera).inverse(), 1e-6));
}
