use glam::{Mat4, UVec2, Vec3};

/// Perspective look-at camera, as understood by the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraParams {
    pub origin: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_degrees: f32,
}

impl CameraParams {
    /// Recovers world-space camera placement from the inverse view and
    /// inverse projection matrices; `projection` provides the field of view
    /// through its `[1][1]` term.
    pub fn from_inverse_matrices(
        inv_view: &Mat4,
        inv_projection: &Mat4,
        projection: &Mat4,
    ) -> Self {
        let fov_degrees =
            ((1.0 / projection.y_axis.y).atan() * 2.0).to_degrees();

        let direction = inv_projection.project_point3(-Vec3::Z);

        let direction = inv_view
            .transform_vector3(direction)
            .normalize_or_zero();

        let up = inv_view.transform_vector3(Vec3::Y).normalize_or_zero();
        let origin = inv_view.transform_point3(Vec3::ZERO);

        Self {
            origin,
            target: origin + direction,
            up,
            fov_degrees,
        }
    }

    pub fn direction(&self) -> Vec3 {
        (self.target - self.origin).normalize_or_zero()
    }

    pub fn describe(&self) -> String {
        format!(
            "origin={}, target={}, up={}, fov={}",
            self.origin, self.target, self.up, self.fov_degrees
        )
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self {
            origin: Vec3::new(1.0, 6.0, 3.0),
            target: Vec3::new(0.0, 0.0, 0.5),
            up: Vec3::Z,
            fov_degrees: 60.0,
        }
    }
}

/// Everything the coordinator gets told about the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassState {
    pub viewport: UVec2,
    pub view: Mat4,
    pub projection: Mat4,
}

impl PassState {
    pub fn new(viewport: UVec2, view: Mat4, projection: Mat4) -> Self {
        Self {
            viewport,
            view,
            projection,
        }
    }

    /// Returns the camera matrices the way they are compared between
    /// frames: `(inverse view, inverse projection)`.
    pub fn inverse_matrices(&self) -> (Mat4, Mat4) {
        (self.view.inverse(), self.projection.inverse())
    }

    pub fn camera(&self) -> CameraParams {
        let (inv_view, inv_projection) = self.inverse_matrices();

        CameraParams::from_inverse_matrices(
            &inv_view,
            &inv_projection,
            &self.projection,
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn look_at() {
        let view = Mat4::look_at_rh(
            Vec3::new(0.0, 1.0, 5.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::Y,
        );

        let projection =
            Mat4::perspective_rh(45f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);

        let camera =
            PassState::new(UVec2::new(1600, 900), view, projection).camera();

        assert_relative_eq!(
            Vec3::new(0.0, 1.0, 5.0),
            camera.origin,
            epsilon = 1e-5
        );

        assert_relative_eq!(Vec3::Y, camera.up, epsilon = 1e-5);
        assert_relative_eq!(-Vec3::Z, camera.direction(), epsilon = 1e-5);

        assert_relative_eq!(
            Vec3::new(0.0, 1.0, 4.0),
            camera.target,
            epsilon = 1e-5
        );

        assert_relative_eq!(45.0, camera.fov_degrees, epsilon = 1e-3);
    }

    #[test]
    fn describe() {
        let camera = CameraParams::default();

        assert_eq!(
            "origin=[1, 6, 3], target=[0, 0, 0.5], up=[0, 0, 1], fov=60",
            camera.describe()
        );
    }
}
