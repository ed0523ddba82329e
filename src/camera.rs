use bon::bon;

use crate::{
    geometry::{FloatType, Matrix, WorldPoint, WorldVector},
    input::InputState,
};

/// Largest pitch, in degrees, the camera can look up or down.
/// Keeps the view direction away from the world up vector.
pub const MAX_PHI_DEGREES: FloatType = 89.0;

/// World units per second moved while a movement key is held.
const MOVEMENT_SPEED: FloatType = 10.0;

/// Pinhole camera oriented by yaw (`theta`) and pitch (`phi`).
///
/// At `theta = phi = 0` the camera looks down the negative Z axis with Y up.
/// Angles are passed in and returned in degrees.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: WorldPoint,

    /// Radians
    theta: FloatType,
    /// Radians, always within +-MAX_PHI_DEGREES
    phi: FloatType,
    /// Vertical field of view, radians
    angle_of_view: FloatType,

    width: FloatType,
    height: FloatType,
    aspect_ratio: FloatType,

    z_near: FloatType,
    z_far: FloatType,
}

/// Camera position and orthonormal basis for generating primary rays.
#[derive(Copy, Clone, Debug)]
pub struct CameraBasis {
    pub position: WorldPoint,
    pub direction: WorldVector,
    pub right: WorldVector,
    pub up: WorldVector,
    /// Tangent of half of the vertical field of view
    pub tan_half_fov: FloatType,
    pub aspect_ratio: FloatType,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        #[builder(default = WorldPoint::origin())] position: WorldPoint,
        #[builder(default = 0.0)] theta: FloatType,
        #[builder(default = 0.0)] phi: FloatType,
        #[builder(default = 60.0)] angle_of_view: FloatType,
        #[builder(default = 1920.0)] width: FloatType,
        #[builder(default = 1080.0)] height: FloatType,
        #[builder(default = 0.001)] z_near: FloatType,
        #[builder(default = 100.0)] z_far: FloatType,
    ) -> Self {
        let mut camera = Camera {
            position,
            theta: 0.0,
            phi: 0.0,
            angle_of_view: 0.0,
            width,
            height,
            aspect_ratio: width / height,
            z_near,
            z_far,
        };
        camera.set_theta(theta);
        camera.set_phi(phi);
        camera.set_angle_of_view(angle_of_view);
        camera
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera::builder().build()
    }
}

impl Camera {
    pub fn set_position(&mut self, position: WorldPoint) {
        self.position = position;
    }

    pub fn set_theta(&mut self, degrees: FloatType) {
        self.theta = degrees.to_radians();
    }

    /// Values outside of +-MAX_PHI_DEGREES are clamped.
    pub fn set_phi(&mut self, degrees: FloatType) {
        self.phi = degrees.clamp(-MAX_PHI_DEGREES, MAX_PHI_DEGREES).to_radians();
    }

    pub fn set_angle_of_view(&mut self, degrees: FloatType) {
        self.angle_of_view = degrees.to_radians();
    }

    pub fn set_width(&mut self, width: FloatType) {
        self.width = width;
        self.aspect_ratio = self.width / self.height;
    }

    pub fn set_height(&mut self, height: FloatType) {
        self.height = height;
        self.aspect_ratio = self.width / self.height;
    }

    pub fn set_z_near(&mut self, z_near: FloatType) {
        self.z_near = z_near;
    }

    pub fn set_z_far(&mut self, z_far: FloatType) {
        self.z_far = z_far;
    }

    pub fn get_position(&self) -> WorldPoint {
        self.position
    }

    pub fn get_theta(&self) -> FloatType {
        self.theta.to_degrees()
    }

    pub fn get_phi(&self) -> FloatType {
        self.phi.to_degrees()
    }

    pub fn get_angle_of_view(&self) -> FloatType {
        self.angle_of_view.to_degrees()
    }

    pub fn get_aspect_ratio(&self) -> FloatType {
        self.aspect_ratio
    }

    pub fn get_direction(&self) -> WorldVector {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        WorldVector::new(sin_theta * cos_phi, sin_phi, -cos_theta * cos_phi)
    }

    pub fn get_right(&self) -> WorldVector {
        self.get_direction().cross(&WorldVector::y()).normalize()
    }

    pub fn get_up(&self) -> WorldVector {
        self.get_right().cross(&self.get_direction()).normalize()
    }

    pub fn basis(&self) -> CameraBasis {
        CameraBasis {
            position: self.position,
            direction: self.get_direction(),
            right: self.get_right(),
            up: self.get_up(),
            tan_half_fov: (self.angle_of_view / 2.0).tan(),
            aspect_ratio: self.aspect_ratio,
        }
    }

    /// World to camera space transform, for column vectors.
    #[rustfmt::skip]
    pub fn get_view_matrix(&self) -> Matrix {
        let z_axis = -self.get_direction();
        let x_axis = WorldVector::y().cross(&z_axis).normalize();
        let y_axis = z_axis.cross(&x_axis);
        let p = self.position.coords;

        Matrix::new(
            x_axis.x, x_axis.y, x_axis.z, -x_axis.dot(&p),
            y_axis.x, y_axis.y, y_axis.z, -y_axis.dot(&p),
            z_axis.x, z_axis.y, z_axis.z, -z_axis.dot(&p),
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Right handed perspective projection, for column vectors.
    /// Maps the view frustum depth to 0 (near plane) ..= 1 (far plane).
    #[rustfmt::skip]
    pub fn get_projection_matrix(&self) -> Matrix {
        let f = 1.0 / (self.angle_of_view / 2.0).tan();
        let depth = self.z_near - self.z_far;

        Matrix::new(
            f / self.aspect_ratio, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, self.z_far / depth, self.z_near * self.z_far / depth,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    /// View matrix in the row vector layout of shader constant buffers.
    pub fn get_native_view_matrix(&self) -> [[FloatType; 4]; 4] {
        to_row_vector_layout(&self.get_view_matrix())
    }

    /// Projection matrix in the row vector layout of shader constant buffers.
    pub fn get_native_projection_matrix(&self) -> [[FloatType; 4]; 4] {
        to_row_vector_layout(&self.get_projection_matrix())
    }

    pub fn move_forward(&mut self, delta: FloatType) {
        self.position += self.get_direction() * delta;
    }

    pub fn move_backward(&mut self, delta: FloatType) {
        self.position -= self.get_direction() * delta;
    }

    pub fn move_right(&mut self, delta: FloatType) {
        self.position += self.get_right() * delta;
    }

    pub fn move_left(&mut self, delta: FloatType) {
        self.position -= self.get_right() * delta;
    }

    pub fn move_yaw(&mut self, degrees: FloatType) {
        self.set_theta(self.get_theta() + degrees);
    }

    pub fn move_pitch(&mut self, degrees: FloatType) {
        self.set_phi(self.get_phi() + degrees);
    }

    /// Moves and turns the camera according to one frame worth of input.
    pub fn apply_input(&mut self, input: &InputState, frame_seconds: FloatType) {
        let distance = MOVEMENT_SPEED * frame_seconds;
        if input.forward {
            self.move_forward(distance);
        }
        if input.backward {
            self.move_backward(distance);
        }
        if input.right {
            self.move_right(distance);
        }
        if input.left {
            self.move_left(distance);
        }
        self.move_yaw(input.mouse_delta.x);
        self.move_pitch(-input.mouse_delta.y);
    }
}

/// Row major transpose of a column vector matrix, which is what `mul(v, M)` style shaders
/// expect. Storage of nalgebra matrices is column major, so the columns are the rows.
pub fn to_row_vector_layout(matrix: &Matrix) -> [[FloatType; 4]; 4] {
    (*matrix).into()
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use nalgebra::Vector4;
    use test_case::test_case;

    fn close(a: &WorldVector, b: &WorldVector) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn default_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(close(&camera.get_direction(), &WorldVector::new(0.0, 0.0, -1.0)));
        assert!(close(&camera.get_right(), &WorldVector::new(1.0, 0.0, 0.0)));
        assert!(close(&camera.get_up(), &WorldVector::new(0.0, 1.0, 0.0)));
        assert!((camera.get_aspect_ratio() - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test_case(0.0, 0.0)]
    #[test_case(90.0, 0.0)]
    #[test_case(33.0, -20.0)]
    #[test_case(-150.0, 75.0)]
    fn basis_is_orthonormal(theta: f32, phi: f32) {
        let camera = Camera::builder().theta(theta).phi(phi).build();
        let d = camera.get_direction();
        let r = camera.get_right();
        let u = camera.get_up();
        assert!((d.norm() - 1.0).abs() < 1e-5);
        assert!((r.norm() - 1.0).abs() < 1e-5);
        assert!((u.norm() - 1.0).abs() < 1e-5);
        assert!(d.dot(&r).abs() < 1e-5);
        assert!(d.dot(&u).abs() < 1e-5);
        assert!(r.dot(&u).abs() < 1e-5);
        assert!(u.y >= 0.0);
    }

    #[test]
    fn basis_follows_setters() {
        let mut camera = Camera::default();
        let before = camera.get_direction();
        camera.set_theta(90.0);
        let after = camera.get_direction();
        assert!(!close(&before, &after));
        assert!(close(&after, &WorldVector::new(1.0, 0.0, 0.0)));
    }

    #[test_case(120.0 => 89.0)]
    #[test_case(-95.0 => -89.0)]
    #[test_case(45.0 => 45.0)]
    fn phi_is_clamped(phi: f32) -> f32 {
        let mut camera = Camera::default();
        camera.set_phi(phi);
        (camera.get_phi() * 1000.0).round() / 1000.0
    }

    #[test]
    fn aspect_ratio_tracks_size() {
        let mut camera = Camera::default();
        camera.set_width(100.0);
        camera.set_height(50.0);
        assert!(camera.get_aspect_ratio() == 2.0);
    }

    #[test]
    fn view_matrix_moves_camera_to_origin() {
        let camera = Camera::builder()
            .position(WorldPoint::new(1.0, 2.0, 3.0))
            .theta(40.0)
            .phi(10.0)
            .build();
        let view = camera.get_view_matrix();

        let eye = view * camera.get_position().to_homogeneous();
        assert!((eye - Vector4::new(0.0, 0.0, 0.0, 1.0)).norm() < 1e-5);

        let ahead = view * (camera.get_position() + camera.get_direction() * 5.0).to_homogeneous();
        assert!((ahead - Vector4::new(0.0, 0.0, -5.0, 1.0)).norm() < 1e-4);
    }

    #[test]
    fn projection_maps_near_and_far_planes() {
        let camera = Camera::builder().z_near(1.0).z_far(10.0).build();
        let projection = camera.get_projection_matrix();

        let near = projection * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-6);
        assert!((far.z / far.w - 1.0).abs() < 1e-6);

        // Top edge of the frustum at 60 degrees vertical field of view
        let y = 5.0 * (30.0f32).to_radians().tan();
        let top = projection * Vector4::new(0.0, y, -5.0, 1.0);
        assert!((top.y / top.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn native_layout_is_transposed() {
        let camera = Camera::builder().position(WorldPoint::new(1.0, 2.0, 3.0)).build();
        let native = camera.get_native_view_matrix();
        let view = camera.get_view_matrix();
        // Translation lives in the last row for row vectors
        assert!(native[3][0] == view[(0, 3)]);
        assert!(native[3][1] == view[(1, 3)]);
        assert!(native[3][2] == view[(2, 3)]);
    }

    #[test]
    fn movement() {
        let mut camera = Camera::default();
        camera.move_forward(2.0);
        assert!(close(&camera.get_position().coords, &WorldVector::new(0.0, 0.0, -2.0)));
        camera.move_right(1.0);
        camera.move_left(3.0);
        camera.move_backward(2.0);
        assert!(close(&camera.get_position().coords, &WorldVector::new(-2.0, 0.0, 0.0)));
        camera.move_yaw(30.0);
        camera.move_pitch(100.0);
        assert!((camera.get_theta() - 30.0).abs() < 1e-4);
        assert!((camera.get_phi() - MAX_PHI_DEGREES).abs() < 1e-4);
    }

    #[test]
    fn input_drives_camera() {
        let mut camera = Camera::default();
        let input = InputState {
            forward: true,
            mouse_delta: nalgebra::Vector2::new(10.0, 0.0),
            ..Default::default()
        };
        camera.apply_input(&input, 0.5);
        assert!((camera.get_position().z + 5.0).abs() < 1e-5);
        assert!((camera.get_theta() - 10.0).abs() < 1e-4);
    }
}
