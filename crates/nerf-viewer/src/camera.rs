use crate::data::types::GlobalUniformStd140;
use glam::{Mat4, Vec3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

/// Orbital camera around the scene origin, where every trained model is
/// centered.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Distance from the camera to the origin.
    pub radius: f32,
    /// Rotation around the world Y axis (radians).
    pub azimuth_rad: f32,
    /// Elevation above the XZ plane (radians).
    pub elevation_rad: f32,

    pub fov_y_deg: f32,
    pub proj: Mat4,
}

impl Camera {
    /// Build the camera from a scene's configured position. The y
    /// component is flipped to keep the initial pose consistent with the
    /// models' training convention.
    pub fn from_scene(position: [f32; 3], aspect: f32) -> Self {
        let pos = Vec3::new(position[0], -position[1], position[2]);
        let radius = pos.length().max(0.01);

        Self {
            radius,
            azimuth_rad: pos.x.atan2(pos.z),
            elevation_rad: (pos.y / radius).clamp(-1.0, 1.0).asin(),
            fov_y_deg: 60.0,
            proj: Self::perspective(60.0, aspect),
        }
    }

    fn perspective(fov_y_deg: f32, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(fov_y_deg.to_radians(), aspect, 0.01, 256.0)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.proj = Self::perspective(self.fov_y_deg, aspect);
    }

    /// Advance the automatic turntable rotation.
    pub fn orbit(&mut self, delta_azimuth_rad: f32) {
        self.azimuth_rad += delta_azimuth_rad;
    }

    pub fn position(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth_rad.sin_cos();
        let (sin_el, cos_el) = self.elevation_rad.sin_cos();
        Vec3::new(
            self.radius * cos_el * sin_az,
            self.radius * sin_el,
            self.radius * cos_el * cos_az,
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    /// Build one logical model's per-frame uniform. The camera basis
    /// vectors are the rows of the view rotation; lookat is negated so it
    /// points from the camera into the scene.
    pub fn make_global_uniform(
        &self,
        model: Mat4,
        viewport_size: [f32; 2],
    ) -> GlobalUniformStd140 {
        let view = self.view();
        let side = view.row(0).truncate();
        let up = view.row(1).truncate();
        let lookat = -view.row(2).truncate();

        let tan_half_fov = (0.5 * self.fov_y_deg.to_radians()).tan();

        GlobalUniformStd140 {
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            proj: self.proj.to_cols_array_2d(),
            camera_position: self.position().into(),
            _pad0: 0.0,
            camera_side: side.into(),
            _pad1: 0.0,
            camera_up: up.into(),
            _pad2: 0.0,
            camera_lookat: lookat.into(),
            _pad3: 0.0,
            img_dim: viewport_size,
            tan_half_fov,
            _pad4: 0.0,
        }
    }
}

pub struct CameraController {
    mouse_down: bool,
    last_mouse: Option<(f64, f64)>,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            mouse_down: false,
            last_mouse: None,
        }
    }

    /// Handles window events and updates the camera.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &mut Camera) {
        match event {
            WindowEvent::MouseInput { button, state, .. } => {
                if *button == MouseButton::Left {
                    self.mouse_down = *state == ElementState::Pressed;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_orbit((position.x, position.y), camera);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.handle_scroll(scroll, camera);
            }
            _ => {}
        }
    }

    /// Scroll up zooms in.
    fn handle_scroll(&mut self, delta: f32, camera: &mut Camera) {
        camera.radius *= 1.1_f32.powf(-delta);
        camera.radius = camera.radius.clamp(0.1, 64.0);
    }

    /// Rotates around the origin while the left mouse button is held.
    fn handle_cursor_orbit(&mut self, xy: (f64, f64), camera: &mut Camera) {
        if let Some(last) = self.last_mouse {
            if self.mouse_down {
                let dx = ((xy.0 - last.0) * 0.005) as f32;
                let dy = ((last.1 - xy.1) * 0.005) as f32;

                camera.azimuth_rad -= dx;
                camera.elevation_rad = (camera.elevation_rad + dy)
                    .clamp(-89f32.to_radians(), 89f32.to_radians());
            }
        }
        self.last_mouse = Some(xy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_position_roundtrips_through_orbit_state() {
        let camera = Camera::from_scene([-1.0, 1.0, 1.0], 16.0 / 9.0);
        let pos = camera.position();
        // y flipped on construction.
        assert!((pos.x - -1.0).abs() < 1e-5);
        assert!((pos.y - -1.0).abs() < 1e-5);
        assert!((pos.z - 1.0).abs() < 1e-5);
        assert!((camera.radius - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn uniform_basis_is_orthonormal() {
        let camera = Camera::from_scene([-0.0381453, 1.84186, -1.51744], 1.0);
        let u = camera.make_global_uniform(Mat4::IDENTITY, [800.0, 600.0]);

        let side = Vec3::from(u.camera_side);
        let up = Vec3::from(u.camera_up);
        let lookat = Vec3::from(u.camera_lookat);

        for v in [side, up, lookat] {
            assert!((v.length() - 1.0).abs() < 1e-4);
        }
        assert!(side.dot(up).abs() < 1e-4);
        assert!(side.dot(lookat).abs() < 1e-4);
        assert!(up.dot(lookat).abs() < 1e-4);

        // The lookat vector points from the camera toward the origin.
        let expected = (-camera.position()).normalize();
        assert!((lookat - expected).length() < 1e-4);
    }

    #[test]
    fn half_fov_tangent_matches_projection() {
        let camera = Camera::from_scene([0.0, 0.0, 4.0], 1.0);
        let u = camera.make_global_uniform(Mat4::IDENTITY, [512.0, 512.0]);
        assert!((u.tan_half_fov - 30f32.to_radians().tan()).abs() < 1e-6);
    }
}
