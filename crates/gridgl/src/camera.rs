//! Camera: clear color, projection/view matrices, and screen-to-world
//! unprojection against the z=0 plane.

use crate::api::UniformValue;
use crate::pass::UniformFeed;
use glam::{Mat4, Vec3, Vec4};
use std::f32::consts::PI;

/// A translation-only camera. The view matrix always holds the
/// inverse-accumulated translation of `position`.
#[derive(Debug, Clone)]
pub struct Camera {
    pub clear_color: Vec4,
    pub perspective: Mat4,
    pub view: Mat4,
    pub position: Vec3,
    /// Viewport pixels per degree of vertical field of view.
    pub pixels_per_degree: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            perspective: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            position: Vec3::ZERO,
            pixels_per_degree: 7.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the camera: the position accumulates `delta` while the view
    /// matrix accumulates the opposite translation.
    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        self.view *= Mat4::from_translation(-delta);
    }

    /// Derives the vertical field of view from the viewport height and the
    /// pixels-per-degree ratio, then rebuilds the projection (GL clip
    /// conventions, near 1, far 100).
    pub fn viewport_resized(&mut self, width: u32, height: u32) {
        let fov_y = height as f32 / (self.pixels_per_degree * 180.0 / PI);
        let aspect = width as f32 / height as f32;
        self.perspective = Mat4::perspective_rh_gl(fov_y, aspect, 1.0, 100.0);
    }

    /// Maps an NDC point to the world-space location where its view ray
    /// crosses the z=0 plane.
    ///
    /// Returns `None` when either clip-space endpoint lands on w = 0
    /// (degenerate projection) or the ray never crosses the plane (equal
    /// endpoint depths); callers must treat that as "no pick".
    pub fn unproject(&self, ndc_x: f32, ndc_y: f32) -> Option<Vec3> {
        let inv_mvp = (self.perspective * self.view).inverse();

        let near = Self::divide(inv_mvp * Vec4::new(ndc_x, ndc_y, -1.0, 1.0))?;
        let far = Self::divide(inv_mvp * Vec4::new(ndc_x, ndc_y, 1.0, 1.0))?;

        // Linear extrapolation along the near->far ray to z = 0; the z
        // component comes out exactly 0 by construction. A ray parallel to
        // the plane makes `t` non-finite.
        let t = far.z / (far.z - near.z);
        let hit = far - (far - near) * t;
        hit.is_finite().then_some(hit)
    }

    fn divide(point: Vec4) -> Option<Vec3> {
        if point.w == 0.0 {
            return None;
        }
        Some(point.truncate() / point.w)
    }
}

impl UniformFeed for Camera {
    fn uniform(&self, field: &str) -> Option<UniformValue> {
        match field {
            "perspective" => Some(self.perspective.into()),
            "view" => Some(self.view.into()),
            _ => None,
        }
    }
}
