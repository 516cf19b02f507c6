//! Built-in engine: an empty scene viewed through a free-flying camera.

use glam::Vec3;

use super::{Engine, EngineBridge, SceneBuffer, SceneSizes};
use crate::scheduler::frame_config::ENGINE_CONFIG_OFFSET;
use crate::settings::Settings;
use crate::util::Result;

const PITCH_LIMIT: f32 = 1.55;

/// Pinhole/thin-lens camera state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    /// Radians around +Y.
    pub yaw: f32,
    /// Radians, clamped short of straight up/down.
    pub pitch: f32,
    pub vert_fov_deg: f32,
    pub focus_dist: f32,
    pub focus_angle_deg: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 1.0, 5.0),
            yaw: 0.0,
            pitch: 0.0,
            vert_fov_deg: 60.0,
            focus_dist: 10.0,
            focus_angle_deg: 0.0,
        }
    }
}

impl CameraPose {
    /// View direction; yaw 0 looks down -Z.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward())
    }

    /// The 48-byte camera block read by the generate and denoise kernels:
    /// `eye, tan(vfov/2) | right, focus distance | up, tan(focus angle/2)`.
    pub fn to_gpu(&self) -> [f32; 12] {
        let r = self.right();
        let u = self.up();
        let half_fov = (0.5 * self.vert_fov_deg).to_radians().tan();
        let half_angle = (0.5 * self.focus_angle_deg).to_radians().tan();
        [
            self.eye.x, self.eye.y, self.eye.z, half_fov, //
            r.x, r.y, r.z, self.focus_dist, //
            u.x, u.y, u.z, half_angle,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingToggle {
    Filter,
    Reprojection,
    Converge,
}

/// Engine with no geometry and a movable camera.
#[derive(Debug)]
pub struct FreeCamEngine {
    pose: CameraPose,
    background: [f32; 3],
    dirty: bool,
    pending: Vec<PendingToggle>,
    loop_length: Option<f64>,
    loop_start: f64,
}

impl Default for FreeCamEngine {
    fn default() -> Self {
        Self::new(CameraPose::default())
    }
}

impl FreeCamEngine {
    pub fn new(pose: CameraPose) -> Self {
        Self {
            pose,
            background: [0.5, 0.6, 0.8],
            dirty: true,
            pending: Vec::new(),
            loop_length: None,
            loop_start: 0.0,
        }
    }

    /// Report a finished scene loop every `seconds`.
    pub fn with_loop_length(mut self, seconds: f64) -> Self {
        self.loop_length = Some(seconds);
        self
    }

    /// Engine configured from settings: scene loop length when set.
    pub fn from_settings(settings: &Settings) -> Self {
        let engine = Self::default();
        match settings.loop_seconds {
            Some(seconds) => engine.with_loop_length(seconds),
            None => engine,
        }
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn upload_camera(&mut self, bridge: &EngineBridge) {
        bridge.write_buffer(SceneBuffer::Camera, 0, bytemuck::cast_slice(&self.pose.to_gpu()));
        self.dirty = false;
    }
}

impl Engine for FreeCamEngine {
    #[tracing::instrument(skip_all)]
    fn init(&mut self, bridge: &EngineBridge) -> Result<()> {
        bridge.create_resources(SceneSizes::empty_scene());
        bridge.set_light_triangle_count(0);
        bridge.write_buffer(SceneBuffer::Config, ENGINE_CONFIG_OFFSET, bytemuck::cast_slice(&self.background));
        self.upload_camera(bridge);
        tracing::info!("free camera engine ready");
        Ok(())
    }

    fn update(&mut self, bridge: &EngineBridge, time: f64, converge: bool, edit_mode: bool) -> i32 {
        for toggle in self.pending.drain(..) {
            match toggle {
                PendingToggle::Filter => bridge.toggle_filter(),
                PendingToggle::Reprojection => bridge.toggle_reprojection(),
                PendingToggle::Converge => bridge.toggle_converge(),
            }
        }

        if !converge || self.dirty {
            bridge.reset_samples();
        }
        if self.dirty {
            self.upload_camera(bridge);
        }

        // Scene time stands still while editing.
        if edit_mode {
            self.loop_start = time;
            return 0;
        }
        match self.loop_length {
            Some(len) if time - self.loop_start >= len => {
                self.loop_start = time;
                1
            }
            _ => 0,
        }
    }

    fn mouse_move(&mut self, dx: f32, dy: f32, velocity: f32) {
        self.pose.yaw -= dx * velocity;
        self.pose.pitch = (self.pose.pitch - dy * velocity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.dirty = true;
    }

    fn key_down(&mut self, key: char, velocity: f32) {
        let step = match key {
            'w' => self.pose.forward(),
            's' => -self.pose.forward(),
            'a' => -self.pose.right(),
            'd' => self.pose.right(),
            'e' => Vec3::Y,
            'q' => -Vec3::Y,
            'f' => {
                self.pending.push(PendingToggle::Filter);
                return;
            }
            'r' => {
                self.pending.push(PendingToggle::Reprojection);
                return;
            }
            'c' => {
                self.pending.push(PendingToggle::Converge);
                return;
            }
            _ => return,
        };
        self.pose.eye += step * velocity;
        self.dirty = true;
    }
}
