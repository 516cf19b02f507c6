//! Engine bridge.
//!
//! The scene/camera engine runs on the frame thread but never touches
//! scheduler state directly: everything it wants to change is sent as an
//! [`EngineEvent`] and applied once per frame, before the config write.

mod free_cam;

pub use free_cam::{CameraPose, FreeCamEngine};

use std::sync::mpsc;

use crate::scheduler::commands::BufferId;
use crate::scheduler::frame_config::{CONFIG_BUFFER_SIZE, ENGINE_CONFIG_OFFSET};
use crate::util::{Error, Result};

/// Scene buffers the engine may write, with their numeric ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SceneBuffer {
    Camera = 0,
    Materials = 1,
    Instances = 2,
    Triangles = 3,
    TriangleNormals = 4,
    LightTriangles = 5,
    Nodes = 6,
    Config = 21,
}

impl SceneBuffer {
    pub fn from_id(id: u32) -> Result<Self> {
        Ok(match id {
            0 => Self::Camera,
            1 => Self::Materials,
            2 => Self::Instances,
            3 => Self::Triangles,
            4 => Self::TriangleNormals,
            5 => Self::LightTriangles,
            6 => Self::Nodes,
            21 => Self::Config,
            other => return Err(Error::UnknownBuffer(other)),
        })
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn buffer(self) -> BufferId {
        match self {
            Self::Camera => BufferId::Camera,
            Self::Materials => BufferId::Materials,
            Self::Instances => BufferId::Instances,
            Self::Triangles => BufferId::Triangles,
            Self::TriangleNormals => BufferId::TriangleNormals,
            Self::LightTriangles => BufferId::LightTriangles,
            Self::Nodes => BufferId::Nodes,
            Self::Config => BufferId::Config,
        }
    }

    /// Reject writes the device cannot take or that would clobber host-owned
    /// config words.
    pub fn check_write(self, offset: u64, len: u64) -> Result<()> {
        if offset % 4 != 0 || len % 4 != 0 {
            return Err(Error::UnalignedWrite { offset, size: len });
        }
        if self == Self::Config {
            let end = offset.checked_add(len);
            if offset < ENGINE_CONFIG_OFFSET || end.map_or(true, |end| end > CONFIG_BUFFER_SIZE) {
                return Err(Error::ConfigWriteOutOfRange {
                    offset,
                    end: offset.saturating_add(len),
                    min: ENGINE_CONFIG_OFFSET,
                    max: CONFIG_BUFFER_SIZE,
                });
            }
        }
        Ok(())
    }
}

/// Byte sizes of the engine-owned scene buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneSizes {
    pub camera: u64,
    pub materials: u64,
    pub instances: u64,
    pub triangles: u64,
    pub triangle_normals: u64,
    pub light_triangles: u64,
    pub nodes: u64,
}

impl SceneSizes {
    pub const MIN_TRIANGLES: u64 = 48;
    pub const MIN_TRIANGLE_NORMALS: u64 = 48;
    pub const MIN_LIGHT_TRIANGLES: u64 = 64;
    pub const MIN_NODES: u64 = 64;
    /// Uniform blocks need a non-empty binding.
    pub const MIN_UNIFORM: u64 = 16;

    /// Replace empty buffers with minimum sizes so every binding stays valid,
    /// and round up to whole words.
    pub fn with_minimums(self) -> Self {
        fn at_least(v: u64, min: u64) -> u64 {
            if v == 0 {
                min
            } else {
                v.div_ceil(4) * 4
            }
        }
        Self {
            camera: at_least(self.camera, Self::MIN_UNIFORM),
            materials: at_least(self.materials, Self::MIN_UNIFORM),
            instances: at_least(self.instances, Self::MIN_UNIFORM),
            triangles: at_least(self.triangles, Self::MIN_TRIANGLES),
            triangle_normals: at_least(self.triangle_normals, Self::MIN_TRIANGLE_NORMALS),
            light_triangles: at_least(self.light_triangles, Self::MIN_LIGHT_TRIANGLES),
            nodes: at_least(self.nodes, Self::MIN_NODES),
        }
    }

    /// Sizes for a scene with a camera and nothing else.
    pub fn empty_scene() -> Self {
        Self {
            camera: 48,
            ..Default::default()
        }
        .with_minimums()
    }

    /// Validate an engine write of `len` bytes at `offset` against the ABI and
    /// the allocated size of `buffer`.
    pub fn check_write(&self, buffer: SceneBuffer, offset: u64, len: u64) -> Result<()> {
        buffer.check_write(offset, len)?;
        let capacity = self.size_of(buffer);
        if offset.checked_add(len).map_or(true, |end| end > capacity) {
            return Err(Error::WriteOverflow {
                buffer: buffer.buffer().name(),
                offset,
                size: len,
                capacity,
            });
        }
        Ok(())
    }

    pub fn size_of(&self, buffer: SceneBuffer) -> u64 {
        match buffer {
            SceneBuffer::Camera => self.camera,
            SceneBuffer::Materials => self.materials,
            SceneBuffer::Instances => self.instances,
            SceneBuffer::Triangles => self.triangles,
            SceneBuffer::TriangleNormals => self.triangle_normals,
            SceneBuffer::LightTriangles => self.light_triangles,
            SceneBuffer::Nodes => self.nodes,
            SceneBuffer::Config => CONFIG_BUFFER_SIZE,
        }
    }
}

/// Message from the engine to the frame loop.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    ResetSamples,
    SetLightTriangleCount(u32),
    ToggleConverge,
    ToggleFilter,
    ToggleReprojection,
    CreateResources(SceneSizes),
    WriteBuffer {
        buffer: SceneBuffer,
        offset: u64,
        data: Vec<u8>,
    },
    SaveBinary(Vec<u8>),
}

/// Engine-side handle for sending events.
#[derive(Clone, Debug)]
pub struct EngineBridge {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineBridge {
    fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("frame loop gone, engine event dropped");
        }
    }

    pub fn reset_samples(&self) {
        self.send(EngineEvent::ResetSamples);
    }

    pub fn set_light_triangle_count(&self, count: u32) {
        self.send(EngineEvent::SetLightTriangleCount(count));
    }

    pub fn toggle_converge(&self) {
        self.send(EngineEvent::ToggleConverge);
    }

    pub fn toggle_filter(&self) {
        self.send(EngineEvent::ToggleFilter);
    }

    pub fn toggle_reprojection(&self) {
        self.send(EngineEvent::ToggleReprojection);
    }

    pub fn create_resources(&self, sizes: SceneSizes) {
        self.send(EngineEvent::CreateResources(sizes));
    }

    pub fn write_buffer(&self, buffer: SceneBuffer, offset: u64, data: &[u8]) {
        self.send(EngineEvent::WriteBuffer {
            buffer,
            offset,
            data: data.to_vec(),
        });
    }

    /// Write by numeric buffer id.
    pub fn write_buffer_id(&self, id: u32, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = SceneBuffer::from_id(id)?;
        self.write_buffer(buffer, offset, data);
        Ok(())
    }

    pub fn save_binary(&self, data: Vec<u8>) {
        self.send(EngineEvent::SaveBinary(data));
    }
}

/// Frame-loop side of the bridge.
#[derive(Debug)]
pub struct EngineEvents {
    rx: mpsc::Receiver<EngineEvent>,
}

impl EngineEvents {
    /// Take everything queued since the last call, in send order.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.rx.try_iter().collect()
    }
}

/// Create a connected bridge/receiver pair.
pub fn channel() -> (EngineBridge, EngineEvents) {
    let (tx, rx) = mpsc::channel();
    (EngineBridge { tx }, EngineEvents { rx })
}

/// Scene simulation driven by the frame loop.
pub trait Engine {
    /// Called once before the first frame; typically requests resources and
    /// uploads the scene.
    fn init(&mut self, bridge: &EngineBridge) -> Result<()>;

    /// Advance to `time` seconds. Called once per displayed frame after
    /// submission. A positive return marks the end of a scene loop.
    fn update(&mut self, bridge: &EngineBridge, time: f64, converge: bool, edit_mode: bool) -> i32;

    fn mouse_move(&mut self, _dx: f32, _dy: f32, _velocity: f32) {}

    fn key_down(&mut self, _key: char, _velocity: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_ids() {
        for id in [0, 1, 2, 3, 4, 5, 6, 21] {
            assert_eq!(SceneBuffer::from_id(id).unwrap().id(), id);
        }
        assert!(matches!(SceneBuffer::from_id(7), Err(Error::UnknownBuffer(7))));
        assert!(matches!(SceneBuffer::from_id(22), Err(Error::UnknownBuffer(22))));
    }

    #[test]
    fn test_config_write_range() {
        assert!(SceneBuffer::Config.check_write(48, 12).is_ok());
        assert!(SceneBuffer::Config.check_write(48, 16).is_ok());
        assert!(matches!(
            SceneBuffer::Config.check_write(0, 48),
            Err(Error::ConfigWriteOutOfRange { .. })
        ));
        assert!(SceneBuffer::Config.check_write(60, 8).is_err());
        assert!(matches!(
            SceneBuffer::Triangles.check_write(2, 4),
            Err(Error::UnalignedWrite { .. })
        ));
    }

    #[test]
    fn test_write_offset_overflow() {
        assert!(matches!(
            SceneBuffer::Config.check_write(u64::MAX - 3, 4),
            Err(Error::ConfigWriteOutOfRange { end: u64::MAX, .. })
        ));
        assert!(SceneBuffer::Nodes.check_write(u64::MAX - 3, 8).is_ok());

        let sizes = SceneSizes::empty_scene();
        assert!(matches!(
            sizes.check_write(SceneBuffer::Nodes, u64::MAX - 3, 8),
            Err(Error::WriteOverflow { capacity: 64, .. })
        ));
        assert!(matches!(
            sizes.check_write(SceneBuffer::Camera, 0, 64),
            Err(Error::WriteOverflow { capacity: 48, .. })
        ));
        assert!(sizes.check_write(SceneBuffer::Camera, 0, 48).is_ok());
        assert!(sizes.check_write(SceneBuffer::Config, 48, 16).is_ok());
    }

    #[test]
    fn test_minimum_sizes() {
        let s = SceneSizes::default().with_minimums();
        assert_eq!(s.triangles, 48);
        assert_eq!(s.triangle_normals, 48);
        assert_eq!(s.light_triangles, 64);
        assert_eq!(s.nodes, 64);

        let s = SceneSizes { triangles: 97, ..Default::default() }.with_minimums();
        assert_eq!(s.triangles, 100);
        assert_eq!(SceneSizes::empty_scene().camera, 48);
    }

    #[test]
    fn test_channel_order() {
        let (bridge, events) = channel();
        bridge.toggle_filter();
        bridge.set_light_triangle_count(3);
        bridge.write_buffer_id(0, 0, &[0; 48]).unwrap();
        assert!(bridge.write_buffer_id(9, 0, &[0; 4]).is_err());

        let drained = events.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0], EngineEvent::ToggleFilter);
        assert_eq!(drained[1], EngineEvent::SetLightTriangleCount(3));
        assert!(events.drain().is_empty());
    }
}
