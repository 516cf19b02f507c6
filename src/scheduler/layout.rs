//! Bind group layouts and buffer sizes, independent of the GPU API.
//!
//! Entry order here is the `@binding` order the shaders declare.

use crate::engine::SceneSizes;

use super::commands::{AccumSlot, BindingKey, BufferId, Parity, PathSlot};
use super::frame_config::{CONFIG_BUFFER_SIZE, GRID_BYTES};

/// How a buffer is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Uniform,
    Read,
    ReadWrite,
}

/// One bind group layout per kernel family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    Generate,
    Intersect,
    Shade,
    Shadow,
    Control,
    Denoise,
    /// Fragment stage; all other layouts are compute.
    Display,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 7] = [
        Self::Generate,
        Self::Intersect,
        Self::Shade,
        Self::Shadow,
        Self::Control,
        Self::Denoise,
        Self::Display,
    ];

    pub fn entries(self) -> &'static [Access] {
        use Access::*;
        match self {
            Self::Generate => &[Uniform, Read, ReadWrite],
            Self::Intersect => &[Uniform, Read, Read, Read, Read, ReadWrite],
            Self::Shade => &[
                Uniform, Uniform, Read, Read, Read, Read, ReadWrite, ReadWrite, ReadWrite, ReadWrite, ReadWrite,
            ],
            Self::Shadow => &[Uniform, Read, Read, Read, Read, ReadWrite],
            Self::Control => &[ReadWrite],
            Self::Denoise => &[
                Uniform, Read, Read, Read, Read, Read, ReadWrite, Read, ReadWrite, Read, ReadWrite,
            ],
            Self::Display => &[Read, Read, Read],
        }
    }

    /// Storage bindings, counted against the per-stage limit.
    pub fn storage_bindings(self) -> u32 {
        self.entries().iter().filter(|a| **a != Access::Uniform).count() as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Intersect => "intersect",
            Self::Shade => "shade",
            Self::Shadow => "shadow",
            Self::Control => "control",
            Self::Denoise => "denoise",
            Self::Display => "display",
        }
    }
}

/// Storage buffers a single stage must be able to bind.
pub fn required_storage_buffers_per_stage() -> u32 {
    LayoutKind::ALL.iter().map(|l| l.storage_bindings()).max().unwrap_or(0)
}

impl BindingKey {
    pub fn layout(self) -> LayoutKind {
        match self {
            Self::Generate => LayoutKind::Generate,
            Self::Intersect(_) => LayoutKind::Intersect,
            Self::Shade(_) => LayoutKind::Shade,
            Self::Shadow => LayoutKind::Shadow,
            Self::Control => LayoutKind::Control,
            Self::Denoise(_) => LayoutKind::Denoise,
            Self::Display(_) => LayoutKind::Display,
        }
    }

    /// Buffers bound by this group, in binding order.
    pub fn buffers(self) -> Vec<BufferId> {
        use BufferId::*;
        match self {
            Self::Generate => vec![Camera, Config, Path(PathSlot::Zero)],
            Self::Intersect(slot) => vec![Instances, Triangles, Nodes, Config, Path(slot), Hits],
            Self::Shade(slot) => vec![
                Materials,
                Instances,
                TriangleNormals,
                LightTriangles,
                Hits,
                Path(slot),
                Config,
                Path(slot.other()),
                ShadowRays,
                Attributes,
                Radiance,
            ],
            Self::Shadow => vec![Instances, Triangles, Nodes, Config, ShadowRays, Radiance],
            Self::Control => vec![Config],
            Self::Denoise(pair) => {
                let (m_in, m_out) = pair.moments();
                vec![
                    LastCamera,
                    Config,
                    Attributes,
                    LastAttributes,
                    Radiance,
                    Moments(m_in),
                    Moments(m_out),
                    History(m_in),
                    History(m_out),
                    Accum(pair.src()),
                    Accum(pair.dst()),
                ]
            }
            Self::Display(slot) => vec![Config, Radiance, Accum(slot)],
        }
    }

    /// Every bind group the scheduler can reference.
    pub fn all() -> Vec<BindingKey> {
        let mut keys = vec![
            Self::Generate,
            Self::Intersect(PathSlot::Zero),
            Self::Intersect(PathSlot::One),
            Self::Shade(PathSlot::Zero),
            Self::Shade(PathSlot::One),
            Self::Shadow,
            Self::Control,
        ];
        keys.extend(super::commands::AccumPair::ALL.iter().map(|p| Self::Denoise(*p)));
        keys.extend(AccumSlot::ALL.iter().map(|s| Self::Display(*s)));
        keys
    }
}

/// Bytes per pixel of the per-pixel buffers.
pub fn bytes_per_pixel(buffer: BufferId) -> Option<u64> {
    use BufferId::*;
    match buffer {
        Path(_) | ShadowRays => Some(48),
        Hits => Some(16),
        Attributes | LastAttributes | Radiance | Accum(_) => Some(32),
        Moments(_) => Some(16),
        History(_) => Some(4),
        Camera | Materials | Instances | Triangles | TriangleNormals | LightTriangles | Nodes | Config | Grid
        | LastCamera => None,
    }
}

/// Allocation size of `buffer` for a `pixels`-sized target and the engine's scene sizes.
pub fn buffer_size(buffer: BufferId, pixels: u64, scene: &SceneSizes) -> u64 {
    use BufferId::*;
    if let Some(bpp) = bytes_per_pixel(buffer) {
        return pixels * bpp;
    }
    match buffer {
        Camera | LastCamera => scene.camera,
        Materials => scene.materials,
        Instances => scene.instances,
        Triangles => scene.triangles,
        TriangleNormals => scene.triangle_normals,
        LightTriangles => scene.light_triangles,
        Nodes => scene.nodes,
        Config => CONFIG_BUFFER_SIZE,
        Grid => GRID_BYTES,
        // Per-pixel buffers handled above.
        Path(_) | ShadowRays | Hits | Attributes | LastAttributes | Radiance | Accum(_) | Moments(_)
        | History(_) => 0,
    }
}

/// Every buffer allocated for a session.
pub fn all_buffers() -> Vec<BufferId> {
    use BufferId::*;
    let mut all = vec![
        Camera,
        Materials,
        Instances,
        Triangles,
        TriangleNormals,
        LightTriangles,
        Nodes,
        Config,
        Grid,
        Path(PathSlot::Zero),
        Path(PathSlot::One),
        ShadowRays,
        Hits,
        Radiance,
        Attributes,
        LastAttributes,
        LastCamera,
    ];
    all.extend(AccumSlot::ALL.iter().map(|s| Accum(*s)));
    for p in [Parity::Zero, Parity::One] {
        all.push(Moments(p));
        all.push(History(p));
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::commands::AccumPair;
    use std::collections::HashSet;

    #[test]
    fn test_entries_match_buffers() {
        for key in BindingKey::all() {
            assert_eq!(key.buffers().len(), key.layout().entries().len(), "{key}");
        }
    }

    fn access(key: BindingKey, buffer: BufferId) -> Option<Access> {
        let pos = key.buffers().iter().position(|b| *b == buffer)?;
        Some(key.layout().entries()[pos])
    }

    #[test]
    fn test_path_state_ping_pong_access() {
        for slot in [PathSlot::Zero, PathSlot::One] {
            let shade = BindingKey::Shade(slot);
            assert_eq!(access(shade, BufferId::Path(slot)), Some(Access::Read), "{shade}");
            assert_eq!(access(shade, BufferId::Path(slot.other())), Some(Access::ReadWrite), "{shade}");

            let intersect = BindingKey::Intersect(slot);
            assert_eq!(access(intersect, BufferId::Path(slot)), Some(Access::Read), "{intersect}");
            assert_eq!(access(intersect, BufferId::Path(slot.other())), None, "{intersect}");
            assert_eq!(access(intersect, BufferId::Hits), Some(Access::ReadWrite));
        }
        assert_eq!(access(BindingKey::Generate, BufferId::Path(PathSlot::Zero)), Some(Access::ReadWrite));
        assert_eq!(access(BindingKey::Generate, BufferId::Path(PathSlot::One)), None);
    }

    #[test]
    fn test_denoise_reads_src_writes_dst() {
        for pair in AccumPair::ALL {
            let key = BindingKey::Denoise(pair);
            assert_eq!(access(key, BufferId::Accum(pair.src())), Some(Access::Read), "{key}");
            assert_eq!(access(key, BufferId::Accum(pair.dst())), Some(Access::ReadWrite), "{key}");
        }
    }

    #[test]
    fn test_no_buffer_bound_twice() {
        for key in BindingKey::all() {
            let buffers = key.buffers();
            let unique: HashSet<_> = buffers.iter().collect();
            assert_eq!(unique.len(), buffers.len(), "{key}");
        }
    }

    #[test]
    fn test_storage_limit() {
        assert_eq!(LayoutKind::Shade.storage_bindings(), 9);
        assert_eq!(LayoutKind::Denoise.storage_bindings(), 10);
        assert_eq!(required_storage_buffers_per_stage(), 10);
    }

    #[test]
    fn test_bind_group_count() {
        assert_eq!(BindingKey::all().len(), 16);
    }

    #[test]
    fn test_sizes() {
        let scene = SceneSizes::empty_scene();
        let pixels = 1280 * 720;
        assert_eq!(buffer_size(BufferId::Path(PathSlot::One), pixels, &scene), pixels * 48);
        assert_eq!(buffer_size(BufferId::History(Parity::Zero), pixels, &scene), pixels * 4);
        assert_eq!(buffer_size(BufferId::Config, pixels, &scene), 64);
        assert_eq!(buffer_size(BufferId::Grid, pixels, &scene), 32);
        assert_eq!(buffer_size(BufferId::LastCamera, pixels, &scene), 48);
        assert_eq!(buffer_size(BufferId::Nodes, pixels, &scene), 64);
        assert_eq!(all_buffers().len(), 24);
    }
}
