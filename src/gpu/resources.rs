//! Buffers and bind groups for one rendering session.

use crate::engine::{SceneBuffer, SceneSizes};
use crate::scheduler::commands::{AccumPair, BindingKey, BufferId};
use crate::scheduler::frame_config::FrameConfig;
use crate::scheduler::layout::{buffer_size, Access, LayoutKind};
use crate::util::Result;

/// Usage flags per buffer.
fn usage(id: BufferId) -> wgpu::BufferUsages {
    use wgpu::BufferUsages as U;
    match id {
        BufferId::Camera => U::UNIFORM | U::COPY_DST | U::COPY_SRC,
        BufferId::Materials | BufferId::Instances | BufferId::LastCamera => U::UNIFORM | U::COPY_DST,
        BufferId::Triangles | BufferId::TriangleNormals | BufferId::LightTriangles | BufferId::Nodes => {
            U::STORAGE | U::COPY_DST
        }
        BufferId::Config => U::STORAGE | U::COPY_DST | U::COPY_SRC,
        BufferId::Grid => U::COPY_DST | U::INDIRECT,
        BufferId::Radiance | BufferId::LastAttributes => U::STORAGE | U::COPY_DST,
        BufferId::Attributes => U::STORAGE | U::COPY_SRC,
        BufferId::Path(_)
        | BufferId::ShadowRays
        | BufferId::Hits
        | BufferId::Accum(_)
        | BufferId::Moments(_)
        | BufferId::History(_) => U::STORAGE,
    }
}

/// One bind group layout per [`LayoutKind`].
pub struct BindLayouts {
    generate: wgpu::BindGroupLayout,
    intersect: wgpu::BindGroupLayout,
    shade: wgpu::BindGroupLayout,
    shadow: wgpu::BindGroupLayout,
    control: wgpu::BindGroupLayout,
    denoise: wgpu::BindGroupLayout,
    display: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let make = |kind: LayoutKind| {
            let visibility = match kind {
                LayoutKind::Display => wgpu::ShaderStages::FRAGMENT,
                _ => wgpu::ShaderStages::COMPUTE,
            };
            let entries: Vec<_> = kind
                .entries()
                .iter()
                .enumerate()
                .map(|(i, access)| wgpu::BindGroupLayoutEntry {
                    binding: i as u32,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: match access {
                            Access::Uniform => wgpu::BufferBindingType::Uniform,
                            Access::Read => wgpu::BufferBindingType::Storage { read_only: true },
                            Access::ReadWrite => wgpu::BufferBindingType::Storage { read_only: false },
                        },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(kind.name()),
                entries: &entries,
            })
        };

        Self {
            generate: make(LayoutKind::Generate),
            intersect: make(LayoutKind::Intersect),
            shade: make(LayoutKind::Shade),
            shadow: make(LayoutKind::Shadow),
            control: make(LayoutKind::Control),
            denoise: make(LayoutKind::Denoise),
            display: make(LayoutKind::Display),
        }
    }

    pub fn get(&self, kind: LayoutKind) -> &wgpu::BindGroupLayout {
        match kind {
            LayoutKind::Generate => &self.generate,
            LayoutKind::Intersect => &self.intersect,
            LayoutKind::Shade => &self.shade,
            LayoutKind::Shadow => &self.shadow,
            LayoutKind::Control => &self.control,
            LayoutKind::Denoise => &self.denoise,
            LayoutKind::Display => &self.display,
        }
    }
}

struct Buffers {
    camera: wgpu::Buffer,
    materials: wgpu::Buffer,
    instances: wgpu::Buffer,
    triangles: wgpu::Buffer,
    triangle_normals: wgpu::Buffer,
    light_triangles: wgpu::Buffer,
    nodes: wgpu::Buffer,
    config: wgpu::Buffer,
    grid: wgpu::Buffer,
    path: [wgpu::Buffer; 2],
    shadow_rays: wgpu::Buffer,
    hits: wgpu::Buffer,
    radiance: wgpu::Buffer,
    attributes: wgpu::Buffer,
    last_attributes: wgpu::Buffer,
    last_camera: wgpu::Buffer,
    accum: [wgpu::Buffer; 3],
    moments: [wgpu::Buffer; 2],
    history: [wgpu::Buffer; 2],
}

impl Buffers {
    fn new(device: &wgpu::Device, pixels: u64, scene: &SceneSizes) -> Self {
        use crate::scheduler::commands::{AccumSlot, Parity, PathSlot};
        let make = |id: BufferId| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(id.name()),
                size: buffer_size(id, pixels, scene),
                usage: usage(id),
                mapped_at_creation: false,
            })
        };
        Self {
            camera: make(BufferId::Camera),
            materials: make(BufferId::Materials),
            instances: make(BufferId::Instances),
            triangles: make(BufferId::Triangles),
            triangle_normals: make(BufferId::TriangleNormals),
            light_triangles: make(BufferId::LightTriangles),
            nodes: make(BufferId::Nodes),
            config: make(BufferId::Config),
            grid: make(BufferId::Grid),
            path: [make(BufferId::Path(PathSlot::Zero)), make(BufferId::Path(PathSlot::One))],
            shadow_rays: make(BufferId::ShadowRays),
            hits: make(BufferId::Hits),
            radiance: make(BufferId::Radiance),
            attributes: make(BufferId::Attributes),
            last_attributes: make(BufferId::LastAttributes),
            last_camera: make(BufferId::LastCamera),
            accum: AccumSlot::ALL.map(|s| make(BufferId::Accum(s))),
            moments: [make(BufferId::Moments(Parity::Zero)), make(BufferId::Moments(Parity::One))],
            history: [make(BufferId::History(Parity::Zero)), make(BufferId::History(Parity::One))],
        }
    }

    fn get(&self, id: BufferId) -> &wgpu::Buffer {
        match id {
            BufferId::Camera => &self.camera,
            BufferId::Materials => &self.materials,
            BufferId::Instances => &self.instances,
            BufferId::Triangles => &self.triangles,
            BufferId::TriangleNormals => &self.triangle_normals,
            BufferId::LightTriangles => &self.light_triangles,
            BufferId::Nodes => &self.nodes,
            BufferId::Config => &self.config,
            BufferId::Grid => &self.grid,
            BufferId::Path(slot) => &self.path[slot.index()],
            BufferId::ShadowRays => &self.shadow_rays,
            BufferId::Hits => &self.hits,
            BufferId::Radiance => &self.radiance,
            BufferId::Attributes => &self.attributes,
            BufferId::LastAttributes => &self.last_attributes,
            BufferId::LastCamera => &self.last_camera,
            BufferId::Accum(slot) => &self.accum[slot.index()],
            BufferId::Moments(p) => &self.moments[p.index()],
            BufferId::History(p) => &self.history[p.index()],
        }
    }
}

struct BindGroups {
    generate: wgpu::BindGroup,
    intersect: [wgpu::BindGroup; 2],
    shade: [wgpu::BindGroup; 2],
    shadow: wgpu::BindGroup,
    control: wgpu::BindGroup,
    denoise: [wgpu::BindGroup; 6],
    display: [wgpu::BindGroup; 3],
}

/// All device buffers and bind groups, addressed by scheduler ids.
pub struct GpuResources {
    buffers: Buffers,
    groups: BindGroups,
    scene: SceneSizes,
}

impl GpuResources {
    /// Allocate everything for a `width` x `height` target and the engine's
    /// requested scene sizes (empty buffers get minimum sizes).
    #[tracing::instrument(skip(device, layouts))]
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts, width: u32, height: u32, scene: SceneSizes) -> Self {
        use crate::scheduler::commands::{AccumSlot, PathSlot};

        let scene = scene.with_minimums();
        let pixels = width as u64 * height as u64;
        let buffers = Buffers::new(device, pixels, &scene);

        let make = |key: BindingKey| {
            let bound = key.buffers();
            let entries: Vec<_> = bound
                .iter()
                .enumerate()
                .map(|(i, id)| wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: buffers.get(*id).as_entire_binding(),
                })
                .collect();
            let label = key.to_string();
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: layouts.get(key.layout()),
                entries: &entries,
            })
        };

        let groups = BindGroups {
            generate: make(BindingKey::Generate),
            intersect: [
                make(BindingKey::Intersect(PathSlot::Zero)),
                make(BindingKey::Intersect(PathSlot::One)),
            ],
            shade: [make(BindingKey::Shade(PathSlot::Zero)), make(BindingKey::Shade(PathSlot::One))],
            shadow: make(BindingKey::Shadow),
            control: make(BindingKey::Control),
            denoise: AccumPair::ALL.map(|p| make(BindingKey::Denoise(p))),
            display: AccumSlot::ALL.map(|s| make(BindingKey::Display(s))),
        };

        let total: u64 = crate::scheduler::layout::all_buffers()
            .into_iter()
            .map(|id| buffer_size(id, pixels, &scene))
            .sum();
        tracing::info!("allocated {:.1} MiB of GPU buffers", total as f64 / (1024.0 * 1024.0));

        Self { buffers, groups, scene }
    }

    pub fn buffer(&self, id: BufferId) -> &wgpu::Buffer {
        self.buffers.get(id)
    }

    pub fn bind_group(&self, key: BindingKey) -> &wgpu::BindGroup {
        let g = &self.groups;
        match key {
            BindingKey::Generate => &g.generate,
            BindingKey::Intersect(slot) => &g.intersect[slot.index()],
            BindingKey::Shade(slot) => &g.shade[slot.index()],
            BindingKey::Shadow => &g.shadow,
            BindingKey::Control => &g.control,
            BindingKey::Denoise(pair) => &g.denoise[pair.index()],
            BindingKey::Display(slot) => &g.display[slot.index()],
        }
    }

    /// Upload the host part of the frame blob.
    pub fn write_config(&self, queue: &wgpu::Queue, config: &FrameConfig) {
        queue.write_buffer(&self.buffers.config, 0, config.as_bytes());
    }

    /// Engine write into a scene buffer.
    pub fn write(&self, queue: &wgpu::Queue, buffer: SceneBuffer, offset: u64, data: &[u8]) -> Result<()> {
        self.scene.check_write(buffer, offset, data.len() as u64)?;
        if !data.is_empty() {
            queue.write_buffer(self.buffers.get(buffer.buffer()), offset, data);
        }
        Ok(())
    }
}
