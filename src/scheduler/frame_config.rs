//! Per-frame configuration blob shared by every kernel.
//!
//! The host writes the first 48 bytes once per displayed frame. Device-side
//! control kernels then rewrite the grid words in place as paths terminate and
//! shadow rays are produced. Words 12..16 (background colour and extension ray
//! count) belong to the engine and are never written here.

use bytemuck::{Pod, Zeroable};

/// Compute workgroup width in threads.
pub const WORKGROUP_SIZE_X: u32 = 16;
/// Compute workgroup height in threads.
pub const WORKGROUP_SIZE_Y: u32 = 16;
/// Threads per workgroup; indirect grids are sized against this.
pub const THREADS_PER_WORKGROUP: u32 = WORKGROUP_SIZE_X * WORKGROUP_SIZE_Y;
/// Per-dimension dispatch limit.
pub const MAX_WORKGROUPS_PER_DIM: u32 = 65535;
/// Bounce limit is packed into 4 bits.
pub const MAX_BOUNCE_LIMIT: u32 = 15;

/// Size of the device config buffer.
pub const CONFIG_BUFFER_SIZE: u64 = 64;
/// Bytes of the config buffer written by the host each frame.
pub const HOST_CONFIG_BYTES: u64 = 48;
/// Byte offset of the path grid inside the config buffer.
pub const GRID_OFFSET: u64 = 16;
/// Path grid plus shadow grid.
pub const GRID_BYTES: u64 = 32;
/// First byte of the engine-owned tail.
pub const ENGINE_CONFIG_OFFSET: u64 = 48;

/// One indirect dispatch record: workgroup counts plus the item count in `w`.
///
/// The first three words are exactly what `dispatch_workgroups_indirect` reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub count: u32,
}

impl GridDims {
    pub const EMPTY: Self = Self { x: 0, y: 0, z: 0, count: 0 };

    /// 2-D grid covering a `width` x `height` image, one thread per pixel.
    pub fn for_image(width: u32, height: u32) -> Self {
        Self {
            x: width.div_ceil(WORKGROUP_SIZE_X),
            y: height.div_ceil(WORKGROUP_SIZE_Y),
            z: 1,
            count: width.saturating_mul(height),
        }
    }

    /// 1-D grid for `count` items, folded into y once x would exceed the
    /// per-dimension limit.
    pub fn for_count(count: u32) -> Self {
        if count == 0 {
            return Self::EMPTY;
        }
        let groups = count.div_ceil(THREADS_PER_WORKGROUP);
        if groups <= MAX_WORKGROUPS_PER_DIM {
            return Self { x: groups, y: 1, z: 1, count };
        }
        let y = groups.div_ceil(MAX_WORKGROUPS_PER_DIM);
        Self { x: groups.div_ceil(y), y, z: 1, count }
    }
}

/// Host view of the 48-byte frame blob.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FrameConfig {
    /// `width << 16 | light triangle count`
    pub packed_width: u32,
    /// `height << 16 | bounce limit`
    pub packed_height: u32,
    pub frame_index: u32,
    pub sample_index: u32,
    pub path_grid: GridDims,
    pub shadow_grid: GridDims,
}

impl FrameConfig {
    /// Blob seeded for the start of a displayed frame: every pixel starts a
    /// path, no shadow rays are queued.
    pub fn begin_frame(width: u32, height: u32, bounce_limit: u32, frame_index: u32, sample_index: u32) -> Self {
        Self {
            packed_width: (width & 0xffff) << 16,
            packed_height: ((height & 0xffff) << 16) | (bounce_limit & 0xf),
            frame_index,
            sample_index,
            path_grid: GridDims::for_image(width, height),
            shadow_grid: GridDims::EMPTY,
        }
    }

    /// Pack the engine's light triangle count into the low half of word 0.
    pub fn with_light_triangles(mut self, count: u32) -> Self {
        self.packed_width = (self.packed_width & 0xffff_0000) | (count & 0xffff);
        self
    }

    pub fn width(&self) -> u32 {
        self.packed_width >> 16
    }

    pub fn height(&self) -> u32 {
        self.packed_height >> 16
    }

    pub fn light_triangles(&self) -> u32 {
        self.packed_width & 0xffff
    }

    pub fn bounce_limit(&self) -> u32 {
        self.packed_height & 0xf
    }

    /// Mirror of the grid update a control kernel performs for surviving paths.
    pub fn with_path_count(mut self, count: u32) -> Self {
        self.path_grid = GridDims::for_count(count);
        self
    }

    /// Mirror of the grid update a control kernel performs for queued shadow rays.
    pub fn with_shadow_count(mut self, count: u32) -> Self {
        self.shadow_grid = GridDims::for_count(count);
        self
    }

    /// Bytes uploaded to offset 0 of the config buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
