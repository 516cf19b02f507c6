//! Typed command stream produced by the scheduler.
//!
//! Every buffer, kernel and bind group is addressed by a tagged enum, so the
//! GPU backend resolves them with exhaustive matches and tests can inspect a
//! frame without a device.

use std::fmt;

use super::compaction::IndirectRegion;
use super::present::DisplayPipeline;

/// One of the two path state buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathSlot {
    Zero,
    One,
}

impl PathSlot {
    /// Input slot of bounce `j`: `j mod 2`.
    pub fn for_bounce(j: u32) -> Self {
        if j % 2 == 0 {
            Self::Zero
        } else {
            Self::One
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

/// Frame parity bit (`accumIdx`), also used to pick a moments/history buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Parity {
    #[default]
    Zero,
    One,
}

impl Parity {
    pub fn flip(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// Accumulation slot with the same index.
    pub fn slot(self) -> AccumSlot {
        match self {
            Self::Zero => AccumSlot::Slot0,
            Self::One => AccumSlot::Slot1,
        }
    }
}

/// Accumulation buffers: two parity slots plus a scratch slot for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccumSlot {
    Slot0,
    Slot1,
    Slot2,
}

impl AccumSlot {
    pub const ALL: [AccumSlot; 3] = [Self::Slot0, Self::Slot1, Self::Slot2];

    pub fn index(self) -> usize {
        match self {
            Self::Slot0 => 0,
            Self::Slot1 => 1,
            Self::Slot2 => 2,
        }
    }
}

/// Ordered (read, write) pair of distinct accumulation slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccumPair {
    src: AccumSlot,
    dst: AccumSlot,
}

impl AccumPair {
    /// All six ordered pairs; one denoise bind group exists per entry.
    pub const ALL: [AccumPair; 6] = [
        Self::pair(AccumSlot::Slot0, AccumSlot::Slot1),
        Self::pair(AccumSlot::Slot1, AccumSlot::Slot0),
        Self::pair(AccumSlot::Slot1, AccumSlot::Slot2),
        Self::pair(AccumSlot::Slot0, AccumSlot::Slot2),
        Self::pair(AccumSlot::Slot2, AccumSlot::Slot0),
        Self::pair(AccumSlot::Slot2, AccumSlot::Slot1),
    ];

    /// Slots must differ; a kernel never reads and writes the same slot.
    pub(crate) const fn pair(src: AccumSlot, dst: AccumSlot) -> Self {
        debug_assert!(src as u8 != dst as u8, "accumulation pair reads and writes one slot");
        Self { src, dst }
    }

    pub fn src(self) -> AccumSlot {
        self.src
    }

    pub fn dst(self) -> AccumSlot {
        self.dst
    }

    /// Position in [`AccumPair::ALL`].
    pub fn index(self) -> usize {
        match (self.src, self.dst) {
            (AccumSlot::Slot0, AccumSlot::Slot1) => 0,
            (AccumSlot::Slot1, AccumSlot::Slot0) => 1,
            (AccumSlot::Slot1, AccumSlot::Slot2) => 2,
            (AccumSlot::Slot0, AccumSlot::Slot2) => 3,
            (AccumSlot::Slot2, AccumSlot::Slot0) => 4,
            (AccumSlot::Slot2, AccumSlot::Slot1) => 5,
            (AccumSlot::Slot0, AccumSlot::Slot0)
            | (AccumSlot::Slot1, AccumSlot::Slot1)
            | (AccumSlot::Slot2, AccumSlot::Slot2) => unreachable!("aliasing accumulation pair {self}"),
        }
    }

    /// Moments/history direction `(read, write)` for this pair. Pairs between
    /// the two parity slots carry moments along; the rest bind them unused.
    pub fn moments(self) -> (Parity, Parity) {
        match (self.src, self.dst) {
            (AccumSlot::Slot1, AccumSlot::Slot0) => (Parity::One, Parity::Zero),
            _ => (Parity::Zero, Parity::One),
        }
    }
}

impl fmt::Display for AccumPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acc{}->acc{}", self.src.index(), self.dst.index())
    }
}

/// Every device buffer the scheduler touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    // Scene, owned by the engine
    Camera,
    Materials,
    Instances,
    Triangles,
    TriangleNormals,
    LightTriangles,
    Nodes,
    // Frame state
    Config,
    Grid,
    // Wavefront
    Path(PathSlot),
    ShadowRays,
    Hits,
    Radiance,
    // Denoiser
    Attributes,
    LastAttributes,
    LastCamera,
    Accum(AccumSlot),
    Moments(Parity),
    History(Parity),
}

impl BufferId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Materials => "materials",
            Self::Instances => "instances",
            Self::Triangles => "triangles",
            Self::TriangleNormals => "triangle normals",
            Self::LightTriangles => "light triangles",
            Self::Nodes => "nodes",
            Self::Config => "config",
            Self::Grid => "grid",
            Self::Path(PathSlot::Zero) => "path0",
            Self::Path(PathSlot::One) => "path1",
            Self::ShadowRays => "shadow rays",
            Self::Hits => "hits",
            Self::Radiance => "radiance",
            Self::Attributes => "attributes",
            Self::LastAttributes => "last attributes",
            Self::LastCamera => "last camera",
            Self::Accum(AccumSlot::Slot0) => "acc0",
            Self::Accum(AccumSlot::Slot1) => "acc1",
            Self::Accum(AccumSlot::Slot2) => "acc2",
            Self::Moments(Parity::Zero) => "moments0",
            Self::Moments(Parity::One) => "moments1",
            Self::History(Parity::Zero) => "history0",
            Self::History(Parity::One) => "history1",
        }
    }
}

/// Variants of the single-thread control kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlKernel {
    /// Recompute path and shadow grids from the counters shading produced.
    UpdateGrids,
    /// Zero the shadow ray counter between bounces.
    ResetShadow,
    /// Last bounce: zero both counters, bump the sample index, reseed paths.
    FinalizeSample,
    /// Advance the filter step width.
    AdvanceFilterStep,
}

impl ControlKernel {
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::UpdateGrids => "m",
            Self::ResetShadow => "m1",
            Self::FinalizeSample => "m2",
            Self::AdvanceFilterStep => "m3",
        }
    }

    /// Whether this kernel rewrites the grid words of `region` in the config.
    pub fn mutates(self, region: IndirectRegion) -> bool {
        match (self, region) {
            (Self::UpdateGrids, _) => true,
            (Self::FinalizeSample, _) => true,
            (Self::ResetShadow, IndirectRegion::Shadow) => true,
            (Self::ResetShadow, IndirectRegion::Path) => false,
            (Self::AdvanceFilterStep, _) => false,
        }
    }
}

/// Compute kernels, one pipeline each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    Generate,
    Intersect,
    Shade,
    Shadow,
    Control(ControlKernel),
    Reproject,
    Variance,
    Filter,
}

impl Kernel {
    pub const ALL: [Kernel; 11] = [
        Self::Generate,
        Self::Intersect,
        Self::Shade,
        Self::Shadow,
        Self::Control(ControlKernel::UpdateGrids),
        Self::Control(ControlKernel::ResetShadow),
        Self::Control(ControlKernel::FinalizeSample),
        Self::Control(ControlKernel::AdvanceFilterStep),
        Self::Reproject,
        Self::Variance,
        Self::Filter,
    ];

    /// Shader file, relative to the shader directory.
    pub fn shader_file(self) -> &'static str {
        match self {
            Self::Generate => "generate.wgsl",
            Self::Intersect => "intersect.wgsl",
            Self::Shade => "shade.wgsl",
            Self::Shadow => "traceShadowRay.wgsl",
            Self::Control(_) => "control.wgsl",
            Self::Reproject | Self::Variance | Self::Filter => "denoise.wgsl",
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Generate | Self::Intersect | Self::Shade | Self::Shadow => "m",
            Self::Control(c) => c.entry_point(),
            Self::Reproject => "m",
            Self::Variance => "m1",
            Self::Filter => "m2",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Intersect => "intersect",
            Self::Shade => "shade",
            Self::Shadow => "shadow",
            Self::Control(ControlKernel::UpdateGrids) => "control/update",
            Self::Control(ControlKernel::ResetShadow) => "control/reset",
            Self::Control(ControlKernel::FinalizeSample) => "control/finalize",
            Self::Control(ControlKernel::AdvanceFilterStep) => "control/step",
            Self::Reproject => "reproject",
            Self::Variance => "variance",
            Self::Filter => "filter",
        }
    }
}

/// Bind group selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingKey {
    Generate,
    Intersect(PathSlot),
    Shade(PathSlot),
    Shadow,
    Control,
    Denoise(AccumPair),
    Display(AccumSlot),
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Intersect(s) => write!(f, "intersect[path{}]", s.index()),
            Self::Shade(s) => write!(f, "shade[path{}->path{}]", s.index(), s.other().index()),
            Self::Shadow => write!(f, "shadow"),
            Self::Control => write!(f, "control"),
            Self::Denoise(p) => write!(f, "denoise[{p}]"),
            Self::Display(s) => write!(f, "display[acc{}]", s.index()),
        }
    }
}

/// Buffer-to-buffer copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferCopy {
    pub src: BufferId,
    pub src_offset: u64,
    pub dst: BufferId,
    pub dst_offset: u64,
    pub size: u64,
}

/// One recorded GPU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpuCommand {
    /// Zero a whole buffer.
    Clear(BufferId),
    Copy(BufferCopy),
    /// Host-sized dispatch.
    Dispatch {
        kernel: Kernel,
        binding: BindingKey,
        workgroups: [u32; 3],
    },
    /// Dispatch sized by a region of the grid buffer.
    DispatchIndirect {
        kernel: Kernel,
        binding: BindingKey,
        region: IndirectRegion,
    },
    /// Full-screen draw into the swap chain image.
    Draw {
        pipeline: DisplayPipeline,
        binding: BindingKey,
        vertices: u32,
    },
}

impl GpuCommand {
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch { .. } | Self::DispatchIndirect { .. })
    }

    pub fn kernel(&self) -> Option<Kernel> {
        match self {
            Self::Dispatch { kernel, .. } | Self::DispatchIndirect { kernel, .. } => Some(*kernel),
            Self::Clear(_) | Self::Copy(_) | Self::Draw { .. } => None,
        }
    }

    pub fn binding(&self) -> Option<BindingKey> {
        match self {
            Self::Dispatch { binding, .. }
            | Self::DispatchIndirect { binding, .. }
            | Self::Draw { binding, .. } => Some(*binding),
            Self::Clear(_) | Self::Copy(_) => None,
        }
    }
}

impl fmt::Display for GpuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clear(b) => write!(f, "clear {}", b.name()),
            Self::Copy(c) => write!(
                f,
                "copy {}+{} -> {}+{} ({} bytes)",
                c.src.name(),
                c.src_offset,
                c.dst.name(),
                c.dst_offset,
                c.size
            ),
            Self::Dispatch { kernel, binding, workgroups: [x, y, z] } => {
                write!(f, "dispatch {} {binding} ({x}, {y}, {z})", kernel.name())
            }
            Self::DispatchIndirect { kernel, binding, region } => {
                write!(f, "dispatch {} {binding} indirect @{}", kernel.name(), region.offset())
            }
            Self::Draw { pipeline, binding, vertices } => {
                write!(f, "draw {pipeline:?} {binding} {vertices} vertices")
            }
        }
    }
}

/// Ordered commands for one displayed frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandList {
    commands: Vec<GpuCommand>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: GpuCommand) {
        self.commands.push(cmd);
    }

    pub fn clear_buffer(&mut self, buffer: BufferId) {
        self.push(GpuCommand::Clear(buffer));
    }

    pub fn copy(&mut self, src: BufferId, src_offset: u64, dst: BufferId, dst_offset: u64, size: u64) {
        self.push(GpuCommand::Copy(BufferCopy { src, src_offset, dst, dst_offset, size }));
    }

    pub fn dispatch(&mut self, kernel: Kernel, binding: BindingKey, workgroups: [u32; 3]) {
        self.push(GpuCommand::Dispatch { kernel, binding, workgroups });
    }

    pub fn dispatch_indirect(&mut self, kernel: Kernel, binding: BindingKey, region: IndirectRegion) {
        self.push(GpuCommand::DispatchIndirect { kernel, binding, region });
    }

    /// Single-thread control dispatch.
    pub fn control(&mut self, kernel: ControlKernel) {
        self.dispatch(Kernel::Control(kernel), BindingKey::Control, [1, 1, 1]);
    }

    pub fn draw(&mut self, pipeline: DisplayPipeline, binding: BindingKey, vertices: u32) {
        self.push(GpuCommand::Draw { pipeline, binding, vertices });
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Runs of consecutive dispatches share one compute pass; every other
    /// command stands alone between passes.
    pub fn segments(&self) -> impl Iterator<Item = &[GpuCommand]> {
        self.commands.chunk_by(|a, b| a.is_dispatch() && b.is_dispatch())
    }

    pub fn compute_passes(&self) -> usize {
        self.segments().filter(|s| s.first().is_some_and(GpuCommand::is_dispatch)).count()
    }

    /// Dispatches of `kernel`, direct or indirect.
    pub fn dispatches_of(&self, kernel: Kernel) -> usize {
        self.commands.iter().filter(|c| c.kernel() == Some(kernel)).count()
    }

    pub fn dispatch_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_dispatch()).count()
    }

    pub fn draws(&self) -> impl Iterator<Item = &GpuCommand> {
        self.commands.iter().filter(|c| matches!(c, GpuCommand::Draw { .. }))
    }

    pub fn clears(&self, buffer: BufferId) -> bool {
        self.commands.iter().any(|c| *c == GpuCommand::Clear(buffer))
    }

    pub fn copies(&self) -> impl Iterator<Item = &BufferCopy> {
        self.commands.iter().filter_map(|c| match c {
            GpuCommand::Copy(copy) => Some(copy),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_slot_alternates() {
        for j in 0..8 {
            let s = PathSlot::for_bounce(j);
            assert_eq!(s.index(), (j % 2) as usize);
            assert_ne!(s, s.other());
        }
    }

    #[test]
    fn test_accum_pairs() {
        for (i, pair) in AccumPair::ALL.iter().enumerate() {
            assert_ne!(pair.src(), pair.dst());
            assert_eq!(pair.index(), i);
        }
    }

    #[test]
    #[should_panic(expected = "reads and writes one slot")]
    fn test_aliasing_pair_rejected() {
        let _ = AccumPair::pair(AccumSlot::Slot1, AccumSlot::Slot1);
    }

    #[test]
    fn test_moments_follow_parity_pairs() {
        let fwd = AccumPair::pair(AccumSlot::Slot0, AccumSlot::Slot1);
        let back = AccumPair::pair(AccumSlot::Slot1, AccumSlot::Slot0);
        assert_eq!(fwd.moments(), (Parity::Zero, Parity::One));
        assert_eq!(back.moments(), (Parity::One, Parity::Zero));
    }

    #[test]
    fn test_control_mutation_table() {
        use IndirectRegion::*;
        assert!(ControlKernel::UpdateGrids.mutates(Path));
        assert!(ControlKernel::UpdateGrids.mutates(Shadow));
        assert!(!ControlKernel::ResetShadow.mutates(Path));
        assert!(ControlKernel::ResetShadow.mutates(Shadow));
        assert!(ControlKernel::FinalizeSample.mutates(Path));
        assert!(!ControlKernel::AdvanceFilterStep.mutates(Path));
        assert!(!ControlKernel::AdvanceFilterStep.mutates(Shadow));
    }

    #[test]
    fn test_segments_split_at_copies() {
        let mut list = CommandList::new();
        list.copy(BufferId::Config, 16, BufferId::Grid, 0, 32);
        list.dispatch(Kernel::Generate, BindingKey::Generate, [1, 1, 1]);
        list.dispatch_indirect(Kernel::Intersect, BindingKey::Intersect(PathSlot::Zero), IndirectRegion::Path);
        list.copy(BufferId::Config, 16, BufferId::Grid, 0, 32);
        list.control(ControlKernel::ResetShadow);

        let segments: Vec<_> = list.segments().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[1].len(), 2);
        assert_eq!(list.compute_passes(), 2);
        assert_eq!(list.dispatch_count(), 3);
        assert_eq!(list.dispatches_of(Kernel::Intersect), 1);
    }
}
