//! Translate a [`CommandList`] into wgpu encoder calls.

use super::pipelines::Pipelines;
use super::resources::GpuResources;
use crate::scheduler::commands::{BufferId, CommandList, GpuCommand};

/// Colour the display pass clears to before the full-screen draw.
const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };

/// Record `commands` into `encoder`. Consecutive dispatches share one compute
/// pass; copies, clears and draws are recorded between passes.
pub fn encode_commands(
    encoder: &mut wgpu::CommandEncoder,
    commands: &CommandList,
    resources: &GpuResources,
    pipelines: &Pipelines,
    target: &wgpu::TextureView,
) {
    for segment in commands.segments() {
        if segment.first().is_some_and(GpuCommand::is_dispatch) {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("wavefront"),
                timestamp_writes: None,
            });
            for cmd in segment {
                match *cmd {
                    GpuCommand::Dispatch { kernel, binding, workgroups: [x, y, z] } => {
                        pass.set_pipeline(pipelines.compute(kernel));
                        pass.set_bind_group(0, resources.bind_group(binding), &[]);
                        pass.dispatch_workgroups(x, y, z);
                    }
                    GpuCommand::DispatchIndirect { kernel, binding, region } => {
                        pass.set_pipeline(pipelines.compute(kernel));
                        pass.set_bind_group(0, resources.bind_group(binding), &[]);
                        pass.dispatch_workgroups_indirect(resources.buffer(BufferId::Grid), region.offset());
                    }
                    // Segments never mix dispatches with other commands.
                    GpuCommand::Clear(_) | GpuCommand::Copy(_) | GpuCommand::Draw { .. } => {}
                }
            }
            continue;
        }

        for cmd in segment {
            match *cmd {
                GpuCommand::Clear(buffer) => encoder.clear_buffer(resources.buffer(buffer), 0, None),
                GpuCommand::Copy(c) => encoder.copy_buffer_to_buffer(
                    resources.buffer(c.src),
                    c.src_offset,
                    resources.buffer(c.dst),
                    c.dst_offset,
                    c.size,
                ),
                GpuCommand::Draw { pipeline, binding, vertices } => {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("display"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: target,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: None,
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    pass.set_pipeline(pipelines.display(pipeline));
                    pass.set_bind_group(0, resources.bind_group(binding), &[]);
                    pass.draw(0..vertices, 0..1);
                }
                GpuCommand::Dispatch { .. } | GpuCommand::DispatchIndirect { .. } => {}
            }
        }
    }
}
