//! Shader loading and pipeline creation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::resources::BindLayouts;
use super::SURFACE_FORMAT;
use crate::scheduler::commands::{ControlKernel, Kernel};
use crate::scheduler::layout::LayoutKind;
use crate::scheduler::present::DisplayPipeline;
use crate::util::{Error, Result};

/// Display shader file.
pub const BLIT_SHADER: &str = "blit.wgsl";

/// WGSL sources keyed by file name.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    sources: BTreeMap<&'static str, String>,
}

impl ShaderSet {
    /// Every file a pipeline needs.
    pub fn files() -> Vec<&'static str> {
        let mut files: Vec<_> = Kernel::ALL.iter().map(|k| k.shader_file()).collect();
        files.push(BLIT_SHADER);
        files.sort_unstable();
        files.dedup();
        files
    }

    /// Read all shader files from `dir`.
    #[tracing::instrument]
    pub fn load(dir: &Path) -> Result<Self> {
        let mut sources = BTreeMap::new();
        for file in Self::files() {
            let path: PathBuf = dir.join(file);
            let text = std::fs::read_to_string(&path).map_err(|source| Error::ShaderLoad { path, source })?;
            sources.insert(file, text);
        }
        tracing::info!("loaded {} shaders from {}", sources.len(), dir.display());
        Ok(Self { sources })
    }

    pub fn source(&self, file: &str) -> Option<&str> {
        self.sources.get(file).map(String::as_str)
    }
}

/// Compute and display pipelines, one per kernel / display mode.
pub struct Pipelines {
    generate: wgpu::ComputePipeline,
    intersect: wgpu::ComputePipeline,
    shade: wgpu::ComputePipeline,
    shadow: wgpu::ComputePipeline,
    control: [wgpu::ComputePipeline; 4],
    reproject: wgpu::ComputePipeline,
    variance: wgpu::ComputePipeline,
    filter: wgpu::ComputePipeline,
    temporal: wgpu::RenderPipeline,
    passthrough: wgpu::RenderPipeline,
}

fn control_index(kernel: ControlKernel) -> usize {
    match kernel {
        ControlKernel::UpdateGrids => 0,
        ControlKernel::ResetShadow => 1,
        ControlKernel::FinalizeSample => 2,
        ControlKernel::AdvanceFilterStep => 3,
    }
}

/// Run `f` inside a validation error scope and turn a captured error into
/// [`Error::ShaderCompile`].
fn checked<T>(device: &wgpu::Device, shader: &str, entry: &str, f: impl FnOnce() -> T) -> Result<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        None => Ok(value),
        Some(err) => Err(Error::ShaderCompile {
            shader: shader.to_string(),
            entry: entry.to_string(),
            message: err.to_string(),
        }),
    }
}

struct Builder<'a> {
    device: &'a wgpu::Device,
    layouts: &'a BindLayouts,
    modules: BTreeMap<&'static str, wgpu::ShaderModule>,
}

impl Builder<'_> {
    fn module(&self, file: &str) -> Result<&wgpu::ShaderModule> {
        self.modules
            .get(file)
            .ok_or_else(|| Error::other(format!("shader {file} was not loaded")))
    }

    fn layout(&self, kind: LayoutKind) -> wgpu::PipelineLayout {
        self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(kind.name()),
            bind_group_layouts: &[self.layouts.get(kind)],
            push_constant_ranges: &[],
        })
    }

    fn compute(&self, kernel: Kernel, layout: LayoutKind) -> Result<wgpu::ComputePipeline> {
        let file = kernel.shader_file();
        let entry = kernel.entry_point();
        let module = self.module(file)?;
        let layout = self.layout(layout);
        checked(self.device, file, entry, || {
            self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.name()),
                layout: Some(&layout),
                module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        })
    }

    fn display(&self, mode: DisplayPipeline) -> Result<wgpu::RenderPipeline> {
        let module = self.module(BLIT_SHADER)?;
        let layout = self.layout(LayoutKind::Display);
        checked(self.device, BLIT_SHADER, mode.fragment_entry(), || {
            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(match mode {
                    DisplayPipeline::Temporal => "display_temporal",
                    DisplayPipeline::Passthrough => "display_passthrough",
                }),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(mode.vertex_entry()),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(mode.fragment_entry()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: SURFACE_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }
}

impl Pipelines {
    /// Compile every shader module and build all pipelines. Any rejection is
    /// reported as [`Error::ShaderCompile`].
    #[tracing::instrument(skip_all)]
    pub fn new(device: &wgpu::Device, layouts: &BindLayouts, shaders: &ShaderSet) -> Result<Self> {
        let mut modules = BTreeMap::new();
        for file in ShaderSet::files() {
            let source = shaders
                .source(file)
                .ok_or_else(|| Error::other(format!("shader {file} missing from set")))?;
            let module = checked(device, file, "-", || {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(file),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })?;
            modules.insert(file, module);
        }

        let b = Builder { device, layouts, modules };
        let control = |k: ControlKernel| b.compute(Kernel::Control(k), LayoutKind::Control);

        let pipelines = Self {
            generate: b.compute(Kernel::Generate, LayoutKind::Generate)?,
            intersect: b.compute(Kernel::Intersect, LayoutKind::Intersect)?,
            shade: b.compute(Kernel::Shade, LayoutKind::Shade)?,
            shadow: b.compute(Kernel::Shadow, LayoutKind::Shadow)?,
            control: [
                control(ControlKernel::UpdateGrids)?,
                control(ControlKernel::ResetShadow)?,
                control(ControlKernel::FinalizeSample)?,
                control(ControlKernel::AdvanceFilterStep)?,
            ],
            reproject: b.compute(Kernel::Reproject, LayoutKind::Denoise)?,
            variance: b.compute(Kernel::Variance, LayoutKind::Denoise)?,
            filter: b.compute(Kernel::Filter, LayoutKind::Denoise)?,
            temporal: b.display(DisplayPipeline::Temporal)?,
            passthrough: b.display(DisplayPipeline::Passthrough)?,
        };
        tracing::info!("built {} compute and 2 display pipelines", Kernel::ALL.len());
        Ok(pipelines)
    }

    pub fn compute(&self, kernel: Kernel) -> &wgpu::ComputePipeline {
        match kernel {
            Kernel::Generate => &self.generate,
            Kernel::Intersect => &self.intersect,
            Kernel::Shade => &self.shade,
            Kernel::Shadow => &self.shadow,
            Kernel::Control(c) => &self.control[control_index(c)],
            Kernel::Reproject => &self.reproject,
            Kernel::Variance => &self.variance,
            Kernel::Filter => &self.filter,
        }
    }

    pub fn display(&self, mode: DisplayPipeline) -> &wgpu::RenderPipeline {
        match mode {
            DisplayPipeline::Temporal => &self.temporal,
            DisplayPipeline::Passthrough => &self.passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_files() {
        let files = ShaderSet::files();
        assert_eq!(files.len(), 7);
        for f in [
            "generate.wgsl",
            "intersect.wgsl",
            "shade.wgsl",
            "traceShadowRay.wgsl",
            "control.wgsl",
            "denoise.wgsl",
            "blit.wgsl",
        ] {
            assert!(files.contains(&f), "{f}");
        }
    }

    #[test]
    fn test_missing_shader_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShaderSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ShaderLoad { .. }));
        assert!(err.is_fatal_init());
    }

    #[test]
    fn test_load_all() {
        let dir = tempfile::tempdir().unwrap();
        for f in ShaderSet::files() {
            std::fs::write(dir.path().join(f), format!("// {f}")).unwrap();
        }
        let set = ShaderSet::load(dir.path()).unwrap();
        assert_eq!(set.source("blit.wgsl"), Some("// blit.wgsl"));
    }
}
