//! The per-frame driver: engine events in, one command buffer out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::window::Window;

use super::timing::FrameTiming;
use crate::engine::{self, Engine, EngineBridge, EngineEvent, EngineEvents};
use crate::gpu::{encode_commands, BindLayouts, GpuContext, GpuResources, Pipelines, ShaderSet};
use crate::scheduler::{FrameScheduler, ScheduleParams, SchedulerState};
use crate::settings::Settings;
use crate::util::{Error, Result};

/// Owns the device, the scheduler and the engine for one window.
pub struct FrameLoop {
    pub window: Arc<Window>,
    gpu: GpuContext,
    layouts: BindLayouts,
    pipelines: Pipelines,
    resources: Option<GpuResources>,
    scheduler: FrameScheduler,
    state: SchedulerState,
    engine: Box<dyn Engine>,
    bridge: EngineBridge,
    events: EngineEvents,
    export_path: PathBuf,
    look_velocity: f32,
    move_velocity: f32,
    start: Instant,
    timing: FrameTiming,
    warned_missing: bool,
}

impl FrameLoop {
    /// Bring up the device, build pipelines and initialize the engine.
    #[tracing::instrument(skip_all)]
    pub fn new(window: Arc<Window>, settings: &Settings, mut engine: Box<dyn Engine>) -> Result<Self> {
        let params = ScheduleParams::from_settings(settings)?;
        let gpu = GpuContext::new(window.clone(), params.width, params.height, settings.power_preference)?;
        let shaders = ShaderSet::load(&settings.shader_dir)?;
        let layouts = BindLayouts::new(&gpu.device);
        let pipelines = Pipelines::new(&gpu.device, &layouts, &shaders)?;

        let (bridge, events) = engine::channel();
        engine.init(&bridge)?;

        let mut this = Self {
            window,
            gpu,
            layouts,
            pipelines,
            resources: None,
            scheduler: FrameScheduler::new(params),
            state: SchedulerState::from_settings(settings),
            engine,
            bridge,
            events,
            export_path: settings.export_path.clone(),
            look_velocity: settings.cam_look_velocity,
            move_velocity: settings.cam_move_velocity,
            start: Instant::now(),
            timing: FrameTiming::default(),
            warned_missing: false,
        };
        // Resource requests and initial uploads from init
        this.drain_events();
        tracing::info!(
            "rendering {}x{}, {} bounces, {} spp",
            params.width,
            params.height,
            params.bounce_limit,
            params.samples_per_frame
        );
        Ok(this)
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn toggle_edit_mode(&mut self) {
        self.state.edit_mode = !self.state.edit_mode;
        tracing::info!("edit mode {}", if self.state.edit_mode { "on" } else { "off" });
    }

    fn handle(&mut self, event: EngineEvent) {
        if self.state.apply(&event) {
            return;
        }
        match event {
            EngineEvent::CreateResources(sizes) => {
                let p = *self.scheduler.params();
                self.resources = Some(GpuResources::new(&self.gpu.device, &self.layouts, p.width, p.height, sizes));
                self.state.reset_samples();
            }
            EngineEvent::WriteBuffer { buffer, offset, data } => {
                let result = match &self.resources {
                    Some(res) => res.write(&self.gpu.queue, buffer, offset, &data),
                    None => Err(Error::ResourcesMissing),
                };
                if let Err(e) = result {
                    tracing::warn!("dropped write to buffer {}: {e}", buffer.id());
                }
            }
            EngineEvent::SaveBinary(data) => match std::fs::write(&self.export_path, &data) {
                Ok(()) => tracing::info!("exported {} bytes to {}", data.len(), self.export_path.display()),
                Err(e) => tracing::warn!("export to {} failed: {e}", self.export_path.display()),
            },
            // Applied by SchedulerState
            EngineEvent::ResetSamples
            | EngineEvent::SetLightTriangleCount(_)
            | EngineEvent::ToggleConverge
            | EngineEvent::ToggleFilter
            | EngineEvent::ToggleReprojection => {}
        }
    }

    fn drain_events(&mut self) {
        for event in self.events.drain() {
            self.handle(event);
        }
    }

    /// Render and present one frame, then advance the engine.
    pub fn render_frame(&mut self) {
        let _span = tracing::info_span!("frame", index = self.state.frame_index).entered();

        self.drain_events();

        let Some(resources) = &self.resources else {
            if !self.warned_missing {
                tracing::warn!("engine has not requested GPU resources, nothing to render");
                self.warned_missing = true;
            }
            return;
        };

        let Some(frame) = self.gpu.acquire() else {
            return;
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let plan = self.scheduler.plan_frame(&mut self.state);
        resources.write_config(&self.gpu.queue, &plan.config);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("frame") });
        encode_commands(&mut encoder, &plan.commands, resources, &self.pipelines, &view);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();

        let time = self.start.elapsed().as_secs_f64();
        let finished = {
            let _span = tracing::debug_span!("engine_update").entered();
            self.engine.update(&self.bridge, time, self.state.converge, self.state.edit_mode)
        };
        self.scheduler.end_frame(&mut self.state, finished);

        if let Some(avg) = self.timing.tick(Instant::now()) {
            self.window.set_title(&FrameTiming::title(avg));
        }
    }

    pub fn mouse_move(&mut self, dx: f32, dy: f32) {
        self.engine.mouse_move(dx, dy, self.look_velocity);
    }

    pub fn key_down(&mut self, key: char) {
        self.engine.key_down(key, self.move_velocity);
    }
}
