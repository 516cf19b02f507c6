//! Display buffer selection and the full-screen draw.

use super::commands::{AccumSlot, BindingKey, CommandList, Parity};
use super::denoise::output_slot;

/// Triangle strip covering the viewport.
pub const FULLSCREEN_STRIP_VERTICES: u32 = 4;

/// Fragment program used for presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayPipeline {
    /// Shows an accumulation slot.
    Temporal,
    /// Shows raw radiance averaged over the samples so far.
    Passthrough,
}

impl DisplayPipeline {
    pub const ALL: [DisplayPipeline; 2] = [Self::Temporal, Self::Passthrough];

    pub fn vertex_entry(self) -> &'static str {
        "vm"
    }

    pub fn fragment_entry(self) -> &'static str {
        match self {
            Self::Temporal => "m",
            Self::Passthrough => "m1",
        }
    }
}

/// Bind group and pipeline for the display draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplaySelection {
    pub binding: BindingKey,
    pub pipeline: DisplayPipeline,
}

/// Pick what to show for the current flags and parity.
pub fn select_display(filter: bool, reproj: bool, parity: Parity, iterations: u32) -> DisplaySelection {
    match output_slot(filter, reproj, parity, iterations) {
        Some(slot) => DisplaySelection {
            binding: BindingKey::Display(slot),
            pipeline: DisplayPipeline::Temporal,
        },
        // Passthrough ignores the slot binding; any display group satisfies the layout.
        None => DisplaySelection {
            binding: BindingKey::Display(AccumSlot::Slot0),
            pipeline: DisplayPipeline::Passthrough,
        },
    }
}

/// Records the display draw.
#[derive(Clone, Copy, Debug, Default)]
pub struct Presenter;

impl Presenter {
    pub fn encode(&self, selection: DisplaySelection, commands: &mut CommandList) {
        commands.draw(selection.pipeline, selection.binding, FULLSCREEN_STRIP_VERTICES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_when_denoiser_off() {
        for parity in [Parity::Zero, Parity::One] {
            let sel = select_display(false, false, parity, 4);
            assert_eq!(sel.pipeline, DisplayPipeline::Passthrough);
        }
    }

    #[test]
    fn test_reproj_only_shows_next() {
        let sel = select_display(false, true, Parity::Zero, 4);
        assert_eq!(sel.binding, BindingKey::Display(AccumSlot::Slot1));
        assert_eq!(sel.pipeline, DisplayPipeline::Temporal);

        let sel = select_display(false, true, Parity::One, 4);
        assert_eq!(sel.binding, BindingKey::Display(AccumSlot::Slot0));
    }

    #[test]
    fn test_filter_shows_last_iteration() {
        let sel = select_display(true, true, Parity::Zero, 4);
        assert_eq!(sel.binding, BindingKey::Display(AccumSlot::Slot2));
        let sel = select_display(true, true, Parity::One, 3);
        assert_eq!(sel.binding, BindingKey::Display(AccumSlot::Slot1));
    }

    #[test]
    fn test_presenter_draws_strip() {
        let mut list = CommandList::new();
        Presenter.encode(select_display(true, true, Parity::Zero, 4), &mut list);
        assert_eq!(list.draws().count(), 1);
        assert_eq!(
            list.commands()[0],
            crate::scheduler::commands::GpuCommand::Draw {
                pipeline: DisplayPipeline::Temporal,
                binding: BindingKey::Display(AccumSlot::Slot2),
                vertices: 4,
            }
        );
    }
}
