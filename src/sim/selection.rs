//! Hover-to-select input
//!
//! Tracks the single interactable under the controller ray. A trigger press
//! while hovering reports the pick to the sequencer and ends the stage.

use serde::{Deserialize, Serialize};

use super::stage::{StageEvent, StageSequencer};

/// Tag marking the right answer of a stage
pub const CORRECT_TAG: &str = "correct";

/// Something the pointer can hover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactable {
    pub id: u32,
    pub name: String,
    pub tag: String,
}

impl Interactable {
    pub fn new(id: u32, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tag: tag.into(),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.tag == CORRECT_TAG
    }
}

#[derive(Debug, Clone, Default)]
pub struct HoverSelector {
    hovered: Option<Interactable>,
}

impl HoverSelector {
    pub fn new() -> Self {
        Self { hovered: None }
    }

    pub fn hovered(&self) -> Option<&Interactable> {
        self.hovered.as_ref()
    }

    pub fn on_hover_enter(&mut self, target: Interactable) {
        self.hovered = Some(target);
    }

    /// Clears the hover only if `id` is the tracked object
    pub fn on_hover_exit(&mut self, id: u32) {
        if self.hovered.as_ref().is_some_and(|h| h.id == id) {
            self.hovered = None;
        }
    }

    /// Forget the hovered object, e.g. when its stage is hidden
    pub fn clear(&mut self) {
        self.hovered = None;
    }

    /// Trigger pressed this frame. Returns the event of the stage it ended.
    pub fn on_trigger_pressed(
        &self,
        sequencer: &mut StageSequencer,
        now: f64,
    ) -> Option<StageEvent> {
        let target = self.hovered.as_ref()?;
        let is_correct = target.is_correct();
        log::info!(
            "Selected {} ({})",
            target.name,
            if is_correct { "correct" } else { "wrong" }
        );

        sequencer.record_selection(&target.name, is_correct);
        sequencer.advance(now)
    }
}
