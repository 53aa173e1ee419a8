//! Deterministic collaborators for headless sessions and tests
//!
//! Each type replays a fixed script instead of reading live operator
//! input, so a whole refinement session can run without a window.

use std::collections::VecDeque;
use tracing::warn;

use crate::detection::Mask;
use crate::render::AnnotatedFrame;
use crate::{DamageResult, Result, ScanError};

use super::controls::{
    ActionPoll, Display, OperatorAction, ParameterSource, RawParameters, ResultSink,
};

/// Replays parameter sets, holding the last one once the script runs out
#[derive(Debug, Clone)]
pub struct ScriptedParameters {
    script: VecDeque<RawParameters>,
    current: RawParameters,
}

impl ScriptedParameters {
    pub fn new(script: impl IntoIterator<Item = RawParameters>) -> Self {
        Self {
            script: script.into_iter().collect(),
            current: RawParameters::default(),
        }
    }

    /// The same parameters on every read
    pub fn constant(parameters: RawParameters) -> Self {
        Self {
            script: VecDeque::new(),
            current: parameters,
        }
    }
}

impl ParameterSource for ScriptedParameters {
    fn read(&mut self) -> RawParameters {
        if let Some(next) = self.script.pop_front() {
            self.current = next;
        }
        self.current
    }
}

/// Replays operator actions, then reports `None` forever
#[derive(Debug, Clone, Default)]
pub struct ScriptedActions {
    script: VecDeque<OperatorAction>,
}

impl ScriptedActions {
    pub fn new(script: impl IntoIterator<Item = OperatorAction>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ActionPoll for ScriptedActions {
    fn poll(&mut self) -> OperatorAction {
        self.script.pop_front().unwrap_or_default()
    }
}

/// Keeps committed results in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Vec<(AnnotatedFrame, DamageResult)>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every save
    pub fn failing() -> Self {
        Self {
            saved: Vec::new(),
            fail: true,
        }
    }

    pub fn set_failing(&mut self, fail: bool) {
        self.fail = fail;
    }

    pub fn saved(&self) -> &[(AnnotatedFrame, DamageResult)] {
        &self.saved
    }

    pub fn results(&self) -> impl Iterator<Item = &DamageResult> {
        self.saved.iter().map(|(_, result)| result)
    }
}

impl ResultSink for MemorySink {
    fn save(&mut self, frame: &AnnotatedFrame, result: &DamageResult) -> Result<()> {
        if self.fail {
            return Err(ScanError::PersistenceFailure {
                message: "memory sink is set to fail".to_string(),
                source: None,
            });
        }
        self.saved.push((frame.clone(), result.clone()));
        Ok(())
    }
}

/// Records every frame, mask and reported failure
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    frames: Vec<AnnotatedFrame>,
    masks: Vec<Mask>,
    reported: Vec<String>,
    fail: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A display whose every render fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn frames(&self) -> &[AnnotatedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&AnnotatedFrame> {
        self.frames.last()
    }

    /// Classification masks in tick order
    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    /// Operator-facing messages of reported failures
    pub fn reported(&self) -> &[String] {
        &self.reported
    }
}

impl Display for RecordingDisplay {
    fn render(&mut self, frame: &AnnotatedFrame) -> Result<()> {
        if self.fail {
            return Err(ScanError::DisplayFailure {
                message: "recording display is set to fail".to_string(),
            });
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn render_mask(&mut self, mask: &Mask) -> Result<()> {
        self.masks.push(mask.clone());
        Ok(())
    }

    fn report(&mut self, error: &ScanError) {
        warn!(error = %error, "{}", error.user_message());
        self.reported.push(error.user_message());
    }
}

/// Discards frames; failures go to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn render(&mut self, _frame: &AnnotatedFrame) -> Result<()> {
        Ok(())
    }
}
