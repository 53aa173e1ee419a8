//! Interactive refinement state machine
//!
//! A [`RefinementLoop`] owns one calibrated image and re-runs the
//! classify, extract, measure and render pipeline on every tick using the
//! operator's current parameters. The loop is either `Active` or
//! `Terminated`; only an operator action moves it between the two.

use tracing::{debug, info, warn};

use crate::calibration::CalibrationState;
use crate::color::ColorRange;
use crate::config::ScanConfig;
use crate::detection::{DamageClassifier, DenoiseParameter, Mask, RegionExtractor};
use crate::estimation::{AreaEstimator, AreaMeasurement};
use crate::image_loader::Image;
use crate::render::{AnnotatedFrame, FrameRenderer};
use crate::{constants, DamageResult, Result, ScanError};

use super::controls::{
    ActionPoll, Display, OperatorAction, ParameterSource, RawParameters, ResultSink,
};

/// Lifecycle of a refinement session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Active,
    Terminated,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Frame refreshed, no action taken
    Refined,
    /// Result saved by the sink
    Committed,
    /// Commit requested but nothing was saved
    CommitFailed,
    /// Session ended without saving
    Cancelled,
}

/// Measurements of the most recent tick
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    /// Validated parameters, `None` when the tick was degraded
    pub parameters: Option<(ColorRange, DenoiseParameter)>,
    pub measurement: AreaMeasurement,
    pub region_count: usize,
}

/// Counters accumulated over a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub ticks: u64,
    pub commits: u64,
    pub failed_commits: u64,
}

/// Refinement loop driven by injected collaborators
///
/// # Type Parameters
///
/// * `P` - slider positions
/// * `A` - operator actions
/// * `S` - where committed results go
/// * `D` - where frames and failures are shown
pub struct RefinementLoop<P, A, S, D> {
    image: Image,
    calibration: CalibrationState,
    classifier: DamageClassifier,
    extractor: RegionExtractor,
    estimator: AreaEstimator,
    renderer: FrameRenderer,
    max_denoise: u32,
    parameters: P,
    actions: A,
    sink: S,
    display: D,
    state: LoopState,
    report: SessionReport,
    last_cycle: Option<CycleSummary>,
}

impl<P, A, S, D> RefinementLoop<P, A, S, D>
where
    P: ParameterSource,
    A: ActionPoll,
    S: ResultSink,
    D: Display,
{
    /// Create an active session with default rendering
    ///
    /// # Errors
    ///
    /// Returns `ScanError::CalibrationMissing` if the calibration cannot
    /// produce a scale factor.
    pub fn new(
        image: Image,
        calibration: CalibrationState,
        parameters: P,
        actions: A,
        sink: S,
        display: D,
    ) -> Result<Self> {
        calibration.scale_factor()?;
        Ok(Self {
            image,
            calibration,
            classifier: DamageClassifier::new(),
            extractor: RegionExtractor::new(),
            estimator: AreaEstimator::new(),
            renderer: FrameRenderer::new(),
            max_denoise: constants::denoise::MAX_STRENGTH,
            parameters,
            actions,
            sink,
            display,
            state: LoopState::Active,
            report: SessionReport::default(),
            last_cycle: None,
        })
    }

    /// Create a session using the overlay and refinement settings of `config`
    pub fn from_config(
        config: &ScanConfig,
        image: Image,
        calibration: CalibrationState,
        parameters: P,
        actions: A,
        sink: S,
        display: D,
    ) -> Result<Self> {
        let renderer = FrameRenderer::from_config(&config.overlay)?;
        Ok(Self::new(image, calibration, parameters, actions, sink, display)?
            .with_renderer(renderer)
            .with_max_denoise(config.refinement.max_denoise))
    }

    pub fn with_renderer(mut self, renderer: FrameRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_max_denoise(mut self, max_denoise: u32) -> Self {
        self.max_denoise = max_denoise;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LoopState::Active
    }

    pub fn report(&self) -> SessionReport {
        self.report
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.calibration
    }

    pub fn last_cycle(&self) -> Option<&CycleSummary> {
        self.last_cycle.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Consume the loop, returning its collaborators
    pub fn into_parts(self) -> (P, A, S, D) {
        (self.parameters, self.actions, self.sink, self.display)
    }

    /// Run one refinement cycle and react to the operator's action
    ///
    /// # Errors
    ///
    /// Returns `ScanError::SessionTerminated` once the session has ended.
    /// Invalid parameters, display failures and failed commits are
    /// reported through the display and do not surface here.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        if self.state == LoopState::Terminated {
            return Err(ScanError::SessionTerminated);
        }
        self.report.ticks += 1;

        let raw = self.parameters.read();
        let parameters = match raw.resolve(self.max_denoise) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!(error = %e, "ignoring invalid parameters for this tick");
                None
            }
        };

        let mask = match &parameters {
            Some((range, denoise)) => self.classifier.classify(&self.image, range, *denoise),
            None => Mask::empty(self.image.width(), self.image.height()),
        };
        let measurement = self.estimator.measure(&mask, &self.calibration)?;
        let contours = self.extractor.extract(&mask);

        debug!(
            tick = self.report.ticks,
            regions = contours.len(),
            pixels = measurement.pixel_count,
            area = measurement.area,
            "refined"
        );

        if let Err(e) = self.display.render_mask(&mask) {
            self.display.report(&e);
        }
        let frame = self.renderer.render(&self.image, &contours, measurement.area);
        if let Err(e) = self.display.render(&frame) {
            self.display.report(&e);
        }

        let summary = CycleSummary {
            parameters,
            measurement,
            region_count: contours.len(),
        };

        let outcome = match self.actions.poll() {
            OperatorAction::None => TickOutcome::Refined,
            OperatorAction::Commit => self.commit(frame, &summary, &raw),
            OperatorAction::CommitAndExit => {
                let outcome = self.commit(frame, &summary, &raw);
                self.terminate();
                outcome
            }
            OperatorAction::Cancel => {
                self.terminate();
                TickOutcome::Cancelled
            }
        };

        self.last_cycle = Some(summary);
        Ok(outcome)
    }

    /// Tick until the operator ends the session
    pub fn run(&mut self) -> Result<SessionReport> {
        while self.state == LoopState::Active {
            self.tick()?;
        }
        Ok(self.report)
    }

    /// Tick until the session ends or `max_ticks` ticks have run
    pub fn run_with_limit(&mut self, max_ticks: u64) -> Result<SessionReport> {
        let mut remaining = max_ticks;
        while self.state == LoopState::Active && remaining > 0 {
            self.tick()?;
            remaining -= 1;
        }
        Ok(self.report)
    }

    fn commit(
        &mut self,
        mut frame: AnnotatedFrame,
        summary: &CycleSummary,
        raw: &RawParameters,
    ) -> TickOutcome {
        let Some((range, denoise)) = summary.parameters else {
            let error = ScanError::invalid_parameter("commit", format!("{:?}", raw));
            self.display.report(&error);
            self.report.failed_commits += 1;
            return TickOutcome::CommitFailed;
        };

        self.renderer.annotate_commit(&mut frame, &range);
        let result = DamageResult::new(summary.measurement, range, denoise);

        match self.sink.save(&frame, &result) {
            Ok(()) => {
                info!(
                    area = result.area,
                    pixels = result.pixel_count,
                    range = %range,
                    "committed result"
                );
                self.report.commits += 1;
                TickOutcome::Committed
            }
            Err(e) => {
                self.display.report(&e);
                self.report.failed_commits += 1;
                TickOutcome::CommitFailed
            }
        }
    }

    fn terminate(&mut self) {
        debug!(ticks = self.report.ticks, "session terminated");
        self.state = LoopState::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::scripted::{
        MemorySink, NullDisplay, RecordingDisplay, ScriptedActions, ScriptedParameters,
    };
    use image::{Rgb, RgbImage};

    /// Green field with a 10x10 red patch
    fn field() -> Image {
        let mut rgb = RgbImage::from_pixel(40, 40, Rgb([0, 160, 0]));
        for y in 10..20 {
            for x in 10..20 {
                rgb.put_pixel(x, y, Rgb([200, 0, 0]));
            }
        }
        Image::new(rgb)
    }

    fn red_parameters() -> RawParameters {
        RawParameters {
            hue_min: 0,
            hue_max: 10,
            saturation_min: 100,
            saturation_max: 255,
            value_min: 100,
            value_max: 255,
            blur: 0,
        }
    }

    fn session(
        actions: Vec<OperatorAction>,
        sink: MemorySink,
    ) -> RefinementLoop<ScriptedParameters, ScriptedActions, MemorySink, RecordingDisplay> {
        RefinementLoop::new(
            field(),
            CalibrationState::new(100, 2.5).unwrap(),
            ScriptedParameters::constant(red_parameters()),
            ScriptedActions::new(actions),
            sink,
            RecordingDisplay::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_refine_measures_damage() {
        let mut session = session(vec![], MemorySink::new());
        assert_eq!(session.tick().unwrap(), TickOutcome::Refined);

        let cycle = session.last_cycle().unwrap();
        assert_eq!(cycle.measurement.pixel_count, 100);
        assert_eq!(cycle.measurement.area, 2.5);
        assert_eq!(cycle.region_count, 1);
        assert_eq!(session.display().frames().len(), 1);
        assert!(session.is_active());
    }

    #[test]
    fn test_commit_saves_and_stays_active() {
        let mut session = session(vec![OperatorAction::Commit], MemorySink::new());
        assert_eq!(session.tick().unwrap(), TickOutcome::Committed);
        assert!(session.is_active());

        let (frame, result) = &session.sink().saved()[0];
        assert_eq!(result.pixel_count, 100);
        assert_eq!(result.area, 2.5);
        assert_eq!(frame.annotations.len(), 4);
        assert_eq!(frame.annotations[0].text, "Damage = 2.50m^2");
    }

    #[test]
    fn test_cancel_terminates_without_saving() {
        let mut session = session(vec![OperatorAction::Cancel], MemorySink::new());
        assert_eq!(session.tick().unwrap(), TickOutcome::Cancelled);
        assert_eq!(session.state(), LoopState::Terminated);
        assert!(session.sink().saved().is_empty());
        assert!(matches!(session.tick(), Err(ScanError::SessionTerminated)));
    }

    #[test]
    fn test_failed_commit_is_reported() {
        let mut session = session(
            vec![OperatorAction::Commit, OperatorAction::None],
            MemorySink::failing(),
        );
        assert_eq!(session.tick().unwrap(), TickOutcome::CommitFailed);
        assert!(session.is_active());
        assert_eq!(session.tick().unwrap(), TickOutcome::Refined);
        assert_eq!(session.display().reported().len(), 1);
        assert_eq!(session.report().failed_commits, 1);
    }

    #[test]
    fn test_commit_and_exit_terminates_even_on_failure() {
        let mut session = session(vec![OperatorAction::CommitAndExit], MemorySink::failing());
        assert_eq!(session.tick().unwrap(), TickOutcome::CommitFailed);
        assert_eq!(session.state(), LoopState::Terminated);
    }

    #[test]
    fn test_invalid_parameters_degrade_to_empty_mask() {
        let bad = RawParameters {
            hue_min: 90,
            hue_max: 10,
            ..red_parameters()
        };
        let mut session = RefinementLoop::new(
            field(),
            CalibrationState::new(100, 2.5).unwrap(),
            ScriptedParameters::new(vec![bad, red_parameters()]),
            ScriptedActions::new(vec![OperatorAction::Commit, OperatorAction::None]),
            MemorySink::new(),
            RecordingDisplay::new(),
        )
        .unwrap();

        assert_eq!(session.tick().unwrap(), TickOutcome::CommitFailed);
        let cycle = session.last_cycle().unwrap();
        assert!(cycle.parameters.is_none());
        assert_eq!(cycle.measurement.area, 0.0);
        assert!(session.sink().saved().is_empty());

        session.tick().unwrap();
        assert_eq!(session.last_cycle().unwrap().measurement.pixel_count, 100);
    }

    #[test]
    fn test_run_counts_ticks_until_cancel() {
        let mut session = session(
            vec![
                OperatorAction::None,
                OperatorAction::Commit,
                OperatorAction::None,
                OperatorAction::Cancel,
            ],
            MemorySink::new(),
        );
        let report = session.run().unwrap();
        assert_eq!(
            report,
            SessionReport {
                ticks: 4,
                commits: 1,
                failed_commits: 0
            }
        );
    }

    #[test]
    fn test_run_with_limit_stops_open_session() {
        let mut session = session(vec![], MemorySink::new());
        let report = session.run_with_limit(3).unwrap();
        assert_eq!(report.ticks, 3);
        assert!(session.is_active());
    }

    #[test]
    fn test_tick_shows_mask_matching_image() {
        let bad = RawParameters {
            blur: -3,
            ..red_parameters()
        };
        let mut session = RefinementLoop::new(
            field(),
            CalibrationState::new(100, 2.5).unwrap(),
            ScriptedParameters::new(vec![red_parameters(), bad]),
            ScriptedActions::new(vec![]),
            MemorySink::new(),
            RecordingDisplay::new(),
        )
        .unwrap();
        session.run_with_limit(2).unwrap();

        let masks = session.display().masks();
        assert_eq!(masks.len(), 2);
        assert_eq!(masks[0].dimensions(), (40, 40));
        assert_eq!(masks[0].count_foreground(), 100);
        assert!(masks[0].is_foreground(15, 15));
        assert_eq!(masks[1].dimensions(), (40, 40));
        assert!(masks[1].is_empty());
    }

    #[test]
    fn test_zero_calibration_rejected() {
        let result = RefinementLoop::new(
            field(),
            CalibrationState::new(0, 2.5).unwrap(),
            ScriptedParameters::constant(red_parameters()),
            ScriptedActions::new(vec![]),
            MemorySink::new(),
            NullDisplay,
        );
        assert!(matches!(result, Err(ScanError::CalibrationMissing)));
    }

    #[test]
    fn test_display_failure_is_not_fatal() {
        let mut session = RefinementLoop::new(
            field(),
            CalibrationState::new(100, 2.5).unwrap(),
            ScriptedParameters::constant(red_parameters()),
            ScriptedActions::new(vec![OperatorAction::Commit]),
            MemorySink::new(),
            RecordingDisplay::failing(),
        )
        .unwrap();
        assert_eq!(session.tick().unwrap(), TickOutcome::Committed);
        assert_eq!(session.display().reported().len(), 1);
    }
}
