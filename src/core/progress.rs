//! Progress callback contract
//!
//! Long-running operations report through an optional callback; the core
//! never writes progress to stdout, stderr or files itself. The level is
//! purely a rate contract:
//!
//! - `minimal`: start and end only
//! - `normal`: each 10% milestone
//! - `detailed`: every accepted iteration
//! - `debug`: every proposal

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationEvent {
    /// Iterations completed so far (0 at start).
    pub iteration: usize,
    /// Estimated total iterations (the configured cap).
    pub total_estimate: usize,
    /// Score of the current snapshot.
    pub current_score: f64,
    /// Best score seen so far.
    pub best_score: f64,
    /// Algorithm-specific extras (e.g. temperature, generation).
    pub extras: BTreeMap<String, f64>,
}

/// Emission rate of the progress callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressLevel {
    /// Start and end only.
    Minimal,
    /// Each 10% milestone.
    #[default]
    Normal,
    /// Every accepted iteration.
    Detailed,
    /// Every proposal.
    Debug,
}

impl FromStr for ProgressLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "normal" => Ok(Self::Normal),
            "detailed" => Ok(Self::Detailed),
            "debug" => Ok(Self::Debug),
            other => Err(format!(
                "log level must be minimal|normal|detailed|debug, got: {other}"
            )),
        }
    }
}

impl fmt::Display for ProgressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Minimal => "minimal",
            Self::Normal => "normal",
            Self::Detailed => "detailed",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Progress sink handed to every algorithm run.
pub struct ProgressSink<'a> {
    level: ProgressLevel,
    callback: Option<&'a mut dyn FnMut(&IterationEvent)>,
    next_milestone: usize,
}

impl fmt::Debug for ProgressSink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("level", &self.level)
            .field("attached", &self.callback.is_some())
            .finish()
    }
}

impl Default for ProgressSink<'_> {
    fn default() -> Self {
        Self::disabled()
    }
}

impl<'a> ProgressSink<'a> {
    /// A sink that never fires.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            level: ProgressLevel::Minimal,
            callback: None,
            next_milestone: 0,
        }
    }

    /// A sink calling `callback` at the given rate.
    pub fn new(level: ProgressLevel, callback: &'a mut dyn FnMut(&IterationEvent)) -> Self {
        Self {
            level,
            callback: Some(callback),
            next_milestone: 0,
        }
    }

    /// The configured rate.
    #[must_use]
    pub fn level(&self) -> ProgressLevel {
        self.level
    }

    /// Fire the start-of-run event (all levels).
    pub fn start(&mut self, event: &IterationEvent) {
        self.next_milestone = 1;
        self.fire(event);
    }

    /// Report an accepted iteration. Fires at `detailed` and `debug`
    /// always, at `normal` when a 10% milestone is crossed.
    pub fn accepted(&mut self, event: &IterationEvent) {
        match self.level {
            ProgressLevel::Minimal => {}
            ProgressLevel::Normal => {
                if event.total_estimate == 0 {
                    return;
                }
                let milestone = event.iteration * 10 / event.total_estimate;
                if milestone >= self.next_milestone {
                    self.next_milestone = milestone + 1;
                    self.fire(event);
                }
            }
            ProgressLevel::Detailed | ProgressLevel::Debug => self.fire(event),
        }
    }

    /// Report a proposal (accepted or not). Fires at `debug` only.
    pub fn proposal(&mut self, event: &IterationEvent) {
        if self.level == ProgressLevel::Debug {
            self.fire(event);
        }
    }

    /// Fire the end-of-run event (all levels).
    pub fn finish(&mut self, event: &IterationEvent) {
        self.fire(event);
    }

    fn fire(&mut self, event: &IterationEvent) {
        if let Some(callback) = self.callback.as_mut() {
            callback(event);
        }
    }
}
