// Collaborators around the solver: where edits come from and where frames go

use std::error::Error;

use serde::{Deserialize, Serialize};

use crate::{
    ObstacleMask, ScalarField,
    sim::{grid::Edit, tracer::Tracer},
};

pub mod imgstream;
pub mod raster;
pub mod window;

/// A borrowed view of the simulation after a completed step
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    pub density: &'a ScalarField,
    pub obstacles: &'a ObstacleMask,
    pub scale: usize,
    pub tracer: Tracer,
    pub index: usize,
}

/// An owned copy of a [`Frame`] that can cross threads
#[derive(Clone)]
pub struct FramePacket {
    pub density: ScalarField,
    pub obstacles: ObstacleMask,
    pub scale: usize,
    pub tracer: Tracer,
    pub index: usize,
}

impl FramePacket {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        FramePacket {
            density: frame.density.clone_owned(),
            obstacles: frame.obstacles.clone_owned(),
            scale: frame.scale,
            tracer: frame.tracer,
            index: frame.index,
        }
    }

    pub fn as_frame(&self) -> Frame<'_> {
        Frame {
            density: &self.density,
            obstacles: &self.obstacles,
            scale: self.scale,
            tracer: self.tracer,
            index: self.index,
        }
    }
}

/// Supplies user edits (in grid coordinates) before each step
pub trait EditSource {
    /// Edits to apply before the next step
    fn poll_edits(&mut self) -> Vec<Edit>;

    /// Whether the user asked to stop the frame loop
    fn wants_exit(&self) -> bool {
        false
    }
}

/// Consumes the fields after each step
pub trait FrameSink {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Pairs an independent edit source with a frame sink so both can drive a
/// single frame loop
pub struct Split<I, S> {
    pub input: I,
    pub sink: S,
}

impl<I: EditSource, S> EditSource for Split<I, S> {
    fn poll_edits(&mut self) -> Vec<Edit> {
        self.input.poll_edits()
    }

    fn wants_exit(&self) -> bool {
        self.input.wants_exit()
    }
}

impl<I, S: FrameSink> FrameSink for Split<I, S> {
    fn present(&mut self, frame: &Frame<'_>) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.sink.present(frame)
    }
}

/// An edit at a fixed frame of a scripted run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEdit {
    pub frame: usize,
    pub edit: Edit,
}

/// Replays a fixed schedule of edits; used for headless runs
pub struct ScriptedEdits {
    schedule: Vec<ScheduledEdit>,
    frame: usize,
}

impl ScriptedEdits {
    pub fn new(schedule: &[ScheduledEdit]) -> Self {
        ScriptedEdits {
            schedule: schedule.to_vec(),
            frame: 0,
        }
    }
}

impl EditSource for ScriptedEdits {
    fn poll_edits(&mut self) -> Vec<Edit> {
        let edits = self
            .schedule
            .iter()
            .filter(|s| s.frame == self.frame)
            .map(|s| s.edit)
            .collect();

        self.frame += 1;
        edits
    }
}
