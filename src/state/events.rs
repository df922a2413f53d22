//! Time-stamped gameplay events stored per spectated player.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Anything that can be placed on a [`Timeline`](super::timeline::Timeline).
pub trait Timed {
    /// Playback time of the event in milliseconds.
    fn time(&self) -> i64;
}

/// Position of a cursor in playfield coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Build a position from raw coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Classification of a cursor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CursorKind {
    /// Press.
    Down,
    /// Movement while pressed or hovering.
    Move,
    /// Release. The cursor is lifted from the playfield.
    Up,
}

/// A single cursor sample belonging to one cursor group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSample {
    /// Playback time in milliseconds.
    pub time: i64,
    /// Cursor group (one per concurrent touch point).
    pub group_id: u32,
    /// Sampled position.
    pub position: Position,
    /// Movement kind.
    pub kind: CursorKind,
}

impl Timed for CursorSample {
    fn time(&self) -> i64 {
        self.time
    }
}

/// Scoring outcome of a single hit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HitResult {
    /// Object missed.
    Miss,
    /// Lowest non-miss judgement.
    Meh,
    /// Mid judgement.
    Ok,
    /// Good judgement.
    Good,
    /// Great judgement.
    Great,
    /// Best possible judgement.
    Perfect,
}

/// A hit judgement produced by the player's client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgementEvent {
    /// Playback time in milliseconds.
    pub time: i64,
    /// Judgement result.
    pub result: HitResult,
    /// Signed distance between the hit and the object's perfect time.
    pub accuracy_offset_ms: f64,
}

impl Timed for JudgementEvent {
    fn time(&self) -> i64 {
        self.time
    }
}

/// Cumulative statistic tracked with checkpoints and deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatKind {
    /// Total score.
    Score,
    /// Current combo.
    Combo,
    /// Accuracy in the `0..=1` range.
    Accuracy,
}

/// Value of a statistic at a given time. Used for both deltas and checkpoints;
/// the track it is stored in decides how it is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatSample {
    /// Playback time in milliseconds.
    pub time: i64,
    /// Absolute value for a checkpoint, increment for a delta.
    pub value: f64,
}

impl StatSample {
    /// Shorthand constructor.
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

impl Timed for StatSample {
    fn time(&self) -> i64 {
        self.time
    }
}
