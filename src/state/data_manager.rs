use std::collections::BTreeMap;

use crate::state::{
    event_manager::SpectatorEventManager,
    events::{CursorKind, CursorSample, JudgementEvent, Position, StatKind, StatSample},
    mods::{BeatmapAttributes, DerivedParameters, GameMod},
    stat_track::CheckpointedStatTrack,
};

/// Consolidated view of one player at a point in time. Every field is the
/// last known value; nothing is interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    /// Player identifier.
    pub uid: u32,
    /// Query time in milliseconds.
    pub time: i64,
    /// Position per cursor group; `None` while lifted or before the first sample.
    pub cursors: BTreeMap<u32, Option<Position>>,
    /// Latest judgement at or before `time`.
    pub last_judgement: Option<JudgementEvent>,
    /// Reconstructed score.
    pub score: Option<f64>,
    /// Reconstructed combo.
    pub combo: Option<f64>,
    /// Reconstructed accuracy.
    pub accuracy: Option<f64>,
}

/// Number of stored events per category, used for room summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    /// Cursor samples across every group.
    pub cursor_samples: usize,
    /// Hit judgements.
    pub judgements: usize,
    /// Stat checkpoints across every statistic.
    pub checkpoints: usize,
    /// Stat deltas across every statistic.
    pub deltas: usize,
}

/// Owns every spectated category of a single player.
#[derive(Debug, Clone)]
pub struct SpectatorDataManager {
    uid: u32,
    username: String,
    team: Option<u8>,
    mods: Vec<GameMod>,
    derived: DerivedParameters,
    cursors: BTreeMap<u32, SpectatorEventManager<CursorSample>>,
    judgements: SpectatorEventManager<JudgementEvent>,
    score: CheckpointedStatTrack,
    combo: CheckpointedStatTrack,
    accuracy: CheckpointedStatTrack,
}

impl SpectatorDataManager {
    /// Create the session for a freshly joined player.
    pub fn new(
        uid: u32,
        username: Option<String>,
        team: Option<u8>,
        base: &BeatmapAttributes,
    ) -> Self {
        Self {
            uid,
            username: username.unwrap_or_else(|| format!("player {uid}")),
            team,
            mods: Vec::new(),
            derived: DerivedParameters::compute(&[], base),
            cursors: BTreeMap::new(),
            judgements: SpectatorEventManager::new(),
            score: CheckpointedStatTrack::new(),
            combo: CheckpointedStatTrack::new(),
            accuracy: CheckpointedStatTrack::new(),
        }
    }

    /// Player identifier.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    /// Display name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Team assignment in team-versus rooms.
    pub fn team(&self) -> Option<u8> {
        self.team
    }

    /// Currently selected mods.
    pub fn mods(&self) -> &[GameMod] {
        &self.mods
    }

    /// Parameters derived from the current mods.
    pub fn derived(&self) -> &DerivedParameters {
        &self.derived
    }

    /// Route a cursor sample to its group, creating the group on first sight.
    pub fn add_cursor(&mut self, sample: CursorSample) {
        self.cursors.entry(sample.group_id).or_default().add(sample);
    }

    /// Record a hit judgement.
    pub fn add_judgement(&mut self, event: JudgementEvent) {
        self.judgements.add(event);
    }

    /// Record an exact increment of a statistic.
    pub fn add_stat_delta(&mut self, kind: StatKind, sample: StatSample) {
        self.track_mut(kind).add_delta(sample);
    }

    /// Record an authoritative value of a statistic.
    pub fn add_stat_checkpoint(&mut self, kind: StatKind, sample: StatSample) {
        self.track_mut(kind).add_checkpoint(sample);
    }

    /// Replace the mods and recompute derived parameters from scratch.
    pub fn set_mods(&mut self, mods: Vec<GameMod>, base: &BeatmapAttributes) {
        self.derived = DerivedParameters::compute(&mods, base);
        self.mods = mods;
    }

    /// Recompute derived parameters against new beatmap attributes.
    pub fn rebase(&mut self, base: &BeatmapAttributes) {
        self.derived = DerivedParameters::compute(&self.mods, base);
    }

    /// Empty every category while keeping identity and mods.
    pub fn clear(&mut self) {
        self.cursors.values_mut().for_each(SpectatorEventManager::clear);
        self.judgements.clear();
        self.score.clear();
        self.combo.clear();
        self.accuracy.clear();
    }

    /// Latest cursor sample of one group at or before `time`.
    pub fn cursor_at(&self, group_id: u32, time: i64) -> Option<&CursorSample> {
        self.cursors.get(&group_id)?.event_at(time)
    }

    /// Reconstructed value of a statistic at `time`.
    pub fn stat_at(&self, kind: StatKind, time: i64) -> Option<f64> {
        self.track(kind).value_at(time)
    }

    /// Consolidated state at `time`.
    pub fn snapshot(&self, time: i64) -> PlayerSnapshot {
        let cursors = self
            .cursors
            .iter()
            .map(|(&group_id, manager)| {
                let position = manager
                    .event_at(time)
                    .filter(|sample| sample.kind != CursorKind::Up)
                    .map(|sample| sample.position);
                (group_id, position)
            })
            .collect();

        PlayerSnapshot {
            uid: self.uid,
            time,
            cursors,
            last_judgement: self.judgements.event_at(time).copied(),
            score: self.score.value_at(time),
            combo: self.combo.value_at(time),
            accuracy: self.accuracy.value_at(time),
        }
    }

    /// Stored event counts per category.
    pub fn event_counts(&self) -> EventCounts {
        let tracks = [&self.score, &self.combo, &self.accuracy];
        EventCounts {
            cursor_samples: self.cursors.values().map(SpectatorEventManager::len).sum(),
            judgements: self.judgements.len(),
            checkpoints: tracks.iter().map(|t| t.checkpoint_count()).sum(),
            deltas: tracks.iter().map(|t| t.delta_count()).sum(),
        }
    }

    /// Whether every category is empty.
    pub fn is_empty(&self) -> bool {
        self.event_counts() == EventCounts::default()
    }

    fn track(&self, kind: StatKind) -> &CheckpointedStatTrack {
        match kind {
            StatKind::Score => &self.score,
            StatKind::Combo => &self.combo,
            StatKind::Accuracy => &self.accuracy,
        }
    }

    fn track_mut(&mut self, kind: StatKind) -> &mut CheckpointedStatTrack {
        match kind {
            StatKind::Score => &mut self.score,
            StatKind::Combo => &mut self.combo,
            StatKind::Accuracy => &mut self.accuracy,
        }
    }
}
