//! Gameplay mods and the parameters derived from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Upper bound for every difficulty attribute.
const MAX_ATTRIBUTE: f32 = 10.0;
/// Circle size multiplier applied by Hard Rock.
const HARD_ROCK_CS: f32 = 1.3;
/// Approach rate and overall difficulty multiplier applied by Hard Rock.
const HARD_ROCK_RATIO: f32 = 1.4;
/// Multiplier applied to every attribute by Easy.
const EASY_RATIO: f32 = 0.5;
/// Default clock rate for Double Time / Nightcore.
const DOUBLE_TIME_RATE: f64 = 1.5;
/// Default clock rate for Half Time / Daycore.
const HALF_TIME_RATE: f64 = 0.75;

/// Static difficulty attributes of a beatmap as reported by the beatmap collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BeatmapAttributes {
    /// Circle size.
    pub cs: f32,
    /// Approach rate.
    pub ar: f32,
    /// Overall difficulty.
    pub od: f32,
    /// HP drain.
    pub hp: f32,
}

impl BeatmapAttributes {
    /// Attributes pulled into the `0..=10` range every formula assumes.
    pub fn clamped(&self) -> Self {
        Self {
            cs: clamp_attribute(self.cs),
            ar: clamp_attribute(self.ar),
            od: clamp_attribute(self.od),
            hp: clamp_attribute(self.hp),
        }
    }
}

impl Default for BeatmapAttributes {
    fn default() -> Self {
        Self {
            cs: 5.0,
            ar: 5.0,
            od: 5.0,
            hp: 5.0,
        }
    }
}

/// Free-form settings attached to a mod. Only the fields used for derivation are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModSettings {
    /// Clock rate override for rate-changing mods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_change: Option<f64>,
    /// Forced circle size (difficulty adjust).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_size: Option<f32>,
    /// Forced approach rate (difficulty adjust).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approach_rate: Option<f32>,
    /// Forced overall difficulty (difficulty adjust).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_difficulty: Option<f32>,
}

/// A mod selected by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GameMod {
    /// Short acronym such as `HR` or `DT`.
    pub acronym: String,
    /// Optional customisation.
    #[serde(default)]
    pub settings: ModSettings,
}

impl GameMod {
    /// Mod without settings.
    pub fn plain(acronym: &str) -> Self {
        Self {
            acronym: acronym.to_string(),
            settings: ModSettings::default(),
        }
    }

    fn is(&self, acronyms: &[&str]) -> bool {
        acronyms
            .iter()
            .any(|acronym| self.acronym.eq_ignore_ascii_case(acronym))
    }
}

/// Hit window half-widths in real-time milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct HitWindows {
    /// Widest offset still judged great.
    pub great: f64,
    /// Widest offset still judged ok.
    pub ok: f64,
    /// Widest offset still judged meh; anything beyond is a miss.
    pub meh: f64,
}

impl HitWindows {
    /// Windows for an overall difficulty value at the given clock rate.
    pub fn for_overall_difficulty(od: f32, clock_rate: f64) -> Self {
        let od = f64::from(od);
        Self {
            great: (80.0 - 6.0 * od) / clock_rate,
            ok: (140.0 - 8.0 * od) / clock_rate,
            meh: (200.0 - 10.0 * od) / clock_rate,
        }
    }
}

/// Gameplay parameters derived from a player's mods and the beatmap attributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DerivedParameters {
    /// Effective circle size.
    pub circle_size: f32,
    /// Effective approach rate.
    pub approach_rate: f32,
    /// Effective overall difficulty.
    pub overall_difficulty: f32,
    /// Playback speed multiplier.
    pub clock_rate: f64,
    /// Judgement thresholds.
    pub hit_windows: HitWindows,
    /// Circle size forced by a difficulty-adjust mod.
    pub forced_circle_size: Option<f32>,
    /// Approach rate forced by a difficulty-adjust mod.
    pub forced_approach_rate: Option<f32>,
}

impl DerivedParameters {
    /// Derive parameters from scratch. Depends on nothing but its arguments, and
    /// the order of `mods` never matters.
    pub fn compute(mods: &[GameMod], base: &BeatmapAttributes) -> Self {
        let base = base.clamped();
        let adjust = mods.iter().filter(|m| m.is(&["DA"])).map(|m| &m.settings);
        let forced = |field: fn(&ModSettings) -> Option<f32>| {
            adjust
                .clone()
                .filter_map(field)
                .filter(|value| value.is_finite())
                .map(clamp_attribute)
                .reduce(f32::max)
        };
        let forced_circle_size = forced(|s| s.circle_size);
        let forced_approach_rate = forced(|s| s.approach_rate);
        let forced_overall_difficulty = forced(|s| s.overall_difficulty);

        let hard_rock = mods.iter().any(|m| m.is(&["HR"]));
        let easy = mods.iter().any(|m| m.is(&["EZ"]));
        let scale = |value: f32, hard_rock_ratio: f32| {
            if hard_rock {
                (value * hard_rock_ratio).min(MAX_ATTRIBUTE)
            } else if easy {
                value * EASY_RATIO
            } else {
                value
            }
        };

        let circle_size =
            forced_circle_size.unwrap_or_else(|| scale(base.cs, HARD_ROCK_CS));
        let approach_rate =
            forced_approach_rate.unwrap_or_else(|| scale(base.ar, HARD_ROCK_RATIO));
        let overall_difficulty =
            forced_overall_difficulty.unwrap_or_else(|| scale(base.od, HARD_ROCK_RATIO));

        let clock_rate = clock_rate(mods);

        Self {
            circle_size,
            approach_rate,
            overall_difficulty,
            clock_rate,
            hit_windows: HitWindows::for_overall_difficulty(overall_difficulty, clock_rate),
            forced_circle_size,
            forced_approach_rate,
        }
    }
}

/// Speed-up mods win over slow-down mods. Within a direction the rate furthest
/// from 1.0 wins.
fn clock_rate(mods: &[GameMod]) -> f64 {
    let rates = |acronyms: &[&str], default: f64| {
        mods.iter()
            .filter(|m| m.is(acronyms))
            .map(|m| {
                m.settings
                    .speed_change
                    .filter(|rate| rate.is_finite() && *rate > 0.0)
                    .unwrap_or(default)
            })
            .collect::<Vec<_>>()
    };

    let faster = rates(&["DT", "NC"], DOUBLE_TIME_RATE);
    if let Some(rate) = faster.into_iter().reduce(f64::max) {
        return rate;
    }
    rates(&["HT", "DC"], HALF_TIME_RATE)
        .into_iter()
        .reduce(f64::min)
        .unwrap_or(1.0)
}

fn clamp_attribute(value: f32) -> f32 {
    value.clamp(0.0, MAX_ATTRIBUTE)
}
