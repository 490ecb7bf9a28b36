use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checkout::DiscountQuote;
use crate::constants::{
    AUTO_CLOSE_ON_LOSS_MS, REVISIT_CLOSE_DELAY_MS, WHEEL_PLAYED_KEY, WHEEL_WON_KEY,
};
use crate::session_store::{PlayStore, StoreError};

pub const WHEEL_SEGMENTS: usize = 8;
pub const WIN_PROBABILITY: f64 = 0.7;
pub const CLOSEST_SEGMENT_PROBABILITY: f64 = 0.8;
pub const MIN_SPINS: u32 = 5; // full revolutions, inclusive
pub const MAX_SPINS: u32 = 8; // exclusive

pub const DEFAULT_SEGMENT_PERCENTS: [u32; WHEEL_SEGMENTS] = [2, 3, 5, 10, 25, 50, 75, 100];
// Used on the minority win branch: small prizes are the most likely
pub const DEFAULT_LOW_TIER_WEIGHTS: [f64; WHEEL_SEGMENTS] =
    [0.25, 0.20, 0.18, 0.14, 0.10, 0.07, 0.04, 0.02];

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// A single arc of the wheel
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WheelSegment {
    pub percent: u32,
    pub label: String,
}

impl WheelSegment {
    pub fn new(percent: u32) -> Self {
        Self {
            percent,
            label: format!("{}%", percent),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WheelConfigError {
    #[error("the wheel needs at least one segment")]
    NoSegments,
    #[error("segment {index} has percent {percent}, expected a value in (0, 100]")]
    InvalidPercent { index: usize, percent: u32 },
    #[error("{weights} low tier weights for {segments} segments")]
    WeightCountMismatch { segments: usize, weights: usize },
    #[error("low tier weight {index} is negative or not finite")]
    InvalidWeight { index: usize },
    #[error("low tier weight {index} is larger than the one before it")]
    WeightsNotDecreasing { index: usize },
    #[error("low tier weights sum to {0}, expected 1.0")]
    WeightsDontSumToOne(f64),
}

/// Fixed segment layout plus the weighting used when a win is steered
/// toward small prizes.
#[derive(Debug, Clone)]
pub struct WheelConfig {
    segments: Vec<WheelSegment>,
    low_tier_weights: Vec<f64>,
    low_tier: WeightedIndex<f64>,
}

impl WheelConfig {
    pub fn new(
        segments: Vec<WheelSegment>,
        low_tier_weights: Vec<f64>,
    ) -> Result<Self, WheelConfigError> {
        if segments.is_empty() {
            return Err(WheelConfigError::NoSegments);
        }
        for (index, segment) in segments.iter().enumerate() {
            if segment.percent == 0 || segment.percent > 100 {
                return Err(WheelConfigError::InvalidPercent {
                    index,
                    percent: segment.percent,
                });
            }
        }
        if low_tier_weights.len() != segments.len() {
            return Err(WheelConfigError::WeightCountMismatch {
                segments: segments.len(),
                weights: low_tier_weights.len(),
            });
        }
        for (index, weight) in low_tier_weights.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(WheelConfigError::InvalidWeight { index });
            }
            if index > 0 && *weight > low_tier_weights[index - 1] {
                return Err(WheelConfigError::WeightsNotDecreasing { index });
            }
        }
        let sum: f64 = low_tier_weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WheelConfigError::WeightsDontSumToOne(sum));
        }
        let low_tier = WeightedIndex::new(&low_tier_weights)
            .map_err(|_| WheelConfigError::WeightsDontSumToOne(sum))?;

        Ok(Self {
            segments,
            low_tier_weights,
            low_tier,
        })
    }

    pub fn from_percents(
        percents: &[u32],
        low_tier_weights: Vec<f64>,
    ) -> Result<Self, WheelConfigError> {
        Self::new(
            percents.iter().copied().map(WheelSegment::new).collect(),
            low_tier_weights,
        )
    }

    pub fn segments(&self) -> &[WheelSegment] {
        &self.segments
    }

    pub fn low_tier_weights(&self) -> &[f64] {
        &self.low_tier_weights
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_angle(&self) -> f64 {
        360.0 / self.segments.len() as f64
    }

    /// Index of the segment whose percent is nearest `target_percent`.
    /// Ties go to the earlier segment.
    pub fn closest_segment_index(&self, target_percent: f64) -> usize {
        let mut closest_index = 0;
        let mut closest_diff = (self.segments[0].percent as f64 - target_percent).abs();
        for (index, segment) in self.segments.iter().enumerate().skip(1) {
            let diff = (segment.percent as f64 - target_percent).abs();
            if diff < closest_diff {
                closest_diff = diff;
                closest_index = index;
            }
        }
        closest_index
    }

    /// Segment sitting under the fixed pointer once the wheel has turned by
    /// `rotation_degrees`.
    pub fn segment_under_pointer(&self, rotation_degrees: f64) -> usize {
        let pointer_angle = (360.0 - rotation_degrees.rem_euclid(360.0)).rem_euclid(360.0);
        let index = (pointer_angle / self.segment_angle()).floor() as usize;
        index.min(self.segment_count() - 1)
    }

    /// Absolute rotation that turns the wheel forward by `revolutions` full
    /// turns and leaves the pointer centered on `segment_index`.
    ///
    /// A wheel resting mid-turn is first wound forward to the next whole turn,
    /// so the result is always past `current_rotation`.
    pub fn landing_rotation(
        &self,
        segment_index: usize,
        current_rotation: f64,
        revolutions: u32,
    ) -> f64 {
        let angle = self.segment_angle();
        let offset = 360.0 - (segment_index as f64 * angle + angle / 2.0);
        let partial_turn = current_rotation.rem_euclid(360.0);
        let whole_turns = if partial_turn > 0.0 {
            current_rotation - partial_turn + 360.0
        } else {
            current_rotation
        };
        whole_turns + revolutions as f64 * 360.0 + offset
    }
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self::from_percents(&DEFAULT_SEGMENT_PERCENTS, DEFAULT_LOW_TIER_WEIGHTS.to_vec())
            .expect("default wheel table is valid")
    }
}

/// Which way a spin resolved before a segment is chosen
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum SpinBranch {
    Loss,
    Closest,
    LowTier,
}

impl SpinBranch {
    pub fn is_win(&self) -> bool {
        !matches!(self, SpinBranch::Loss)
    }
}

pub fn draw_branch<R: Rng + ?Sized>(rng: &mut R) -> SpinBranch {
    if rng.gen::<f64>() >= WIN_PROBABILITY {
        return SpinBranch::Loss;
    }
    if rng.gen::<f64>() < CLOSEST_SEGMENT_PROBABILITY {
        SpinBranch::Closest
    } else {
        SpinBranch::LowTier
    }
}

pub fn pick_segment<R: Rng + ?Sized>(
    config: &WheelConfig,
    target_percent: f64,
    branch: SpinBranch,
    rng: &mut R,
) -> usize {
    match branch {
        SpinBranch::Loss => rng.gen_range(0..config.segment_count()),
        SpinBranch::Closest => config.closest_segment_index(target_percent),
        SpinBranch::LowTier => config.low_tier.sample(rng),
    }
}

/// Result of one spin. Built only by [`spin`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WheelOutcome {
    won: bool,
    segment_index: usize,
    rotation_degrees: f64,
}

impl WheelOutcome {
    pub fn won(&self) -> bool {
        self.won
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.rotation_degrees
    }
}

/// Resolves a spin. A loss may still land on a large percent; only `won`
/// grants the discount.
pub fn spin<R: Rng + ?Sized>(
    config: &WheelConfig,
    target_percent: f64,
    current_rotation: f64,
    rng: &mut R,
) -> WheelOutcome {
    let branch = draw_branch(rng);
    let segment_index = pick_segment(config, target_percent, branch, rng);
    let revolutions = rng.gen_range(MIN_SPINS..MAX_SPINS);

    WheelOutcome {
        won: branch.is_win(),
        segment_index,
        rotation_degrees: config.landing_rotation(segment_index, current_rotation, revolutions),
    }
}

// === Session persistence ===

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SessionPlayRecord {
    pub played: bool,
    pub won: bool,
}

impl SessionPlayRecord {
    pub fn from_outcome(outcome: &WheelOutcome) -> Self {
        Self {
            played: true,
            won: outcome.won,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct SessionState {
    pub should_auto_close: bool,
    pub auto_applied_win: bool,
}

pub fn resolve_session_state(record: Option<SessionPlayRecord>) -> SessionState {
    match record {
        Some(record) if record.played => SessionState {
            should_auto_close: true,
            auto_applied_win: record.won,
        },
        _ => SessionState::default(),
    }
}

/// Unreadable storage and any `played` value other than `"true"` count as
/// no record.
pub fn read_play_record<S: PlayStore + ?Sized>(store: &S) -> Option<SessionPlayRecord> {
    match store.get_item(WHEEL_PLAYED_KEY) {
        Ok(Some(played)) if played == "true" => {
            let won = matches!(store.get_item(WHEEL_WON_KEY), Ok(Some(won)) if won == "true");
            Some(SessionPlayRecord { played: true, won })
        }
        _ => None,
    }
}

pub fn write_play_record<S: PlayStore + ?Sized>(
    store: &S,
    record: SessionPlayRecord,
) -> Result<(), StoreError> {
    // Won first, so a failure between the writes never replays a stale win
    store.set_item(WHEEL_WON_KEY, if record.won { "true" } else { "false" })?;
    store.set_item(WHEEL_PLAYED_KEY, if record.played { "true" } else { "false" })
}

/// One browser session's view of the wheel
pub struct WheelSession<S: PlayStore> {
    store: S,
    config: WheelConfig,
}

impl<S: PlayStore> WheelSession<S> {
    pub fn new(store: S, config: WheelConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn check_session_state(&self) -> SessionState {
        resolve_session_state(read_play_record(&self.store))
    }

    pub fn spin<R: Rng + ?Sized>(
        &self,
        target_percent: f64,
        current_rotation: f64,
        rng: &mut R,
    ) -> WheelOutcome {
        spin(&self.config, target_percent, current_rotation, rng)
    }

    /// Persists the result. A failed write only loses the no-replay guarantee
    /// for the next visit.
    pub fn commit(&self, outcome: &WheelOutcome) {
        if let Err(e) = write_play_record(&self.store, SessionPlayRecord::from_outcome(outcome)) {
            log::warn!("Could not persist wheel result: {}", e);
        }
    }
}

// === Overlay state ===

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum WheelPhase {
    NeverPlayed,
    Spinning,
    Resolved { won: bool },
    AutoClosing { reapply_win: bool },
}

/// Overlay state for a front-end host
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelGame {
    pub phase: WheelPhase,
    pub rotation: f64,
    pub last_outcome: Option<WheelOutcome>,
}

impl WheelGame {
    pub fn mount(state: SessionState) -> Self {
        let phase = if state.should_auto_close {
            WheelPhase::AutoClosing {
                reapply_win: state.auto_applied_win,
            }
        } else {
            WheelPhase::NeverPlayed
        };
        Self {
            phase,
            rotation: 0.0,
            last_outcome: None,
        }
    }

    pub fn can_spin(&self) -> bool {
        self.phase == WheelPhase::NeverPlayed
    }

    pub fn is_spinning(&self) -> bool {
        self.phase == WheelPhase::Spinning
    }

    pub fn start_spin(&mut self, outcome: WheelOutcome) -> bool {
        if !self.can_spin() {
            return false;
        }
        self.phase = WheelPhase::Spinning;
        self.rotation = outcome.rotation_degrees();
        self.last_outcome = Some(outcome);
        true
    }

    pub fn complete_spin(&mut self) {
        if let (WheelPhase::Spinning, Some(outcome)) = (self.phase, self.last_outcome) {
            self.phase = WheelPhase::Resolved { won: outcome.won() };
        }
    }

    pub fn auto_close_delay_ms(&self) -> Option<u32> {
        match self.phase {
            WheelPhase::AutoClosing { .. } => Some(REVISIT_CLOSE_DELAY_MS),
            WheelPhase::Resolved { won: false } => Some(AUTO_CLOSE_ON_LOSS_MS),
            _ => None,
        }
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct WheelSpinRequest {
    #[serde(default)]
    pub current_rotation: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSpinResponse {
    pub won: bool,
    pub segment_index: usize,
    pub segment_label: String,
    pub rotation_degrees: f64,
    pub spin_duration_ms: u32,
    pub auto_close_after_ms: Option<u32>,
    pub discount: Option<DiscountQuote>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WheelSessionResponse {
    pub should_auto_close: bool,
    pub auto_applied_win: bool,
    pub auto_close_delay_ms: Option<u32>,
    pub segments: Vec<WheelSegment>,
    pub discount: Option<DiscountQuote>,
}
