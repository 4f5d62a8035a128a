//! Sensor window aggregation.
//!
//! Perception callbacks push discrete head-pose, gaze and emotion labels into
//! five bounded FIFO windows. The dialogue loop periodically reduces those
//! windows to a majority-vote summary, derives a [`State`] and clears them.
//! Speech callbacks derive interaction states directly from transcripts.
//!
//! All windows and the last derived state live behind a single mutex, so an
//! aggregation cycle reads and clears the windows atomically with respect to
//! concurrent `add_reading` calls.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::rl::config::AggregatorConfig;
use crate::rl::types::{
    EmotionalState, EngagementLevel, InteractionDetails, Mode, PromptNecessity, ResponseLength,
    ResponseQuality, State, VocabularyUsage,
};

const WH_WORDS: [&str; 7] = ["who", "what", "when", "where", "why", "how", "which"];

// ==================== Sensor Labels ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum HeadPose {
    #[default]
    Front,
    Left,
    Right,
    Up,
    Down,
}

impl HeadPose {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "front" => Some(Self::Front),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }

    pub fn is_averted(&self) -> bool {
        matches!(self, Self::Left | Self::Right | Self::Down)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum GazeDirection {
    #[default]
    Center,
    Left,
    Right,
    Blinking,
}

impl GazeDirection {
    /// Accepts both `center` and the detector's `Looking center` spelling.
    pub fn parse(s: &str) -> Option<Self> {
        let label = s.trim().to_lowercase();
        let label = label.strip_prefix("looking ").unwrap_or(&label);
        match label {
            "center" | "centre" => Some(Self::Center),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "blinking" => Some(Self::Blinking),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    HeadHorizontal,
    HeadVertical,
    Gaze,
    Emotion,
    EmotionConfidence,
}

/// One perception frame. `None` marks a label the detector produced but
/// this core does not recognise, or a missing confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub head_horizontal: Option<HeadPose>,
    pub head_vertical: Option<HeadPose>,
    pub gaze: Option<GazeDirection>,
    pub emotion: Option<EmotionalState>,
    pub emotion_confidence: Option<f64>,
}

impl SensorReading {
    pub fn from_labels(
        horizontal: &str,
        vertical: &str,
        gaze: &str,
        emotion: &str,
        emotion_confidence: Option<f64>,
    ) -> Self {
        Self {
            head_horizontal: HeadPose::parse(horizontal),
            head_vertical: HeadPose::parse(vertical),
            gaze: GazeDirection::parse(gaze),
            emotion: EmotionalState::parse(emotion),
            emotion_confidence: emotion_confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSummary {
    pub head_horizontal: HeadPose,
    pub head_vertical: HeadPose,
    pub gaze: GazeDirection,
    pub emotion: EmotionalState,
    pub emotion_confidence: f64,
    pub samples: usize,
    /// Channels that fell back to their default.
    pub gaps: Vec<SensorChannel>,
}

impl Default for SensorSummary {
    fn default() -> Self {
        Self {
            head_horizontal: HeadPose::Front,
            head_vertical: HeadPose::Front,
            gaze: GazeDirection::Center,
            emotion: EmotionalState::Neutral,
            emotion_confidence: 0.0,
            samples: 0,
            gaps: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceFeatures {
    pub word_count: usize,
    pub unique_words: usize,
    pub lexical_diversity: f64,
    pub wh_question_detected: bool,
}

// ==================== Clock ====================

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock advanced by hand, for deterministic update periods.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

// ==================== Buffers ====================

struct SensorBuffers {
    capacity: usize,
    head_horizontal: VecDeque<Option<HeadPose>>,
    head_vertical: VecDeque<Option<HeadPose>>,
    gaze: VecDeque<Option<GazeDirection>>,
    emotion: VecDeque<Option<EmotionalState>>,
    emotion_confidence: VecDeque<Option<f64>>,
}

impl SensorBuffers {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            head_horizontal: VecDeque::with_capacity(capacity),
            head_vertical: VecDeque::with_capacity(capacity),
            gaze: VecDeque::with_capacity(capacity),
            emotion: VecDeque::with_capacity(capacity),
            emotion_confidence: VecDeque::with_capacity(capacity),
        }
    }

    fn push(&mut self, reading: SensorReading) {
        push_bounded(&mut self.head_horizontal, reading.head_horizontal, self.capacity);
        push_bounded(&mut self.head_vertical, reading.head_vertical, self.capacity);
        push_bounded(&mut self.gaze, reading.gaze, self.capacity);
        push_bounded(&mut self.emotion, reading.emotion, self.capacity);
        push_bounded(&mut self.emotion_confidence, reading.emotion_confidence, self.capacity);
    }

    fn clear(&mut self) {
        self.head_horizontal.clear();
        self.head_vertical.clear();
        self.gaze.clear();
        self.emotion.clear();
        self.emotion_confidence.clear();
    }

    fn len(&self) -> usize {
        self.head_horizontal.len()
    }

    fn summarize(&self) -> SensorSummary {
        let mut gaps = Vec::new();

        let head_horizontal = majority(self.head_horizontal.iter().flatten().copied())
            .unwrap_or_else(|| {
                gaps.push(SensorChannel::HeadHorizontal);
                HeadPose::Front
            });
        let head_vertical = majority(self.head_vertical.iter().flatten().copied())
            .unwrap_or_else(|| {
                gaps.push(SensorChannel::HeadVertical);
                HeadPose::Front
            });

        let gaze = majority(self.gaze.iter().flatten().copied()).unwrap_or_else(|| {
            gaps.push(SensorChannel::Gaze);
            GazeDirection::Center
        });

        let (emotion, emotion_confidence) =
            match majority(self.emotion.iter().flatten().copied()) {
                Some(emotion) => {
                    let confidences: Vec<f64> = self
                        .emotion
                        .iter()
                        .zip(self.emotion_confidence.iter())
                        .filter(|(label, _)| **label == Some(emotion))
                        .filter_map(|(_, conf)| *conf)
                        .collect();
                    if confidences.is_empty() {
                        gaps.push(SensorChannel::EmotionConfidence);
                        (emotion, 0.0)
                    } else {
                        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
                        (emotion, mean)
                    }
                }
                None => {
                    gaps.push(SensorChannel::Emotion);
                    (EmotionalState::Neutral, 0.0)
                }
            };

        SensorSummary {
            head_horizontal,
            head_vertical,
            gaze,
            emotion,
            emotion_confidence,
            samples: self.len(),
            gaps,
        }
    }
}

fn push_bounded<T>(buffer: &mut VecDeque<T>, value: T, capacity: usize) {
    while buffer.len() >= capacity {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

/// Most frequent value; ties go to the value seen first.
fn majority<T, I>(values: I) -> Option<T>
where
    T: Copy + PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

// ==================== Aggregator ====================

struct AggregatorInner {
    buffers: SensorBuffers,
    last_trigger: Instant,
    last_state: Option<State>,
}

pub struct SensorAggregator {
    config: AggregatorConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<AggregatorInner>,
}

impl SensorAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AggregatorConfig, clock: Arc<dyn Clock>) -> Self {
        let inner = AggregatorInner {
            buffers: SensorBuffers::new(config.buffer_capacity),
            last_trigger: clock.now(),
            last_state: None,
        };
        Self {
            config,
            clock,
            inner: Mutex::new(inner),
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Records one frame of detector labels. Overflow evicts the oldest frame.
    pub fn add_reading(
        &self,
        horizontal: &str,
        vertical: &str,
        gaze: &str,
        emotion: &str,
        emotion_confidence: Option<f64>,
    ) {
        self.add_sample(SensorReading::from_labels(
            horizontal,
            vertical,
            gaze,
            emotion,
            emotion_confidence,
        ));
    }

    pub fn add_sample(&self, reading: SensorReading) {
        self.inner.lock().buffers.push(reading);
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    /// Majority-vote summary of the current windows. Does not clear them.
    pub fn aggregate(&self) -> SensorSummary {
        self.inner.lock().buffers.summarize()
    }

    pub fn last_state(&self) -> Option<State> {
        self.inner.lock().last_state
    }

    /// Runs an aggregation cycle if at least `period_secs` elapsed since the
    /// previous one. Returns `None` when the period has not elapsed yet.
    pub fn maybe_update(&self, period_secs: f64) -> Option<State> {
        let now = self.clock.now();
        let period = Duration::try_from_secs_f64(period_secs.max(0.0)).unwrap_or(Duration::MAX);

        let mut inner = self.inner.lock();
        if now.saturating_duration_since(inner.last_trigger) < period {
            return None;
        }

        let summary = inner.buffers.summarize();
        if !summary.gaps.is_empty() {
            tracing::debug!(gaps = ?summary.gaps, samples = summary.samples, "sensor gap, using defaults");
        }
        let state = self.derive_state(&summary);

        inner.buffers.clear();
        inner.last_trigger = now;
        inner.last_state = Some(state);
        drop(inner);

        tracing::info!(
            state = %state,
            confidence = summary.emotion_confidence,
            samples = summary.samples,
            "aggregated sensor state"
        );
        Some(state)
    }

    /// Maps a sensor summary to a state.
    pub fn derive_state(&self, summary: &SensorSummary) -> State {
        let engagement = if summary.emotion_confidence > self.config.engagement_confidence_threshold {
            EngagementLevel::High
        } else if summary.head_horizontal.is_averted() {
            EngagementLevel::Low
        } else {
            EngagementLevel::Medium
        };

        let mode = if summary.gaze != GazeDirection::Center {
            Mode::Interaction
        } else {
            Mode::Narration
        };

        State::new(mode, engagement, summary.emotion, InteractionDetails::default())
    }

    pub fn analyze_utterance(&self, text: &str) -> UtteranceFeatures {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                    .to_lowercase()
            })
            .filter(|word| !word.is_empty())
            .collect();

        let word_count = words.len();
        let unique_words = words.iter().collect::<HashSet<_>>().len();
        let lexical_diversity = if word_count > 0 {
            unique_words as f64 / word_count as f64
        } else {
            0.0
        };
        let wh_question_detected = words.iter().any(|word| WH_WORDS.contains(&word.as_str()));

        UtteranceFeatures {
            word_count,
            unique_words,
            lexical_diversity,
            wh_question_detected,
        }
    }

    /// Derives a state from a transcript and records it as the last state.
    pub fn update_from_utterance(&self, mode: Mode, text: &str) -> State {
        let state = match mode {
            Mode::Narration => State::narration(EngagementLevel::Medium, EmotionalState::Neutral),
            Mode::Interaction => {
                let features = self.analyze_utterance(text);
                self.interaction_state(&features)
            }
        };

        self.inner.lock().last_state = Some(state);
        tracing::debug!(state = %state, "state from utterance");
        state
    }

    fn interaction_state(&self, features: &UtteranceFeatures) -> State {
        let cfg = &self.config;
        let words = features.word_count;

        let response_length = if words < cfg.short_response_words {
            ResponseLength::Short
        } else if words <= cfg.long_response_words {
            ResponseLength::Medium
        } else {
            ResponseLength::Long
        };

        let response_quality = if words >= cfg.strong_response_words {
            ResponseQuality::Strong
        } else if words >= cfg.average_response_words {
            ResponseQuality::Average
        } else {
            ResponseQuality::Weak
        };

        let vocabulary_usage = if features.lexical_diversity > cfg.lexical_diversity_threshold {
            VocabularyUsage::High
        } else {
            VocabularyUsage::Medium
        };

        let engagement = if words >= cfg.high_engagement_words {
            EngagementLevel::High
        } else if words >= 1 {
            EngagementLevel::Medium
        } else {
            EngagementLevel::Low
        };

        let prompt_necessity =
            if features.wh_question_detected || engagement == EngagementLevel::Low {
                PromptNecessity::Yes
            } else {
                PromptNecessity::No
            };

        State::interaction(
            engagement,
            EmotionalState::Neutral,
            InteractionDetails {
                response_quality,
                prompt_necessity,
                response_length,
                vocabulary_usage,
                wh_question_detected: features.wh_question_detected,
            },
        )
    }
}
