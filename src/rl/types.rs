use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Mode {
    #[default]
    Narration,
    Interaction,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Narration => "narration",
            Self::Interaction => "interaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum EngagementLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl EngagementLevel {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Medium => 0.5,
            Self::High => 1.0,
        }
    }
}

/// Emotion categories produced by the upstream face-expression classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum EmotionalState {
    Angry,
    Disgust,
    Fear,
    Happy,
    #[default]
    Neutral,
    Sad,
    Surprise,
}

impl EmotionalState {
    pub const ALL: [Self; 7] = [
        Self::Angry,
        Self::Disgust,
        Self::Fear,
        Self::Happy,
        Self::Neutral,
        Self::Sad,
        Self::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Angry => "angry",
            Self::Disgust => "disgust",
            Self::Fear => "fear",
            Self::Happy => "happy",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Surprise => "surprise",
        }
    }

    /// Parses a classifier label. Unknown labels yield `None` so callers can
    /// exclude them from votes.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "angry" | "anger" => Some(Self::Angry),
            "disgust" => Some(Self::Disgust),
            "fear" => Some(Self::Fear),
            "happy" => Some(Self::Happy),
            "neutral" => Some(Self::Neutral),
            "sad" => Some(Self::Sad),
            "surprise" => Some(Self::Surprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ResponseQuality {
    Weak,
    #[default]
    Average,
    Strong,
}

impl ResponseQuality {
    pub const ALL: [Self; 3] = [Self::Weak, Self::Average, Self::Strong];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Average => "average",
            Self::Strong => "strong",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PromptNecessity {
    Yes,
    #[default]
    No,
}

impl PromptNecessity {
    pub const ALL: [Self; 2] = [Self::Yes, Self::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ResponseLength {
    pub const ALL: [Self; 3] = [Self::Short, Self::Medium, Self::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum VocabularyUsage {
    Low,
    #[default]
    Medium,
    High,
}

impl VocabularyUsage {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Medium => 0.5,
            Self::High => 1.0,
        }
    }

    pub fn higher(&self) -> Self {
        match self {
            Self::Low => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn lower(&self) -> Self {
        match self {
            Self::High => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Fields that only carry meaning while the child is answering a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionDetails {
    pub response_quality: ResponseQuality,
    pub prompt_necessity: PromptNecessity,
    pub response_length: ResponseLength,
    pub vocabulary_usage: VocabularyUsage,
    pub wh_question_detected: bool,
}

/// Discrete composite state observed by the policy.
///
/// Fields are private so the narration invariant holds for every value:
/// a narration state always carries `InteractionDetails::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    mode: Mode,
    engagement: EngagementLevel,
    emotion: EmotionalState,
    #[serde(flatten)]
    details: InteractionDetails,
}

impl State {
    /// Builds a state, resetting `details` to defaults when `mode` is narration.
    pub fn new(
        mode: Mode,
        engagement: EngagementLevel,
        emotion: EmotionalState,
        details: InteractionDetails,
    ) -> Self {
        let details = match mode {
            Mode::Narration => InteractionDetails::default(),
            Mode::Interaction => details,
        };
        Self {
            mode,
            engagement,
            emotion,
            details,
        }
    }

    pub fn narration(engagement: EngagementLevel, emotion: EmotionalState) -> Self {
        Self::new(Mode::Narration, engagement, emotion, InteractionDetails::default())
    }

    pub fn interaction(
        engagement: EngagementLevel,
        emotion: EmotionalState,
        details: InteractionDetails,
    ) -> Self {
        Self::new(Mode::Interaction, engagement, emotion, details)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn engagement(&self) -> EngagementLevel {
        self.engagement
    }

    pub fn emotion(&self) -> EmotionalState {
        self.emotion
    }

    pub fn details(&self) -> &InteractionDetails {
        &self.details
    }

    pub fn response_quality(&self) -> ResponseQuality {
        self.details.response_quality
    }

    pub fn prompt_necessity(&self) -> PromptNecessity {
        self.details.prompt_necessity
    }

    pub fn response_length(&self) -> ResponseLength {
        self.details.response_length
    }

    pub fn vocabulary_usage(&self) -> VocabularyUsage {
        self.details.vocabulary_usage
    }

    pub fn wh_question_detected(&self) -> bool {
        self.details.wh_question_detected
    }

    pub fn is_interaction(&self) -> bool {
        self.mode == Mode::Interaction
    }

    /// Canonical lookup key. Narration states drop the interaction fields.
    pub fn key(&self) -> StateKey {
        match self.mode {
            Mode::Narration => StateKey::Narration {
                engagement: self.engagement,
                emotion: self.emotion,
            },
            Mode::Interaction => StateKey::Interaction {
                engagement: self.engagement,
                emotion: self.emotion,
                response_quality: self.details.response_quality,
                prompt_necessity: self.details.prompt_necessity,
                response_length: self.details.response_length,
                vocabulary_usage: self.details.vocabulary_usage,
                wh_question_detected: self.details.wh_question_detected,
            },
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::narration(EngagementLevel::Medium, EmotionalState::Neutral)
    }
}

impl From<StateKey> for State {
    fn from(key: StateKey) -> Self {
        match key {
            StateKey::Narration { engagement, emotion } => Self::narration(engagement, emotion),
            StateKey::Interaction {
                engagement,
                emotion,
                response_quality,
                prompt_necessity,
                response_length,
                vocabulary_usage,
                wh_question_detected,
            } => Self::interaction(
                engagement,
                emotion,
                InteractionDetails {
                    response_quality,
                    prompt_necessity,
                    response_length,
                    vocabulary_usage,
                    wh_question_detected,
                },
            ),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.key().fmt(f)
    }
}

/// Fixed-order tuple used as the Q-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StateKey {
    Narration {
        engagement: EngagementLevel,
        emotion: EmotionalState,
    },
    #[serde(rename_all = "camelCase")]
    Interaction {
        engagement: EngagementLevel,
        emotion: EmotionalState,
        response_quality: ResponseQuality,
        prompt_necessity: PromptNecessity,
        response_length: ResponseLength,
        vocabulary_usage: VocabularyUsage,
        wh_question_detected: bool,
    },
}

impl StateKey {
    pub fn mode(&self) -> Mode {
        match self {
            Self::Narration { .. } => Mode::Narration,
            Self::Interaction { .. } => Mode::Interaction,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narration { engagement, emotion } => write!(
                f,
                "narration|{}|{}",
                engagement.as_str(),
                emotion.as_str()
            ),
            Self::Interaction {
                engagement,
                emotion,
                response_quality,
                prompt_necessity,
                response_length,
                vocabulary_usage,
                wh_question_detected,
            } => write!(
                f,
                "interaction|{}|{}|{}|{}|{}|{}|{}",
                engagement.as_str(),
                emotion.as_str(),
                response_quality.as_str(),
                prompt_necessity.as_str(),
                response_length.as_str(),
                vocabulary_usage.as_str(),
                if *wh_question_detected { "wh" } else { "-" }
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn rich_details() -> InteractionDetails {
        InteractionDetails {
            response_quality: ResponseQuality::Strong,
            prompt_necessity: PromptNecessity::Yes,
            response_length: ResponseLength::Long,
            vocabulary_usage: VocabularyUsage::High,
            wh_question_detected: true,
        }
    }

    #[test]
    fn narration_discards_interaction_fields() {
        let state = State::new(
            Mode::Narration,
            EngagementLevel::High,
            EmotionalState::Happy,
            rich_details(),
        );
        assert_eq!(*state.details(), InteractionDetails::default());
        assert_eq!(state, State::narration(EngagementLevel::High, EmotionalState::Happy));
    }

    #[test]
    fn interaction_keeps_fields() {
        let state = State::interaction(EngagementLevel::Low, EmotionalState::Sad, rich_details());
        assert!(state.wh_question_detected());
        assert_eq!(state.vocabulary_usage(), VocabularyUsage::High);
    }

    #[test]
    fn keys_are_distinct_across_all_combinations() {
        let mut keys = HashSet::new();
        let mut count = 0;
        for engagement in EngagementLevel::ALL {
            for emotion in EmotionalState::ALL {
                keys.insert(State::narration(engagement, emotion).key());
                count += 1;
                for response_quality in ResponseQuality::ALL {
                    for prompt_necessity in PromptNecessity::ALL {
                        for response_length in ResponseLength::ALL {
                            for vocabulary_usage in VocabularyUsage::ALL {
                                for wh_question_detected in [false, true] {
                                    let details = InteractionDetails {
                                        response_quality,
                                        prompt_necessity,
                                        response_length,
                                        vocabulary_usage,
                                        wh_question_detected,
                                    };
                                    keys.insert(State::interaction(engagement, emotion, details).key());
                                    count += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(keys.len(), count);
    }

    #[test]
    fn key_round_trips_into_state() {
        let state = State::interaction(EngagementLevel::Medium, EmotionalState::Fear, rich_details());
        assert_eq!(State::from(state.key()), state);
    }

    #[test]
    fn display_is_shorter_for_narration() {
        let narration = State::default().to_string();
        let interaction =
            State::interaction(EngagementLevel::Medium, EmotionalState::Neutral, rich_details())
                .to_string();
        assert_eq!(narration, "narration|medium|neutral");
        assert!(narration.split('|').count() < interaction.split('|').count());
    }

    #[test]
    fn emotion_labels_parse_case_insensitively() {
        assert_eq!(EmotionalState::parse("Angry"), Some(EmotionalState::Angry));
        assert_eq!(EmotionalState::parse("SURPRISE"), Some(EmotionalState::Surprise));
        assert_eq!(EmotionalState::parse("bored"), None);
    }
}
