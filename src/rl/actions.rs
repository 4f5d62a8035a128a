use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentenceComplexity {
    Simple,
    Moderate,
    Complex,
}

impl SentenceComplexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexicalType {
    Known,
    Unknown,
}

impl LexicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Known => "known",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationType {
    VocabularyExplanation,
    SentenceRepetition,
    /// Ask whether the child wants the last sentence repeated.
    ConfirmConfusion,
}

impl ClarificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VocabularyExplanation => "vocabulary_explanation",
            Self::SentenceRepetition => "sentence_repetition",
            Self::ConfirmConfusion => "confirm_confusion",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("malformed action: {0}")]
    Malformed(String),
}

/// Pedagogical intervention chosen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    LexicalSyntactic {
        complexity: SentenceComplexity,
        lexical_type: LexicalType,
    },
    Clarification {
        clarification_type: ClarificationType,
    },
    NoIntervention,
}

impl Action {
    pub fn is_clarification(&self) -> bool {
        matches!(self, Self::Clarification { .. })
    }

    pub fn is_lexical_syntactic(&self) -> bool {
        matches!(self, Self::LexicalSyntactic { .. })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::LexicalSyntactic { .. } => ActionKind::LexicalSyntactic,
            Self::Clarification { .. } => ActionKind::Clarification,
            Self::NoIntervention => ActionKind::NoIntervention,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexicalSyntactic {
                complexity,
                lexical_type,
            } => write!(
                f,
                "lexical_syntactic({}, {})",
                complexity.as_str(),
                lexical_type.as_str()
            ),
            Self::Clarification { clarification_type } => {
                write!(f, "clarification({})", clarification_type.as_str())
            }
            Self::NoIntervention => f.write_str("no_intervention"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LexicalSyntactic,
    Clarification,
    NoIntervention,
}

/// Loose field bag for building an [`Action`] from external input.
///
/// Every field is optional; [`ActionSpec::build`] checks that exactly the
/// fields required by `kind` are present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActionSpec {
    pub kind: ActionKind,
    #[serde(default)]
    pub complexity: Option<SentenceComplexity>,
    #[serde(default)]
    pub lexical_type: Option<LexicalType>,
    #[serde(default)]
    pub clarification_type: Option<ClarificationType>,
}

impl ActionSpec {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            complexity: None,
            lexical_type: None,
            clarification_type: None,
        }
    }

    pub fn build(self) -> Result<Action, ActionError> {
        match self.kind {
            ActionKind::LexicalSyntactic => {
                if self.clarification_type.is_some() {
                    return Err(ActionError::Malformed(
                        "lexical-syntactic action cannot carry a clarification type".to_string(),
                    ));
                }
                match (self.complexity, self.lexical_type) {
                    (Some(complexity), Some(lexical_type)) => Ok(Action::LexicalSyntactic {
                        complexity,
                        lexical_type,
                    }),
                    _ => Err(ActionError::Malformed(
                        "lexical-syntactic action requires complexity and lexical type".to_string(),
                    )),
                }
            }
            ActionKind::Clarification => {
                if self.complexity.is_some() || self.lexical_type.is_some() {
                    return Err(ActionError::Malformed(
                        "clarification action cannot carry complexity or lexical type".to_string(),
                    ));
                }
                self.clarification_type
                    .map(|clarification_type| Action::Clarification { clarification_type })
                    .ok_or_else(|| {
                        ActionError::Malformed(
                            "clarification action requires a clarification type".to_string(),
                        )
                    })
            }
            ActionKind::NoIntervention => {
                if self.complexity.is_some()
                    || self.lexical_type.is_some()
                    || self.clarification_type.is_some()
                {
                    return Err(ActionError::Malformed(
                        "no-intervention action takes no fields".to_string(),
                    ));
                }
                Ok(Action::NoIntervention)
            }
        }
    }
}

impl TryFrom<ActionSpec> for Action {
    type Error = ActionError;

    fn try_from(spec: ActionSpec) -> Result<Self, Self::Error> {
        spec.build()
    }
}

impl From<Action> for ActionSpec {
    fn from(action: Action) -> Self {
        let mut spec = Self::new(action.kind());
        match action {
            Action::LexicalSyntactic {
                complexity,
                lexical_type,
            } => {
                spec.complexity = Some(complexity);
                spec.lexical_type = Some(lexical_type);
            }
            Action::Clarification { clarification_type } => {
                spec.clarification_type = Some(clarification_type);
            }
            Action::NoIntervention => {}
        }
        spec
    }
}

/// The full action catalogue in its stable order. Q-table rows index into
/// this list, so reordering it invalidates persisted tables.
pub fn default_actions() -> Vec<Action> {
    use ClarificationType::*;
    use LexicalType::*;
    use SentenceComplexity::*;

    let mut actions = Vec::with_capacity(10);
    for complexity in [Simple, Moderate, Complex] {
        for lexical_type in [Known, Unknown] {
            actions.push(Action::LexicalSyntactic {
                complexity,
                lexical_type,
            });
        }
    }
    for clarification_type in [VocabularyExplanation, SentenceRepetition, ConfirmConfusion] {
        actions.push(Action::Clarification { clarification_type });
    }
    actions.push(Action::NoIntervention);
    actions
}
