use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("challenge prompt cannot be empty")]
    EmptyPrompt,

    #[error("multiple-choice challenge needs at least one choice")]
    NoChoices,

    #[error("correct choice {0:?} is not one of the listed choices")]
    CorrectChoiceMissing(String),

    #[error("matching challenge needs at least one pair")]
    NoPairs,

    #[error("matching challenge lists left item {0:?} more than once")]
    DuplicateLeft(String),
}

//
// ─── CHALLENGE KINDS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeKind {
    MultipleChoice,
    Matching,
}

/// A single quiz item inside a level.
///
/// Serialized with an inline `kind` tag so catalog files read naturally:
/// `{ "kind": "matching", "prompt": "...", "pairs": [...], "explanation": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Challenge {
    MultipleChoice(MultipleChoice),
    Matching(Matching),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoice {
    pub prompt: String,
    pub choices: Vec<String>,
    pub correct_choice: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matching {
    pub prompt: String,
    pub pairs: Vec<MatchingPair>,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

impl MatchingPair {
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

impl Challenge {
    #[must_use]
    pub fn multiple_choice(
        prompt: impl Into<String>,
        choices: Vec<String>,
        correct_choice: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self::MultipleChoice(MultipleChoice {
            prompt: prompt.into(),
            choices,
            correct_choice: correct_choice.into(),
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn matching(
        prompt: impl Into<String>,
        pairs: Vec<MatchingPair>,
        explanation: impl Into<String>,
    ) -> Self {
        Self::Matching(Matching {
            prompt: prompt.into(),
            pairs,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ChallengeKind {
        match self {
            Self::MultipleChoice(_) => ChallengeKind::MultipleChoice,
            Self::Matching(_) => ChallengeKind::Matching,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Self::MultipleChoice(mc) => &mc.prompt,
            Self::Matching(m) => &m.prompt,
        }
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        match self {
            Self::MultipleChoice(mc) => &mc.explanation,
            Self::Matching(m) => &m.explanation,
        }
    }

    /// Checks the structural rules the evaluator relies on.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError` when the prompt is blank, a multiple-choice item has no
    /// choices or its correct choice is not listed, or a matching item has no pairs or
    /// repeats a left item.
    pub fn validate(&self) -> Result<(), ChallengeError> {
        if self.prompt().trim().is_empty() {
            return Err(ChallengeError::EmptyPrompt);
        }

        match self {
            Self::MultipleChoice(mc) => {
                if mc.choices.is_empty() {
                    return Err(ChallengeError::NoChoices);
                }
                if !mc.choices.iter().any(|c| *c == mc.correct_choice) {
                    return Err(ChallengeError::CorrectChoiceMissing(
                        mc.correct_choice.clone(),
                    ));
                }
            }
            Self::Matching(m) => {
                if m.pairs.is_empty() {
                    return Err(ChallengeError::NoPairs);
                }
                let mut seen = HashSet::with_capacity(m.pairs.len());
                for pair in &m.pairs {
                    if !seen.insert(pair.left.as_str()) {
                        return Err(ChallengeError::DuplicateLeft(pair.left.clone()));
                    }
                }
            }
        }

        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tagged_multiple_choice() {
        let raw = r#"{
            "kind": "multiple-choice",
            "prompt": "2 + 2?",
            "choices": ["3", "4"],
            "correct_choice": "4",
            "explanation": "Basic arithmetic."
        }"#;
        let challenge: Challenge = serde_json::from_str(raw).unwrap();
        assert_eq!(challenge.kind(), ChallengeKind::MultipleChoice);
        assert_eq!(challenge.prompt(), "2 + 2?");
        assert!(challenge.validate().is_ok());
    }

    #[test]
    fn deserializes_tagged_matching() {
        let raw = r#"{
            "kind": "matching",
            "prompt": "Match",
            "pairs": [{ "left": "A", "right": "1" }],
            "explanation": "Letters to digits."
        }"#;
        let challenge: Challenge = serde_json::from_str(raw).unwrap();
        assert_eq!(challenge.kind(), ChallengeKind::Matching);
        assert_eq!(challenge.explanation(), "Letters to digits.");
    }

    #[test]
    fn rejects_correct_choice_not_listed() {
        let challenge = Challenge::multiple_choice("Q", vec!["a".into()], "b", "");
        assert_eq!(
            challenge.validate(),
            Err(ChallengeError::CorrectChoiceMissing("b".into()))
        );
    }

    #[test]
    fn rejects_duplicate_left_items() {
        let challenge = Challenge::matching(
            "Q",
            vec![MatchingPair::new("A", "1"), MatchingPair::new("A", "2")],
            "",
        );
        assert_eq!(
            challenge.validate(),
            Err(ChallengeError::DuplicateLeft("A".into()))
        );
    }

    #[test]
    fn rejects_blank_prompt_and_empty_pairs() {
        let blank = Challenge::matching("  ", vec![MatchingPair::new("A", "1")], "");
        assert_eq!(blank.validate(), Err(ChallengeError::EmptyPrompt));

        let empty = Challenge::matching("Q", Vec::new(), "");
        assert_eq!(empty.validate(), Err(ChallengeError::NoPairs));
    }
}
