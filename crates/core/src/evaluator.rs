use std::collections::BTreeMap;

use crate::model::{Challenge, Matching, MultipleChoice};

//
// ─── CANDIDATE ANSWERS ─────────────────────────────────────────────────────────
//

/// Partial mapping from left items to the right item the user picked.
///
/// Keys are unique; choosing a new right item for the same left item replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchMapping(BTreeMap<String, String>);

impl MatchMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the right item chosen for `left`, returning the previous choice.
    pub fn assign(&mut self, left: impl Into<String>, right: impl Into<String>) -> Option<String> {
        self.0.insert(left.into(), right.into())
    }

    pub fn unassign(&mut self, left: &str) -> Option<String> {
        self.0.remove(left)
    }

    #[must_use]
    pub fn get(&self, left: &str) -> Option<&str> {
        self.0.get(left).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl<L, R> FromIterator<(L, R)> for MatchMapping
where
    L: Into<String>,
    R: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, R)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(l, r)| (l.into(), r.into()))
                .collect(),
        )
    }
}

/// What the user submits for a single challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(String),
    Matches(MatchMapping),
}

impl Answer {
    #[must_use]
    pub fn choice(choice: impl Into<String>) -> Self {
        Self::Choice(choice.into())
    }

    /// Empty candidates count as "not yet submitted".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Choice(choice) => choice.is_empty(),
            Self::Matches(mapping) => mapping.is_empty(),
        }
    }
}

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// Outcome of judging one attempt; the explanation is shown either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    pub explanation: String,
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Judges a candidate answer against a challenge.
///
/// Returns `None` when the candidate is empty. An answer of the wrong kind is judged
/// incorrect.
///
/// # Examples
///
/// ```
/// # use quest_core::evaluator::{evaluate, Answer};
/// # use quest_core::model::Challenge;
/// let challenge = Challenge::multiple_choice(
///     "Capital of France?",
///     vec!["Paris".into(), "Lyon".into()],
///     "Paris",
///     "Paris has been the capital since 987.",
/// );
/// let verdict = evaluate(&challenge, &Answer::choice("Paris")).unwrap();
/// assert!(verdict.correct);
/// assert!(evaluate(&challenge, &Answer::choice("")).is_none());
/// ```
#[must_use]
pub fn evaluate(challenge: &Challenge, answer: &Answer) -> Option<Verdict> {
    if answer.is_empty() {
        return None;
    }

    let correct = match (challenge, answer) {
        (Challenge::MultipleChoice(mc), Answer::Choice(choice)) => choice_is_correct(mc, choice),
        (Challenge::Matching(m), Answer::Matches(mapping)) => mapping_is_correct(m, mapping),
        _ => false,
    };

    Some(Verdict {
        correct,
        explanation: challenge.explanation().to_owned(),
    })
}

fn choice_is_correct(challenge: &MultipleChoice, choice: &str) -> bool {
    challenge.correct_choice == choice
}

// Missing entries fail closed.
fn mapping_is_correct(challenge: &Matching, mapping: &MatchMapping) -> bool {
    challenge
        .pairs
        .iter()
        .all(|pair| mapping.get(&pair.left) == Some(pair.right.as_str()))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchingPair;

    fn letters_to_digits() -> Challenge {
        Challenge::matching(
            "Match letters to digits",
            vec![MatchingPair::new("A", "1"), MatchingPair::new("B", "2")],
            "A is first, B is second.",
        )
    }

    fn capital() -> Challenge {
        Challenge::multiple_choice(
            "Capital of France?",
            vec!["Paris".into(), "paris".into(), "Lyon".into()],
            "Paris",
            "Paris.",
        )
    }

    #[test]
    fn full_mapping_is_correct() {
        let answer = Answer::Matches([("A", "1"), ("B", "2")].into_iter().collect());
        let verdict = evaluate(&letters_to_digits(), &answer).unwrap();
        assert!(verdict.correct);
        assert_eq!(verdict.explanation, "A is first, B is second.");
    }

    #[test]
    fn partial_mapping_is_incorrect() {
        let answer = Answer::Matches([("A", "1")].into_iter().collect());
        assert!(!evaluate(&letters_to_digits(), &answer).unwrap().correct);
    }

    #[test]
    fn swapped_mapping_is_incorrect() {
        let answer = Answer::Matches([("A", "2"), ("B", "1")].into_iter().collect());
        assert!(!evaluate(&letters_to_digits(), &answer).unwrap().correct);
    }

    #[test]
    fn extra_unknown_left_items_do_not_matter() {
        let answer =
            Answer::Matches([("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect());
        assert!(evaluate(&letters_to_digits(), &answer).unwrap().correct);
    }

    #[test]
    fn reassigning_a_left_item_replaces_choice() {
        let mut mapping = MatchMapping::new();
        mapping.assign("A", "2");
        assert_eq!(mapping.assign("A", "1"), Some("2".to_string()));
        mapping.assign("B", "2");
        assert_eq!(mapping.len(), 2);
        assert!(evaluate(&letters_to_digits(), &Answer::Matches(mapping)).unwrap().correct);
    }

    #[test]
    fn multiple_choice_is_case_sensitive() {
        assert!(evaluate(&capital(), &Answer::choice("Paris")).unwrap().correct);
        assert!(!evaluate(&capital(), &Answer::choice("paris")).unwrap().correct);
    }

    #[test]
    fn empty_candidate_is_not_evaluated() {
        assert!(evaluate(&capital(), &Answer::choice("")).is_none());
        assert!(evaluate(&letters_to_digits(), &Answer::Matches(MatchMapping::new())).is_none());
    }

    #[test]
    fn wrong_answer_kind_fails_closed() {
        assert!(!evaluate(&capital(), &Answer::Matches([("A", "1")].into_iter().collect()))
            .unwrap()
            .correct);
        assert!(!evaluate(&letters_to_digits(), &Answer::choice("1")).unwrap().correct);
    }
}
