use crate::answer::Answer;

pub const POSITIVE_MESSAGE: &str = "Based on your answers, it appears that you may have symptoms of insomnia. It is recommended to consult a healthcare professional for further evaluation and guidance.";

pub const NEGATIVE_MESSAGE: &str = "Based on your answers, it does not appear that you have symptoms of insomnia. However, if you continue to experience sleep difficulties, it is advisable to seek medical advice.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagnosis {
    Positive,
    Negative,
}

impl Diagnosis {
    pub fn from_score(score: usize, threshold: usize) -> Self {
        if score >= threshold {
            Diagnosis::Positive
        } else {
            Diagnosis::Negative
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Diagnosis::Positive => POSITIVE_MESSAGE,
            Diagnosis::Negative => NEGATIVE_MESSAGE,
        }
    }
}

/// Final result of a completed (or force-finalized) quiz.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub score: usize,
    pub answered: usize,
    pub total: usize,
    pub threshold: usize,
    pub diagnosis: Diagnosis,
}

/// Number of affirmative answers.
pub fn score<'a>(answers: impl IntoIterator<Item = &'a Answer>) -> usize {
    answers.into_iter().filter(|a| a.is_yes()).count()
}
