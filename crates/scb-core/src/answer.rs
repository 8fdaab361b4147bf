use std::{fmt, str::FromStr};

use crate::{errors::Error, Result};

/// A normalized reply to a yes/no question.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn is_yes(self) -> bool {
        matches!(self, Answer::Yes)
    }

    /// Label shown on the reply keyboard.
    pub fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Answer {
    type Err = Error;

    /// Strict parse: only "yes"/"no" (any case, surrounding whitespace ignored).
    fn from_str(raw: &str) -> Result<Self> {
        let t = raw.trim();
        if t.eq_ignore_ascii_case("yes") {
            Ok(Answer::Yes)
        } else if t.eq_ignore_ascii_case("no") {
            Ok(Answer::No)
        } else {
            Err(Error::InvalidAnswer {
                text: raw.to_string(),
            })
        }
    }
}

/// How free-form replies are turned into answers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnswerPolicy {
    /// Anything that is not "yes" counts as "no".
    #[default]
    Lenient,
    /// Only "yes"/"no" are accepted; other text is rejected and re-prompted.
    Strict,
}

impl AnswerPolicy {
    pub fn normalize(self, raw: &str) -> Result<Answer> {
        match self {
            AnswerPolicy::Strict => raw.parse(),
            AnswerPolicy::Lenient => Ok(raw.parse().unwrap_or(Answer::No)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_treats_everything_but_yes_as_no() {
        let p = AnswerPolicy::Lenient;
        assert_eq!(p.normalize("Yes").unwrap(), Answer::Yes);
        assert_eq!(p.normalize("  yEs ").unwrap(), Answer::Yes);
        assert_eq!(p.normalize("No").unwrap(), Answer::No);
        assert_eq!(p.normalize("").unwrap(), Answer::No);
        assert_eq!(p.normalize("yes please").unwrap(), Answer::No);
        assert_eq!(p.normalize("y").unwrap(), Answer::No);
    }

    #[test]
    fn strict_rejects_garbage() {
        let p = AnswerPolicy::Strict;
        assert_eq!(p.normalize("NO").unwrap(), Answer::No);
        assert_eq!(p.normalize("yes").unwrap(), Answer::Yes);
        let err = p.normalize("maybe").unwrap_err();
        assert!(matches!(err, Error::InvalidAnswer { text } if text == "maybe"));
    }
}
