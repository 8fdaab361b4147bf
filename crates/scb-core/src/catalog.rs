use std::{fs, path::Path, sync::Arc};

use crate::{errors::Error, Result};

/// Minimum number of "yes" answers (over the built-in catalog) that yields a
/// positive diagnosis.
pub const DEFAULT_INSOMNIA_THRESHOLD: usize = 35;

const INSOMNIA_QUESTIONS: &[&str] = &[
    "Do you have difficulty falling asleep?",
    "Do you wake up multiple times during the night?",
    "Do you have trouble staying asleep?",
    "Do you wake up too early and can't go back to sleep?",
    "Do you feel tired or fatigued during the day?",
    "Do you have difficulty concentrating?",
    "Do you have irritability or mood swings?",
    "Do you experience anxiety or restlessness before bedtime?",
    "Do you use electronics or screen devices close to bedtime?",
    "Do you consume caffeine or stimulants close to bedtime?",
    "Do you engage in vigorous physical activity close to bedtime?",
    "Do you nap excessively during the day?",
    "Do you have a regular sleep schedule?",
    "Do you sleep in a comfortable and quiet environment?",
    "Do you have a bedtime routine that helps you relax?",
    "Do you have a comfortable mattress and pillow?",
    "Do you avoid large meals or heavy snacks close to bedtime?",
    "Do you avoid alcohol or nicotine close to bedtime?",
    "Do you have any underlying medical conditions affecting sleep?",
    "Do you take any medications that may disrupt sleep?",
    "Do you experience any pain or discomfort while trying to sleep?",
    "Do you have any sleep disorders such as sleep apnea or restless leg syndrome?",
    "Do you have a high level of stress or anxiety in your life?",
    "Do you have a history of insomnia in your family?",
    "Do you feel refreshed after waking up in the morning?",
    "Do you feel rested and restored after a night's sleep?",
    "Do you have difficulty staying awake during the day?",
    "Do you have nightmares or vivid dreams during sleep?",
    "Do you experience a racing heart or palpitations during sleep?",
    "Do you have a consistent sleep-wake schedule?",
    "Do you avoid bright lights or electronic screens before bedtime?",
    "Do you have a comfortable and supportive sleep environment?",
    "Do you engage in relaxation techniques before bedtime?",
    "Do you avoid napping during the day?",
    "Do you limit your caffeine intake?",
    "Do you avoid heavy meals or snacks close to bedtime?",
    "Do you engage in regular physical exercise?",
    "Do you manage your stress levels effectively?",
    "Do you practice good sleep hygiene?",
    "Do you seek professional help for sleep problems?",
    "Do you have a quiet and dark bedroom?",
    "Do you avoid clock-watching while in bed?",
    "Do you use your bed only for sleep and intimacy?",
    "Do you expose yourself to natural light during the day?",
    "Do you have a wind-down routine before bedtime?",
    "Do you use relaxation techniques to help you sleep?",
    "Do you keep a sleep diary to track your sleep patterns?",
    "Do you avoid using electronic devices in bed?",
    "Do you limit your fluid intake before bedtime?",
    "Do you sleep in a well-ventilated room?",
    "Do you maintain a cool temperature in your bedroom?",
    "Do you practice meditation or mindfulness before bed?",
    "Do you avoid stimulating activities before bed?",
    "Do you have a regular wake-up time?",
    "Do you avoid working or studying in bed?",
    "Do you avoid exposure to loud noises during sleep?",
    "Do you practice stress-reducing activities during the day?",
];

/// Immutable, ordered list of yes/no prompts shared by every session.
///
/// Cloning is cheap (the questions live behind an `Arc`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Arc<[String]>,
}

impl QuestionCatalog {
    pub fn new<I, S>(questions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions: Vec<String> = questions
            .into_iter()
            .map(Into::into)
            .map(|q| q.trim().to_string())
            .collect();

        if questions.is_empty() {
            return Err(Error::Config(
                "question catalog must contain at least one question".to_string(),
            ));
        }
        if let Some(idx) = questions.iter().position(|q| q.is_empty()) {
            return Err(Error::Config(format!("question #{} is empty", idx + 1)));
        }

        Ok(Self {
            questions: questions.into(),
        })
    }

    /// The built-in insomnia screening questionnaire.
    pub fn insomnia() -> Self {
        Self {
            questions: INSOMNIA_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        }
    }

    /// Load a catalog from a JSON array of strings.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let questions: Vec<String> = serde_json::from_str(&raw)?;
        Self::new(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Catalogs are never empty, so the first question always exists.
    pub fn first(&self) -> &str {
        &self.questions[0]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(String::as_str)
    }

    /// Check that `threshold` is reachable with this catalog.
    pub fn validate_threshold(&self, threshold: usize) -> Result<()> {
        if threshold > self.len() {
            return Err(Error::Config(format!(
                "insomnia threshold {threshold} exceeds the number of questions ({})",
                self.len()
            )));
        }
        Ok(())
    }
}
