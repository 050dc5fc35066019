use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
    /// Always `None`. Guesses are tracked per player on `Player::current_guess`.
    #[serde(default)]
    pub guess: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// How an answer button is shown to a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayClass {
    Neutral,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub id: String,
    pub text: String,
    pub class: DisplayClass,
    pub emphasized: bool,
}

impl Question {
    pub fn new(text: String, correct_answer: String, incorrect_answers: Vec<String>) -> Self {
        Self {
            text,
            correct_answer,
            incorrect_answers,
            guess: None,
            fetched_at: Utc::now(),
        }
    }

    /// Answers in their stable shuffled order, classed relative to `guess`.
    pub fn answers_for(&self, guess: Option<&str>) -> Vec<AnswerEntry> {
        self.shuffled_texts()
            .into_iter()
            .map(|text| {
                let (class, emphasized) = display_class(text == self.correct_answer, text, guess);
                AnswerEntry {
                    id: answer_id(text),
                    text: text.to_string(),
                    class,
                    emphasized,
                }
            })
            .collect()
    }

    pub fn answer_by_id(&self, id: &str) -> Option<&str> {
        self.all_answers().find(|text| answer_id(text) == id)
    }

    /// Resolves a client-supplied guess, given either as an answer id or the
    /// answer text, to the answer text.
    pub fn resolve_guess(&self, value: &str) -> Option<&str> {
        self.answer_by_id(value)
            .or_else(|| self.all_answers().find(|text| *text == value))
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }

    fn all_answers(&self) -> impl Iterator<Item = &str> {
        self.incorrect_answers
            .iter()
            .chain(std::iter::once(&self.correct_answer))
            .map(String::as_str)
    }

    fn shuffled_texts(&self) -> Vec<&str> {
        let mut answers: Vec<&str> = self.all_answers().collect();
        let digest = Sha256::digest(self.text.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        answers.shuffle(&mut ChaCha8Rng::from_seed(seed));
        answers
    }
}

/// Stable content-derived id for an answer.
pub fn answer_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..16])
}

fn display_class(is_correct: bool, text: &str, guess: Option<&str>) -> (DisplayClass, bool) {
    match guess {
        None => (DisplayClass::Neutral, false),
        Some(guess) if is_correct => (DisplayClass::Success, guess == text),
        Some(guess) => (DisplayClass::Error, guess == text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str) -> Question {
        Question::new(
            text.to_string(),
            "Paris".to_string(),
            vec!["Lyon".to_string(), "Nice".to_string(), "Lille".to_string()],
        )
    }

    fn order(q: &Question) -> Vec<String> {
        q.answers_for(None).into_iter().map(|a| a.text).collect()
    }

    #[test]
    fn test_shuffle_is_stable_for_same_text() {
        let a = question("What is the capital of France?");
        let b = question("What is the capital of France?");
        let guessed: Vec<String> = b.answers_for(Some("Nice")).into_iter().map(|a| a.text).collect();

        assert_eq!(order(&a), order(&a));
        assert_eq!(order(&a), order(&b));
        assert_eq!(order(&a), guessed);
    }

    #[test]
    fn test_shuffle_differs_across_texts() {
        let reference = order(&question("Question 0"));
        let differing = (1..20)
            .map(|i| order(&question(&format!("Question {i}"))))
            .filter(|o| *o != reference)
            .count();

        assert!(differing > 0, "every text produced the same permutation");
    }

    #[test]
    fn test_answers_contain_every_choice_once() {
        let q = question("Which city?");
        let mut texts = order(&q);
        texts.sort();
        assert_eq!(texts, vec!["Lille", "Lyon", "Nice", "Paris"]);
    }

    #[test]
    fn test_neutral_without_guess() {
        let q = question("Which city?");
        assert!(q
            .answers_for(None)
            .iter()
            .all(|a| a.class == DisplayClass::Neutral && !a.emphasized));
    }

    #[test]
    fn test_classes_with_wrong_guess() {
        let q = question("Which city?");
        let answers = q.answers_for(Some("Lyon"));

        for answer in answers {
            match answer.text.as_str() {
                "Paris" => assert_eq!((answer.class, answer.emphasized), (DisplayClass::Success, false)),
                "Lyon" => assert_eq!((answer.class, answer.emphasized), (DisplayClass::Error, true)),
                _ => assert_eq!((answer.class, answer.emphasized), (DisplayClass::Error, false)),
            }
        }
    }

    #[test]
    fn test_classes_with_correct_guess() {
        let q = question("Which city?");
        let paris = q
            .answers_for(Some("Paris"))
            .into_iter()
            .find(|a| a.text == "Paris")
            .unwrap();
        assert_eq!(paris.class, DisplayClass::Success);
        assert!(paris.emphasized);
    }

    #[test]
    fn test_resolve_guess_by_id_or_text() {
        let q = question("Which city?");
        assert_eq!(q.resolve_guess(&answer_id("Nice")), Some("Nice"));
        assert_eq!(q.resolve_guess("Paris"), Some("Paris"));
        assert_eq!(q.resolve_guess("Berlin"), None);
    }

    #[test]
    fn test_answer_id_is_stable_hex() {
        let id = answer_id("Paris");
        assert_eq!(id, answer_id("Paris"));
        assert_eq!(id.len(), 32);
        assert_ne!(id, answer_id("Lyon"));
    }
}
