// src/models/question.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use url::Url;
use validator::Validate;

/// One of the four answer slots of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored or submitted label is not one of A-D.
#[derive(Debug, thiserror::Error)]
#[error("invalid option label '{0}'")]
pub struct InvalidOptionLabel(pub String);

impl TryFrom<String> for OptionLabel {
    type Error = InvalidOptionLabel;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(OptionLabel::A),
            "B" => Ok(OptionLabel::B),
            "C" => Ok(OptionLabel::C),
            "D" => Ok(OptionLabel::D),
            _ => Err(InvalidOptionLabel(value)),
        }
    }
}

/// Represents the 'exam_questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,

    /// The prompt shown to the candidate.
    pub question: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    #[sqlx(try_from = "String")]
    pub correct_answer: OptionLabel,

    /// Object key inside the public media bucket, if the question has a picture.
    pub image_path: Option<String>,
}

impl Question {
    /// Copy of the question content kept with a result, image excluded.
    pub fn snapshot(&self) -> QuestionSnapshot {
        QuestionSnapshot {
            id: self.id,
            question: self.question.clone(),
            option_a: self.option_a.clone(),
            option_b: self.option_b.clone(),
            option_c: self.option_c.clone(),
            option_d: self.option_d.clone(),
            correct_answer: self.correct_answer,
        }
    }
}

/// Denormalized question content stored inside each exam result so the
/// review survives later edits of the question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionSnapshot {
    pub id: i64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: OptionLabel,
}

impl QuestionSnapshot {
    pub fn option_text(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.option_a,
            OptionLabel::B => &self.option_b,
            OptionLabel::C => &self.option_c,
            OptionLabel::D => &self.option_d,
        }
    }
}

/// DTO for sending a question to the candidate (excludes the answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub image_url: Option<String>,
}

impl PublicQuestion {
    pub fn from_question(question: &Question, media_base: Option<&Url>) -> Self {
        let image_url = match (media_base, question.image_path.as_deref().map(str::trim)) {
            (Some(base), Some(path)) if !path.is_empty() => {
                base.join(path).ok().map(|url| url.to_string())
            }
            _ => None,
        };

        Self {
            id: question.id,
            question: question.question.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
            option_c: question.option_c.clone(),
            option_d: question.option_d.clone(),
            image_url,
        }
    }
}

/// DTO for authoring a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    pub correct_answer: OptionLabel,
    #[validate(length(max = 255))]
    pub image_path: Option<String>,
}
