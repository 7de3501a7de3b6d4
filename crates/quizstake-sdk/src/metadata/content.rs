//! Descriptive lesson content: the record stored off-chain and referenced
//! from a pool's `metadata_uri`, plus the placeholder generated when no
//! stored record can be found anywhere.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

/// One quiz question. `correct_option` indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_option: usize,
    #[serde(default)]
    pub explanation: String,
}

/// Off-chain lesson record. Unknown fields from remote stores are ignored;
/// absent optional fields default so a sparse document still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonMetadata {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_secs: u64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Label for an answer slot: `A`–`Z`, then numeric.
pub fn option_label(index: usize) -> String {
    if index < 26 {
        let letter = (b'A' + index as u8) as char;
        format!("Option {letter}")
    } else {
        format!("Option {}", index + 1)
    }
}

/// Fallback record when no stored metadata exists for `key`. The single
/// question carries exactly `choice_count` options so choice indices stay
/// aligned with the on-chain pool.
pub fn placeholder(key: &str, choice_count: u8) -> LessonMetadata {
    let options = (0..choice_count as usize).map(option_label).collect();
    LessonMetadata {
        title: format!("Lesson {key}"),
        description: "Details for this lesson are not available yet.".into(),
        questions: vec![Question {
            id: format!("{key}-q1"),
            prompt: "Which option wins?".into(),
            options,
            correct_option: 0,
            explanation: String::new(),
        }],
        ..LessonMetadata::default()
    }
}

/// Force every question's option list to exactly `choice_count` entries,
/// padding with labeled slots or truncating, and clamp `correct_option`
/// into range. Stored metadata can disagree with the on-chain choice count;
/// the chain wins.
pub fn normalize(mut metadata: LessonMetadata, choice_count: u8) -> LessonMetadata {
    let want = choice_count as usize;
    if want == 0 {
        return metadata;
    }
    for question in &mut metadata.questions {
        if question.options.len() > want {
            question.options.truncate(want);
        } else {
            while question.options.len() < want {
                question.options.push(option_label(question.options.len()));
            }
        }
        if question.correct_option >= want {
            question.correct_option = want - 1;
        }
    }
    metadata
}
