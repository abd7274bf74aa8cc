use serde::Serialize;

use crate::services::ai::{LlmProvider, Message};

const MAX_QUESTION_CHARS: usize = 2000;

const BASE_PROMPT: &str = r#"You are a knowledgeable virtual guide for Musanze, Rwanda. You help visitors plan their trip and answer questions about:

- Volcanoes National Park: gorilla trekking, golden monkey tracking, volcano hikes
- The Twin Lakes (Burera and Ruhondo): viewpoints and boat rides
- Musanze Caves
- Cultural villages and traditional experiences
- Accommodation from budget lodges to luxury resorts
- Getting around: private cars, shared taxis, moto-taxis
- Local food and restaurants
- Weather and what to pack
- Permits and how to book them
- Safety, local customs and etiquette

Give helpful, accurate and friendly answers. Mention practical details such as prices when relevant (gorilla permits are about $1,500, golden monkey permits about $100). Always put visitor safety and sustainable tourism first."#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Fr,
    Rw,
    Sw,
}

impl Language {
    /// Unknown or missing codes fall back to English.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_lowercase()).as_deref() {
            Some("fr") => Language::Fr,
            Some("rw") => Language::Rw,
            Some("sw") => Language::Sw,
            _ => Language::En,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "French",
            Language::Rw => "Kinyarwanda",
            Language::Sw => "Swahili",
        }
    }

    pub fn apology(&self) -> &'static str {
        match self {
            Language::Fr => "Désolé, je rencontre des difficultés pour répondre. Veuillez réessayer plus tard.",
            _ => "I'm sorry, I'm having trouble responding right now. Please try again later.",
        }
    }
}

pub fn system_prompt(language: Language) -> String {
    format!(
        "{BASE_PROMPT}\n\nAlways reply in {}, whatever language the question is asked in.",
        language.name()
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct GuideAnswer {
    pub response: String,
    pub language: Language,
}

#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("{0}")]
    InvalidQuestion(String),
    #[error("assistant failed: {0}")]
    Provider(#[from] anyhow::Error),
}

pub async fn ask(
    llm: &dyn LlmProvider,
    message: &str,
    language: Language,
) -> Result<GuideAnswer, GuideError> {
    let question = message.trim();
    if question.is_empty() {
        return Err(GuideError::InvalidQuestion("message is required".to_string()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(GuideError::InvalidQuestion(format!(
            "message must be at most {MAX_QUESTION_CHARS} characters"
        )));
    }

    let messages = [Message::user(question)];
    let response = llm.chat(&system_prompt(language), &messages).await?;

    Ok(GuideAnswer {
        response: response.trim().to_string(),
        language,
    })
}
