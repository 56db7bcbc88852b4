//! The FAQ/chat assistant: a fixed persona prompt in front of the completion backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;
use utils::validation::{FieldErrors, Validate, ValidationError};

use super::completion::{
    ChatMessage, ChatRole, CompletionBackend, CompletionError, SamplingParams,
};

const ASK_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Could you rephrase your question?";
const CHAT_FALLBACK: &str =
    "I apologize, but I couldn't generate a response. Could you try asking in a different way?";

const SCHEDULING_KEYWORDS: &[&str] = &[
    "appointment",
    "book",
    "schedule",
    "scheduling",
    "reschedule",
    "availability",
    "available",
    "time slot",
    "calendar",
    "site visit",
    "meet",
];

/// Contact details the assistant hands out instead of booking anything itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCard {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub booking_url: String,
    pub website: String,
    pub hours_weekdays: String,
    pub hours_saturday: String,
}

impl Default for BusinessCard {
    fn default() -> Self {
        Self {
            name: "RECON Solutions".to_string(),
            phone: "+92 300 1234567".to_string(),
            email: "info@reconsolutions.com".to_string(),
            booking_url: "https://reconsolutions.com/appointments".to_string(),
            website: "https://reconsolutions.com".to_string(),
            hours_weekdays: "Mon–Fri, 9:00 AM – 6:00 PM (PKT)".to_string(),
            hours_saturday: "Sat, 10:00 AM – 2:00 PM (PKT)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct AskBody {
    #[serde(default)]
    pub question: String,
}

impl Validate for AskBody {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.min_len("question", &self.question, 1);
        errors.finish()
    }
}

/// One turn as sent by the client. The role stays a plain string until validated.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct ChatTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ChatBody {
    #[serde(default)]
    pub messages: Vec<ChatTurn>,
}

const CHAT_ROLES: &[&str] = &["user", "assistant", "system"];

impl Validate for ChatBody {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        if self.messages.is_empty() {
            errors.add("messages", "Array must contain at least 1 element(s)");
        }
        for (i, turn) in self.messages.iter().enumerate() {
            errors.one_of(&format!("messages.{i}.role"), &turn.role, CHAT_ROLES);
        }
        errors.finish()
    }
}

impl ChatTurn {
    fn to_message(&self) -> Option<ChatMessage> {
        let role = match self.role.as_str() {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            "system" => ChatRole::System,
            _ => return None,
        };
        Some(ChatMessage {
            role,
            content: self.content.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

/// Whether a user message is about booking, scheduling or availability.
pub fn asks_about_scheduling(text: &str) -> bool {
    let text = text.to_lowercase();
    SCHEDULING_KEYWORDS.iter().any(|keyword| text.contains(keyword))
}

#[derive(Clone)]
pub struct Assistant {
    backend: Arc<dyn CompletionBackend>,
    card: BusinessCard,
}

impl Assistant {
    pub fn new(backend: Arc<dyn CompletionBackend>, card: BusinessCard) -> Self {
        Self { backend, card }
    }

    fn ask_params() -> SamplingParams {
        SamplingParams {
            temperature: 0.8,
            max_tokens: 600,
            top_p: 0.9,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    fn chat_params() -> SamplingParams {
        SamplingParams {
            frequency_penalty: Some(0.3),
            presence_penalty: Some(0.2),
            ..Self::ask_params()
        }
    }

    pub async fn ask(&self, body: AskBody) -> Result<AskResponse, CompletionError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt(&body.question)),
            ChatMessage::user(body.question.clone()),
        ];

        let answer = self.backend.complete(&messages, &Self::ask_params()).await?;
        if answer.is_none() {
            warn!("Completion returned no text for ask");
        }

        Ok(AskResponse {
            question: body.question,
            answer: answer.unwrap_or_else(|| ASK_FALLBACK.to_string()),
            timestamp: Utc::now(),
        })
    }

    pub async fn chat(&self, body: ChatBody) -> Result<ChatResponse, CompletionError> {
        let latest_user_turn = body
            .messages
            .iter()
            .rev()
            .find(|turn| turn.role == "user")
            .map(|turn| turn.content.as_str())
            .unwrap_or_default();

        let mut messages = Vec::with_capacity(body.messages.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt(latest_user_turn)));
        messages.extend(body.messages.iter().filter_map(ChatTurn::to_message));
        debug!(turns = messages.len(), "Sending chat to completion backend");

        let response = self
            .backend
            .complete(&messages, &Self::chat_params())
            .await?;
        if response.is_none() {
            warn!("Completion returned no text for chat");
        }

        Ok(ChatResponse {
            response: response.unwrap_or_else(|| CHAT_FALLBACK.to_string()),
            timestamp: Utc::now(),
        })
    }

    /// Persona prompt, extended with booking contacts when the user asks to schedule.
    pub fn system_prompt(&self, latest_user_turn: &str) -> String {
        let mut prompt = persona_prompt(&self.card.name);
        if asks_about_scheduling(latest_user_turn) {
            prompt.push_str(&scheduling_instructions(&self.card));
        }
        prompt
    }
}

fn persona_prompt(name: &str) -> String {
    format!(
        r#"You are the AI assistant for {name}, a construction and professional services company. You speak for the company. You are not a person and you have no personal life, feelings or projects of your own.

Identity and tone:
- Be warm, clear and professional, without pretending to be human.
- Do not say things like "I'm doing great!" or "How about you?", and never talk about "your" day, "your" projects or "your" life.
- When the user greets you or makes small talk, answer briefly and steer back to how you can help, for example: "Hello! I'm here to help with construction questions and {name} services. What would you like to know?"
- Stay on construction, renovation, services, scheduling and {name}. Gently redirect off-topic or personal chat.

Response guidelines:
- Keep answers short and scannable (200-300 words at most).
- Give 3-5 key points, not long lists.
- Use plain language and avoid jargon unless it is needed.
- Finish with a relevant next step or a question about the user's project.
- Use at most one emoji, and only when it fits (for example 🏗️).

Format:
- **Bold** for service names, key terms and highlights.
- Paragraphs of 2-3 sentences.
- Numbered lists for specific items, bullet points sparingly for quick tips.

Topics you help with:
- Construction planning and timelines
- Budgets and cost-saving tips
- Material selection and quality
- Permits and regulations
- Renovation design and use of space
- Choosing contractors and managing a project
- {name} services, consultations and appointments

Example (on-topic question):
"Here's a typical timeline for a kitchen renovation:

1. **Planning & Design** (1–2 weeks) – layouts and materials
2. **Demo & Rough-In** (1–2 weeks) – removal and infrastructure
3. **Installation** (3–4 weeks) – cabinets, countertops, finishes

Good planning upfront saves the most time. What size of kitchen are you considering? I can tailor the advice or point you to our consultation page."

Example (greeting or off-topic):
"Hi! I'm the {name} assistant. I can help with construction questions, renovation advice, or how to request a consultation or book an appointment. What do you need help with?""#
    )
}

fn scheduling_instructions(card: &BusinessCard) -> String {
    format!(
        r#"

IMPORTANT: The user is asking about scheduling. Remember:
- You CANNOT schedule appointments or book consultations
- You CANNOT access calendars or send confirmation emails
- Direct them to these contact methods:
  Phone: {phone}
  Email: {email}
  Booking: {booking_url}
  Hours: {weekdays}; {saturday}
- Do NOT pretend to have scheduled anything
- Do NOT offer specific time slots as if you can book them
- Do NOT say "I'll send you a confirmation email"
- Instead say something like: "To schedule your consultation, please call us at {phone} or book online at {booking_url}""#,
        phone = card.phone,
        email = card.email,
        booking_url = card.booking_url,
        weekdays = card.hours_weekdays,
        saturday = card.hours_saturday,
    )
}
