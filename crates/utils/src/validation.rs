//! Field-level request validation.
//!
//! Request types implement [`Validate`]; every failing field contributes one or
//! more messages and the whole set is rendered as a single string such as
//! `email: Invalid email; password: Must be at least 6 characters`.

use std::{fmt, sync::LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use uuid::Uuid;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        errors.into_error()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collects messages per field, preserving the order fields were first seen.
#[derive(Debug, Default)]
pub struct FieldErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, messages)) => messages.push(message.to_string()),
            None => self
                .fields
                .push((field.to_string(), vec![message.to_string()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "Required");
        }
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.add(field, &format!("Must be at least {min} characters"));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_email(value) {
            self.add(field, "Invalid email");
        }
    }

    pub fn uuid(&mut self, field: &str, value: Option<&str>) {
        if value.is_some_and(|v| Uuid::parse_str(v).is_err()) {
            self.add(field, "Invalid uuid");
        }
    }

    /// Blank values are left to [`FieldErrors::required`].
    pub fn date(&mut self, field: &str, value: Option<&str>) {
        if value.is_some_and(|v| !v.trim().is_empty() && !is_date(v)) {
            self.add(field, "Invalid date");
        }
    }

    pub fn urls(&mut self, field: &str, values: Option<&[String]>) {
        if values.is_some_and(|values| values.iter().any(|v| !is_url(v))) {
            self.add(field, "Invalid url");
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            let expected = allowed
                .iter()
                .map(|v| format!("'{v}'"))
                .collect::<Vec<_>>()
                .join(" | ");
            self.add(
                field,
                &format!("Invalid enum value. Expected {expected}, received '{value}'"),
            );
        }
    }

    pub fn into_error(self) -> ValidationError {
        let message = self
            .fields
            .into_iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        ValidationError::new(message)
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn is_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| u.has_host())
}

/// A calendar date, a local date-time as sent by `datetime-local` inputs, or
/// an RFC 3339 timestamp.
pub fn is_date(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_grouped_per_field_in_first_seen_order() {
        let mut errors = FieldErrors::default();
        errors.email("email", "not-an-email");
        errors.min_len("password", "short", 6);
        errors.add("email", "Too long");
        let err = errors.finish().unwrap_err();
        assert_eq!(
            err.message(),
            "email: Invalid email, Too long; password: Must be at least 6 characters"
        );
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(FieldErrors::default().finish().is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last+tag@mail.example.org"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("a@b"));
    }

    #[test]
    fn enum_message_lists_expected_values() {
        let mut errors = FieldErrors::default();
        errors.one_of("status", "DONE", &["PENDING", "CONFIRMED"]);
        assert_eq!(
            errors.finish().unwrap_err().message(),
            "status: Invalid enum value. Expected 'PENDING' | 'CONFIRMED', received 'DONE'"
        );
    }

    #[test]
    fn date_shapes() {
        assert!(is_date("2025-03-01"));
        assert!(is_date("2025-03-01T10:00"));
        assert!(is_date("2025-03-01T10:00:00Z"));
        assert!(is_date("2025-03-01T10:00:00+05:00"));
        assert!(!is_date("next tuesday"));
        assert!(!is_date("2025-13-01"));
    }

    #[test]
    fn blank_dates_are_not_reported_as_invalid() {
        let mut errors = FieldErrors::default();
        errors.date("from_date", Some(""));
        errors.date("to_date", None);
        assert!(errors.is_empty());
        errors.date("preferred_date", Some("soon"));
        assert_eq!(
            errors.finish().unwrap_err().message(),
            "preferred_date: Invalid date"
        );
    }

    #[test]
    fn urls_must_have_a_host() {
        assert!(is_url("https://res.cloudinary.com/demo/image/upload/x.jpg"));
        assert!(!is_url("not a url"));
    }
}
