//! Form validation run before any request is dispatched.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::model::{PostForm, SigninForm, SignupForm};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

const PASSWORD_SYMBOLS: &str = "!%*#?&";
const PASSWORD_MIN_LEN: usize = 8;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field rejected by a form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("invalid input: {}", join(.fields))]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

fn join(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// First message reported for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

/// Input that can be checked locally.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    let username = username.trim();
    if username.is_empty() {
        errors.add("username", "email is required");
    } else if !EMAIL.is_match(username) {
        errors.add("username", "must be a valid email address");
    }
}

fn check_required(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, format!("{} is required", field));
    }
}

impl Validate for SignupForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        check_username(&mut errors, &self.username);
        check_required(&mut errors, "name", &self.name);

        if self.password.is_empty() {
            errors.add("password", "password is required");
        } else if self.password.chars().count() < PASSWORD_MIN_LEN
            || !self.password.chars().any(|c| c.is_ascii_alphabetic())
            || !self.password.chars().any(|c| c.is_ascii_digit())
            || !self.password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
        {
            errors.add(
                "password",
                format!(
                    "must be at least {} characters with a letter, a digit and one of {}",
                    PASSWORD_MIN_LEN, PASSWORD_SYMBOLS
                ),
            );
        }

        if self.confirm_password.is_empty() {
            errors.add("confirmPassword", "password confirmation is required");
        } else if self.confirm_password != self.password {
            errors.add("confirmPassword", "passwords do not match");
        }

        errors.into_result()
    }
}

impl Validate for SigninForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_username(&mut errors, &self.username);
        if self.password.is_empty() {
            errors.add("password", "password is required");
        }
        errors.into_result()
    }
}

impl Validate for PostForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_required(&mut errors, "title", &self.title);
        check_required(&mut errors, "content", &self.content);
        check_required(&mut errors, "category", &self.category);
        errors.into_result()
    }
}
