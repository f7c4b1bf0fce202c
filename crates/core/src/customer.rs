//! Customer accounts and the auth forms that create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, Email, Phone};
use crate::validation::ValidationErrors;

pub const MIN_PASSWORD_CHARS: usize = 8;

/// A customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// First word of the name, for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(&self.full_name)
    }
}

/// Login response: a bearer token and the customer it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "accessToken")]
    pub token: String,
    #[serde(alias = "user")]
    pub customer: Customer,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Where to go after login.
    #[serde(default)]
    pub next: Option<String>,
}

/// Validated credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: Email,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns per-field errors for a malformed email or an empty password.
    pub fn validate(&self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = Email::parse(&self.email)
            .map_err(|_| errors.add("email", "Enter a valid email address."))
            .ok();
        if self.password.is_empty() {
            errors.add("password", "Enter your password.");
        }
        match email {
            Some(email) if errors.is_empty() => Ok(Credentials {
                email,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub full_name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<Phone>,
    pub password: String,
}

impl RegisterForm {
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.add("full_name", "Please enter your name.");
        }
        let email = Email::parse(&self.email)
            .map_err(|_| errors.add("email", "Enter a valid email address."))
            .ok();
        let phone = if self.phone.trim().is_empty() {
            None
        } else {
            Phone::parse(&self.phone)
                .map_err(|_| errors.add("phone", "Enter a phone number with 9 to 15 digits."))
                .ok()
        };
        if self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("Use at least {MIN_PASSWORD_CHARS} characters."),
            );
        }
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match.");
        }

        match email {
            Some(email) if errors.is_empty() => Ok(Registration {
                full_name: full_name.to_owned(),
                email,
                phone,
                password: self.password.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Body of `PUT /api/customers/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<Phone>,
    pub address: Option<String>,
}

impl ProfileForm {
    /// # Errors
    ///
    /// Returns per-field errors for an empty name or a malformed phone.
    pub fn validate(&self) -> Result<ProfileUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.add("full_name", "Please enter your name.");
        }
        let phone = if self.phone.trim().is_empty() {
            None
        } else {
            Phone::parse(&self.phone)
                .map_err(|_| errors.add("phone", "Enter a phone number with 9 to 15 digits."))
                .ok()
        };
        let address = self.address.trim();
        errors.into_result(ProfileUpdate {
            full_name: full_name.to_owned(),
            phone,
            address: (!address.is_empty()).then(|| address.to_owned()),
        })
    }
}
