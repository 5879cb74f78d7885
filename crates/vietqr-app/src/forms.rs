// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FormField, FormState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    MissingProfileFields,
    EmptyProfileName,
    EmptyMessageName,
    EmptyMessageTemplate,
    MissingPaymentFields,
    GenerationInFlight,
    Storage(String),
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingProfileFields | Self::EmptyProfileName => f.write_str(
                "Cannot save profile with missing bank, account number, or account name.",
            ),
            Self::EmptyMessageName => f.write_str("Message name is required."),
            Self::EmptyMessageTemplate => f.write_str("Message text is required."),
            Self::MissingPaymentFields => f.write_str(
                "Please fill in all required fields: Bank, Account Number, and Account Name.",
            ),
            Self::GenerationInFlight => {
                f.write_str("A QR code is already being generated -- wait for it to finish.")
            }
            Self::Storage(detail) => write!(f, "Could not save changes: {detail}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = std::result::Result<T, FormError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Integer(Option<u64>),
    Text(String),
}

pub fn normalize_field(field: FormField, raw: &str) -> FieldValue {
    match field {
        FormField::AccountName => FieldValue::Text(normalize_account_name(raw)),
        FormField::BankId | FormField::Amount => FieldValue::Integer(parse_optional_integer(raw)),
        FormField::AccountNumber | FormField::Message => FieldValue::Text(raw.to_owned()),
    }
}

pub fn normalize_account_name(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphabetic() || ch.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn parse_optional_integer(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<u64>() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(input = trimmed, %error, "ignoring non-integer field value");
            None
        }
    }
}

impl FormState {
    pub fn with_field(&self, field: FormField, value: &FieldValue) -> Self {
        let mut next = self.clone();
        next.set_field(field, value);
        next
    }

    pub fn set_field(&mut self, field: FormField, value: &FieldValue) {
        match (field, value) {
            (FormField::BankId, FieldValue::Integer(value)) => {
                self.bank_id = value.and_then(|bin| u32::try_from(bin).ok());
            }
            (FormField::Amount, FieldValue::Integer(value)) => {
                self.amount = value.filter(|amount| *amount > 0);
            }
            (FormField::AccountNumber, FieldValue::Text(text)) => {
                self.account_number = text.clone();
            }
            (FormField::AccountName, FieldValue::Text(text)) => {
                self.account_name = normalize_account_name(text);
            }
            (FormField::Message, FieldValue::Text(text)) => {
                self.message = text.clone();
            }
            (field, value) => {
                tracing::warn!(field = field.as_str(), ?value, "mismatched field value kind");
            }
        }
    }
}
