// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::catalog::Named;

pub const TEMPLATE_MODE: &str = "compact";
pub const IMAGE_FORMAT: &str = "image";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub bin: u32,
    pub short_name: String,
    pub logo: String,
    pub transfer_supported: bool,
    pub lookup_supported: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "profileName")]
    pub name: String,
    #[serde(rename = "acqId")]
    pub bank_id: u32,
    #[serde(rename = "accountNo")]
    pub account_number: String,
    #[serde(rename = "accountName")]
    pub account_name: String,
}

impl Named for Profile {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub name: String,
    pub template: String,
}

impl Named for SavedMessage {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormState {
    pub bank_id: Option<u32>,
    pub account_number: String,
    pub account_name: String,
    pub amount: Option<u64>,
    pub message: String,
}

impl FormState {
    pub fn matches_profile(&self, profile: &Profile) -> bool {
        self.bank_id == Some(profile.bank_id)
            && self.account_number == profile.account_number
            && self.account_name == profile.account_name
    }

    pub fn apply_profile(&mut self, profile: &Profile) {
        self.bank_id = Some(profile.bank_id);
        self.account_number = profile.account_number.clone();
        self.account_name = profile.account_name.clone();
    }

    pub fn account_key(&self) -> Option<(u32, &str, &str)> {
        let bank_id = self.bank_id.filter(|id| *id != 0)?;
        if self.account_number.is_empty() || self.account_name.is_empty() {
            return None;
        }
        Some((bank_id, &self.account_number, &self.account_name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    BankId,
    AccountNumber,
    AccountName,
    Amount,
    Message,
}

impl FormField {
    pub const ALL: [Self; 5] = [
        Self::BankId,
        Self::AccountNumber,
        Self::AccountName,
        Self::Amount,
        Self::Message,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankId => "bankId",
            Self::AccountNumber => "accountNumber",
            Self::AccountName => "accountName",
            Self::Amount => "amount",
            Self::Message => "message",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bankId" | "acqId" => Some(Self::BankId),
            "accountNumber" | "accountNo" => Some(Self::AccountNumber),
            "accountName" => Some(Self::AccountName),
            "amount" => Some(Self::Amount),
            "message" | "addInfo" => Some(Self::Message),
            _ => None,
        }
    }

    pub const fn is_profile_key(self) -> bool {
        matches!(
            self,
            Self::BankId | Self::AccountNumber | Self::AccountName
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationState {
    #[default]
    Unknown,
    Detecting,
    Resolved(String),
    Failed(String),
}

impl LocationState {
    pub fn resolved_name(&self) -> Option<&str> {
        match self {
            Self::Resolved(name) => Some(name),
            _ => None,
        }
    }

    pub fn status_line(&self) -> Option<String> {
        match self {
            Self::Unknown => None,
            Self::Detecting => Some("Detecting location...".to_owned()),
            Self::Resolved(name) => Some(format!("Location: {name}")),
            Self::Failed(reason) => Some(format!("Error: {reason}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrRequest {
    pub acq_id: u32,
    pub account_no: String,
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    pub add_info: String,
    pub template: String,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrImage {
    #[serde(rename = "qrCode")]
    pub qr_code: String,
    #[serde(rename = "qrDataURL")]
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrOutcome {
    pub succeeded: bool,
    pub description: String,
    pub image: Option<QrImage>,
}
