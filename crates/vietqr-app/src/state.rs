// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use time::OffsetDateTime;

use crate::catalog::{Catalog, resolve_unique_name};
use crate::forms::{FormError, FormResult, normalize_field};
use crate::template::{LOCATION_PLACEHOLDER, default_message, process_template};
use crate::{
    Bank, FormField, FormState, IMAGE_FORMAT, LocationState, Profile, QrImage, QrOutcome,
    QrRequest, SavedMessage, TEMPLATE_MODE,
};

pub const BANKS_LOAD_ERROR: &str = "Failed to load the list of banks. Please refresh the page.";
pub const GENERATION_UNKNOWN_ERROR: &str = "An unknown error occurred.";
pub const GENERATION_UNEXPECTED_ERROR: &str =
    "An unexpected error occurred while generating the QR code.";

pub trait AppRuntime {
    fn now(&mut self) -> OffsetDateTime;
    fn list_profiles(&mut self) -> Result<Vec<Profile>>;
    fn upsert_profile(&mut self, profile: &Profile) -> Result<Vec<Profile>>;
    fn remove_profile(&mut self, name: &str) -> Result<Vec<Profile>>;
    fn list_messages(&mut self) -> Result<Vec<SavedMessage>>;
    fn upsert_message(&mut self, message: &SavedMessage) -> Result<Vec<SavedMessage>>;
    fn remove_message(&mut self, name: &str) -> Result<Vec<SavedMessage>>;
    fn confirm(&mut self, decision: &Decision) -> bool;
    fn generate_qr(&mut self, request: &QrRequest) -> Result<QrOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    OverwriteProfile { name: String },
    SaveProfileAs { name: String },
}

impl Decision {
    pub fn prompt(&self) -> String {
        match self {
            Self::OverwriteProfile { name } => format!(
                "A profile named \"{name}\" already exists. Do you want to update it?"
            ),
            Self::SaveProfileAs { name } => format!(
                "Would you like to save this as a new profile named \"{name}\" instead?"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { name: String, replaced: bool },
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub request_id: u64,
    pub request: QrRequest,
}

#[derive(Debug, Clone)]
pub struct FormController {
    form: FormState,
    banks: Vec<Bank>,
    profiles: Catalog<Profile>,
    messages: Catalog<SavedMessage>,
    selected_profile: Option<String>,
    selected_message: Option<String>,
    location: LocationState,
    message_editor_open: bool,
    result: Option<QrImage>,
    result_visible: bool,
    error: Option<String>,
    pending: Option<u64>,
    next_request_id: u64,
    alive: bool,
}

impl Default for FormController {
    fn default() -> Self {
        Self {
            form: FormState::default(),
            banks: Vec::new(),
            profiles: Catalog::new(),
            messages: Catalog::new(),
            selected_profile: None,
            selected_message: None,
            location: LocationState::Unknown,
            message_editor_open: false,
            result: None,
            result_visible: false,
            error: None,
            pending: None,
            next_request_id: 1,
            alive: true,
        }
    }
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(profiles: Vec<Profile>, messages: Vec<SavedMessage>) -> Self {
        Self {
            profiles: Catalog::from_vec(profiles),
            messages: Catalog::from_vec(messages),
            ..Self::default()
        }
    }

    pub fn load<R: AppRuntime + ?Sized>(&mut self, runtime: &mut R) {
        let profiles = runtime.list_profiles().unwrap_or_else(|error| {
            tracing::warn!(error = %format!("{error:#}"), "profile store unreadable");
            Vec::new()
        });
        let messages = runtime.list_messages().unwrap_or_else(|error| {
            tracing::warn!(error = %format!("{error:#}"), "message store unreadable");
            Vec::new()
        });
        self.profiles = Catalog::from_vec(profiles);
        self.messages = Catalog::from_vec(messages);
        self.drop_dangling_selections();
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn profiles(&self) -> &[Profile] {
        self.profiles.as_slice()
    }

    pub fn messages(&self) -> &[SavedMessage] {
        self.messages.as_slice()
    }

    pub fn selected_profile(&self) -> Option<&str> {
        self.selected_profile.as_deref()
    }

    pub fn selected_message(&self) -> Option<&str> {
        self.selected_message.as_deref()
    }

    pub fn location(&self) -> &LocationState {
        &self.location
    }

    pub fn location_status(&self) -> Option<String> {
        self.location.status_line()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&QrImage> {
        self.result.as_ref()
    }

    pub fn result_visible(&self) -> bool {
        self.result_visible && self.result.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn message_editor_open(&self) -> bool {
        self.message_editor_open
    }

    pub fn on_field_change(&mut self, field: FormField, raw: &str) {
        let value = normalize_field(field, raw);

        if field.is_profile_key() {
            let diverged = self.selected_profile.as_deref().is_some_and(|name| {
                let next = self.form.with_field(field, &value);
                !self
                    .profiles
                    .get(name)
                    .is_some_and(|profile| next.matches_profile(profile))
            });
            if diverged {
                tracing::debug!(field = field.as_str(), "profile deselected after edit");
                self.selected_profile = None;
            }
        }

        if field == FormField::Message {
            let diverged = self.selected_message.as_deref().is_some_and(|name| {
                self.messages
                    .get(name)
                    .is_none_or(|message| message.template != raw)
            });
            if diverged {
                tracing::debug!("message deselected after edit");
                self.selected_message = None;
            }
        }

        self.form.set_field(field, &value);
        if field == FormField::Message {
            self.reconcile_location();
        }
    }

    pub fn save_profile<R: AppRuntime + ?Sized>(
        &mut self,
        proposed: &str,
        runtime: &mut R,
    ) -> FormResult<SaveOutcome> {
        let name = proposed.trim();
        if name.is_empty() {
            return Err(self.fail(FormError::EmptyProfileName));
        }
        let key = self
            .form
            .account_key()
            .map(|(bank_id, number, holder)| (bank_id, number.to_owned(), holder.to_owned()));
        let Some((bank_id, account_number, account_name)) = key else {
            return Err(self.fail(FormError::MissingProfileFields));
        };

        let target = if self.profiles.contains(name) {
            let overwrite = Decision::OverwriteProfile {
                name: name.to_owned(),
            };
            if runtime.confirm(&overwrite) {
                name.to_owned()
            } else {
                let alternative = resolve_unique_name(name, self.profiles.names());
                let rename = Decision::SaveProfileAs {
                    name: alternative.clone(),
                };
                if !runtime.confirm(&rename) {
                    tracing::info!(profile = name, "profile save declined");
                    return Ok(SaveOutcome::Aborted);
                }
                alternative
            }
        } else {
            name.to_owned()
        };

        let replaced = self.profiles.contains(&target);
        let profile = Profile {
            name: target.clone(),
            bank_id,
            account_number,
            account_name,
        };
        let stored = runtime.upsert_profile(&profile).map_err(|error| {
            tracing::warn!(profile = %target, error = %format!("{error:#}"), "profile write failed");
            FormError::Storage(error.to_string())
        });
        let stored = match stored {
            Ok(stored) => stored,
            Err(error) => return Err(self.fail(error)),
        };

        tracing::debug!(profile = %target, replaced, "profile saved");
        self.profiles = Catalog::from_vec(stored);
        self.selected_profile = Some(target.clone());
        self.error = None;
        Ok(SaveOutcome::Saved {
            name: target,
            replaced,
        })
    }

    pub fn select_profile(&mut self, name: &str) -> bool {
        let Some(profile) = self.profiles.get(name).cloned() else {
            self.selected_profile = None;
            return false;
        };
        self.form.apply_profile(&profile);
        self.selected_profile = Some(profile.name);
        self.result = None;
        self.result_visible = false;
        self.error = None;
        true
    }

    pub fn delete_profile<R: AppRuntime + ?Sized>(
        &mut self,
        name: &str,
        runtime: &mut R,
    ) -> FormResult<()> {
        let stored = runtime.remove_profile(name).map_err(|error| {
            tracing::warn!(profile = name, error = %format!("{error:#}"), "profile delete failed");
            FormError::Storage(error.to_string())
        })?;
        self.profiles = Catalog::from_vec(stored);
        self.drop_dangling_selections();
        Ok(())
    }

    pub fn select_message<R: AppRuntime + ?Sized>(&mut self, name: &str, runtime: &mut R) -> bool {
        if name.trim().is_empty() {
            self.selected_message = None;
            self.form.message.clear();
            return false;
        }
        let Some(message) = self.messages.get(name).cloned() else {
            self.selected_message = None;
            return false;
        };
        let now = runtime.now();
        self.form.message = process_template(&message.template, self.location.resolved_name(), now);
        self.selected_message = Some(message.name);
        true
    }

    pub fn save_message<R: AppRuntime + ?Sized>(
        &mut self,
        name: &str,
        template: &str,
        runtime: &mut R,
    ) -> FormResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail(FormError::EmptyMessageName));
        }
        if template.trim().is_empty() {
            return Err(self.fail(FormError::EmptyMessageTemplate));
        }

        let replaced = self.messages.contains(name);
        let message = SavedMessage {
            name: name.to_owned(),
            template: template.to_owned(),
        };
        let stored = match runtime.upsert_message(&message) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(message = name, error = %format!("{error:#}"), "message write failed");
                return Err(self.fail(FormError::Storage(error.to_string())));
            }
        };
        tracing::debug!(message = name, replaced, "message saved");
        self.messages = Catalog::from_vec(stored);
        Ok(replaced)
    }

    pub fn delete_message<R: AppRuntime + ?Sized>(
        &mut self,
        name: &str,
        runtime: &mut R,
    ) -> FormResult<()> {
        let stored = runtime.remove_message(name).map_err(|error| {
            tracing::warn!(message = name, error = %format!("{error:#}"), "message delete failed");
            FormError::Storage(error.to_string())
        })?;
        self.messages = Catalog::from_vec(stored);
        self.drop_dangling_selections();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.form.amount = None;
        self.form.message.clear();
        self.selected_message = None;
        self.result = None;
        self.result_visible = false;
        self.error = None;
    }

    pub fn dismiss_result(&mut self) {
        self.result_visible = false;
    }

    pub fn set_message_editor_open(&mut self, open: bool) {
        self.message_editor_open = open;
        if !open {
            self.reconcile_location();
        }
    }

    pub fn begin_submit(&mut self, now: OffsetDateTime) -> FormResult<PendingGeneration> {
        if self.pending.is_some() {
            return Err(self.fail(FormError::GenerationInFlight));
        }
        self.error = None;
        self.result = None;
        self.result_visible = false;

        let key = self
            .form
            .account_key()
            .map(|(bank_id, number, holder)| (bank_id, number.to_owned(), holder.to_owned()));
        let Some((bank_id, account_number, account_name)) = key else {
            return Err(self.fail(FormError::MissingPaymentFields));
        };

        let raw_message = self.form.message.trim();
        let add_info = if raw_message.is_empty() {
            default_message(now.hour()).to_owned()
        } else {
            process_template(raw_message, self.location.resolved_name(), now)
        };

        let request = QrRequest {
            acq_id: bank_id,
            account_no: account_number,
            account_name,
            amount: self.form.amount,
            add_info,
            template: TEMPLATE_MODE.to_owned(),
            format: IMAGE_FORMAT.to_owned(),
        };
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.pending = Some(request_id);
        Ok(PendingGeneration {
            request_id,
            request,
        })
    }

    // Applies a generation result. Returns false when the result is stale or the controller
    // has been torn down.
    pub fn finish_generation(
        &mut self,
        request_id: u64,
        result: std::result::Result<QrOutcome, String>,
    ) -> bool {
        if !self.alive {
            tracing::debug!(request_id, "generation result discarded after teardown");
            return false;
        }
        if self.pending != Some(request_id) {
            tracing::debug!(request_id, "stale generation result discarded");
            return false;
        }
        self.pending = None;

        match result {
            Ok(outcome) if outcome.succeeded => {
                let has_image = outcome.image.is_some();
                tracing::info!(request_id, has_image, "QR code generated");
                self.result = outcome.image;
                self.result_visible = self.result.is_some();
            }
            Ok(outcome) => {
                tracing::warn!(request_id, description = %outcome.description, "QR generation rejected");
                self.error = Some(non_empty_or(outcome.description, GENERATION_UNKNOWN_ERROR));
            }
            Err(message) => {
                tracing::warn!(request_id, error = %message, "QR generation failed");
                self.error = Some(non_empty_or(message, GENERATION_UNEXPECTED_ERROR));
            }
        }
        true
    }

    pub fn submit<R: AppRuntime + ?Sized>(&mut self, runtime: &mut R) -> FormResult<bool> {
        let now = runtime.now();
        let pending = self.begin_submit(now)?;
        let result = runtime
            .generate_qr(&pending.request)
            .map_err(|error| format!("{error:#}"));
        self.finish_generation(pending.request_id, result);
        Ok(self.error.is_none())
    }

    pub fn begin_location_lookup(&mut self) -> bool {
        if !self.alive || self.location != LocationState::Unknown {
            return false;
        }
        self.location = LocationState::Detecting;
        true
    }

    pub fn apply_location(&mut self, result: std::result::Result<String, String>) -> bool {
        if !self.alive || self.location != LocationState::Detecting {
            tracing::debug!("location result discarded");
            return false;
        }
        match result {
            Ok(name) => {
                tracing::info!(location = %name, "location resolved");
                self.location = LocationState::Resolved(name);
                self.reconcile_location();
            }
            Err(reason) => {
                tracing::warn!(%reason, "location lookup failed");
                self.location = LocationState::Failed(reason);
            }
        }
        true
    }

    pub fn apply_banks(&mut self, result: std::result::Result<Vec<Bank>, String>) -> bool {
        if !self.alive {
            tracing::debug!("bank list discarded after teardown");
            return false;
        }
        match result {
            Ok(banks) => {
                tracing::info!(count = banks.len(), "bank list loaded");
                if self.form.bank_id.is_none()
                    && let Some(first) = banks.first()
                {
                    self.form.bank_id = Some(first.bin);
                }
                self.banks = banks;
            }
            Err(reason) => {
                tracing::warn!(%reason, "bank list failed to load");
                self.banks.clear();
                self.error = Some(BANKS_LOAD_ERROR.to_owned());
            }
        }
        true
    }

    pub fn teardown(&mut self) {
        self.alive = false;
    }

    fn reconcile_location(&mut self) {
        if self.message_editor_open {
            return;
        }
        let Some(name) = self.location.resolved_name().filter(|name| !name.is_empty()) else {
            return;
        };
        if self.form.message.contains(LOCATION_PLACEHOLDER) {
            self.form.message = self.form.message.replace(LOCATION_PLACEHOLDER, name);
        }
    }

    fn drop_dangling_selections(&mut self) {
        if let Some(name) = &self.selected_profile
            && !self.profiles.contains(name)
        {
            self.selected_profile = None;
        }
        if let Some(name) = &self.selected_message
            && !self.messages.contains(name)
        {
            self.selected_message = None;
            self.form.message.clear();
        }
    }

    fn fail(&mut self, error: FormError) -> FormError {
        self.error = Some(error.to_string());
        error
    }
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_owned()
    } else {
        text
    }
}
