// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use time::{OffsetDateTime, UtcOffset};
use vietqr_api::{Client, Geocoder};
use vietqr_app::{AppRuntime, Decision, Profile, QrOutcome, QrRequest, SavedMessage};
use vietqr_store::Store;

use crate::config::Config;

pub fn open_store(config: &Config) -> Result<Store> {
    let db_path = config.db_path()?;
    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or {}",
            db_path.display(),
            vietqr_store::DB_PATH_ENV
        )
    })?;
    store.bootstrap()?;
    Ok(store)
}

pub fn api_client(config: &Config) -> Result<Client> {
    let client = Client::new(config.api_base_url(), config.api_timeout()?)
        .context("invalid [api] config; fix base_url/timeout values")?;
    Ok(client.with_credentials(config.api_client_id(), config.api_key()))
}

pub fn geocoder(config: &Config) -> Result<Option<Geocoder>> {
    if !config.location_enabled() {
        return Ok(None);
    }
    let geocoder = Geocoder::new(
        config.geocoder_url(),
        config.location_language(),
        config.location_timeout()?,
    )
    .context("invalid [location] config; fix geocoder_url/language/timeout values")?;
    Ok(Some(geocoder))
}

pub struct StoreRuntime<'a, F> {
    store: &'a Store,
    client: Client,
    offset: UtcOffset,
    confirm: F,
}

impl<'a, F> StoreRuntime<'a, F>
where
    F: FnMut(&Decision) -> bool,
{
    pub fn new(store: &'a Store, client: Client, offset: UtcOffset, confirm: F) -> Self {
        Self {
            store,
            client,
            offset,
            confirm,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl<F> AppRuntime for StoreRuntime<'_, F>
where
    F: FnMut(&Decision) -> bool,
{
    fn now(&mut self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    fn list_profiles(&mut self) -> Result<Vec<Profile>> {
        self.store.list_profiles()
    }

    fn upsert_profile(&mut self, profile: &Profile) -> Result<Vec<Profile>> {
        self.store.save_profile(profile)
    }

    fn remove_profile(&mut self, name: &str) -> Result<Vec<Profile>> {
        self.store.delete_profile(name)
    }

    fn list_messages(&mut self) -> Result<Vec<SavedMessage>> {
        self.store.list_messages()
    }

    fn upsert_message(&mut self, message: &SavedMessage) -> Result<Vec<SavedMessage>> {
        self.store.save_message(message)
    }

    fn remove_message(&mut self, name: &str) -> Result<Vec<SavedMessage>> {
        self.store.delete_message(name)
    }

    fn confirm(&mut self, decision: &Decision) -> bool {
        let answer = (self.confirm)(decision);
        tracing::debug!(prompt = %decision.prompt(), answer, "confirmation answered");
        answer
    }

    fn generate_qr(&mut self, request: &QrRequest) -> Result<QrOutcome> {
        self.client.generate_qr(request)
    }
}

#[cfg(test)]
mod tests {
    use super::StoreRuntime;
    use anyhow::Result;
    use std::time::Duration;
    use time::UtcOffset;
    use vietqr_api::Client;
    use vietqr_app::{AppRuntime, Decision, FormController, FormField, SaveOutcome};
    use vietqr_store::Store;

    fn store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        Ok(store)
    }

    #[test]
    fn clock_uses_configured_offset() -> Result<()> {
        let store = store()?;
        let offset = UtcOffset::from_hms(7, 0, 0)?;
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut runtime = StoreRuntime::new(&store, client, offset, |_: &Decision| false);
        assert_eq!(runtime.now().offset(), offset);
        Ok(())
    }

    #[test]
    fn controller_writes_through_to_the_store() -> Result<()> {
        let store = store()?;
        let client = Client::new("http://127.0.0.1:1", Duration::from_millis(50))?;
        let mut asked = Vec::new();
        let mut runtime = StoreRuntime::new(&store, client, UtcOffset::UTC, |decision: &Decision| {
            asked.push(decision.clone());
            true
        });

        let mut controller = FormController::new();
        controller.load(&mut runtime);
        controller.on_field_change(FormField::BankId, "970436");
        controller.on_field_change(FormField::AccountNumber, "0011");
        controller.on_field_change(FormField::AccountName, "Tran Thi B");
        controller.save_profile("Shop", &mut runtime)?;
        controller.on_field_change(FormField::AccountNumber, "0022");
        let outcome = controller.save_profile("shop", &mut runtime)?;
        drop(runtime);

        assert!(matches!(outcome, SaveOutcome::Saved { replaced: true, .. }));
        assert_eq!(asked.len(), 1);
        let stored = store.list_profiles()?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].account_number, "0022");
        Ok(())
    }
}
