// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::VecDeque;
use time::{Date, Month, OffsetDateTime, Time, UtcOffset};
use vietqr_app::{
    AppRuntime, Bank, Catalog, Decision, Profile, QrImage, QrOutcome, QrRequest, SavedMessage,
};

const BANKS: [(i64, &str, &str, u32, &str); 4] = [
    (17, "Ngân hàng TMCP Công thương Việt Nam", "ICB", 970_415, "VietinBank"),
    (43, "Ngân hàng TMCP Ngoại Thương Việt Nam", "VCB", 970_436, "Vietcombank"),
    (4, "Ngân hàng TMCP Đầu tư và Phát triển Việt Nam", "BIDV", 970_418, "BIDV"),
    (42, "Ngân hàng TMCP Kỹ thương Việt Nam", "TCB", 970_407, "Techcombank"),
];

pub fn at(hour: u8, minute: u8) -> Result<OffsetDateTime> {
    let date = Date::from_calendar_date(2026, Month::March, 7)?;
    let time = Time::from_hms(hour, minute, 0)?;
    let offset = UtcOffset::from_hms(7, 0, 0)?;
    Ok(date.with_time(time).assume_offset(offset))
}

pub fn sample_banks() -> Vec<Bank> {
    BANKS
        .iter()
        .map(|(id, name, code, bin, short_name)| Bank {
            id: *id,
            name: (*name).to_owned(),
            code: (*code).to_owned(),
            bin: *bin,
            short_name: (*short_name).to_owned(),
            logo: format!("https://api.vietqr.io/img/{code}.png"),
            transfer_supported: true,
            lookup_supported: true,
        })
        .collect()
}

pub fn profile(name: &str, bank_id: u32, account_number: &str, account_name: &str) -> Profile {
    Profile {
        name: name.to_owned(),
        bank_id,
        account_number: account_number.to_owned(),
        account_name: account_name.to_owned(),
    }
}

pub fn message(name: &str, template: &str) -> SavedMessage {
    SavedMessage {
        name: name.to_owned(),
        template: template.to_owned(),
    }
}

pub fn qr_success() -> QrOutcome {
    QrOutcome {
        succeeded: true,
        description: "Gen VietQR successful!".to_owned(),
        image: Some(QrImage {
            qr_code: "00020101021238570010A000000727".to_owned(),
            data_url: "data:image/png;base64,iVBORw0KGgo=".to_owned(),
        }),
    }
}

pub fn qr_rejected(description: &str) -> QrOutcome {
    QrOutcome {
        succeeded: false,
        description: description.to_owned(),
        image: None,
    }
}

// Confirmations pop from `answers` and default to "no" once the script runs out. Generation
// results pop from `generations` and default to success.
#[derive(Debug)]
pub struct ScriptedRuntime {
    pub now: OffsetDateTime,
    pub profiles: Catalog<Profile>,
    pub messages: Catalog<SavedMessage>,
    pub answers: VecDeque<bool>,
    pub decisions: Vec<Decision>,
    pub generations: VecDeque<Result<QrOutcome>>,
    pub requests: Vec<QrRequest>,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl ScriptedRuntime {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now,
            profiles: Catalog::new(),
            messages: Catalog::new(),
            answers: VecDeque::new(),
            decisions: Vec::new(),
            generations: VecDeque::new(),
            requests: Vec::new(),
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = Catalog::from_vec(profiles);
        self
    }

    pub fn with_messages(mut self, messages: Vec<SavedMessage>) -> Self {
        self.messages = Catalog::from_vec(messages);
        self
    }

    pub fn answer(mut self, answers: &[bool]) -> Self {
        self.answers.extend(answers.iter().copied());
        self
    }

    pub fn generate(mut self, outcome: Result<QrOutcome>) -> Self {
        self.generations.push_back(outcome);
        self
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes {
            bail!("storage is read-only");
        }
        Ok(())
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads {
            return Err(anyhow!("storage is unreadable"));
        }
        Ok(())
    }
}

impl AppRuntime for ScriptedRuntime {
    fn now(&mut self) -> OffsetDateTime {
        self.now
    }

    fn list_profiles(&mut self) -> Result<Vec<Profile>> {
        self.check_read()?;
        Ok(self.profiles.as_slice().to_vec())
    }

    fn upsert_profile(&mut self, profile: &Profile) -> Result<Vec<Profile>> {
        self.check_write()?;
        self.profiles.upsert(profile.clone());
        Ok(self.profiles.as_slice().to_vec())
    }

    fn remove_profile(&mut self, name: &str) -> Result<Vec<Profile>> {
        self.check_write()?;
        self.profiles.remove(name);
        Ok(self.profiles.as_slice().to_vec())
    }

    fn list_messages(&mut self) -> Result<Vec<SavedMessage>> {
        self.check_read()?;
        Ok(self.messages.as_slice().to_vec())
    }

    fn upsert_message(&mut self, message: &SavedMessage) -> Result<Vec<SavedMessage>> {
        self.check_write()?;
        self.messages.upsert(message.clone());
        Ok(self.messages.as_slice().to_vec())
    }

    fn remove_message(&mut self, name: &str) -> Result<Vec<SavedMessage>> {
        self.check_write()?;
        self.messages.remove(name);
        Ok(self.messages.as_slice().to_vec())
    }

    fn confirm(&mut self, decision: &Decision) -> bool {
        self.decisions.push(decision.clone());
        self.answers.pop_front().unwrap_or(false)
    }

    fn generate_qr(&mut self, request: &QrRequest) -> Result<QrOutcome> {
        self.requests.push(request.clone());
        self.generations.pop_front().unwrap_or_else(|| Ok(qr_success()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ScriptedRuntime, at, profile, sample_banks};
    use anyhow::Result;
    use vietqr_app::{AppRuntime, Decision};

    #[test]
    fn sample_banks_have_distinct_bins() {
        let banks = sample_banks();
        let mut bins: Vec<u32> = banks.iter().map(|bank| bank.bin).collect();
        bins.sort_unstable();
        bins.dedup();
        assert_eq!(bins.len(), banks.len());
    }

    #[test]
    fn confirmations_default_to_no_after_script() -> Result<()> {
        let mut runtime = ScriptedRuntime::new(at(10, 0)?).answer(&[true]);
        let decision = Decision::OverwriteProfile {
            name: "Work".to_owned(),
        };
        assert!(runtime.confirm(&decision));
        assert!(!runtime.confirm(&decision));
        assert_eq!(runtime.decisions.len(), 2);
        Ok(())
    }

    #[test]
    fn stores_upsert_case_insensitively() -> Result<()> {
        let mut runtime = ScriptedRuntime::new(at(10, 0)?);
        runtime.upsert_profile(&profile("Work", 970_436, "1", "A"))?;
        let stored = runtime.upsert_profile(&profile("WORK", 970_436, "2", "A"))?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].account_number, "2");
        Ok(())
    }
}
