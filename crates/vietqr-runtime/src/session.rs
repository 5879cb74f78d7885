// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use vietqr_api::{Client, Geocoder, PositionSource, resolve_location_name};
use vietqr_app::{Bank, FormController, FormResult, QrOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    BanksLoaded(Result<Vec<Bank>, String>),
    LocationResolved(Result<String, String>),
    QrGenerated {
        request_id: u64,
        result: Result<QrOutcome, String>,
    },
}

struct Locator {
    geocoder: Geocoder,
    source: Box<dyn PositionSource + Send>,
}

pub struct Session {
    controller: FormController,
    client: Client,
    locator: Option<Locator>,
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
    outstanding: usize,
    banks_requested: bool,
}

impl Session {
    pub fn new(controller: FormController, client: Client) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            controller,
            client,
            locator: None,
            tx,
            rx,
            outstanding: 0,
            banks_requested: false,
        }
    }

    pub fn with_locator<P>(mut self, geocoder: Geocoder, source: P) -> Self
    where
        P: PositionSource + Send + 'static,
    {
        self.locator = Some(Locator {
            geocoder,
            source: Box::new(source),
        });
        self
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FormController {
        &mut self.controller
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }

    pub fn start(&mut self) {
        if !self.banks_requested {
            self.banks_requested = true;
            self.spawn_bank_load();
        }
        if let Some(locator) = self.locator.take() {
            if self.controller.begin_location_lookup() {
                self.spawn_location_lookup(locator);
            } else {
                tracing::debug!("location lookup already attempted");
            }
        }
    }

    pub fn submit_async(&mut self, now: OffsetDateTime) -> FormResult<u64> {
        let pending = self.controller.begin_submit(now)?;
        let request_id = pending.request_id;
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.outstanding += 1;
        tracing::debug!(request_id, "QR generation started");
        thread::spawn(move || {
            let result = client
                .generate_qr(&pending.request)
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(SessionEvent::QrGenerated { request_id, result });
        });
        Ok(request_id)
    }

    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.pump();
        while self.outstanding > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(event) => self.apply(event),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    tracing::debug!(outstanding = self.outstanding, "session still busy");
                    return false;
                }
            }
        }
        true
    }

    pub fn shutdown(&mut self) {
        self.controller.teardown();
        self.pump();
    }

    fn spawn_bank_load(&mut self) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let result = client.list_banks().map_err(|error| format!("{error:#}"));
            let _ = tx.send(SessionEvent::BanksLoaded(result));
        });
    }

    fn spawn_location_lookup(&mut self, locator: Locator) {
        let tx = self.tx.clone();
        self.outstanding += 1;
        thread::spawn(move || {
            let Locator {
                geocoder,
                mut source,
            } = locator;
            let result = resolve_location_name(source.as_mut(), &geocoder)
                .map_err(|error| error.to_string());
            let _ = tx.send(SessionEvent::LocationResolved(result));
        });
    }

    fn apply(&mut self, event: SessionEvent) {
        self.outstanding = self.outstanding.saturating_sub(1);
        let applied = match event {
            SessionEvent::BanksLoaded(result) => self.controller.apply_banks(result),
            SessionEvent::LocationResolved(result) => self.controller.apply_location(result),
            SessionEvent::QrGenerated { request_id, result } => {
                self.controller.finish_generation(request_id, result)
            }
        };
        if !applied {
            tracing::debug!("session event dropped");
        }
    }
}
