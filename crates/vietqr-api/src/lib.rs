// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;
use vietqr_app::{Bank, QrImage, QrOutcome, QrRequest};

pub const DEFAULT_BASE_URL: &str = "https://api.vietqr.io/v2";
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_LANGUAGE: &str = "vi";

pub const QR_REQUEST_FAILED: &str =
    "Failed to generate QR code. Please check your details and try again.";
pub const QR_REJECTED_FALLBACK: &str = "An error occurred during QR code generation.";
pub const GEOCODE_REQUEST_FAILED: &str = "Reverse geocoding request failed.";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const LOCATION_ERROR_PREFIX: &str = "Could not retrieve location. ";

const SUCCESS_CODE: &str = "00";
const USER_AGENT: &str = concat!("vietqr/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    client_id: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            client_id: None,
            api_key: None,
            timeout,
            http,
        })
    }

    pub fn with_credentials(mut self, client_id: Option<&str>, api_key: Option<&str>) -> Self {
        self.client_id = non_blank(client_id);
        self.api_key = non_blank(api_key);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_banks(&self) -> Result<Vec<Bank>> {
        let response = self
            .http
            .get(format!("{}/banks", self.base_url))
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: BanksEnvelope = response.json().context("decode bank list")?;
        if parsed.code != SUCCESS_CODE {
            let desc = parsed.desc.trim();
            if desc.is_empty() {
                bail!("bank directory returned code {:?}", parsed.code);
            }
            bail!("{desc}");
        }

        Ok(parsed
            .data
            .into_iter()
            .filter_map(BankRecord::into_bank)
            .collect())
    }

    // Requests a QR image. A response the service rejected comes back as a failed
    // `QrOutcome`; only transport and HTTP failures are errors.
    pub fn generate_qr(&self, request: &QrRequest) -> Result<QrOutcome> {
        let mut builder = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(request);
        if let Some(client_id) = &self.client_id {
            builder = builder.header("x-client-id", client_id);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                detail = %clean_error_response(status, &body),
                "QR generation request failed"
            );
            bail!(QR_REQUEST_FAILED);
        }

        let parsed: GenerateEnvelope = response.json().context("decode QR response")?;
        Ok(parsed.into_outcome())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unknown,
}

impl PositionError {
    pub const fn reason(self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permission denied.",
            Self::Unavailable => "Position unavailable.",
            Self::Timeout => "Request timed out.",
            Self::Unknown => "An unknown error occurred.",
        }
    }
}

pub trait PositionSource {
    fn current_position(&mut self) -> std::result::Result<Position, PositionError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition(pub Option<Position>);

impl PositionSource for FixedPosition {
    fn current_position(&mut self) -> std::result::Result<Position, PositionError> {
        self.0.ok_or(PositionError::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    Position(PositionError),
    Lookup(String),
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(LOCATION_ERROR_PREFIX)?;
        match self {
            Self::Position(error) => f.write_str(error.reason()),
            Self::Lookup(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for LocationError {}

#[derive(Debug, Clone)]
pub struct Geocoder {
    base_url: Url,
    language: String,
    http: HttpClient,
}

impl Geocoder {
    pub fn new(base_url: &str, language: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("location.geocoder_url {base_url:?} is not a valid URL"))?;
        if base_url.cannot_be_a_base() {
            bail!("location.geocoder_url {base_url} cannot carry a path -- use an http(s) URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            language: language.trim().to_owned(),
            http,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn reverse_url(&self, position: Position) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("geocoder URL {} cannot carry a path", self.base_url))?
            .pop_if_empty()
            .push("reverse");
        url.query_pairs_mut()
            .append_pair("format", "jsonv2")
            .append_pair("lat", &position.latitude.to_string())
            .append_pair("lon", &position.longitude.to_string());
        Ok(url)
    }

    pub fn reverse(&self, position: Position) -> Result<String> {
        let url = self.reverse_url(position)?;
        let mut request = self.http.get(url);
        if !self.language.is_empty() {
            request = request.header("Accept-Language", &self.language);
        }

        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url.as_str(), error))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "reverse geocoding rejected");
            bail!(GEOCODE_REQUEST_FAILED);
        }

        let parsed: ReverseResponse = response
            .json()
            .context("decode reverse geocoding response")?;
        Ok(format_location_name(
            &parsed.address.unwrap_or_default(),
            parsed.display_name.as_deref(),
        ))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub road: Option<String>,
    #[serde(default)]
    pub suburb: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub city_district: Option<String>,
}

// Road, suburb, then the first of state/city/district; blanks and repeats dropped.
pub fn format_location_name(address: &Address, display_name: Option<&str>) -> String {
    let region = [&address.state, &address.city, &address.city_district]
        .into_iter()
        .find_map(|part| present(part.as_deref()));

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    for part in [
        present(address.road.as_deref()),
        present(address.suburb.as_deref()),
        region,
    ]
    .into_iter()
    .flatten()
    {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }

    if !parts.is_empty() {
        return parts.join(", ");
    }
    present(display_name)
        .unwrap_or(UNKNOWN_LOCATION)
        .to_owned()
}

pub fn resolve_location_name<P>(
    source: &mut P,
    geocoder: &Geocoder,
) -> std::result::Result<String, LocationError>
where
    P: PositionSource + ?Sized,
{
    let position = source
        .current_position()
        .map_err(LocationError::Position)?;
    geocoder
        .reverse(position)
        .map_err(|error| LocationError::Lookup(error.to_string()))
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("{base_url} did not answer in time -- check your connection or raise the timeout");
    }
    anyhow!("cannot reach {base_url} -- check your network connection ({error})")
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && !parsed.desc.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), parsed.desc);
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    desc: String,
}

#[derive(Debug, Deserialize)]
struct BanksEnvelope {
    #[serde(default)]
    code: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    data: Vec<BankRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BinField {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankRecord {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    code: String,
    bin: BinField,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    logo: String,
    #[serde(default)]
    transfer_supported: FlagField,
    #[serde(default)]
    lookup_supported: FlagField,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum FlagField {
    Bool(bool),
    Number(i64),
    #[default]
    Missing,
}

impl FlagField {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0,
            Self::Missing => false,
        }
    }
}

impl BankRecord {
    fn into_bank(self) -> Option<Bank> {
        let bin = match &self.bin {
            BinField::Number(value) => u32::try_from(*value).ok(),
            BinField::Text(text) => text.trim().parse::<u32>().ok(),
        };
        let Some(bin) = bin.filter(|bin| *bin != 0) else {
            tracing::warn!(bank = %self.code, bin = ?self.bin, "dropping bank with unusable bin");
            return None;
        };
        Some(Bank {
            id: self.id,
            name: self.name,
            code: self.code,
            bin,
            short_name: self.short_name,
            logo: self.logo,
            transfer_supported: self.transfer_supported.is_set(),
            lookup_supported: self.lookup_supported.is_set(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    #[serde(default)]
    code: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    data: Option<GenerateData>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    #[serde(rename = "qrCode", default)]
    qr_code: String,
    #[serde(rename = "qrDataURL", default)]
    qr_data_url: String,
}

impl GenerateEnvelope {
    fn into_outcome(self) -> QrOutcome {
        if self.code != SUCCESS_CODE {
            let description = if self.desc.trim().is_empty() {
                QR_REJECTED_FALLBACK.to_owned()
            } else {
                self.desc
            };
            return QrOutcome {
                succeeded: false,
                description,
                image: None,
            };
        }
        QrOutcome {
            succeeded: true,
            description: self.desc,
            image: self.data.map(|data| QrImage {
                qr_code: data.qr_code,
                data_url: data.qr_data_url,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
    #[serde(default)]
    display_name: Option<String>,
}
