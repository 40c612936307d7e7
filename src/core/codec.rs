//! Payload codec for the provisioning characteristics.
//!
//! Payloads are JSON objects. On the way out they are base64 encoded so the
//! value stays text-safe on the radio link. On the way in either form is
//! accepted: the camera notifies its connection state as bare JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("payload does not match the expected shape: {0}")]
    SchemaMismatch(String),
}

/// A value exchanged over a characteristic.
pub trait Payload: Serialize + DeserializeOwned {
    /// Field-level invariants serde cannot express.
    fn validate(&self) -> Result<(), CodecError> {
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), CodecError> {
    if value.is_empty() {
        return Err(CodecError::SchemaMismatch(format!("{} is empty", field)));
    }
    Ok(())
}

/// Identity read from the serial characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraIdentity {
    #[serde(rename = "Serial")]
    pub serial: String,
    #[serde(rename = "PubKey")]
    pub public_key: String,
}

impl Payload for CameraIdentity {
    fn validate(&self) -> Result<(), CodecError> {
        require("Serial", &self.serial)?;
        require("PubKey", &self.public_key)
    }
}

/// Credentials written to the WiFi characteristic.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiProvisioningRequest {
    #[serde(rename = "SSID")]
    pub ssid: String,
    #[serde(rename = "User")]
    pub username: String,
    #[serde(rename = "Pass")]
    pub password: String,
    #[serde(rename = "UUID")]
    pub camera_id: String,
}

impl std::fmt::Debug for WifiProvisioningRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiProvisioningRequest")
            .field("ssid", &self.ssid)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("camera_id", &self.camera_id)
            .finish()
    }
}

impl Payload for WifiProvisioningRequest {
    fn validate(&self) -> Result<(), CodecError> {
        require("SSID", &self.ssid)?;
        require("UUID", &self.camera_id)
    }
}

/// Asks the camera what kind of network `ssid` is, without sending secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCheckRequest {
    #[serde(rename = "SSID")]
    pub ssid: String,
}

impl Payload for WifiCheckRequest {
    fn validate(&self) -> Result<(), CodecError> {
        require("SSID", &self.ssid)
    }
}

/// The camera's network state as it reports it over the connection characteristic.
/// `state` follows NetworkManager's device states, `reason` its state-change reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    #[serde(rename = "State")]
    pub state: u32,
    #[serde(rename = "Reason")]
    pub reason: u32,
}

impl Payload for ConnectionStatus {}

/// Encodes a payload as base64 of its JSON form.
pub fn encode<T: Payload>(payload: &T) -> Result<String, CodecError> {
    payload.validate()?;
    let json = serde_json::to_string(payload)
        .map_err(|e| CodecError::SchemaMismatch(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

/// Exact inverse of [`encode`].
pub fn decode<T: Payload>(text: &str) -> Result<T, CodecError> {
    let json = STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::MalformedPayload(format!("not base64: {}", e)))?;
    from_json(&json)
}

/// Decodes a raw characteristic value, base64 text or bare JSON.
pub fn decode_bytes<T: Payload>(raw: &[u8]) -> Result<T, CodecError> {
    let trimmed = raw.trim_ascii();
    if trimmed.starts_with(b"{") {
        debug!("Decoding bare JSON payload");
        return from_json(trimmed);
    }
    let text = std::str::from_utf8(trimmed)
        .map_err(|e| CodecError::MalformedPayload(format!("not text: {}", e)))?;
    decode(text)
}

/// Decodes a free-form text value such as the WiFi-check answer.
pub fn decode_text(raw: &[u8]) -> Result<String, CodecError> {
    let trimmed = raw.trim_ascii();
    if let Some(text) = STANDARD
        .decode(trimmed)
        .ok()
        .and_then(|decoded| String::from_utf8(decoded).ok())
    {
        return Ok(text.trim().to_string());
    }
    let text = std::str::from_utf8(trimmed)
        .map_err(|e| CodecError::MalformedPayload(format!("not text: {}", e)))?;
    Ok(text.trim().to_string())
}

fn from_json<T: Payload>(json: &[u8]) -> Result<T, CodecError> {
    let payload: T = serde_json::from_slice(json).map_err(|e| match e.classify() {
        serde_json::error::Category::Data => CodecError::SchemaMismatch(e.to_string()),
        _ => CodecError::MalformedPayload(e.to_string()),
    })?;
    payload.validate()?;
    Ok(payload)
}
