//! Per-device map-name handshake for Dreame models that serve encrypted maps.
//!
//! ```text
//!   request  {"req_type":1,"frame_type":"I"}            (stamp == 0)
//!   response out[1] = ""            out[2] = <stamp>     → keep stamp, no map yet
//!   request  {"req_type":1,"frame_type":"I","time":<stamp>}
//!   response out[1] = "<a>/<b>/<name>,<key>"            → map name, key kept, stamp reset
//! ```
//!
//! The session is owned by the caller (one per device) and threaded
//! through each request explicitly; parsers never hold it.

use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Service id of the map action
pub const MAP_SIID: u32 = 6;
/// Action id of the map request
pub const MAP_AIID: u32 = 1;
/// Property id carrying the request value
pub const MAP_PIID: u32 = 2;

/// Stamp handshake state of one device
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DreameSession {
    /// Continuation stamp; 0 when no handshake is pending
    pub stamp: i64,
    /// Key announced alongside the last map name
    pub enc_key: Option<String>,
}

impl DreameSession {
    /// Fresh session with no pending stamp
    pub fn new() -> Self {
        Self::default()
    }

    /// Request value string, echoing the stamp when one is pending
    pub fn request_value(&self) -> String {
        if self.stamp != 0 {
            format!(
                r#"{{"req_type":1,"frame_type":"I","time":{}}}"#,
                self.stamp
            )
        } else {
            r#"{"req_type":1,"frame_type":"I"}"#.to_string()
        }
    }

    /// Full action parameters for the map request
    pub fn request_params(&self, device_id: &str) -> Value {
        json!({
            "did": device_id,
            "siid": MAP_SIID,
            "aiid": MAP_AIID,
            "in": [{"piid": MAP_PIID, "value": self.request_value()}],
        })
    }

    /// Consume an action response.
    ///
    /// Returns the map name once the device hands one out. An empty key
    /// stores the returned stamp and yields `None`; the caller retries
    /// with [`DreameSession::request_value`].
    pub fn handle_response(&mut self, response: &Value) -> Result<Option<String>> {
        let out = response
            .pointer("/result/out")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::HeaderParse("map response without result.out".to_string()))?;
        let key = out
            .get(1)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::HeaderParse("map response without key".to_string()))?;

        if key.is_empty() {
            let stamp = out
                .get(2)
                .and_then(|v| v.get("value"))
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::HeaderParse("empty key without stamp".to_string()))?;
            log::debug!("Map not ready, stamp {}", stamp);
            self.stamp = stamp;
            return Ok(None);
        }

        let (location, enc_key) = key
            .split_once(',')
            .ok_or_else(|| Error::HeaderParse(format!("malformed map key '{}'", key)))?;
        let name = location
            .split('/')
            .nth(2)
            .ok_or_else(|| Error::HeaderParse(format!("malformed map location '{}'", location)))?;

        self.enc_key = Some(enc_key.to_string());
        self.stamp = 0;
        log::debug!("Map name {}", name);
        Ok(Some(name.to_string()))
    }
}
