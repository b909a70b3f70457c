use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::Value as JsonValue;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn parse_bool(v: Option<&JsonValue>, default: bool) -> Result<bool, &'static str> {
    match v {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v.as_bool().ok_or("must be boolean"),
    }
}

pub fn parse_opt_string(v: Option<&JsonValue>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn parse_opt_i64(v: Option<&JsonValue>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or("must be integer or null"),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, which is cut to its UTC day.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Some(d);
    }
    chrono::DateTime::parse_from_rfc3339(t)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc).date_naive())
}

pub fn parse_opt_date(v: Option<&JsonValue>) -> Result<Option<NaiveDate>, &'static str> {
    match parse_opt_string(v)? {
        None => Ok(None),
        Some(s) => parse_iso_date(&s)
            .map(Some)
            .ok_or("must be a YYYY-MM-DD date"),
    }
}

pub fn required_date(req: &Request, key: &str) -> Result<NaiveDate, serde_json::Value> {
    match parse_opt_date(req.params.get(key)) {
        Ok(Some(d)) => Ok(d),
        Ok(None) => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
        Err(m) => Err(err(&req.id, "bad_params", format!("{} {}", key, m), None)),
    }
}

pub fn optional_date(req: &Request, key: &str) -> Result<Option<NaiveDate>, serde_json::Value> {
    parse_opt_date(req.params.get(key))
        .map_err(|m| err(&req.id, "bad_params", format!("{} {}", key, m), None))
}

pub fn today_utc() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
