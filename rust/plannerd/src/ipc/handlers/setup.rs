use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::schedule::context::{
    load_timetable_settings, timetable_weeks, AnchorMode, TIMETABLE_SETTINGS_KEY,
};
use crate::engine::WeekCycle;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Timetable,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "timetable" => Some(Self::Timetable),
            _ => None,
        }
    }
}

fn validate_timetable_patch(patch: &Map<String, Value>) -> Result<(), String> {
    for (key, value) in patch {
        match key.as_str() {
            "weeks" => match value.as_i64() {
                Some(1) | Some(2) => {}
                _ => return Err("weeks must be 1 or 2".to_string()),
            },
            "parityAnchor" => {
                if value.as_str().and_then(AnchorMode::parse).is_none() {
                    return Err("parityAnchor must be one of: fixed, operation".to_string());
                }
            }
            other => return Err(format!("unknown timetable setting: {}", other)),
        }
    }
    Ok(())
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let section = req.params.get("section").and_then(|v| v.as_str()).unwrap_or("");
    match SetupSection::parse(section) {
        Some(SetupSection::Timetable) => ok(
            &req.id,
            json!({ "section": section, "values": load_timetable_settings(conn).to_json() }),
        ),
        None => err(&req.id, "bad_params", format!("unknown section: {}", section), None),
    }
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let section = req.params.get("section").and_then(|v| v.as_str()).unwrap_or("");
    let Some(SetupSection::Timetable) = SetupSection::parse(section) else {
        return err(&req.id, "bad_params", format!("unknown section: {}", section), None);
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    if let Err(m) = validate_timetable_patch(patch) {
        return err(&req.id, "bad_params", m, None);
    }

    let mut merged = load_timetable_settings(conn).to_json();
    for (k, v) in patch {
        merged[k.as_str()] = v.clone();
    }
    if let Err(e) = db::settings_set_json(conn, TIMETABLE_SETTINGS_KEY, &merged) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    let settings = load_timetable_settings(conn);
    log::info!(
        "timetable settings: {}-week cycle, {} parity anchor",
        settings.week_cycle.weeks(),
        settings.anchor_mode.as_str()
    );
    if settings.week_cycle == WeekCycle::Biweekly && settings.anchor_mode == AnchorMode::Operation {
        log::warn!("A/B labels will be counted from each operation's own start date");
    }
    ok(&req.id, json!({ "section": section, "values": settings.to_json() }))
}

fn handle_timetable_weeks(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "weeks": timetable_weeks(conn) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        "timetable.weeks.get" => Some(handle_timetable_weeks(state, req)),
        _ => None,
    }
}
