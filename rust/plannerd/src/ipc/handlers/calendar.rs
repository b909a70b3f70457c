use chrono::NaiveDate;
use crate::engine::parity::weekday;
use crate::engine::placer::label_for;
use crate::engine::BlackoutKind;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, optional_date, parse_bool, parse_opt_string, required_date, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::schedule::context::{load_timetable_settings, resolve_anchor};
use crate::schedule::store::{self, CalendarEventRow};
use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

fn event_json(e: &CalendarEventRow) -> serde_json::Value {
    json!({
        "id": e.id,
        "type": e.kind.as_str(),
        "title": e.title,
        "startDate": e.start_date,
        "endDate": e.end_date,
        "affectsAllClasses": e.affects_all_classes,
    })
}

/// Longest event accepted, in days.
const MAX_EVENT_DAYS: i64 = 366;

fn check_range(
    req: &Request,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), serde_json::Value> {
    if end < start {
        return Err(err(&req.id, "bad_params", "endDate must not be before startDate", None));
    }
    if (end - start).num_days() >= MAX_EVENT_DAYS {
        return Err(err(
            &req.id,
            "bad_params",
            format!("events may span at most {} days", MAX_EVENT_DAYS),
            Some(json!({ "startDate": start, "endDate": end })),
        ));
    }
    Ok(())
}

fn parse_kind(req: &Request, raw: &str) -> Result<BlackoutKind, serde_json::Value> {
    BlackoutKind::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "type must be one of: holiday, closure, absence",
            None,
        )
    })
}

fn handle_events_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let kind = match required_str(req, "type").and_then(|raw| parse_kind(req, &raw)) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let start_date = match required_date(req, "startDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let end_date = match required_date(req, "endDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = check_range(req, start_date, end_date) {
        return e;
    }
    let affects_all = match parse_bool(req.params.get("affectsAllClasses"), true) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("affectsAllClasses {}", m), None),
    };

    let event_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO calendar_events(id, event_type, title, start_date, end_date, affects_all_classes)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            event_id,
            kind.as_str(),
            title,
            start_date,
            end_date,
            affects_all as i64
        ],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    state.week_numbers.invalidate();
    log::info!(
        "calendar {} \"{}\" created ({} to {})",
        kind.as_str(),
        title,
        start_date,
        end_date
    );
    ok(&req.id, json!({ "eventId": event_id }))
}

fn handle_events_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let from = match optional_date(req, "from") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let to = match optional_date(req, "to") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::list_events(conn, from, to) {
        Ok(events) => {
            let events: Vec<serde_json::Value> = events.iter().map(event_json).collect();
            ok(&req.id, json!({ "events": events }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_events_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let event_id = match required_str(req, "eventId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut event = match store::load_event(conn, &event_id) {
        Ok(Some(e)) => e,
        Ok(None) => return err(&req.id, "not_found", "Event not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    match parse_opt_string(req.params.get("type")) {
        Ok(Some(raw)) => match parse_kind(req, &raw) {
            Ok(kind) => event.kind = kind,
            Err(e) => return e,
        },
        Ok(None) => {}
        Err(m) => return err(&req.id, "bad_params", format!("type {}", m), None),
    }
    match parse_opt_string(req.params.get("title")) {
        Ok(Some(title)) => event.title = title,
        Ok(None) => {}
        Err(m) => return err(&req.id, "bad_params", format!("title {}", m), None),
    }
    match optional_date(req, "startDate") {
        Ok(Some(d)) => event.start_date = d,
        Ok(None) => {}
        Err(e) => return e,
    }
    match optional_date(req, "endDate") {
        Ok(Some(d)) => event.end_date = d,
        Ok(None) => {}
        Err(e) => return e,
    }
    if let Err(e) = check_range(req, event.start_date, event.end_date) {
        return e;
    }
    match parse_bool(req.params.get("affectsAllClasses"), event.affects_all_classes) {
        Ok(v) => event.affects_all_classes = v,
        Err(m) => return err(&req.id, "bad_params", format!("affectsAllClasses {}", m), None),
    }

    if let Err(e) = conn.execute(
        "UPDATE calendar_events
         SET event_type = ?, title = ?, start_date = ?, end_date = ?, affects_all_classes = ?
         WHERE id = ?",
        params![
            event.kind.as_str(),
            event.title,
            event.start_date,
            event.end_date,
            event.affects_all_classes as i64,
            event.id
        ],
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    state.week_numbers.invalidate();
    ok(&req.id, json!({ "event": event_json(&event) }))
}

fn handle_events_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let event_id = match required_str(req, "eventId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match conn.execute("DELETE FROM calendar_events WHERE id = ?", [&event_id]) {
        Ok(0) => err(&req.id, "not_found", "Event not found", None),
        Ok(_) => {
            state.week_numbers.invalidate();
            ok(&req.id, json!({ "ok": true }))
        }
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

fn handle_week_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState {
        db, week_numbers, ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let date = match required_date(req, "date") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class = match store::load_class(conn, &class_id) {
        Ok(Some(c)) => c,
        Ok(None) => return err(&req.id, "not_found", "Class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let settings = load_timetable_settings(conn);
    let week_label = match resolve_anchor(conn, &class, settings) {
        Ok(anchor) => label_for(settings.week_cycle, date, anchor.reference(date)),
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };

    let year = match class.academic_year_id.as_deref() {
        Some(year_id) => match store::load_academic_year(conn, year_id) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
        None => None,
    };
    let school_week = match &year {
        Some(y) => {
            match week_numbers.get_or_try_compute(y.start_date, date, || store::load_blackouts(conn))
            {
                Ok(v) => v,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            }
        }
        None => None,
    };

    ok(
        &req.id,
        json!({
            "date": date,
            "weekday": weekday(date),
            "weekLabel": week_label.map(|w| w.as_str()),
            "schoolWeek": school_week,
            "academicYear": year.as_ref().map(|y| json!({
                "id": y.id,
                "name": y.name,
                "startDate": y.start_date,
                "endDate": y.end_date,
            })),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.events.create" => Some(handle_events_create(state, req)),
        "calendar.events.list" => Some(handle_events_list(state, req)),
        "calendar.events.update" => Some(handle_events_update(state, req)),
        "calendar.events.delete" => Some(handle_events_delete(state, req)),
        "calendar.weekInfo" => Some(handle_week_info(state, req)),
        _ => None,
    }
}
