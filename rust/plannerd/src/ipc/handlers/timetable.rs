use crate::engine::WeekLabel;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_i64, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::schedule::store;
use rusqlite::{params, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn handle_slots_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class = match store::load_class(conn, &class_id) {
        Ok(Some(c)) => c,
        Ok(None) => return err(&req.id, "not_found", "Class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let day = match parse_opt_i64(req.params.get("day")) {
        Ok(Some(v)) if (1..=7).contains(&v) => v,
        Ok(Some(_)) => return err(&req.id, "bad_params", "day must be in 1..=7", None),
        Ok(None) => return err(&req.id, "bad_params", "missing day", None),
        Err(m) => return err(&req.id, "bad_params", format!("day {}", m), None),
    };
    let period_start = match parse_opt_i64(req.params.get("periodStart")) {
        Ok(Some(v)) if v >= 1 => v,
        Ok(Some(_)) => return err(&req.id, "bad_params", "periodStart must be >= 1", None),
        Ok(None) => return err(&req.id, "bad_params", "missing periodStart", None),
        Err(m) => return err(&req.id, "bad_params", format!("periodStart {}", m), None),
    };
    let period_end = match parse_opt_i64(req.params.get("periodEnd")) {
        Ok(Some(v)) if v >= period_start => v,
        Ok(Some(_)) => {
            return err(&req.id, "bad_params", "periodEnd must be >= periodStart", None)
        }
        Ok(None) => period_start,
        Err(m) => return err(&req.id, "bad_params", format!("periodEnd {}", m), None),
    };
    let config = match class.academic_year_id.as_deref() {
        Some(year_id) => match store::load_timetable_config(conn, year_id) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        },
        None => None,
    };
    if let Some(cfg) = config {
        if period_end > cfg.periods_per_day {
            return err(
                &req.id,
                "bad_params",
                format!("periodEnd must be <= periodsPerDay ({})", cfg.periods_per_day),
                None,
            );
        }
    }
    let week = match parse_opt_string(req.params.get("week")) {
        Ok(None) => None,
        Ok(Some(raw)) => match WeekLabel::parse(&raw) {
            Some(w) => Some(w),
            None => return err(&req.id, "bad_params", "week must be A, B or null", None),
        },
        Err(m) => return err(&req.id, "bad_params", format!("week {}", m), None),
    };

    let slot_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO timetable_slots(id, class_id, day, period_start, period_end, week)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![
            slot_id,
            class_id,
            day,
            period_start,
            period_end,
            week.map(WeekLabel::as_str)
        ],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(
        &req.id,
        json!({ "slotId": slot_id, "duration": period_end - period_start + 1 }),
    )
}

fn handle_slots_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::load_slots(conn, &class_id) {
        Ok(slots) => {
            let slots: Vec<serde_json::Value> = slots
                .iter()
                .map(|s| {
                    json!({
                        "id": s.id,
                        "day": s.day,
                        "periodStart": s.period_start,
                        "periodEnd": s.period_end,
                        "week": s.week.map(|w| w.as_str()),
                        "duration": s.duration(),
                    })
                })
                .collect();
            ok(&req.id, json!({ "slots": slots }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_slots_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let slot_id = match required_str(req, "slotId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let in_use = match conn
        .query_row(
            "SELECT 1 FROM scheduled_lessons WHERE timetable_slot_id = ? LIMIT 1",
            [&slot_id],
            |_r| Ok(()),
        )
        .optional()
    {
        Ok(v) => v.is_some(),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if in_use {
        return err(
            &req.id,
            "validation_failed",
            "Slot still has scheduled lessons",
            None,
        );
    }
    match conn.execute("DELETE FROM timetable_slots WHERE id = ?", [&slot_id]) {
        Ok(0) => err(&req.id, "not_found", "Slot not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.slots.create" => Some(handle_slots_create(state, req)),
        "timetable.slots.list" => Some(handle_slots_list(state, req)),
        "timetable.slots.delete" => Some(handle_slots_delete(state, req)),
        _ => None,
    }
}
