use crate::db::default_week_zero;
use crate::engine::parity::week_start;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_date, parse_opt_i64, required_date, required_str};
use crate::ipc::types::{AppState, Request};
use crate::schedule::store;
use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

fn handle_years_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
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
    if end_date < start_date {
        return err(&req.id, "bad_params", "endDate must not be before startDate", None);
    }

    let year_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO academic_years(id, name, start_date, end_date) VALUES(?, ?, ?, ?)",
        params![year_id, name, start_date, end_date],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "academicYearId": year_id }))
}

fn handle_years_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut stmt = match conn.prepare(
        "SELECT ay.id, ay.name, ay.start_date, ay.end_date,
                (SELECT COUNT(*) FROM classes c WHERE c.academic_year_id = ay.id) AS class_count,
                EXISTS(SELECT 1 FROM timetable_configs tc WHERE tc.academic_year_id = ay.id) AS has_config
         FROM academic_years ay
         ORDER BY ay.start_date, ay.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "startDate": r.get::<_, String>(2)?,
                "endDate": r.get::<_, String>(3)?,
                "classCount": r.get::<_, i64>(4)?,
                "hasTimetableConfig": r.get::<_, i64>(5)? != 0,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(years) => ok(&req.id, json!({ "academicYears": years })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_config_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year_id = match required_str(req, "academicYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year = match store::load_academic_year(conn, &year_id) {
        Ok(Some(y)) => y,
        Ok(None) => return err(&req.id, "not_found", "Academic year not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let existing = match store::load_timetable_config(conn, &year.id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let periods_per_day = match parse_opt_i64(req.params.get("periodsPerDay")) {
        Ok(Some(v)) if (1..=20).contains(&v) => v,
        Ok(Some(_)) => return err(&req.id, "bad_params", "periodsPerDay must be in 1..=20", None),
        Ok(None) => existing.as_ref().map_or(8, |c| c.periods_per_day),
        Err(m) => return err(&req.id, "bad_params", format!("periodsPerDay {}", m), None),
    };
    // Week zero is stored as the Monday of the given week so A/B labels flip
    // between Sunday and Monday.
    let week_zero = match optional_date(req, "weekZero") {
        Ok(Some(d)) => week_start(d).unwrap_or(d),
        Ok(None) => existing
            .and_then(|c| c.week_zero)
            .unwrap_or_else(|| default_week_zero(year.start_date)),
        Err(e) => return e,
    };

    if let Err(e) = conn.execute(
        "INSERT INTO timetable_configs(academic_year_id, periods_per_day, week_zero)
         VALUES(?, ?, ?)
         ON CONFLICT(academic_year_id) DO UPDATE SET
            periods_per_day = excluded.periods_per_day,
            week_zero = excluded.week_zero",
        params![year.id, periods_per_day, week_zero],
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(
        &req.id,
        json!({ "academicYearId": year.id, "periodsPerDay": periods_per_day, "weekZero": week_zero }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let year_id = match required_str(req, "academicYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::load_timetable_config(conn, &year_id) {
        Ok(Some(cfg)) => ok(
            &req.id,
            json!({
                "config": {
                    "academicYearId": cfg.academic_year_id,
                    "periodsPerDay": cfg.periods_per_day,
                    "weekZero": cfg.week_zero,
                }
            }),
        ),
        Ok(None) => ok(&req.id, json!({ "config": null })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "academicYears.create" => Some(handle_years_create(state, req)),
        "academicYears.list" => Some(handle_years_list(state, req)),
        "timetable.config.set" => Some(handle_config_set(state, req)),
        "timetable.config.get" => Some(handle_config_get(state, req)),
        _ => None,
    }
}
