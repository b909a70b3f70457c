use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_i64, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::schedule::store;
use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

fn handle_modules_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let description = match parse_opt_string(req.params.get("description")) {
        Ok(v) => v.unwrap_or_default(),
        Err(m) => return err(&req.id, "bad_params", format!("description {}", m), None),
    };
    let module_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO modules(id, title, description) VALUES(?, ?, ?)",
        params![module_id, title, description],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "moduleId": module_id }))
}

fn handle_modules_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut stmt = match conn.prepare(
        "SELECT m.id, m.title, m.description,
                (SELECT COUNT(*) FROM lessons l WHERE l.module_id = m.id) AS lesson_count,
                (SELECT COALESCE(SUM(l.duration), 0) FROM lessons l WHERE l.module_id = m.id) AS total_periods
         FROM modules m
         ORDER BY m.title, m.id",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "description": r.get::<_, String>(2)?,
                "lessonCount": r.get::<_, i64>(3)?,
                "totalPeriods": r.get::<_, i64>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());
    match rows {
        Ok(modules) => ok(&req.id, json!({ "modules": modules })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_lessons_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::load_module(conn, &module_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "Module not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    let title = match required_str(req, "title") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let content = match parse_opt_string(req.params.get("content")) {
        Ok(v) => v.unwrap_or_default(),
        Err(m) => return err(&req.id, "bad_params", format!("content {}", m), None),
    };
    let duration = match parse_opt_i64(req.params.get("duration")) {
        Ok(Some(v)) if v >= 1 => v,
        Ok(Some(_)) => return err(&req.id, "bad_params", "duration must be >= 1", None),
        Ok(None) => 1,
        Err(m) => return err(&req.id, "bad_params", format!("duration {}", m), None),
    };

    let next_order: i64 = match conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM lessons WHERE module_id = ?",
        [&module_id],
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let lesson_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO lessons(id, module_id, title, content, duration, sort_order)
         VALUES(?, ?, ?, ?, ?, ?)",
        params![lesson_id, module_id, title, content, duration, next_order],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "lessonId": lesson_id, "order": next_order }))
}

fn handle_lessons_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::load_module_lessons(conn, &module_id) {
        Ok(lessons) => {
            let lessons: Vec<serde_json::Value> = lessons
                .iter()
                .map(|l| {
                    json!({
                        "id": l.id,
                        "moduleId": l.module_id,
                        "title": l.title,
                        "content": l.content,
                        "duration": l.duration,
                        "order": l.sort_order,
                    })
                })
                .collect();
            ok(&req.id, json!({ "lessons": lessons }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "modules.create" => Some(handle_modules_create(state, req)),
        "modules.list" => Some(handle_modules_list(state, req)),
        "modules.lessons.create" => Some(handle_lessons_create(state, req)),
        "modules.lessons.list" => Some(handle_lessons_list(state, req)),
        _ => None,
    }
}
