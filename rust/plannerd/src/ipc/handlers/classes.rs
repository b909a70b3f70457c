use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, parse_opt_string, required_str};
use crate::ipc::types::{AppState, Request};
use crate::schedule::store;
use rusqlite::{params, Connection};
use serde_json::json;
use uuid::Uuid;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    // Correlated subqueries keep the counts independent of each other.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.academic_year_id,
           (SELECT COUNT(*) FROM timetable_slots ts WHERE ts.class_id = c.id) AS slot_count,
           (SELECT COUNT(*) FROM module_assignments ma WHERE ma.class_id = c.id) AS assignment_count
         FROM classes c
         ORDER BY c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "name": row.get::<_, String>(1)?,
                "academicYearId": row.get::<_, Option<String>>(2)?,
                "slotCount": row.get::<_, i64>(3)?,
                "assignmentCount": row.get::<_, i64>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let academic_year_id = match parse_opt_string(req.params.get("academicYearId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("academicYearId {}", m), None),
    };
    if let Some(ref year_id) = academic_year_id {
        match store::load_academic_year(conn, year_id) {
            Ok(Some(_)) => {}
            Ok(None) => return err(&req.id, "not_found", "Academic year not found", None),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        }
    }

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO classes(id, name, academic_year_id) VALUES(?, ?, ?)",
        params![class_id, name, academic_year_id],
    ) {
        return err(&req.id, "db_insert_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "classId": class_id }))
}

fn delete_class_cascade(conn: &Connection, class_id: &str) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let lessons = tx.execute(
        "DELETE FROM scheduled_lessons
         WHERE assignment_id IN (SELECT id FROM module_assignments WHERE class_id = ?)",
        [class_id],
    )?;
    tx.execute("DELETE FROM module_assignments WHERE class_id = ?", [class_id])?;
    tx.execute("DELETE FROM timetable_slots WHERE class_id = ?", [class_id])?;
    tx.execute("DELETE FROM classes WHERE id = ?", [class_id])?;
    tx.commit()?;
    Ok(lessons)
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match store::load_class(conn, &class_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "Class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match delete_class_cascade(conn, &class_id) {
        Ok(removed) => {
            log::info!("deleted class {} and {} scheduled lesson(s)", class_id, removed);
            ok(&req.id, json!({ "ok": true, "scheduledLessonsRemoved": removed }))
        }
        Err(e) => err(&req.id, "db_delete_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
