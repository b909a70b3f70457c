use crate::ipc::error::{err, ok, schedule_err};
use crate::ipc::helpers::{db_conn, optional_date, parse_bool, required_str, today_utc};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{self, store, PushDirection};
use serde::Serialize;
use serde_json::json;

fn to_result<T: Serialize>(req: &Request, outcome: &T) -> serde_json::Value {
    match serde_json::to_value(outcome) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal_error", e.to_string(), None),
    }
}

fn preview_flag(req: &Request) -> Result<bool, serde_json::Value> {
    parse_bool(req.params.get("preview"), false)
        .map_err(|m| err(&req.id, "bad_params", format!("preview {}", m), None))
}

fn handle_assign_module(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let module_id = match required_str(req, "moduleId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let start_date = match optional_date(req, "startDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::assign_module_to_class(conn, &class_id, &module_id, start_date, today_utc()) {
        Ok(outcome) => to_result(req, &outcome),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_next_available(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let from = match optional_date(req, "fromDate") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::find_next_available_slot(conn, &class_id, from, today_utc()) {
        Ok(date) => ok(&req.id, json!({ "date": date })),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_push_lesson(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let lesson_id = match required_str(req, "lessonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let direction = match required_str(req, "direction") {
        Ok(raw) => match PushDirection::parse(&raw) {
            Some(d) => d,
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "direction must be one of: forward, back",
                    None,
                )
            }
        },
        Err(e) => return e,
    };
    let preview = match preview_flag(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::push_lesson(conn, &lesson_id, direction, preview) {
        Ok(outcome) => to_result(req, &outcome),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_reschedule_for_event(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let event_id = match required_str(req, "eventId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let preview = match preview_flag(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::reschedule_lessons_for_event(conn, &event_id, preview) {
        Ok(outcome) => to_result(req, &outcome),
        Err(e) => schedule_err(&req.id, &e),
    }
}

fn handle_lessons_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
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
    match store::list_class_lessons(conn, &class_id, from, to) {
        Ok(lessons) => {
            let lessons: Vec<serde_json::Value> = lessons
                .iter()
                .map(|l| {
                    json!({
                        "id": l.id,
                        "assignmentId": l.assignment_id,
                        "lessonId": l.lesson_id,
                        "classId": l.class_id,
                        "calendarDate": l.calendar_date,
                        "timetableSlotId": l.timetable_slot_id,
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

fn handle_unassign(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let assignment_id = match required_str(req, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match schedule::unassign_module(conn, &assignment_id) {
        Ok(removed) => ok(&req.id, json!({ "ok": true, "lessonsRemoved": removed })),
        Err(e) => schedule_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.assignModule" => Some(handle_assign_module(state, req)),
        "schedule.nextAvailable" => Some(handle_next_available(state, req)),
        "schedule.pushLesson" => Some(handle_push_lesson(state, req)),
        "schedule.rescheduleForEvent" => Some(handle_reschedule_for_event(state, req)),
        "schedule.lessons.list" => Some(handle_lessons_list(state, req)),
        "schedule.unassign" => Some(handle_unassign(state, req)),
        _ => None,
    }
}
