mod test_support;

use serde_json::json;
use test_support::{
    pairs, request_err, request_ok, schedule_of, seed_class, seed_module, spawn_sidecar,
    str_field, temp_dir,
};

#[test]
fn searches_near_the_end_of_the_calendar_fail_cleanly() {
    let workspace = temp_dir("plannerd-calendar-end");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    // Tuesday only; no Tuesday falls between 262142-12-26 and the last date.
    let fx = seed_class(&mut stdin, &mut reader, &[2]);

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.nextAvailable",
        json!({ "classId": fx.class_id, "fromDate": "+262142-12-26" }),
    );
    assert_eq!(error["code"].as_str(), Some("unsatisfiable_placement"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.events.create",
        json!({
            "type": "holiday",
            "title": "Last days",
            "startDate": "+262142-12-27",
            "endDate": "+262142-12-31",
        }),
    );
    let info = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.weekInfo",
        json!({ "classId": fx.class_id, "date": "+262142-12-31" }),
    );
    assert_eq!(info["weekday"].as_u64(), Some(1));

    let config = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "timetable.config.set",
        json!({ "academicYearId": fx.year_id, "weekZero": "-262143-01-01" }),
    );
    assert!(config["weekZero"].as_str().is_some());
    let info = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "calendar.weekInfo",
        json!({ "classId": fx.class_id, "date": "-262143-01-01" }),
    );
    assert_eq!(info["schoolWeek"], json!(null));

    let health = request_ok(&mut stdin, &mut reader, "7", "health", json!({}));
    assert!(health["version"].as_str().is_some());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn event_length_is_capped_at_one_year() {
    let workspace = temp_dir("plannerd-event-span");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "calendar.events.create",
        json!({
            "type": "absence",
            "title": "Forever",
            "startDate": "-20000-01-01",
            "endDate": "2000-01-01",
        }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.events.create",
        json!({
            "type": "closure",
            "title": "Rebuild",
            "startDate": "2024-01-01",
            "endDate": "2025-01-01",
        }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let event = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.events.create",
        json!({
            "type": "closure",
            "title": "Rebuild",
            "startDate": "2024-01-01",
            "endDate": "2024-12-31",
        }),
    );
    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "calendar.events.update",
        json!({ "eventId": str_field(&event, "eventId"), "endDate": "2026-01-01" }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn long_event_ending_inside_a_push_blocks_only_its_own_days() {
    let workspace = temp_dir("plannerd-long-event-push");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let fx = seed_class(&mut stdin, &mut reader, &[1, 2, 3, 4, 5]);
    let module_id = seed_module(&mut stdin, &mut reader, &[1, 1, 1, 1, 1]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.assignModule",
        json!({ "classId": fx.class_id, "moduleId": module_id, "startDate": "2024-09-02" }),
    );
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.lessons.list",
        json!({ "classId": fx.class_id }),
    );
    let first = str_field(&listed["lessons"][0], "id");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.events.create",
        json!({
            "type": "absence",
            "title": "Secondment",
            "startDate": "2023-09-04",
            "endDate": "2024-09-03",
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.pushLesson",
        json!({ "lessonId": first, "direction": "forward" }),
    );
    assert_eq!(
        schedule_of(&mut stdin, &mut reader, &fx.class_id),
        pairs(&[
            ("Lesson 1", "2024-09-04"),
            ("Lesson 2", "2024-09-05"),
            ("Lesson 3", "2024-09-06"),
            ("Lesson 4", "2024-09-09"),
            ("Lesson 5", "2024-09-10"),
        ])
    );

    drop(stdin);
    let _ = child.wait();
}
