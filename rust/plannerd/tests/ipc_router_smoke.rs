mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request, request_err, request_ok, spawn_sidecar, str_field, temp_dir};

#[test]
fn requests_before_workspace_selection_are_rejected() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["workspacePath"], json!(null));
    assert!(health["version"].as_str().is_some());

    let error = request_err(&mut stdin, &mut reader, "2", "modules.list", json!({}));
    assert_eq!(error["code"].as_str(), Some("no_workspace"));

    let error = request_err(&mut stdin, &mut reader, "3", "lessons.teleport", json!({}));
    assert_eq!(error["code"].as_str(), Some("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let reply: serde_json::Value = serde_json::from_str(line.trim()).expect("reply json");
    assert_eq!(reply["ok"].as_bool(), Some(false));
    assert_eq!(reply["error"]["code"].as_str(), Some("bad_json"));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.select",
        json!({}),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("plannerd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert!(workspace.join("planner.sqlite3").is_file());

    let year = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "academicYears.create",
        json!({ "name": "2024-25", "startDate": "2024-09-01", "endDate": "2025-07-31" }),
    );
    let year_id = str_field(&year, "academicYearId");
    let config = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "timetable.config.set",
        json!({ "academicYearId": year_id, "periodsPerDay": 6 }),
    );
    assert_eq!(config["weekZero"].as_str(), Some("2024-08-26"));
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "timetable.config.get",
        json!({ "academicYearId": year_id }),
    );
    assert_eq!(got["config"]["periodsPerDay"].as_i64(), Some(6));
    let years = request_ok(&mut stdin, &mut reader, "5", "academicYears.list", json!({}));
    assert_eq!(years["academicYears"][0]["hasTimetableConfig"].as_bool(), Some(true));

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "classes.create",
        json!({ "name": "11Y", "academicYearId": year_id }),
    );
    let class_id = str_field(&class, "classId");
    let slot = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "timetable.slots.create",
        json!({ "classId": class_id, "day": 2, "periodStart": 1, "periodEnd": 1 }),
    );
    let slot_id = str_field(&slot, "slotId");
    let slots = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.slots.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(slots["slots"].as_array().map(|a| a.len()), Some(1));
    let error = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.slots.create",
        json!({ "classId": class_id, "day": 3, "periodStart": 5, "periodEnd": 7 }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let module = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "modules.create",
        json!({ "title": "Waves", "description": "Year 11" }),
    );
    let module_id = str_field(&module, "moduleId");
    for (i, title) in ["Transverse", "Longitudinal"].iter().enumerate() {
        let lesson = request_ok(
            &mut stdin,
            &mut reader,
            "10",
            "modules.lessons.create",
            json!({ "moduleId": module_id, "title": title }),
        );
        assert_eq!(lesson["order"].as_i64(), Some(i as i64));
    }
    let lessons = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "modules.lessons.list",
        json!({ "moduleId": module_id }),
    );
    assert_eq!(lessons["lessons"][1]["title"].as_str(), Some("Longitudinal"));
    assert_eq!(lessons["lessons"][1]["duration"].as_i64(), Some(1));
    let modules = request_ok(&mut stdin, &mut reader, "12", "modules.list", json!({}));
    assert_eq!(modules["modules"][0]["lessonCount"].as_i64(), Some(2));

    let event = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "calendar.events.create",
        json!({
            "type": "holiday",
            "title": "Half term",
            "startDate": "2024-10-28",
            "endDate": "2024-11-01",
        }),
    );
    let event_id = str_field(&event, "eventId");
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "calendar.events.list",
        json!({ "from": "2024-10-01", "to": "2024-10-31" }),
    );
    assert_eq!(listed["events"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(listed["events"][0]["affectsAllClasses"].as_bool(), Some(true));
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "calendar.events.list",
        json!({ "from": "2024-11-02" }),
    );
    assert_eq!(listed["events"].as_array().map(|a| a.len()), Some(0));

    let assigned = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "schedule.assignModule",
        json!({ "classId": class_id, "moduleId": module_id, "startDate": "2024-10-22" }),
    );
    assert_eq!(assigned["lessonsScheduled"].as_u64(), Some(2));
    let scheduled = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "schedule.lessons.list",
        json!({ "classId": class_id, "from": "2024-10-01", "to": "2024-12-31" }),
    );
    let dates: Vec<String> = scheduled["lessons"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|l| str_field(l, "calendarDate"))
        .collect();
    assert_eq!(dates, vec!["2024-10-22", "2024-11-05"]);

    let error = request_err(
        &mut stdin,
        &mut reader,
        "18",
        "timetable.slots.delete",
        json!({ "slotId": slot_id }),
    );
    assert_eq!(error["code"].as_str(), Some("validation_failed"));

    let info = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "calendar.weekInfo",
        json!({ "classId": class_id, "date": "2024-10-22" }),
    );
    assert_eq!(info["weekday"].as_u64(), Some(2));

    let next = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "schedule.nextAvailable",
        json!({ "classId": class_id, "fromDate": "2024-10-22" }),
    );
    assert_eq!(next["date"].as_str(), Some("2024-10-29"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "calendar.events.delete",
        json!({ "eventId": event_id }),
    );
    let error = request_err(
        &mut stdin,
        &mut reader,
        "22",
        "calendar.events.delete",
        json!({ "eventId": event_id }),
    );
    assert_eq!(error["code"].as_str(), Some("not_found"));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "23",
        "classes.delete",
        json!({ "classId": class_id }),
    );
    assert_eq!(deleted["scheduledLessonsRemoved"].as_u64(), Some(2));
    let classes = request_ok(&mut stdin, &mut reader, "24", "classes.list", json!({}));
    assert_eq!(classes["classes"], json!([]));

    let health = request(&mut stdin, &mut reader, "25", "health", json!({}));
    let expected = workspace.to_string_lossy().to_string();
    assert_eq!(
        health["result"]["workspacePath"].as_str(),
        Some(expected.as_str())
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn management_inputs_are_validated() {
    let workspace = temp_dir("plannerd-validation");
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
        "academicYears.create",
        json!({ "name": "Backwards", "startDate": "2025-07-31", "endDate": "2024-09-01" }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.create",
        json!({ "name": "9Q" }),
    );
    let class_id = str_field(&class, "classId");
    for params in [
        json!({ "classId": class_id, "day": 8, "periodStart": 1 }),
        json!({ "classId": class_id, "day": 1, "periodStart": 0 }),
        json!({ "classId": class_id, "day": 1, "periodStart": 3, "periodEnd": 2 }),
        json!({ "classId": class_id, "day": 1, "periodStart": 1, "week": "C" }),
    ] {
        let error = request_err(&mut stdin, &mut reader, "4", "timetable.slots.create", params);
        assert_eq!(error["code"].as_str(), Some("bad_params"));
    }

    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "calendar.events.create",
        json!({ "type": "festival", "title": "x", "startDate": "2024-09-02", "endDate": "2024-09-02" }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));
    let error = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "calendar.events.create",
        json!({ "type": "closure", "title": "x", "startDate": "2024-09-03", "endDate": "2024-09-02" }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let module = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "modules.create",
        json!({ "title": "Energy" }),
    );
    let error = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "modules.lessons.create",
        json!({ "moduleId": str_field(&module, "moduleId"), "title": "x", "duration": 0 }),
    );
    assert_eq!(error["code"].as_str(), Some("bad_params"));

    let error = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "classes.create",
        json!({ "name": "10A", "academicYearId": "missing" }),
    );
    assert_eq!(error["code"].as_str(), Some("not_found"));

    drop(stdin);
    let _ = child.wait();
}
