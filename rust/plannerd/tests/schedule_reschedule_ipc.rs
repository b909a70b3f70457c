mod test_support;

use serde_json::json;
use std::collections::HashSet;
use test_support::{
    pairs, request_err, request_ok, schedule_of, seed_class, seed_module, spawn_sidecar,
    str_field, temp_dir,
};

#[test]
fn midweek_holiday_shifts_displaced_lessons_by_one_slot() {
    let workspace = temp_dir("plannerd-reschedule-holiday");
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
    let before = schedule_of(&mut stdin, &mut reader, &fx.class_id);

    let event = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.events.create",
        json!({
            "type": "holiday",
            "title": "Founders day",
            "startDate": "2024-09-04",
            "endDate": "2024-09-04",
        }),
    );
    let event_id = str_field(&event, "eventId");

    let preview = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "schedule.rescheduleForEvent",
        json!({ "eventId": event_id, "preview": true }),
    );
    assert_eq!(preview["lessonsRescheduled"].as_u64(), Some(3));
    assert_eq!(preview["preview"].as_bool(), Some(true));
    assert_eq!(schedule_of(&mut stdin, &mut reader, &fx.class_id), before);

    let applied = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.rescheduleForEvent",
        json!({ "eventId": event_id }),
    );
    assert_eq!(applied["changes"], preview["changes"]);
    assert_eq!(applied["rescheduledLessonIds"].as_array().map(|a| a.len()), Some(3));

    let after = schedule_of(&mut stdin, &mut reader, &fx.class_id);
    assert_eq!(
        after,
        pairs(&[
            ("Lesson 1", "2024-09-02"),
            ("Lesson 2", "2024-09-03"),
            ("Lesson 3", "2024-09-05"),
            ("Lesson 4", "2024-09-06"),
            ("Lesson 5", "2024-09-09"),
        ])
    );
    assert!(after.iter().all(|(_, date)| date != "2024-09-04"));

    // Nothing left inside the event, so a second run is a no-op.
    let again = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "schedule.rescheduleForEvent",
        json!({ "eventId": event_id }),
    );
    assert_eq!(again["lessonsRescheduled"].as_u64(), Some(0));
    assert_eq!(again["changes"], json!([]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn each_affected_class_is_replanned_on_its_own_slots() {
    let workspace = temp_dir("plannerd-reschedule-classes");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let daily = seed_class(&mut stdin, &mut reader, &[1, 2, 3, 4, 5]);
    let mon_wed = seed_class(&mut stdin, &mut reader, &[1, 3]);
    let module_id = seed_module(&mut stdin, &mut reader, &[1, 1, 1]);
    for (i, class_id) in [&daily.class_id, &mon_wed.class_id].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("assign-{}", i),
            "schedule.assignModule",
            json!({ "classId": class_id, "moduleId": module_id, "startDate": "2024-09-02" }),
        );
    }

    let event = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "calendar.events.create",
        json!({
            "type": "closure",
            "title": "Boiler failure",
            "startDate": "2024-09-04",
            "endDate": "2024-09-04",
        }),
    );
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "schedule.rescheduleForEvent",
        json!({ "eventId": str_field(&event, "eventId") }),
    );
    assert_eq!(result["lessonsRescheduled"].as_u64(), Some(3));

    assert_eq!(
        schedule_of(&mut stdin, &mut reader, &daily.class_id),
        pairs(&[
            ("Lesson 1", "2024-09-02"),
            ("Lesson 2", "2024-09-03"),
            ("Lesson 3", "2024-09-05"),
        ])
    );
    assert_eq!(
        schedule_of(&mut stdin, &mut reader, &mon_wed.class_id),
        pairs(&[
            ("Lesson 1", "2024-09-02"),
            ("Lesson 2", "2024-09-09"),
            ("Lesson 3", "2024-09-11"),
        ])
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn multi_day_event_keeps_schedule_outside_every_event() {
    let workspace = temp_dir("plannerd-reschedule-range");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let fx = seed_class(&mut stdin, &mut reader, &[1, 2, 3, 4, 5]);
    let module_id = seed_module(&mut stdin, &mut reader, &[1, 1, 1, 1, 1, 1, 1, 1]);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schedule.assignModule",
        json!({ "classId": fx.class_id, "moduleId": module_id, "startDate": "2024-09-02" }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "calendar.events.create",
        json!({
            "type": "holiday",
            "title": "Trip week",
            "startDate": "2024-09-16",
            "endDate": "2024-09-20",
        }),
    );
    let event = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "calendar.events.create",
        json!({
            "type": "closure",
            "title": "Storm",
            "startDate": "2024-09-05",
            "endDate": "2024-09-06",
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "schedule.rescheduleForEvent",
        json!({ "eventId": str_field(&event, "eventId") }),
    );

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "schedule.lessons.list",
        json!({ "classId": fx.class_id }),
    );
    let lessons = listed["lessons"].as_array().cloned().unwrap_or_default();
    assert_eq!(lessons.len(), 8);

    let dates: Vec<String> = lessons.iter().map(|l| str_field(l, "calendarDate")).collect();
    assert_eq!(
        dates,
        vec![
            "2024-09-02",
            "2024-09-03",
            "2024-09-04",
            "2024-09-09",
            "2024-09-10",
            "2024-09-11",
            "2024-09-12",
            "2024-09-13",
        ]
    );
    for date in &dates {
        assert!(!("2024-09-05".."2024-09-07").contains(&date.as_str()));
        assert!(!("2024-09-16".."2024-09-21").contains(&date.as_str()));
    }

    let seats: HashSet<(String, String)> = lessons
        .iter()
        .map(|l| (str_field(l, "calendarDate"), str_field(l, "timetableSlotId")))
        .collect();
    assert_eq!(seats.len(), lessons.len());
    let orders: Vec<i64> = lessons.iter().filter_map(|l| l["order"].as_i64()).collect();
    assert!(orders.windows(2).all(|w| w[0] < w[1]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_event_is_not_found() {
    let workspace = temp_dir("plannerd-reschedule-missing");
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
        "schedule.rescheduleForEvent",
        json!({ "eventId": "missing" }),
    );
    assert_eq!(error["code"].as_str(), Some("not_found"));
    assert_eq!(error["message"].as_str(), Some("Event not found"));

    drop(stdin);
    let _ = child.wait();
}
