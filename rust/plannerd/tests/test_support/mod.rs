#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_plannerd");
    let mut child = Command::new(exe)
        .env_remove("PLANNERD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn plannerd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(json!({}))
}

/// Returns the `error` object of a failed response.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    value.get("error").cloned().expect("error object")
}

pub fn str_field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing string field {} in {}", key, value))
        .to_string()
}

pub struct ClassFixture {
    pub year_id: String,
    pub class_id: String,
    pub slot_ids: Vec<String>,
}

/// Academic year 2024-09-01..2025-07-31 with a timetable config, and one
/// class with a period-1 slot on each given weekday.
pub fn seed_class(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    days: &[i64],
) -> ClassFixture {
    let year = request_ok(
        stdin,
        reader,
        "seed-year",
        "academicYears.create",
        json!({ "name": "2024-25", "startDate": "2024-09-01", "endDate": "2025-07-31" }),
    );
    let year_id = str_field(&year, "academicYearId");
    let _ = request_ok(
        stdin,
        reader,
        "seed-config",
        "timetable.config.set",
        json!({ "academicYearId": year_id }),
    );
    let class = request_ok(
        stdin,
        reader,
        "seed-class",
        "classes.create",
        json!({ "name": "10P", "academicYearId": year_id }),
    );
    let class_id = str_field(&class, "classId");
    let slot_ids = days
        .iter()
        .map(|day| {
            let slot = request_ok(
                stdin,
                reader,
                "seed-slot",
                "timetable.slots.create",
                json!({ "classId": class_id, "day": day, "periodStart": 1, "periodEnd": 1 }),
            );
            str_field(&slot, "slotId")
        })
        .collect();
    ClassFixture {
        year_id,
        class_id,
        slot_ids,
    }
}

/// A module with one lesson per entry of `durations`, titled "Lesson 1".. in order.
pub fn seed_module(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    durations: &[i64],
) -> String {
    let module = request_ok(
        stdin,
        reader,
        "seed-module",
        "modules.create",
        json!({ "title": "Forces and Motion" }),
    );
    let module_id = str_field(&module, "moduleId");
    for (i, duration) in durations.iter().enumerate() {
        let _ = request_ok(
            stdin,
            reader,
            "seed-lesson",
            "modules.lessons.create",
            json!({
                "moduleId": module_id,
                "title": format!("Lesson {}", i + 1),
                "duration": duration,
            }),
        );
    }
    module_id
}

/// `(title, calendarDate)` pairs of a class's schedule in date order.
pub fn schedule_of(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    class_id: &str,
) -> Vec<(String, String)> {
    let listed = request_ok(
        stdin,
        reader,
        "schedule-of",
        "schedule.lessons.list",
        json!({ "classId": class_id }),
    );
    listed
        .get("lessons")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|l| (str_field(l, "title"), str_field(l, "calendarDate")))
        .collect()
}

pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(t, d)| (t.to_string(), d.to_string()))
        .collect()
}
