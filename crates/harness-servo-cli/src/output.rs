//! Servo protocol messages written to stdout.

use serde_json::{Value, json};

use harness_servo_driver::AdjustError;

pub fn progress_message(percent: u8, message: &str) -> Value {
    json!({"progress": percent, "message": message})
}

pub fn completed_message() -> Value {
    json!({"status": "ok"})
}

pub fn failure_message(err: &AdjustError) -> Value {
    json!({"status": "failed", "reason": err.reason(), "message": err.to_string()})
}

pub fn emit(message: &Value) {
    println!("{message}");
}

pub fn progress(percent: u8, message: &str) {
    emit(&progress_message(percent, message));
}

pub fn completed() {
    emit(&completed_message());
}

pub fn failure(err: &AdjustError) {
    emit(&failure_message(err));
}
