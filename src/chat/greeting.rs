use chrono::{Local, Timelike};

/// Salutation for a local hour (0-23)
pub fn salutation(hour: u32) -> &'static str {
    if hour < 12 {
        "Good morning"
    } else if hour < 17 {
        "Good afternoon"
    } else {
        "Good evening"
    }
}

/// "Good <part of day>, <user>" for the current local time
pub fn greeting(username: &str) -> String {
    format!("{}, {}", salutation(Local::now().hour()), username)
}
