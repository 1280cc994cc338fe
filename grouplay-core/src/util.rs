/// Convert a number of seconds to a string in the format "HH:MM:SS".
/// If the number of hours is 0, it will be omitted.
pub fn seconds_to_hms_string(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// As [`seconds_to_hms_string`], for a track duration in milliseconds.
/// Partial seconds are dropped.
pub fn millis_to_hms_string(millis: u64) -> String {
    seconds_to_hms_string(u32::try_from(millis / 1000).unwrap_or(u32::MAX))
}
