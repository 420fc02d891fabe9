use std::time::SystemTime;

use chrono::{DateTime, Utc};

pub fn time_millis() -> i64 {
    let time: DateTime<chrono::Utc> = Utc::now();
    time.timestamp_millis()
}

/// Milliseconds since the epoch for a filesystem timestamp.
pub fn system_time_millis(time: SystemTime) -> i64 {
    let time: DateTime<chrono::Utc> = time.into();
    time.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use super::*;

    #[test]
    fn test_system_time_millis() {
        assert_eq!(system_time_millis(UNIX_EPOCH + Duration::from_millis(1_500)), 1_500);
        assert!(time_millis() > 0);
    }
}
