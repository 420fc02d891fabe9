//! Flow list metadata: what a flow is for, whether it is switched on, the
//! channel it serves and its weekly opening hours.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::{ChatflowError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
pub enum FlowStatus {
    #[default]
    Active,
    Inactive,
}

/// Messenger channel a flow is attached to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::EnumString)]
pub enum Channel {
    WhatsApp,
    Telegram,
    Facebook,
    Web,
    #[serde(rename = "API")]
    #[strum(serialize = "API")]
    Api,
}

/// `HH:mm` wire form of a time of day.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(
        time: &NaiveTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, FORMAT).map_err(|e| D::Error::custom(format!("invalid time '{}': {}", s, e)))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub enabled: bool,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl Default for DaySchedule {
    /// Disabled, 09:00 to 17:00.
    fn default() -> Self {
        Self {
            enabled: false,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

impl DaySchedule {
    pub fn open(
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            enabled: true,
            start_time,
            end_time,
        }
    }

    /// Half-open: `end_time` itself is closed.
    pub fn contains(
        &self,
        time: NaiveTime,
    ) -> bool {
        self.enabled && self.start_time <= time && time < self.end_time
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WeeklySchedule {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
}

const WEEK: [Weekday; 7] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun];

impl WeeklySchedule {
    pub fn day(
        &self,
        weekday: Weekday,
    ) -> &DaySchedule {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn day_mut(
        &mut self,
        weekday: Weekday,
    ) -> &mut DaySchedule {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    /// Enabled days must open before they close.
    pub fn check(&self) -> Result<()> {
        for weekday in WEEK {
            let day = self.day(weekday);
            if day.enabled && day.start_time >= day.end_time {
                return Err(ChatflowError::InvalidMeta(format!(
                    "{}: start time {} must be before end time {}",
                    weekday,
                    day.start_time.format("%H:%M"),
                    day.end_time.format("%H:%M")
                )));
            }
        }
        Ok(())
    }
}

/// Metadata kept next to a stored flow document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowMeta {
    pub description: String,
    #[serde(default)]
    pub status: FlowStatus,
    pub channel: Channel,
    #[serde(default)]
    pub schedule: WeeklySchedule,
}

impl FlowMeta {
    pub fn new(
        description: impl Into<String>,
        channel: Channel,
    ) -> Self {
        Self {
            description: description.into(),
            status: FlowStatus::Active,
            channel,
            schedule: WeeklySchedule::default(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(ChatflowError::InvalidMeta("description is required".into()));
        }
        self.schedule.check()
    }

    /// Whether the flow is active and `at` falls inside its schedule.
    pub fn is_open_at(
        &self,
        at: NaiveDateTime,
    ) -> bool {
        self.status == FlowStatus::Active && self.schedule.day(at.weekday()).contains(at.time())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn hm(
        h: u32,
        m: u32,
    ) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn weekdays_meta() -> FlowMeta {
        let mut meta = FlowMeta::new("Welcome flow for new WhatsApp users", Channel::WhatsApp);
        for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            *meta.schedule.day_mut(weekday) = DaySchedule::open(hm(9, 0), hm(17, 0));
        }
        meta
    }

    #[test]
    fn test_meta_json() {
        let meta = weekdays_meta();
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["status"], "Active");
        assert_eq!(value["channel"], "WhatsApp");
        assert_eq!(value["schedule"]["monday"], json!({"enabled": true, "startTime": "09:00", "endTime": "17:00"}));
        assert_eq!(value["schedule"]["sunday"]["enabled"], false);

        let back: FlowMeta = serde_json::from_value(value).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_partial_meta_json() {
        let meta: FlowMeta = serde_json::from_str(r#"{"description": "Billing", "channel": "API"}"#).unwrap();
        assert_eq!(meta.channel, Channel::Api);
        assert_eq!(meta.status, FlowStatus::Active);
        assert_eq!(meta.schedule, WeeklySchedule::default());

        assert!(serde_json::from_str::<FlowMeta>(r#"{"description": "x", "channel": "Web", "schedule": {"monday": {"enabled": true, "startTime": "9am", "endTime": "17:00"}}}"#).is_err());
    }

    #[test]
    fn test_schedule_start_before_end() {
        let mut meta = weekdays_meta();
        assert!(meta.check().is_ok());

        meta.schedule.saturday = DaySchedule::open(hm(14, 0), hm(10, 0));
        let err = meta.check().unwrap_err();
        assert!(matches!(err, ChatflowError::InvalidMeta(_)));
        assert!(err.to_string().starts_with("Sat"));

        // equal times are rejected too
        meta.schedule.saturday = DaySchedule::open(hm(10, 0), hm(10, 0));
        assert!(meta.check().is_err());

        // disabled days are not checked
        meta.schedule.saturday.enabled = false;
        assert!(meta.check().is_ok());
    }

    #[test]
    fn test_description_required() {
        assert!(matches!(FlowMeta::new("  ", Channel::Web).check(), Err(ChatflowError::InvalidMeta(_))));
    }

    #[test]
    fn test_is_open_at() {
        let mut meta = weekdays_meta();
        // 2026-10-19 is a Monday
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(meta.is_open_at(monday.and_time(hm(9, 0))));
        assert!(!meta.is_open_at(monday.and_time(hm(17, 0))));
        assert!(!meta.is_open_at(monday.and_time(hm(8, 59))));

        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert!(!meta.is_open_at(sunday.and_time(hm(12, 0))));

        meta.status = FlowStatus::Inactive;
        assert!(!meta.is_open_at(monday.and_time(hm(12, 0))));
    }
}
