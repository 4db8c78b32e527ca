use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of body holding a meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Advisory Committee")]
    AdvisoryCommittee,
    #[serde(rename = "Board")]
    Board,
    #[serde(rename = "City Council")]
    CityCouncil,
    #[serde(rename = "Commission")]
    Commission,
    #[serde(rename = "Committee")]
    Committee,
    #[serde(rename = "Forum")]
    Forum,
    #[serde(rename = "Police Beat")]
    PoliceBeat,
    #[serde(rename = "Not classified")]
    NotClassified,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::AdvisoryCommittee => "Advisory Committee",
            Classification::Board => "Board",
            Classification::CityCouncil => "City Council",
            Classification::Commission => "Commission",
            Classification::Committee => "Committee",
            Classification::Forum => "Forum",
            Classification::PoliceBeat => "Police Beat",
            Classification::NotClassified => "Not classified",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Cancelled,
    Tentative,
    Confirmed,
    Passed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Cancelled => "cancelled",
            Status::Tentative => "tentative",
            Status::Confirmed => "confirmed",
            Status::Passed => "passed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record type tag, always serialized as `"event"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    #[default]
    #[serde(rename = "event")]
    Event,
}

/// Date with optional local wall-clock time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub note: String,
}

impl EventTime {
    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self {
            date: dt.date(),
            time: Some(dt.time()),
            note: String::new(),
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date,
            time: None,
            note: String::new(),
        }
    }

    /// Combined timestamp, midnight when no time is known
    pub fn naive_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }
}

/// Coordinates exactly as published by the source site, empty when unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: String,
    pub longitude: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub url: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub note: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default)]
    pub note: String,
}

/// Normalized meeting record emitted by every spider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_type")]
    pub item_type: ItemType,
    pub id: String,
    pub name: String,
    pub description: String,
    pub classification: Classification,
    pub start: EventTime,
    pub end: EventTime,
    pub all_day: bool,
    pub status: Status,
    pub location: Location,
    pub documents: Vec<Document>,
    pub sources: Vec<Source>,
}

/// Fields filled in from a meeting detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub location: Location,
    pub documents: Vec<Document>,
}

impl Event {
    pub fn apply_details(&mut self, details: EventDetails) {
        self.location = details.location;
        self.documents = details.documents;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> Event {
        let start = NaiveDate::from_ymd_opt(2018, 12, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Event {
            item_type: ItemType::Event,
            id: "chi_buildings/201812051000/x/test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            classification: Classification::NotClassified,
            start: EventTime::from_datetime(start),
            end: EventTime::from_date(start.date()),
            all_day: false,
            status: Status::Passed,
            location: Location::default(),
            documents: vec![],
            sources: vec![Source {
                url: "http://example.com".to_string(),
                note: String::new(),
            }],
        }
    }

    #[test]
    fn test_event_serializes_flat_record() {
        let value = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(value["_type"], json!("event"));
        assert_eq!(value["classification"], json!("Not classified"));
        assert_eq!(value["status"], json!("passed"));
        assert_eq!(value["start"]["date"], json!("2018-12-05"));
        assert_eq!(value["start"]["time"], json!("10:00:00"));
        assert_eq!(value["end"]["time"], json!(null));
        assert_eq!(value["all_day"], json!(false));
    }

    #[test]
    fn test_unknown_location_keeps_coordinates_object() {
        let value = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(
            value["location"]["coordinates"],
            json!({"latitude": "", "longitude": ""})
        );
    }

    #[test]
    fn test_naive_datetime_defaults_to_midnight() {
        let date = NaiveDate::from_ymd_opt(2019, 1, 2).unwrap();
        let time = EventTime::from_date(date);
        assert_eq!(time.naive_datetime().format("%H%M").to_string(), "0000");
    }

    #[test]
    fn test_labels_match_serde() {
        for c in [Classification::Board, Classification::Committee, Classification::PoliceBeat] {
            assert_eq!(serde_json::to_value(c).unwrap(), json!(c.as_str()));
        }
        assert_eq!(Status::Cancelled.to_string(), "cancelled");
    }
}
