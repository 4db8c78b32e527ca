use crate::common::constants::{
    CHICAGO_TIMEZONE, CHI_BUILDINGS_AGENCY_NAME, CHI_BUILDINGS_SPIDER,
};
use crate::common::error::Result;
use crate::common::helpers::{clean_text, generate_id, generate_status, local_now};
use crate::common::types::{
    Classification, Coordinates, Document, Event, EventDetails, EventTime, ItemType, Location,
    Source,
};
use crate::config::CrawlConfig;
use crate::spider::{ParseOutput, Request, Response, Spider};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use chrono_tz::America::Chicago;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const CALENDAR_URL: &str =
    "https://www.pbcchicago.com/wp-admin/admin-ajax.php?action=eventorganiser-fullcal";
const CATEGORY_CLASS_PREFIX: &str = "eo-event-cat-";
const UPLOADS_PATH: &str = "/wp-content/uploads/";

static VENUE_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".eo-event-meta a[href*=\"/venues/\"]").unwrap());
static VENUE_ADDRESS_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".venue-address").unwrap());
static VENUE_WEBSITE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".venue-website a[href]").unwrap());
static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());
static DOCUMENT_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".entry-content a[href]").unwrap());

/// `className` is either a single class string or a list of them
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum ClassNames {
    One(String),
    Many(Vec<String>),
    #[default]
    Missing,
}

impl ClassNames {
    fn iter(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            ClassNames::One(s) => Box::new(s.split_whitespace()),
            ClassNames::Many(v) => Box::new(v.iter().map(String::as_str)),
            ClassNames::Missing => Box::new(std::iter::empty()),
        }
    }
}

/// One entry of the Event Organiser full-calendar feed
#[derive(Debug, Deserialize)]
struct CalendarEntry {
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "allDay", default)]
    all_day: bool,
    start: Option<String>,
    end: Option<String>,
    #[serde(default)]
    category: Vec<String>,
    #[serde(rename = "className", default)]
    class_name: ClassNames,
}

impl CalendarEntry {
    fn categories(&self) -> Vec<String> {
        if !self.category.is_empty() {
            return self.category.iter().map(|c| c.to_lowercase()).collect();
        }
        self.class_name
            .iter()
            .filter_map(|c| c.strip_prefix(CATEGORY_CLASS_PREFIX))
            .map(str::to_lowercase)
            .collect()
    }
}

/// Outcome of classifying a calendar entry
#[derive(Debug, PartialEq)]
enum EntryKind {
    Holiday,
    Meeting(Classification),
}

/// Public Building Commission of Chicago board and committee meetings
pub struct ChiBuildingsSpider {
    lookback_days: i64,
    lookahead_days: i64,
    now: Option<NaiveDateTime>,
}

impl Default for ChiBuildingsSpider {
    fn default() -> Self {
        Self::new(&CrawlConfig::default())
    }
}

impl ChiBuildingsSpider {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            lookback_days: config.lookback_days,
            lookahead_days: config.lookahead_days,
            now: None,
        }
    }

    /// Pin the reference time used for statuses
    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| local_now(Chicago))
    }

    fn classify(categories: &[String]) -> EntryKind {
        if categories.iter().any(|c| c.contains("holiday")) {
            EntryKind::Holiday
        } else if categories.iter().any(|c| c.contains("board")) {
            EntryKind::Meeting(Classification::Board)
        } else if categories.iter().any(|c| c.contains("committee")) {
            EntryKind::Meeting(Classification::Committee)
        } else {
            EntryKind::Meeting(Classification::NotClassified)
        }
    }

    fn parse_time(value: &str) -> Option<EventTime> {
        let value = value.trim();
        for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(EventTime::from_datetime(dt));
            }
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .map(EventTime::from_date)
    }

    /// Titles come through with HTML entities left in
    fn decode_title(title: &str) -> String {
        let fragment = Html::parse_fragment(title);
        clean_text(&fragment.root_element().text().collect::<String>())
    }

    fn build_event(&self, entry: &CalendarEntry, classification: Classification) -> Option<Event> {
        let name = entry
            .title
            .as_deref()
            .map(Self::decode_title)
            .filter(|t| !t.is_empty())?;
        let start = entry.start.as_deref().and_then(Self::parse_time)?;
        let end = entry
            .end
            .as_deref()
            .and_then(Self::parse_time)
            .unwrap_or_else(|| EventTime::from_date(start.date));
        let description = String::new();

        let status = generate_status(&name, &description, "", &start, self.now());
        let id = generate_id(CHI_BUILDINGS_SPIDER, &start, None, &name);
        let sources = entry
            .url
            .iter()
            .map(|url| Source {
                url: url.clone(),
                note: String::new(),
            })
            .collect();

        Some(Event {
            item_type: ItemType::Event,
            id,
            name,
            description,
            classification,
            start,
            end,
            all_day: entry.all_day,
            status,
            location: Location::default(),
            documents: Vec::new(),
            sources,
        })
    }

    /// Pull venue and document links out of a single meeting page.
    pub fn parse_event_details(&self, response: &Response) -> EventDetails {
        let document = response.html();
        EventDetails {
            location: Self::parse_location(&document, &response.url),
            documents: Self::parse_documents(&document, &response.url),
        }
    }

    fn parse_location(document: &Html, page_url: &str) -> Location {
        let name = document
            .select(&VENUE_LINK_SELECTOR)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default();
        let address = document
            .select(&VENUE_ADDRESS_SELECTOR)
            .next()
            .map(|el| clean_text(&el.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();
        let url = document
            .select(&VENUE_WEBSITE_SELECTOR)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| absolute_url(page_url, href))
            .unwrap_or_default();

        Location {
            url,
            name,
            address,
            coordinates: Self::parse_coordinates(document).unwrap_or_default(),
        }
    }

    /// Coordinates live in the map settings script, `var eventorganiser = {...};`
    fn parse_coordinates(document: &Html) -> Option<Coordinates> {
        let script = document
            .select(&SCRIPT_SELECTOR)
            .map(|el| el.text().collect::<String>())
            .find(|text| text.contains("var eventorganiser"))?;
        let start = script.find('{')?;
        let end = script.rfind('}')?;
        if end <= start {
            return None;
        }
        let settings: Value = match serde_json::from_str(&script[start..=end]) {
            Ok(v) => v,
            Err(e) => {
                warn!("Could not decode map settings: {}", e);
                return None;
            }
        };

        let location = settings
            .get("map")?
            .as_array()?
            .iter()
            .filter_map(|m| m.get("locations").and_then(Value::as_array))
            .flatten()
            .next()?;
        Some(Coordinates {
            latitude: coordinate_string(location.get("lat")?)?,
            longitude: coordinate_string(location.get("lng")?)?,
        })
    }

    fn parse_documents(document: &Html, page_url: &str) -> Vec<Document> {
        document
            .select(&DOCUMENT_LINK_SELECTOR)
            .filter_map(|link| {
                let href = link.value().attr("href")?.trim();
                if !href.contains(UPLOADS_PATH) {
                    return None;
                }
                let note = clean_text(&link.text().collect::<String>());
                Some(Document {
                    note: if note.is_empty() { "Document".to_string() } else { note },
                    url: absolute_url(page_url, href),
                })
            })
            .collect()
    }
}

fn coordinate_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn absolute_url(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    reqwest::Url::parse(page_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

impl Spider for ChiBuildingsSpider {
    fn name(&self) -> &'static str {
        CHI_BUILDINGS_SPIDER
    }

    fn agency_name(&self) -> &'static str {
        CHI_BUILDINGS_AGENCY_NAME
    }

    fn timezone(&self) -> &'static str {
        CHICAGO_TIMEZONE
    }

    fn start_requests(&self, now: NaiveDateTime) -> Vec<Request> {
        let today = now.date();
        let start = today - Duration::days(self.lookback_days);
        let end = today + Duration::days(self.lookahead_days);
        vec![Request::listing(format!(
            "{}&start={}&end={}",
            CALENDAR_URL,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ))]
    }

    #[instrument(skip(self, response), fields(url = %response.url))]
    fn parse(&self, response: &Response) -> Result<Vec<ParseOutput>> {
        let entries: Vec<Value> = response.json()?;
        debug!("Processing {} calendar entries", entries.len());

        let mut outputs = Vec::new();
        for (i, raw) in entries.into_iter().enumerate() {
            let entry: CalendarEntry = match serde_json::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping malformed calendar entry {}: {}", i, e);
                    continue;
                }
            };

            let classification = match Self::classify(&entry.categories()) {
                EntryKind::Holiday => {
                    debug!("Skipping holiday entry {:?}", entry.title);
                    continue;
                }
                EntryKind::Meeting(c) => c,
            };

            let Some(event) = self.build_event(&entry, classification) else {
                warn!("Skipping calendar entry {} without title or start", i);
                continue;
            };

            let detail_url = entry.url.as_deref().filter(|u| !u.trim().is_empty());
            match (classification, detail_url) {
                (Classification::Board | Classification::Committee, Some(url)) => {
                    outputs.push(ParseOutput::Request(Request::detail(url, event)));
                }
                _ => outputs.push(ParseOutput::Item(event)),
            }
        }

        info!("Parsed {} meetings from calendar feed", outputs.len());
        Ok(outputs)
    }

    fn parse_detail(&self, response: &Response, mut item: Event) -> Result<Event> {
        let details = self.parse_event_details(response);
        if details.location.name.is_empty() {
            warn!("No venue found on {}", response.url);
        }
        item.apply_details(details);
        Ok(item)
    }
}
