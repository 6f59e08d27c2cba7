//! Day-by-day trip plan.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

pub const DEFAULT_TRIP_TITLE: &str = "Untitled trip";
pub const DEFAULT_TRIP_DAYS: u32 = 5;
pub const DEFAULT_EXCHANGE_RATE: f64 = 0.215;

/// Trip settings chosen when the trip is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripConfig {
    pub title: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    pub days: u32,
    /// Local currency to home currency conversion rate.
    pub rate: f64,
    pub currency: String,
    pub lang_code: String,
    pub lang_name: String,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            start_date: chrono::Local::now().date_naive().format("%Y-%m-%d").to_string(),
            days: DEFAULT_TRIP_DAYS,
            rate: DEFAULT_EXCHANGE_RATE,
            currency: "JPY".to_string(),
            lang_code: "ja".to_string(),
            lang_name: "Japanese".to_string(),
        }
    }
}

impl TripConfig {
    /// The title to show, falling back to a placeholder for blank titles.
    pub fn display_title(&self) -> &str {
        match self.title.trim() {
            "" => DEFAULT_TRIP_TITLE,
            title => title,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    #[default]
    Spot,
    Food,
    Shop,
    Transport,
    Flight,
    CountryDivider,
}

/// One stop in a day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayItem {
    pub time: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub activity: String,
    pub location: String,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_country_divider: Option<bool>,
}

impl DayItem {
    pub fn new(time: &str, kind: ItemKind, activity: &str, location: &str) -> Self {
        Self {
            time: time.to_string(),
            kind,
            activity: activity.to_string(),
            location: location.to_string(),
            ..Default::default()
        }
    }

    /// A divider marking that the following items happen in another country.
    pub fn country_divider(country: &str, country_code: &str) -> Self {
        Self {
            kind: ItemKind::CountryDivider,
            activity: country.to_string(),
            country: Some(country.to_string()),
            country_code: Some(country_code.to_string()),
            is_country_divider: Some(true),
            ..Default::default()
        }
    }

    pub fn is_divider(&self) -> bool {
        self.kind == ItemKind::CountryDivider || self.is_country_divider == Some(true)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightKind {
    Arrival,
    Departure,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    #[serde(rename = "type")]
    pub kind: FlightKind,
    pub start_time: String,
    pub start_airport: String,
    pub number: String,
    pub end_time: String,
    pub end_airport: String,
    /// Days between departure and arrival (+1 for overnight flights).
    pub arrival_offset: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    /// Display label, e.g. `04/01 (Tue)`.
    pub date: String,
    pub short_date: String,
    pub full_date: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<DayItem>,
    #[serde(default)]
    pub flight: Option<Flight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> ResultEngine<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidDate(format!("\"{value}\" is not YYYY-MM-DD")))
}

/// The ordered list of days of a trip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Itinerary {
    days: Vec<Day>,
}

impl Itinerary {
    pub fn new(days: Vec<Day>) -> Self {
        Self { days }
    }

    /// Lay out one empty day per configured day, starting at the start date.
    pub fn plan(config: &TripConfig) -> ResultEngine<Self> {
        let start = parse_date(&config.start_date)?;
        let mut days = Vec::with_capacity(config.days as usize);
        for offset in 0..config.days {
            let date = start
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or_else(|| EngineError::InvalidDate("trip runs past the calendar".to_string()))?;
            let short_date = date.format("%m/%d").to_string();
            days.push(Day {
                date: format!("{short_date} ({})", weekday_label(date.weekday())),
                short_date,
                full_date: date.format("%Y-%m-%d").to_string(),
                title: if offset == 0 {
                    "Arrival & explore".to_string()
                } else {
                    "Plan".to_string()
                },
                ..Default::default()
            });
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> &[Day] {
        &self.days
    }

    pub fn into_days(self) -> Vec<Day> {
        self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, index: usize) -> ResultEngine<&Day> {
        self.days
            .get(index)
            .ok_or_else(|| EngineError::KeyNotFound(format!("day {}", index + 1)))
    }

    fn day_mut(&mut self, index: usize) -> ResultEngine<&mut Day> {
        self.days
            .get_mut(index)
            .ok_or_else(|| EngineError::KeyNotFound(format!("day {}", index + 1)))
    }

    /// Append a blank day labelled `Day N`.
    pub fn add_day(&mut self) -> &Day {
        let label = format!("Day {}", self.days.len() + 1);
        self.days.push(Day {
            date: label,
            ..Default::default()
        });
        &self.days[self.days.len() - 1]
    }

    /// Remove a day. The last remaining day cannot be removed.
    pub fn remove_day(&mut self, index: usize) -> ResultEngine<Day> {
        self.day(index)?;
        if self.days.len() <= 1 {
            return Err(EngineError::InvalidDate(
                "a trip needs at least one day".to_string(),
            ));
        }
        Ok(self.days.remove(index))
    }

    pub fn add_item(&mut self, day: usize, item: DayItem) -> ResultEngine<()> {
        self.day_mut(day)?.items.push(item);
        Ok(())
    }

    pub fn remove_item(&mut self, day: usize, index: usize) -> ResultEngine<DayItem> {
        let day = self.day_mut(day)?;
        if index >= day.items.len() {
            return Err(EngineError::KeyNotFound(format!("item {}", index + 1)));
        }
        Ok(day.items.remove(index))
    }

    /// Swap an item with the one above it. No-op for the first item.
    pub fn move_item_up(&mut self, day: usize, index: usize) -> ResultEngine<()> {
        let items = &mut self.day_mut(day)?.items;
        if index > 0 && index < items.len() {
            items.swap(index - 1, index);
        }
        Ok(())
    }

    /// Swap an item with the one below it. No-op for the last item.
    pub fn move_item_down(&mut self, day: usize, index: usize) -> ResultEngine<()> {
        let items = &mut self.day_mut(day)?.items;
        if index + 1 < items.len() {
            items.swap(index, index + 1);
        }
        Ok(())
    }

    /// Insert a country divider before `index` (clamped to the end).
    pub fn insert_country_divider(
        &mut self,
        day: usize,
        index: usize,
        country: &str,
        country_code: &str,
    ) -> ResultEngine<()> {
        let items = &mut self.day_mut(day)?.items;
        let index = index.min(items.len());
        items.insert(index, DayItem::country_divider(country, country_code));
        Ok(())
    }

    /// The closest divider above `index`, if any.
    pub fn country_divider_above(&self, day: usize, index: usize) -> ResultEngine<Option<&DayItem>> {
        let items = &self.day(day)?.items;
        let end = index.min(items.len());
        Ok(items[..end].iter().rev().find(|item| item.is_divider()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(start: &str, days: u32) -> TripConfig {
        TripConfig {
            title: "Kyoto".to_string(),
            start_date: start.to_string(),
            days,
            ..Default::default()
        }
    }

    #[test]
    fn plan_lays_out_consecutive_days() {
        let itinerary = Itinerary::plan(&config("2025-03-30", 3)).unwrap();
        let days = itinerary.days();

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, "03/30 (Sun)");
        assert_eq!(days[0].title, "Arrival & explore");
        assert_eq!(days[1].full_date, "2025-03-31");
        assert_eq!(days[2].short_date, "04/01");
        assert_eq!(days[2].title, "Plan");
    }

    #[test]
    fn plan_rejects_bad_start_date() {
        assert!(matches!(
            Itinerary::plan(&config("30/03/2025", 3)),
            Err(EngineError::InvalidDate(_))
        ));
    }

    #[test]
    fn cannot_remove_last_day() {
        let mut itinerary = Itinerary::plan(&config("2025-03-30", 2)).unwrap();
        itinerary.remove_day(0).unwrap();
        assert!(itinerary.remove_day(0).is_err());
        assert_eq!(itinerary.len(), 1);
    }

    #[test]
    fn add_day_is_labelled_by_position() {
        let mut itinerary = Itinerary::plan(&config("2025-03-30", 2)).unwrap();
        assert_eq!(itinerary.add_day().date, "Day 3");
    }

    #[test]
    fn move_items_within_bounds() {
        let mut itinerary = Itinerary::plan(&config("2025-03-30", 1)).unwrap();
        itinerary
            .add_item(0, DayItem::new("09:00", ItemKind::Spot, "Temple", "Higashiyama"))
            .unwrap();
        itinerary
            .add_item(0, DayItem::new("12:00", ItemKind::Food, "Udon", "Gion"))
            .unwrap();

        itinerary.move_item_up(0, 0).unwrap();
        assert_eq!(itinerary.day(0).unwrap().items[0].activity, "Temple");

        itinerary.move_item_down(0, 0).unwrap();
        assert_eq!(itinerary.day(0).unwrap().items[0].activity, "Udon");

        itinerary.move_item_down(0, 1).unwrap();
        assert_eq!(itinerary.day(0).unwrap().items[1].activity, "Temple");

        assert!(itinerary.remove_item(0, 5).is_err());
        assert_eq!(itinerary.remove_item(0, 0).unwrap().activity, "Udon");
    }

    #[test]
    fn divider_lookup() {
        let mut itinerary = Itinerary::plan(&config("2025-03-30", 1)).unwrap();
        itinerary
            .add_item(0, DayItem::new("09:00", ItemKind::Spot, "Temple", ""))
            .unwrap();
        itinerary.insert_country_divider(0, 0, "Japan", "JP").unwrap();
        itinerary
            .add_item(0, DayItem::new("18:00", ItemKind::Food, "Izakaya", ""))
            .unwrap();

        let divider = itinerary.country_divider_above(0, 2).unwrap().unwrap();
        assert_eq!(divider.country_code.as_deref(), Some("JP"));
        assert!(itinerary.country_divider_above(0, 0).unwrap().is_none());
    }

    #[test]
    fn item_kind_uses_type_field() {
        let item = DayItem::new("10:00", ItemKind::Transport, "Shinkansen", "Kyoto");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "transport");
        assert!(json.get("country").is_none());
    }

    #[test]
    fn blank_title_has_placeholder() {
        let mut c = config("2025-03-30", 1);
        c.title = "  ".to_string();
        assert_eq!(c.display_title(), DEFAULT_TRIP_TITLE);
    }
}
