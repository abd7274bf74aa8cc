use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Hotels,
    HotelRooms,
    Tours,
    Guides,
    Events,
    Content,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 6] = [
        CatalogKind::Hotels,
        CatalogKind::HotelRooms,
        CatalogKind::Tours,
        CatalogKind::Guides,
        CatalogKind::Events,
        CatalogKind::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Hotels => "hotels",
            CatalogKind::HotelRooms => "hotel_rooms",
            CatalogKind::Tours => "tours",
            CatalogKind::Guides => "guides",
            CatalogKind::Events => "events",
            CatalogKind::Content => "content",
        }
    }

    /// Accepts both `hotel_rooms` and the URL-friendly `hotel-rooms`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.replace('-', "_").as_str() {
            "hotels" => Some(CatalogKind::Hotels),
            "hotel_rooms" => Some(CatalogKind::HotelRooms),
            "tours" => Some(CatalogKind::Tours),
            "guides" => Some(CatalogKind::Guides),
            "events" => Some(CatalogKind::Events),
            "content" => Some(CatalogKind::Content),
            _ => None,
        }
    }

    /// Check a payload against this kind's schema and return it in
    /// canonical form.
    pub fn normalize(&self, payload: serde_json::Value) -> Result<serde_json::Value, String> {
        match self {
            CatalogKind::Hotels => normalize_as::<Hotel>(payload),
            CatalogKind::HotelRooms => normalize_as::<HotelRoom>(payload),
            CatalogKind::Tours => normalize_as::<Tour>(payload),
            CatalogKind::Guides => normalize_as::<Guide>(payload),
            CatalogKind::Events => normalize_as::<Event>(payload),
            CatalogKind::Content => normalize_as::<ContentItem>(payload),
        }
    }
}

/// A stored catalog row. `data` holds the kind-specific fields.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: CatalogKind,
    #[serde(flatten)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CatalogEntry {
    pub fn decode<T: CatalogRecord>(&self) -> anyhow::Result<T> {
        let record = serde_json::from_value(serde_json::Value::Object(self.data.clone()))?;
        Ok(record)
    }
}

pub trait CatalogRecord: Serialize + DeserializeOwned {
    fn check(&self) -> Result<(), String>;
}

fn normalize_as<T: CatalogRecord>(payload: serde_json::Value) -> Result<serde_json::Value, String> {
    let mut payload = payload;
    if let Some(obj) = payload.as_object_mut() {
        // Identity and timestamps are owned by the store.
        for key in ["id", "kind", "created_at", "updated_at"] {
            obj.remove(key);
        }
    }
    let record: T = serde_json::from_value(payload).map_err(|e| e.to_string())?;
    record.check()?;
    serde_json::to_value(&record).map_err(|e| e.to_string())
}

fn non_blank(value: &str, field: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

fn non_negative(value: Decimal, field: &str) -> Result<(), String> {
    if value < Decimal::ZERO {
        return Err(format!("{field} must not be negative"));
    }
    Ok(())
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hotel {
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub star_rating: Option<u8>,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub image_url: Option<String>,
}

impl CatalogRecord for Hotel {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        non_blank(&self.location, "location")?;
        if let Some(stars) = self.star_rating {
            if !(1..=5).contains(&stars) {
                return Err("star_rating must be between 1 and 5".to_string());
            }
        }
        Ok(())
    }
}

fn default_room_guests() -> i64 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelRoom {
    pub hotel_id: Option<String>,
    pub room_type: String,
    pub price_per_night: Decimal,
    #[serde(default = "default_room_guests")]
    pub max_guests: i64,
    pub description: Option<String>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default = "yes")]
    pub available: bool,
    pub image_url: Option<String>,
}

impl CatalogRecord for HotelRoom {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.room_type, "room_type")?;
        non_negative(self.price_per_night, "price_per_night")?;
        if self.max_guests < 1 {
            return Err("max_guests must be at least 1".to_string());
        }
        Ok(())
    }
}

fn default_tour_guests() -> i64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tour {
    pub name: String,
    pub location: String,
    pub duration: String,
    pub price: Decimal,
    #[serde(default = "default_tour_guests")]
    pub max_guests: i64,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    pub image_url: Option<String>,
}

impl CatalogRecord for Tour {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        non_blank(&self.location, "location")?;
        non_blank(&self.duration, "duration")?;
        non_negative(self.price, "price")?;
        if self.max_guests < 1 {
            return Err("max_guests must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guide {
    pub name: String,
    pub specialization: String,
    pub hourly_rate: Decimal,
    #[serde(default)]
    pub languages: Vec<String>,
    pub experience_years: Option<u32>,
    pub rating: Option<Decimal>,
    #[serde(default = "yes")]
    pub available: bool,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
}

impl CatalogRecord for Guide {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.name, "name")?;
        non_blank(&self.specialization, "specialization")?;
        non_negative(self.hourly_rate, "hourly_rate")?;
        if let Some(rating) = self.rating {
            if rating < Decimal::ZERO || rating > Decimal::new(5, 0) {
                return Err("rating must be between 0 and 5".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub event_date: String,
    pub location: Option<String>,
    pub event_type: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
}

impl CatalogRecord for Event {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.title, "title")?;
        chrono::NaiveDate::parse_from_str(&self.event_date, "%Y-%m-%d")
            .map_err(|_| "event_date must be a date in YYYY-MM-DD format".to_string())?;
        if let Some(price) = self.price {
            non_negative(price, "price")?;
        }
        Ok(())
    }
}

fn default_content_type() -> String {
    "article".to_string()
}

fn default_content_status() -> String {
    "draft".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_content_status")]
    pub status: String,
    pub featured_image: Option<String>,
    pub author_id: Option<String>,
}

impl CatalogRecord for ContentItem {
    fn check(&self) -> Result<(), String> {
        non_blank(&self.title, "title")?;
        match self.status.as_str() {
            "draft" | "published" | "archived" => Ok(()),
            other => Err(format!("unknown content status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_accepts_dashes() {
        assert_eq!(CatalogKind::parse("hotel-rooms"), Some(CatalogKind::HotelRooms));
        assert_eq!(CatalogKind::parse("hotel_rooms"), Some(CatalogKind::HotelRooms));
        assert_eq!(CatalogKind::parse("bookings"), None);
    }

    #[test]
    fn test_normalize_fills_defaults_and_strips_identity() {
        let value = CatalogKind::Tours
            .normalize(json!({
                "id": "spoofed",
                "name": "Golden Monkey Tracking",
                "location": "Volcanoes National Park",
                "duration": "Half Day (4-5 hours)",
                "price": 100
            }))
            .unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["max_guests"], 10);
        assert_eq!(value["name"], "Golden Monkey Tracking");
    }

    #[test]
    fn test_normalize_rejects_invalid_records() {
        assert!(CatalogKind::Hotels
            .normalize(json!({"name": "Lodge", "location": "Kinigi", "star_rating": 7}))
            .is_err());
        assert!(CatalogKind::HotelRooms
            .normalize(json!({"room_type": "Suite", "price_per_night": -5}))
            .is_err());
        assert!(CatalogKind::Events
            .normalize(json!({"title": "Kwita Izina", "event_date": "September"}))
            .is_err());
        assert!(CatalogKind::Content
            .normalize(json!({"title": "Guide", "content": "...", "status": "secret"}))
            .is_err());
        assert!(CatalogKind::Guides.normalize(json!({"name": "Eric"})).is_err());
    }

    #[test]
    fn test_content_type_field_name() {
        let value = CatalogKind::Content
            .normalize(json!({"title": "Packing list", "content": "Boots", "type": "tip"}))
            .unwrap();
        assert_eq!(value["type"], "tip");
        assert_eq!(value["status"], "draft");
    }
}
