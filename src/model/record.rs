use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse classification of a fetched place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    Restaurant,
    FoodTruck,
}

impl Default for BusinessType {
    fn default() -> Self {
        BusinessType::Restaurant
    }
}

/// A successfully fetched place record
///
/// `place_id` is the primary identity when present; `name` and `address`
/// feed the fallback hash in the dedup index. All descriptive fields are
/// optional so partially extracted records still persist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub business_type: BusinessType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine_type: Option<String>,

    #[serde(default)]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_of_operation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_photo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl EntityRecord {
    /// Creates a record with just the identity-bearing fields set
    pub fn with_identity(
        place_id: Option<&str>,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            place_id: place_id.map(str::to_string),
            name: name.into(),
            address: address.into(),
            ..Self::default()
        }
    }

    /// True when this record describes a food truck
    pub fn is_food_truck(&self) -> bool {
        self.business_type == BusinessType::FoodTruck
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_identity_sets_only_identity_fields() {
        let r = EntityRecord::with_identity(Some("0xab:0xcd"), "Luigi's", "1 Main St");
        assert_eq!(r.place_id.as_deref(), Some("0xab:0xcd"));
        assert_eq!(r.name, "Luigi's");
        assert_eq!(r.address, "1 Main St");
        assert_eq!(r.rating, None);
        assert_eq!(r.business_type, BusinessType::Restaurant);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut r = EntityRecord::with_identity(None, "Taco Cart", "5th Ave");
        r.business_type = BusinessType::FoodTruck;
        r.rating = Some(4.5);
        let json = serde_json::to_string(&r).unwrap();
        let back: EntityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
        assert!(back.is_food_truck());
    }

    #[test]
    fn test_deserialize_sparse_record() {
        // Records written by older runs may carry only a handful of fields.
        let back: EntityRecord = serde_json::from_str(r#"{"name":"X"}"#).unwrap();
        assert_eq!(back.name, "X");
        assert_eq!(back.place_id, None);
        assert_eq!(back.business_type, BusinessType::Restaurant);
    }

    #[test]
    fn test_business_type_serializes_snake_case() {
        let json = serde_json::to_string(&BusinessType::FoodTruck).unwrap();
        assert_eq!(json, "\"food_truck\"");
    }
}
