//! Village domain model.
//!
//! # Responsibility
//! - Define the canonical village record shared by store, cache and consumers.
//! - Define create/patch input shapes and their normalization rules.
//!
//! # Invariants
//! - `id` is unique within one full record set.
//! - Numeric fields stay strings; parsing is a consumer concern.
//! - `demographics` stays `None` until explicitly set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Placeholder image reference used when a record has no image.
pub const DEFAULT_IMAGE: &str = "default.jpg";

static TAG_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*,\s*").expect("valid tag separator regex"));

/// Store-assigned integer identifier.
pub type VillageId = i64;

/// Optional nested demographic data for one village.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    /// Numeric string; parsed by chart/map consumers.
    #[serde(default, deserialize_with = "string_or_number")]
    pub population_size: String,
    #[serde(default)]
    pub age_distribution: String,
    #[serde(default)]
    pub gender_ratios: String,
    #[serde(default)]
    pub population_growth: String,
}

impl Demographics {
    /// Applies present patch fields, leaving the others untouched.
    pub fn merge(&mut self, patch: &DemographicsPatch) {
        if let Some(value) = patch.population_size.as_ref() {
            self.population_size = value.trim().to_string();
        }
        if let Some(value) = patch.age_distribution.as_ref() {
            self.age_distribution = value.clone();
        }
        if let Some(value) = patch.gender_ratios.as_ref() {
            self.gender_ratios = value.clone();
        }
        if let Some(value) = patch.population_growth.as_ref() {
            self.population_growth = value.clone();
        }
    }
}

/// Canonical village record.
///
/// Serialized with camelCase keys to match the JSON fixture and the cache
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Village {
    pub id: VillageId,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub land_area: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub latitude: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub longitude: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<Demographics>,
}

impl Village {
    /// Checks the fields every stored record must carry.
    ///
    /// # Errors
    /// - `MissingField` when `name`, `region`, `landArea`, `latitude` or
    ///   `longitude` is blank.
    pub fn validate(&self) -> Result<(), VillageValidationError> {
        require("name", &self.name)?;
        require("region", &self.region)?;
        require("landArea", &self.land_area)?;
        require("latitude", &self.latitude)?;
        require("longitude", &self.longitude)?;
        Ok(())
    }

    /// Returns whether the village carries `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|value| value.eq_ignore_ascii_case(tag))
    }

    /// Applies a patch using top-level merge semantics.
    ///
    /// Only fields present in `patch` replace current values. Demographics
    /// are merged field by field and created when absent.
    pub fn apply_patch(&mut self, patch: &VillagePatch) {
        if let Some(value) = patch.name.as_ref() {
            self.name = value.trim().to_string();
        }
        if let Some(value) = patch.region.as_ref() {
            self.region = value.trim().to_string();
        }
        if let Some(value) = patch.land_area.as_ref() {
            self.land_area = value.trim().to_string();
        }
        if let Some(value) = patch.latitude.as_ref() {
            self.latitude = value.trim().to_string();
        }
        if let Some(value) = patch.longitude.as_ref() {
            self.longitude = value.trim().to_string();
        }
        if let Some(tags) = patch.tags.as_ref() {
            self.tags = normalize_tags(tags);
        }
        if let Some(image) = patch.image.as_ref() {
            self.image = normalize_image(Some(image.as_str()));
        }
        if let Some(demographics) = patch.demographics.as_ref() {
            self.demographics
                .get_or_insert_with(Demographics::default)
                .merge(demographics);
        }
    }
}

/// Create-form input for a new village.
///
/// `tags` is the raw comma-separated form value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VillageDraft {
    pub name: String,
    pub region: String,
    pub land_area: String,
    pub latitude: String,
    pub longitude: String,
    pub tags: String,
    pub image: Option<String>,
}

impl VillageDraft {
    /// Builds a validated record under the given id.
    ///
    /// # Errors
    /// - Returns `MissingField` for any blank required field.
    pub fn into_village(self, id: VillageId) -> Result<Village, VillageValidationError> {
        let village = Village {
            id,
            name: self.name.trim().to_string(),
            region: self.region.trim().to_string(),
            land_area: self.land_area.trim().to_string(),
            latitude: self.latitude.trim().to_string(),
            longitude: self.longitude.trim().to_string(),
            tags: split_tags(&self.tags),
            image: normalize_image(self.image.as_deref()),
            demographics: None,
        };
        village.validate()?;
        Ok(village)
    }
}

/// Partial update for one village. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VillagePatch {
    pub name: Option<String>,
    pub region: Option<String>,
    pub land_area: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image: Option<String>,
    pub demographics: Option<DemographicsPatch>,
}

impl VillagePatch {
    /// Builds a patch that replaces every top-level field of a record.
    pub fn replace_with(village: &Village) -> Self {
        Self {
            name: Some(village.name.clone()),
            region: Some(village.region.clone()),
            land_area: Some(village.land_area.clone()),
            latitude: Some(village.latitude.clone()),
            longitude: Some(village.longitude.clone()),
            tags: Some(village.tags.clone()),
            image: Some(village.image.clone()),
            demographics: village.demographics.as_ref().map(DemographicsPatch::from),
        }
    }
}

/// Partial update for demographics. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemographicsPatch {
    pub population_size: Option<String>,
    pub age_distribution: Option<String>,
    pub gender_ratios: Option<String>,
    pub population_growth: Option<String>,
}

impl From<&Demographics> for DemographicsPatch {
    fn from(value: &Demographics) -> Self {
        Self {
            population_size: Some(value.population_size.clone()),
            age_distribution: Some(value.age_distribution.clone()),
            gender_ratios: Some(value.gender_ratios.clone()),
            population_growth: Some(value.population_growth.clone()),
        }
    }
}

/// Validation errors for village write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VillageValidationError {
    /// Required field is empty or whitespace only.
    MissingField(&'static str),
}

impl Display for VillageValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is missing"),
        }
    }
}

impl Error for VillageValidationError {}

/// Splits a comma-separated tag string into trimmed, non-empty tags.
///
/// Order is preserved and duplicates are kept.
pub fn split_tags(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    TAG_SEPARATOR_RE
        .split(trimmed)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trims tags and drops blank entries, preserving order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_image(image: Option<&str>) -> String {
    match image.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_IMAGE.to_string(),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), VillageValidationError> {
    if value.trim().is_empty() {
        return Err(VillageValidationError::MissingField(field));
    }
    Ok(())
}

fn default_image() -> String {
    DEFAULT_IMAGE.to_string()
}

/// Accepts `"12.5"`, `12.5` or `null` and keeps the decimal string form.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    match Scalar::deserialize(deserializer) {
        Ok(Scalar::Text(value)) => Ok(value),
        Ok(Scalar::Number(value)) => Ok(value.to_string()),
        Ok(Scalar::Null(())) => Ok(String::new()),
        Err(_) => Err(de::Error::custom("expected a string or number")),
    }
}

#[cfg(test)]
mod tests {
    use super::{split_tags, Village, VillageDraft, VillageValidationError, DEFAULT_IMAGE};

    #[test]
    fn split_tags_trims_and_drops_blanks() {
        assert_eq!(split_tags(" a , b,,c "), vec!["a", "b", "c"]);
        assert!(split_tags("   ").is_empty());
    }

    #[test]
    fn draft_defaults_image_and_reports_first_missing_field() {
        let draft = VillageDraft {
            name: "X".to_string(),
            region: "Y".to_string(),
            land_area: "1.2".to_string(),
            latitude: "31.5".to_string(),
            longitude: "34.8".to_string(),
            ..VillageDraft::default()
        };
        let village = draft.clone().into_village(3).expect("draft should be valid");
        assert_eq!(village.image, DEFAULT_IMAGE);

        let missing = VillageDraft {
            region: String::new(),
            ..draft
        };
        assert_eq!(
            missing.into_village(0).unwrap_err(),
            VillageValidationError::MissingField("region")
        );
    }

    #[test]
    fn decodes_numeric_fields_from_json_numbers() {
        let village: Village = serde_json::from_str(
            r#"{"id":4,"name":"Nablus","region":"North","landArea":28.5,"latitude":32.22,"longitude":"35.26","demographics":{"populationSize":150000}}"#,
        )
        .expect("village should decode");
        assert_eq!(village.land_area, "28.5");
        assert_eq!(village.latitude, "32.22");
        assert_eq!(village.image, DEFAULT_IMAGE);
        assert!(village.tags.is_empty());
        assert_eq!(
            village.demographics.expect("demographics").population_size,
            "150000"
        );
    }
}
