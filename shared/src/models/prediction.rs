//! Prediction request models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Earliest year the model accepts
pub const MIN_YEAR: i32 = 2020;

/// Latest year the model accepts
pub const MAX_YEAR: i32 = 2030;

/// Canonical request fields
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Location,
    CropName,
    Year,
    Nitrogen,
    Phosphorus,
    Potassium,
    SoilPh,
    Humidity,
    NdviAvg,
    OrganicMatter,
    AvgTemp,
    RainfallMm,
    PesticideTonnes,
}

impl Field {
    /// Every canonical field, in request order
    pub const ALL: [Field; 13] = [
        Field::Location,
        Field::CropName,
        Field::Year,
        Field::Nitrogen,
        Field::Phosphorus,
        Field::Potassium,
        Field::SoilPh,
        Field::Humidity,
        Field::NdviAvg,
        Field::OrganicMatter,
        Field::AvgTemp,
        Field::RainfallMm,
        Field::PesticideTonnes,
    ];

    /// The optional numeric overrides
    pub const OVERRIDES: [Field; 10] = [
        Field::Nitrogen,
        Field::Phosphorus,
        Field::Potassium,
        Field::SoilPh,
        Field::Humidity,
        Field::NdviAvg,
        Field::OrganicMatter,
        Field::AvgTemp,
        Field::RainfallMm,
        Field::PesticideTonnes,
    ];

    /// Wire name used in the canonical request body
    pub fn name(&self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::CropName => "crop_name",
            Field::Year => "year",
            Field::Nitrogen => "nitrogen",
            Field::Phosphorus => "phosphorus",
            Field::Potassium => "potassium",
            Field::SoilPh => "soil_ph",
            Field::Humidity => "humidity",
            Field::NdviAvg => "ndvi_avg",
            Field::OrganicMatter => "organic_matter",
            Field::AvgTemp => "avg_temp",
            Field::RainfallMm => "rainfall_mm",
            Field::PesticideTonnes => "pesticide_tonnes",
        }
    }

    /// Label used in inline form messages
    pub fn label(&self) -> &'static str {
        match self {
            Field::Location => "Location",
            Field::CropName => "Crop",
            Field::Year => "Year",
            Field::Nitrogen => "Nitrogen",
            Field::Phosphorus => "Phosphorus",
            Field::Potassium => "Potassium",
            Field::SoilPh => "Soil pH",
            Field::Humidity => "Humidity",
            Field::NdviAvg => "NDVI average",
            Field::OrganicMatter => "Organic matter",
            Field::AvgTemp => "Average temperature",
            Field::RainfallMm => "Rainfall",
            Field::PesticideTonnes => "Pesticides",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional agronomic measurements.
///
/// `None` means "let the backend apply its regional default"; it is omitted
/// from the request body rather than sent as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgronomicOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitrogen: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phosphorus: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potassium: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndvi_avg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_matter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pesticide_tonnes: Option<f64>,
}

impl AgronomicOverrides {
    /// Set an override by field. Non-override fields are ignored.
    pub fn set(&mut self, field: Field, value: f64) {
        let slot = match field {
            Field::Nitrogen => &mut self.nitrogen,
            Field::Phosphorus => &mut self.phosphorus,
            Field::Potassium => &mut self.potassium,
            Field::SoilPh => &mut self.soil_ph,
            Field::Humidity => &mut self.humidity,
            Field::NdviAvg => &mut self.ndvi_avg,
            Field::OrganicMatter => &mut self.organic_matter,
            Field::AvgTemp => &mut self.avg_temp,
            Field::RainfallMm => &mut self.rainfall_mm,
            Field::PesticideTonnes => &mut self.pesticide_tonnes,
            Field::Location | Field::CropName | Field::Year => return,
        };
        *slot = Some(value);
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Nitrogen => self.nitrogen,
            Field::Phosphorus => self.phosphorus,
            Field::Potassium => self.potassium,
            Field::SoilPh => self.soil_ph,
            Field::Humidity => self.humidity,
            Field::NdviAvg => self.ndvi_avg,
            Field::OrganicMatter => self.organic_matter,
            Field::AvgTemp => self.avg_temp,
            Field::RainfallMm => self.rainfall_mm,
            Field::PesticideTonnes => self.pesticide_tonnes,
            Field::Location | Field::CropName | Field::Year => None,
        }
    }
}

/// Canonical request for `/predict/farmer-friendly`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    #[validate(length(min = 1, message = "Crop is required"))]
    pub crop_name: String,
    #[validate(range(min = 2020, max = 2030, message = "Year must be between 2020 and 2030"))]
    pub year: i32,
    #[serde(flatten)]
    pub overrides: AgronomicOverrides,
}

/// Request body for the legacy `/predict/` and `/predict/batch` endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPredictionRequest {
    pub area_name: String,
    pub crop_name: String,
    pub year: i32,
    pub avg_temp: f64,
    pub rainfall_mm: f64,
    pub pesticide_tonnes: f64,
}

impl TryFrom<&PredictionRequest> for LegacyPredictionRequest {
    type Error = crate::validation::InvalidInput;

    fn try_from(request: &PredictionRequest) -> Result<Self, Self::Error> {
        let o = &request.overrides;
        match (o.avg_temp, o.rainfall_mm, o.pesticide_tonnes) {
            (Some(avg_temp), Some(rainfall_mm), Some(pesticide_tonnes)) => Ok(Self {
                area_name: request.location.clone(),
                crop_name: request.crop_name.clone(),
                year: request.year,
                avg_temp,
                rainfall_mm,
                pesticide_tonnes,
            }),
            _ => {
                let missing = [Field::AvgTemp, Field::RainfallMm, Field::PesticideTonnes]
                    .into_iter()
                    .filter(|f| o.get(*f).is_none())
                    .collect();
                Err(crate::validation::InvalidInput::MissingFields { missing })
            }
        }
    }
}
