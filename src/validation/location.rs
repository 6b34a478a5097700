use garde::Validate;
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::error::{AppError, Result};

/// The request payload for a location ping.
///
/// Coordinates may arrive as JSON numbers or as numeric strings.
#[derive(Deserialize, Validate, Debug)]
pub struct LocationPingRequest {
    #[serde(default, deserialize_with = "coordinate")]
    #[garde(required, range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "coordinate")]
    #[garde(required, range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCoordinate {
    Number(f64),
    Text(String),
}

fn coordinate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawCoordinate>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawCoordinate::Number(value)) => value,
        Some(RawCoordinate::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("'{text}' is not a number")))?,
    };

    if !value.is_finite() {
        return Err(D::Error::custom("coordinate must be a finite number"));
    }
    Ok(Some(value))
}

/// Validates a location ping.
///
/// # Arguments
///
/// * `request` - The decoded request body.
///
/// # Returns
///
/// A `Result` containing the `(lat, lng)` pair.
pub fn validate_location_ping(request: &LocationPingRequest) -> Result<(f64, f64)> {
    request
        .validate()
        .map_err(|report| AppError::Validation(report.to_string().trim().to_string()))?;

    match (request.lat, request.lng) {
        (Some(lat), Some(lng)) => Ok((lat, lng)),
        _ => Err(AppError::Validation("lat and lng are required".to_string())),
    }
}
