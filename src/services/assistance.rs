use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::AppError;
use crate::gemini::GeminiClient;
use crate::notifications::{NotificationGateway, NotificationTemplates, PushMessage};
use crate::places::{self, NearbyService, PlacesClient};
use crate::weather::{self, WeatherClient};

const NEARBY_LIMIT: usize = 3;
const TRAFFIC_ADVISORY: &str = "Adverse weather conditions may impact traffic in your area.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub expo_push_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub success: bool,
    pub weather: Value,
    pub severe_weather_alert: bool,
    pub traffic_alert: Option<String>,
}

/// Current forecast; a severe condition also pushes an alert to the caller's device.
pub async fn weather_updates(
    weather: &WeatherClient,
    notifier: &NotificationGateway,
    query: WeatherQuery,
) -> Result<WeatherReport, AppError> {
    let (Some(lat), Some(lon), Some(token)) = (query.lat, query.lon, query.expo_push_token) else {
        return Err(AppError::bad_request(
            "Latitude, longitude, and Expo push token are required.",
        ));
    };

    let forecast = weather.forecast(lat, lon).await?;
    let condition = weather::current_condition(&forecast).to_string();
    let severe = weather::is_severe(&condition);

    if severe {
        let alert = NotificationTemplates::severe_weather(&condition);
        let location = format!("{}, {}", lat, lon);
        info!("Severe weather ({}) at {}; alerting device", condition, location);
        notifier
            .deliver_one(PushMessage::new(
                token,
                NotificationTemplates::sos_body(&alert, 100, &location, &condition),
                json!({
                    "message": alert,
                    "location": location,
                    "emergencyType": condition,
                    "acknowledge": true,
                }),
            ))
            .await;
    }

    Ok(WeatherReport {
        success: true,
        weather: forecast,
        severe_weather_alert: severe,
        traffic_alert: severe.then(|| TRAFFIC_ADVISORY.to_string()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub emergency_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    pub emergency_type: String,
    pub location: Coordinates,
    pub message: String,
    pub generated_response: String,
    pub nearby_services: Vec<NearbyService>,
}

/// Generated first-response guidance plus a few nearby services. A failing
/// places lookup leaves the service list empty.
pub async fn emergency_guidance(
    gemini: &GeminiClient,
    places: Option<&PlacesClient>,
    req: HelpRequest,
) -> Result<Guidance, AppError> {
    let emergency_type = req.emergency_type.filter(|t| !t.trim().is_empty());
    let message = req.message.filter(|m| !m.trim().is_empty());
    let (Some(emergency_type), Some(latitude), Some(longitude), Some(message)) =
        (emergency_type, req.latitude, req.longitude, message)
    else {
        return Err(AppError::bad_request(
            "All fields (emergencyType, latitude, longitude, message) are required.",
        ));
    };

    let generated_response = gemini
        .emergency_guidance(&emergency_type, latitude, longitude, &message)
        .await?;

    let nearby_services = match places {
        Some(client) => client
            .nearby(latitude, longitude, places::search_keyword(&emergency_type), NEARBY_LIMIT)
            .await
            .unwrap_or_else(|e| {
                warn!("Nearby services lookup failed: {}", e);
                Vec::new()
            }),
        None => Vec::new(),
    };

    Ok(Guidance {
        emergency_type,
        location: Coordinates { latitude, longitude },
        message,
        generated_response,
        nearby_services,
    })
}
