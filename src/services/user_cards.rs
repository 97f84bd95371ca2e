use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use handlebars::Handlebars;
use qrcode::{render::svg, QrCode};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::entities::{user_card, UserCard};
use crate::error::AppError;

const CARD_PAGE: &str = r#"<html>
<head>
    <title>User Information</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 20px; padding: 0; }
        h1 { color: #333; text-align: center; }
        .container { max-width: 600px; margin: auto; }
        .info { margin: 10px 0; }
        .note { margin-top: 30px; padding: 15px; background-color: #f8f9fa; border: 1px solid #e1e1e1; border-radius: 8px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>User Information</h1>
        <div class="info"><strong>Full Name:</strong> {{fullName}}</div>
        <div class="info"><strong>Age:</strong> {{age}}</div>
        <div class="info"><strong>Blood Group:</strong> {{bloodGroup}}</div>
        <div class="info"><strong>Medicines:</strong> {{medicines}}</div>
        <div class="info"><strong>Diseases:</strong> {{disease}}</div>
        <div class="info"><strong>Allergies:</strong> {{allergies}}</div>
        <div class="info"><strong>Emergency Numbers:</strong> {{emergencyNumbers}}</div>
        <div class="info"><strong>Address:</strong> {{address}}</div>
        <div class="info"><strong>Insurance Details:</strong> {{insuranceDetails}}</div>
        <div class="info"><strong>Preferred Hospital:</strong> {{preferredHospital}}</div>
        <div class="info"><strong>Emergency Instructions:</strong> {{emergencyInstructions}}</div>
        <div class="note">
            <p><strong>Note:</strong> This information has been shared to help in case of an emergency. If you found this person's phone or they need assistance, please contact their emergency numbers listed above.</p>
            <p style="text-align: center; font-weight: bold;">Thank you for your help and support!<br><i>EAS Help is HERE</i></p>
        </div>
    </div>
</body>
</html>
"#;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub medicines: Vec<String>,
    #[serde(default)]
    pub disease: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    pub emergency_number1: Option<String>,
    pub emergency_number2: Option<String>,
    pub address: Option<String>,
    pub insurance_details: Option<String>,
    pub preferred_hospital: Option<String>,
    pub emergency_instructions: Option<String>,
}

/// The medical summary exactly as served back to clients.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub full_name: String,
    pub age: i32,
    pub blood_group: String,
    pub medicines: Vec<String>,
    pub disease: Vec<String>,
    pub emergency_numbers: Vec<String>,
    pub address: String,
    pub allergies: Vec<String>,
    pub insurance_details: String,
    pub preferred_hospital: String,
    pub emergency_instructions: String,
}

impl CardRequest {
    fn into_details(self) -> Result<CardDetails, AppError> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::bad_request(format!("{field} is required.")))
        };

        let full_name = required(self.full_name, "fullName")?;
        let blood_group = required(self.blood_group, "bloodGroup")?;
        let primary_number = required(self.emergency_number1, "emergencyNumber1")?;
        let age = self
            .age
            .filter(|a| (0..=150).contains(a))
            .ok_or_else(|| AppError::bad_request("age is required."))?;

        let mut emergency_numbers = vec![primary_number];
        if let Some(second) = self.emergency_number2.filter(|n| !n.trim().is_empty()) {
            emergency_numbers.push(second);
        }

        Ok(CardDetails {
            full_name,
            age,
            blood_group,
            medicines: self.medicines,
            disease: self.disease,
            emergency_numbers,
            address: self.address.unwrap_or_default(),
            allergies: self.allergies,
            insurance_details: self.insurance_details.unwrap_or_default(),
            preferred_hospital: self.preferred_hospital.unwrap_or_default(),
            emergency_instructions: self.emergency_instructions.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayload {
    pub qr_code_details: Value,
    pub qr_code_image: String,
}

impl From<user_card::Model> for CardPayload {
    fn from(card: user_card::Model) -> Self {
        Self {
            qr_code_details: card.qr_code_details,
            qr_code_image: card.qr_code_image,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Upserted {
    pub message: String,
    pub qr_code_image: String,
    #[serde(skip)]
    pub created: bool,
}

pub fn card_url(public_base_url: &str, uid: &str) -> String {
    format!("{}/api/getUserCardData/{}", public_base_url.trim_end_matches('/'), uid)
}

/// Renders `data` as an SVG QR code wrapped in a base64 data URL.
pub fn qr_data_url(data: &str) -> Result<String, AppError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| AppError::Internal(e.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build();
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
}

/// Creates the card on first call; later calls replace the details and
/// keep the originally generated image.
pub async fn upsert(
    db: &DatabaseConnection,
    public_base_url: &str,
    uid: &str,
    req: CardRequest,
) -> Result<Upserted, AppError> {
    let details = req.into_details()?;
    let details_json = serde_json::to_value(&details).map_err(|e| AppError::Internal(e.to_string()))?;
    let now = Utc::now();

    let existing = UserCard::find_by_id(uid.to_string()).one(db).await?;
    let created = existing.is_none();

    let card = match existing {
        Some(card) => {
            let mut active: user_card::ActiveModel = card.into();
            apply_details(&mut active, &details, details_json);
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            let image = qr_data_url(&card_url(public_base_url, uid))?;
            let mut active = user_card::ActiveModel {
                uid: Set(uid.to_string()),
                qr_code_image: Set(image),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            apply_details(&mut active, &details, details_json);
            active.insert(db).await?
        }
    };

    info!(
        "{} medical card for {}",
        if created { "Created" } else { "Updated" },
        uid
    );
    Ok(Upserted {
        message: if created {
            "QR code created successfully".to_string()
        } else {
            "QR code details updated successfully".to_string()
        },
        qr_code_image: card.qr_code_image,
        created,
    })
}

fn apply_details(active: &mut user_card::ActiveModel, details: &CardDetails, details_json: Value) {
    active.full_name = Set(details.full_name.clone());
    active.age = Set(details.age);
    active.blood_group = Set(details.blood_group.clone());
    active.medicines = Set(json!(details.medicines));
    active.disease = Set(json!(details.disease));
    active.allergies = Set(json!(details.allergies));
    active.emergency_numbers = Set(json!(details.emergency_numbers));
    active.address = Set(details.address.clone());
    active.emergency_instructions = Set(details.emergency_instructions.clone());
    active.qr_code_details = Set(details_json);
}

pub async fn fetch(db: &DatabaseConnection, uid: &str) -> Result<user_card::Model, AppError> {
    UserCard::find_by_id(uid.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("No QR code found for this user"))
}

pub async fn delete(db: &DatabaseConnection, uid: &str) -> Result<(), AppError> {
    let deleted = UserCard::delete_by_id(uid.to_string()).exec(db).await?;
    if deleted.rows_affected == 0 {
        return Err(AppError::not_found("No QR code found for this user"));
    }
    info!("Deleted medical card for {}", uid);
    Ok(())
}

fn joined_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None".to_string()
    } else {
        values.join(", ")
    }
}

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "None"
    } else {
        value
    }
}

/// Public page shown to whoever scans the code. Values are HTML-escaped.
pub fn render_card_page(card: &user_card::Model) -> Result<String, AppError> {
    let details: CardDetails = serde_json::from_value(card.qr_code_details.clone()).unwrap_or_else(|_| CardDetails {
        full_name: card.full_name.clone(),
        age: card.age,
        blood_group: card.blood_group.clone(),
        address: card.address.clone(),
        emergency_instructions: card.emergency_instructions.clone(),
        ..Default::default()
    });

    let view = json!({
        "fullName": details.full_name,
        "age": details.age,
        "bloodGroup": details.blood_group,
        "medicines": joined_or_none(&details.medicines),
        "disease": joined_or_none(&details.disease),
        "allergies": joined_or_none(&details.allergies),
        "emergencyNumbers": details.emergency_numbers.join(", "),
        "address": details.address,
        "insuranceDetails": or_none(&details.insurance_details),
        "preferredHospital": or_none(&details.preferred_hospital),
        "emergencyInstructions": or_none(&details.emergency_instructions),
    });

    Handlebars::new()
        .render_template(CARD_PAGE, &view)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// JSON only when the client asks for it; browsers and scanners get HTML.
pub fn wants_json(accept: Option<&str>) -> bool {
    accept
        .map(|header| {
            header
                .split(',')
                .filter_map(|part| part.trim().parse::<mime::Mime>().ok())
                .any(|m| m.type_() == mime::APPLICATION && m.subtype() == mime::JSON)
        })
        .unwrap_or(false)
}
