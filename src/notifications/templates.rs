pub struct NotificationTemplates;

impl NotificationTemplates {
    /// Text shown to recipients, naming who raised the alert.
    pub fn sos_message(message: &str, sender_name: &str) -> String {
        format!("{} (initiated by {})", message, sender_name)
    }

    /// Push body carrying the alert context lines.
    pub fn sos_body(message: &str, battery: i32, location: &str, emergency_type: &str) -> String {
        format!(
            "{}\nBattery: {}%\nLocation: {}\nEmergency Type: {}",
            message, battery, location, emergency_type
        )
    }

    pub fn sos_confirmation(circle_names: &[String]) -> String {
        format!("Your SOS has been sent to {}", circle_names.join(", "))
    }

    pub fn acknowledgment(contact_name: &str, phone_number: &str) -> String {
        format!(
            "{} ({}) has acknowledged your SOS. Try to contact them!",
            contact_name, phone_number
        )
    }

    pub fn severe_weather(condition: &str) -> String {
        format!(
            "Severe weather alert: {}. Please take precautions.",
            condition
        )
    }
}
