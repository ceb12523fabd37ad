use serde::{Deserialize, Serialize};

use crate::models::appointment::normalize;

/// One structured command pulled out of the assistant's free text.
/// `action` stays as raw text so unrecognized actions pass through for the
/// caller to ignore instead of failing extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPayload {
    pub action: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SavePatient,
    QueryDayAvailability,
    QueryRangeAvailability,
    CreateAppointment,
    Unrecognized,
}

impl ActionPayload {
    pub fn kind(&self) -> Action {
        match normalize(&self.action).as_str() {
            "guardar_paciente" => Action::SavePatient,
            "consultar_disponibilidad" => Action::QueryDayAvailability,
            "consultar_disponibilidad_rango" => Action::QueryRangeAvailability,
            "crear_cita" => Action::CreateAppointment,
            _ => Action::Unrecognized,
        }
    }
}

fn default_tipo() -> String {
    "Control presencial".to_string()
}

fn default_dias() -> i64 {
    14
}

/// Data record of a `consultar_disponibilidad` action.
#[derive(Debug, Clone, Deserialize)]
pub struct DayQuery {
    #[serde(default = "default_tipo")]
    pub tipo: String,
    pub fecha: Option<String>,
}

/// Data record of a `consultar_disponibilidad_rango` action.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeQuery {
    #[serde(default = "default_tipo")]
    pub tipo: String,
    pub desde: Option<String>,
    #[serde(default = "default_dias")]
    pub dias: i64,
}

/// Data record of a `crear_cita` action. Wire field names are the Spanish
/// ones the sink expects; start/end stay as raw text because invalid
/// instants are a business rejection, not a deserialization error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(rename = "nombre", default)]
    pub patient_name: String,
    #[serde(rename = "cedula", default)]
    pub id_number: String,
    #[serde(rename = "entidad_salud", default)]
    pub health_entity: String,
    #[serde(default = "default_tipo")]
    pub tipo: String,
    #[serde(rename = "inicio", default)]
    pub start: String,
    #[serde(rename = "fin", default)]
    pub end: String,
}
