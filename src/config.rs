use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub openai_api_key: String,
    pub openai_model: String,
    pub freebusy_url: String,
    pub google_calendar_id: String,
    pub google_access_token: String,
    pub make_webhook_url: String,
    pub wa_verify_token: String,
    pub wa_phone_number_id: String,
    pub wa_access_token: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            freebusy_url: env::var("FREEBUSY_URL").unwrap_or_else(|_| {
                "https://www.googleapis.com/calendar/v3/freeBusy".to_string()
            }),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID").unwrap_or_default(),
            google_access_token: env::var("GOOGLE_ACCESS_TOKEN").unwrap_or_default(),
            make_webhook_url: env::var("MAKE_WEBHOOK_URL").unwrap_or_default(),
            wa_verify_token: env::var("WA_VERIFY_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            wa_phone_number_id: env::var("WA_PHONE_NUMBER_ID").unwrap_or_default(),
            wa_access_token: env::var("WA_ACCESS_TOKEN").unwrap_or_default(),
        }
    }
}
