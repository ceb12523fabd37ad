use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::AppConfig;
use crate::models::Session;
use crate::services::ai::LlmProvider;
use crate::services::calendar::BusySource;
use crate::services::messaging::MessagingProvider;
use crate::services::sink::PersistenceSink;

pub struct AppState {
    pub config: AppConfig,
    pub llm: Box<dyn LlmProvider>,
    pub busy: Box<dyn BusySource>,
    pub sink: Box<dyn PersistenceSink>,
    pub messaging: Box<dyn MessagingProvider>,
    /// Conversation history keyed by session id (phone number for
    /// WhatsApp, caller-chosen id for /chat).
    pub sessions: Mutex<HashMap<String, Session>>,
}
