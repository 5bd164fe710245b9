//! Unversioned informational routes: service banner, disclaimer, debug system info.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::config::MEDICAL_DISCLAIMER;
use crate::error::ApiError;
use crate::state::AppState;

const IMPORTANT_NOTES: &[&str] = &[
    "This system provides educational information only",
    "Always consult healthcare professionals for medical decisions",
    "In case of emergency, contact emergency services immediately",
    "This AI assistant cannot replace professional medical diagnosis",
    "Individual medical situations may vary significantly",
];

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub status: &'static str,
    pub docs_url: Option<&'static str>,
    pub medical_disclaimer: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EmergencyNumbers {
    pub us: &'static str,
    pub uk: &'static str,
    pub eu: &'static str,
    pub general: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Disclaimer {
    pub disclaimer: &'static str,
    pub important_notes: &'static [&'static str],
    pub emergency_contacts: EmergencyNumbers,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub app_version: String,
    pub debug_mode: bool,
    pub vector_database: &'static str,
    pub ai_model: String,
    pub embedding_model: String,
    pub max_chunk_size: usize,
    pub similarity_threshold: f32,
}

/// `GET /`
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let settings = &state.settings;
    Json(ServiceInfo {
        name: settings.app_name.clone(),
        version: settings.app_version.clone(),
        status: "running",
        docs_url: settings.debug.then_some("/docs"),
        medical_disclaimer: MEDICAL_DISCLAIMER,
    })
}

/// `GET /disclaimer`
pub async fn disclaimer() -> Json<Disclaimer> {
    Json(Disclaimer {
        disclaimer: MEDICAL_DISCLAIMER,
        important_notes: IMPORTANT_NOTES,
        emergency_contacts: EmergencyNumbers {
            us: "911",
            uk: "999",
            eu: "112",
            general: "Contact your local emergency services",
        },
    })
}

/// `GET /system/info` exists only in debug mode.
pub async fn system_info(State(state): State<AppState>) -> Result<Json<SystemInfo>, ApiError> {
    let settings = &state.settings;
    if !settings.debug {
        return Err(ApiError::not_found("Not found"));
    }
    Ok(Json(SystemInfo {
        app_version: settings.app_version.clone(),
        debug_mode: settings.debug,
        vector_database: if state.vectors.is_some() { "pinecone" } else { "not_configured" },
        ai_model: settings.openai_model.clone(),
        embedding_model: settings.embedding_model.clone(),
        max_chunk_size: settings.chunk_size,
        similarity_threshold: settings.similarity_threshold,
    }))
}

#[cfg(test)]
#[path = "meta_test.rs"]
mod tests;
