//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{self, auth_error};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use noor_core::domain::{HistoryItem, MergedAyah, SurahMeta, User, SURAH_COUNT};
use noor_core::merge::shows_bismillah_heading;
use noor_core::ports::{ContentError, PortError};
use noor_core::view::{SURAH_CONTENT_ERROR, SURAH_LIST_ERROR};
use noor_core::AuthError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_surahs_handler,
        get_surah_handler,
        me_handler,
        record_history_handler,
        health_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::google_login_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            SurahResponse,
            AyahResponse,
            SurahDetailResponse,
            HistoryEntryResponse,
            UserResponse,
            RecordHistoryRequest,
            HealthResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::GoogleLoginRequest,
        )
    ),
    tags(
        (name = "Noor API", description = "Chapters, verses and reading history for the Noor Quran reader.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurahResponse {
    pub number: u32,
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
    pub number_of_ayahs: u32,
    pub revelation_type: String,
}

impl From<&SurahMeta> for SurahResponse {
    fn from(surah: &SurahMeta) -> Self {
        Self {
            number: surah.number,
            name: surah.name.clone(),
            english_name: surah.english_name.clone(),
            english_name_translation: surah.english_name_translation.clone(),
            number_of_ayahs: surah.number_of_ayahs,
            revelation_type: surah.revelation_type.as_str().to_string(),
        }
    }
}

/// One verse with its three renderings.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AyahResponse {
    pub number: u32,
    pub number_in_surah: u32,
    pub juz: u32,
    pub manzil: u32,
    pub page: u32,
    pub ruku: u32,
    pub hizb_quarter: u32,
    pub sajda: bool,
    pub text_arabic: String,
    pub text_english: String,
    pub text_urdu: String,
}

impl From<MergedAyah> for AyahResponse {
    fn from(ayah: MergedAyah) -> Self {
        Self {
            number: ayah.base.number,
            number_in_surah: ayah.base.number_in_surah,
            juz: ayah.base.juz,
            manzil: ayah.base.manzil,
            page: ayah.base.page,
            ruku: ayah.base.ruku,
            hizb_quarter: ayah.base.hizb_quarter,
            sajda: ayah.base.sajda,
            text_arabic: ayah.text_arabic,
            text_english: ayah.text_english,
            text_urdu: ayah.text_urdu,
        }
    }
}

/// A chapter ready to render. `show_bismillah` tells the client to draw the
/// invocation as a heading above the first verse.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurahDetailResponse {
    pub surah: SurahResponse,
    pub show_bismillah: bool,
    pub ayahs: Vec<AyahResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub surah_number: u32,
    pub surah_name: String,
    pub english_name: String,
    pub last_read_ayah: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryItem> for HistoryEntryResponse {
    fn from(item: HistoryItem) -> Self {
        Self {
            surah_number: item.surah_number,
            surah_name: item.surah_name,
            english_name: item.english_name,
            last_read_ayah: item.last_read_ayah,
            timestamp: item.timestamp,
        }
    }
}

/// The signed-in user's profile, history most recent first.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub history: Vec<HistoryEntryResponse>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            history: user.history.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordHistoryRequest {
    pub surah_number: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn list_error(e: ContentError) -> (StatusCode, String) {
    error!("Failed to load surah list: {}", e);
    (StatusCode::BAD_GATEWAY, SURAH_LIST_ERROR.to_string())
}

fn unknown_surah(surah_number: u32) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("Surah {} does not exist", surah_number),
    )
}

fn load_user_error(e: AuthError) -> (StatusCode, String) {
    match e {
        AuthError::Store(PortError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "User not found".to_string())
        }
        other => auth_error(other),
    }
}

async fn find_surah(state: &AppState, surah_number: u32) -> Result<SurahMeta, (StatusCode, String)> {
    let surahs = state.chapters.list_chapters().await.map_err(list_error)?;
    surahs
        .into_iter()
        .find(|s| s.number == surah_number)
        .ok_or_else(|| unknown_surah(surah_number))
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List all chapters in order.
#[utoipa::path(
    get,
    path = "/surahs",
    responses(
        (status = 200, description = "All chapters", body = [SurahResponse]),
        (status = 502, description = "The content API could not be reached")
    )
)]
pub async fn list_surahs_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SurahResponse>>, (StatusCode, String)> {
    let surahs = state.chapters.list_chapters().await.map_err(list_error)?;
    Ok(Json(surahs.iter().map(SurahResponse::from).collect()))
}

/// Fetch one chapter with its Arabic, English and Urdu text merged per verse.
#[utoipa::path(
    get,
    path = "/surahs/{number}",
    params(
        ("number" = u32, Path, description = "Chapter number, 1 to 114.")
    ),
    responses(
        (status = 200, description = "Chapter content", body = SurahDetailResponse),
        (status = 404, description = "No such chapter"),
        (status = 502, description = "The content API failed or returned inconsistent editions")
    )
)]
pub async fn get_surah_handler(
    State(state): State<Arc<AppState>>,
    Path(surah_number): Path<u32>,
) -> Result<Json<SurahDetailResponse>, (StatusCode, String)> {
    if !(1..=SURAH_COUNT).contains(&surah_number) {
        return Err(unknown_surah(surah_number));
    }

    let (surah, ayahs) = tokio::join!(
        find_surah(&state, surah_number),
        state.chapters.load_chapter(surah_number)
    );
    let surah = surah?;
    let ayahs = ayahs.map_err(|e| {
        error!("Failed to load surah {}: {}", surah_number, e);
        (StatusCode::BAD_GATEWAY, SURAH_CONTENT_ERROR.to_string())
    })?;

    Ok(Json(SurahDetailResponse {
        surah: SurahResponse::from(&surah),
        show_bismillah: shows_bismillah_heading(surah_number),
        ayahs: ayahs.into_iter().map(AyahResponse::from).collect(),
    }))
}

/// The signed-in user's profile and reading history.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "No valid session cookie")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = state.accounts.load_user(user_id).await.map_err(load_user_error)?;
    Ok(Json(user.into()))
}

/// Record that the user opened a chapter.
///
/// A failed history write is logged and the unchanged profile is returned.
#[utoipa::path(
    post,
    path = "/me/history",
    request_body = RecordHistoryRequest,
    responses(
        (status = 200, description = "Profile after the write", body = UserResponse),
        (status = 401, description = "No valid session cookie"),
        (status = 404, description = "No such chapter")
    )
)]
pub async fn record_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<RecordHistoryRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let surah = find_surah(&state, req.surah_number).await?;
    let user = match state.accounts.record_history(user_id, &surah, Utc::now()).await {
        Ok(user) => user,
        Err(e) => {
            error!("{}", e);
            state.accounts.load_user(user_id).await.map_err(load_user_error)?
        }
    };
    Ok(Json(user.into()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
