//! services/api/src/adapters/quran_cloud.rs
//!
//! This module contains the adapter for the Al-Quran Cloud REST API.
//! It implements the `ContentService` port from the `core` crate.

use async_trait::async_trait;
use noor_core::domain::{AyahBase, Edition, EditionSet, RevelationType, SurahMeta};
use noor_core::ports::{ContentError, ContentResult, ContentService};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::Editions;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ContentService` port over HTTP.
#[derive(Clone)]
pub struct QuranCloudAdapter {
    client: reqwest::Client,
    base_url: String,
    editions: Editions,
}

impl QuranCloudAdapter {
    /// Creates a new `QuranCloudAdapter` with its own pooled client.
    pub fn new(base_url: &str, editions: Editions, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("noor/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            editions,
        })
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> ContentResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ContentError::Network(e.to_string()))?;
        let envelope = response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| ContentError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

//=========================================================================================
// Wire Format
//=========================================================================================

/// Every response is wrapped as `{ code, status, data }`.
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurahRecord {
    number: u32,
    name: String,
    english_name: String,
    english_name_translation: String,
    number_of_ayahs: u32,
    revelation_type: String,
}
impl SurahRecord {
    fn to_domain(self) -> SurahMeta {
        SurahMeta {
            number: self.number,
            name: self.name,
            english_name: self.english_name,
            english_name_translation: self.english_name_translation,
            number_of_ayahs: self.number_of_ayahs,
            revelation_type: RevelationType::parse(&self.revelation_type),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AyahRecord {
    number: u32,
    text: String,
    number_in_surah: u32,
    juz: u32,
    manzil: u32,
    page: u32,
    ruku: u32,
    hizb_quarter: u32,
    /// `false`, or an object describing the prostration.
    #[serde(default)]
    sajda: serde_json::Value,
}
impl AyahRecord {
    fn to_domain(self) -> AyahBase {
        let sajda = match self.sajda {
            serde_json::Value::Bool(b) => b,
            serde_json::Value::Object(_) => true,
            _ => false,
        };
        AyahBase {
            number: self.number,
            text: self.text,
            number_in_surah: self.number_in_surah,
            juz: self.juz,
            manzil: self.manzil,
            page: self.page,
            ruku: self.ruku,
            hizb_quarter: self.hizb_quarter,
            sajda,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditionInfo {
    identifier: String,
    language: String,
    name: String,
    english_name: String,
    format: String,
}

#[derive(Deserialize)]
struct EditionRecord {
    edition: EditionInfo,
    ayahs: Vec<AyahRecord>,
}
impl EditionRecord {
    fn to_domain(self) -> Edition {
        Edition {
            identifier: self.edition.identifier,
            language: self.edition.language,
            name: self.edition.name,
            english_name: self.edition.english_name,
            format: self.edition.format,
            ayahs: self.ayahs.into_iter().map(|a| a.to_domain()).collect(),
        }
    }
}

//=========================================================================================
// `ContentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentService for QuranCloudAdapter {
    async fn fetch_surah_list(&self) -> ContentResult<Vec<SurahMeta>> {
        let records: Vec<SurahRecord> = self.get_data("/surah").await?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    /// The editions come back in the order they were requested.
    async fn fetch_editions(&self, surah_number: u32) -> ContentResult<EditionSet> {
        let path = format!(
            "/surah/{}/editions/{},{},{}",
            surah_number, self.editions.arabic, self.editions.english, self.editions.urdu
        );
        let records: Vec<EditionRecord> = self.get_data(&path).await?;
        let found = records.len();
        let mut editions = records.into_iter().map(|r| r.to_domain());
        match (editions.next(), editions.next(), editions.next(), editions.next()) {
            (Some(arabic), Some(english), Some(urdu), None) => Ok(EditionSet {
                arabic,
                english,
                urdu,
            }),
            _ => Err(ContentError::MissingEdition {
                surah: surah_number,
                found,
            }),
        }
    }
}
