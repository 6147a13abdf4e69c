//! crates/noor_core/src/content.rs
//!
//! Chapter list loading and chapter content fetch-and-merge on top of a
//! [`ContentService`].

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::domain::{MergedAyah, SurahMeta, SURAH_COUNT};
use crate::merge::{merge_editions, MergePolicy};
use crate::ports::{ContentError, ContentResult, ContentService};

/// Loads chapter metadata once per process and merged chapter content on demand.
pub struct ChapterLoader {
    service: Arc<dyn ContentService>,
    policy: MergePolicy,
    surahs: OnceCell<Vec<SurahMeta>>,
}

impl ChapterLoader {
    pub fn new(service: Arc<dyn ContentService>, policy: MergePolicy) -> Self {
        Self {
            service,
            policy,
            surahs: OnceCell::new(),
        }
    }

    /// Returns the chapter list, fetching it on first use. A failed fetch is
    /// not remembered.
    pub async fn list_chapters(&self) -> ContentResult<Vec<SurahMeta>> {
        let surahs = self
            .surahs
            .get_or_try_init(|| async {
                debug!("Fetching surah list");
                self.service.fetch_surah_list().await.map_err(|e| {
                    error!("Error fetching surah list: {}", e);
                    e
                })
            })
            .await?;
        Ok(surahs.clone())
    }

    /// Fetches the three editions of a chapter and merges them verse by verse.
    pub async fn load_chapter(&self, surah_number: u32) -> ContentResult<Vec<MergedAyah>> {
        if !(1..=SURAH_COUNT).contains(&surah_number) {
            return Err(ContentError::ChapterOutOfRange(surah_number));
        }
        let editions = self
            .service
            .fetch_editions(surah_number)
            .await
            .map_err(|e| {
                error!("Error fetching surah {} data: {}", surah_number, e);
                e
            })?;
        merge_editions(surah_number, editions, self.policy).map_err(|e| {
            error!("Error merging surah {} editions: {}", surah_number, e);
            e
        })
    }
}
