//! crates/noor_core/src/reader.rs
//!
//! `ReaderApp` is the headless reader a front end drives. It owns the
//! [`ViewState`], runs effects (chapter loads, history writes, session calls)
//! on the Tokio runtime, and folds their outcomes back through the reducer.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::accounts::AuthError;
use crate::content::ChapterLoader;
use crate::ports::PreferenceStore;
use crate::session::{SessionManager, SessionStatus};
use crate::settings::{Theme, THEME_KEY};
use crate::view::{reduce, Action, AppMode, ViewState};

pub struct ReaderApp {
    state: ViewState,
    chapters: Arc<ChapterLoader>,
    session: Option<Arc<SessionManager>>,
    session_rx: Option<watch::Receiver<SessionStatus>>,
    prefs: Arc<dyn PreferenceStore>,
    tx: mpsc::UnboundedSender<Option<Action>>,
    rx: mpsc::UnboundedReceiver<Option<Action>>,
    in_flight: usize,
}

impl ReaderApp {
    /// Without a session manager the reader runs in guest mode.
    pub fn new(
        chapters: Arc<ChapterLoader>,
        session: Option<Arc<SessionManager>>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        let mode = if session.is_some() {
            AppMode::Accounts
        } else {
            AppMode::Guest
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let session_rx = session.as_ref().map(|s| s.subscribe());
        Self {
            state: ViewState::new(mode, Theme::Light),
            chapters,
            session,
            session_rx,
            prefs,
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Reads the stored theme and resumes any stored session.
    pub async fn start(&mut self, system_prefers_dark: bool) {
        let stored = match self.prefs.get_preference(THEME_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Could not read theme preference: {}", e);
                None
            }
        };
        self.state.theme = Theme::resolve(stored.as_deref(), system_prefers_dark);

        if let Some(session) = &self.session {
            session.restore().await;
        }
        self.sync_session();
        self.load_list_if_needed();
    }

    /// Applies a UI action and starts whatever effects it implies.
    pub fn dispatch(&mut self, action: Action) {
        self.reduce_in_place(action);
        self.load_list_if_needed();
    }

    pub async fn toggle_theme(&mut self) {
        self.dispatch(Action::ThemeToggled);
        if let Err(e) = self
            .prefs
            .set_preference(THEME_KEY, self.state.theme.as_str())
            .await
        {
            warn!("Could not persist theme preference: {}", e);
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self.session.clone().ok_or(AuthError::ProviderUnavailable)?;
        let user = session.login(email, password).await?;
        self.dispatch(Action::AuthSucceeded(Some(user)));
        Ok(())
    }

    /// Registration does not route by itself; the session update does.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self.session.clone().ok_or(AuthError::ProviderUnavailable)?;
        session.register(name, email, password).await?;
        self.dispatch(Action::AuthSucceeded(None));
        self.sync_session();
        Ok(())
    }

    pub async fn login_with_google(&mut self, id_token: &str) -> Result<(), AuthError> {
        let session = self.session.clone().ok_or(AuthError::ProviderUnavailable)?;
        let user = session.login_with_google(id_token).await?;
        self.dispatch(Action::AuthSucceeded(Some(user)));
        Ok(())
    }

    pub async fn logout(&mut self) {
        if let Some(session) = &self.session {
            session.logout().await;
        }
        self.dispatch(Action::LoggedOut);
        // The sign-out notification is already reflected in the state.
        if let Some(rx) = &mut self.session_rx {
            let _ = rx.borrow_and_update();
        }
    }

    /// Opens a chapter: the history write and the content load run concurrently.
    pub fn select_surah(&mut self, surah_number: u32) {
        self.dispatch(Action::SurahSelected(surah_number));
        let Some(surah) = self
            .state
            .selected_surah
            .clone()
            .filter(|s| s.number == surah_number)
        else {
            return;
        };

        if self.state.is_signed_in() {
            if let Some(session) = self.session.clone() {
                self.spawn(async move {
                    session
                        .record_history(&surah)
                        .await
                        .map(Action::HistoryUpdated)
                });
            }
        }

        self.fetch_chapter(surah_number);
    }

    /// Leaves the error panel and runs the failed load again: the chapter list,
    /// or the verses of the open chapter. History is not written twice.
    pub fn retry(&mut self) {
        let failed = self.state.error.is_some();
        self.dispatch(Action::Retry);
        if !failed {
            return;
        }
        if let Some(surah_number) = self.state.chapter_to_fetch() {
            debug!("Retrying surah {}", surah_number);
            self.fetch_chapter(surah_number);
        }
    }

    /// Waits for every started effect and applies its outcome.
    pub async fn settle(&mut self) {
        loop {
            self.sync_session();
            if self.in_flight == 0 {
                break;
            }
            match self.rx.recv().await {
                Some(outcome) => {
                    self.in_flight -= 1;
                    if let Some(action) = outcome {
                        self.dispatch(action);
                    }
                }
                None => break,
            }
        }
    }

    /// Waits for the next session notification and applies the latest status.
    pub async fn next_session_update(&mut self) {
        let changed = match &mut self.session_rx {
            Some(rx) => rx.changed().await.is_ok(),
            None => false,
        };
        if changed {
            self.sync_session();
        }
    }

    fn sync_session(&mut self) {
        let status = match &mut self.session_rx {
            Some(rx) if rx.has_changed().unwrap_or(false) => rx.borrow_and_update().clone(),
            _ => return,
        };
        debug!("Applying session status update");
        self.dispatch(Action::SessionChanged(status));
    }

    fn load_list_if_needed(&mut self) {
        if !self.state.needs_surah_list() {
            return;
        }
        self.reduce_in_place(Action::SurahsLoading);
        let chapters = Arc::clone(&self.chapters);
        self.spawn(async move {
            Some(match chapters.list_chapters().await {
                Ok(surahs) => Action::SurahsLoaded(surahs),
                Err(_) => Action::SurahsFailed,
            })
        });
    }

    fn fetch_chapter(&mut self, surah_number: u32) {
        let chapters = Arc::clone(&self.chapters);
        self.spawn(async move {
            Some(match chapters.load_chapter(surah_number).await {
                Ok(ayahs) => Action::AyahsLoaded {
                    surah_number,
                    ayahs,
                },
                Err(_) => Action::AyahsFailed { surah_number },
            })
        });
    }

    fn reduce_in_place(&mut self, action: Action) {
        let placeholder = ViewState::new(self.state.mode, self.state.theme);
        let state = std::mem::replace(&mut self.state, placeholder);
        self.state = reduce(state, action);
    }

    fn spawn<F>(&mut self, effect: F)
    where
        F: Future<Output = Option<Action>> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(effect.await);
        });
    }
}
