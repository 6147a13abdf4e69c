//! crates/noor_core/src/view.rs
//!
//! The reader's view state and its pure reducer: `(ViewState, Action) -> ViewState`.
//! No I/O happens here; the [`crate::reader::ReaderApp`] performs effects and
//! feeds their outcomes back in as actions.

use crate::domain::{MergedAyah, SurahMeta, User};
use crate::merge::shows_bismillah_heading;
use crate::search::filter_surahs;
use crate::session::SessionStatus;
use crate::settings::{ReaderSettings, Theme, TranslationMode};

pub const SURAH_LIST_ERROR: &str = "Failed to load Surah list.";
pub const SURAH_CONTENT_ERROR: &str = "Failed to load Surah content. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Login,
    Signup,
    Home,
    Surah,
    Profile,
}

impl View {
    fn is_guest_entry(self) -> bool {
        matches!(self, View::Landing | View::Login | View::Signup)
    }
}

/// Whether the reader runs with accounts or as an anonymous reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Accounts,
    /// Only `Home` and `Surah` exist.
    Guest,
}

/// What should be on screen right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    AuthLoading,
    Landing,
    AuthForm(View),
    ListLoading,
    Error(String),
    Home,
    Surah,
    Profile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub mode: AppMode,
    pub view: View,
    pub current_user: Option<User>,
    pub auth_loading: bool,
    pub surahs: Vec<SurahMeta>,
    pub selected_surah: Option<SurahMeta>,
    pub ayahs: Vec<MergedAyah>,
    pub search_query: String,
    pub surahs_loading: bool,
    pub fetching_ayahs: bool,
    pub error: Option<String>,
    pub settings: ReaderSettings,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // === Navigation ===
    LoginClicked,
    SignupClicked,
    ProfileClicked,
    Back,

    // === Session ===
    SessionChanged(SessionStatus),
    /// `Some` after a password or Google login, `None` after registration.
    AuthSucceeded(Option<User>),
    LoggedOut,
    HistoryUpdated(User),

    // === Content ===
    SurahsLoading,
    SurahsLoaded(Vec<SurahMeta>),
    SurahsFailed,
    SurahSelected(u32),
    AyahsLoaded { surah_number: u32, ayahs: Vec<MergedAyah> },
    AyahsFailed { surah_number: u32 },
    /// Leaves the error panel so the failed load can run again.
    Retry,

    // === Settings ===
    SearchChanged(String),
    TranslationModeChanged(TranslationMode),
    ArabicLineHeightChanged(f32),
    UrduLineHeightChanged(f32),
    ThemeToggled,
}

impl ViewState {
    pub fn new(mode: AppMode, theme: Theme) -> Self {
        let (view, auth_loading) = match mode {
            AppMode::Accounts => (View::Landing, true),
            AppMode::Guest => (View::Home, false),
        };
        Self {
            mode,
            view,
            current_user: None,
            auth_loading,
            surahs: Vec::new(),
            selected_surah: None,
            ayahs: Vec::new(),
            search_query: String::new(),
            surahs_loading: false,
            fetching_ayahs: false,
            error: None,
            settings: ReaderSettings::default(),
            theme,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn screen(&self) -> Screen {
        if self.auth_loading {
            return Screen::AuthLoading;
        }
        if self.mode == AppMode::Accounts && self.current_user.is_none() {
            return match self.view {
                View::Login | View::Signup => Screen::AuthForm(self.view),
                _ => Screen::Landing,
            };
        }
        if self.surahs_loading {
            return Screen::ListLoading;
        }
        if self.view == View::Profile {
            return Screen::Profile;
        }
        if let Some(error) = &self.error {
            return Screen::Error(error.clone());
        }
        match self.view {
            View::Surah => Screen::Surah,
            _ => Screen::Home,
        }
    }

    /// The open chapter whose verses are being (re)fetched, if any.
    pub fn chapter_to_fetch(&self) -> Option<u32> {
        match &self.selected_surah {
            Some(surah) if self.view == View::Surah && self.fetching_ayahs => Some(surah.number),
            _ => None,
        }
    }

    /// The chapter list is wanted but neither loaded nor loading.
    pub fn needs_surah_list(&self) -> bool {
        let can_read = self.mode == AppMode::Guest || self.current_user.is_some();
        can_read && self.surahs.is_empty() && !self.surahs_loading && self.error.is_none()
    }

    pub fn filtered_surahs(&self) -> Vec<&SurahMeta> {
        filter_surahs(&self.surahs, &self.search_query)
    }

    pub fn shows_bismillah_heading(&self) -> bool {
        match &self.selected_surah {
            Some(surah) => !self.fetching_ayahs && shows_bismillah_heading(surah.number),
            None => false,
        }
    }

    pub fn show_english(&self) -> bool {
        self.settings.translation_mode.show_english()
    }

    pub fn show_urdu(&self) -> bool {
        self.settings.translation_mode.show_urdu()
    }

    pub fn history_count(&self) -> usize {
        self.current_user.as_ref().map_or(0, |u| u.history.len())
    }

    pub fn greeting_name(&self) -> Option<&str> {
        self.current_user.as_ref().map(User::first_name)
    }

    fn clear_reading(&mut self) {
        self.selected_surah = None;
        self.ayahs.clear();
        self.search_query.clear();
        self.fetching_ayahs = false;
    }

    fn clear_all(&mut self) {
        self.clear_reading();
        self.surahs.clear();
        self.surahs_loading = false;
        self.error = None;
    }
}

/// Pure reducer.
pub fn reduce(mut state: ViewState, action: Action) -> ViewState {
    let accounts = state.mode == AppMode::Accounts;
    match action {
        // === Navigation ===
        Action::LoginClicked if accounts && matches!(state.view, View::Landing | View::Signup) => {
            state.view = View::Login;
        }
        Action::SignupClicked if accounts && matches!(state.view, View::Landing | View::Login) => {
            state.view = View::Signup;
        }
        Action::ProfileClicked if accounts && state.is_signed_in() && state.view == View::Home => {
            state.view = View::Profile;
        }
        Action::LoginClicked | Action::SignupClicked | Action::ProfileClicked => {}
        Action::Back => match state.view {
            View::Surah => {
                state.view = View::Home;
                state.clear_reading();
            }
            View::Profile => state.view = View::Home,
            View::Login | View::Signup => state.view = View::Landing,
            View::Landing | View::Home => {}
        },

        // === Session ===
        Action::SessionChanged(_) if !accounts => {}
        Action::SessionChanged(SessionStatus::Checking) => {
            state.auth_loading = true;
        }
        Action::SessionChanged(SessionStatus::SignedOut) => {
            state.auth_loading = false;
            state.current_user = None;
            if !state.view.is_guest_entry() {
                state.view = View::Landing;
                state.clear_all();
            }
        }
        Action::SessionChanged(SessionStatus::SignedIn {
            mut user,
            history_loaded,
        }) => {
            state.auth_loading = false;
            // A bare identity must not wipe history we already hold.
            if let Some(current) = state.current_user.take() {
                if !history_loaded && current.user_id == user.user_id {
                    user.history = current.history;
                }
            }
            state.current_user = Some(user);
            // Checked on every update, so a late second notification still routes.
            if state.view.is_guest_entry() {
                state.view = View::Home;
            }
        }
        Action::AuthSucceeded(Some(user)) => {
            state.current_user = Some(user);
            state.auth_loading = false;
            state.view = View::Home;
        }
        Action::AuthSucceeded(None) => {
            state.auth_loading = true;
        }
        Action::LoggedOut => {
            state.current_user = None;
            state.auth_loading = false;
            state.view = if accounts { View::Landing } else { View::Home };
            state.clear_all();
        }
        Action::HistoryUpdated(user) => {
            // Writes can finish out of order; keep the newest snapshot.
            if state.current_user.as_ref().is_some_and(|current| current.is_superseded_by(&user)) {
                state.current_user = Some(user);
            }
        }

        // === Content ===
        Action::SurahsLoading => {
            state.surahs_loading = true;
        }
        Action::SurahsLoaded(surahs) => {
            state.surahs_loading = false;
            state.surahs = surahs;
        }
        Action::SurahsFailed => {
            state.surahs_loading = false;
            state.error = Some(SURAH_LIST_ERROR.to_string());
        }
        Action::SurahSelected(number) => {
            if let Some(surah) = state.surahs.iter().find(|s| s.number == number).cloned() {
                state.selected_surah = Some(surah);
                state.view = View::Surah;
                state.fetching_ayahs = true;
                state.error = None;
                state.ayahs.clear();
            }
        }
        Action::AyahsLoaded {
            surah_number,
            ayahs,
        } => {
            if is_selected(&state, surah_number) {
                state.ayahs = ayahs;
                state.fetching_ayahs = false;
            }
        }
        Action::AyahsFailed { surah_number } => {
            if is_selected(&state, surah_number) {
                state.error = Some(SURAH_CONTENT_ERROR.to_string());
                state.fetching_ayahs = false;
            }
        }
        Action::Retry => {
            if state.error.take().is_some() {
                state.surahs_loading = false;
                if state.view == View::Surah && state.selected_surah.is_some() {
                    state.fetching_ayahs = true;
                    state.ayahs.clear();
                }
            }
        }

        // === Settings ===
        Action::SearchChanged(query) => state.search_query = query,
        Action::TranslationModeChanged(mode) => state.settings.translation_mode = mode,
        Action::ArabicLineHeightChanged(value) => state.settings.set_arabic_line_height(value),
        Action::UrduLineHeightChanged(value) => state.settings.set_urdu_line_height(value),
        Action::ThemeToggled => state.theme = state.theme.toggled(),
    }
    state
}

/// Responses for a chapter that is no longer selected are stale.
fn is_selected(state: &ViewState, surah_number: u32) -> bool {
    state.view == View::Surah
        && state.selected_surah.as_ref().map(|s| s.number) == Some(surah_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tests::surah;
    use uuid::Uuid;

    fn user(history: usize) -> User {
        User {
            user_id: Uuid::nil(),
            email: "reader@example.com".to_string(),
            name: "Maryam Yusuf".to_string(),
            history: (0..history)
                .map(|n| crate::domain::HistoryItem::for_surah(&surah(n as u32 + 1, "S", "T"), chrono::Utc::now()))
                .collect(),
        }
    }

    fn run(state: ViewState, actions: Vec<Action>) -> ViewState {
        actions.into_iter().fold(state, reduce)
    }

    fn signed_in_home() -> ViewState {
        run(
            ViewState::new(AppMode::Accounts, Theme::Light),
            vec![
                Action::SessionChanged(SessionStatus::SignedIn {
                    user: user(0),
                    history_loaded: true,
                }),
                Action::SurahsLoaded(vec![
                    surah(1, "Al-Faatiha", "The Opening"),
                    surah(2, "Al-Baqara", "The Cow"),
                    surah(9, "At-Tawba", "The Repentance"),
                ]),
            ],
        )
    }

    #[test]
    fn starts_on_landing_behind_auth_spinner() {
        let state = ViewState::new(AppMode::Accounts, Theme::Dark);
        assert_eq!(state.view, View::Landing);
        assert_eq!(state.screen(), Screen::AuthLoading);
        assert!(!state.needs_surah_list());

        let state = reduce(state, Action::SessionChanged(SessionStatus::SignedOut));
        assert_eq!(state.screen(), Screen::Landing);
    }

    #[test]
    fn landing_to_auth_forms_and_back() {
        let state = reduce(
            ViewState::new(AppMode::Accounts, Theme::Light),
            Action::SessionChanged(SessionStatus::SignedOut),
        );
        let state = reduce(state, Action::LoginClicked);
        assert_eq!(state.screen(), Screen::AuthForm(View::Login));
        let state = reduce(state, Action::SignupClicked);
        assert_eq!(state.view, View::Signup);
        let state = reduce(state, Action::Back);
        assert_eq!(state.view, View::Landing);
    }

    #[test]
    fn login_success_goes_home_with_empty_history() {
        let state = run(
            ViewState::new(AppMode::Accounts, Theme::Light),
            vec![
                Action::SessionChanged(SessionStatus::SignedOut),
                Action::LoginClicked,
                Action::AuthSucceeded(Some(user(0))),
            ],
        );
        assert_eq!(state.view, View::Home);
        assert_eq!(state.history_count(), 0);
        assert_eq!(state.greeting_name(), Some("Maryam"));
        assert!(state.needs_surah_list());
    }

    #[test]
    fn signup_success_waits_for_session_then_routes_home() {
        let state = run(
            ViewState::new(AppMode::Accounts, Theme::Light),
            vec![
                Action::SessionChanged(SessionStatus::SignedOut),
                Action::SignupClicked,
                Action::AuthSucceeded(None),
            ],
        );
        assert_eq!(state.screen(), Screen::AuthLoading);

        let state = reduce(
            state,
            Action::SessionChanged(SessionStatus::SignedIn {
                user: user(0),
                history_loaded: false,
            }),
        );
        assert_eq!(state.view, View::Home);
    }

    #[test]
    fn late_second_session_update_never_reroutes_reader() {
        let state = signed_in_home();
        let state = run(
            state,
            vec![
                Action::SurahSelected(2),
                Action::SessionChanged(SessionStatus::SignedIn {
                    user: user(3),
                    history_loaded: true,
                }),
            ],
        );
        assert_eq!(state.view, View::Surah);
        assert_eq!(state.history_count(), 3);
    }

    #[test]
    fn bare_identity_keeps_known_history() {
        let state = reduce(
            ViewState::new(AppMode::Accounts, Theme::Light),
            Action::AuthSucceeded(Some(user(4))),
        );
        let state = reduce(
            state,
            Action::SessionChanged(SessionStatus::SignedIn {
                user: user(0),
                history_loaded: false,
            }),
        );
        assert_eq!(state.history_count(), 4);
    }

    #[test]
    fn selecting_a_chapter_opens_it_and_back_clears_it() {
        let state = run(
            signed_in_home(),
            vec![Action::SearchChanged("baq".to_string()), Action::SurahSelected(2)],
        );
        assert_eq!(state.view, View::Surah);
        assert!(state.fetching_ayahs);
        assert!(!state.shows_bismillah_heading());

        let state = reduce(
            state,
            Action::AyahsLoaded {
                surah_number: 2,
                ayahs: Vec::new(),
            },
        );
        assert!(state.shows_bismillah_heading());

        let state = reduce(state, Action::Back);
        assert_eq!(state.view, View::Home);
        assert!(state.selected_surah.is_none());
        assert!(state.ayahs.is_empty());
        assert_eq!(state.search_query, "");
    }

    #[test]
    fn tawbah_and_fatiha_have_no_heading() {
        for number in [1, 9] {
            let state = run(
                signed_in_home(),
                vec![
                    Action::SurahSelected(number),
                    Action::AyahsLoaded {
                        surah_number: number,
                        ayahs: Vec::new(),
                    },
                ],
            );
            assert!(!state.shows_bismillah_heading());
        }
    }

    #[test]
    fn unknown_chapter_selection_is_ignored() {
        let state = reduce(signed_in_home(), Action::SurahSelected(77));
        assert_eq!(state.view, View::Home);
        assert!(state.selected_surah.is_none());
    }

    #[test]
    fn stale_verse_responses_are_discarded() {
        let state = run(
            signed_in_home(),
            vec![Action::SurahSelected(2), Action::SurahSelected(9)],
        );
        let stale = reduce(
            state,
            Action::AyahsLoaded {
                surah_number: 2,
                ayahs: vec![],
            },
        );
        assert!(stale.fetching_ayahs);
        let failed = reduce(stale, Action::AyahsFailed { surah_number: 2 });
        assert!(failed.error.is_none());
        assert_eq!(failed.selected_surah.as_ref().unwrap().number, 9);
    }

    #[test]
    fn content_failure_shows_error_panel() {
        let state = run(
            signed_in_home(),
            vec![Action::SurahSelected(2), Action::AyahsFailed { surah_number: 2 }],
        );
        assert_eq!(state.screen(), Screen::Error(SURAH_CONTENT_ERROR.to_string()));
    }

    #[test]
    fn list_failure_shows_error_and_stops_reloading() {
        let state = run(
            ViewState::new(AppMode::Accounts, Theme::Light),
            vec![
                Action::AuthSucceeded(Some(user(0))),
                Action::SurahsLoading,
                Action::SurahsFailed,
            ],
        );
        assert_eq!(state.screen(), Screen::Error(SURAH_LIST_ERROR.to_string()));
        assert!(!state.needs_surah_list());
    }

    #[test]
    fn retry_after_list_failure_wants_the_list_again() {
        let state = run(
            ViewState::new(AppMode::Accounts, Theme::Light),
            vec![
                Action::AuthSucceeded(Some(user(0))),
                Action::SurahsLoading,
                Action::SurahsFailed,
                Action::Retry,
            ],
        );
        assert!(state.error.is_none());
        assert!(state.needs_surah_list());
        assert_eq!(state.chapter_to_fetch(), None);
    }

    #[test]
    fn retry_after_content_failure_refetches_open_chapter() {
        let state = run(
            signed_in_home(),
            vec![
                Action::SurahSelected(2),
                Action::AyahsFailed { surah_number: 2 },
                Action::Retry,
            ],
        );
        assert_eq!(state.screen(), Screen::Surah);
        assert!(state.fetching_ayahs);
        assert_eq!(state.chapter_to_fetch(), Some(2));
        assert!(!state.needs_surah_list());
    }

    #[test]
    fn retry_without_error_changes_nothing() {
        let before = reduce(signed_in_home(), Action::SurahSelected(9));
        let after = reduce(before.clone(), Action::Retry);
        assert_eq!(before, after);
    }

    #[test]
    fn profile_round_trip() {
        let state = reduce(signed_in_home(), Action::ProfileClicked);
        assert_eq!(state.screen(), Screen::Profile);
        let state = reduce(state, Action::Back);
        assert_eq!(state.view, View::Home);
    }

    #[test]
    fn logout_returns_to_landing_and_clears_everything() {
        let state = run(
            signed_in_home(),
            vec![Action::SurahSelected(2), Action::LoggedOut],
        );
        assert_eq!(state.view, View::Landing);
        assert!(state.current_user.is_none());
        assert!(state.surahs.is_empty());
        assert!(state.selected_surah.is_none());
        assert_eq!(state.screen(), Screen::Landing);
    }

    #[test]
    fn session_loss_while_reading_returns_to_landing() {
        let state = run(
            signed_in_home(),
            vec![Action::SurahSelected(2), Action::SessionChanged(SessionStatus::SignedOut)],
        );
        assert_eq!(state.view, View::Landing);
        assert!(state.surahs.is_empty());
    }

    #[test]
    fn history_update_replaces_user_snapshot() {
        let state = reduce(signed_in_home(), Action::HistoryUpdated(user(2)));
        assert_eq!(state.history_count(), 2);

        let mut stranger = user(5);
        stranger.user_id = Uuid::new_v4();
        let state = reduce(state, Action::HistoryUpdated(stranger));
        assert_eq!(state.history_count(), 2);
    }

    #[test]
    fn older_history_snapshot_does_not_overwrite_newer() {
        let now = chrono::Utc::now();
        let snapshot = |surahs: &[(u32, i64)]| {
            let mut u = user(0);
            u.history = surahs
                .iter()
                .map(|&(n, mins)| {
                    crate::domain::HistoryItem::for_surah(&surah(n, "S", "T"), now - chrono::Duration::minutes(mins))
                })
                .collect();
            u
        };

        let newer = snapshot(&[(36, 0), (2, 5)]);
        let older = snapshot(&[(2, 5)]);
        let state = run(
            signed_in_home(),
            vec![Action::HistoryUpdated(newer), Action::HistoryUpdated(older)],
        );
        let current = state.current_user.as_ref().unwrap();
        assert_eq!(current.history.len(), 2);
        assert_eq!(current.history[0].surah_number, 36);

        let state = reduce(state, Action::HistoryUpdated(snapshot(&[(9, -1), (36, 0), (2, 5)])));
        assert_eq!(state.history_count(), 3);
    }

    #[test]
    fn guest_mode_only_has_home_and_surah() {
        let state = ViewState::new(AppMode::Guest, Theme::Light);
        assert_eq!(state.screen(), Screen::Home);
        assert!(state.needs_surah_list());

        let state = run(
            state,
            vec![
                Action::LoginClicked,
                Action::ProfileClicked,
                Action::SessionChanged(SessionStatus::SignedOut),
            ],
        );
        assert_eq!(state.view, View::Home);
    }

    #[test]
    fn settings_actions_update_derived_state() {
        let state = run(
            signed_in_home(),
            vec![
                Action::TranslationModeChanged(TranslationMode::Both),
                Action::ArabicLineHeightChanged(1.0),
                Action::UrduLineHeightChanged(4.0),
                Action::ThemeToggled,
                Action::SearchChanged("9".to_string()),
            ],
        );
        assert!(state.show_english() && state.show_urdu());
        assert_eq!(state.settings.arabic_line_height(), 2.0);
        assert_eq!(state.settings.urdu_line_height(), 4.0);
        assert_eq!(state.theme, Theme::Dark);
        let numbers: Vec<u32> = state.filtered_surahs().iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![9]);
        assert_eq!(state.surahs.len(), 3);
    }
}
