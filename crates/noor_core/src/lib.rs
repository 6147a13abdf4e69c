pub mod accounts;
pub mod content;
pub mod domain;
pub mod history;
pub mod merge;
pub mod ports;
pub mod reader;
pub mod search;
pub mod session;
pub mod settings;
pub mod view;

pub use accounts::{Accounts, AuthError, HistoryWriteError};
pub use content::ChapterLoader;
pub use domain::{
    AuthSession, AyahBase, Edition, EditionSet, FederatedIdentity, HistoryItem, MergedAyah,
    RevelationType, SurahMeta, User, UserCredentials,
};
pub use merge::MergePolicy;
pub use ports::{
    AccountStore, ContentError, ContentResult, ContentService, IdentityProvider, PortError,
    PortResult, PreferenceStore,
};
pub use reader::ReaderApp;
pub use session::{SessionManager, SessionStatus};
