pub mod db;
pub mod google;
pub mod local;
pub mod quran_cloud;

pub use db::DbAdapter;
pub use google::GoogleTokenVerifier;
pub use local::LocalStore;
pub use quran_cloud::QuranCloudAdapter;
