//! crates/noor_core/src/settings.rs
//!
//! Display settings for the reader: translation visibility, line heights and
//! the colour theme.

use std::str::FromStr;

pub const ARABIC_LINE_HEIGHT_RANGE: (f32, f32) = (2.0, 5.0);
pub const URDU_LINE_HEIGHT_RANGE: (f32, f32) = (1.8, 4.5);

/// Preference key the theme is stored under.
pub const THEME_KEY: &str = "theme";

/// Which translations render under the Arabic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    #[default]
    English,
    Urdu,
    Both,
}

impl TranslationMode {
    pub fn show_english(self) -> bool {
        matches!(self, TranslationMode::English | TranslationMode::Both)
    }

    pub fn show_urdu(self) -> bool {
        matches!(self, TranslationMode::Urdu | TranslationMode::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderSettings {
    pub translation_mode: TranslationMode,
    arabic_line_height: f32,
    urdu_line_height: f32,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            translation_mode: TranslationMode::English,
            arabic_line_height: 3.0,
            urdu_line_height: 2.8,
        }
    }
}

impl ReaderSettings {
    pub fn arabic_line_height(&self) -> f32 {
        self.arabic_line_height
    }

    pub fn urdu_line_height(&self) -> f32 {
        self.urdu_line_height
    }

    pub fn set_arabic_line_height(&mut self, value: f32) {
        self.arabic_line_height = clamp(value, ARABIC_LINE_HEIGHT_RANGE);
    }

    pub fn set_urdu_line_height(&mut self, value: f32) {
        self.urdu_line_height = clamp(value, URDU_LINE_HEIGHT_RANGE);
    }
}

fn clamp(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// A stored choice wins; otherwise follow the system colour scheme.
    pub fn resolve(stored: Option<&str>, system_prefers_dark: bool) -> Self {
        match stored.and_then(|s| s.parse().ok()) {
            Some(theme) => theme,
            None if system_prefers_dark => Theme::Dark,
            None => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(format!("Invalid theme: '{}'", s)),
        }
    }
}
