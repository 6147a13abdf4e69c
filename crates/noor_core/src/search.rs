//! Chapter search over the loaded list.

use crate::domain::SurahMeta;

/// Case-insensitive substring match on the English name, its translation, or
/// the chapter number. An empty query keeps everything in order.
pub fn filter_surahs<'a>(surahs: &'a [SurahMeta], query: &str) -> Vec<&'a SurahMeta> {
    if query.is_empty() {
        return surahs.iter().collect();
    }
    let query = query.to_lowercase();
    surahs
        .iter()
        .filter(|s| {
            s.english_name.to_lowercase().contains(&query)
                || s.english_name_translation.to_lowercase().contains(&query)
                || s.number.to_string().contains(&query)
        })
        .collect()
}
