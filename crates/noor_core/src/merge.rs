//! crates/noor_core/src/merge.rs
//!
//! Positional merge of the three chapter editions into one record per verse.

use std::str::FromStr;

use crate::domain::{AyahBase, EditionSet, MergedAyah};
use crate::ports::{ContentError, ContentResult};

/// The Uthmani invocation that opens most chapters.
pub const BISMILLAH: &str = "بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ";

/// How to treat editions whose verse counts disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Refuse to merge editions of different lengths.
    #[default]
    Strict,
    /// Follow the Arabic edition and fill absent translations with "".
    Lenient,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(MergePolicy::Strict),
            "lenient" => Ok(MergePolicy::Lenient),
            _ => Err(format!(
                "Invalid merge policy: '{}'. Valid options: strict, lenient",
                s
            )),
        }
    }
}

/// Al-Fatiha carries the invocation as its first verse and At-Tawbah has none,
/// so neither gets a separate heading.
pub fn shows_bismillah_heading(surah_number: u32) -> bool {
    surah_number != 1 && surah_number != 9
}

/// Removes a leading invocation from the first verse of a chapter that renders
/// it as a heading. Other text is returned unchanged.
pub fn strip_bismillah(surah_number: u32, text: &str) -> String {
    if !shows_bismillah_heading(surah_number) {
        return text.to_string();
    }
    match text.strip_prefix(BISMILLAH) {
        Some(rest) => rest.trim().to_string(),
        None => text.to_string(),
    }
}

/// Zips the editions of `surah_number` by position.
pub fn merge_editions(
    surah_number: u32,
    editions: EditionSet,
    policy: MergePolicy,
) -> ContentResult<Vec<MergedAyah>> {
    let EditionSet {
        arabic,
        english,
        urdu,
    } = editions;

    let (arabic_len, english_len, urdu_len) =
        (arabic.ayahs.len(), english.ayahs.len(), urdu.ayahs.len());
    if policy == MergePolicy::Strict && (english_len != arabic_len || urdu_len != arabic_len) {
        return Err(ContentError::EditionMismatch {
            surah: surah_number,
            arabic: arabic_len,
            english: english_len,
            urdu: urdu_len,
        });
    }

    let mut english = english.ayahs.into_iter();
    let mut urdu = urdu.ayahs.into_iter();

    let merged = arabic
        .ayahs
        .into_iter()
        .enumerate()
        .map(|(index, base)| {
            let text_arabic = if index == 0 {
                strip_bismillah(surah_number, &base.text)
            } else {
                base.text.clone()
            };
            MergedAyah {
                text_arabic,
                text_english: text_or_empty(english.next()),
                text_urdu: text_or_empty(urdu.next()),
                base,
            }
        })
        .collect();

    Ok(merged)
}

fn text_or_empty(ayah: Option<AyahBase>) -> String {
    ayah.map(|a| a.text).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::Edition;

    pub(crate) fn ayah(number: u32, text: &str) -> AyahBase {
        AyahBase {
            number,
            text: text.to_string(),
            number_in_surah: number,
            juz: 1,
            manzil: 1,
            page: 1,
            ruku: 1,
            hizb_quarter: 1,
            sajda: false,
        }
    }

    pub(crate) fn edition(identifier: &str, texts: &[&str]) -> Edition {
        Edition {
            identifier: identifier.to_string(),
            language: identifier.split('.').next().unwrap_or("ar").to_string(),
            name: identifier.to_string(),
            english_name: identifier.to_string(),
            format: "text".to_string(),
            ayahs: texts
                .iter()
                .enumerate()
                .map(|(i, t)| ayah(i as u32 + 1, t))
                .collect(),
        }
    }

    pub(crate) fn editions(arabic: &[&str], english: &[&str], urdu: &[&str]) -> EditionSet {
        EditionSet {
            arabic: edition("quran-uthmani", arabic),
            english: edition("en.asad", english),
            urdu: edition("ur.jalandhry", urdu),
        }
    }

    #[test]
    fn strips_invocation_from_first_verse_of_ordinary_chapter() {
        let first = format!("{} الٓمٓ", BISMILLAH);
        let set = editions(&[&first, "ذَٰلِكَ"], &["Alif. Lam. Mim.", "This"], &["الم", "یہ"]);

        let merged = merge_editions(2, set, MergePolicy::Strict).unwrap();

        assert_eq!(merged[0].text_arabic, "الٓمٓ");
        assert_eq!(merged[1].text_arabic, "ذَٰلِكَ");
        // The base text keeps the source value.
        assert_eq!(merged[0].base.text, first);
    }

    #[test]
    fn never_strips_fatiha_or_tawbah() {
        for surah in [1, 9] {
            let first = format!("{} x", BISMILLAH);
            let set = editions(&[&first], &["e"], &["u"]);
            let merged = merge_editions(surah, set, MergePolicy::Strict).unwrap();
            assert_eq!(merged[0].text_arabic, first);
        }
    }

    #[test]
    fn only_the_first_verse_is_touched() {
        let later = format!("{} later", BISMILLAH);
        let set = editions(&["first", &later], &["a", "b"], &["c", "d"]);
        let merged = merge_editions(27, set, MergePolicy::Strict).unwrap();
        assert_eq!(merged[1].text_arabic, later);
    }

    #[test]
    fn text_without_prefix_is_unchanged() {
        assert_eq!(strip_bismillah(36, "  يسٓ "), "  يسٓ ");
        assert_eq!(strip_bismillah(36, BISMILLAH), "");
    }

    #[test]
    fn strict_policy_rejects_desynchronized_editions() {
        let set = editions(&["a", "b", "c"], &["a", "b"], &["a", "b", "c"]);
        let err = merge_editions(5, set, MergePolicy::Strict).unwrap_err();
        match err {
            ContentError::EditionMismatch {
                surah,
                arabic,
                english,
                urdu,
            } => {
                assert_eq!((surah, arabic, english, urdu), (5, 3, 2, 3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lenient_policy_follows_arabic_length_and_fills_gaps() {
        let set = editions(&["a", "b", "c"], &["one"], &["ek", "do", "teen", "char"]);
        let merged = merge_editions(5, set, MergePolicy::Lenient).unwrap();

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text_english, "one");
        assert_eq!(merged[1].text_english, "");
        assert_eq!(merged[2].text_english, "");
        assert_eq!(merged[2].text_urdu, "teen");
    }

    #[test]
    fn empty_translation_text_stays_empty() {
        let set = editions(&["a"], &[""], &["u"]);
        let merged = merge_editions(3, set, MergePolicy::Strict).unwrap();
        assert_eq!(merged[0].text_english, "");
        assert_eq!(merged[0].text_urdu, "u");
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!("STRICT".parse::<MergePolicy>(), Ok(MergePolicy::Strict));
        assert_eq!("lenient".parse::<MergePolicy>(), Ok(MergePolicy::Lenient));
        assert!("loose".parse::<MergePolicy>().is_err());
    }
}
