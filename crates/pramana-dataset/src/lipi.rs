//! Transliteration between the SLP1 and IAST romanizations.
//!
//! Derivation engines speak SLP1 (one ASCII letter per phoneme); everything a
//! model sees or is graded on is IAST.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use vidyut_lipi::Lipika;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Slp1,
    Iast,
}

impl Scheme {
    fn lipi(self) -> vidyut_lipi::Scheme {
        match self {
            Self::Slp1 => vidyut_lipi::Scheme::Slp1,
            Self::Iast => vidyut_lipi::Scheme::Iast,
        }
    }
}

pub trait Transliterator: Send + Sync {
    /// Convert `text` from one scheme to another. Characters with no mapping
    /// (spaces, digits, punctuation) pass through unchanged.
    fn convert(&self, text: &str, from: Scheme, to: Scheme) -> String;
}

/// Transliterator backed by `vidyut-lipi`.
///
/// `Lipika` caches the mapping for each scheme pair it has seen, which needs
/// `&mut`, so it sits behind a mutex.
pub struct LipiTransliterator {
    lipika: Mutex<Lipika>,
}

impl LipiTransliterator {
    pub fn new() -> Self {
        Self { lipika: Mutex::new(Lipika::new()) }
    }
}

impl Default for LipiTransliterator {
    fn default() -> Self {
        Self::new()
    }
}

impl Transliterator for LipiTransliterator {
    fn convert(&self, text: &str, from: Scheme, to: Scheme) -> String {
        if from == to {
            return text.to_string();
        }
        // A panic mid-conversion leaves the cache usable.
        let mut lipika = self.lipika.lock().unwrap_or_else(PoisonError::into_inner);
        lipika.transliterate(text, from.lipi(), to.lipi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_iast(s: &str) -> String {
        LipiTransliterator::new().convert(s, Scheme::Slp1, Scheme::Iast)
    }

    fn to_slp1(s: &str) -> String {
        LipiTransliterator::new().convert(s, Scheme::Iast, Scheme::Slp1)
    }

    #[test]
    fn test_slp1_to_iast() {
        assert_eq!(to_iast("Bavati"), "bhavati");
        assert_eq!(to_iast("kfzRaH"), "kṛṣṇaḥ");
        assert_eq!(to_iast("viDiliN"), "vidhiliṅ");
        assert_eq!(to_iast("praTama"), "prathama");
        assert_eq!(to_iast("BvAdi"), "bhvādi");
        assert_eq!(to_iast("saMskftam"), "saṃskṛtam");
    }

    #[test]
    fn test_iast_to_slp1() {
        assert_eq!(to_slp1("bhavati"), "Bavati");
        assert_eq!(to_slp1("kṛṣṇaḥ"), "kfzRaH");
        assert_eq!(to_slp1("aiśvarya"), "ESvarya");
        assert_eq!(to_slp1("dṛś"), "dfS");
    }

    #[test]
    fn test_same_scheme_is_identity() {
        let lipi = LipiTransliterator::new();
        assert_eq!(lipi.convert("Bavati", Scheme::Slp1, Scheme::Slp1), "Bavati");
        assert_eq!(lipi.convert("bhū", Scheme::Iast, Scheme::Iast), "bhū");
    }

    #[test]
    fn test_shared_instance_reuses_mappings() {
        let lipi = LipiTransliterator::new();
        for (slp1, iast) in [("BU", "bhū"), ("gam", "gam"), ("Sru", "śru"), ("vac", "vac")] {
            assert_eq!(lipi.convert(slp1, Scheme::Slp1, Scheme::Iast), iast);
            assert_eq!(lipi.convert(iast, Scheme::Iast, Scheme::Slp1), slp1);
        }
    }
}
