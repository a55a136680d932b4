//! Derivation engine seam and a table-backed implementation. The rule engine
//! itself lives in [`crate::prakriya`].
//!
//! Morphological labels and every string an engine returns are SLP1.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tense/mood (lakāra). Names are SLP1; `FromStr` also accepts IAST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lakara {
    Lat,
    Lit,
    Lut,
    Lrt,
    Let,
    Lot,
    Lan,
    VidhiLin,
    AshirLin,
    Lun,
    Lrn,
}

impl Lakara {
    pub const ALL: [Lakara; 11] = [
        Self::Lat,
        Self::Lit,
        Self::Lut,
        Self::Lrt,
        Self::Let,
        Self::Lot,
        Self::Lan,
        Self::VidhiLin,
        Self::AshirLin,
        Self::Lun,
        Self::Lrn,
    ];

    pub const fn slp1(&self) -> &'static str {
        match self {
            Self::Lat => "law",
            Self::Lit => "liw",
            Self::Lut => "luw",
            Self::Lrt => "lfw",
            Self::Let => "lew",
            Self::Lot => "low",
            Self::Lan => "laN",
            Self::VidhiLin => "viDiliN",
            Self::AshirLin => "ASIrliN",
            Self::Lun => "luN",
            Self::Lrn => "lfN",
        }
    }

    pub const fn iast(&self) -> &'static str {
        match self {
            Self::Lat => "laṭ",
            Self::Lit => "liṭ",
            Self::Lut => "luṭ",
            Self::Lrt => "lṛṭ",
            Self::Let => "leṭ",
            Self::Lot => "loṭ",
            Self::Lan => "laṅ",
            Self::VidhiLin => "vidhiliṅ",
            Self::AshirLin => "āśīrliṅ",
            Self::Lun => "luṅ",
            Self::Lrn => "lṛṅ",
        }
    }
}

impl FromStr for Lakara {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.slp1() == s || l.iast() == s.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("unknown lakara: {s}"))
    }
}

impl fmt::Display for Lakara {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slp1())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purusha {
    Prathama,
    Madhyama,
    Uttama,
}

impl Purusha {
    pub const ALL: [Purusha; 3] = [Self::Prathama, Self::Madhyama, Self::Uttama];

    pub const fn slp1(&self) -> &'static str {
        match self {
            Self::Prathama => "praTama",
            Self::Madhyama => "maDyama",
            Self::Uttama => "uttama",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vacana {
    Eka,
    Dvi,
    Bahu,
}

impl Vacana {
    pub const ALL: [Vacana; 3] = [Self::Eka, Self::Dvi, Self::Bahu];

    pub const fn slp1(&self) -> &'static str {
        match self {
            Self::Eka => "eka",
            Self::Dvi => "dvi",
            Self::Bahu => "bahu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prayoga {
    Kartari,
    Karmani,
    Bhave,
}

impl Prayoga {
    pub const fn slp1(&self) -> &'static str {
        match self {
            Self::Kartari => "kartari",
            Self::Karmani => "karmaRi",
            Self::Bhave => "Bave",
        }
    }
}

/// A verb root known to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dhatu {
    /// Key the engine indexes the root by: the root with its markers in a
    /// table ("BU"), the dhatupatha code for vidyut ("01.0001")
    pub code: String,
    /// Conjugation class name
    pub gana: String,
    /// Plain spelling of the root (e.g. "BU"); defaults to `code`
    #[serde(default)]
    pub text: Option<String>,
}

impl Dhatu {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or(&self.code)
    }
}

/// One finite verb form to derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationRequest<'a> {
    pub dhatu: &'a Dhatu,
    pub prayoga: Prayoga,
    pub lakara: Lakara,
    pub purusha: Purusha,
    pub vacana: Vacana,
}

/// One rule application: the rule code and the terms it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStep {
    pub code: String,
    pub result: Vec<String>,
}

/// A derived form with the rule history that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub history: Vec<RuleStep>,
}

/// Generates verb forms with their derivations. When a request yields several
/// candidates the first is the canonical one.
pub trait DerivationEngine: Send + Sync {
    fn dhatus(&self) -> Vec<Dhatu>;
    fn derive(&self, request: &DerivationRequest<'_>) -> Vec<Candidate>;
}

/// Derivations exported ahead of time, loaded from JSON. Useful for pinning a
/// dataset to a reviewed set of forms:
///
/// ```json
/// {
///   "dhatus": [{"code": "BU", "gana": "BvAdi"}],
///   "forms": [{
///     "dhatu": "BU", "prayoga": "kartari", "lakara": "law",
///     "purusha": "praTama", "vacana": "eka",
///     "candidates": [{"text": "Bavati", "history": [{"code": "1.3.1", "result": ["BU"]}]}]
///   }]
/// }
/// ```
#[derive(Debug, Default)]
pub struct TableEngine {
    dhatus: Vec<Dhatu>,
    forms: HashMap<FormKey, Vec<Candidate>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
struct FormKey {
    dhatu: String,
    prayoga: String,
    lakara: String,
    purusha: String,
    vacana: String,
}

impl FormKey {
    fn of(request: &DerivationRequest<'_>) -> Self {
        Self {
            dhatu: request.dhatu.code.clone(),
            prayoga: request.prayoga.slp1().to_string(),
            lakara: request.lakara.slp1().to_string(),
            purusha: request.purusha.slp1().to_string(),
            vacana: request.vacana.slp1().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct TableFile {
    dhatus: Vec<Dhatu>,
    #[serde(default)]
    forms: Vec<TableForm>,
}

#[derive(Deserialize)]
struct TableForm {
    #[serde(flatten)]
    key: FormKey,
    candidates: Vec<Candidate>,
}

impl TableEngine {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read derivation table {:?}", path))?;
        let engine = Self::from_json(&raw).with_context(|| format!("Invalid derivation table {:?}", path))?;
        tracing::info!(dhatus = engine.dhatus.len(), forms = engine.forms.len(), "loaded derivation table");
        Ok(engine)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(raw)?;
        let mut forms = HashMap::with_capacity(file.forms.len());
        for form in file.forms {
            forms.entry(form.key).or_insert_with(Vec::new).extend(form.candidates);
        }
        Ok(Self { dhatus: file.dhatus, forms })
    }
}

impl DerivationEngine for TableEngine {
    fn dhatus(&self) -> Vec<Dhatu> {
        self.dhatus.clone()
    }

    fn derive(&self, request: &DerivationRequest<'_>) -> Vec<Candidate> {
        self.forms.get(&FormKey::of(request)).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TABLE: &str = r#"{
        "dhatus": [
            {"code": "BU", "gana": "BvAdi"},
            {"code": "ga~m", "gana": "BvAdi", "text": "gam"}
        ],
        "forms": [
            {"dhatu": "BU", "prayoga": "kartari", "lakara": "law", "purusha": "praTama", "vacana": "eka",
             "candidates": [
                {"text": "Bavati", "history": [
                    {"code": "1.3.1", "result": ["BU"]},
                    {"code": "3.2.123", "result": ["BU", "la~w"]}
                ]},
                {"text": "Bavate", "history": []}
             ]},
            {"dhatu": "BU", "prayoga": "kartari", "lakara": "law", "purusha": "praTama", "vacana": "bahu",
             "candidates": [{"text": "Bavanti", "history": [{"code": "1.3.1", "result": ["BU"]}]}]}
        ]
    }"#;

    #[test]
    fn test_lakara_names() {
        assert_eq!("laṭ".parse::<Lakara>().unwrap(), Lakara::Lat);
        assert_eq!("viDiliN".parse::<Lakara>().unwrap(), Lakara::VidhiLin);
        assert_eq!(" vidhiliṅ ".parse::<Lakara>().unwrap(), Lakara::VidhiLin);
        assert!("lyap".parse::<Lakara>().is_err());
    }

    #[test]
    fn test_table_lookup() {
        let engine = TableEngine::from_json(TABLE).unwrap();
        let dhatus = engine.dhatus();
        assert_eq!(dhatus.len(), 2);
        assert_eq!(dhatus[1].text(), "gam");
        assert_eq!(dhatus[0].text(), "BU");

        let request = DerivationRequest {
            dhatu: &dhatus[0],
            prayoga: Prayoga::Kartari,
            lakara: Lakara::Lat,
            purusha: Purusha::Prathama,
            vacana: Vacana::Eka,
        };
        let candidates = engine.derive(&request);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].text, "Bavati");

        let missing = DerivationRequest { vacana: Vacana::Dvi, ..request };
        assert!(engine.derive(&missing).is_empty());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forms.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = TableEngine::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("forms.json"));
    }
}
