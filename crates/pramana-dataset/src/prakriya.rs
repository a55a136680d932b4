//! Derivations computed by the `vidyut-prakriya` rule engine.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use vidyut_prakriya::args as vp;
use vidyut_prakriya::{Dhatupatha, Prakriya, Vyakarana};

use crate::engine::{
    Candidate, DerivationEngine, DerivationRequest, Dhatu, Lakara, Prayoga, Purusha, RuleStep, Vacana,
};

/// Class names (SLP1) by the two-digit prefix of a dhatupatha code.
const GANAS: [&str; 10] = [
    "BvAdi", "adAdi", "juhotyAdi", "divAdi", "svAdi", "tudAdi", "ruDAdi", "tanAdi", "kryAdi", "curAdi",
];

/// Every root of a vidyut dhatupatha, conjugated on demand.
///
/// Roots are keyed by their dhatupatha code ("01.0001"), so homophonous roots
/// of different classes stay distinct.
pub struct VyakaranaEngine {
    vyakarana: Vyakarana,
    dhatus: Vec<Dhatu>,
    by_code: HashMap<String, vp::Dhatu>,
}

impl VyakaranaEngine {
    /// Load the dhatupatha from a vidyut-prakriya data directory, the one
    /// holding `dhatupatha.tsv`.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self> {
        let path = data_dir.as_ref().join("dhatupatha.tsv");
        if !path.is_file() {
            anyhow::bail!("No dhatupatha at {:?}; download the vidyut data first", path);
        }
        let dhatupatha =
            Dhatupatha::from_path(&path).map_err(|e| anyhow!("Failed to read dhatupatha {:?}: {:?}", path, e))?;

        let vyakarana = Vyakarana::new();
        let mut dhatus = Vec::new();
        let mut by_code = HashMap::new();
        for entry in dhatupatha {
            let code = entry.code().to_string();
            let dhatu = entry.dhatu().clone();
            // The plain spelling of a root is its own derivation, markers removed.
            let Some(text) = vyakarana.derive_dhatus(&dhatu).first().map(Prakriya::text) else {
                tracing::warn!(code = %code, "root has no derivation, skipped");
                continue;
            };
            dhatus.push(Dhatu { code: code.clone(), gana: gana_name(&code).to_string(), text: Some(text) });
            by_code.insert(code, dhatu);
        }
        tracing::info!(dhatus = dhatus.len(), path = ?path, "loaded dhatupatha");
        Ok(Self { vyakarana, dhatus, by_code })
    }
}

impl DerivationEngine for VyakaranaEngine {
    fn dhatus(&self) -> Vec<Dhatu> {
        self.dhatus.clone()
    }

    fn derive(&self, request: &DerivationRequest<'_>) -> Vec<Candidate> {
        let Some(dhatu) = self.by_code.get(&request.dhatu.code) else {
            return Vec::new();
        };
        let args = vp::Tinanta::builder()
            .dhatu(dhatu.clone())
            .prayoga(prayoga(request.prayoga))
            .lakara(lakara(request.lakara))
            .purusha(purusha(request.purusha))
            .vacana(vacana(request.vacana))
            .build();
        match args {
            Ok(args) => self.vyakarana.derive_tinantas(&args).iter().map(candidate).collect(),
            Err(err) => {
                tracing::warn!(dhatu = %request.dhatu.code, lakara = %request.lakara, error = ?err, "bad derivation request");
                Vec::new()
            }
        }
    }
}

fn candidate(prakriya: &Prakriya) -> Candidate {
    let history = prakriya
        .history()
        .iter()
        .map(|step| RuleStep {
            code: step.rule().code().to_string(),
            result: step.result().iter().map(|term| term.text().to_string()).collect(),
        })
        .collect();
    Candidate { text: prakriya.text(), history }
}

/// Class name for a dhatupatha code such as "01.0001"; "unknown" when the
/// prefix is not a class number.
fn gana_name(code: &str) -> &'static str {
    code.split('.')
        .next()
        .and_then(|prefix| prefix.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| GANAS.get(i).copied())
        .unwrap_or("unknown")
}

fn prayoga(p: Prayoga) -> vp::Prayoga {
    match p {
        Prayoga::Kartari => vp::Prayoga::Kartari,
        Prayoga::Karmani => vp::Prayoga::Karmani,
        Prayoga::Bhave => vp::Prayoga::Bhave,
    }
}

fn lakara(l: Lakara) -> vp::Lakara {
    match l {
        Lakara::Lat => vp::Lakara::Lat,
        Lakara::Lit => vp::Lakara::Lit,
        Lakara::Lut => vp::Lakara::Lut,
        Lakara::Lrt => vp::Lakara::Lrt,
        Lakara::Let => vp::Lakara::Let,
        Lakara::Lot => vp::Lakara::Lot,
        Lakara::Lan => vp::Lakara::Lan,
        Lakara::VidhiLin => vp::Lakara::VidhiLin,
        Lakara::AshirLin => vp::Lakara::AshirLin,
        Lakara::Lun => vp::Lakara::Lun,
        Lakara::Lrn => vp::Lakara::Lrn,
    }
}

fn purusha(p: Purusha) -> vp::Purusha {
    match p {
        Purusha::Prathama => vp::Purusha::Prathama,
        Purusha::Madhyama => vp::Purusha::Madhyama,
        Purusha::Uttama => vp::Purusha::Uttama,
    }
}

fn vacana(v: Vacana) -> vp::Vacana {
    match v {
        Vacana::Eka => vp::Vacana::Eka,
        Vacana::Dvi => vp::Vacana::Dvi,
        Vacana::Bahu => vp::Vacana::Bahu,
    }
}
