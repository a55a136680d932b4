//! Conjugation dataset: one row per finite verb form the engine can derive.

use anyhow::Result;
use pramana_core::config::DEFAULT_ROOTS;
use pramana_types::{ChatMessage, ConjugationRecord, Step};
use serde_json::json;

use crate::engine::{Candidate, DerivationEngine, DerivationRequest, Dhatu, Lakara, Prayoga, Purusha, Vacana};
use crate::lipi::{Scheme, Transliterator};

pub const CONJUGATION_INSTRUCTIONS: &str = "You are an expert in Sanskrit grammar. You will conjugate Sanskrit verb roots according to Paninian rules. I will give you a Sanskrit dhātu (verb root) along with morphological markers also given in terms of their Sanskrit names. You must conjugate the verb correctly.
Output the conjugated verb form in JSON format: { \"conjugated_verb\": \"your_answer_here\" }
Note: Use IAST transliteration (ā, ī, ū, ṛ, ṝ, ḷ, ṃ, ḥ, ñ, ṅ, ṭ, ḍ, ṇ, ś, ṣ). Be careful to not confuse \"h\" and \"ḥ\"! They aren't interchangeable.
Please don't include back ticks (```) in your response or any other form of Markdown formatting. Just give me raw JSON output. Now here's the input. Read it, then output your answer as JSON in the format above:";

/// Builds conjugation rows from a derivation engine, transliterating every
/// label, form and derivation step into IAST.
pub struct ConjugationBuilder<'a> {
    engine: &'a dyn DerivationEngine,
    lipi: &'a dyn Transliterator,
    roots: Vec<String>,
    lakaras: Vec<Lakara>,
    prayoga: Prayoga,
}

impl<'a> ConjugationBuilder<'a> {
    pub fn new(engine: &'a dyn DerivationEngine, lipi: &'a dyn Transliterator) -> Self {
        Self {
            engine,
            lipi,
            roots: DEFAULT_ROOTS.map(String::from).to_vec(),
            lakaras: vec![Lakara::Lat, Lakara::Lit, Lakara::VidhiLin, Lakara::Lot, Lakara::Lan],
            prayoga: Prayoga::Kartari,
        }
    }

    /// Conjugate these roots, given in IAST (e.g. "bhū"), instead of the
    /// default list. An empty list means every root the engine knows.
    pub fn roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roots = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn lakaras(mut self, lakaras: Vec<Lakara>) -> Self {
        self.lakaras = lakaras;
        self
    }

    fn iast(&self, slp1: &str) -> String {
        self.lipi.convert(slp1, Scheme::Slp1, Scheme::Iast)
    }

    /// Roots to conjugate, in engine order, each at most once.
    fn selected_dhatus(&self) -> Vec<Dhatu> {
        let mut wanted = self.roots.clone();
        self.engine
            .dhatus()
            .into_iter()
            .filter(|dhatu| {
                if self.roots.is_empty() {
                    return true;
                }
                let name = self.iast(dhatu.text());
                match wanted.iter().position(|r| *r == name) {
                    Some(i) => {
                        wanted.remove(i);
                        true
                    }
                    None => false,
                }
            })
            .collect()
    }

    pub fn build(&self) -> Result<Vec<ConjugationRecord>> {
        let dhatus = self.selected_dhatus();
        if dhatus.is_empty() {
            anyhow::bail!("none of the requested roots are known to the derivation engine");
        }
        tracing::info!(roots = dhatus.len(), lakaras = self.lakaras.len(), "building conjugation dataset");

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for dhatu in &dhatus {
            for &lakara in &self.lakaras {
                for purusha in Purusha::ALL {
                    for vacana in Vacana::ALL {
                        let request = DerivationRequest { dhatu, prayoga: self.prayoga, lakara, purusha, vacana };
                        match self.engine.derive(&request).into_iter().next() {
                            Some(gold) => records.push(self.record(&request, &gold)),
                            None => skipped += 1,
                        }
                    }
                }
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "requests with no derivation were left out");
        }
        tracing::info!(records = records.len(), "conjugation dataset built");
        Ok(records)
    }

    fn record(&self, request: &DerivationRequest<'_>, gold: &Candidate) -> ConjugationRecord {
        let dhatu = self.iast(request.dhatu.text());
        let gana = self.iast(&request.dhatu.gana);
        let prayoga = self.iast(request.prayoga.slp1());
        let lakara = self.iast(request.lakara.slp1());
        let purusha = self.iast(request.purusha.slp1());
        let vacana = self.iast(request.vacana.slp1());

        let input = json!({
            "dhātu": dhatu,
            "gaṇa": gana,
            "prayoga": prayoga,
            "lakara": lakara,
            "purusha": purusha,
            "vacana": vacana,
        });
        let user_input = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());

        let derivation_history = gold
            .history
            .iter()
            .map(|step| Step::new(step.code.clone(), self.iast(&step.result.join(" + "))))
            .collect();

        ConjugationRecord {
            messages: vec![ChatMessage::developer(CONJUGATION_INSTRUCTIONS), ChatMessage::user(user_input)],
            dhatu,
            gana,
            prayoga,
            lakara,
            purusha,
            vacana,
            expected_answer: self.iast(&gold.text),
            derivation_history,
        }
    }
}
