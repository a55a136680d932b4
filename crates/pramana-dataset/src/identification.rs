//! Quote identification dataset: sampled corpus segments with their citations.

use pramana_core::normalize::extract_numbers;
use pramana_types::{ChatMessage, DifficultyTier, IdentificationRecord, SegmentMetadata, SourceCitation};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::corpus::Segment;

pub const IDENTIFICATION_INSTRUCTIONS: &str = r#"You are an expert Sanskrit librarian and scholar. Your task is to identify the source of Sanskrit text quotes from the GRETIL digital library corpus.

Given a Sanskrit quote, you must identify:
1. The author (if known)
2. The work/text title
3. The book/adhyāya (if applicable)
4. The chapter/section (if applicable)
5. The verse/line number (if applicable)

Provide your answer in JSON format:
{
    "author": "author_name",
    "work": "work_title",
    "book": "book_number_or_name",
    "chapter": "chapter_number_or_name",
    "verse": "verse_or_line_identifier",
    "confidence": 0.95
}

Use "unknown" for any field you cannot determine. Set confidence between 0.0 and 1.0 based on how certain you are of your identification.

Now identify the source of this Sanskrit quote:"#;

const WELL_KNOWN_AUTHORS: [&str; 4] = ["abhinavagupta", "kalidasa", "bhartrhari", "nagarjuna"];

/// The verse number of a segment: the first digit run in its id (ASCII or
/// Devanagari digits), or "0" when there is none.
pub fn verse_number(segment_id: &str) -> String {
    extract_numbers(Some(segment_id))
        .into_iter()
        .next()
        .unwrap_or_else(|| "0".to_string())
}

/// Easy for famous authors or long quotes, hard when provenance is unknown or
/// the quote is very short, medium otherwise.
pub fn difficulty(quote_chars: usize, author: &str, work: &str) -> DifficultyTier {
    if WELL_KNOWN_AUTHORS.contains(&author.to_lowercase().as_str()) || quote_chars > 100 {
        DifficultyTier::Easy
    } else if author == "unknown" || work == "unknown" || quote_chars < 30 {
        DifficultyTier::Hard
    } else {
        DifficultyTier::Medium
    }
}

pub struct IdentificationBuilder {
    min_quote_length: usize,
    max_quote_length: usize,
    num_samples: usize,
    seed: u64,
}

impl IdentificationBuilder {
    pub fn new() -> Self {
        Self { min_quote_length: 15, max_quote_length: 300, num_samples: 2000, seed: 42 }
    }

    /// Inclusive bounds on quote length in characters.
    pub fn quote_length(mut self, min: usize, max: usize) -> Self {
        self.min_quote_length = min;
        self.max_quote_length = max;
        self
    }

    pub fn num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(&self, segments: Vec<Segment>) -> Vec<IdentificationRecord> {
        let extracted = segments.len();
        let mut valid: Vec<Segment> = segments
            .into_iter()
            .filter(|s| (self.min_quote_length..=self.max_quote_length).contains(&s.text.chars().count()))
            .collect();
        tracing::info!(extracted, in_range = valid.len(), "filtered corpus segments by length");

        let sampled = if valid.len() > self.num_samples {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
            let picks = index::sample(&mut rng, valid.len(), self.num_samples);
            let mut slots: Vec<Option<Segment>> = valid.drain(..).map(Some).collect();
            picks.into_iter().filter_map(|i| slots[i].take()).collect()
        } else {
            valid
        };

        let records: Vec<IdentificationRecord> = sampled.into_iter().map(record).collect();
        let count = |tier: DifficultyTier| records.iter().filter(|r| r.difficulty == tier).count();
        tracing::info!(
            records = records.len(),
            easy = count(DifficultyTier::Easy),
            medium = count(DifficultyTier::Medium),
            hard = count(DifficultyTier::Hard),
            "identification dataset built"
        );
        records
    }
}

impl Default for IdentificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn record(segment: Segment) -> IdentificationRecord {
    let text_length = segment.text.chars().count();
    let provenance = segment.provenance;
    let expected_answer = SourceCitation {
        author: provenance.author.clone(),
        work: provenance.work.clone(),
        book: segment.chapter.book.clone(),
        chapter: segment.chapter.chapter.clone(),
        verse: verse_number(&segment.id),
        confidence: 1.0,
    };
    IdentificationRecord {
        messages: vec![
            ChatMessage::system(IDENTIFICATION_INSTRUCTIONS),
            ChatMessage::user(format!("Sanskrit quote: \"{}\"", segment.text)),
        ],
        difficulty: difficulty(text_length, &provenance.author, &provenance.work),
        quote: segment.text,
        quote_type: segment.quote_type,
        expected_answer,
        metadata: SegmentMetadata {
            filename: provenance.filename,
            segment_id: segment.id,
            chapter_info: segment.chapter,
            text_length,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{parse_tei, tests::MEGHADUTA, Provenance};
    use pramana_types::{ChapterInfo, QuoteType};

    fn segment(text: &str, id: &str, author: &str) -> Segment {
        Segment {
            text: text.to_string(),
            quote_type: QuoteType::Line,
            id: id.to_string(),
            chapter: ChapterInfo::default(),
            provenance: Provenance {
                filename: "sa_x-y.xml".to_string(),
                author: author.to_string(),
                work: "y".to_string(),
            },
        }
    }

    #[test]
    fn test_verse_number() {
        assert_eq!(verse_number("md_1.2"), "1");
        assert_eq!(verse_number("verse_12"), "12");
        assert_eq!(verse_number("para_007"), "007");
        assert_eq!(verse_number("colophon"), "0");
        assert_eq!(verse_number("śloka_४२"), "४२");
        assert_eq!(verse_number("md_१.2"), "१");
        assert_eq!(verse_number(""), "0");
    }

    #[test]
    fn test_difficulty_rules() {
        assert_eq!(difficulty(20, "Kalidasa", "meghaduta"), DifficultyTier::Easy);
        assert_eq!(difficulty(101, "unknown", "unknown"), DifficultyTier::Easy);
        assert_eq!(difficulty(80, "unknown", "gita"), DifficultyTier::Hard);
        assert_eq!(difficulty(29, "vyasa", "gita"), DifficultyTier::Hard);
        assert_eq!(difficulty(30, "vyasa", "gita"), DifficultyTier::Medium);
        assert_eq!(difficulty(100, "vyasa", "gita"), DifficultyTier::Medium);
    }

    #[test]
    fn test_records_from_corpus() {
        let segments = parse_tei(MEGHADUTA, "sa_kalidasa-meghaduta.xml").unwrap();
        let records = IdentificationBuilder::new().build(segments);
        assert_eq!(records.len(), 3);

        let verse = &records[0];
        assert_eq!(verse.expected_answer.author, "Kalidasa");
        assert_eq!(verse.expected_answer.work, "Meghadūta");
        assert_eq!(verse.expected_answer.book, "1");
        assert_eq!(verse.expected_answer.chapter, "pūrvamegha");
        assert_eq!(verse.expected_answer.verse, "1");
        assert_eq!(verse.expected_answer.confidence, 1.0);
        assert_eq!(verse.difficulty, DifficultyTier::Easy);
        assert_eq!(verse.metadata.segment_id, "md_1.2");
        assert_eq!(verse.metadata.text_length, verse.quote.chars().count());
        assert_eq!(verse.messages[0].role, "system");
        assert!(verse.messages[1].content.starts_with("Sanskrit quote: \"tasminn"));
    }

    #[test]
    fn test_length_filter_is_inclusive() {
        let segments = vec![
            segment(&"a".repeat(14), "l1", "x"),
            segment(&"a".repeat(15), "l2", "x"),
            segment(&"ā".repeat(300), "l3", "x"),
            segment(&"a".repeat(301), "l4", "x"),
        ];
        let records = IdentificationBuilder::new().build(segments);
        let ids: Vec<&str> = records.iter().map(|r| r.metadata.segment_id.as_str()).collect();
        assert_eq!(ids, ["l2", "l3"]);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let segments: Vec<Segment> =
            (0..50).map(|i| segment(&format!("quote number {i:03} of the corpus"), &format!("l{i}"), "x")).collect();
        let a = IdentificationBuilder::new().num_samples(10).build(segments.clone());
        let b = IdentificationBuilder::new().num_samples(10).build(segments.clone());
        assert_eq!(a.len(), 10);
        assert_eq!(a, b);

        let mut ids: Vec<String> = a.iter().map(|r| r.metadata.segment_id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);

        let c = IdentificationBuilder::new().num_samples(10).seed(7).build(segments);
        assert_ne!(a, c);
    }
}
