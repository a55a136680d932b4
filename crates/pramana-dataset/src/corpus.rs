//! Reading quotable segments out of TEI-encoded Sanskrit texts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pramana_types::{ChapterInfo, QuoteType};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const UNKNOWN: &str = "unknown";

/// Paragraphs this short are headings or apparatus, not quotes.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Which text a segment came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub filename: String,
    pub author: String,
    pub work: String,
}

impl Provenance {
    /// Guess author and work from a GRETIL-style file name such as
    /// `sa_kalidasa-meghaduta.xml` (language, author, work).
    pub fn from_filename(filename: &str) -> Self {
        let base = filename.strip_suffix(".xml").unwrap_or(filename);
        let parts: Vec<&str> = base.split(['_', '-']).collect();
        let author = parts.get(1).filter(|p| !p.is_empty()).copied().unwrap_or(UNKNOWN);
        let work = if parts.len() > 2 { parts[2..].join("_") } else { String::new() };
        let work = work.split_whitespace().next().unwrap_or(UNKNOWN);
        Self {
            filename: filename.to_string(),
            author: author.to_string(),
            work: work.to_string(),
        }
    }
}

/// A verse, line or paragraph with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub quote_type: QuoteType,
    /// `xml:id` of the element, or a positional id like `para_3`
    pub id: String,
    pub chapter: ChapterInfo,
    pub provenance: Provenance,
}

pub trait CorpusReader: Send + Sync {
    /// All segments of the corpus under `dir`.
    fn read_dir(&self, dir: &Path) -> Result<Vec<Segment>>;
}

/// Reads `*.xml` TEI files. Verse groups (`<lg>`) become one segment with
/// their lines joined by " / "; `<l>` outside a verse group and `<p>` longer
/// than 20 characters become segments of their own.
#[derive(Debug, Clone)]
pub struct TeiCorpusReader {
    max_files: usize,
}

impl TeiCorpusReader {
    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    /// The corpus files that will be read, sorted by name.
    pub fn files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to list corpus directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        files.sort();
        files.truncate(self.max_files);
        Ok(files)
    }

    pub fn read_file(&self, path: &Path) -> Result<Vec<Segment>> {
        let xml = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        parse_tei(&xml, &filename).with_context(|| format!("Failed to parse {:?}", path))
    }
}

impl Default for TeiCorpusReader {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CorpusReader for TeiCorpusReader {
    fn read_dir(&self, dir: &Path) -> Result<Vec<Segment>> {
        let files = self.files(dir)?;
        tracing::info!(files = files.len(), dir = ?dir, "reading corpus");
        let mut segments = Vec::new();
        for path in files {
            match self.read_file(&path) {
                Ok(found) => {
                    tracing::debug!(file = ?path, segments = found.len(), "read corpus file");
                    segments.extend(found);
                }
                Err(err) => tracing::warn!(file = ?path, error = %format!("{err:#}"), "skipping unreadable corpus file"),
            }
        }
        Ok(segments)
    }
}

#[derive(Clone, Copy)]
enum HeaderField {
    Title,
    Author,
}

struct Div {
    kind: String,
    n: String,
}

/// Text being gathered for an open element.
struct Capture {
    depth: usize,
    text: String,
}

impl Capture {
    fn new(depth: usize) -> Self {
        Self { depth, text: String::new() }
    }

    fn finish(self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

struct VerseGroup {
    depth: usize,
    id: String,
    chapter: ChapterInfo,
    lines: Vec<String>,
}

struct OpenLine {
    capture: Capture,
    id: Option<String>,
    index: usize,
    chapter: ChapterInfo,
}

struct OpenParagraph {
    capture: Capture,
    index: usize,
    chapter: ChapterInfo,
}

#[derive(Default)]
struct TeiState {
    depth: usize,
    /// Open `<div>` elements with their depth, outermost first
    divs: Vec<(usize, Div)>,
    title: Option<String>,
    author: Option<String>,
    header_field: Option<(HeaderField, Capture)>,
    group: Option<VerseGroup>,
    line: Option<OpenLine>,
    paragraph: Option<OpenParagraph>,
    group_count: usize,
    line_count: usize,
    paragraph_count: usize,
    verses: Vec<(String, String, ChapterInfo)>,
    lines: Vec<(String, String, ChapterInfo)>,
    paragraphs: Vec<(String, String, ChapterInfo)>,
}

impl TeiState {
    /// Book, chapter and section from the enclosing divs; the outermost div of
    /// each kind wins.
    fn chapter_info(&self) -> ChapterInfo {
        let mut info = ChapterInfo::default();
        for (_, div) in &self.divs {
            let kind = div.kind.to_lowercase();
            let value = if div.n.is_empty() { div.kind.clone() } else { div.n.clone() };
            let slot = if kind.contains("book") || kind.contains("adhyaya") {
                &mut info.book
            } else if kind.contains("chapter") || kind.contains("paricchedika") {
                &mut info.chapter
            } else if kind.contains("section") {
                &mut info.section
            } else {
                continue;
            };
            if *slot == UNKNOWN {
                *slot = value;
            }
        }
        info
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let name = e.local_name();
        let depth = self.depth;
        match name.as_ref() {
            b"div" if !empty => {
                let kind = attribute(e, b"type")?.unwrap_or_default();
                let n = attribute(e, b"n")?.unwrap_or_default();
                self.divs.push((depth, Div { kind, n }));
            }
            b"title" if self.title.is_none() && self.header_field.is_none() && !empty => {
                self.header_field = Some((HeaderField::Title, Capture::new(depth)));
            }
            b"author" if self.author.is_none() && self.header_field.is_none() && !empty => {
                self.header_field = Some((HeaderField::Author, Capture::new(depth)));
            }
            b"lg" if self.group.is_none() && !empty => {
                self.group_count += 1;
                let id = attribute(e, b"xml:id")?.unwrap_or_else(|| format!("verse_{}", self.group_count));
                self.group = Some(VerseGroup { depth, id, chapter: self.chapter_info(), lines: Vec::new() });
            }
            b"l" => {
                self.line_count += 1;
                if !empty && self.line.is_none() {
                    self.line = Some(OpenLine {
                        capture: Capture::new(depth),
                        id: attribute(e, b"xml:id")?,
                        index: self.line_count,
                        chapter: self.chapter_info(),
                    });
                }
            }
            b"p" => {
                self.paragraph_count += 1;
                if !empty && self.paragraph.is_none() {
                    self.paragraph = Some(OpenParagraph {
                        capture: Capture::new(depth),
                        index: self.paragraph_count,
                        chapter: self.chapter_info(),
                    });
                }
            }
            _ => {}
        }
        if !empty {
            self.depth += 1;
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        for capture in [
            self.header_field.as_mut().map(|(_, c)| c),
            self.line.as_mut().map(|l| &mut l.capture),
            self.paragraph.as_mut().map(|p| &mut p.capture),
        ]
        .into_iter()
        .flatten()
        {
            capture.text.push_str(text);
        }
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        let depth = self.depth;

        if self.header_field.as_ref().is_some_and(|(_, c)| c.depth == depth) {
            if let Some((field, capture)) = self.header_field.take() {
                let text = capture.finish();
                if !text.is_empty() {
                    match field {
                        HeaderField::Title => self.title = Some(text),
                        HeaderField::Author => self.author = Some(text),
                    }
                }
            }
        }

        if self.line.as_ref().is_some_and(|l| l.capture.depth == depth) {
            if let Some(line) = self.line.take() {
                let text = line.capture.finish();
                if !text.is_empty() {
                    match self.group.as_mut() {
                        Some(group) => group.lines.push(text),
                        None => {
                            let id = line.id.unwrap_or_else(|| format!("line_{}", line.index));
                            self.lines.push((text, id, line.chapter));
                        }
                    }
                }
            }
        }

        if self.paragraph.as_ref().is_some_and(|p| p.capture.depth == depth) {
            if let Some(paragraph) = self.paragraph.take() {
                let text = paragraph.capture.finish();
                if text.chars().count() > MIN_PARAGRAPH_CHARS {
                    self.paragraphs.push((text, format!("para_{}", paragraph.index), paragraph.chapter));
                }
            }
        }

        if self.group.as_ref().is_some_and(|g| g.depth == depth) {
            if let Some(group) = self.group.take() {
                if !group.lines.is_empty() {
                    self.verses.push((group.lines.join(" / "), group.id, group.chapter));
                }
            }
        }

        if self.divs.last().is_some_and(|(d, _)| *d == depth) {
            self.divs.pop();
        }
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Segments of one TEI document, verses first, then standalone lines, then
/// paragraphs.
pub fn parse_tei(xml: &str, filename: &str) -> Result<Vec<Segment>> {
    let mut reader = Reader::from_str(xml);
    let mut state = TeiState::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => state.open(&e, false)?,
            Event::Empty(e) => state.open(&e, true)?,
            Event::End(_) => state.close(),
            Event::Text(t) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                state.text(&text);
            }
            Event::CData(c) => state.text(&String::from_utf8_lossy(&c)),
            Event::Eof => break,
            _ => {}
        }
    }

    let mut provenance = Provenance::from_filename(filename);
    if let Some(word) = state.title.as_deref().and_then(|t| t.split_whitespace().next()) {
        provenance.work = word.to_string();
    }
    if let Some(author) = state.author.take() {
        provenance.author = author;
    }

    let TeiState { verses, lines, paragraphs, .. } = state;
    let tagged = verses
        .into_iter()
        .map(|v| (QuoteType::Verse, v))
        .chain(lines.into_iter().map(|l| (QuoteType::Line, l)))
        .chain(paragraphs.into_iter().map(|p| (QuoteType::Paragraph, p)));

    Ok(tagged
        .map(|(quote_type, (text, id, chapter))| Segment {
            text,
            quote_type,
            id,
            chapter,
            provenance: provenance.clone(),
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MEGHADUTA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader>
    <fileDesc>
      <titleStmt>
        <title>Meghadūta of Kālidāsa</title>
        <author>Kalidasa</author>
      </titleStmt>
    </fileDesc>
  </teiHeader>
  <text>
    <body>
      <div type="book" n="1">
        <div type="chapter" n="pūrvamegha">
          <lg xml:id="md_1.2">
            <l xml:id="md_1.2a">tasminn adrau katicid abalāviprayuktaḥ sa kāmī</l>
            <l xml:id="md_1.2b">nītvā māsān kanakavalayabhraṃśariktaprakoṣṭhaḥ</l>
          </lg>
          <l>āṣāḍhasya prathamadivase meghamāśliṣṭasānuṃ</l>
          <p>vapraḥ krīḍāpariṇatagajaprekṣaṇīyaṃ dadarśa &amp; more</p>
          <p>iti</p>
        </div>
      </div>
    </body>
  </text>
</TEI>"#;

    #[test]
    fn test_filename_provenance() {
        let p = Provenance::from_filename("sa_kalidasa-meghaduta.xml");
        assert_eq!((p.author.as_str(), p.work.as_str()), ("kalidasa", "meghaduta"));
        let p = Provenance::from_filename("sa_abhinavagupta-tantraloka_1-5.xml");
        assert_eq!(p.work, "tantraloka_1_5");
        let p = Provenance::from_filename("anonymous.xml");
        assert_eq!((p.author.as_str(), p.work.as_str()), ("unknown", "unknown"));
    }

    #[test]
    fn test_parse_segments() {
        let segments = parse_tei(MEGHADUTA, "sa_kalidasa-meghaduta.xml").unwrap();
        assert_eq!(segments.len(), 3);

        let verse = &segments[0];
        assert_eq!(verse.quote_type, QuoteType::Verse);
        assert_eq!(verse.id, "md_1.2");
        assert_eq!(
            verse.text,
            "tasminn adrau katicid abalāviprayuktaḥ sa kāmī / nītvā māsān kanakavalayabhraṃśariktaprakoṣṭhaḥ"
        );
        assert_eq!(verse.chapter.book, "1");
        assert_eq!(verse.chapter.chapter, "pūrvamegha");
        assert_eq!(verse.chapter.section, "unknown");
        assert_eq!(verse.provenance.work, "Meghadūta");
        assert_eq!(verse.provenance.author, "Kalidasa");

        let line = &segments[1];
        assert_eq!(line.quote_type, QuoteType::Line);
        assert_eq!(line.id, "line_3");

        let para = &segments[2];
        assert_eq!(para.quote_type, QuoteType::Paragraph);
        assert_eq!(para.id, "para_1");
        assert!(para.text.ends_with("dadarśa & more"));
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sa_a-good.xml"), MEGHADUTA).unwrap();
        std::fs::write(dir.path().join("sa_b-broken.xml"), "<TEI><lg><l>x</lg></TEI>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let reader = TeiCorpusReader::default();
        assert_eq!(reader.files(dir.path()).unwrap().len(), 2);
        let segments = reader.read_dir(dir.path()).unwrap();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.provenance.filename == "sa_a-good.xml"));
    }

    #[test]
    fn test_max_files_caps_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.xml", "a.xml", "b.xml"] {
            std::fs::write(dir.path().join(name), "<TEI/>").unwrap();
        }
        let files = TeiCorpusReader::new(2).files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, ["a.xml", "b.xml"]);
    }
}
