//! Paragraph and run model of a WordprocessingML part.
//!
//! A part is kept as its source text plus the byte span and parsed contents
//! of every top-level `w:p`. Only paragraphs that were edited are
//! re-serialized; everything else, including untouched paragraphs, is copied
//! from the source byte-for-byte.
//!
//! Inside a paragraph, a run made of `w:rPr`, `w:t` and the character-like
//! elements (tabs, line breaks, hyphens) is a text [`Run`] whose text takes
//! part in keyword matching; the character elements are read as `\t`, `\n`,
//! U+2011 and U+00AD. Any other inline content (runs holding fields,
//! drawings, symbols or page breaks, bookmarks, proofing marks, hyperlinks)
//! is [`Inline::Opaque`]: kept in place and invisible to matching.

use std::ops::Range;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::DocxError;

const PARAGRAPH: &[u8] = b"w:p";
const PARAGRAPH_PROPS: &[u8] = b"w:pPr";
const RUN: &[u8] = b"w:r";
const RUN_PROPS: &[u8] = b"w:rPr";
const TEXT: &[u8] = b"w:t";
const LAST_RENDERED_PAGE_BREAK: &[u8] = b"w:lastRenderedPageBreak";
const TAB: &[u8] = b"w:tab";
const BREAK: &[u8] = b"w:br";
const CARRIAGE_RETURN: &[u8] = b"w:cr";
const NO_BREAK_HYPHEN: &[u8] = b"w:noBreakHyphen";
const SOFT_HYPHEN: &[u8] = b"w:softHyphen";

/// Element written for a character of run text, if it is not plain text.
const fn special_element(c: char) -> Option<&'static str> {
    match c {
        '\n' => Some("w:br"),
        '\t' => Some("w:tab"),
        '\u{2011}' => Some("w:noBreakHyphen"),
        '\u{00AD}' => Some("w:softHyphen"),
        _ => None,
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<(), DocxError> {
    if text.is_empty() {
        return Ok(());
    }
    let mut t = BytesStart::new("w:t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("w:t")))?;
    Ok(())
}

/// Whether a `w:br` is a plain line break rather than a page or column break.
fn is_line_break(e: &BytesStart<'_>) -> bool {
    match e.try_get_attribute("w:type") {
        Ok(None) => true,
        Ok(Some(kind)) => kind.value.as_ref() == b"textWrapping",
        Err(_) => false,
    }
}

/// A run of uniformly formatted text.
#[derive(Debug, Clone)]
pub struct Run {
    start: BytesStart<'static>,
    props: Vec<Event<'static>>,
    /// Unescaped text. `\n`, `\t` and the hyphen characters are written as
    /// their elements.
    pub text: String,
}

impl Run {
    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocxError> {
        writer.write_event(Event::Start(self.start.clone()))?;
        for event in &self.props {
            writer.write_event(event)?;
        }
        let mut piece = String::new();
        for c in self.text.chars() {
            if let Some(element) = special_element(c) {
                write_text(writer, &piece)?;
                piece.clear();
                writer.write_event(Event::Empty(BytesStart::new(element)))?;
            } else {
                piece.push(c);
            }
        }
        write_text(writer, &piece)?;
        writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        Ok(())
    }
}

/// A direct child of a paragraph, other than its properties.
#[derive(Debug, Clone)]
pub enum Inline {
    /// A plain text run.
    Run(Run),
    /// Anything else, kept as parsed.
    Opaque(Vec<Event<'static>>),
    /// Pre-serialized XML inserted by the renderer.
    Raw(String),
}

/// One `w:p` element.
#[derive(Debug, Clone)]
pub struct Paragraph {
    span: Range<usize>,
    start: BytesStart<'static>,
    end: BytesEnd<'static>,
    props: Vec<Event<'static>>,
    inlines: Vec<Inline>,
    modified: bool,
}

impl Paragraph {
    fn from_events(span: Range<usize>, events: &[Event<'static>]) -> Option<Self> {
        let (Some(Event::Start(start)), Some(Event::End(end))) = (events.first(), events.last())
        else {
            return None;
        };
        let inner = events.get(1..events.len() - 1)?;

        let mut props = Vec::new();
        let mut inlines = Vec::new();
        for child in children(inner) {
            match &child[0] {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == PARAGRAPH_PROPS => {
                    props.extend_from_slice(child);
                }
                Event::Start(e) if e.name().as_ref() == RUN => {
                    inlines.push(
                        parse_run(child).map_or_else(|| Inline::Opaque(child.to_vec()), Inline::Run),
                    );
                }
                _ => inlines.push(Inline::Opaque(child.to_vec())),
            }
        }

        Some(Self {
            span,
            start: start.clone(),
            end: end.clone(),
            props,
            inlines,
            modified: false,
        })
    }

    /// Concatenated text of the paragraph's text runs.
    #[must_use]
    pub fn text(&self) -> String {
        self.runs().map(|r| r.text.as_str()).collect()
    }

    fn runs(&self) -> impl Iterator<Item = &Run> {
        self.inlines.iter().filter_map(|inline| match inline {
            Inline::Run(run) => Some(run),
            _ => None,
        })
    }

    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    #[must_use]
    pub fn inlines(&self) -> &[Inline] {
        &self.inlines
    }

    /// Byte range of each text run within [`Paragraph::text`], keyed by its
    /// index in `inlines`.
    fn run_ranges(&self) -> Vec<(usize, Range<usize>)> {
        let mut offset = 0;
        self.inlines
            .iter()
            .enumerate()
            .filter_map(|(idx, inline)| match inline {
                Inline::Run(run) => {
                    let range = offset..offset + run.text.len();
                    offset = range.end;
                    Some((idx, range))
                }
                _ => None,
            })
            .collect()
    }

    fn run_mut(&mut self, idx: usize) -> Option<&mut Run> {
        match self.inlines.get_mut(idx) {
            Some(Inline::Run(run)) => Some(run),
            _ => None,
        }
    }

    /// Replaces every occurrence of `keyword` with `value`, returning how
    /// many were replaced.
    ///
    /// An occurrence inside one run is edited in place. One spanning several
    /// runs is written into the run holding its first character, so it takes
    /// that run's formatting; the runs after it lose the matched characters
    /// and keep the rest of their text and formatting.
    pub fn replace(&mut self, keyword: &str, value: &str) -> usize {
        if keyword.is_empty() {
            return 0;
        }

        let mut count = 0;
        let mut from = 0;
        loop {
            let text = self.text();
            let Some(found) = text.get(from..).and_then(|t| t.find(keyword)) else {
                break;
            };
            let start = from + found;
            let end = start + keyword.len();

            let ranges = self.run_ranges();
            let Some((first_idx, first)) = ranges.iter().find(|(_, r)| r.contains(&start)).cloned()
            else {
                break;
            };

            if end <= first.end {
                if let Some(run) = self.run_mut(first_idx) {
                    run.text
                        .replace_range(start - first.start..end - first.start, value);
                }
            } else {
                for (idx, range) in ranges.iter().filter(|(_, r)| r.start < end && r.end > start) {
                    let Some(run) = self.run_mut(*idx) else {
                        continue;
                    };
                    if *idx == first_idx {
                        run.text.truncate(start - range.start);
                        run.text.push_str(value);
                    } else if range.end <= end {
                        run.text.clear();
                    } else {
                        run.text.replace_range(..end - range.start, "");
                    }
                }
            }

            self.modified = true;
            count += 1;
            from = start + value.len();
        }
        count
    }

    /// Appends pre-serialized run XML to the end of the paragraph.
    pub fn push_raw(&mut self, xml: String) {
        self.inlines.push(Inline::Raw(xml));
        self.modified = true;
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocxError> {
        writer.write_event(Event::Start(self.start.clone()))?;
        for event in &self.props {
            writer.write_event(event)?;
        }
        for inline in &self.inlines {
            match inline {
                Inline::Run(run) => run.write(writer)?,
                Inline::Opaque(events) => {
                    for event in events {
                        writer.write_event(event)?;
                    }
                }
                Inline::Raw(xml) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(xml.as_str())))?;
                }
            }
        }
        writer.write_event(Event::End(self.end.clone()))?;
        Ok(())
    }
}

/// Splits a flat event list into top-level elements. Each slice is a single
/// `Empty`/`Text`-like event or a `Start` through its matching `End`.
fn children<'a>(events: &'a [Event<'static>]) -> Vec<&'a [Event<'static>]> {
    let mut out = Vec::new();
    let mut depth = 0_usize;
    let mut begin = 0;
    for (i, event) in events.iter().enumerate() {
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    begin = i;
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push(&events[begin..=i]);
                }
            }
            _ if depth == 0 => out.push(&events[i..=i]),
            _ => {}
        }
    }
    out
}

/// Parses a `w:r` element into a [`Run`] if it holds only formatting, text
/// and character elements.
fn parse_run(events: &[Event<'static>]) -> Option<Run> {
    let Some(Event::Start(start)) = events.first() else {
        return None;
    };
    let inner = events.get(1..events.len() - 1)?;

    let mut props = Vec::new();
    let mut text = String::new();
    for child in children(inner) {
        match &child[0] {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == RUN_PROPS => {
                props.extend_from_slice(child);
            }
            Event::Start(e) if e.name().as_ref() == TEXT => {
                for event in &child[1..child.len() - 1] {
                    match event {
                        Event::Text(t) => text.push_str(&t.unescape().ok()?),
                        Event::CData(c) => text.push_str(std::str::from_utf8(c).ok()?),
                        _ => return None,
                    }
                }
            }
            Event::Empty(e)
                if e.name().as_ref() == TEXT || e.name().as_ref() == LAST_RENDERED_PAGE_BREAK => {}
            Event::Empty(e) if e.name().as_ref() == TAB => text.push('\t'),
            Event::Empty(e) if e.name().as_ref() == BREAK && is_line_break(e) => text.push('\n'),
            Event::Empty(e) if e.name().as_ref() == CARRIAGE_RETURN => text.push('\n'),
            Event::Empty(e) if e.name().as_ref() == NO_BREAK_HYPHEN => text.push('\u{2011}'),
            Event::Empty(e) if e.name().as_ref() == SOFT_HYPHEN => text.push('\u{00AD}'),
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
            _ => return None,
        }
    }

    Some(Run {
        start: start.clone(),
        props,
        text,
    })
}

/// A parsed part: its source and its top-level paragraphs.
#[derive(Debug, Clone)]
pub struct Part {
    source: String,
    paragraphs: Vec<Paragraph>,
}

impl Part {
    /// Parses the XML of a part.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Xml`] if the part is not well-formed.
    pub fn parse(source: String) -> Result<Self, DocxError> {
        let mut paragraphs = Vec::new();
        {
            let mut reader = Reader::from_str(&source);
            let mut current: Option<(usize, usize, Vec<Event<'static>>)> = None;

            loop {
                let position = reader.buffer_position();
                let event = reader.read_event()?.into_owned();
                match &event {
                    Event::Eof => break,
                    Event::Start(e) if e.name().as_ref() == PARAGRAPH => match &mut current {
                        Some((_, depth, events)) => {
                            *depth += 1;
                            events.push(event);
                        }
                        None => current = Some((position, 1, vec![event])),
                    },
                    Event::End(e) if e.name().as_ref() == PARAGRAPH => {
                        if let Some((begin, mut depth, mut events)) = current.take() {
                            depth -= 1;
                            events.push(event);
                            if depth == 0 {
                                let span = begin..reader.buffer_position();
                                if let Some(paragraph) = Paragraph::from_events(span, &events) {
                                    paragraphs.push(paragraph);
                                }
                            } else {
                                current = Some((begin, depth, events));
                            }
                        }
                    }
                    _ => {
                        if let Some((_, _, events)) = &mut current {
                            events.push(event);
                        }
                    }
                }
            }
        }

        Ok(Self { source, paragraphs })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.paragraphs.iter_mut()
    }

    #[must_use]
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.paragraphs.iter().any(Paragraph::is_modified)
    }

    /// Serializes the part, re-writing only modified paragraphs.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Xml`] if a paragraph cannot be written.
    pub fn to_xml(&self) -> Result<Vec<u8>, DocxError> {
        let mut out = Vec::with_capacity(self.source.len());
        let mut copied = 0;
        for paragraph in self.paragraphs.iter().filter(|p| p.modified) {
            out.extend_from_slice(&self.source.as_bytes()[copied..paragraph.span.start]);
            let mut writer = Writer::new(Vec::new());
            paragraph.write(&mut writer)?;
            out.extend_from_slice(&writer.into_inner());
            copied = paragraph.span.end;
        }
        out.extend_from_slice(&self.source.as_bytes()[copied..]);
        Ok(out)
    }
}
