//! WordprocessingML part rewriting
//!
//! Placeholder substitution works at paragraph granularity: a paragraph
//! whose concatenated `<w:t>` text contains a marker is rewritten to a
//! single run carrying the substitution content. Paragraph properties
//! and the first run's properties are preserved, so the generated text
//! keeps the template's styling even when the marker was split across
//! several runs by the editor.

use crate::docx::engine::{AppendParagraph, Substitution};
use crate::error::{SheetdocError, SheetdocResult};
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Result of rewriting one part: the new XML plus, per substitution,
/// how many paragraphs it replaced.
pub(crate) struct RewriteOutcome {
    pub xml: Vec<u8>,
    pub matches: Vec<usize>,
}

fn xml_error(context: &str, error: impl std::fmt::Display) -> SheetdocError {
    SheetdocError::Template(format!("{}: {}", context, error))
}

fn reader_for(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    let config = reader.config_mut();
    config.check_comments = false;
    config.check_end_names = false;
    config.trim_text(false);
    reader
}

fn starts(e: &BytesStart, name: &[u8]) -> bool {
    e.local_name().as_ref() == name
}

fn ends(e: &BytesEnd, name: &[u8]) -> bool {
    e.local_name().as_ref() == name
}

/// Rewrite one part: substitute markers paragraph-by-paragraph and, for
/// the document body, insert appended paragraphs before any `<w:sectPr>`.
pub(crate) fn rewrite_part(
    xml: &[u8],
    subs: &[Substitution],
    appends: &[AppendParagraph],
) -> SheetdocResult<RewriteOutcome> {
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::with_capacity(1024);

    let mut matches = vec![0usize; subs.len()];
    let mut paragraph: Vec<Event<'static>> = Vec::new();
    let mut in_paragraph = false;
    let mut nested = 0usize;
    let mut appends_pending = !appends.is_empty();

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error("Malformed XML in template part", e))?;
        match event {
            Event::Eof => break,
            Event::Start(e) if starts(&e, b"p") => {
                if in_paragraph {
                    // paragraphs nested via text boxes keep buffering
                    nested += 1;
                    paragraph.push(Event::Start(e.into_owned()));
                } else {
                    in_paragraph = true;
                    nested = 0;
                    paragraph.clear();
                    paragraph.push(Event::Start(e.into_owned()));
                }
            }
            Event::End(e) if in_paragraph && ends(&e, b"p") => {
                paragraph.push(Event::End(e.into_owned()));
                if nested > 0 {
                    nested -= 1;
                } else {
                    in_paragraph = false;
                    flush_paragraph(&mut writer, &paragraph, subs, &mut matches)?;
                }
            }
            _ if in_paragraph => paragraph.push(event.into_owned()),
            Event::Start(e) if appends_pending && starts(&e, b"sectPr") => {
                appends_pending = false;
                write_appends(&mut writer, appends)?;
                write(&mut writer, Event::Start(e))?;
            }
            Event::Empty(e) if appends_pending && starts(&e, b"sectPr") => {
                appends_pending = false;
                write_appends(&mut writer, appends)?;
                write(&mut writer, Event::Empty(e))?;
            }
            Event::End(e) if appends_pending && ends(&e, b"body") => {
                appends_pending = false;
                write_appends(&mut writer, appends)?;
                write(&mut writer, Event::End(e))?;
            }
            other => write(&mut writer, other)?,
        }
    }

    Ok(RewriteOutcome {
        xml: writer.into_inner(),
        matches,
    })
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> SheetdocResult<()> {
    writer
        .write_event(event)
        .map_err(|e| xml_error("Failed to write rewritten XML", e))
}

/// Emit a buffered paragraph, substituted when a marker matches its text.
fn flush_paragraph(
    writer: &mut Writer<Vec<u8>>,
    events: &[Event<'static>],
    subs: &[Substitution],
    matches: &mut [usize],
) -> SheetdocResult<()> {
    let text = paragraph_text(events)?;
    let hit = subs
        .iter()
        .position(|s| !s.marker.is_empty() && text.contains(&s.marker));
    match hit {
        None => {
            for event in events {
                write(writer, event.clone())?;
            }
        }
        Some(idx) => {
            matches[idx] += 1;
            let sub = &subs[idx];
            write_replacement(writer, events, &sub.content, sub.style.as_deref())?;
        }
    }
    Ok(())
}

/// Concatenated `<w:t>` content of a buffered paragraph.
fn paragraph_text(events: &[Event<'static>]) -> SheetdocResult<String> {
    let mut text = String::new();
    let mut in_text = 0usize;
    for event in events {
        match event {
            Event::Start(e) if starts(e, b"t") => in_text += 1,
            Event::End(e) if ends(e, b"t") => in_text = in_text.saturating_sub(1),
            Event::Text(t) if in_text > 0 => {
                let content = t
                    .xml_content()
                    .map_err(|e| xml_error("Failed to decode template text", e))?;
                text.push_str(&content);
            }
            Event::CData(c) if in_text > 0 => {
                let content = c
                    .xml_content()
                    .map_err(|e| xml_error("Failed to decode template text", e))?;
                text.push_str(&content);
            }
            Event::GeneralRef(r) if in_text > 0 => push_reference(&mut text, r)?,
            _ => {}
        }
    }
    Ok(text)
}

/// Resolve an XML entity or character reference into the text buffer.
fn push_reference(text: &mut String, reference: &BytesRef) -> SheetdocResult<()> {
    let raw = reference
        .xml_content()
        .map_err(|e| xml_error("Failed to decode template text", e))?;
    if let Some(number) = raw.strip_prefix('#') {
        let code = if let Some(hex) = number.strip_prefix('x') {
            u32::from_str_radix(hex, 16)
        } else {
            number.parse::<u32>()
        }
        .map_err(|e| xml_error("Failed to decode character reference", e))?;
        if let Some(character) = std::char::from_u32(code) {
            text.push(character);
        }
    } else if let Some(entity) = resolve_xml_entity(&raw) {
        text.push_str(entity);
    } else {
        return Err(SheetdocError::Template(format!(
            "Unknown XML entity '&{};' in template",
            raw
        )));
    }
    Ok(())
}

/// Region of a buffered paragraph: indices of a child element's events,
/// start and end inclusive.
fn find_region(events: &[Event<'static>], name: &[u8]) -> Option<(usize, usize)> {
    let start = events.iter().position(|event| match event {
        Event::Start(e) | Event::Empty(e) => starts(e, name),
        _ => false,
    })?;
    if matches!(&events[start], Event::Empty(_)) {
        return Some((start, start));
    }
    let mut depth = 0usize;
    for (offset, event) in events[start + 1..].iter().enumerate() {
        match event {
            Event::Start(e) if starts(e, name) => depth += 1,
            Event::End(e) if ends(e, name) => {
                if depth == 0 {
                    return Some((start, start + 1 + offset));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

/// The first run's `<w:rPr>` region, ignoring the paragraph-mark run
/// properties nested inside `<w:pPr>`.
fn first_run_properties(events: &[Event<'static>]) -> Option<(usize, usize)> {
    let (run_start, run_end) = find_region(events, b"r")?;
    let run = &events[run_start..=run_end];
    let (rpr_start, rpr_end) = find_region(run, b"rPr")?;
    Some((run_start + rpr_start, run_start + rpr_end))
}

fn style_element(style: &str) -> BytesStart<'static> {
    let mut element = BytesStart::new("w:pStyle");
    element.push_attribute(("w:val", style));
    element
}

fn text_element() -> BytesStart<'static> {
    let mut element = BytesStart::new("w:t");
    element.push_attribute(("xml:space", "preserve"));
    element
}

/// Emit the replaced paragraph: original paragraph properties (with an
/// optional style override) and a single run carrying the content,
/// styled like the original first run.
fn write_replacement(
    writer: &mut Writer<Vec<u8>>,
    events: &[Event<'static>],
    content: &str,
    style: Option<&str>,
) -> SheetdocResult<()> {
    write(writer, events[0].clone())?;

    let ppr = find_region(events, b"pPr");
    match (ppr, style) {
        (Some((start, end)), Some(style)) => {
            write_ppr_with_style(writer, &events[start..=end], style)?;
        }
        (Some((start, end)), None) => {
            for event in &events[start..=end] {
                write(writer, event.clone())?;
            }
        }
        (None, Some(style)) => {
            write(writer, Event::Start(BytesStart::new("w:pPr")))?;
            write(writer, Event::Empty(style_element(style)))?;
            write(writer, Event::End(BytesEnd::new("w:pPr")))?;
        }
        (None, None) => {}
    }

    write(writer, Event::Start(BytesStart::new("w:r")))?;
    if let Some((start, end)) = first_run_properties(events) {
        for event in &events[start..=end] {
            write(writer, event.clone())?;
        }
    }
    write(writer, Event::Start(text_element()))?;
    write(writer, Event::Text(BytesText::new(content)))?;
    write(writer, Event::End(BytesEnd::new("w:t")))?;
    write(writer, Event::End(BytesEnd::new("w:r")))?;

    match events.last() {
        Some(event) => write(writer, event.clone()),
        None => Ok(()),
    }
}

/// Re-emit a `<w:pPr>` region with its `<w:pStyle>` replaced.
fn write_ppr_with_style(
    writer: &mut Writer<Vec<u8>>,
    ppr: &[Event<'static>],
    style: &str,
) -> SheetdocResult<()> {
    if ppr.len() == 1 {
        // <w:pPr/> carries nothing to preserve
        write(writer, Event::Start(BytesStart::new("w:pPr")))?;
        write(writer, Event::Empty(style_element(style)))?;
        write(writer, Event::End(BytesEnd::new("w:pPr")))?;
        return Ok(());
    }

    write(writer, ppr[0].clone())?;
    // pStyle must be the first pPr child
    write(writer, Event::Empty(style_element(style)))?;
    let inner = &ppr[1..ppr.len() - 1];
    let existing = find_region(inner, b"pStyle");
    for (idx, event) in inner.iter().enumerate() {
        if let Some((start, end)) = existing {
            if idx >= start && idx <= end {
                continue;
            }
        }
        write(writer, event.clone())?;
    }
    write(writer, ppr[ppr.len() - 1].clone())?;
    Ok(())
}

/// Emit the appended paragraphs.
fn write_appends(
    writer: &mut Writer<Vec<u8>>,
    appends: &[AppendParagraph],
) -> SheetdocResult<()> {
    for append in appends {
        write(writer, Event::Start(BytesStart::new("w:p")))?;
        if let Some(ref style) = append.style {
            write(writer, Event::Start(BytesStart::new("w:pPr")))?;
            write(writer, Event::Empty(style_element(style)))?;
            write(writer, Event::End(BytesEnd::new("w:pPr")))?;
        }
        write(writer, Event::Start(BytesStart::new("w:r")))?;
        write(writer, Event::Start(text_element()))?;
        write(writer, Event::Text(BytesText::new(&append.content)))?;
        write(writer, Event::End(BytesEnd::new("w:t")))?;
        write(writer, Event::End(BytesEnd::new("w:r")))?;
        write(writer, Event::End(BytesEnd::new("w:p")))?;
    }
    Ok(())
}

/// Visible text of a part, paragraphs separated by newlines. Used to
/// check marker presence without rewriting anything.
pub(crate) fn part_text(xml: &[u8]) -> SheetdocResult<String> {
    let mut reader = reader_for(xml);
    let mut buf = Vec::with_capacity(1024);
    let mut text = String::new();
    let mut in_text = 0usize;
    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error("Malformed XML in template part", e))?;
        match event {
            Event::Eof => break,
            Event::Start(e) if starts(&e, b"t") => in_text += 1,
            Event::End(e) if ends(&e, b"t") => in_text = in_text.saturating_sub(1),
            Event::End(e) if ends(&e, b"p") => text.push('\n'),
            Event::Text(t) if in_text > 0 => {
                let content = t
                    .xml_content()
                    .map_err(|e| xml_error("Failed to decode template text", e))?;
                text.push_str(&content);
            }
            Event::CData(c) if in_text > 0 => {
                let content = c
                    .xml_content()
                    .map_err(|e| xml_error("Failed to decode template text", e))?;
                text.push_str(&content);
            }
            Event::GeneralRef(r) if in_text > 0 => push_reference(&mut text, &r)?,
            _ => {}
        }
    }
    Ok(text)
}

/// Rewrite `docProps/core.xml` so `<dc:creator>` holds `author`. A part
/// without a creator element is returned unchanged.
pub(crate) fn rewrite_creator(xml: &[u8], author: &str) -> SheetdocResult<Vec<u8>> {
    let mut reader = reader_for(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::with_capacity(1024);
    let mut skipping = false;
    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error("Malformed XML in core properties", e))?;
        match event {
            Event::Eof => break,
            Event::Start(e) if starts(&e, b"creator") => {
                write(&mut writer, Event::Start(e.into_owned()))?;
                write(&mut writer, Event::Text(BytesText::new(author)))?;
                skipping = true;
            }
            Event::End(e) if ends(&e, b"creator") => {
                skipping = false;
                write(&mut writer, Event::End(e))?;
            }
            _ if skipping => {}
            other => write(&mut writer, other)?,
        }
    }
    Ok(writer.into_inner())
}
