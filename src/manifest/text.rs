//! `MANIFEST.MF` text format
//!
//! Sections are separated by a blank line. A line starting with a single space
//! continues the previous line. Lines of 72 bytes or more are cut after 71 bytes and
//! continued on the next line behind one space, so no emitted line exceeds 71 bytes.

use super::Section;
use tracing::warn;

/// Lines shorter than this are emitted unchanged
const WRAP_AT: usize = 72;
/// Bytes kept on a line that has to be wrapped
const LINE_BYTES: usize = 71;

pub(crate) fn parse_sections(text: &str) -> Vec<Section> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut sections = Vec::new();
    let mut logical: Vec<String> = Vec::new();
    for line in normalized.split('\n') {
        if line.is_empty() {
            close_section(&mut logical, &mut sections);
        } else if let Some(continuation) = line.strip_prefix(' ') {
            match logical.last_mut() {
                Some(previous) => previous.push_str(continuation),
                None => warn!(line, "Ignoring manifest continuation line without a header"),
            }
        } else {
            logical.push(line.to_string());
        }
    }
    close_section(&mut logical, &mut sections);
    sections
}

fn close_section(logical: &mut Vec<String>, sections: &mut Vec<Section>) {
    if logical.is_empty() {
        return;
    }
    let mut section = Section::new();
    for line in logical.drain(..) {
        match split_header(&line) {
            Some((name, value)) => {
                section.insert(name, value);
            }
            None => warn!(line = %line, "Ignoring malformed manifest line"),
        }
    }
    if !section.is_empty() {
        sections.push(section);
    }
}

/// Splits `Name: value` at the first colon; one separating space is dropped
fn split_header(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((name, rest.strip_prefix(' ').unwrap_or(rest)))
}

pub(crate) fn serialize_sections(sections: &[Section]) -> String {
    let rendered: Vec<String> = sections
        .iter()
        .enumerate()
        .filter(|(index, section)| *index == 0 || !section.is_empty())
        .map(|(_, section)| {
            let mut lines = Vec::new();
            for (name, value) in section.ordered() {
                wrap_line(&format!("{}: {}", name, value), &mut lines);
            }
            let mut out = lines.join("\n");
            out.push('\n');
            out
        })
        .collect();
    rendered.join("\n")
}

pub(crate) fn wrap_line(line: &str, out: &mut Vec<String>) {
    let mut rest = line.to_string();
    while rest.len() >= WRAP_AT {
        let mut cut = LINE_BYTES;
        // Never split a multi-byte character
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push(rest[..cut].to_string());
        rest = format!(" {}", &rest[cut..]);
    }
    out.push(rest);
}
