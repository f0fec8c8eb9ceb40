use std::io::{self, ErrorKind, Write};

use anyhow::Error;
use sketch_forge::ForgeError;
use sketch_forge::io::Error as IoError;

use crate::util::text::wrap;

const RULE: &str = "──────────────────────────────────────────────────────────────";

/// Prints `err`, its causes and any hints inside a box on stderr.
pub fn print_error(err: &Error) {
    let mut out = io::stderr().lock();

    let _ = writeln!(out);
    let _ = writeln!(out, "   ╔{}╗", "═".repeat(62));
    let _ = writeln!(out, "   ║  {:<59} ║", "✗ Error");
    let _ = writeln!(out, "   ╟{RULE}╢");
    entries(&mut out, &[err.to_string()], "");

    for cause in err.chain().skip(1) {
        section(&mut out, "Caused by:", &[cause.to_string()], "  ");
    }

    let hints = hints_for(err);
    if !hints.is_empty() {
        section(&mut out, "Hints:", &hints, "• ");
    }

    let _ = writeln!(out, "   ╚{}╝", "═".repeat(62));
    let _ = writeln!(out);
}

fn section(out: &mut impl Write, heading: &str, lines: &[String], bullet: &str) {
    let _ = writeln!(out, "   ╟{RULE}╢");
    let _ = writeln!(out, "   ║  {heading:<59} ║");
    entries(out, lines, bullet);
}

fn entries(out: &mut impl Write, items: &[String], bullet: &str) {
    let pad = " ".repeat(bullet.chars().count());
    let indent = if bullet.is_empty() { "" } else { "  " };
    let width = 59 - indent.len() - pad.len();
    for entry in items {
        for (i, line) in wrap(entry, width).iter().enumerate() {
            let lead = if i == 0 { bullet } else { pad.as_str() };
            let _ = writeln!(out, "   ║  {indent}{lead}{line:<width$} ║");
        }
    }
}

/// Hints from the first typed error in the chain, or from the message text.
fn hints_for(err: &Error) -> Vec<String> {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<IoError>() {
            return io_hints(e);
        }
        if let Some(e) = cause.downcast_ref::<ForgeError>() {
            return forge_hints(e);
        }
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return std_io_hints(e.kind());
        }
    }
    text_hints(&err.chain().map(|c| c.to_string().to_lowercase()).collect::<Vec<_>>().join("\n"))
}

fn io_hints(err: &IoError) -> Vec<String> {
    match err {
        IoError::Io { source } => std_io_hints(source.kind()),
        IoError::Parse { format, line, .. } => vec![
            format!("Check line {line} of the {format}"),
            "Sections are `regions`, `pluses`, [[arrows]], [[paths]] and [[glyphs]]".into(),
        ],
        IoError::Image(_) => vec![
            "The page image could not be decoded".into(),
            "Provide the page as a PNG file".into(),
        ],
        IoError::Scene(msg) => {
            let msg = msg.to_lowercase();
            let specific = if msg.contains("corner") || msg.contains("control") {
                "Each segment needs `end` plus either `corner` or `control`"
            } else if msg.contains("child") {
                "Every id listed in `children` must be a path of the scene"
            } else if msg.contains("duplicate") {
                "Path ids must be unique within a scene"
            } else {
                "Every path needs a unique id and at least one segment"
            };
            vec!["The trace scene is not a valid outline tree".into(), specific.into()]
        }
    }
}

fn forge_hints(err: &ForgeError) -> Vec<String> {
    match err {
        ForgeError::CapacityExceeded { kind, capacity } => vec![
            format!("A region produced more than {capacity} {kind} elements"),
            "Raise the limit with --capacity, or split the page into smaller regions".into(),
        ],
        ForgeError::DictionaryParse(_) => vec![
            "The label dictionary is not valid TOML".into(),
            "Expected tables: [spelling] and [superatoms]".into(),
        ],
        ForgeError::Vectorizer(msg) => vec![format!("Tracing a region bitmap failed: {msg}")],
        ForgeError::InvalidPath { id, detail } => vec![
            format!("Traced path {id} is malformed: {detail}"),
            "Check the segments and children of that path in the trace scene".into(),
        ],
        ForgeError::EmptyPage { .. } => vec!["The page image has no pixels".into()],
    }
}

fn std_io_hints(kind: ErrorKind) -> Vec<String> {
    let hints: &[&str] = match kind {
        ErrorKind::NotFound => &["Check that the path is spelled correctly and the file exists"],
        ErrorKind::PermissionDenied => &["Check file permissions with `ls -la`"],
        ErrorKind::InvalidData => &["Trace scenes must be UTF-8 encoded TOML"],
        ErrorKind::BrokenPipe => &["The output consumer exited early, e.g. when piping to `head`"],
        _ => &["Check the file path, permissions and free disk space"],
    };
    hints.iter().map(|h| h.to_string()).collect()
}

fn text_hints(chain: &str) -> Vec<String> {
    if chain.contains("no such file") || chain.contains("not found") {
        std_io_hints(ErrorKind::NotFound)
    } else if chain.contains("permission denied") {
        std_io_hints(ErrorKind::PermissionDenied)
    } else if chain.contains("threshold") {
        vec!["Pass --threshold as a fraction, e.g. 0.3".into()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn typed_error_behind_context_gets_its_hints() {
        let err = Err::<(), _>(IoError::scene("segment 2 of path 7 has neither corner nor control"))
            .context("Failed to read trace scene")
            .unwrap_err();
        let hints = hints_for(&err);
        assert!(hints[1].contains("`corner` or `control`"));
    }

    #[test]
    fn plain_message_falls_back_to_text_hints() {
        let err = anyhow::anyhow!("threshold 1.5 is outside [0, 1]");
        assert_eq!(hints_for(&err), ["Pass --threshold as a fraction, e.g. 0.3"]);
        assert!(hints_for(&anyhow::anyhow!("nothing to say")).is_empty());
    }
}
