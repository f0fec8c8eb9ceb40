use std::io::{self, Write};

use sketch_forge::{BondLimits, DocumentResult, ForgeConfig, RecognizedStructure};

use crate::config::resolution_name;
use crate::util::text::truncate;

const INDENT: &str = "      ";

const BOX_INNER_WIDTH: usize = 62;
const SAFE_TABLE_WIDTH: usize = BOX_INNER_WIDTH - INDENT.len();

pub fn print_page_summary(document: &DocumentResult, config: &ForgeConfig) {
    let stderr = io::stderr();
    let mut out = stderr.lock();

    let mut rows = vec![
        ("Resolutions", resolution_name(config.resolution)),
        ("Structures", document.structures().count().to_string()),
        ("Reactions", document.reactions().count().to_string()),
    ];
    for page in &document.pages {
        let chosen = page
            .resolution
            .map_or_else(|| "none".to_string(), |r| format!("{r} dpi"));
        rows.push(("Page Resolution", format!("p{} · {chosen}", page.page + 1)));
    }
    if document.limits != BondLimits::UNBOUNDED {
        rows.push((
            "Bond Length",
            format!("{:.1} – {:.1} px", document.limits.min, document.limits.max),
        ));
    }

    print_kv_table(&mut out, "Recognition Summary", &rows);
}

pub fn print_structures(document: &DocumentResult) {
    let structures: Vec<&RecognizedStructure> = document.structures().collect();
    if structures.is_empty() {
        return;
    }

    let stderr = io::stderr();
    let mut out = stderr.lock();

    let page_w = 4usize;
    let conf_w = 10usize;
    let sep_overhead = 9;
    let title_w = SAFE_TABLE_WIDTH.saturating_sub(page_w + conf_w + sep_overhead);

    let rule = |left: &str, mid: &str, right: &str| {
        format!(
            "{INDENT}{left}{}{mid}{}{mid}{}{right}",
            "─".repeat(page_w + 2),
            "─".repeat(title_w + 2),
            "─".repeat(conf_w + 2)
        )
    };

    let _ = writeln!(out, "{}┌─ Structures ─┐", INDENT);
    let _ = writeln!(out, "{}", rule("┌", "┬", "┐"));
    let _ = writeln!(
        out,
        "{}│ {:<page_w$} │ {:<title_w$} │ {:>conf_w$} │",
        INDENT, "Page", "Formula", "Confidence"
    );
    let _ = writeln!(out, "{}", rule("├", "┼", "┤"));

    for s in structures {
        let title = s.structure.lines().next().unwrap_or_default().trim();
        let _ = writeln!(
            out,
            "{}│ {:<page_w$} │ {:<title_w$} │ {:>conf_w$.3} │",
            INDENT,
            s.page + 1,
            truncate(title, title_w),
            s.confidence
        );
    }

    let _ = writeln!(out, "{}", rule("└", "┴", "┘"));
}

fn print_kv_table(out: &mut impl Write, title: &str, rows: &[(&str, String)]) {
    let key_w = 16usize;
    let sep_overhead = 6;
    let val_w = SAFE_TABLE_WIDTH.saturating_sub(key_w + sep_overhead);

    let _ = writeln!(
        out,
        "{}┌─ {} ─┐",
        INDENT,
        truncate(title, SAFE_TABLE_WIDTH - 6)
    );
    let _ = writeln!(
        out,
        "{}┌{k_line}┬{v_line}┐",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
    let _ = writeln!(
        out,
        "{}│ {:<key_w$} │ {:>val_w$} │",
        INDENT, "Metric", "Value"
    );
    let _ = writeln!(
        out,
        "{}├{k_line}┼{v_line}┤",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );

    for (key, val) in rows {
        let _ = writeln!(
            out,
            "{}│ {:<key_w$} │ {:>val_w$} │",
            INDENT,
            truncate(key, key_w),
            truncate(val, val_w)
        );
    }

    let _ = writeln!(
        out,
        "{}└{k_line}┴{v_line}┘",
        INDENT,
        k_line = "─".repeat(key_w + 2),
        v_line = "─".repeat(val_w + 2)
    );
}
