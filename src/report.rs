//! Human-readable extension reports printed before a launch.

use crate::config::ScopeArgs;

/// Split `"a - b"` entries. The loader rejects them in files, so only lists
/// built in code reach this with aggregated entries.
fn split_aggregated(items: &[String]) -> Vec<String> {
    items
        .iter()
        .flat_map(|i| i.split(" - "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_unique(out: &mut Vec<String>, item: &str) {
    if !out.iter().any(|o| o == item) {
        out.push(item.to_string());
    }
}

fn render_rows(header: (&str, &str), rows: &[(String, &str)]) -> String {
    let width = rows
        .iter()
        .map(|(n, _)| n.len())
        .chain(std::iter::once(header.0.len()))
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<width$}  {}\n", header.0, header.1);
    out.push_str(&format!(
        "{:<width$}  {}\n",
        "-".repeat(header.0.len()),
        "-".repeat(header.1.len())
    ));
    for (name, status) in rows {
        out.push_str(&format!("{name:<width$}  {status}\n"));
    }
    out
}

/// Extensions grouped by where they came from.
///
/// The first scope is treated as global and every later scope as local.
/// Rows: global-only, shared, local-only, then disabled.
pub fn render_extension_table(
    provenance: &[ScopeArgs],
    final_args: &[String],
    removed: &[String],
) -> String {
    let (global, local): (Vec<String>, Vec<String>) = match provenance.split_first() {
        Some((g, rest)) if g.label == "global" => (
            split_aggregated(&g.args),
            split_aggregated(&rest.iter().flat_map(|s| s.args.clone()).collect::<Vec<_>>()),
        ),
        _ => (
            Vec::new(),
            split_aggregated(&provenance.iter().flat_map(|s| s.args.clone()).collect::<Vec<_>>()),
        ),
    };
    let final_args = split_aggregated(final_args);

    let mut global_only = Vec::new();
    let mut shared = Vec::new();
    let mut local_only = Vec::new();
    for ext in global.iter().chain(local.iter()) {
        if !final_args.contains(ext) {
            continue;
        }
        match (global.contains(ext), local.contains(ext)) {
            (true, true) => push_unique(&mut shared, ext),
            (true, false) => push_unique(&mut global_only, ext),
            _ => push_unique(&mut local_only, ext),
        }
    }

    let mut rows: Vec<(String, &str)> = Vec::new();
    rows.extend(global_only.into_iter().map(|e| (e, "global")));
    rows.extend(shared.into_iter().map(|e| (e, "global+local")));
    rows.extend(local_only.into_iter().map(|e| (e, "local")));
    let mut disabled = Vec::new();
    for r in split_aggregated(removed) {
        push_unique(&mut disabled, &r);
    }
    rows.extend(disabled.into_iter().map(|e| (e, "disabled")));
    render_rows(("Extension", "Source"), &rows)
}

/// Desired extensions against those recorded on the container.
pub fn render_extension_comparison_table(current: &[String], stored: Option<&[String]>) -> String {
    let stored = stored.unwrap_or_default();
    let mut rows: Vec<(String, &str)> = Vec::new();
    for ext in current {
        let status = if stored.contains(ext) { "kept" } else { "added" };
        if !rows.iter().any(|(n, _)| n == ext) {
            rows.push((ext.clone(), status));
        }
    }
    for ext in stored {
        if !current.contains(ext) && !rows.iter().any(|(n, _)| n == ext) {
            rows.push((ext.clone(), "removed"));
        }
    }
    render_rows(("Extension", "Status"), &rows)
}
