// Minimal table extraction for server-rendered pages.
// Case-insensitive tag search, no nesting awareness beyond tr/td blocks.

/// Find the next `<tag ...> ... </tag>` block at or after `from`.
/// Returns `(start, end)` byte offsets of the whole block.
fn next_block(lc: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let mut search = from;
    loop {
        let start = lc.get(search..)?.find(&open)? + search;
        // `<td` must not match `<tdx`; the next byte has to end the tag name
        let after = lc.as_bytes().get(start + open.len()).copied();
        if !matches!(after, Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')) {
            search = start + open.len();
            continue;
        }
        let open_end = lc[start..].find('>')? + start + 1;
        let end = lc[open_end..].find(&close)? + open_end + close.len();
        return Some((start, end));
    }
}

fn inner(block: &str) -> &str {
    match (block.find('>'), block.rfind('<')) {
        (Some(oe), Some(cs)) if cs > oe => &block[oe + 1..cs],
        _ => "",
    }
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&decode_entities(&out))
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", "\u{a0}")
        .replace("&#160;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#36;", "$")
        .replace("&amp;", "&")
}

// Collapse runs of ASCII whitespace; non-breaking spaces are left for the field parser
fn normalize_ws(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of every `<td>` in every `<tr>` of the first `<tbody>`.
/// `None` when the page has no table body at all.
pub fn table_body_cells(html: &str) -> Option<Vec<Vec<String>>> {
    // Lowercasing ASCII keeps byte offsets aligned with the original
    let lc = html.to_ascii_lowercase();
    let (tb_start, tb_end) = next_block(&lc, "tbody", 0)?;

    let mut rows = Vec::new();
    let mut pos = tb_start;
    while let Some((tr_start, tr_end)) = next_block(&lc, "tr", pos) {
        if tr_start >= tb_end {
            break;
        }
        let mut cells = Vec::new();
        let mut cpos = tr_start;
        while let Some((td_start, td_end)) = next_block(&lc, "td", cpos) {
            if td_start >= tr_end {
                break;
            }
            cells.push(strip_tags(inner(&html[td_start..td_end.min(tr_end)])));
            cpos = td_end;
        }
        rows.push(cells);
        pos = tr_end;
    }
    Some(rows)
}
