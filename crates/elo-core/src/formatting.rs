/// Escape HTML special characters for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `+20`, `-15`, `0`.
pub fn signed(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

/// Split a message into chunks of at most `limit` bytes, breaking on line
/// boundaries. Reports are line-oriented and tags never span lines, so each
/// chunk stays valid HTML. A single over-long line is cut on a char boundary.
pub fn split_lines(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();

    for line in text.split('\n') {
        let needed = if chunk.is_empty() {
            line.len()
        } else {
            chunk.len() + 1 + line.len()
        };
        if needed <= limit {
            if !chunk.is_empty() {
                chunk.push('\n');
            }
            chunk.push_str(line);
            continue;
        }

        if !chunk.is_empty() {
            out.push(std::mem::take(&mut chunk));
        }

        let mut rest = line;
        while rest.len() > limit {
            let mut cut = limit;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            out.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        chunk.push_str(rest);
    }

    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_nickname_markup() {
        assert_eq!(escape_html("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn signed_deltas() {
        assert_eq!(signed(20), "+20");
        assert_eq!(signed(-15), "-15");
        assert_eq!(signed(0), "0");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_lines("a\nb", 100), vec!["a\nb".to_string()]);
    }

    #[test]
    fn splits_on_line_boundaries_under_limit() {
        let text = (1..=50)
            .map(|i| format!("{i}. player{i} — 2000 ELO (+10)"))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_lines(&text, 120);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 120));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn cuts_overlong_line_on_char_boundary() {
        let line = "é".repeat(10); // 20 bytes
        let chunks = split_lines(&line, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), line);
    }
}
