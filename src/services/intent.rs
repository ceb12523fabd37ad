use crate::models::ActionPayload;

/// Longest candidate span the fallback scanner will consider; protects
/// against pathological unbalanced input.
const MAX_CANDIDATE_BYTES: usize = 2000;

/// Pulls structured action blocks out of the assistant's free text, in
/// order of appearance. Fenced ```json blocks win; only when none parse do
/// we fall back to scanning for bare `{...}` objects carrying an "action"
/// key. Malformed candidates are discarded silently — extraction never
/// fails, it just finds fewer actions.
pub fn extract_actions(text: &str) -> Vec<ActionPayload> {
    let fenced = fenced_blocks(text);
    if !fenced.is_empty() {
        return fenced;
    }
    brace_candidates(text)
}

fn fenced_blocks(text: &str) -> Vec<ActionPayload> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(open) = find_ascii_ci(text, "```json", pos) {
        let body_start = open + "```json".len();
        let Some(close) = find_ascii_ci(text, "```", body_start) else {
            break;
        };
        push_candidate(&mut out, &text[body_start..close]);
        pos = close + 3;
    }

    out
}

/// Bracket-depth scan for balanced `{...}` spans. Depth tracking skips
/// string contents so braces inside values don't confuse it.
fn brace_candidates(text: &str) -> Vec<ActionPayload> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }

        match balanced_end(bytes, i) {
            Some(end) => {
                let span = &text[i..=end];
                let parsed_before = out.len();
                if span.contains("\"action\"") {
                    push_candidate(&mut out, span);
                }
                if out.len() > parsed_before {
                    i = end + 1;
                } else {
                    // Not a usable object; re-scan from the next brace in
                    // case a real one starts inside this span.
                    i += 1;
                }
            }
            None => i += 1,
        }
    }

    out
}

/// Index of the `}` closing the `{` at `open`, if balanced within the
/// lookahead bound.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let limit = (open + MAX_CANDIDATE_BYTES).min(bytes.len());
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (j, &c) in bytes.iter().enumerate().take(limit).skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'"' {
                in_string = false;
            }
            continue;
        }
        match c {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j);
                }
            }
            _ => {}
        }
    }
    None
}

fn push_candidate(out: &mut Vec<ActionPayload>, span: &str) {
    if let Ok(payload) = serde_json::from_str::<ActionPayload>(span.trim()) {
        if !payload.action.is_empty() {
            out.push(payload);
        }
    }
}

/// Case-insensitive ASCII substring search; safe to slice at the returned
/// offset since the needle is pure ASCII.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes().get(from..)?;
    let needle = needle.as_bytes();
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}
