//! Colon-segmented action pattern matching.
//!
//! A pattern is a sequence of colon-delimited segments; each segment is
//! either a literal or the single character `*`, which matches exactly one
//! segment. The one documented exception is the empty-segment / trailing
//! star interaction from consecutive colons — see `segments_match` below
//! and the accompanying tests for the exact cases this resolves.

/// `true` if `pattern` matches `action` under the per-segment wildcard
/// grammar. Matching is case-sensitive; `*` never spans a colon boundary
/// except for the documented empty-middle-segment case.
pub fn matches(pattern: &str, action: &str) -> bool {
    let pat_segs: Vec<&str> = pattern.split(':').collect();
    let act_segs: Vec<&str> = action.split(':').collect();
    segments_match(&pat_segs, &act_segs)
}

/// Rule-level convention: a bare `*` action entry (no colons) means "any
/// action whatsoever", including multi-segment ones. This is a rule
/// authoring shortcut, not a property of the segment matcher itself —
/// `matches("*", "a:b")` is `false`, but a rule listing `"*"` in its
/// `actions` array matches `a:b` via this function instead.
pub fn is_match_any(pattern: &str) -> bool {
    pattern == "*"
}

/// A pattern compiled once at index-build time: the match-any convention is
/// resolved and the colon segments are pre-split, so a per-request match
/// only has to split the action side.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    MatchAny,
    Segments(Vec<String>),
}

pub fn compile(pattern: &str) -> CompiledPattern {
    if is_match_any(pattern) {
        CompiledPattern::MatchAny
    } else {
        CompiledPattern::Segments(pattern.split(':').map(str::to_string).collect())
    }
}

pub fn matches_compiled(pattern: &CompiledPattern, action: &str) -> bool {
    match pattern {
        CompiledPattern::MatchAny => true,
        CompiledPattern::Segments(segments) => {
            let pat_segs: Vec<&str> = segments.iter().map(String::as_str).collect();
            let act_segs: Vec<&str> = action.split(':').collect();
            segments_match(&pat_segs, &act_segs)
        }
    }
}

/// Recursive per-segment matcher.
///
/// A `*` segment that is not the last pattern segment consumes exactly one
/// non-empty action segment. A `*` that IS the last pattern segment first
/// skips over any run of empty action segments that has more content after
/// it, then requires the final remaining segment to be non-empty and to be
/// the last one left — this is what makes `prefix:*` reject `prefix:` (a
/// lone trailing empty segment) while accepting `prefix::read` (an empty
/// segment followed by more content).
fn segments_match(pattern: &[&str], action: &[&str]) -> bool {
    match pattern.split_first() {
        None => action.is_empty(),
        Some((&p, prest)) if p != "*" => match action.split_first() {
            Some((&a, arest)) if a == p => segments_match(prest, arest),
            _ => false,
        },
        Some((_, prest)) if prest.is_empty() => {
            // Trailing star.
            let mut rest = action;
            while let Some((&first, more)) = rest.split_first() {
                if first.is_empty() && !more.is_empty() {
                    rest = more;
                } else {
                    break;
                }
            }
            match rest.split_first() {
                Some((&seg, more)) => !seg.is_empty() && more.is_empty(),
                None => false,
            }
        }
        Some((_, prest)) => {
            // Middle star: exactly one non-empty segment.
            match action.split_first() {
                Some((&seg, arest)) if !seg.is_empty() => segments_match(prest, arest),
                _ => false,
            }
        }
    }
}
