// Backtracking matcher over raw bytes
//
// The pattern is interpreted directly while matching. Captures live in a
// fixed array inside MatchState, so one attempt never allocates.

use super::class::{element_end, singlematch};
use crate::lua_vm::lua_limits::{LUA_MAXCAPTURES, MAXCCALLS_PATTERN};
use crate::lua_vm::{LuaError, LuaResult};

/// Check if pattern has no special characters (can be matched as plain text).
#[inline]
pub fn is_plain_pattern(pat: &[u8]) -> bool {
    !pat.iter().any(|&c| {
        matches!(
            c,
            b'%' | b'.' | b'[' | b'*' | b'+' | b'-' | b'?' | b'^' | b'$' | b'(' | b')' | b']'
        )
    })
}

fn pattern_error(message: impl Into<String>) -> LuaError {
    LuaError::Pattern(message.into())
}

/// Validate a pattern for syntax errors before matching.
fn validate_pattern(pat: &[u8]) -> LuaResult<()> {
    let mut i = 0;
    while i < pat.len() {
        match pat[i] {
            b'%' => {
                if i + 1 >= pat.len() {
                    return Err(pattern_error("malformed pattern (ends with '%')"));
                }
                match pat[i + 1] {
                    b'b' => {
                        if i + 3 >= pat.len() {
                            return Err(pattern_error("malformed pattern (missing arguments to '%b')"));
                        }
                        i += 4;
                    }
                    b'f' => {
                        i += 2;
                        if i >= pat.len() || pat[i] != b'[' {
                            return Err(pattern_error("missing '[' after '%f' in pattern"));
                        }
                        i = validate_set(pat, i)?;
                    }
                    _ => i += 2,
                }
            }
            b'[' => i = validate_set(pat, i)?,
            _ => i += 1,
        }
    }
    Ok(())
}

/// Validate a [set] starting at pat[i] (i points to '['). Returns index past ']'.
fn validate_set(pat: &[u8], i: usize) -> LuaResult<usize> {
    let mut j = i + 1;
    if j < pat.len() && pat[j] == b'^' {
        j += 1;
    }
    // The first member is taken literally, so a leading ']' does not close
    loop {
        if j >= pat.len() {
            return Err(pattern_error("malformed pattern (missing ']')"));
        }
        if pat[j] == b'%' {
            j += 1;
            if j >= pat.len() {
                return Err(pattern_error("malformed pattern (missing ']')"));
            }
        }
        j += 1;
        if j < pat.len() && pat[j] == b']' {
            return Ok(j + 1);
        }
    }
}

/// Capture length: a byte count, a position marker, or still open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureLen {
    Len(usize),
    Position,
    Unfinished,
}

/// A single capture slot
#[derive(Debug, Clone, Copy)]
struct Capture {
    start: usize,
    len: CaptureLen,
}

/// Everything one match attempt needs
struct MatchState<'a> {
    text: &'a [u8],
    pat: &'a [u8],
    captures: [Capture; LUA_MAXCAPTURES],
    level: usize,
    depth: usize,
    // hard error raised mid-match (aborts all backtracking)
    error: Option<LuaError>,
}

impl<'a> MatchState<'a> {
    fn new(text: &'a [u8], pat: &'a [u8]) -> Self {
        Self {
            text,
            pat,
            captures: [Capture {
                start: 0,
                len: CaptureLen::Unfinished,
            }; LUA_MAXCAPTURES],
            level: 0,
            depth: 0,
            error: None,
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.level = 0;
        self.depth = 0;
        self.error = None;
    }

    fn fail(&mut self, message: impl Into<String>) -> Option<usize> {
        if self.error.is_none() {
            self.error = Some(pattern_error(message));
        }
        None
    }

    /// Run one anchored attempt at `si`; hard errors surface as `Err`.
    fn attempt(&mut self, si: usize, pp: usize) -> LuaResult<Option<usize>> {
        self.reset();
        let result = match_impl(self, si, pp);
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }
}

/// Try to match pattern starting at `pat[pp]` against text starting at `text[si]`.
/// Returns `Some(end)` on success (index past the match), `None` on failure.
fn match_impl(ms: &mut MatchState, si: usize, pp: usize) -> Option<usize> {
    if ms.error.is_some() {
        return None;
    }
    ms.depth += 1;
    if ms.depth > MAXCCALLS_PATTERN {
        ms.depth -= 1;
        return ms.fail("pattern too complex");
    }

    let result = match_inner(ms, si, pp);
    ms.depth -= 1;
    result
}

fn match_inner(ms: &mut MatchState, mut si: usize, mut pp: usize) -> Option<usize> {
    // Sequential single elements loop instead of recursing
    loop {
        if pp >= ms.pat.len() {
            return Some(si);
        }

        match ms.pat[pp] {
            b'(' => {
                return if pp + 1 < ms.pat.len() && ms.pat[pp + 1] == b')' {
                    start_capture(ms, si, pp + 2, CaptureLen::Position)
                } else {
                    start_capture(ms, si, pp + 1, CaptureLen::Unfinished)
                };
            }
            b')' => return close_capture(ms, si, pp + 1),
            b'$' if pp + 1 == ms.pat.len() => {
                return (si == ms.text.len()).then_some(si);
            }
            b'%' => match ms.pat[pp + 1] {
                b'b' => return match_balanced(ms, si, pp),
                b'f' => return match_frontier(ms, si, pp),
                c if c.is_ascii_digit() => return match_backref(ms, si, pp),
                _ => {}
            },
            _ => {}
        }

        // Normal pattern element (literal, `.`, `%class`, `[set]`)
        let ep = element_end(ms.pat, pp);

        if ep < ms.pat.len() {
            match ms.pat[ep] {
                b'*' => return match_greedy(ms, si, pp, ep, 0),
                b'+' => return match_greedy(ms, si, pp, ep, 1),
                b'-' => return match_lazy(ms, si, pp, ep),
                b'?' => return match_optional(ms, si, pp, ep),
                _ => {}
            }
        }

        if si < ms.text.len() && singlematch(ms.text[si], ms.pat, pp) {
            si += 1;
            pp = ep;
            continue;
        }
        return None;
    }
}

/// Greedy repetition (`*`, `+`): take the longest run, then back off one
/// byte at a time. `min` is 0 for `*`, 1 for `+`.
fn match_greedy(ms: &mut MatchState, si: usize, pp: usize, ep: usize, min: usize) -> Option<usize> {
    let mut count = 0;
    while si + count < ms.text.len() && singlematch(ms.text[si + count], ms.pat, pp) {
        count += 1;
    }
    while count >= min {
        if let Some(end) = match_impl(ms, si + count, ep + 1) {
            return Some(end);
        }
        if count == 0 || ms.error.is_some() {
            break;
        }
        count -= 1;
    }
    None
}

/// Lazy repetition (`-`): try the continuation first, consume one more
/// byte only when it fails.
fn match_lazy(ms: &mut MatchState, si: usize, pp: usize, ep: usize) -> Option<usize> {
    let mut i = si;
    loop {
        if let Some(end) = match_impl(ms, i, ep + 1) {
            return Some(end);
        }
        if ms.error.is_none() && i < ms.text.len() && singlematch(ms.text[i], ms.pat, pp) {
            i += 1;
        } else {
            return None;
        }
    }
}

/// Optional element (`?`)
fn match_optional(ms: &mut MatchState, si: usize, pp: usize, ep: usize) -> Option<usize> {
    if si < ms.text.len()
        && singlematch(ms.text[si], ms.pat, pp)
        && let Some(end) = match_impl(ms, si + 1, ep + 1)
    {
        return Some(end);
    }
    match_impl(ms, si, ep + 1)
}

/// Open a capture (`(` or the position capture `()`)
fn start_capture(ms: &mut MatchState, si: usize, pp: usize, len: CaptureLen) -> Option<usize> {
    let n = ms.level;
    if n >= LUA_MAXCAPTURES {
        return ms.fail("too many captures");
    }
    ms.captures[n] = Capture { start: si, len };
    ms.level = n + 1;
    let result = match_impl(ms, si, pp);
    if result.is_none() {
        ms.level = n; // undo
    }
    result
}

/// Close the most recent unfinished capture
fn close_capture(ms: &mut MatchState, si: usize, pp: usize) -> Option<usize> {
    let Some(n) = (0..ms.level)
        .rev()
        .find(|&i| ms.captures[i].len == CaptureLen::Unfinished)
    else {
        return ms.fail("invalid pattern capture");
    };
    ms.captures[n].len = CaptureLen::Len(si - ms.captures[n].start);
    let result = match_impl(ms, si, pp);
    if result.is_none() {
        ms.captures[n].len = CaptureLen::Unfinished;
    }
    result
}

/// Balanced match `%bxy`
fn match_balanced(ms: &mut MatchState, si: usize, pp: usize) -> Option<usize> {
    let open = ms.pat[pp + 2];
    let close = ms.pat[pp + 3];
    if si >= ms.text.len() || ms.text[si] != open {
        return None;
    }

    let mut depth = 1usize;
    let mut i = si + 1;
    while i < ms.text.len() {
        let c = ms.text[i];
        if c == close {
            depth -= 1;
            if depth == 0 {
                return match_impl(ms, i + 1, pp + 4);
            }
        } else if c == open {
            depth += 1;
        }
        i += 1;
    }
    None
}

/// Frontier `%f[set]`: the previous byte is outside the set and the current
/// one inside. Subject boundaries count as `\0`.
fn match_frontier(ms: &mut MatchState, si: usize, pp: usize) -> Option<usize> {
    let set_start = pp + 2;
    let set_end = element_end(ms.pat, set_start);

    let prev = if si > 0 { ms.text[si - 1] } else { 0 };
    let curr = if si < ms.text.len() { ms.text[si] } else { 0 };

    if !singlematch(prev, ms.pat, set_start) && singlematch(curr, ms.pat, set_start) {
        match_impl(ms, si, set_end)
    } else {
        None
    }
}

/// Back reference `%1`-`%9`
fn match_backref(ms: &mut MatchState, si: usize, pp: usize) -> Option<usize> {
    let n = (ms.pat[pp + 1] - b'0') as usize;
    if n == 0 || n > ms.level || ms.captures[n - 1].len == CaptureLen::Unfinished {
        return ms.fail(format!("invalid capture index %{}", n));
    }
    let cap = ms.captures[n - 1];
    // A position capture never matches text
    let CaptureLen::Len(len) = cap.len else {
        return None;
    };
    if ms.text.len() - si < len {
        return None;
    }
    if ms.text[si..si + len] != ms.text[cap.start..cap.start + len] {
        return None;
    }
    match_impl(ms, si + len, pp + 2)
}

// ======================== Public API ========================

/// A capture value returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureValue {
    Substring(usize, usize), // byte start, byte end in source text
    Position(usize),         // 1-based byte position
}

/// Captures of one match, stored inline
#[derive(Debug, Clone, Copy)]
pub struct CaptureResults {
    data: [CaptureValue; LUA_MAXCAPTURES],
    count: usize,
}

impl CaptureResults {
    #[inline(always)]
    pub fn new() -> Self {
        Self {
            data: [CaptureValue::Substring(0, 0); LUA_MAXCAPTURES],
            count: 0,
        }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, CaptureValue> {
        self.data[..self.count].iter()
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<&CaptureValue> {
        self.data[..self.count].get(index)
    }
}

impl Default for CaptureResults {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a CaptureResults {
    type Item = &'a CaptureValue;
    type IntoIter = std::slice::Iter<'a, CaptureValue>;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Information about a single match
#[derive(Debug, Clone)]
pub struct MatchInfo {
    pub start: usize, // byte offset
    pub end: usize,   // byte offset, exclusive
    pub captures: CaptureResults,
}

impl MatchInfo {
    /// Capture `n` (0-based), or the whole match when the pattern has no
    /// captures and `n == 0`.
    pub fn capture_or_whole(&self, n: usize) -> Option<CaptureValue> {
        if self.captures.is_empty() && n == 0 {
            Some(CaptureValue::Substring(self.start, self.end))
        } else {
            self.captures.get(n).copied()
        }
    }
}

/// Collect captures of a successful attempt, rejecting unclosed ones.
fn extract_captures(ms: &MatchState) -> LuaResult<CaptureResults> {
    let mut result = CaptureResults::new();
    for cap in &ms.captures[..ms.level] {
        result.data[result.count] = match cap.len {
            CaptureLen::Position => CaptureValue::Position(cap.start + 1),
            CaptureLen::Len(len) => CaptureValue::Substring(cap.start, cap.start + len),
            CaptureLen::Unfinished => return Err(pattern_error("unfinished capture")),
        };
        result.count += 1;
    }
    Ok(result)
}

/// Find a byte string in a byte slice.
#[inline]
pub fn find_plain(haystack: &[u8], needle: &[u8], init: usize) -> Option<usize> {
    if init > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(init);
    }
    haystack[init..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| init + pos)
}

/// Find the first match of `pat` in `text` at or after byte offset `init`
/// (0-based). A leading `^` anchors the match at `init`.
pub fn find(text: &[u8], pat: &[u8], init: usize) -> LuaResult<Option<MatchInfo>> {
    if init > text.len() {
        return Ok(None);
    }

    // No specials: plain substring search
    if is_plain_pattern(pat) {
        return Ok(find_plain(text, pat, init).map(|start| MatchInfo {
            start,
            end: start + pat.len(),
            captures: CaptureResults::new(),
        }));
    }

    validate_pattern(pat)?;
    let anchored = pat.first() == Some(&b'^');
    let pp_start = anchored as usize;

    let mut ms = MatchState::new(text, pat);
    let mut si = init;
    loop {
        if let Some(end) = ms.attempt(si, pp_start)? {
            return Ok(Some(MatchInfo {
                start: si,
                end,
                captures: extract_captures(&ms)?,
            }));
        }
        if anchored || si >= text.len() {
            return Ok(None);
        }
        si += 1;
    }
}

/// Iteration state for successive matches over one subject (`gmatch`).
///
/// An empty match ending where the previous match ended is skipped, so
/// iteration always makes progress.
#[derive(Debug, Clone)]
pub struct GMatch {
    pos: usize,
    last_match: Option<usize>,
}

impl GMatch {
    pub fn new(init: usize) -> Self {
        Self {
            pos: init,
            last_match: None,
        }
    }

    /// Next match in `text`, or `None` once the subject is exhausted.
    /// `^` has no anchoring meaning here.
    pub fn next_match(&mut self, text: &[u8], pat: &[u8]) -> LuaResult<Option<MatchInfo>> {
        validate_pattern(pat)?;
        let mut ms = MatchState::new(text, pat);
        let mut si = self.pos;
        while si <= text.len() {
            if let Some(end) = ms.attempt(si, 0)?
                && Some(end) != self.last_match
            {
                self.pos = end;
                self.last_match = Some(end);
                return Ok(Some(MatchInfo {
                    start: si,
                    end,
                    captures: extract_captures(&ms)?,
                }));
            }
            si += 1;
        }
        self.pos = text.len() + 1;
        Ok(None)
    }
}

/// Global substitution. For each match, `replace` receives the match and
/// returns the replacement bytes, or `None` to keep the matched text.
/// Returns the new text and the number of matches.
pub fn gsub<F>(text: &[u8], pat: &[u8], max: Option<usize>, mut replace: F) -> LuaResult<(Vec<u8>, usize)>
where
    F: FnMut(&MatchInfo) -> LuaResult<Option<Vec<u8>>>,
{
    validate_pattern(pat)?;
    let anchored = pat.first() == Some(&b'^');
    let pp_start = anchored as usize;
    let max = max.unwrap_or(usize::MAX);

    let mut result = Vec::with_capacity(text.len());
    let mut count = 0usize;
    let mut ms = MatchState::new(text, pat);
    let mut si = 0usize;
    let mut last_match: Option<usize> = None;

    while count < max {
        let matched = ms.attempt(si, pp_start)?.filter(|&end| Some(end) != last_match);
        if let Some(end) = matched {
            count += 1;
            let info = MatchInfo {
                start: si,
                end,
                captures: extract_captures(&ms)?,
            };
            match replace(&info)? {
                Some(bytes) => result.extend_from_slice(&bytes),
                None => result.extend_from_slice(&text[si..end]),
            }
            si = end;
            last_match = Some(end);
        } else if si < text.len() {
            result.push(text[si]);
            si += 1;
        } else {
            break;
        }
        if anchored {
            break;
        }
    }

    result.extend_from_slice(&text[si.min(text.len())..]);
    Ok((result, count))
}

/// Expand a replacement template: `%0` is the whole match, `%1`-`%9` the
/// captures (`%1` is the whole match when there are none), `%%` a percent.
pub fn expand_template(template: &[u8], text: &[u8], m: &MatchInfo) -> LuaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(template.len());
    let mut i = 0;
    while i < template.len() {
        let c = template[i];
        if c != b'%' {
            // Copy the literal run up to the next '%'
            let start = i;
            while i < template.len() && template[i] != b'%' {
                i += 1;
            }
            out.extend_from_slice(&template[start..i]);
            continue;
        }

        match template.get(i + 1) {
            Some(b'%') => out.push(b'%'),
            Some(b'0') => out.extend_from_slice(&text[m.start..m.end]),
            Some(&d) if d.is_ascii_digit() => {
                let n = (d - b'0') as usize;
                match m.capture_or_whole(n - 1) {
                    Some(CaptureValue::Substring(s, e)) => out.extend_from_slice(&text[s..e]),
                    Some(CaptureValue::Position(p)) => {
                        let mut buffer = itoa::Buffer::new();
                        out.extend_from_slice(buffer.format(p).as_bytes());
                    }
                    None => {
                        return Err(pattern_error(format!(
                            "invalid capture index %{} in replacement string",
                            n
                        )));
                    }
                }
            }
            _ => return Err(pattern_error("invalid use of '%' in replacement string")),
        }
        i += 2;
    }
    Ok(out)
}
