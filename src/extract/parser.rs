//! Invocation parsing over raw model text
//!
//! All surface forms are recognised in one left-to-right pass. A fragment
//! that fails to parse is skipped from its marker onwards; nothing in here
//! returns an error for untrusted input.

use std::iter::FusedIterator;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marker of the primary directive syntax: `EXECUTE: name(key="value")`
pub const DIRECTIVE_MARKER: &str = "EXECUTE:";

const TOOL_EXECUTION_MARKER: &str = "tool_execution";
const JSON_MARKER: &str = "{";
const FENCE: &str = "```";

const JSON_NAME_KEYS: [&str; 2] = ["tool", "tool_name"];
const JSON_PARAM_KEYS: [&str; 3] = ["parameters", "params", "arguments"];

/// Which syntax an invocation was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceForm {
    /// `EXECUTE: name(...)`
    Directive,
    /// `tool_execution name(...)`, bare or inside a code fence
    ToolExecution,
    /// `{"tool": name, "parameters": {...}}`
    Json,
}

impl SurfaceForm {
    fn marker(self) -> &'static str {
        match self {
            Self::Directive => DIRECTIVE_MARKER,
            Self::ToolExecution => TOOL_EXECUTION_MARKER,
            Self::Json => JSON_MARKER,
        }
    }
}

/// One argument as written; positional arguments have no key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawArgument {
    pub key: Option<String>,
    pub value: String,
}

impl RawArgument {
    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            key: None,
            value: value.into(),
        }
    }
}

/// A candidate tool invocation found in model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInvocation {
    /// Byte range of the invocation in the originating text
    pub span: Range<usize>,
    /// Name exactly as the model wrote it
    pub name: String,
    pub args: Vec<RawArgument>,
    pub form: SurfaceForm,
}

impl RawInvocation {
    /// Value of the first argument written with `key`
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.key.as_deref() == Some(key))
            .map(|a| a.value.as_str())
    }

    /// The slice of `text` this invocation was parsed from
    pub fn source<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.span.clone())
    }
}

/// Lazy iterator over the invocations in a text, in order of appearance
///
/// Cloning yields an independent iterator from the same position, and
/// `rewind` restarts the scan from the beginning.
#[derive(Debug, Clone)]
pub struct Invocations<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Invocations<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    /// Restart the scan from the start of the text
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl Iterator for Invocations<'_> {
    type Item = RawInvocation;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((start, form)) = find_marker(self.text, self.pos) {
            match parse_at(self.text, start, form) {
                Some(invocation) => {
                    self.pos = invocation.span.end.max(start + form.marker().len());
                    return Some(invocation);
                }
                None => {
                    if form != SurfaceForm::Json {
                        log::debug!("Skipping malformed {:?} fragment at offset {}", form, start);
                    }
                    self.pos = start + form.marker().len();
                }
            }
        }
        self.pos = self.text.len();
        None
    }
}

impl FusedIterator for Invocations<'_> {}

/// Scan `text` for tool invocations in any tolerated syntax
pub fn extract_invocations(text: &str) -> Invocations<'_> {
    Invocations::new(text)
}

/// Remove every recognised invocation from `text`, leaving the prose
pub fn strip_invocations(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for invocation in extract_invocations(text) {
        let start = invocation.span.start.max(last);
        out.push_str(&text[last..start]);
        last = last.max(invocation.span.end);
    }
    out.push_str(&text[last..]);
    tidy(&out)
}

/// Collapse the blank runs left behind by removed invocations
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.is_empty() && lines.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

fn find_marker(text: &str, from: usize) -> Option<(usize, SurfaceForm)> {
    let rest = text.get(from..)?;
    [SurfaceForm::Directive, SurfaceForm::ToolExecution, SurfaceForm::Json]
        .into_iter()
        .filter_map(|form| rest.find(form.marker()).map(|i| (from + i, form)))
        .min_by_key(|(i, _)| *i)
}

fn parse_at(text: &str, start: usize, form: SurfaceForm) -> Option<RawInvocation> {
    let invocation = match form {
        SurfaceForm::Directive => parse_directive(text, start),
        SurfaceForm::ToolExecution => parse_tool_execution(text, start),
        SurfaceForm::Json => parse_json(text, start),
    }?;
    if form != SurfaceForm::Directive {
        log::debug!("Accepted {:?} invocation of '{}'", form, invocation.name);
    }
    Some(invocation)
}

fn parse_directive(text: &str, start: usize) -> Option<RawInvocation> {
    let mut cur = Cursor::new(text, start + DIRECTIVE_MARKER.len());
    // Tolerate markdown decoration such as `**EXECUTE:** name(...)`
    cur.skip_while(|c| c.is_whitespace() || c == '*' || c == '`');
    let (name, args) = parse_call(&mut cur)?;
    Some(RawInvocation {
        span: start..cur.pos,
        name,
        args,
        form: SurfaceForm::Directive,
    })
}

fn parse_tool_execution(text: &str, start: usize) -> Option<RawInvocation> {
    let preceded_by_word = text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_');
    if preceded_by_word {
        return None;
    }

    let mut cur = Cursor::new(text, start + TOOL_EXECUTION_MARKER.len());
    cur.skip_while(|c| c.is_whitespace() || c == ':');
    let (name, args) = parse_call(&mut cur)?;

    let mut span = start..cur.pos;
    if text[..start].ends_with(FENCE) {
        span.start = start - FENCE.len();
        let mut close = cur.clone();
        close.skip_while(char::is_whitespace);
        if close.rest().starts_with(FENCE) {
            span.end = close.pos + FENCE.len();
        }
    }

    Some(RawInvocation {
        span,
        name,
        args,
        form: SurfaceForm::ToolExecution,
    })
}

fn parse_json(text: &str, start: usize) -> Option<RawInvocation> {
    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    let value = stream.next()?.ok()?;
    let end = start + stream.byte_offset();

    let object = value.as_object()?;
    let name = JSON_NAME_KEYS
        .iter()
        .find_map(|k| object.get(*k).and_then(Value::as_str))?
        .trim();
    if !is_valid_name(name) {
        return None;
    }

    let params = JSON_PARAM_KEYS.iter().find_map(|k| object.get(*k)).and_then(json_params);
    let args = params
        .map(|p| {
            p.into_iter()
                .filter_map(|(k, v)| json_arg_text(v).map(|value| RawArgument::keyed(k, value)))
                .collect()
        })
        .unwrap_or_default();

    Some(RawInvocation {
        span: start..end,
        name: name.to_string(),
        args,
        form: SurfaceForm::Json,
    })
}

/// Parameters as an object, or as a string holding one
fn json_params(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

fn json_arg_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

/// `name(args...)` starting at the cursor
fn parse_call(cur: &mut Cursor<'_>) -> Option<(String, Vec<RawArgument>)> {
    let name = parse_name(cur)?;
    cur.skip_while(|c| c == ' ' || c == '\t');
    if !cur.eat('(') {
        return None;
    }

    let mut args = Vec::new();
    loop {
        cur.skip_while(char::is_whitespace);
        if cur.eat(')') {
            return Some((name, args));
        }
        let arg = parse_argument(cur)?;
        if arg.key.is_some() || !arg.value.is_empty() {
            args.push(arg);
        }
        cur.skip_while(char::is_whitespace);
        if cur.eat(',') {
            continue;
        }
        if cur.eat(')') {
            return Some((name, args));
        }
        return None;
    }
}

fn parse_name(cur: &mut Cursor<'_>) -> Option<String> {
    if !cur.peek().is_some_and(is_name_start) {
        return None;
    }
    Some(cur.skip_while(is_name_char).to_string())
}

fn parse_argument(cur: &mut Cursor<'_>) -> Option<RawArgument> {
    let checkpoint = cur.pos;
    let key = if cur.peek().is_some_and(is_name_start) {
        let ident = cur.skip_while(|c| c.is_ascii_alphanumeric() || c == '_');
        cur.skip_while(char::is_whitespace);
        if cur.eat('=') {
            Some(ident.to_string())
        } else {
            cur.pos = checkpoint;
            None
        }
    } else {
        None
    };

    cur.skip_while(char::is_whitespace);
    let value = match cur.peek()? {
        quote @ ('"' | '\'') => {
            cur.bump();
            parse_quoted(cur, quote)?
        }
        _ => parse_bare(cur)?,
    };
    Some(RawArgument { key, value })
}

fn parse_quoted(cur: &mut Cursor<'_>, quote: char) -> Option<String> {
    let mut value = String::new();
    loop {
        match cur.bump()? {
            '\\' => match cur.bump()? {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                c @ ('"' | '\'' | '\\') => value.push(c),
                c => {
                    value.push('\\');
                    value.push(c);
                }
            },
            c if c == quote => return Some(value),
            c => value.push(c),
        }
    }
}

/// Unquoted token up to the next top-level `,` or `)`; must stay on one line
fn parse_bare(cur: &mut Cursor<'_>) -> Option<String> {
    let start = cur.pos;
    let mut depth = 0usize;
    loop {
        match cur.peek()? {
            '\n' => return None,
            ',' if depth == 0 => break,
            ')' if depth == 0 => break,
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        cur.bump();
    }
    Some(cur.text[start..cur.pos].trim().to_string())
}

#[derive(Debug, Clone)]
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    /// Advance while `pred` holds, returning the consumed slice
    fn skip_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.text[start..self.pos]
    }
}
