//! Line oriented driver scripts.
//!
//! One step per line, `#` starts a comment:
//!
//! ```text
//! type AI:Gre      # keystrokes into the focused surface
//! key Enter        # key press, parsed like a hotkey spec
//! fill World       # value for the focused placeholder field
//! wait 200         # let follow-ups run (milliseconds)
//! ```

use anyhow::{Context, Result, bail};
use core_events::KeyEvent;
use core_keymap::{HotkeySpec, Platform};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Type text char by char. `\n` and `\t` escapes are honored.
    Type(String),
    Backspace(usize),
    Key(KeyEvent),
    /// Value for the focused placeholder field.
    Fill(String),
    /// Focus placeholder field `n`.
    Field(usize),
    Pick(usize),
    Hover(usize),
    Caret(usize),
    Blur,
    ClickOutside,
    Toggle,
    Layout,
    Detach,
    Show,
    Wait(Duration),
}

pub fn parse(source: &str, platform: Platform) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    for (n, raw) in source.lines().enumerate() {
        let line = strip_comment(raw).trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let step = parse_line(line.trim_start(), platform).with_context(|| format!("script line {}", n + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

fn strip_comment(line: &str) -> &str {
    match line.find(" #") {
        Some(i) => &line[..i],
        None if line.trim_start().starts_with('#') => "",
        None => line,
    }
}

fn parse_line(line: &str, platform: Platform) -> Result<Step> {
    let (cmd, rest) = match line.split_once(' ') {
        Some((c, r)) => (c, r),
        None => (line, ""),
    };
    let step = match cmd {
        "type" => Step::Type(unescape(rest)),
        "backspace" => Step::Backspace(if rest.trim().is_empty() { 1 } else { number(rest)? }),
        "key" => {
            let spec = HotkeySpec::parse(rest, platform)?;
            Step::Key(KeyEvent::new(spec.key(), spec.mods()))
        }
        "fill" => Step::Fill(unescape(rest)),
        "field" => Step::Field(number(rest)?),
        "pick" => Step::Pick(number(rest)?),
        "hover" => Step::Hover(number(rest)?),
        "caret" => Step::Caret(number(rest)?),
        "blur" => Step::Blur,
        "click-outside" => Step::ClickOutside,
        "toggle" => Step::Toggle,
        "layout" => Step::Layout,
        "detach" => Step::Detach,
        "show" => Step::Show,
        "wait" => Step::Wait(Duration::from_millis(number(rest)? as u64)),
        other => bail!("unknown command `{other}`"),
    };
    Ok(step)
}

fn number(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .with_context(|| format!("expected a number, got `{}`", s.trim()))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
