//! core-keymap: hotkey specification parsing and matching.
//!
//! A specification is `modifier+...+key` (e.g. `Ctrl+Shift+P`). Tokens are
//! case-insensitive; `cmd`/`command` mean meta, `control` means ctrl,
//! `option` means alt, and the pseudo modifier `mod` resolves to meta on
//! mac-like platforms and ctrl elsewhere. Matching is exact on modifiers: an
//! event holding an extra modifier does not match. The one exception is for
//! mac-like platforms, where a spec asking for ctrl also accepts meta.

use core_events::{KeyEvent, KeyToken, ModMask, NamedKey};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    MacLike,
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(any(target_os = "macos", target_os = "ios")) {
            Platform::MacLike
        } else {
            Platform::Other
        }
    }

    fn primary_modifier(self) -> ModMask {
        match self {
            Platform::MacLike => ModMask::META,
            Platform::Other => ModMask::CTRL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyError {
    #[error("hotkey specification is empty")]
    Empty,
    #[error("hotkey `{0}` has no main key")]
    MissingKey(String),
    #[error("hotkey `{0}` names more than one main key")]
    MultipleKeys(String),
    #[error("unknown hotkey token `{0}`")]
    UnknownToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeySpec {
    mods: ModMask,
    key: KeyToken,
    platform: Platform,
}

enum Token {
    Modifier(ModMask),
    Key(KeyToken),
}

impl HotkeySpec {
    pub fn parse(spec: &str, platform: Platform) -> Result<Self, HotkeyError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(HotkeyError::Empty);
        }
        let mut parts: SmallVec<[&str; 4]> = if trimmed == "+" {
            SmallVec::from_slice(&["+"])
        } else {
            trimmed.split('+').map(str::trim).collect()
        };
        // `Ctrl++` binds the plus key itself.
        if trimmed.len() > 1 && trimmed.ends_with("++") {
            parts.truncate(parts.len().saturating_sub(2));
            parts.push("+");
        }

        let mut mods = ModMask::empty();
        let mut key = None;
        for part in parts {
            match classify(part, platform)? {
                Token::Modifier(m) => mods |= m,
                Token::Key(k) => {
                    if key.replace(k).is_some() {
                        return Err(HotkeyError::MultipleKeys(trimmed.to_string()));
                    }
                }
            }
        }
        let key = key.ok_or_else(|| HotkeyError::MissingKey(trimmed.to_string()))?;
        debug!(target: "keymap", mods = ?mods, key = ?key, "hotkey_parsed");
        Ok(Self {
            mods,
            key,
            platform,
        })
    }

    pub fn mods(&self) -> ModMask {
        self.mods
    }

    pub fn key(&self) -> KeyToken {
        self.key
    }

    pub fn matches(&self, ev: &KeyEvent) -> bool {
        if !self.key.same_key(&ev.key) {
            return false;
        }
        if ev.mods == self.mods {
            return true;
        }
        self.platform == Platform::MacLike
            && self.mods.contains(ModMask::CTRL)
            && !self.mods.contains(ModMask::META)
            && ev.mods.contains(ModMask::META)
            && !ev.mods.contains(ModMask::CTRL)
            && ev.mods.difference(ModMask::META) == self.mods.difference(ModMask::CTRL)
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (ModMask::CTRL, "Ctrl"),
            (ModMask::ALT, "Alt"),
            (ModMask::SHIFT, "Shift"),
            (ModMask::META, "Meta"),
        ] {
            if self.mods.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        match self.key {
            KeyToken::Char(' ') => f.write_str("Space"),
            KeyToken::Char(c) => write!(f, "{}", c.to_uppercase()),
            KeyToken::Named(NamedKey::F(n)) => write!(f, "F{n}"),
            KeyToken::Named(k) => write!(f, "{k:?}"),
        }
    }
}

fn classify(part: &str, platform: Platform) -> Result<Token, HotkeyError> {
    let lower = part.to_lowercase();
    let m = match lower.as_str() {
        "ctrl" | "control" => Some(ModMask::CTRL),
        "alt" | "option" | "opt" => Some(ModMask::ALT),
        "shift" => Some(ModMask::SHIFT),
        "meta" | "cmd" | "command" => Some(ModMask::META),
        "mod" => Some(platform.primary_modifier()),
        _ => None,
    };
    if let Some(m) = m {
        return Ok(Token::Modifier(m));
    }
    key_token(&lower)
        .map(Token::Key)
        .ok_or_else(|| HotkeyError::UnknownToken(part.to_string()))
}

fn key_token(lower: &str) -> Option<KeyToken> {
    let mut chars = lower.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyToken::Char(c));
    }
    let named = match lower {
        "space" => return Some(KeyToken::Char(' ')),
        "enter" | "return" => NamedKey::Enter,
        "esc" | "escape" => NamedKey::Esc,
        "tab" => NamedKey::Tab,
        "backspace" => NamedKey::Backspace,
        "delete" | "del" => NamedKey::Delete,
        "insert" => NamedKey::Insert,
        "up" | "arrowup" => NamedKey::Up,
        "down" | "arrowdown" => NamedKey::Down,
        "left" | "arrowleft" => NamedKey::Left,
        "right" | "arrowright" => NamedKey::Right,
        "home" => NamedKey::Home,
        "end" => NamedKey::End,
        "pageup" => NamedKey::PageUp,
        "pagedown" => NamedKey::PageDown,
        f if f.starts_with('f') => {
            let n: u8 = f[1..].parse().ok()?;
            if !(1..=24).contains(&n) {
                return None;
            }
            NamedKey::F(n)
        }
        _ => return None,
    };
    Some(KeyToken::Named(named))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(c: char, mods: ModMask) -> KeyEvent {
        KeyEvent::char(c).with_mods(mods)
    }

    #[test]
    fn parses_default_hotkey() {
        let s = HotkeySpec::parse("Ctrl+Shift+P", Platform::Other).unwrap();
        assert_eq!(s.mods(), ModMask::CTRL | ModMask::SHIFT);
        assert_eq!(s.key(), KeyToken::Char('p'));
        assert_eq!(s.to_string(), "Ctrl+Shift+P");
    }

    #[test]
    fn synonyms_and_case() {
        let a = HotkeySpec::parse("command+OPTION+k", Platform::Other).unwrap();
        assert_eq!(a.mods(), ModMask::META | ModMask::ALT);
        let b = HotkeySpec::parse("control + space", Platform::Other).unwrap();
        assert_eq!(b.mods(), ModMask::CTRL);
        assert_eq!(b.key(), KeyToken::Char(' '));
    }

    #[test]
    fn mod_resolves_per_platform() {
        let mac = HotkeySpec::parse("Mod+K", Platform::MacLike).unwrap();
        let other = HotkeySpec::parse("Mod+K", Platform::Other).unwrap();
        assert_eq!(mac.mods(), ModMask::META);
        assert_eq!(other.mods(), ModMask::CTRL);
    }

    #[test]
    fn named_keys() {
        for (text, expect) in [
            ("Alt+Enter", NamedKey::Enter),
            ("Alt+Return", NamedKey::Enter),
            ("Ctrl+ArrowDown", NamedKey::Down),
            ("Shift+F12", NamedKey::F(12)),
            ("Ctrl+Del", NamedKey::Delete),
        ] {
            let s = HotkeySpec::parse(text, Platform::Other).unwrap();
            assert_eq!(s.key(), KeyToken::Named(expect), "{text}");
        }
        assert_eq!(
            HotkeySpec::parse("Ctrl++", Platform::Other).unwrap().key(),
            KeyToken::Char('+')
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(HotkeySpec::parse("  ", Platform::Other), Err(HotkeyError::Empty));
        assert_eq!(
            HotkeySpec::parse("Ctrl+Shift", Platform::Other),
            Err(HotkeyError::MissingKey("Ctrl+Shift".into()))
        );
        assert_eq!(
            HotkeySpec::parse("Ctrl+A+B", Platform::Other),
            Err(HotkeyError::MultipleKeys("Ctrl+A+B".into()))
        );
        assert_eq!(
            HotkeySpec::parse("Hyper+A", Platform::Other),
            Err(HotkeyError::UnknownToken("Hyper".into()))
        );
        assert_eq!(
            HotkeySpec::parse("Ctrl+F25", Platform::Other),
            Err(HotkeyError::UnknownToken("F25".into()))
        );
        assert!(HotkeySpec::parse("Ctrl+", Platform::Other).is_err());
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let s = HotkeySpec::parse("Ctrl+Shift+P", Platform::Other).unwrap();
        assert!(s.matches(&key('P', ModMask::CTRL | ModMask::SHIFT)));
        assert!(s.matches(&key('p', ModMask::CTRL | ModMask::SHIFT)));
        assert!(!s.matches(&key('p', ModMask::CTRL)));
        assert!(!s.matches(&key('p', ModMask::CTRL | ModMask::SHIFT | ModMask::ALT)));
        assert!(!s.matches(&key('o', ModMask::CTRL | ModMask::SHIFT)));
    }

    #[test]
    fn mac_accepts_meta_for_ctrl() {
        let mac = HotkeySpec::parse("Ctrl+Shift+P", Platform::MacLike).unwrap();
        assert!(mac.matches(&key('p', ModMask::META | ModMask::SHIFT)));
        assert!(!mac.matches(&key('p', ModMask::META | ModMask::CTRL | ModMask::SHIFT)));
        assert!(!mac.matches(&key('p', ModMask::META)));

        let other = HotkeySpec::parse("Ctrl+Shift+P", Platform::Other).unwrap();
        assert!(!other.matches(&key('p', ModMask::META | ModMask::SHIFT)));

        let meta = HotkeySpec::parse("Cmd+P", Platform::MacLike).unwrap();
        assert!(!meta.matches(&key('p', ModMask::CTRL)));
    }
}
