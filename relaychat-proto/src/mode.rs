//! A parametric A/B/C/D mode-string parser, keyed by server-advertised mode categories.
//!
//! Unlike a client library that hardcodes a fixed `ChannelMode`/`UserMode` enum for one server's
//! conventions, the mode letters this engine must understand are declared per-server by
//! `CHANMODES` (see the ISUPPORT store). This module only knows the category shape, not any
//! specific letter's meaning.
use std::collections::HashMap;
use std::fmt;

/// The four ISUPPORT `CHANMODES` categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeCategory {
    /// Always takes an argument; conceptually adds/removes list entries (bans, exceptions).
    A,
    /// Always takes an argument, whether being set or unset.
    B,
    /// Takes an argument only when being set.
    C,
    /// Never takes an argument.
    D,
}

/// A `letter -> category` map, typically built from an ISUPPORT `CHANMODES` token. An empty map
/// (as used for non-channel targets) treats every letter as category `D`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeCategoryMap(HashMap<char, ModeCategory>);

impl ModeCategoryMap {
    /// Creates an empty map; every letter looked up in it is category `D`.
    pub fn new() -> ModeCategoryMap {
        ModeCategoryMap(HashMap::new())
    }

    /// Parses a `CHANMODES=a,b,c,d` token value (the part after `=`) into a category map.
    pub fn from_chanmodes_value(value: &str) -> ModeCategoryMap {
        let mut map = HashMap::new();
        let mut groups = value.split(',');
        for (category, letters) in [
            (ModeCategory::A, groups.next().unwrap_or("")),
            (ModeCategory::B, groups.next().unwrap_or("")),
            (ModeCategory::C, groups.next().unwrap_or("")),
            (ModeCategory::D, groups.next().unwrap_or("")),
        ] {
            for letter in letters.chars() {
                map.insert(letter, category);
            }
        }
        ModeCategoryMap(map)
    }

    /// Inserts or overwrites a single letter's category.
    pub fn insert(&mut self, letter: char, category: ModeCategory) {
        self.0.insert(letter, category);
    }

    /// Looks up a letter's category, defaulting to `D` if unknown.
    pub fn category_of(&self, letter: char) -> ModeCategory {
        self.0.get(&letter).copied().unwrap_or(ModeCategory::D)
    }
}

/// Whether a mode letter is being set (`+`) or unset (`-`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    /// `+letter`
    Set,
    /// `-letter`
    Unset,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Sign::Set => "+",
            Sign::Unset => "-",
        })
    }
}

/// A single mode letter with its category and optional argument.
///
/// Equality (and the `Mode` half of a `ModeChange`) compares only the letter, per this engine's
/// data model: two `b` bans are "the same mode" regardless of argument.
#[derive(Clone, Debug)]
pub struct Mode {
    /// The mode letter, e.g. `'b'`, `'o'`, `'l'`.
    pub letter: char,
    /// This letter's category as declared by the server (or `D` if undeclared).
    pub category: ModeCategory,
    /// The argument consumed for this occurrence, if any.
    pub arg: Option<String>,
}

impl PartialEq for Mode {
    fn eq(&self, other: &Mode) -> bool {
        self.letter == other.letter
    }
}

/// One `(mode, sign)` pair produced by parsing a mode string.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeChange {
    /// The affected mode.
    pub mode: Mode,
    /// Whether it was set or unset.
    pub sign: Sign,
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.mode.arg {
            Some(arg) => write!(f, "{}{} {}", self.sign, self.mode.letter, arg),
            None => write!(f, "{}{}", self.sign, self.mode.letter),
        }
    }
}

/// Parses a mode-change string (e.g. `"+sk-l"`) plus its trailing arguments, per the server's
/// declared mode categories.
///
/// Consumes exactly one argument per A/B letter (either direction) and per C letter (set only),
/// left to right. If the argument queue runs dry before a required argument, the whole mode line
/// is malformed and an empty change set is returned (the caller emits no event, per this
/// engine's error policy for malformed mode strings).
pub fn parse_mode_string(letters: &str, args: &[&str], categories: &ModeCategoryMap) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let mut arg_iter = args.iter();
    let mut sign = Sign::Set;

    for c in letters.chars() {
        match c {
            '+' => {
                sign = Sign::Set;
                continue;
            }
            '-' => {
                sign = Sign::Unset;
                continue;
            }
            _ => {}
        }

        let category = categories.category_of(c);
        let needs_arg = matches!(category, ModeCategory::A | ModeCategory::B)
            || (category == ModeCategory::C && sign == Sign::Set);

        let arg = if needs_arg {
            match arg_iter.next() {
                Some(a) => Some((*a).to_owned()),
                None => return Vec::new(),
            }
        } else {
            None
        };

        changes.push(ModeChange {
            mode: Mode { letter: c, category, arg },
            sign,
        });
    }

    changes
}

/// Re-serializes a parsed change set back into `(letters, args)`, grouping consecutive runs of
/// the same sign under one `+`/`-` the way the wire format does. This is the inverse of
/// [`parse_mode_string`] for canonical (already-grouped) inputs.
pub fn format_mode_string(changes: &[ModeChange]) -> (String, Vec<String>) {
    let mut letters = String::new();
    let mut args = Vec::new();
    let mut last_sign = None;

    for change in changes {
        if last_sign != Some(change.sign) {
            letters.push_str(&change.sign.to_string());
            last_sign = Some(change.sign);
        }
        letters.push(change.mode.letter);
        if let Some(arg) = &change.mode.arg {
            args.push(arg.clone());
        }
    }

    (letters, args)
}

#[cfg(test)]
mod test {
    use super::*;

    fn categories() -> ModeCategoryMap {
        let mut m = ModeCategoryMap::new();
        m.insert('k', ModeCategory::B);
        m.insert('l', ModeCategory::C);
        m
    }

    #[test]
    fn parses_mixed_categories_in_order() {
        let changes = parse_mode_string("-sk+nl", &["secret", "4"], &categories());
        assert_eq!(changes.len(), 4);
        assert_eq!(changes[0].mode.letter, 's');
        assert_eq!(changes[0].sign, Sign::Unset);
        assert_eq!(changes[0].mode.arg, None);

        assert_eq!(changes[1].mode.letter, 'k');
        assert_eq!(changes[1].sign, Sign::Unset);
        assert_eq!(changes[1].mode.arg.as_deref(), Some("secret"));

        assert_eq!(changes[2].mode.letter, 'n');
        assert_eq!(changes[2].sign, Sign::Set);
        assert_eq!(changes[2].mode.arg, None);

        assert_eq!(changes[3].mode.letter, 'l');
        assert_eq!(changes[3].sign, Sign::Set);
        assert_eq!(changes[3].mode.arg.as_deref(), Some("4"));
    }

    #[test]
    fn insufficient_arguments_yields_empty_set() {
        let changes = parse_mode_string("+l", &[], &categories());
        assert!(changes.is_empty());
    }

    #[test]
    fn c_category_unset_takes_no_argument() {
        let changes = parse_mode_string("-l", &[], &categories());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].mode.arg, None);
    }

    #[test]
    fn user_modes_use_empty_map_all_d() {
        let changes = parse_mode_string("+i-w", &[], &ModeCategoryMap::new());
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.mode.arg.is_none()));
    }

    #[test]
    fn mode_equality_ignores_argument() {
        let a = Mode { letter: 'b', category: ModeCategory::A, arg: Some("x!x@x".into()) };
        let b = Mode { letter: 'b', category: ModeCategory::A, arg: Some("y!y@y".into()) };
        assert_eq!(a, b);
    }

    #[test]
    fn roundtrip_through_format() {
        let original = "-sk+nl";
        let args = ["secret", "4"];
        let changes = parse_mode_string(original, &args, &categories());
        let (letters, out_args) = format_mode_string(&changes);
        assert_eq!(letters, original);
        assert_eq!(out_args, vec!["secret".to_owned(), "4".to_owned()]);
    }

    #[test]
    fn chanmodes_value_parses_into_categories() {
        let map = ModeCategoryMap::from_chanmodes_value("b,k,l,imnpst");
        assert_eq!(map.category_of('b'), ModeCategory::A);
        assert_eq!(map.category_of('k'), ModeCategory::B);
        assert_eq!(map.category_of('l'), ModeCategory::C);
        assert_eq!(map.category_of('i'), ModeCategory::D);
        assert_eq!(map.category_of('z'), ModeCategory::D);
    }
}
