//! Character-class matching.
//!
//! A class matcher carries four overlapping membership representations: a
//! precomputed basic-Latin lookup table for code points 0–127, an explicit
//! rune list, inclusive range pairs, and Unicode general-category classes.
//! The table is consulted alone for basic-Latin runes; the other three are
//! tried in order for everything else. Case folding and inversion are
//! applied on top of raw membership.

use compact_str::CompactString;
use unicode_general_category::{get_general_category, GeneralCategory};

/// Lower-case a rune the way class and literal matching expect: a simple
/// one-to-one fold, taking the first rune of a multi-rune lowering.
#[must_use]
pub fn fold_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// A Unicode class usable inside a character class, resolved by its
/// standard short name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnicodeClass {
    /// One-letter general-category group, e.g. `L` for all letters.
    Group(char),
    /// Two-letter general category, e.g. `Lu`.
    Category(GeneralCategory),
}

const CATEGORY_NAMES: &[(&str, GeneralCategory)] = &[
    ("Lu", GeneralCategory::UppercaseLetter),
    ("Ll", GeneralCategory::LowercaseLetter),
    ("Lt", GeneralCategory::TitlecaseLetter),
    ("Lm", GeneralCategory::ModifierLetter),
    ("Lo", GeneralCategory::OtherLetter),
    ("Mn", GeneralCategory::NonspacingMark),
    ("Mc", GeneralCategory::SpacingMark),
    ("Me", GeneralCategory::EnclosingMark),
    ("Nd", GeneralCategory::DecimalNumber),
    ("Nl", GeneralCategory::LetterNumber),
    ("No", GeneralCategory::OtherNumber),
    ("Pc", GeneralCategory::ConnectorPunctuation),
    ("Pd", GeneralCategory::DashPunctuation),
    ("Ps", GeneralCategory::OpenPunctuation),
    ("Pe", GeneralCategory::ClosePunctuation),
    ("Pi", GeneralCategory::InitialPunctuation),
    ("Pf", GeneralCategory::FinalPunctuation),
    ("Po", GeneralCategory::OtherPunctuation),
    ("Sm", GeneralCategory::MathSymbol),
    ("Sc", GeneralCategory::CurrencySymbol),
    ("Sk", GeneralCategory::ModifierSymbol),
    ("So", GeneralCategory::OtherSymbol),
    ("Zs", GeneralCategory::SpaceSeparator),
    ("Zl", GeneralCategory::LineSeparator),
    ("Zp", GeneralCategory::ParagraphSeparator),
    ("Cc", GeneralCategory::Control),
    ("Cf", GeneralCategory::Format),
    ("Co", GeneralCategory::PrivateUse),
    ("Cs", GeneralCategory::Surrogate),
    ("Cn", GeneralCategory::Unassigned),
];

const fn group_of(category: GeneralCategory) -> char {
    match category {
        GeneralCategory::UppercaseLetter
        | GeneralCategory::LowercaseLetter
        | GeneralCategory::TitlecaseLetter
        | GeneralCategory::ModifierLetter
        | GeneralCategory::OtherLetter => 'L',
        GeneralCategory::NonspacingMark
        | GeneralCategory::SpacingMark
        | GeneralCategory::EnclosingMark => 'M',
        GeneralCategory::DecimalNumber
        | GeneralCategory::LetterNumber
        | GeneralCategory::OtherNumber => 'N',
        GeneralCategory::ConnectorPunctuation
        | GeneralCategory::DashPunctuation
        | GeneralCategory::OpenPunctuation
        | GeneralCategory::ClosePunctuation
        | GeneralCategory::InitialPunctuation
        | GeneralCategory::FinalPunctuation
        | GeneralCategory::OtherPunctuation => 'P',
        GeneralCategory::MathSymbol
        | GeneralCategory::CurrencySymbol
        | GeneralCategory::ModifierSymbol
        | GeneralCategory::OtherSymbol => 'S',
        GeneralCategory::SpaceSeparator
        | GeneralCategory::LineSeparator
        | GeneralCategory::ParagraphSeparator => 'Z',
        GeneralCategory::Control
        | GeneralCategory::Format
        | GeneralCategory::PrivateUse
        | GeneralCategory::Surrogate
        | GeneralCategory::Unassigned => 'C',
        _ => 'C',
    }
}

impl UnicodeClass {
    /// Resolve a class by its short name (`"L"`, `"Lu"`, `"Nd"`, ...).
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        if name.len() == 1 {
            let letter = name.chars().next()?;
            if matches!(letter, 'L' | 'M' | 'N' | 'P' | 'S' | 'Z' | 'C') {
                return Some(Self::Group(letter));
            }
            return None;
        }
        CATEGORY_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, category)| Self::Category(category))
    }

    /// Membership test for a single rune.
    #[must_use]
    pub fn contains(self, c: char) -> bool {
        match self {
            Self::Category(category) => get_general_category(c) == category,
            Self::Group(letter) => group_of(get_general_category(c)) == letter,
        }
    }
}

/// Compiled character class.
///
/// Constructed by the grammar compiler (or by hand in tests) from the class
/// source text and its member sets; `reindex` keeps the basic-Latin table in
/// sync with the sets, folding first when the class is case-insensitive.
#[derive(Debug, Clone)]
pub struct CharClassMatcher {
    display: CompactString,
    basic_latin: [bool; 128],
    chars: Vec<char>,
    ranges: Vec<(char, char)>,
    classes: Vec<UnicodeClass>,
    ignore_case: bool,
    inverted: bool,
}

impl CharClassMatcher {
    /// Create an empty class. `display` is the source text of the class as
    /// written in the grammar (e.g. `"[a-z]"`), used in failure diagnostics.
    #[must_use]
    pub fn new(display: &str, ignore_case: bool, inverted: bool) -> Self {
        Self {
            display: CompactString::new(display),
            basic_latin: [false; 128],
            chars: Vec::new(),
            ranges: Vec::new(),
            classes: Vec::new(),
            ignore_case,
            inverted,
        }
    }

    #[must_use]
    pub fn with_chars(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.chars.extend(chars);
        self.reindex();
        self
    }

    /// Add inclusive `(lo, hi)` range pairs.
    #[must_use]
    pub fn with_ranges(mut self, pairs: impl IntoIterator<Item = (char, char)>) -> Self {
        self.ranges.extend(pairs);
        self.reindex();
        self
    }

    #[must_use]
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = UnicodeClass>) -> Self {
        self.classes.extend(classes);
        self.reindex();
        self
    }

    /// Add Unicode classes by short name. Names that do not resolve are
    /// ignored; the grammar is assumed well-formed.
    #[must_use]
    pub fn with_class_names<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.with_classes(names.into_iter().filter_map(UnicodeClass::by_name))
    }

    fn reindex(&mut self) {
        for b in 0u8..128 {
            let mut c = b as char;
            if self.ignore_case {
                c = fold_lower(c);
            }
            self.basic_latin[b as usize] = self.in_sets(c);
        }
    }

    /// Raw membership of an already-folded rune in the char, range and
    /// class sets. Inversion is not applied here.
    #[must_use]
    pub fn in_sets(&self, c: char) -> bool {
        self.chars.contains(&c)
            || self.ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi)
            || self.classes.iter().any(|class| class.contains(c))
    }

    /// Table lookup for a basic-Latin rune. Inversion is not applied here.
    #[must_use]
    pub fn basic_latin(&self, c: char) -> bool {
        self.basic_latin[c as usize]
    }

    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    #[must_use]
    pub const fn inverted(&self) -> bool {
        self.inverted
    }

    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }
}
