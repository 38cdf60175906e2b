//! Selector catalog: ordered vocabularies per role plus the submit and consent probe tables.
//!
//! One [`Vocabulary`] feeds the heuristic regexes, the label/placeholder
//! fallback and the oracle prompt, so adding a synonym is a data change in
//! one place. Configuration can append entries with [`Vocabulary::extend`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use kontakt_common::{KontaktError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::role::FormField;

/// Ordered synonyms for one role.
///
/// `patterns` are regex fragments evaluated against the lower-cased attribute
/// blob; `labels` and `placeholders` are visible texts matched at word starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub placeholders: Vec<String>,
}

impl VocabularyEntry {
    fn of(patterns: &[&str], labels: &[&str], placeholders: &[&str]) -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            patterns: owned(patterns),
            labels: owned(labels),
            placeholders: owned(placeholders),
        }
    }

    fn merge(&mut self, other: VocabularyEntry) {
        for (into, from) in [
            (&mut self.patterns, other.patterns),
            (&mut self.labels, other.labels),
            (&mut self.placeholders, other.placeholders),
        ] {
            for item in from {
                let item = item.trim().to_string();
                if !item.is_empty() && !into.contains(&item) {
                    into.push(item);
                }
            }
        }
    }
}

static BUILTIN: LazyLock<Vocabulary> = LazyLock::new(|| {
    let entries = BTreeMap::from([
        (
            FormField::FirstName,
            VocabularyEntry::of(
                &[r"vorname", r"first.?name", r"given.?name", r"\bfname\b", r"forename"],
                &["Vorname", "First name", "Given name", "Forename"],
                &["Vorname", "First name"],
            ),
        ),
        (
            FormField::LastName,
            VocabularyEntry::of(
                &[r"nachname", r"last.?name", r"family.?name", r"\blname\b", r"surname", r"familienname"],
                &["Nachname", "Last name", "Surname", "Family name"],
                &["Nachname", "Last name", "Surname"],
            ),
        ),
        (
            FormField::Name,
            VocabularyEntry::of(
                &[r"full.?name", r"your.?name", r"contact.?name", r"ihr.?name", r"\bname\b"],
                &["Name", "Full name", "Ihr Name"],
                &["Name", "Full name", "Ihr Name"],
            ),
        ),
        (
            FormField::Email,
            VocabularyEntry::of(
                &[r"e.?mail", r"mail"],
                &["E-Mail", "Email", "Mail"],
                &["E-Mail", "Email"],
            ),
        ),
        (
            FormField::Phone,
            VocabularyEntry::of(
                &[r"telefon", r"handy", r"mobil", r"phone", r"\btel"],
                &["Telefon", "Phone", "Tel", "Handy", "Mobile"],
                &["Telefon", "Phone", "Tel"],
            ),
        ),
        (
            FormField::Street,
            VocabularyEntry::of(
                &[
                    r"stra(?:ss|ß)e",
                    r"street",
                    r"address.?line.?1",
                    r"\baddress1\b",
                    r"\baddr1\b",
                    r"hausnummer",
                    r"anschrift",
                ],
                &["Straße", "Strasse", "Street", "Adresse", "Address"],
                &["Straße", "Strasse", "Street", "Address"],
            ),
        ),
        (
            FormField::Zip,
            VocabularyEntry::of(
                &[r"\bplz", r"\bzip", r"postal.?code", r"post.?code", r"postleitzahl"],
                &["PLZ", "Postleitzahl", "Zip", "Postal code"],
                &["PLZ", "Zip", "Postal code"],
            ),
        ),
        (
            FormField::City,
            VocabularyEntry::of(
                &[r"\bort\b", r"wohnort", r"stadt", r"city", r"locality", r"town"],
                &["Ort", "Wohnort", "Stadt", "City", "Town"],
                &["Ort", "Stadt", "City"],
            ),
        ),
        (
            FormField::Message,
            VocabularyEntry::of(
                &[
                    r"nachricht",
                    r"message",
                    r"bemerkung",
                    r"kommentar",
                    r"anschreiben",
                    r"anliegen",
                    r"anfrage",
                    r"cover.?letter",
                    r"motivation",
                    r"inquiry",
                    r"comments?",
                ],
                &["Nachricht", "Message", "Bemerkung", "Kommentar", "Anliegen", "Anfrage"],
                &["Nachricht", "Ihre Nachricht", "Message"],
            ),
        ),
    ]);
    Vocabulary::from_entries(entries).expect("built-in vocabulary patterns compile")
});

/// Per-role vocabularies with their compiled matchers.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: BTreeMap<FormField, VocabularyEntry>,
    patterns: BTreeMap<FormField, Regex>,
    labels: BTreeMap<FormField, Vec<Regex>>,
    placeholders: BTreeMap<FormField, Vec<Regex>>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    /// Built-in bilingual (German/English) vocabulary.
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Compile a vocabulary from raw entries; roles without an entry get an empty one.
    pub fn from_entries(mut entries: BTreeMap<FormField, VocabularyEntry>) -> Result<Self> {
        for role in FormField::ALL {
            entries.entry(role).or_default();
        }
        let mut vocabulary = Self {
            entries,
            patterns: BTreeMap::new(),
            labels: BTreeMap::new(),
            placeholders: BTreeMap::new(),
        };
        for role in FormField::ALL {
            vocabulary.compile(role)?;
        }
        Ok(vocabulary)
    }

    /// Append synonyms to a role; the role's matchers are recompiled.
    pub fn extend(&mut self, role: FormField, extra: VocabularyEntry) -> Result<()> {
        let previous = self.entries.get(&role).cloned().unwrap_or_default();
        self.entries.entry(role).or_default().merge(extra);
        if let Err(e) = self.compile(role) {
            self.entries.insert(role, previous);
            return Err(e);
        }
        Ok(())
    }

    pub fn entry(&self, role: FormField) -> &VocabularyEntry {
        // every role is inserted by `from_entries`
        &self.entries[&role]
    }

    /// Whether the role's attribute pattern matches the (lower-cased) blob.
    pub fn matches(&self, role: FormField, blob: &str) -> bool {
        self.patterns.get(&role).is_some_and(|re| re.is_match(blob))
    }

    /// Whether `text` contains one of the role's label synonyms at a word start.
    pub fn label_matches(&self, role: FormField, text: &str) -> bool {
        self.labels
            .get(&role)
            .is_some_and(|res| res.iter().any(|re| re.is_match(text)))
    }

    /// Index of the first label synonym matching `text`, used to rank candidates.
    pub fn label_rank(&self, role: FormField, text: &str) -> Option<usize> {
        self.labels
            .get(&role)
            .and_then(|res| res.iter().position(|re| re.is_match(text)))
    }

    /// Index of the first placeholder synonym matching `text`.
    pub fn placeholder_rank(&self, role: FormField, text: &str) -> Option<usize> {
        self.placeholders
            .get(&role)
            .and_then(|res| res.iter().position(|re| re.is_match(text)))
    }

    fn compile(&mut self, role: FormField) -> Result<()> {
        let entry = self.entry(role).clone();
        if entry.patterns.is_empty() {
            self.patterns.remove(&role);
        } else {
            let joined = entry.patterns.join("|");
            let re = Regex::new(&format!("(?i)(?:{joined})"))
                .map_err(|e| KontaktError::Config(format!("invalid pattern for {role}: {e}")))?;
            self.patterns.insert(role, re);
        }
        self.labels.insert(role, word_start_matchers(&entry.labels)?);
        self.placeholders
            .insert(role, word_start_matchers(&entry.placeholders)?);
        Ok(())
    }
}

/// `Name` must not match inside `Vorname`, but `Telefon` should match `Telefonnummer`.
fn word_start_matchers(texts: &[String]) -> Result<Vec<Regex>> {
    texts
        .iter()
        .map(|t| {
            Regex::new(&format!(r"(?i)(?:^|\W){}", regex::escape(t.trim())))
                .map_err(|e| KontaktError::Config(format!("invalid synonym {t:?}: {e}")))
        })
        .collect()
}

/// One way of locating a clickable control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A literal CSS selector.
    Css(&'static str),
    /// A button-like element whose visible text (or `value`) contains the needle, case-insensitive.
    Text(&'static str),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Css(sel) => write!(f, "css:{sel}"),
            Probe::Text(needle) => write!(f, "text:{needle}"),
        }
    }
}

/// Submit controls in priority order.
pub const SUBMIT_PROBES: &[Probe] = &[
    Probe::Css("button[type='submit']"),
    Probe::Css("input[type='submit']"),
    Probe::Text("Absenden"),
    Probe::Text("Senden"),
    Probe::Text("Abschicken"),
    Probe::Text("Submit"),
    Probe::Text("Send"),
    Probe::Css(".btn-submit"),
    Probe::Css("#submit"),
    Probe::Css(".submit"),
];

/// Cookie/consent accept controls in priority order.
pub const CONSENT_PROBES: &[Probe] = &[
    Probe::Css("#onetrust-accept-btn-handler"),
    Probe::Css("#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll"),
    Probe::Css("button[data-testid='uc-accept-all-button']"),
    Probe::Css("button[data-testid='cookie-accept-all']"),
    Probe::Css(".cookie-consent-button"),
    Probe::Css("button[aria-label*='Alle akzeptieren']"),
    Probe::Text("Alle akzeptieren"),
    Probe::Text("Alle zulassen"),
    Probe::Text("Accept all"),
    Probe::Text("Akzeptieren"),
    Probe::Text("Zustimmen"),
    Probe::Text("Accept"),
];

/// Containers whose presence signals a consent banner.
pub const CONSENT_BANNER: &str = "#onetrust-banner-sdk, #CybotCookiebotDialog, #usercentrics-root, \
     .cc-window, .cookie-banner, .cookie-consent, .cookie-consent-button, [id*='cookie-banner']";

/// Elements considered by [`Probe::Text`].
pub const BUTTON_LIKE: &str =
    "button, input[type='submit'], input[type='button'], a[role='button'], [role='button']";
