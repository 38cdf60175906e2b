use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::role::FormField;

/// Literal values to submit, keyed by role. Supplied by the caller and never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantRecord(BTreeMap<FormField, String>);

/// Human-facing applicant data as entered in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub message: String,
}

impl ApplicantRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; blank values are ignored.
    pub fn with(mut self, role: FormField, value: impl Into<String>) -> Self {
        self.insert(role, value);
        self
    }

    pub fn insert(&mut self, role: FormField, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.0.insert(role, value);
        }
    }

    pub fn get(&self, role: FormField) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    /// Entries in role-set order.
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(role, v)| (*role, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expand a profile into per-role values. The full name also fills the
    /// first/last name roles: first token and last token, middle names dropped.
    pub fn from_profile(profile: &ApplicantProfile) -> Self {
        let mut record = Self::new();
        let (first, last) = split_full_name(&profile.full_name);
        record.insert(FormField::Name, profile.full_name.trim());
        if let Some(first) = first {
            record.insert(FormField::FirstName, first);
        }
        if let Some(last) = last {
            record.insert(FormField::LastName, last);
        }
        record.insert(FormField::Email, profile.email.trim());
        record.insert(FormField::Phone, profile.phone.trim());
        record.insert(FormField::Street, profile.street.trim());
        record.insert(FormField::Zip, profile.zip.trim());
        record.insert(FormField::City, profile.city.trim());
        record.insert(FormField::Message, profile.message.as_str());
        record
    }
}

/// Split on whitespace into (first token, last token). A single token is a first name only.
pub fn split_full_name(full: &str) -> (Option<&str>, Option<&str>) {
    let mut parts = full.split_whitespace();
    let first = parts.next();
    let last = parts.last();
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_full_name_variants() {
        assert_eq!(split_full_name("  "), (None, None));
        assert_eq!(split_full_name("Maddox"), (Some("Maddox"), None));
        assert_eq!(
            split_full_name("Anna  Maria von Berg"),
            (Some("Anna"), Some("Berg"))
        );
    }

    #[test]
    fn profile_expands_and_drops_blank_values() {
        let profile = ApplicantProfile {
            full_name: "Erika Mustermann".into(),
            email: "erika@example.de".into(),
            phone: "  ".into(),
            city: "Berlin".into(),
            ..Default::default()
        };
        let record = ApplicantRecord::from_profile(&profile);
        assert_eq!(record.get(FormField::Name), Some("Erika Mustermann"));
        assert_eq!(record.get(FormField::FirstName), Some("Erika"));
        assert_eq!(record.get(FormField::LastName), Some("Mustermann"));
        assert_eq!(record.get(FormField::Phone), None);
        assert_eq!(record.get(FormField::Street), None);

        let roles: Vec<FormField> = record.iter().map(|(r, _)| r).collect();
        assert_eq!(
            roles,
            vec![
                FormField::FirstName,
                FormField::LastName,
                FormField::Name,
                FormField::Email,
                FormField::City
            ]
        );
    }
}
