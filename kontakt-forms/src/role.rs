use std::fmt;
use std::str::FromStr;

use kontakt_common::KontaktError;
use serde::{Deserialize, Serialize};

/// Semantic role of a contact-form control.
///
/// The declaration order is the role-set order: matchers evaluate roles in it
/// and the fill engine attempts them in it. `FirstName` and `LastName` come
/// before `Name` so a `first_name` control is never claimed by the plain name role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    FirstName,
    LastName,
    Name,
    Email,
    Phone,
    Street,
    Zip,
    City,
    Message,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::FirstName,
        FormField::LastName,
        FormField::Name,
        FormField::Email,
        FormField::Phone,
        FormField::Street,
        FormField::Zip,
        FormField::City,
        FormField::Message,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FormField::FirstName => "first_name",
            FormField::LastName => "last_name",
            FormField::Name => "name",
            FormField::Email => "email",
            FormField::Phone => "phone",
            FormField::Street => "street",
            FormField::Zip => "zip",
            FormField::City => "city",
            FormField::Message => "message",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormField {
    type Err = KontaktError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace('-', "_");
        FormField::ALL
            .into_iter()
            .find(|role| role.as_str() == needle)
            .ok_or_else(|| KontaktError::Config(format!("unknown form field role: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_role_set_order() {
        let mut shuffled = vec![FormField::Message, FormField::Name, FormField::FirstName];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![FormField::FirstName, FormField::Name, FormField::Message]
        );
    }

    #[test]
    fn parses_names_and_rejects_unknown() {
        assert_eq!("first-name".parse::<FormField>().unwrap(), FormField::FirstName);
        assert_eq!("ZIP".parse::<FormField>().unwrap(), FormField::Zip);
        assert!("fax".parse::<FormField>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&FormField::LastName).unwrap(), "\"last_name\"");
    }
}
