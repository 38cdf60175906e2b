use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::role::FormField;

/// Raw attributes of the control that justified a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_type: Option<String>,
}

/// Which rule produced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    /// Role regex over the attribute blob.
    Pattern,
    /// Declared `type="email"` / `type="tel"`.
    InputType,
    /// Unmatched `<textarea>` taken as the message.
    TextareaDefault,
    /// Proposed by the language-model oracle.
    Oracle,
    /// Literal selector from a site override script.
    Fixed,
}

/// A role's resolved selector plus its provenance. `selector == None` means "role not found".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub role: FormField,
    pub selector: Option<String>,
    #[serde(default)]
    pub source_attributes: SourceAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchedBy>,
}

impl FieldDescriptor {
    pub fn missing(role: FormField) -> Self {
        Self {
            role,
            selector: None,
            source_attributes: SourceAttributes::default(),
            matched_by: None,
        }
    }

    pub fn found(role: FormField, selector: impl Into<String>, matched_by: MatchedBy) -> Self {
        Self {
            role,
            selector: Some(selector.into()),
            source_attributes: SourceAttributes::default(),
            matched_by: Some(matched_by),
        }
    }

    pub fn with_attributes(mut self, attrs: SourceAttributes) -> Self {
        self.source_attributes = attrs;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.selector.is_some()
    }
}

/// At most one descriptor per role, iterated in role-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<FormField, FieldDescriptor>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every role present with a null selector; the fill engine then relies on
    /// the label/placeholder fallback alone.
    pub fn unresolved() -> Self {
        Self(
            FormField::ALL
                .into_iter()
                .map(|role| (role, FieldDescriptor::missing(role)))
                .collect(),
        )
    }

    /// Insert unless the role already has a resolved descriptor (first match wins).
    /// Returns whether the descriptor was stored.
    pub fn claim(&mut self, descriptor: FieldDescriptor) -> bool {
        match self.0.get(&descriptor.role) {
            Some(existing) if existing.is_resolved() => false,
            _ => {
                self.0.insert(descriptor.role, descriptor);
                true
            }
        }
    }

    pub fn get(&self, role: FormField) -> Option<&FieldDescriptor> {
        self.0.get(&role)
    }

    pub fn contains(&self, role: FormField) -> bool {
        self.0.contains_key(&role)
    }

    pub fn selector(&self, role: FormField) -> Option<&str> {
        self.0.get(&role).and_then(|d| d.selector.as_deref())
    }

    pub fn is_filled(&self, role: FormField) -> bool {
        self.selector(role).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.0.values()
    }

    pub fn resolved_count(&self) -> usize {
        self.0.values().filter(|d| d.is_resolved()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved_count() == 0
    }

    /// Fill every absent role with a null descriptor.
    pub fn complete(mut self) -> Self {
        for role in FormField::ALL {
            self.0
                .entry(role)
                .or_insert_with(|| FieldDescriptor::missing(role));
        }
        self
    }
}
