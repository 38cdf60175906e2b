use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fill::FillOutcome;
use crate::mapping::FieldMapping;
use crate::role::FormField;

/// Where a page's mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Heuristic,
    Oracle,
    Override,
    /// Nothing matched; fill relied on label/placeholder fallback only.
    Fallback,
}

/// Outcome of one URL visit.
///
/// `fields_found` holds only the resolved descriptors; `fields_filled` holds
/// one outcome per attempted role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlReport {
    pub url: String,
    pub fields_found: FieldMapping,
    pub fields_filled: Vec<FillOutcome>,
    pub submitted: bool,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MappingSource>,
}

impl UrlReport {
    pub fn failed(url: impl Into<String>, error: impl ToString) -> Self {
        Self {
            url: url.into(),
            fields_found: FieldMapping::new(),
            fields_filled: Vec::new(),
            submitted: false,
            error: Some(error.to_string()),
            source: None,
        }
    }

    pub fn from_fill(
        url: impl Into<String>,
        source: MappingSource,
        mapping: &FieldMapping,
        outcomes: Vec<FillOutcome>,
    ) -> Self {
        let mut found = FieldMapping::new();
        for descriptor in mapping.iter().filter(|d| d.is_resolved()) {
            found.claim(descriptor.clone());
        }
        Self {
            url: url.into(),
            fields_found: found,
            fields_filled: outcomes,
            submitted: false,
            error: None,
            source: Some(source),
        }
    }

    /// Roles with a resolved selector, in role-set order.
    pub fn found_roles(&self) -> Vec<FormField> {
        self.fields_found
            .iter()
            .filter(|d| d.is_resolved())
            .map(|d| d.role)
            .collect()
    }

    /// Roles whose value was written, in role-set order.
    pub fn filled_roles(&self) -> Vec<FormField> {
        let mut roles: Vec<FormField> = self
            .fields_filled
            .iter()
            .filter(|o| o.succeeded)
            .map(|o| o.role)
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.fields_filled.iter().any(|o| o.succeeded)
    }
}

/// All URL reports of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub reports: Vec<UrlReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn submitted(&self) -> usize {
        self.reports.iter().filter(|r| r.submitted).count()
    }
}

/// Flat row for CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub url: String,
    pub fields_found: String,
    pub fields_filled: String,
    pub submitted: bool,
    pub error: String,
}

impl From<&UrlReport> for ReportRow {
    fn from(report: &UrlReport) -> Self {
        let join = |roles: &[FormField]| {
            roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(";")
        };
        Self {
            url: report.url.clone(),
            fields_found: join(&report.found_roles()),
            fields_filled: join(&report.filled_roles()),
            submitted: report.submitted,
            error: report.error.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::Strategy;
    use crate::mapping::{FieldDescriptor, MatchedBy};

    #[test]
    fn url_report_serializes_camel_case() {
        let mut mapping = FieldMapping::unresolved();
        mapping.claim(FieldDescriptor::found(FormField::Email, "#mail", MatchedBy::Pattern));
        let outcomes = vec![FillOutcome {
            role: FormField::Email,
            attempted: true,
            succeeded: true,
            strategy_used: Some(Strategy::Direct),
            error: None,
            lossy: false,
        }];
        let report = UrlReport::from_fill("https://a.example", MappingSource::Heuristic, &mapping, outcomes);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["fieldsFound"]["email"]["selector"], "#mail");
        assert_eq!(value["fieldsFound"]["email"]["matchedBy"], "pattern");
        assert!(value["fieldsFound"].get("phone").is_none());
        assert_eq!(value["fieldsFilled"][0]["role"], "email");
        assert_eq!(value["fieldsFilled"][0]["strategyUsed"], "direct");
        assert_eq!(value["submitted"], false);
        assert!(value["error"].is_null());
        assert_eq!(report.filled_roles(), vec![FormField::Email]);
    }

    #[test]
    fn csv_row_joins_roles() {
        let mut report = UrlReport::failed("https://b.example", "navigation failed: dns");
        report.fields_found.claim(FieldDescriptor::found(FormField::City, "#ort", MatchedBy::Pattern));
        report.fields_found.claim(FieldDescriptor::found(FormField::Zip, "#plz", MatchedBy::Pattern));
        let row = ReportRow::from(&report);
        assert_eq!(row.fields_found, "zip;city");
        assert_eq!(row.error, "navigation failed: dns");
    }
}
