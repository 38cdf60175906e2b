//! Hard-coded fill scripts for sites whose contact form only appears after
//! interaction and defeats generic matching.

use std::time::Duration;

use kontakt_common::KontaktError;

use crate::fill::{FillEngine, FillOutcome};
use crate::mapping::{FieldDescriptor, FieldMapping, MatchedBy};
use crate::page::{PageTarget, Scope};
use crate::record::ApplicantRecord;
use crate::role::FormField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Click(&'static str),
    Pause(u64),
    Fill {
        selector: &'static str,
        role: FormField,
    },
}

/// A linear script bound to one registrable host and its subdomains.
#[derive(Debug, Clone, Copy)]
pub struct SiteOverride {
    pub host: &'static str,
    pub steps: &'static [Step],
}

pub const ARNO_VOGEL: SiteOverride = SiteOverride {
    host: "arnovogel.de",
    steps: &[
        Step::Click("#header_contact_btn"),
        Step::Pause(1_000),
        Step::Click("#radio1"),
        Step::Fill { selector: "#name", role: FormField::Name },
        Step::Fill { selector: "#strasse", role: FormField::Street },
        Step::Fill { selector: "#plz", role: FormField::Zip },
        Step::Fill { selector: "#ort", role: FormField::City },
        Step::Fill { selector: "#telefon", role: FormField::Phone },
        Step::Fill { selector: "#mail", role: FormField::Email },
        Step::Fill { selector: "#message", role: FormField::Message },
        Step::Click("#Check_Datenschutz"),
    ],
};

pub const OVERRIDES: &[SiteOverride] = &[ARNO_VOGEL];

impl SiteOverride {
    pub fn applies_to(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        host == self.host
            || host
                .strip_suffix(self.host)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    /// The fixed mapping this script fills.
    pub fn mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::new();
        for step in self.steps {
            if let Step::Fill { selector, role } = step {
                mapping.claim(FieldDescriptor::found(*role, *selector, MatchedBy::Fixed));
            }
        }
        mapping
    }
}

/// Override registered for the URL's host, if any. Unparsable URLs never match.
pub fn override_for(url: &str) -> Option<&'static SiteOverride> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    OVERRIDES.iter().find(|o| o.applies_to(host))
}

/// Result of running an override script. The script never submits.
#[derive(Debug, Clone)]
pub struct OverrideRun {
    pub mapping: FieldMapping,
    pub outcomes: Vec<FillOutcome>,
    /// Set when a click step failed and the script stopped.
    pub error: Option<String>,
}

/// Run `script` step by step. A failed click aborts; a failed fill is recorded
/// and the script continues. Roles without a record value are skipped.
pub async fn run<P: PageTarget>(
    page: &P,
    script: &SiteOverride,
    record: &ApplicantRecord,
    engine: &FillEngine,
) -> OverrideRun {
    let mut run = OverrideRun {
        mapping: script.mapping(),
        outcomes: Vec::new(),
        error: None,
    };

    for step in script.steps {
        match *step {
            Step::Click(selector) => {
                if let Err(e) = click(page, selector).await {
                    tracing::warn!(target: "forms.override", host = script.host, %selector, error = %e, "override aborted");
                    run.error = Some(e.to_string());
                    break;
                }
            }
            Step::Pause(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            Step::Fill { selector, role } => {
                let Some(value) = record.get(role) else {
                    continue;
                };
                let outcome = engine.fill_fixed(page, role, selector, value).await;
                tracing::info!(
                    target: "forms.override",
                    %role,
                    %selector,
                    succeeded = outcome.succeeded,
                    "override fill"
                );
                run.outcomes.push(outcome);
            }
        }
    }
    run
}

async fn click<P: PageTarget>(page: &P, selector: &str) -> Result<(), KontaktError> {
    let element = page
        .locate_first(Scope::Top, selector)
        .await?
        .ok_or_else(|| KontaktError::SelectorNotResolved(selector.to_string()))?;
    if let Err(e) = page.scroll_into_view(&element).await {
        tracing::trace!(target: "forms.override", %selector, error = %e, "scroll failed");
    }
    page.click(&element).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_matching_is_exact_or_subdomain() {
        assert!(override_for("https://www.arnovogel.de/unternehmen/shk/recruiting").is_some());
        assert!(override_for("https://arnovogel.de").is_some());
        assert!(override_for("https://notarnovogel.de/").is_none());
        assert!(override_for("https://example.com/?ref=arnovogel.de").is_none());
        assert!(override_for("not a url").is_none());
    }

    #[test]
    fn mapping_lists_the_scripted_fields() {
        let mapping = ARNO_VOGEL.mapping();
        assert_eq!(mapping.resolved_count(), 7);
        assert_eq!(mapping.selector(FormField::Email), Some("#mail"));
        assert_eq!(
            mapping.get(FormField::Zip).and_then(|d| d.matched_by),
            Some(MatchedBy::Fixed)
        );
        assert!(!mapping.contains(FormField::FirstName));
    }
}
