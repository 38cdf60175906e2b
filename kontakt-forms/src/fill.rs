//! Resilient fill engine.
//!
//! For each role present in both the mapping and the record the engine tries,
//! in order: the mapped selector on the top page, the same selector inside
//! each frame, then the label and placeholder fallback. A control that was
//! found but refused the value is reported, not retried elsewhere.

use std::time::Duration;

use kontakt_common::KontaktError;
use serde::{Deserialize, Serialize};

use crate::catalog::Vocabulary;
use crate::mapping::FieldMapping;
use crate::page::{OptionChoice, PageTarget, Scope};
use crate::record::ApplicantRecord;
use crate::role::FormField;
use crate::semantic::{self, Claimed, Hint};

pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(15);

/// How the control for a role was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Direct,
    Frame,
    Label,
    Placeholder,
}

impl From<Hint> for Strategy {
    fn from(hint: Hint) -> Self {
        match hint {
            Hint::Label => Strategy::Label,
            Hint::Placeholder => Strategy::Placeholder,
        }
    }
}

/// Result of one role's fill attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillOutcome {
    pub role: FormField,
    pub attempted: bool,
    pub succeeded: bool,
    pub strategy_used: Option<Strategy>,
    pub error: Option<String>,
    /// A select fell back to its first option because no label matched the value.
    #[serde(default)]
    pub lossy: bool,
}

impl FillOutcome {
    fn unresolved(role: FormField, error: KontaktError) -> Self {
        Self {
            role,
            attempted: true,
            succeeded: false,
            strategy_used: None,
            error: Some(error.to_string()),
            lossy: false,
        }
    }
}

enum Applied {
    Exact,
    Lossy,
}

pub struct FillEngine {
    vocabulary: Vocabulary,
    typing_delay: Duration,
}

impl FillEngine {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    /// Fill every role present in both `mapping` and `record`, in role-set order.
    /// Never fails; each role's result is in its outcome. The fallback never
    /// picks a control that is mapped or already resolved in this pass.
    pub async fn fill<P: PageTarget>(
        &self,
        page: &P,
        mapping: &FieldMapping,
        record: &ApplicantRecord,
    ) -> Vec<FillOutcome> {
        let mut outcomes = Vec::new();
        let mut claimed = Claimed::from_mapping(mapping);
        for (role, value) in record.iter() {
            if !mapping.contains(role) {
                continue;
            }
            let outcome = self
                .fill_role(page, role, mapping.selector(role), value, &mut claimed)
                .await;
            tracing::info!(
                target: "forms.fill",
                %role,
                succeeded = outcome.succeeded,
                strategy = ?outcome.strategy_used,
                error = outcome.error.as_deref().unwrap_or(""),
                "fill attempt"
            );
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Fill a literal selector on the top page only; no frame or semantic fallback.
    pub async fn fill_fixed<P: PageTarget>(
        &self,
        page: &P,
        role: FormField,
        selector: &str,
        value: &str,
    ) -> FillOutcome {
        let element = match page.locate_first(Scope::Top, selector).await {
            Ok(Some(el)) => el,
            Ok(None) => {
                return FillOutcome::unresolved(role, KontaktError::SelectorNotResolved(selector.into()));
            }
            Err(e) => {
                return FillOutcome::unresolved(role, KontaktError::SelectorNotResolved(e.to_string()));
            }
        };
        self.finish(page, role, Strategy::Direct, &element, value).await
    }

    async fn fill_role<P: PageTarget>(
        &self,
        page: &P,
        role: FormField,
        selector: Option<&str>,
        value: &str,
        claimed: &mut Claimed,
    ) -> FillOutcome {
        let resolved = match selector {
            Some(selector) => self.resolve_mapped(page, selector).await,
            None => None,
        };

        let (strategy, element) = match resolved {
            Some((strategy, scope, element)) => {
                if let Some(selector) = selector {
                    claimed.insert(scope, selector);
                }
                (strategy, element)
            }
            None => match semantic::locate(page, &self.vocabulary, role, claimed).await {
                Ok(Some((hint, hit))) => {
                    claimed.insert(hit.scope, hit.selector);
                    (Strategy::from(hint), hit.element)
                }
                Ok(None) => {
                    let what = selector.unwrap_or("no label or placeholder match");
                    return FillOutcome::unresolved(role, KontaktError::SelectorNotResolved(what.into()));
                }
                Err(e) => {
                    return FillOutcome::unresolved(role, KontaktError::SelectorNotResolved(e.to_string()));
                }
            },
        };

        self.finish(page, role, strategy, &element, value).await
    }

    async fn finish<P: PageTarget>(
        &self,
        page: &P,
        role: FormField,
        strategy: Strategy,
        element: &P::Element,
        value: &str,
    ) -> FillOutcome {
        match self.apply(page, element, value).await {
            Ok(applied) => FillOutcome {
                role,
                attempted: true,
                succeeded: true,
                strategy_used: Some(strategy),
                error: None,
                lossy: matches!(applied, Applied::Lossy),
            },
            Err(e) => FillOutcome {
                role,
                attempted: true,
                succeeded: false,
                strategy_used: Some(strategy),
                error: Some(KontaktError::FillRejected(e.to_string()).to_string()),
                lossy: false,
            },
        }
    }

    /// Mapped selector on the top page, then inside each frame.
    async fn resolve_mapped<P: PageTarget>(
        &self,
        page: &P,
        selector: &str,
    ) -> Option<(Strategy, Scope, P::Element)> {
        match page.locate_first(Scope::Top, selector).await {
            Ok(Some(el)) => return Some((Strategy::Direct, Scope::Top, el)),
            Ok(None) => {}
            Err(e) => tracing::debug!(target: "forms.fill", %selector, error = %e, "top-level lookup failed"),
        }
        let frames = page.frame_count().await.unwrap_or(0);
        for index in 0..frames {
            let scope = Scope::Frame(index);
            if let Ok(Some(el)) = page.locate_first(scope, selector).await {
                return Some((Strategy::Frame, scope, el));
            }
        }
        None
    }

    async fn apply<P: PageTarget>(
        &self,
        page: &P,
        element: &P::Element,
        value: &str,
    ) -> anyhow::Result<Applied> {
        let tag = page.tag_name(element).await?.to_ascii_lowercase();
        if tag == "select" {
            if page
                .select_option(element, OptionChoice::Label(value))
                .await
                .is_ok()
            {
                return Ok(Applied::Exact);
            }
            page.select_option(element, OptionChoice::First).await?;
            return Ok(Applied::Lossy);
        }

        if let Err(e) = page.scroll_into_view(element).await {
            tracing::trace!(target: "forms.fill", error = %e, "scroll failed");
        }
        match page.set_value(element, value).await {
            Ok(()) => Ok(Applied::Exact),
            Err(e) => {
                tracing::debug!(target: "forms.fill", error = %e, "direct value set failed; typing");
                page.click(element).await?;
                page.type_text(element, value, self.typing_delay).await?;
                Ok(Applied::Exact)
            }
        }
    }
}
