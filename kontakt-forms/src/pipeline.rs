//! Per-URL orchestration: navigate, (override | consent, match, fill, submit), report.

use std::time::Duration;

use chrono::{DateTime, Utc};
use kontakt_common::KontaktError;
use uuid::Uuid;

use crate::catalog::Vocabulary;
use crate::consent::{self, ConsentOptions};
use crate::fill::FillEngine;
use crate::heuristic;
use crate::mapping::FieldMapping;
use crate::oracle::OracleMatcher;
use crate::page::{PageTarget, Scope};
use crate::record::ApplicantRecord;
use crate::report::{BatchReport, MappingSource, UrlReport};
use crate::site_override;
use crate::submit;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Click the submit control after filling. Off means preview mode.
    pub submit: bool,
    pub dismiss_consent: bool,
    pub site_overrides: bool,
    /// Upper bound on waiting for a `<form>` after navigation.
    pub settle_timeout: Duration,
    pub consent: ConsentOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            submit: false,
            dismiss_consent: true,
            site_overrides: true,
            settle_timeout: Duration::from_millis(5_000),
            consent: ConsentOptions::default(),
        }
    }
}

pub struct Pipeline {
    vocabulary: Vocabulary,
    engine: FillEngine,
    oracle: Option<OracleMatcher>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(vocabulary: Vocabulary, engine: FillEngine, options: PipelineOptions) -> Self {
        Self {
            vocabulary,
            engine,
            oracle: None,
            options,
        }
    }

    pub fn with_oracle(mut self, oracle: OracleMatcher) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process one URL. Every failure ends up in the report; nothing here is fatal.
    pub async fn run<P: PageTarget>(&self, page: &P, url: &str, record: &ApplicantRecord) -> UrlReport {
        tracing::info!(target: "forms.pipeline", %url, "visiting");

        if let Err(e) = page.navigate(url).await {
            tracing::warn!(target: "forms.pipeline", %url, error = %e, "navigation failed");
            return UrlReport::failed(url, KontaktError::NavigationFailed(e.to_string()));
        }

        if self.options.site_overrides {
            if let Some(script) = site_override::override_for(url) {
                tracing::info!(target: "forms.pipeline", %url, host = script.host, "running site override");
                let run = site_override::run(page, script, record, &self.engine).await;
                let mut report =
                    UrlReport::from_fill(url, MappingSource::Override, &run.mapping, run.outcomes);
                report.error = run.error;
                return report;
            }
        }

        if self.options.dismiss_consent {
            consent::dismiss(page, self.options.consent).await;
        }

        match page
            .wait_for(Scope::Top, "form", self.options.settle_timeout)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!(target: "forms.pipeline", %url, "no form appeared before settle timeout"),
            Err(e) => tracing::trace!(target: "forms.pipeline", %url, error = %e, "settle wait failed"),
        }

        let (source, mapping, form_missing) = self.discover(page).await;
        let outcomes = self.engine.fill(page, &mapping, record).await;
        let mut report = UrlReport::from_fill(url, source, &mapping, outcomes);

        if report.filled_roles().is_empty() {
            if form_missing {
                report.error = Some(KontaktError::NoFormFound.to_string());
            }
        } else if self.options.submit {
            report.submitted = submit::trigger(page).await;
            if !report.submitted {
                report.error = Some(KontaktError::SubmitNotFound.to_string());
            }
        }

        tracing::info!(
            target: "forms.pipeline",
            %url,
            source = ?report.source,
            found = report.found_roles().len(),
            filled = report.filled_roles().len(),
            submitted = report.submitted,
            "visit finished"
        );
        report
    }

    /// Heuristic over the top document, then each frame; the oracle when that
    /// yields nothing; otherwise an all-null mapping for the semantic fallback.
    /// The flag is set when no document had a form.
    async fn discover<P: PageTarget>(&self, page: &P) -> (MappingSource, FieldMapping, bool) {
        let frames = page.frame_count().await.unwrap_or(0);
        let mut form_missing = true;
        let mut top_html = None;

        for scope in Scope::all(frames) {
            let Ok(html) = page.content(scope).await else {
                continue;
            };
            match heuristic::match_document(&html, &self.vocabulary) {
                Ok(mapping) if !mapping.is_empty() => {
                    tracing::debug!(target: "forms.pipeline", ?scope, "heuristic mapping found");
                    return (MappingSource::Heuristic, mapping, false);
                }
                Ok(_) => form_missing = false,
                Err(KontaktError::NoFormFound) => {}
                Err(e) => tracing::debug!(target: "forms.pipeline", ?scope, error = %e, "heuristic failed"),
            }
            if scope == Scope::Top {
                top_html = Some(html);
            }
        }

        if let (Some(oracle), Some(html)) = (&self.oracle, top_html) {
            if let Some(mapping) = oracle.propose(&html).await {
                return (MappingSource::Oracle, mapping, false);
            }
        }

        (MappingSource::Fallback, FieldMapping::unresolved(), form_missing)
    }

    /// Visit `urls` in order with one page, collecting a batch report.
    pub async fn run_batch<P: PageTarget>(
        &self,
        page: &P,
        urls: &[String],
        record: &ApplicantRecord,
    ) -> BatchReport {
        let mut batch = Batch::start();
        for url in urls {
            let report = self.run(page, url, record).await;
            batch.record(report);
        }
        batch.finish()
    }
}

/// Accumulates URL reports under one id and start time.
#[derive(Debug)]
pub struct Batch {
    id: Uuid,
    started_at: DateTime<Utc>,
    reports: Vec<UrlReport>,
}

impl Batch {
    pub fn start() -> Self {
        let batch = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            reports: Vec::new(),
        };
        tracing::info!(target: "forms.pipeline", batch = %batch.id, "batch started");
        batch
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn record(&mut self, report: UrlReport) {
        self.reports.push(report);
    }

    pub fn finish(self) -> BatchReport {
        let report = BatchReport {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            reports: self.reports,
        };
        tracing::info!(
            target: "forms.pipeline",
            batch = %report.id,
            urls = report.reports.len(),
            succeeded = report.succeeded(),
            submitted = report.submitted(),
            "batch finished"
        );
        report
    }
}
