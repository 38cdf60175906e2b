use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kontakt_config::{
    BrowserSettings, KontaktConfig, KontaktConfigLoader, LlmConfig, MatchingSettings, RunSettings,
    default_config_path,
};
use kontakt_drivers::kontakt_browser::{BrowserKind, BrowserOptions};
use kontakt_forms::consent::ConsentOptions;
use kontakt_forms::oracle::OracleMatcher;
use kontakt_forms::{FillEngine, Pipeline, PipelineOptions, Vocabulary};
use kontakt_llm::{ollama::OllamaClient, openai::OpenAiClient, traits::LlmClient};
use tracing::{info, warn};

const LOCAL_CONFIG: &str = "kontakt.yaml";

/// Explicit path must exist; otherwise `./kontakt.yaml` and the user config
/// file are merged when present, the local one winning.
pub fn load_config(explicit: Option<&Path>) -> Result<KontaktConfig> {
    let loader = match explicit {
        Some(path) => KontaktConfigLoader::new().with_file(path),
        None => {
            let mut loader = KontaktConfigLoader::new();
            if let Some(user) = default_config_path() {
                loader = loader.with_optional_file(user);
            }
            loader.with_optional_file(LOCAL_CONFIG)
        }
    };
    loader.load().context("loading configuration")
}

pub async fn build_llm_client(cfg: &LlmConfig) -> Result<Arc<dyn LlmClient + Send + Sync>> {
    let client: Arc<dyn LlmClient + Send + Sync> = match cfg {
        LlmConfig::Openai {
            model,
            auth_token,
            endpoint,
            ..
        } => Arc::new(OpenAiClient::with_endpoint(
            auth_token.clone(),
            model.clone(),
            endpoint,
        )?),
        LlmConfig::Ollama {
            model, endpoint, ..
        } => Arc::new(OllamaClient::new(endpoint.clone(), model.clone()).await?),
    };
    Ok(client)
}

/// Built-in vocabulary plus configured extensions.
pub fn vocabulary(matching: &MatchingSettings) -> Result<Vocabulary> {
    let mut vocabulary = Vocabulary::builtin();
    for (role, extra) in &matching.vocabulary {
        vocabulary
            .extend(*role, extra.clone())
            .with_context(|| format!("vocabulary extension for {}", role.as_str()))?;
    }
    Ok(vocabulary)
}

pub fn browser_options(browser: &BrowserSettings) -> Result<BrowserOptions> {
    let kind: BrowserKind = browser.kind.parse()?;
    Ok(BrowserOptions {
        webdriver_url: browser.webdriver_url.clone(),
        kind,
        headless: browser.headless,
        window: browser.window.map(|w| (w.width, w.height)),
        user_agent: browser.user_agent.clone(),
        action_delay: Duration::from_millis(browser.action_delay_ms),
    })
}

pub fn pipeline_options(run: &RunSettings, submit_override: Option<bool>) -> PipelineOptions {
    let consent = ConsentOptions {
        appear_timeout: Duration::from_millis(run.consent_timeout_ms),
        ..ConsentOptions::default()
    };
    PipelineOptions {
        submit: submit_override.unwrap_or(run.submit),
        dismiss_consent: run.dismiss_consent,
        site_overrides: run.site_overrides,
        settle_timeout: Duration::from_millis(run.settle_timeout_ms),
        consent,
    }
}

/// Assemble the pipeline. An oracle that cannot be constructed is logged
/// and left out; matching then stays heuristic.
pub async fn build_pipeline(
    cfg: &KontaktConfig,
    submit_override: Option<bool>,
    use_oracle: bool,
) -> Result<Pipeline> {
    let vocabulary = vocabulary(&cfg.matching)?;
    let engine = FillEngine::new(vocabulary.clone())
        .with_typing_delay(Duration::from_millis(cfg.browser.typing_delay_ms));
    let mut pipeline = Pipeline::new(
        vocabulary.clone(),
        engine,
        pipeline_options(&cfg.run, submit_override),
    );

    let Some(oracle_cfg) = cfg.active_oracle().filter(|_| use_oracle) else {
        return Ok(pipeline);
    };
    match build_llm_client(&oracle_cfg.llm).await {
        Ok(client) => {
            let mut oracle = OracleMatcher::new(client, &vocabulary);
            if let Some(max) = oracle_cfg.max_html_chars {
                oracle = oracle.with_max_html_chars(max);
            }
            if let Some(max) = oracle_cfg.llm.max_tokens() {
                oracle = oracle.with_max_tokens(max);
            }
            if let Some(t) = oracle_cfg.llm.temperature() {
                oracle = oracle.with_temperature(t);
            }
            info!(model = oracle.model_name(), "oracle matcher enabled");
            pipeline = pipeline.with_oracle(oracle);
        }
        Err(e) => warn!(error = %e, model = oracle_cfg.llm.model(), "oracle unavailable, continuing without it"),
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontakt_config::WindowSize;
    use kontakt_forms::{FormField, VocabularyEntry};

    #[test]
    fn run_settings_map_to_pipeline_options() {
        let run = RunSettings {
            submit: true,
            consent_timeout_ms: 1_500,
            ..RunSettings::default()
        };
        let opts = pipeline_options(&run, None);
        assert!(opts.submit);
        assert_eq!(opts.consent.appear_timeout, Duration::from_millis(1_500));
        assert_eq!(opts.settle_timeout, Duration::from_millis(5_000));

        assert!(!pipeline_options(&run, Some(false)).submit);
    }

    #[test]
    fn browser_settings_map_to_options() {
        let settings = BrowserSettings {
            kind: "Firefox".into(),
            window: Some(WindowSize {
                width: 1024,
                height: 768,
            }),
            ..BrowserSettings::default()
        };
        let opts = browser_options(&settings).unwrap();
        assert_eq!(opts.kind, BrowserKind::Firefox);
        assert_eq!(opts.window, Some((1024, 768)));
        assert_eq!(opts.action_delay, Duration::from_millis(600));

        let bad = BrowserSettings {
            kind: "netscape".into(),
            ..BrowserSettings::default()
        };
        assert!(browser_options(&bad).is_err());
    }

    #[test]
    fn vocabulary_extensions_are_applied() {
        let mut matching = MatchingSettings::default();
        matching.vocabulary.insert(
            FormField::Phone,
            VocabularyEntry {
                labels: vec!["Rückrufnummer".into()],
                ..VocabularyEntry::default()
            },
        );
        let vocab = vocabulary(&matching).unwrap();
        assert!(vocab.label_matches(FormField::Phone, "Rückrufnummer"));
    }

    #[test]
    fn invalid_pattern_extension_is_rejected() {
        let mut matching = MatchingSettings::default();
        matching.vocabulary.insert(
            FormField::Zip,
            VocabularyEntry {
                patterns: vec!["(unclosed".into()],
                ..VocabularyEntry::default()
            },
        );
        assert!(vocabulary(&matching).is_err());
    }

    #[tokio::test]
    async fn disabled_oracle_builds_heuristic_pipeline() {
        let cfg = KontaktConfigLoader::new()
            .with_yaml_str("oracle:\n  provider: openai\n  model: m\n  auth_token: t\n")
            .load()
            .unwrap();
        let pipeline = build_pipeline(&cfg, Some(false), false).await.unwrap();
        assert!(!pipeline.options().submit);
    }
}
