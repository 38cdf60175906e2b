use std::sync::{Arc, LazyLock};

use kontakt_common::{KontaktError, Result};
use kontakt_llm::traits::LlmClient;
use regex::Regex;
use serde_json::Value;

use crate::catalog::Vocabulary;
use crate::dom;
use crate::mapping::{FieldDescriptor, FieldMapping, MatchedBy};
use crate::role::FormField;

pub const DEFAULT_MAX_HTML_CHARS: usize = 60_000;
pub const DEFAULT_ORACLE_MAX_TOKENS: u32 = 800;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("static regex"));

/// Asks a language model for a role→selector object over the page HTML.
///
/// Every failure (transport, malformed reply, empty mapping) degrades to
/// `None`; the caller then relies on the semantic fallback alone.
pub struct OracleMatcher {
    client: Arc<dyn LlmClient + Send + Sync>,
    system_prompt: String,
    max_html_chars: usize,
    max_tokens: u32,
    temperature: f32,
}

impl OracleMatcher {
    pub fn new(client: Arc<dyn LlmClient + Send + Sync>, vocabulary: &Vocabulary) -> Self {
        Self {
            client,
            system_prompt: system_prompt(vocabulary),
            max_html_chars: DEFAULT_MAX_HTML_CHARS,
            max_tokens: DEFAULT_ORACLE_MAX_TOKENS,
            temperature: 0.0,
        }
    }

    pub fn with_max_html_chars(mut self, max: usize) -> Self {
        self.max_html_chars = max.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// One oracle round-trip. Never errors.
    pub async fn propose(&self, html: &str) -> Option<FieldMapping> {
        let snippet = truncate_html(html, self.max_html_chars);
        let prompt = format!(
            "HTML:\n\n{snippet}\n\nReturn ONLY the JSON object with the keys: {}.",
            role_list()
        );

        tracing::info!(
            target: "forms.oracle",
            model = self.client.model_name(),
            html_chars = snippet.chars().count(),
            "requesting field mapping"
        );

        let reply = match self
            .client
            .generate(
                &prompt,
                Some(&self.system_prompt),
                Some(self.max_tokens),
                Some(self.temperature),
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(target: "forms.oracle", error = %e, "oracle call failed");
                return None;
            }
        };

        match parse_reply(&reply.text) {
            Ok(mapping) => {
                tracing::info!(
                    target: "forms.oracle",
                    resolved = mapping.resolved_count(),
                    "oracle mapping accepted"
                );
                Some(mapping)
            }
            Err(e) => {
                tracing::warn!(target: "forms.oracle", error = %e, "oracle reply discarded");
                None
            }
        }
    }
}

/// Validate and normalize a raw oracle reply into a complete mapping.
///
/// A surrounding code fence is stripped; anything that is not a JSON object is
/// rejected. Unknown keys are dropped; null, blank, non-string or unparsable
/// selectors become "role not found". A mapping with no resolved role is an error.
pub fn parse_reply(text: &str) -> Result<FieldMapping> {
    let body = JSON_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text.trim(), |m| m.as_str());

    let value: Value = serde_json::from_str(body)
        .map_err(|e| KontaktError::OracleUnavailable(format!("reply is not JSON: {e}")))?;
    let Value::Object(object) = value else {
        return Err(KontaktError::OracleUnavailable(
            "reply is not a JSON object".into(),
        ));
    };

    let mut mapping = FieldMapping::new();
    for (key, value) in object {
        let Ok(role) = key.parse::<FormField>() else {
            tracing::debug!(target: "forms.oracle", %key, "ignoring key outside the role set");
            continue;
        };
        let Some(selector) = normalize_selector(&value) else {
            continue;
        };
        if dom::parse_selector(&selector).is_none() {
            tracing::debug!(target: "forms.oracle", %role, %selector, "selector is not valid CSS");
            continue;
        }
        mapping.claim(FieldDescriptor::found(role, selector, MatchedBy::Oracle));
    }

    if mapping.is_empty() {
        return Err(KontaktError::OracleUnavailable(
            "reply resolved no roles".into(),
        ));
    }
    Ok(mapping.complete())
}

/// Trimmed string selector; null, blank or non-string values are `None`.
pub fn normalize_selector(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// At most `max_chars` characters, cut on a char boundary.
pub fn truncate_html(html: &str, max_chars: usize) -> &str {
    match html.char_indices().nth(max_chars) {
        Some((idx, _)) => &html[..idx],
        None => html,
    }
}

fn role_list() -> String {
    FormField::ALL
        .into_iter()
        .map(FormField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn system_prompt(vocabulary: &Vocabulary) -> String {
    let mut roles = String::new();
    for role in FormField::ALL {
        let entry = vocabulary.entry(role);
        let synonyms: Vec<&str> = entry
            .labels
            .iter()
            .chain(entry.placeholders.iter())
            .map(String::as_str)
            .collect();
        roles.push_str(&format!("- {role}: {}\n", synonyms.join(", ")));
    }

    format!(
        r#"You are an expert on web forms. You receive the rendered HTML of a page and identify
the best input, textarea or select control for each of these roles: {list}.

Respond with a single JSON object with EXACTLY these keys. Each value is a CSS selector
string or null. Do not add any other text, explanation or markdown.

Look at id, name, placeholder, aria-label, type, <label for=...> texts and nearby headings.
Prefer #id, otherwise [name='...'], otherwise a unique selector anchored at the form
(for example form#contact [name='email']). Avoid :nth-child unless nothing else works.
Only visible, interactive controls. If no control fits a role, use null.

Role synonyms (German and English):
{roles}
first_name and last_name take precedence over name; prefer a textarea for message."#,
        list = role_list(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kontakt_llm::traits::LlmResponse;

    struct Canned(std::result::Result<String, String>);

    #[async_trait]
    impl LlmClient for Canned {
        async fn generate(
            &self,
            _prompt: &str,
            _system_prompt: Option<&str>,
            _max_tokens: Option<u32>,
            _temperature: Option<f32>,
        ) -> Result<LlmResponse> {
            match &self.0 {
                Ok(text) => Ok(LlmResponse {
                    text: text.clone(),
                    model: Some("canned".into()),
                    tokens_used: None,
                }),
                Err(e) => Err(KontaktError::OracleUnavailable(e.clone())),
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn matcher(reply: std::result::Result<&str, &str>) -> OracleMatcher {
        let client = Canned(reply.map(str::to_string).map_err(str::to_string));
        OracleMatcher::new(Arc::new(client), &Vocabulary::builtin())
    }

    #[test]
    fn parse_reply_normalizes_values() {
        let mapping = parse_reply(
            r##"{"email": " #mail ", "phone": "", "zip": null, "city": 3, "fax": "#fax", "name": "[[bad"}"##,
        )
        .unwrap();
        assert_eq!(mapping.selector(FormField::Email), Some("#mail"));
        for role in [FormField::Phone, FormField::Zip, FormField::City, FormField::Name] {
            assert!(!mapping.is_filled(role), "{role}");
        }
        assert_eq!(mapping.iter().count(), 9);
        assert_eq!(
            mapping.get(FormField::Email).unwrap().matched_by,
            Some(MatchedBy::Oracle)
        );
    }

    #[test]
    fn parse_reply_strips_code_fence() {
        let mapping = parse_reply("```json\n{\"message\": \"textarea#msg\"}\n```").unwrap();
        assert_eq!(mapping.selector(FormField::Message), Some("textarea#msg"));
    }

    #[test]
    fn parse_reply_rejects_non_objects_and_empty_mappings() {
        assert!(parse_reply("Sure! Here is the mapping you asked for.").is_err());
        assert!(parse_reply("[\"#mail\"]").is_err());
        assert!(parse_reply(r#"{"email": null, "phone": "  "}"#).is_err());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_html("Straße", 5), "Straß");
        assert_eq!(truncate_html("abc", 10), "abc");
    }

    #[test]
    fn prompt_lists_every_role_with_synonyms() {
        let prompt = system_prompt(&Vocabulary::builtin());
        for role in FormField::ALL {
            assert!(prompt.contains(&format!("- {role}:")), "{role}");
        }
        assert!(prompt.contains("Vorname"));
    }

    #[tokio::test]
    async fn malformed_reply_yields_none() {
        assert!(matcher(Ok("not json at all")).propose("<form></form>").await.is_none());
    }

    #[tokio::test]
    async fn oracle_error_yields_none() {
        assert!(matcher(Err("503")).propose("<p>no form</p>").await.is_none());
    }

    #[tokio::test]
    async fn valid_reply_yields_mapping() {
        let mapping = matcher(Ok(r##"{"email": "#mail", "message": "#msg"}"##))
            .propose("<form><input id='mail'><textarea id='msg'></textarea></form>")
            .await
            .unwrap();
        assert_eq!(mapping.resolved_count(), 2);
    }
}
