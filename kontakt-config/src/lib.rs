//! Loader for `kontakt.yaml` with environment overlays.
//!
//! Sources are merged in order: files and inline snippets as attached, then
//! `KONTAKT__SECTION__KEY` environment variables, which win. String values
//! may reference `${VAR}`; expansion runs after merging and follows nested
//! references up to a fixed depth.
//!
//! ```yaml
//! applicant:
//!   full_name: "Erika Mustermann"
//!   email: "erika@example.org"
//!   zip: "50667"
//! browser:
//!   kind: firefox
//!   headless: true
//! oracle:
//!   provider: openai
//!   model: gpt-4o-mini
//!   auth_token: "${OPENAI_API_KEY}"
//! matching:
//!   vocabulary:
//!     phone:
//!       labels: ["Rückrufnummer"]
//! run:
//!   submit: false
//! output:
//!   format: csv
//! ```
use config::{Config, ConfigError, Environment, File};
use serde_json::Value;
use std::path::{Path, PathBuf};

mod lenient;
mod schema;

pub use schema::{
    BrowserSettings, KontaktConfig, LlmConfig, MatchingSettings, OracleConfig, OutputSettings,
    RunSettings, WindowSize,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "KONTAKT";

/// `<config dir>/kontakt/kontakt.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kontakt").join("kontakt.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct KontaktConfigLoader {
    files: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for KontaktConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl KontaktConfigLoader {
    /// No sources yet; environment overrides are layered on at [`load`](Self::load).
    ///
    /// ```
    /// use kontakt_config::KontaktConfigLoader;
    ///
    /// let config = KontaktConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(!config.run.submit);
    /// assert!(config.oracle.is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            files: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format follows the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use kontakt_config::{KontaktConfigLoader, LlmConfig};
    ///
    /// let cfg = KontaktConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// oracle:
    ///   provider: ollama
    ///   model: llama3.1
    ///   max_html_chars: 20000
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let oracle = cfg.active_oracle().expect("oracle enabled by default");
    /// assert_eq!(oracle.max_html_chars, Some(20_000));
    /// assert!(matches!(&oracle.llm, LlmConfig::Ollama { endpoint, .. } if endpoint == "http://localhost:11434"));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.files = self
            .files
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge sources, expand `${VAR}` references and deserialize.
    pub fn load(self) -> Result<KontaktConfig, ConfigError> {
        let cfg = self
            .files
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("KONTAKT_TEST_MAIL", Some("erika@example.org"), || {
            let mut v = json!("mailto:${KONTAKT_TEST_MAIL}");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("mailto:erika@example.org"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Köln")), ("ZIP", Some("50667"))], || {
            let mut v = json!([
                "wohnort-$CITY",
                { "ort": "${ZIP} ${CITY}" },
                15,
                false,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["wohnort-Köln", { "ort": "50667 Köln" }, 15, false, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("LAST", Some("Mustermann")),
                ("FULL", Some("Erika ${LAST}")),
                ("GREETING", Some("Hallo, ${FULL}!")),
            ],
            || {
                let mut v = json!("${GREETING}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("Hallo, Erika Mustermann!"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("token-${KONTAKT_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("token-${KONTAKT_DOES_NOT_EXIST}"));
    }

    #[test]
    fn disabled_oracle_is_not_active() {
        let cfg = KontaktConfigLoader::new()
            .with_yaml_str(
                "oracle:\n  provider: ollama\n  model: m\nmatching:\n  use_oracle: false\n",
            )
            .load()
            .unwrap();
        assert!(cfg.oracle.is_some());
        assert!(cfg.active_oracle().is_none());
    }
}
