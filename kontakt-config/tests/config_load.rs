use kontakt_common::OutputFormat;
use kontakt_config::{KontaktConfigLoader, LlmConfig};
use kontakt_forms::FormField;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

const FILE_YAML: &str = r#"
version: "1"
applicant:
  full_name: "Erika Mustermann"
  email: "erika@example.org"
  phone: "0221 1234567"
  zip: "50667"
  city: "Köln"
  message: "Guten Tag, ich interessiere mich für die Stelle."
browser:
  kind: firefox
  window:
    width: 1280
    height: 800
oracle:
  provider: openai
  model: "gpt-4o-mini"
  auth_token: "${KONTAKT_TEST_OPENAI_KEY}"
  temperature: 0.1
matching:
  vocabulary:
    phone:
      labels: ["Rückrufnummer"]
      placeholders: ["Ihre Nummer"]
run:
  submit: false
  settle_timeout_ms: 8000
output:
  dir: "./out"
  format: csv
"#;

#[test]
#[serial]
fn loads_file_sections() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "kontakt.yaml", FILE_YAML);

    let config = temp_env::with_var("KONTAKT_TEST_OPENAI_KEY", Some("sk-from-env"), || {
        KontaktConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load kontakt config")
    });

    assert_eq!(config.applicant.full_name, "Erika Mustermann");
    assert_eq!(config.applicant.zip, "50667");
    assert_eq!(config.browser.kind, "firefox");
    assert!(config.browser.headless);
    assert_eq!(config.browser.window.map(|w| (w.width, w.height)), Some((1280, 800)));
    assert_eq!(config.run.settle_timeout_ms, 8000);
    assert!(config.run.dismiss_consent);
    assert_eq!(config.output.format, OutputFormat::Csv);

    let phone = &config.matching.vocabulary[&FormField::Phone];
    assert_eq!(phone.labels, vec!["Rückrufnummer".to_string()]);

    let oracle = config.active_oracle().expect("oracle configured");
    match &oracle.llm {
        LlmConfig::Openai {
            auth_token,
            endpoint,
            temperature,
            ..
        } => {
            assert_eq!(auth_token, "sk-from-env");
            assert_eq!(endpoint, "https://api.openai.com/v1");
            assert_eq!(*temperature, Some(0.1));
        }
        other => panic!("expected openai, got {other:?}"),
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "kontakt.yaml", FILE_YAML);

    let config = temp_env::with_vars(
        [
            ("KONTAKT_TEST_OPENAI_KEY", Some("sk-x")),
            ("KONTAKT__RUN__SUBMIT", Some("true")),
            ("KONTAKT__BROWSER__TYPING_DELAY_MS", Some("40")),
            ("KONTAKT__APPLICANT__PHONE", Some("0176 5550000")),
        ],
        || KontaktConfigLoader::new().with_file(&p).load().unwrap(),
    );

    assert!(config.run.submit);
    assert_eq!(config.browser.typing_delay_ms, 40);
    assert_eq!(config.applicant.phone, "0176 5550000");
    assert_eq!(config.applicant.email, "erika@example.org");
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let config = KontaktConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .unwrap();

    assert!(config.oracle.is_none());
    assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
    assert_eq!(config.output.format, OutputFormat::Json);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = KontaktConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load()
        .unwrap_err();
    assert!(err.to_string().contains("absent"));
}

#[test]
#[serial]
fn unparsable_env_scalar_is_reported() {
    let err = temp_env::with_var("KONTAKT__RUN__SUBMIT", Some("vielleicht"), || {
        KontaktConfigLoader::new().load().unwrap_err()
    });
    assert!(err.to_string().contains("vielleicht"));
}
