use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kontakt_common::OutputFormat;
use kontakt_forms::BatchReport;
use kontakt_forms::report::ReportRow;
use serde::Serialize;

/// Encode a batch report. CSV carries one flat row per URL.
pub fn render_batch(report: &BatchReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Csv => {
            let rows: Vec<ReportRow> = report.reports.iter().map(ReportRow::from).collect();
            render_csv(&rows)
        }
        _ => render(report, format),
    }
}

/// Encode any serializable value as JSON or YAML, or a row list as CSV.
pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        OutputFormat::Csv => {
            anyhow::bail!("csv export needs flat rows; use render_csv")
        }
    }
}

pub fn render_csv<R: Serialize>(rows: &[R]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(String::from_utf8(bytes)?)
}

/// Write `report` to `<dir>/kontakt-<batch id>.<ext>` and return the path.
pub fn write_batch(report: &BatchReport, dir: &Path, format: OutputFormat) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("kontakt-{}.{}", report.id, format.extension()));
    fs::write(&path, render_batch(report, format)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kontakt_forms::{
        FieldDescriptor, FieldMapping, FillOutcome, FormField, MappingSource, MatchedBy,
        Strategy, UrlReport,
    };

    fn outcome(role: FormField, succeeded: bool) -> FillOutcome {
        FillOutcome {
            role,
            attempted: true,
            succeeded,
            strategy_used: succeeded.then_some(Strategy::Direct),
            error: (!succeeded).then(|| "fill rejected: read-only".to_string()),
            lossy: false,
        }
    }

    fn batch() -> BatchReport {
        let mut mapping = FieldMapping::new();
        mapping.claim(FieldDescriptor::found(FormField::Email, "#mail", MatchedBy::InputType));
        mapping.claim(FieldDescriptor::found(FormField::Message, "#msg", MatchedBy::TextareaDefault));
        let mut ok = UrlReport::from_fill(
            "https://a.example/kontakt",
            MappingSource::Heuristic,
            &mapping,
            vec![outcome(FormField::Email, true), outcome(FormField::Message, false)],
        );
        ok.submitted = true;
        BatchReport {
            id: "6f1c2a7e-3a43-4d7a-9a6b-0c9e5b3f0d11".parse().unwrap(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            reports: vec![ok, UrlReport::failed("https://b.example", "navigation failed: dns")],
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_url() {
        let csv = render_batch(&batch(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "url,fields_found,fields_filled,submitted,error");
        assert_eq!(lines[1], "https://a.example/kontakt,email;message,email,true,");
        assert_eq!(lines[2], "https://b.example,,,false,navigation failed: dns");
    }

    #[test]
    fn json_and_yaml_keep_report_structure() {
        let json = render_batch(&batch(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["reports"][0]["fieldsFound"]["email"]["selector"], "#mail");
        assert_eq!(value["reports"][0]["fieldsFilled"][1]["succeeded"], false);

        let yaml = render_batch(&batch(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("submitted: true"));
    }

    #[test]
    fn writes_file_named_after_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_batch(&batch(), dir.path(), OutputFormat::Json).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "kontakt-6f1c2a7e-3a43-4d7a-9a6b-0c9e5b3f0d11.json"
        );
        assert!(path.exists());
    }
}
