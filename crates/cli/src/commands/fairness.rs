//! `resq fairness`: audit a prediction set for group fairness

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use resq_common::fairness::{MetricResult, Violation};
use resq_common::{AuditConfig, FairnessAuditor, FairnessReport, ProtectedAttribute};

use super::GlobalArgs;
use crate::output::{
    print_error, print_list, print_success, print_value, print_warning, OutputFormat, TableDisplay,
};

#[derive(Args, Debug)]
pub struct FairnessArgs {
    /// JSON file with `predictions`, `labels`, `attributes` and optional `config`
    pub input: PathBuf,

    /// Override the decision threshold
    #[arg(long)]
    pub decision_threshold: Option<f64>,
}

/// Audit input as read from disk
#[derive(Debug, Deserialize)]
pub struct AuditInput {
    pub predictions: Vec<f64>,
    pub labels: Vec<bool>,
    pub attributes: Vec<ProtectedAttribute>,
    #[serde(default)]
    pub config: AuditConfig,
}

impl AuditInput {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Serialize)]
struct MetricRow<'a>(&'a MetricResult);

impl TableDisplay for MetricRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Attribute", "Metric", "Value", "Threshold", "Passed"]
    }

    fn row(&self) -> Vec<String> {
        let m = self.0;
        vec![
            m.attribute.clone(),
            m.metric.to_string(),
            m.value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "n/a".to_string()),
            format!("{:.2}", m.threshold),
            if m.passed { "✓" } else { "✗" }.to_string(),
        ]
    }
}

#[derive(Serialize)]
struct ViolationRow<'a>(&'a Violation);

impl TableDisplay for ViolationRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Attribute", "Metric", "Severity", "Description"]
    }

    fn row(&self) -> Vec<String> {
        let v = self.0;
        vec![
            v.attribute.clone(),
            v.metric.to_string(),
            v.severity.to_string(),
            v.description.clone(),
        ]
    }
}

pub fn audit(args: &FairnessArgs) -> Result<FairnessReport> {
    let mut input = AuditInput::load(&args.input)?;
    if let Some(threshold) = args.decision_threshold {
        input.config.decision_threshold = threshold;
    }
    let report = FairnessAuditor::audit(
        &input.predictions,
        &input.labels,
        &input.attributes,
        &input.config,
    )?;
    Ok(report)
}

/// One-line verdict naming the worst violation, `None` when fair
pub fn violation_summary(report: &FairnessReport) -> Option<String> {
    let worst = report.worst_severity()?;
    Some(format!(
        "{} fairness violation(s), worst severity: {}",
        report.violations.len(),
        worst
    ))
}

/// Prints the report; `Ok(false)` when any violation was found
pub fn execute(args: FairnessArgs, globals: &GlobalArgs) -> Result<bool> {
    let report = audit(&args)?;

    if matches!(globals.format, OutputFormat::Json | OutputFormat::Yaml) {
        print_value(&report, globals.format);
        return Ok(report.overall_fair);
    }

    let metrics: Vec<_> = report.metrics.iter().map(MetricRow).collect();
    print_list(&metrics, globals.format);

    if report.overall_fair {
        print_success(&format!("No fairness violations across {} samples", report.samples));
        return Ok(true);
    }

    let violations: Vec<_> = report.violations.iter().map(ViolationRow).collect();
    print_list(&violations, globals.format);
    if let Some(summary) = violation_summary(&report) {
        print_error(&summary);
    }
    for recommendation in &report.recommendations {
        print_warning(recommendation);
    }
    Ok(false)
}
