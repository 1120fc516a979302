//! Group fairness auditing for model predictions
//!
//! Given scored predictions, ground truth and one or more protected
//! attributes, the auditor partitions samples into groups, builds a
//! confusion matrix per group and reduces the groups to ratio metrics in
//! `[0, 1]` (1.0 means every group is treated alike). A metric below its
//! threshold is a violation; severity comes from how far below it falls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A protected attribute with one group value per sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedAttribute {
    pub name: String,
    pub values: Vec<String>,
    /// Group value treated as the reference for disparate impact
    pub privileged: String,
}

/// Metric thresholds, all ratios
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessThresholds {
    pub demographic_parity: f64,
    pub equalized_odds: f64,
    pub equal_opportunity: f64,
    pub calibration: f64,
    pub disparate_impact: f64,
}

impl Default for FairnessThresholds {
    fn default() -> Self {
        Self {
            demographic_parity: 0.8,
            equalized_odds: 0.8,
            equal_opportunity: 0.8,
            calibration: 0.8,
            disparate_impact: 0.8,
        }
    }
}

impl FairnessThresholds {
    pub fn for_metric(&self, metric: FairnessMetric) -> f64 {
        match metric {
            FairnessMetric::DemographicParity => self.demographic_parity,
            FairnessMetric::EqualizedOdds => self.equalized_odds,
            FairnessMetric::EqualOpportunity => self.equal_opportunity,
            FairnessMetric::Calibration => self.calibration,
            FairnessMetric::DisparateImpact => self.disparate_impact,
        }
    }
}

/// Auditor configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Scores at or above this value count as a positive prediction
    pub decision_threshold: f64,
    pub thresholds: FairnessThresholds,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            decision_threshold: 0.5,
            thresholds: FairnessThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessMetric {
    DemographicParity,
    EqualizedOdds,
    EqualOpportunity,
    Calibration,
    DisparateImpact,
}

impl FairnessMetric {
    pub const ALL: [FairnessMetric; 5] = [
        FairnessMetric::DemographicParity,
        FairnessMetric::EqualizedOdds,
        FairnessMetric::EqualOpportunity,
        FairnessMetric::Calibration,
        FairnessMetric::DisparateImpact,
    ];

    fn recommendation(&self) -> &'static str {
        match self {
            FairnessMetric::DemographicParity => {
                "Positive prediction rates differ across groups; review feature selection for proxies of the protected attribute or rebalance the training data."
            }
            FairnessMetric::EqualizedOdds => {
                "Error rates differ across groups; consider group-aware threshold post-processing."
            }
            FairnessMetric::EqualOpportunity => {
                "True positive rates differ across groups; collect more positive examples for under-served groups."
            }
            FairnessMetric::Calibration => {
                "Scores are not equally calibrated across groups; recalibrate per group (e.g. isotonic or Platt scaling)."
            }
            FairnessMetric::DisparateImpact => {
                "Unprivileged groups are selected far less often than the privileged group; audit upstream data collection and apply reweighing."
            }
        }
    }
}

impl std::fmt::Display for FairnessMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FairnessMetric::DemographicParity => write!(f, "demographic_parity"),
            FairnessMetric::EqualizedOdds => write!(f, "equalized_odds"),
            FairnessMetric::EqualOpportunity => write!(f, "equal_opportunity"),
            FairnessMetric::Calibration => write!(f, "calibration"),
            FairnessMetric::DisparateImpact => write!(f, "disparate_impact"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Band a metric by its ratio to the threshold
    pub fn from_ratio(value: f64, threshold: f64) -> Self {
        let ratio = if threshold > 0.0 { value / threshold } else { 1.0 };
        if ratio < 0.5 {
            Severity::Critical
        } else if ratio < 0.7 {
            Severity::High
        } else if ratio < 0.9 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn positive_rate(&self) -> Option<f64> {
        rate(self.true_positives + self.false_positives, self.total())
    }

    pub fn true_positive_rate(&self) -> Option<f64> {
        rate(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn false_positive_rate(&self) -> Option<f64> {
        rate(self.false_positives, self.false_positives + self.true_negatives)
    }

    pub fn base_rate(&self) -> Option<f64> {
        rate(self.true_positives + self.false_negatives, self.total())
    }
}

fn rate(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Per-group statistics for one attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: String,
    pub privileged: bool,
    pub size: u64,
    pub confusion: ConfusionMatrix,
    pub mean_score: f64,
}

impl GroupStats {
    /// `1 - |mean score - observed base rate|`
    pub fn calibration(&self) -> Option<f64> {
        self.confusion
            .base_rate()
            .map(|base| 1.0 - (self.mean_score - base).abs())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricResult {
    pub attribute: String,
    pub metric: FairnessMetric,
    /// `None` when fewer than two groups define the underlying rate
    pub value: Option<f64>,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub attribute: String,
    pub metric: FairnessMetric,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeReport {
    pub attribute: String,
    pub groups: Vec<GroupStats>,
}

/// Result of a single audit call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessReport {
    pub samples: usize,
    pub attributes: Vec<AttributeReport>,
    pub metrics: Vec<MetricResult>,
    pub violations: Vec<Violation>,
    pub recommendations: Vec<String>,
    pub overall_fair: bool,
}

impl FairnessReport {
    pub fn worst_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }
}

/// Stateless fairness auditor
pub struct FairnessAuditor;

impl FairnessAuditor {
    pub fn audit(
        predictions: &[f64],
        labels: &[bool],
        attributes: &[ProtectedAttribute],
        config: &AuditConfig,
    ) -> Result<FairnessReport> {
        Self::validate(predictions, labels, attributes, config)?;

        let mut attribute_reports = Vec::with_capacity(attributes.len());
        let mut metrics = Vec::new();
        let mut violations = Vec::new();

        for attribute in attributes {
            let groups = Self::build_groups(predictions, labels, attribute, config.decision_threshold);

            for metric in FairnessMetric::ALL {
                let value = Self::metric_value(metric, &groups);
                let threshold = config.thresholds.for_metric(metric);
                let passed = value.map_or(true, |v| v >= threshold);

                if let (Some(v), false) = (value, passed) {
                    violations.push(Violation {
                        attribute: attribute.name.clone(),
                        metric,
                        value: v,
                        threshold,
                        severity: Severity::from_ratio(v, threshold),
                        description: format!(
                            "{} for '{}' is {:.3}, below threshold {:.3}",
                            metric, attribute.name, v, threshold
                        ),
                    });
                }

                metrics.push(MetricResult {
                    attribute: attribute.name.clone(),
                    metric,
                    value,
                    threshold,
                    passed,
                });
            }

            attribute_reports.push(AttributeReport {
                attribute: attribute.name.clone(),
                groups,
            });
        }

        let recommendations = Self::recommendations(&violations);
        let overall_fair = violations.is_empty();

        Ok(FairnessReport {
            samples: predictions.len(),
            attributes: attribute_reports,
            metrics,
            violations,
            recommendations,
            overall_fair,
        })
    }

    fn validate(
        predictions: &[f64],
        labels: &[bool],
        attributes: &[ProtectedAttribute],
        config: &AuditConfig,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&config.decision_threshold) {
            return Err(Error::InvalidInput(format!(
                "decision threshold {} outside [0, 1]",
                config.decision_threshold
            )));
        }
        if predictions.is_empty() {
            return Err(Error::InvalidInput("no predictions to audit".into()));
        }
        if predictions.len() != labels.len() {
            return Err(Error::InvalidInput(format!(
                "{} predictions but {} labels",
                predictions.len(),
                labels.len()
            )));
        }
        if let Some(bad) = predictions.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(Error::InvalidInput(format!("score {} outside [0, 1]", bad)));
        }
        for attribute in attributes {
            if attribute.values.len() != predictions.len() {
                return Err(Error::InvalidInput(format!(
                    "attribute '{}' has {} values for {} predictions",
                    attribute.name,
                    attribute.values.len(),
                    predictions.len()
                )));
            }
            if !attribute.values.contains(&attribute.privileged) {
                return Err(Error::InvalidInput(format!(
                    "privileged group '{}' does not occur in attribute '{}'",
                    attribute.privileged, attribute.name
                )));
            }
        }
        Ok(())
    }

    /// Partition samples by group value, sorted by group name
    fn build_groups(
        predictions: &[f64],
        labels: &[bool],
        attribute: &ProtectedAttribute,
        decision_threshold: f64,
    ) -> Vec<GroupStats> {
        let mut partitions: BTreeMap<&str, (ConfusionMatrix, f64)> = BTreeMap::new();

        for ((score, actual), group) in predictions.iter().zip(labels).zip(&attribute.values) {
            let entry = partitions.entry(group.as_str()).or_default();
            entry.0.record(*score >= decision_threshold, *actual);
            entry.1 += score;
        }

        partitions
            .into_iter()
            .map(|(group, (confusion, score_sum))| {
                let size = confusion.total();
                GroupStats {
                    group: group.to_string(),
                    privileged: group == attribute.privileged,
                    size,
                    confusion,
                    mean_score: score_sum / size as f64,
                }
            })
            .collect()
    }

    fn metric_value(metric: FairnessMetric, groups: &[GroupStats]) -> Option<f64> {
        match metric {
            FairnessMetric::DemographicParity => {
                min_max_ratio(groups.iter().filter_map(|g| g.confusion.positive_rate()))
            }
            FairnessMetric::EqualOpportunity => {
                min_max_ratio(groups.iter().filter_map(|g| g.confusion.true_positive_rate()))
            }
            FairnessMetric::EqualizedOdds => {
                let tpr = min_max_ratio(groups.iter().filter_map(|g| g.confusion.true_positive_rate()));
                let tnr = min_max_ratio(
                    groups
                        .iter()
                        .filter_map(|g| g.confusion.false_positive_rate())
                        .map(|fpr| 1.0 - fpr),
                );
                match (tpr, tnr) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                }
            }
            FairnessMetric::Calibration => {
                min_max_ratio(groups.iter().filter_map(GroupStats::calibration))
            }
            FairnessMetric::DisparateImpact => {
                let privileged = groups
                    .iter()
                    .find(|g| g.privileged)
                    .and_then(|g| g.confusion.positive_rate())?;
                let unprivileged: Vec<f64> = groups
                    .iter()
                    .filter(|g| !g.privileged)
                    .filter_map(|g| g.confusion.positive_rate())
                    .collect();
                if unprivileged.is_empty() {
                    return None;
                }
                if privileged == 0.0 {
                    // Nobody selected in the reference group: parity only if nobody anywhere is
                    return unprivileged.iter().all(|r| *r == 0.0).then_some(1.0);
                }
                // Capped at parity
                unprivileged
                    .into_iter()
                    .map(|r| (r / privileged).min(1.0))
                    .reduce(f64::min)
            }
        }
    }

    fn recommendations(violations: &[Violation]) -> Vec<String> {
        if violations.is_empty() {
            return vec!["No fairness violations detected; keep monitoring as data drifts.".to_string()];
        }

        let mut seen = Vec::new();
        let mut out = Vec::new();
        for violation in violations {
            if seen.contains(&violation.metric) {
                continue;
            }
            seen.push(violation.metric);
            out.push(violation.metric.recommendation().to_string());
        }
        if violations.iter().any(|v| v.severity == Severity::Critical) {
            out.push("Critical disparity found: hold deployment until it is resolved.".to_string());
        }
        out
    }
}

/// `min / max` over the defined values; `None` with fewer than two groups
fn min_max_ratio(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.len() < 2 {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        Some(1.0)
    } else {
        Some(min / max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn attribute(values: &[&str], privileged: &str) -> ProtectedAttribute {
        ProtectedAttribute {
            name: "region".to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            privileged: privileged.to_string(),
        }
    }

    #[test_case(0.2, 0.8 => Severity::Critical; "quarter of threshold")]
    #[test_case(0.5, 0.8 => Severity::High; "ratio 0.625")]
    #[test_case(0.6, 0.8 => Severity::Medium; "ratio 0.75")]
    #[test_case(0.75, 0.8 => Severity::Low; "ratio 0.9375")]
    fn test_severity_banding(value: f64, threshold: f64) -> Severity {
        Severity::from_ratio(value, threshold)
    }

    #[test]
    fn test_identical_groups_are_fair() {
        let predictions = [0.9, 0.1, 0.9, 0.1];
        let labels = [true, false, true, false];
        let attr = attribute(&["urban", "urban", "rural", "rural"], "urban");

        let report =
            FairnessAuditor::audit(&predictions, &labels, &[attr], &AuditConfig::default()).unwrap();
        assert!(report.overall_fair);
        assert_eq!(report.attributes[0].groups.len(), 2);
        for metric in &report.metrics {
            assert_eq!(metric.value, Some(1.0), "{}", metric.metric);
        }
    }

    #[test]
    fn test_skewed_selection_violates_disparate_impact() {
        // urban: 3/4 selected, rural: 1/4 selected
        let predictions = [0.9, 0.8, 0.7, 0.1, 0.9, 0.2, 0.1, 0.3];
        let labels = [true, true, false, false, true, true, false, false];
        let attr = attribute(
            &["urban", "urban", "urban", "urban", "rural", "rural", "rural", "rural"],
            "urban",
        );

        let report =
            FairnessAuditor::audit(&predictions, &labels, &[attr], &AuditConfig::default()).unwrap();
        assert!(!report.overall_fair);

        let di = report
            .violations
            .iter()
            .find(|v| v.metric == FairnessMetric::DisparateImpact)
            .unwrap();
        assert!((di.value - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(di.severity, Severity::Critical);
        assert_eq!(report.worst_severity(), Some(Severity::Critical));
        assert!(report.recommendations.iter().any(|r| r.contains("Critical")));
    }

    #[test]
    fn test_disparate_impact_capped_at_parity() {
        // urban (privileged): 1/4 selected, rural: 3/4 selected
        let predictions = [0.9, 0.1, 0.2, 0.3, 0.9, 0.8, 0.7, 0.1];
        let labels = [true, false, false, false, true, true, true, false];
        let attr = attribute(
            &["urban", "urban", "urban", "urban", "rural", "rural", "rural", "rural"],
            "urban",
        );

        let report =
            FairnessAuditor::audit(&predictions, &labels, &[attr], &AuditConfig::default()).unwrap();
        let di = report
            .metrics
            .iter()
            .find(|m| m.metric == FairnessMetric::DisparateImpact)
            .unwrap();
        assert_eq!(di.value, Some(1.0));
        assert!(di.passed);
        assert!(report.metrics.iter().flat_map(|m| m.value).all(|v| (0.0..=1.0).contains(&v)));
    }

    #[test_case(f64::NAN ; "nan")]
    #[test_case(1.5 ; "above one")]
    #[test_case(-0.1 ; "negative")]
    fn test_rejects_decision_threshold(decision_threshold: f64) {
        let attr = attribute(&["urban", "rural"], "urban");
        let config = AuditConfig {
            decision_threshold,
            ..Default::default()
        };
        let err = FairnessAuditor::audit(&[0.5, 0.5], &[true, false], &[attr], &config);
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_single_group_metrics_are_undefined() {
        let predictions = [0.9, 0.1];
        let labels = [true, false];
        let attr = attribute(&["urban", "urban"], "urban");

        let report =
            FairnessAuditor::audit(&predictions, &labels, &[attr], &AuditConfig::default()).unwrap();
        assert!(report.metrics.iter().all(|m| m.value.is_none() && m.passed));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let attr = attribute(&["urban"], "urban");
        let err = FairnessAuditor::audit(&[0.5, 0.5], &[true], &[attr], &AuditConfig::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_missing_privileged_group() {
        let attr = attribute(&["urban", "rural"], "suburban");
        let err = FairnessAuditor::audit(&[0.5, 0.5], &[true, false], &[attr], &AuditConfig::default());
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }
}
