/// Held-out evaluation report.
///
/// `classification_report` compares predicted codes against true codes and
/// produces per-class precision, recall, F1 and support, plus accuracy and
/// macro / support-weighted averages. Classes appearing in neither the true
/// nor the predicted codes are left out. A zero denominator yields 0.0.
///
/// The report is diagnostic only: the trainer prints it and persists the
/// model regardless of the numbers.

use std::fmt;

use crate::encoder::LabelEncoder;
use crate::model::RiskError;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub total_support: usize,
}

pub fn classification_report(
    y_true: &[u32],
    y_pred: &[u32],
    encoder: &LabelEncoder,
) -> Result<ClassificationReport, RiskError> {
    if y_true.len() != y_pred.len() {
        return Err(RiskError::Prediction(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    let total = y_true.len();
    let n_classes = encoder.len();

    // tp / predicted / actual counts per class code
    let mut tp = vec![0usize; n_classes];
    let mut predicted = vec![0usize; n_classes];
    let mut actual = vec![0usize; n_classes];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        // decode() rejects codes the encoder doesn't know
        encoder.decode(t)?;
        encoder.decode(p)?;
        actual[t as usize] += 1;
        predicted[p as usize] += 1;
        if t == p {
            tp[t as usize] += 1;
        }
    }

    let mut classes = Vec::new();
    for code in 0..n_classes {
        if actual[code] == 0 && predicted[code] == 0 {
            continue;
        }
        let precision = ratio(tp[code], predicted[code]);
        let recall = ratio(tp[code], actual[code]);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        classes.push(ClassMetrics {
            label: encoder.decode(code as u32)?.to_string(),
            precision,
            recall,
            f1,
            support: actual[code],
        });
    }

    let n = classes.len().max(1) as f64;
    let macro_avg = AverageMetrics {
        precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
        recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
        f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
    };

    let weight = |f: fn(&ClassMetrics) -> f64| -> f64 {
        if total == 0 {
            return 0.0;
        }
        classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weight(|c| c.precision),
        recall: weight(|c| c.recall),
        f1: weight(|c| c.f1),
    };

    Ok(ClassificationReport {
        accuracy: ratio(tp.iter().sum(), total),
        classes,
        macro_avg,
        weighted_avg,
        total_support: total,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Fixed-width text table in the familiar precision/recall/f1/support layout.
impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.total_support
            )?;
        }
        Ok(())
    }
}
