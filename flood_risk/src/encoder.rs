/// Label encoder: string risk labels ↔ dense integer codes.
///
/// Codes are assigned in sorted string order of the distinct labels seen at
/// fit time (`High` = 0, `Low` = 1, `Medium` = 2 for the usual label set).
/// That order is a by-product of sorting, not a statement about severity.

use std::collections::BTreeSet;

use bitcode::{Decode, Encode};

use crate::model::RiskError;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fits the encoder on every distinct label in `labels`.
    ///
    /// Callers pass the full label column, not a training split, so that no
    /// rare class can be missing a code.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Result<Self, RiskError> {
        let classes: BTreeSet<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        if classes.is_empty() {
            return Err(RiskError::InsufficientData(
                "cannot fit a label encoder on an empty label column".to_string(),
            ));
        }
        Ok(LabelEncoder {
            classes: classes.into_iter().collect(),
        })
    }

    /// Known labels, indexed by code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn encode(&self, label: &str) -> Result<u32, RiskError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map(|idx| idx as u32)
            .map_err(|_| {
                RiskError::Schema(format!(
                    "label '{}' was not seen when the encoder was fit (known: {:?})",
                    label, self.classes
                ))
            })
    }

    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<u32>, RiskError> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    pub fn decode(&self, code: u32) -> Result<&str, RiskError> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| {
                RiskError::Prediction(format!(
                    "code {} has no label (encoder knows {} classes)",
                    code,
                    self.classes.len()
                ))
            })
    }

    pub fn decode_all(&self, codes: &[u32]) -> Result<Vec<&str>, RiskError> {
        codes.iter().map(|&c| self.decode(c)).collect()
    }
}
