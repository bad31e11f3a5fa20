/// Evaluation of a trained classifier.
///
/// Submodules:
/// - `report` - per-class precision / recall / F1 / support and accuracy
///   over the held-out split.

pub mod report;
