//! Research context a session generates hypotheses for.

use serde::{Deserialize, Serialize};

/// Opaque research context strings.
///
/// Nothing here is validated mechanically. The actor prompt tells the model
/// to refuse when gene names or other inputs do not look real.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypothesisContext {
    /// Important model features, usually gene names (e.g. `"BRCA1, BRCA2"`).
    pub genes: String,
    /// Disease the model was trained on.
    pub disease: String,
    /// Variable the model predicts.
    pub target_variable: String,
    /// Kind of interaction to hypothesise about.
    pub hypothesis_type: String,
    /// Hypotheses to steer away from.
    pub known_hypotheses: String,
}

impl Default for HypothesisContext {
    fn default() -> Self {
        Self {
            genes: "BRCA1, BRCA2".to_string(),
            disease: "triple negative breast cancer".to_string(),
            target_variable:
                "homologous recombination-proficient vs homologous recombination-deficient"
                    .to_string(),
            hypothesis_type: "synthetic lethality interaction".to_string(),
            known_hypotheses: String::new(),
        }
    }
}
