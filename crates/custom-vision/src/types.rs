use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagPrediction {
    pub tag_name: String,
    pub probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
}

/// Response body of the classify-image call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrediction {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub iteration: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub predictions: Vec<TagPrediction>,
}

impl ImagePrediction {
    /// Highest-probability tag; the first one wins a tie.
    pub fn best(&self) -> Option<&TagPrediction> {
        self.predictions.iter().fold(None, |best, candidate| match best {
            Some(top) if candidate.probability <= top.probability => Some(top),
            _ => Some(candidate),
        })
    }
}
