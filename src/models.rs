//! Data contracts for the `/models` endpoints.

use serde::{Deserialize, Serialize};

/// Response body of `GET {api_version}/models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Always `list`
    pub object: String,

    #[serde(rename = "data")]
    pub models: Vec<ModelResponse>,
}

/// One catalog entry, also the body of `GET {api_version}/models/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: String,

    /// Always `model`
    pub object: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,

    #[serde(default)]
    pub ready: bool,

    pub owned_by: String,

    #[serde(rename = "permission", default)]
    pub permissions: Vec<ModelPermission>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Capability flags describing what a model allows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPermission {
    pub id: String,

    /// Always `model_permission`
    pub object: String,

    pub created: i64,

    pub allow_create_engine: bool,

    pub allow_sampling: bool,

    pub allow_logprobs: bool,

    pub allow_search_indices: bool,

    pub allow_view: bool,

    pub allow_fine_tuning: bool,

    pub organization: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<serde_json::Value>,

    pub is_blocking: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn permission() -> serde_json::Value {
        json!({
            "id": "modelperm-U6ZwlyAd0LyMk4rcMdz33Yc3",
            "object": "model_permission",
            "created": 1669066355,
            "allow_create_engine": false,
            "allow_sampling": true,
            "allow_logprobs": true,
            "allow_search_indices": false,
            "allow_view": true,
            "allow_fine_tuning": false,
            "organization": "*",
            "group": null,
            "is_blocking": false
        })
    }

    #[test]
    fn parses_model_with_permissions_and_lineage() {
        let body = json!({
            "id": "davinci-instruct-beta",
            "object": "model",
            "created": 1649364042,
            "owned_by": "openai",
            "permission": [permission()],
            "root": "davinci-instruct-beta",
            "parent": null
        });

        let model: ModelResponse = serde_json::from_value(body).unwrap();

        assert_eq!(model.root.as_deref(), Some("davinci-instruct-beta"));
        assert!(model.parent.is_none());
        assert!(!model.ready);
        let permission = &model.permissions[0];
        assert!(permission.allow_sampling);
        assert!(!permission.allow_fine_tuning);
        assert_eq!(permission.organization, "*");
        assert!(permission.group.is_none());
    }

    #[test]
    fn listing_uses_data_member() {
        let body = json!({
            "object": "list",
            "data": [{ "id": "babbage", "object": "model", "owned_by": "openai" }]
        });

        let listing: ModelsResponse = serde_json::from_value(body).unwrap();

        assert_eq!(listing.object, "list");
        assert_eq!(listing.models[0].id, "babbage");
        assert!(listing.models[0].permissions.is_empty());
    }

    #[test]
    fn incomplete_permission_fails_decode() {
        let mut broken = permission();
        broken.as_object_mut().unwrap().remove("allow_view");
        let body = json!({
            "id": "davinci",
            "object": "model",
            "owned_by": "openai",
            "permission": [broken]
        });

        assert!(serde_json::from_value::<ModelResponse>(body).is_err());
    }
}
