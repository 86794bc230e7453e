//! Structured OCI punchout configuration.
//!
//! An OCI punchout is described entirely by a URL: the supplier endpoint plus
//! query parameters. Three parameter names are reserved and map onto
//! dedicated fields of [`OciConfig`]; everything else is a [`CustomParam`]
//! row. Classification goes through [`ReservedParam`] so that the reserved
//! set is spelled out in one place.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the query parameters with a dedicated field in [`OciConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservedParam {
    /// `username`
    Username,
    /// `password`
    Password,
    /// `hook_url`
    HookUrl,
}

impl ReservedParam {
    /// Reserved parameters in the order they are written into a rebuilt URL.
    pub const ALL: [ReservedParam; 3] = [
        ReservedParam::Username,
        ReservedParam::Password,
        ReservedParam::HookUrl,
    ];

    /// The query-string name of this parameter.
    pub fn query_name(self) -> &'static str {
        match self {
            ReservedParam::Username => "username",
            ReservedParam::Password => "password",
            ReservedParam::HookUrl => "hook_url",
        }
    }

    /// Classifies a query key. Reserved names match case-insensitively.
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|param| key.eq_ignore_ascii_case(param.query_name()))
    }
}

/// A user-defined query parameter row.
///
/// `id` identifies the row across edits. `prev_key` is the key as it was at
/// the last successful URL extraction; a rebuild uses it to detect renames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomParam {
    /// Query parameter name.
    pub key: String,
    /// Query parameter value.
    pub value: String,
    /// Stable row identity; ignored by content comparisons.
    pub id: Uuid,
    /// Key at the last extraction, empty for rows added by hand.
    pub prev_key: String,
}

impl CustomParam {
    /// An empty row, as shown for a freshly added or reset form.
    pub fn blank() -> Self {
        CustomParam::synced(String::new(), String::new())
    }

    /// A row freshly read from a URL: `prev_key` equals `key`.
    pub fn synced(key: String, value: String) -> Self {
        CustomParam {
            prev_key: key.clone(),
            key,
            value,
            id: Uuid::new_v4(),
        }
    }

    /// True when the row has never been given a key or value.
    pub fn is_blank(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }

    /// Row equality that ignores the identity token.
    pub fn same_content(&self, other: &CustomParam) -> bool {
        self.key == other.key && self.value == other.value && self.prev_key == other.prev_key
    }
}

/// The editable top-level form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OciField {
    /// The punchout URL.
    BaseUrl,
    /// `username`
    Username,
    /// `password`
    Password,
    /// `hook_url`
    HookUrl,
}

impl From<ReservedParam> for OciField {
    fn from(param: ReservedParam) -> Self {
        match param {
            ReservedParam::Username => OciField::Username,
            ReservedParam::Password => OciField::Password,
            ReservedParam::HookUrl => OciField::HookUrl,
        }
    }
}

/// The editable halves of a custom parameter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    /// The parameter name.
    Key,
    /// The parameter value.
    Value,
}

/// Structured OCI punchout configuration for one form session.
///
/// Serializes to the request body expected by the backend round-trip
/// endpoint: `{ baseURL, username, password, hookURL, customParams }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OciConfig {
    /// The supplier punchout URL including its query.
    #[serde(rename = "baseURL")]
    pub base_url: String,
    /// `username` query parameter.
    pub username: String,
    /// `password` query parameter.
    pub password: String,
    /// Where the supplier posts the cart back.
    #[serde(rename = "hookURL")]
    pub hook_url: String,
    /// Non-reserved query parameters, always at least one row.
    #[serde(rename = "customParams")]
    pub custom_params: Vec<CustomParam>,
}

impl Default for OciConfig {
    fn default() -> Self {
        OciConfig {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            hook_url: String::new(),
            custom_params: vec![CustomParam::blank()],
        }
    }
}

impl OciConfig {
    /// Value of a reserved parameter's dedicated field.
    pub fn reserved(&self, param: ReservedParam) -> &str {
        match param {
            ReservedParam::Username => &self.username,
            ReservedParam::Password => &self.password,
            ReservedParam::HookUrl => &self.hook_url,
        }
    }

    /// Mutable access to a top-level field.
    pub fn field_mut(&mut self, field: OciField) -> &mut String {
        match field {
            OciField::BaseUrl => &mut self.base_url,
            OciField::Username => &mut self.username,
            OciField::Password => &mut self.password,
            OciField::HookUrl => &mut self.hook_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_keys_match_case_insensitively() {
        assert_eq!(
            ReservedParam::from_query_key("USERNAME"),
            Some(ReservedParam::Username)
        );
        assert_eq!(
            ReservedParam::from_query_key("Hook_Url"),
            Some(ReservedParam::HookUrl)
        );
        assert_eq!(ReservedParam::from_query_key("hookurl"), None);
        assert_eq!(ReservedParam::from_query_key("user"), None);
    }

    #[test]
    fn default_config_has_one_blank_row() {
        let config = OciConfig::default();
        assert_eq!(config.custom_params.len(), 1);
        assert!(config.custom_params[0].is_blank());
        assert!(config.base_url.is_empty());
    }

    #[test]
    fn config_serializes_with_backend_field_names() {
        let mut config = OciConfig::default();
        config.base_url = "https://shop.test/oci".to_string();
        config.hook_url = "https://buyer.test/hook".to_string();
        config.custom_params = vec![CustomParam::synced("lang".into(), "EN".into())];

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["baseURL"], "https://shop.test/oci");
        assert_eq!(json["hookURL"], "https://buyer.test/hook");
        assert_eq!(json["customParams"][0]["key"], "lang");
        assert_eq!(json["customParams"][0]["prevKey"], "lang");
        assert!(json["customParams"][0]["id"].is_string());
    }

    #[test]
    fn same_content_ignores_identity() {
        let a = CustomParam::synced("k".into(), "v".into());
        let b = CustomParam::synced("k".into(), "v".into());
        assert_ne!(a.id, b.id);
        assert!(a.same_content(&b));
    }
}
