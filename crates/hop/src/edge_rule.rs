use serde::{Deserialize, Deserializer, Serialize};

/// Edge rule action that redirects the request to `action_parameter_1`.
pub const ACTION_REDIRECT: i32 = 1;
/// Trigger type matching on the request URL.
pub const TRIGGER_URL: i32 = 0;
/// Trigger matching type "match any pattern".
pub const MATCH_ANY: i32 = 0;

/// An edge rule of a pull zone, in the control plane's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EdgeRule {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub guid: String,
    #[serde(default)]
    pub action_type: i32,
    /// Redirect destination for redirect rules.
    #[serde(
        rename = "ActionParameter1",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub action_parameter_1: String,
    /// Redirect status code for redirect rules.
    #[serde(
        rename = "ActionParameter2",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub action_parameter_2: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub trigger_matching_type: i32,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Trigger {
    #[serde(rename = "Type", default)]
    pub trigger_type: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern_matches: Vec<String>,
    #[serde(default)]
    pub pattern_matching_type: i32,
    #[serde(
        rename = "Parameter1",
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub parameter_1: String,
}

/// A hostname attached to a pull zone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hostname {
    #[serde(default)]
    pub id: i64,
    pub value: String,
}

impl Hostname {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: 0,
            value: value.into(),
        }
    }
}

impl EdgeRule {
    /// An enabled 302 redirect from the URL pattern `from` to `to`.
    pub fn redirect_302(from: &str, to: &str, description: &str) -> Self {
        Self {
            guid: String::new(),
            action_type: ACTION_REDIRECT,
            action_parameter_1: to.to_owned(),
            action_parameter_2: "302".to_owned(),
            triggers: vec![Trigger {
                trigger_type: TRIGGER_URL,
                pattern_matches: vec![from.to_owned()],
                pattern_matching_type: MATCH_ANY,
                parameter_1: String::new(),
            }],
            trigger_matching_type: MATCH_ANY,
            description: description.to_owned(),
            enabled: true,
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.action_type == ACTION_REDIRECT
    }

    pub fn is_302_redirect(&self) -> bool {
        self.is_redirect() && self.action_parameter_2 == "302"
    }

    /// First pattern of the first trigger, or "" when the rule has none.
    pub fn source_url(&self) -> &str {
        self.triggers
            .first()
            .and_then(|t| t.pattern_matches.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Redirect destination, or "" when not a redirect.
    pub fn destination(&self) -> &str {
        if self.is_redirect() {
            &self.action_parameter_1
        } else {
            ""
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
