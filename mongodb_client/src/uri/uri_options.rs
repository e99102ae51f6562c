use std::collections::HashMap;

use crate::uri::UriError;

/// Option keys the resolver itself consumes, in their normalized form.
pub mod option_keys {
    pub const AUTH_SOURCE: &str = "authsource";
    pub const DIRECT_CONNECTION: &str = "directconnection";
    pub const LOAD_BALANCED: &str = "loadbalanced";
    pub const REPLICA_SET: &str = "replicaset";
}

/// A single parsed option value.
///
/// Only boolean-valued options are interpreted; everything else is stored as
/// an opaque string.
// TODO: Parse list options and values representing key/value pairs.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

/// The validated option set of a connection string.
///
/// Keys are case-insensitive and stored lowercased. Later assignments win,
/// which is how explicit query-string options override TXT-sourced ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UriOptions {
    options: HashMap<String, OptionValue>,
}

impl UriOptions {
    pub(crate) fn set(&mut self, key: &str, value: &str) -> Result<(), UriError> {
        let key = key.to_ascii_lowercase();
        match key.as_str() {
            option_keys::DIRECT_CONNECTION | option_keys::LOAD_BALANCED => {
                let parsed = parse_bool(value).ok_or_else(|| UriError::InvalidOptionValue {
                    key: key.clone(),
                    value: value.to_string(),
                })?;
                self.options.insert(key, OptionValue::Bool(parsed));
            }
            _ => {
                self.options.insert(key, OptionValue::Str(value.to_string()));
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(&key.to_ascii_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn direct_connection(&self) -> bool {
        self.bool_option(option_keys::DIRECT_CONNECTION)
    }

    pub fn load_balanced(&self) -> bool {
        self.bool_option(option_keys::LOAD_BALANCED)
    }

    pub fn replica_set(&self) -> Option<&str> {
        self.str_option(option_keys::REPLICA_SET)
    }

    pub fn auth_source(&self) -> Option<&str> {
        self.str_option(option_keys::AUTH_SOURCE)
    }

    fn bool_option(&self, key: &str) -> bool {
        matches!(self.options.get(key), Some(OptionValue::Bool(true)))
    }

    fn str_option(&self, key: &str) -> Option<&str> {
        match self.options.get(key) {
            Some(OptionValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "y" | "t" => Some(true),
        "false" | "0" | "-1" | "no" | "n" | "f" => Some(false),
        _ => None,
    }
}
