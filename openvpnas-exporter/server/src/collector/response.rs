//! Typed results of the agent methods used by the collector.

use crate::rpc::{Error, FromValue, Value};

/// Result of `GetVPNSummary`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VpnSummary {
    pub connected_clients: i64,
}

impl FromValue for VpnSummary {
    fn from_value(value: &Value) -> Result<Self, Error> {
        let members = value.as_members()?;
        Ok(Self { connected_clients: members.required_i64("n_clients")? })
    }
}

/// Result of `GetSubscriptionStatus`.
///
/// Only the connection counters and the update timestamp are exported; the
/// remaining members are decoded when present.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubscriptionStatus {
    pub last_successful_update: i64,
    pub current_connections: i64,
    pub maximum_connections: i64,
    pub fallback_connections: i64,

    pub agent_disabled: Option<bool>,
    pub agent_id: Option<String>,
    pub connection_limit: Option<i64>,
    pub error: Option<String>,
    pub grace_period: Option<i64>,
    pub last_successful_update_age: Option<i64>,
    pub name: Option<String>,
    pub next_update: Option<i64>,
    pub next_update_in: Option<i64>,
    pub notes: Vec<String>,
    pub overdraft: Option<bool>,
    pub server: Option<String>,
    pub state: Option<String>,
    pub subscription_type: Option<String>,
    pub updates_failed: Option<i64>,
}

impl FromValue for SubscriptionStatus {
    fn from_value(value: &Value) -> Result<Self, Error> {
        let members = value.as_members()?;
        Ok(Self {
            last_successful_update: members.required_i64("last_successful_update")?,
            current_connections: members.required_i64("current_cc")?,
            maximum_connections: members.required_i64("max_cc")?,
            fallback_connections: members.required_i64("fallback_cc")?,
            agent_disabled: members.optional_bool("agent_disabled")?,
            agent_id: members.optional_string("agent_id")?,
            connection_limit: members.optional_i64("cc_limit")?,
            error: members.optional_string("error")?,
            grace_period: members.optional_i64("grace_period")?,
            last_successful_update_age: members.optional_i64("last_successful_update_age")?,
            name: members.optional_string("name")?,
            next_update: members.optional_i64("next_update")?,
            next_update_in: members.optional_i64("next_update_in")?,
            notes: members.optional_strings("notes")?,
            overdraft: members.optional_bool("overdraft")?,
            server: members.optional_string("server")?,
            state: members.optional_string("state")?,
            subscription_type: members.optional_string("type")?,
            updates_failed: members.optional_i64("updates_failed")?,
        })
    }
}
