//! Query traces.
//!
//! A [`QueryTrace`] records how the registry arrived at a decision: which
//! role the actor resolved to, every role visited in order, and where the
//! final answer came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::MatchSource;

/// One role visited during a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStep {
    /// Role that was queried.
    pub role: String,

    /// Where the selected response was found, if any was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<MatchSource>,

    /// The role's answer; `None` means no opinion.
    pub result: Option<bool>,
}

/// Where the final decision came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionSource {
    /// A rule of a role in the graph.
    Rule {
        /// Role whose rule decided.
        role: String,
        /// Where in that role the rule was found.
        matched: MatchSource,
    },
    /// The actor plays no registered role.
    NoRole,
    /// No role in the graph had an opinion.
    Fallback,
}

/// Record of a single registry query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTrace {
    /// Trace identifier.
    pub id: Uuid,

    /// When the query started.
    pub started_at: DateTime<Utc>,

    /// Role name the actor resolved to, registered or not.
    pub actor_role: Option<String>,

    /// Canonical identifier of the resource.
    pub resource: Option<String>,

    /// The action attempted.
    pub action: String,

    /// Roles visited, in visiting order.
    pub steps: Vec<TraceStep>,

    /// Final decision.
    pub decision: bool,

    /// Where the final decision came from.
    pub source: DecisionSource,
}

impl QueryTrace {
    pub(crate) fn start(actor_role: Option<String>, resource: Option<String>, action: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            started_at: Utc::now(),
            actor_role,
            resource,
            action: action.to_string(),
            steps: Vec::new(),
            decision: false,
            source: DecisionSource::Fallback,
        }
    }

    /// Names of the visited roles, in visiting order.
    pub fn visited(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.role.as_str()).collect()
    }

    /// Render the trace as JSON for logging or diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "started_at": self.started_at,
            "actor_role": self.actor_role,
            "resource": self.resource,
            "action": self.action,
            "steps": self.steps,
            "decision": self.decision,
            "source": self.source,
        })
    }
}
