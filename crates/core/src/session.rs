// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session information forwarded with every task update.

use crate::task::QueryId;
use serde::{Deserialize, Serialize};

/// The slice of session state a task needs: who runs the query, where it came
/// from, and the optional failure-injection routing token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSession {
    pub query_id: QueryId,
    pub user: String,
    /// Client-reported source tag (e.g. the submitting tool), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Opaque token routing injected faults to this task. The first non-empty
    /// token observed by the task wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_token: Option<String>,
}

impl TaskSession {
    pub fn new(query_id: impl Into<QueryId>, user: impl Into<String>) -> Self {
        Self { query_id: query_id.into(), user: user.into(), source: None, trace_token: None }
    }

    crate::setters! {
        option {
            source: String,
            trace_token: String,
        }
    }
}
