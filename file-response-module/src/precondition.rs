// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Evaluation of `If-Match`, `If-None-Match`, `If-Modified-Since` and `If-Unmodified-Since`
//! request headers

use std::time::SystemTime;

use crate::conditions::RequestConditions;
use crate::etag::{EntityTag, EntityTagCondition};
use crate::metadata::FileMetadata;

/// Outcome of evaluating one family of conditional headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionState {
    /// The header is absent or doesn’t apply
    Unspecified,
    /// The client’s copy is current, `304 Not Modified` should be produced
    NotModified,
    /// The request should be processed normally
    ShouldProcess,
    /// The precondition doesn’t hold, `412 Precondition Failed` should be produced
    PreconditionFailed,
}

impl PreconditionState {
    /// Priority of the state when multiple header families disagree, higher wins.
    ///
    /// A failed precondition always wins. Note that an explicit `ShouldProcess` from one header
    /// family overrides `NotModified` from another.
    pub fn priority(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::NotModified => 1,
            Self::ShouldProcess => 2,
            Self::PreconditionFailed => 3,
        }
    }

    /// Reduces multiple states to the one with the highest priority. An empty list results in
    /// `Unspecified`.
    pub fn reduce(states: impl IntoIterator<Item = Self>) -> Self {
        states.into_iter().fold(Self::Unspecified, |result, state| {
            if state.priority() > result.priority() {
                state
            } else {
                result
            }
        })
    }
}

/// States of the individual header families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreconditionStates {
    /// State produced by `If-Match`
    pub if_match: PreconditionState,
    /// State produced by `If-None-Match`
    pub if_none_match: PreconditionState,
    /// State produced by `If-Modified-Since`
    pub if_modified_since: PreconditionState,
    /// State produced by `If-Unmodified-Since`
    pub if_unmodified_since: PreconditionState,
}

impl PreconditionStates {
    /// Evaluates all header families against the file metadata. `now` is the time the request is
    /// being processed, `If-Modified-Since` values after it are ignored.
    pub fn evaluate(
        conditions: &RequestConditions,
        meta: &FileMetadata,
        etag: &EntityTag,
        now: SystemTime,
    ) -> Self {
        let last_modified = meta.last_modified();

        let if_match = if conditions.if_match.is_empty() {
            PreconditionState::Unspecified
        } else if any_matches(&conditions.if_match, etag) {
            PreconditionState::ShouldProcess
        } else {
            PreconditionState::PreconditionFailed
        };

        let if_none_match = if conditions.if_none_match.is_empty() {
            PreconditionState::Unspecified
        } else if any_matches(&conditions.if_none_match, etag) {
            PreconditionState::NotModified
        } else {
            PreconditionState::ShouldProcess
        };

        let if_modified_since = conditions
            .if_modified_since
            .filter(|since| *since <= now);
        let if_modified_since_state = match if_modified_since {
            None => PreconditionState::Unspecified,
            Some(since) if since < last_modified => PreconditionState::ShouldProcess,
            Some(_) => PreconditionState::NotModified,
        };

        // If-Unmodified-Since is only considered together with a usable If-Modified-Since value.
        // Clients sending If-Unmodified-Since alone get no precondition check from it.
        let if_unmodified_since = match (if_modified_since, conditions.if_unmodified_since) {
            (Some(_), Some(since)) if since >= last_modified => PreconditionState::ShouldProcess,
            (Some(_), Some(_)) => PreconditionState::PreconditionFailed,
            _ => PreconditionState::Unspecified,
        };

        Self {
            if_match,
            if_none_match,
            if_modified_since: if_modified_since_state,
            if_unmodified_since,
        }
    }

    /// Combines the states of all header families into the final decision.
    pub fn reduce(&self) -> PreconditionState {
        PreconditionState::reduce([
            self.if_match,
            self.if_none_match,
            self.if_modified_since,
            self.if_unmodified_since,
        ])
    }
}

fn any_matches(conditions: &[EntityTagCondition], etag: &EntityTag) -> bool {
    conditions.iter().any(|condition| condition.matches(etag))
}
