use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_core::{AppError, AppResult, NonEmptyString, Rejection};

use crate::{TicketMeta, TicketMetaPatch};

const TICKET_TITLE_MAX_CHARS: usize = 128;

/// Unique identifier for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random ticket identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a ticket identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parses a ticket identifier from its transport form.
    pub fn parse(value: &str) -> AppResult<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid ticket id '{value}': {error}")))
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TicketId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Ticket kind, fixed at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    /// Approval materializes a permission grant.
    GrantPermissionRequest,
    /// Approval records an asset access decision.
    AssetAccessRequest,
}

impl TicketKind {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GrantPermissionRequest => "grant_permission_request",
            Self::AssetAccessRequest => "asset_access_request",
        }
    }
}

impl FromStr for TicketKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "grant_permission_request" => Ok(Self::GrantPermissionRequest),
            "asset_access_request" => Ok(Self::AssetAccessRequest),
            _ => Err(AppError::Validation(format!(
                "unknown ticket kind '{value}'"
            ))),
        }
    }
}

/// Open/closed lifecycle axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Ticket accepts actions.
    Open,
    /// Ticket is terminal and accepts no further actions.
    Closed,
}

impl TicketStatus {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(AppError::Validation(format!(
                "unknown ticket status '{value}'"
            ))),
        }
    }
}

/// Decision recorded on a ticket by an assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    /// Request approved.
    Approve,
    /// Request rejected.
    Reject,
}

impl TicketAction {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for TicketAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(AppError::Validation(format!(
                "unknown ticket action '{value}'"
            ))),
        }
    }
}

/// Principal reference stored on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketParticipant {
    /// Stable subject identifier.
    pub subject: String,
    /// Display name captured when the reference was stored.
    pub display_name: String,
}

impl TicketParticipant {
    /// Creates a participant reference.
    #[must_use]
    pub fn new(subject: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
        }
    }
}

/// Result of a successful action transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTransition {
    /// Action recorded before the transition.
    pub previous: Option<TicketAction>,
    /// Action recorded by the transition.
    pub current: TicketAction,
}

impl ActionTransition {
    /// Returns whether this is the first approval of the ticket.
    #[must_use]
    pub fn is_first_approval(&self) -> bool {
        self.previous.is_none() && self.current == TicketAction::Approve
    }
}

/// Input used to submit a new ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSubmission {
    /// Short ticket title.
    pub title: String,
    /// Submitting principal.
    pub requester: TicketParticipant,
    /// Principals allowed to act on the ticket.
    pub assignees: Vec<TicketParticipant>,
    /// Type-specific payload.
    pub meta: TicketMeta,
}

/// Persisted ticket fields used to rehydrate a [`Ticket`].
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    /// Ticket identifier.
    pub id: TicketId,
    /// Ticket title.
    pub title: String,
    /// Open/closed status.
    pub status: TicketStatus,
    /// Recorded decision, if any.
    pub action: Option<TicketAction>,
    /// Submitting principal.
    pub requester: TicketParticipant,
    /// Principals allowed to act.
    pub assignees: Vec<TicketParticipant>,
    /// Principal that recorded the decision.
    pub assignee: Option<TicketParticipant>,
    /// Type-specific payload.
    pub meta: TicketMeta,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Ticket title/metadata change requested by a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPatch {
    /// Replacement title.
    pub title: Option<String>,
    /// Same-kind metadata patch.
    pub meta: Option<TicketMetaPatch>,
}

/// Access request moving through review.
///
/// `status` and `action` are orthogonal; every change to `action` goes
/// through [`Ticket::apply_action`], which refuses closed tickets and repeated
/// decisions. Once set, `action` never returns to unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    title: NonEmptyString,
    status: TicketStatus,
    action: Option<TicketAction>,
    requester: TicketParticipant,
    assignees: Vec<TicketParticipant>,
    assignee: Option<TicketParticipant>,
    meta: TicketMeta,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a new open, undecided ticket.
    pub fn submit(submission: TicketSubmission, now: DateTime<Utc>) -> AppResult<Self> {
        let TicketSubmission {
            title,
            requester,
            assignees,
            meta,
        } = submission;

        Self::from_record(TicketRecord {
            id: TicketId::new(),
            title,
            status: TicketStatus::Open,
            action: None,
            requester,
            assignees,
            assignee: None,
            meta,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrates a ticket from persisted fields, re-validating invariants.
    pub fn from_record(record: TicketRecord) -> AppResult<Self> {
        let TicketRecord {
            id,
            title,
            status,
            action,
            requester,
            assignees,
            assignee,
            meta,
            created_at,
            updated_at,
        } = record;

        if requester.subject.trim().is_empty() {
            return Err(AppError::Validation(
                "ticket requester subject must not be empty".to_owned(),
            ));
        }

        let assignees = dedupe_participants(assignees);
        if assignees.is_empty() {
            return Err(AppError::Validation(
                "ticket must have at least one assignee".to_owned(),
            ));
        }

        if assignees
            .iter()
            .any(|participant| participant.subject.trim().is_empty())
        {
            return Err(AppError::Validation(
                "ticket assignee subject must not be empty".to_owned(),
            ));
        }

        meta.validate()?;

        Ok(Self {
            id,
            title: NonEmptyString::with_max_chars(title, TICKET_TITLE_MAX_CHARS)?,
            status,
            action,
            requester,
            assignees,
            assignee,
            meta,
            created_at,
            updated_at,
        })
    }

    /// Returns the ticket identifier.
    #[must_use]
    pub fn id(&self) -> TicketId {
        self.id
    }

    /// Returns the ticket title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the ticket kind.
    #[must_use]
    pub fn kind(&self) -> TicketKind {
        self.meta.kind()
    }

    /// Returns the open/closed status.
    #[must_use]
    pub fn status(&self) -> TicketStatus {
        self.status
    }

    /// Returns the recorded decision, if any.
    #[must_use]
    pub fn action(&self) -> Option<TicketAction> {
        self.action
    }

    /// Returns the submitting principal.
    #[must_use]
    pub fn requester(&self) -> &TicketParticipant {
        &self.requester
    }

    /// Returns the principals allowed to act.
    #[must_use]
    pub fn assignees(&self) -> &[TicketParticipant] {
        self.assignees.as_slice()
    }

    /// Returns the principal that recorded the decision.
    #[must_use]
    pub fn assignee(&self) -> Option<&TicketParticipant> {
        self.assignee.as_ref()
    }

    /// Returns the type-specific payload.
    #[must_use]
    pub fn meta(&self) -> &TicketMeta {
        &self.meta
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether the subject is one of the ticket assignees.
    #[must_use]
    pub fn is_assignee(&self, subject: &str) -> bool {
        self.assignees
            .iter()
            .any(|participant| participant.subject == subject)
    }

    /// Returns whether the subject submitted the ticket.
    #[must_use]
    pub fn is_requester(&self, subject: &str) -> bool {
        self.requester.subject == subject
    }

    /// Returns whether the subject is the requester or an assignee.
    #[must_use]
    pub fn is_participant(&self, subject: &str) -> bool {
        self.is_requester(subject) || self.is_assignee(subject)
    }

    /// Checks whether `action` may be recorded without mutating the ticket.
    pub fn ensure_can_set_action(&self, action: TicketAction) -> Result<(), Rejection> {
        if self.status == TicketStatus::Closed {
            return Err(Rejection::TicketClosed);
        }

        if self.action == Some(action) {
            return Err(Rejection::TicketActionAlreadySet);
        }

        Ok(())
    }

    /// Records `action` taken by `actor`.
    pub fn apply_action(
        &mut self,
        action: TicketAction,
        actor: TicketParticipant,
        now: DateTime<Utc>,
    ) -> Result<ActionTransition, Rejection> {
        self.ensure_can_set_action(action)?;

        let previous = self.action.replace(action);
        self.assignee = Some(actor);
        self.updated_at = now;

        Ok(ActionTransition {
            previous,
            current: action,
        })
    }

    /// Moves the ticket to the terminal closed status.
    pub fn close(&mut self, now: DateTime<Utc>) -> Result<(), Rejection> {
        if self.status == TicketStatus::Closed {
            return Err(Rejection::TicketClosed);
        }

        self.status = TicketStatus::Closed;
        self.updated_at = now;
        Ok(())
    }

    /// Applies a title/metadata change.
    ///
    /// Closed tickets are frozen. The patched metadata is validated before
    /// the ticket is modified.
    pub fn apply_patch(
        &mut self,
        patch: TicketPatch,
        include_confirmations: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status == TicketStatus::Closed {
            return Err(Rejection::TicketClosed.into());
        }

        let title = patch
            .title
            .map(|title| NonEmptyString::with_max_chars(title, TICKET_TITLE_MAX_CHARS))
            .transpose()?;

        let mut meta = self.meta.clone();
        if let Some(meta_patch) = patch.meta {
            meta.merge(meta_patch, include_confirmations)?;
            meta.validate()?;
        }

        if let Some(title) = title {
            self.title = title;
        }
        self.meta = meta;
        self.updated_at = now;
        Ok(())
    }
}

fn dedupe_participants(participants: Vec<TicketParticipant>) -> Vec<TicketParticipant> {
    let mut unique: Vec<TicketParticipant> = Vec::with_capacity(participants.len());
    for participant in participants {
        if !unique
            .iter()
            .any(|existing| existing.subject == participant.subject)
        {
            unique.push(participant);
        }
    }

    unique
}
