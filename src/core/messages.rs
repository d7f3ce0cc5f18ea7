//! # Message Store
//!
//! Ordered, keyed collection of conversation turns.
//!
//! ```text
//! MessageStore
//! ├── turns: Vec<Turn>              // render order
//! ├── index: HashMap<TurnId, usize> // id → position
//! ├── open_reply: Option<TurnId>    // the one assistant turn receiving fragments
//! └── revision: u64                 // bumped on every mutation
//! ```
//!
//! The open reply's answer text lives in exactly one place: the turn's
//! [`Body`]. There is no side map to reconcile. Readers borrow the store and
//! always see one consistent snapshot, since every mutation goes through
//! `&mut self` on the single UI thread.

use std::collections::HashMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Opaque turn identifier, unique within a conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TurnId(String);

impl TurnId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Client-side id for an optimistic turn: prefix, millisecond timestamp,
    /// and a random suffix.
    pub fn optimistic(prefix: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{prefix}-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answer text of a turn. Assistant turns start as `Pending` (rendered as a
/// loading indicator) and become `Text` on the first answer fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Pending,
    Text(String),
}

impl Body {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Pending => None,
            Body::Text(text) => Some(text),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Body::Pending)
    }

    fn push_str(&mut self, delta: &str) {
        match self {
            Body::Pending => *self = Body::Text(delta.to_string()),
            Body::Text(text) => text.push_str(delta),
        }
    }
}

/// One message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub body: Body,
    pub thinking: String,
}

impl Turn {
    pub fn user(id: TurnId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            body: Body::Text(text.into()),
            thinking: String::new(),
        }
    }

    /// A placeholder assistant turn awaiting its first fragment.
    pub fn pending_assistant(id: TurnId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            body: Body::Pending,
            thinking: String::new(),
        }
    }

    pub fn assistant(id: TurnId, text: impl Into<String>, thinking: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Assistant,
            body: Body::Text(text.into()),
            thinking: thinking.into(),
        }
    }
}

/// Which streamed field of a turn a fragment extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Thinking,
    Answer,
}

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A turn with this id is already in the store.
    DuplicateId(TurnId),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DuplicateId(id) => write!(f, "duplicate turn id: {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A reply that stopped receiving fragments, with its final text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedReply {
    pub id: TurnId,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct MessageStore {
    turns: Vec<Turn>,
    index: HashMap<TurnId, usize>,
    open_reply: Option<TurnId>,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, id: &TurnId) -> Option<&Turn> {
        self.index.get(id).map(|&i| &self.turns[i])
    }

    /// Monotonic counter bumped by every mutation. Views use it to decide
    /// whether cached measurements are still valid.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn open_reply(&self) -> Option<&TurnId> {
        self.open_reply.as_ref()
    }

    /// Appends a batch of turns. The batch is checked as a whole first, so a
    /// duplicate id leaves the store untouched.
    pub fn append(&mut self, batch: Vec<Turn>) -> Result<(), StoreError> {
        let mut seen = std::collections::HashSet::new();
        for turn in &batch {
            if self.index.contains_key(&turn.id) || !seen.insert(&turn.id) {
                return Err(StoreError::DuplicateId(turn.id.clone()));
            }
        }
        for turn in batch {
            self.index.insert(turn.id.clone(), self.turns.len());
            self.turns.push(turn);
        }
        self.revision += 1;
        Ok(())
    }

    /// Extends a field of the turn with `id`. Returns false when no such turn
    /// exists.
    pub fn append_field(&mut self, id: &TurnId, field: Field, delta: &str) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let turn = &mut self.turns[i];
        match field {
            Field::Thinking => turn.thinking.push_str(delta),
            Field::Answer => turn.body.push_str(delta),
        }
        self.revision += 1;
        true
    }

    /// Marks an assistant turn as the one receiving fragments. A previously
    /// open reply is closed first and returned.
    pub fn open(&mut self, id: TurnId) -> Option<ClosedReply> {
        let previous = self.close_reply();
        self.open_reply = Some(id);
        previous
    }

    /// Extends the open reply. Returns false when no reply is open.
    pub fn append_to_open(&mut self, field: Field, delta: &str) -> bool {
        match self.open_reply.clone() {
            Some(id) => self.append_field(&id, field, delta),
            None => false,
        }
    }

    /// Stops the open reply and snapshots its text. A reply that never got a
    /// fragment settles as empty text rather than a loading placeholder.
    pub fn close_reply(&mut self) -> Option<ClosedReply> {
        let id = self.open_reply.take()?;
        let i = *self.index.get(&id)?;
        let turn = &mut self.turns[i];
        if turn.body.is_pending() {
            turn.body = Body::Text(String::new());
            self.revision += 1;
        }
        let text = turn.body.as_text().unwrap_or_default().to_string();
        Some(ClosedReply { id, text })
    }

    /// Replaces the whole list (history load). Nothing from the previous
    /// conversation survives, including the open reply.
    pub fn replace_all(&mut self, turns: Vec<Turn>) -> Result<(), StoreError> {
        let mut index = HashMap::with_capacity(turns.len());
        for (i, turn) in turns.iter().enumerate() {
            if index.insert(turn.id.clone(), i).is_some() {
                return Err(StoreError::DuplicateId(turn.id.clone()));
            }
        }
        self.turns = turns;
        self.index = index;
        self.open_reply = None;
        self.revision += 1;
        Ok(())
    }

    /// Puts a loaded history in front of the turns already in the store.
    /// The open reply stays open, so a send made before the history arrived
    /// keeps streaming into the same turn.
    pub fn prepend_history(&mut self, history: Vec<Turn>) -> Result<(), StoreError> {
        let mut merged = history;
        merged.extend(self.turns.iter().cloned());
        let open = self.open_reply.take();
        let result = self.replace_all(merged);
        self.open_reply = open;
        result
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.index.clear();
        self.open_reply = None;
        self.revision += 1;
    }
}
