//! The ordered list of messages shown to the user.

use std::fmt::{self, Debug};
use std::time::SystemTime;

/// Identifies a message within a [`Transcript`].
///
/// Ids are assigned when a record is created, increase monotonically and
/// are never reused by the same transcript, not even after a clear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl MessageId {
    /// Returns the raw value of the id.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// The author of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Text typed by the user.
    User,
    /// Text produced by the backend.
    Assistant,
    /// Informational text produced by the client itself.
    System,
}

/// A message record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    created_at: SystemTime,
    streaming: bool,
}

impl Message {
    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the role of this message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the text received so far.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns when this record was created.
    #[inline]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Returns `true` while the content can still grow.
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

/// A change applied to a [`Transcript`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptEvent {
    /// A record was inserted at the tail.
    Appended(MessageId),
    /// The content of a record changed.
    Updated(MessageId),
    /// A record stopped streaming.
    Finalized(MessageId),
    /// A record was deleted.
    Removed(MessageId),
    /// All records were deleted.
    Cleared,
}

type Observer = Box<dyn Fn(&TranscriptEvent, &Transcript) + Send + Sync>;

/// The ordered list of messages, in display order.
///
/// All operations are synchronous and keep the relative order of the
/// records they don't touch. Operations addressing an id that is not in
/// the transcript are no-ops, since a record may have been rolled back
/// or cleared while a reference to it was still held.
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    observers: Vec<Observer>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer, which is called after every mutation that
    /// changes the transcript.
    pub fn observe(
        &mut self,
        observer: impl Fn(&TranscriptEvent, &Transcript) + Send + Sync + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    /// Creates a complete record with a fresh id. The record is not part
    /// of the transcript until it's appended.
    pub fn new_record<S: Into<String>>(
        &mut self,
        role: Role,
        content: S,
    ) -> Message {
        self.make_record(role, content.into(), false)
    }

    /// Creates an empty record that accepts content updates until it's
    /// finalized.
    pub fn new_streaming_record(&mut self, role: Role) -> Message {
        self.make_record(role, String::new(), true)
    }

    /// Inserts a record at the tail.
    pub fn append(&mut self, message: Message) {
        debug_assert!(
            !message.streaming || self.streaming_record().is_none(),
            "only one record may stream at a time"
        );
        let id = message.id;
        self.messages.push(message);
        self.notify(TranscriptEvent::Appended(id));
    }

    /// Replaces the content of a streaming record with
    /// `transform(old_content)`.
    ///
    /// Returns `false` without calling `transform` if there is no such
    /// record, or if the record has been finalized.
    pub fn update_content(
        &mut self,
        id: MessageId,
        transform: impl FnOnce(String) -> String,
    ) -> bool {
        let Some(message) = self.find_mut(id) else {
            trace!("ignored update of missing record {id:?}");
            return false;
        };
        if !message.streaming {
            trace!("ignored update of finalized record {id:?}");
            return false;
        }
        let old = std::mem::take(&mut message.content);
        message.content = transform(old);
        self.notify(TranscriptEvent::Updated(id));
        true
    }

    /// Appends `fragment` to the content of a streaming record.
    ///
    /// See [`Transcript::update_content`].
    #[inline]
    pub fn append_content(&mut self, id: MessageId, fragment: &str) -> bool {
        self.update_content(id, |mut content| {
            content.push_str(fragment);
            content
        })
    }

    /// Makes the content of a record immutable.
    pub fn finalize(&mut self, id: MessageId) -> bool {
        let Some(message) = self.find_mut(id) else {
            return false;
        };
        if !message.streaming {
            return false;
        }
        message.streaming = false;
        self.notify(TranscriptEvent::Finalized(id));
        true
    }

    /// Deletes a record.
    pub fn remove(&mut self, id: MessageId) -> Option<Message> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        let message = self.messages.remove(idx);
        self.notify(TranscriptEvent::Removed(id));
        Some(message)
    }

    /// Deletes all records.
    pub fn clear(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        self.messages.clear();
        self.notify(TranscriptEvent::Cleared);
    }

    /// Returns the record with the given id.
    #[inline]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Returns the record that is still streaming, if any.
    #[inline]
    pub fn streaming_record(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.streaming)
    }

    /// Returns all records in display order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn make_record(
        &mut self,
        role: Role,
        content: String,
        streaming: bool,
    ) -> Message {
        self.next_id += 1;
        Message {
            id: MessageId(self.next_id),
            role,
            content,
            created_at: SystemTime::now(),
            streaming,
        }
    }

    #[inline]
    fn find_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn notify(&self, event: TranscriptEvent) {
        for observer in &self.observers {
            observer(&event, self);
        }
    }
}

impl Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
