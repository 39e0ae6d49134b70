use leptos::html;
use leptos::prelude::*;

use crate::models::{EntryId, MessageBody, Sender};
use crate::view::ChatView;

/// One transcript entry. The body has its own signal so streaming into the
/// last entry does not re-render the whole list.
#[derive(Clone, Copy)]
pub struct ChatEntry {
    pub id: EntryId,
    pub sender: Sender,
    pub body: RwSignal<MessageBody>,
}

/// Reactive state behind the chat widget, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct ChatState {
    pub entries: RwSignal<Vec<ChatEntry>>,
    pub input: RwSignal<String>,
    pub send_enabled: RwSignal<bool>,
    pub error: RwSignal<Option<String>>,
    pub input_ref: NodeRef<html::Input>,
    pub transcript_ref: NodeRef<html::Div>,
}

impl ChatState {
    /// Create a new `ChatState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let state = Self {
            entries: RwSignal::new(Vec::new()),
            input: RwSignal::new(String::new()),
            send_enabled: RwSignal::new(true),
            error: RwSignal::new(None),
            input_ref: NodeRef::new(),
            transcript_ref: NodeRef::new(),
        };
        provide_context(state);
        state
    }

    fn entry(&self, id: EntryId) -> Option<ChatEntry> {
        self.entries.with_untracked(|entries| entries.get(id).copied())
    }
}

impl ChatView for ChatState {
    fn append_message(&self, sender: Sender, body: MessageBody) -> EntryId {
        let body = RwSignal::new(body);
        let mut id = 0;
        self.entries.update(|entries| {
            id = entries.len();
            entries.push(ChatEntry { id, sender, body });
        });
        id
    }

    fn set_body(&self, id: EntryId, body: MessageBody) {
        match self.entry(id) {
            Some(entry) => entry.body.set(body),
            None => log::warn!("No transcript entry {id}"),
        }
    }

    fn push_char(&self, id: EntryId, ch: char) {
        if let Some(entry) = self.entry(id) {
            entry.body.update(|body| match body {
                MessageBody::Text(text) => text.push(ch),
                MessageBody::Html(_) => *body = MessageBody::Text(ch.to_string()),
            });
        }
    }

    fn body(&self, id: EntryId) -> Option<MessageBody> {
        self.entry(id).map(|entry| entry.body.get_untracked())
    }

    fn clear_input(&self) {
        self.input.set(String::new());
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.send_enabled.set(enabled);
    }

    fn focus_input(&self) {
        if let Some(input) = self.input_ref.get_untracked() {
            let _ = input.focus();
        }
    }

    fn show_error(&self, message: &str) {
        self.error.set(Some(message.to_string()));
    }

    fn hide_error(&self) {
        self.error.set(None);
    }

    fn scroll_to_bottom(&self) {
        // Wait a frame so the update above has reached the DOM.
        let transcript = self.transcript_ref;
        request_animation_frame(move || {
            if let Some(div) = transcript.get_untracked() {
                div.set_scroll_top(div.scroll_height());
            }
        });
    }
}
