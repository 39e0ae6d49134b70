use crate::models::{EntryId, MessageBody, Sender};

/// The rendered surface the chat client drives: an append-only transcript,
/// the input field, the send control and the error banner.
///
/// Methods take `&self`; implementations are expected to be cheap handles
/// over interior-mutable state (reactive signals in the browser).
pub trait ChatView {
    fn append_message(&self, sender: Sender, body: MessageBody) -> EntryId;
    fn set_body(&self, id: EntryId, body: MessageBody);
    /// Appends one character to a text entry. An HTML entry is replaced.
    fn push_char(&self, id: EntryId, ch: char);
    fn body(&self, id: EntryId) -> Option<MessageBody>;

    fn clear_input(&self);
    fn set_send_enabled(&self, enabled: bool);
    fn focus_input(&self);

    fn show_error(&self, message: &str);
    fn hide_error(&self);

    fn scroll_to_bottom(&self);
}
