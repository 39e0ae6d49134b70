use std::sync::{Arc, Mutex};

use crate::api::{ChunkStream, QueryTransport};
use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::models::{EntryId, MessageBody, QueryRequest, Sender};
use crate::payload::{Payload, ResponseStream, StreamUpdate};
use crate::typing::{Delay, type_out};
use crate::view::ChatView;

/// Replaces an assistant entry that had nothing to show when the query failed.
pub const APOLOGY_TEXT: &str =
    "Sorry, I couldn't process that. Please try again or ask a different question.";

/// Appended to partial text when the query failed midway.
pub const INCOMPLETE_NOTE: &str = "\n(Error: Could not complete response)";

/// Where the current interaction is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    StreamingText,
    StreamingImage,
    Typing,
    Error,
}

/// Drives one send/receive cycle at a time against a [`ChatView`].
///
/// Constructed once per page; clones share the same interaction phase, so a
/// send issued from any clone while another is in flight is ignored.
#[derive(Clone)]
pub struct ChatClient<T, V, D> {
    transport: T,
    view: V,
    delay: D,
    config: ClientConfig,
    phase: Arc<Mutex<Phase>>,
}

impl<T, V, D> ChatClient<T, V, D>
where
    T: QueryTransport,
    V: ChatView,
    D: Delay,
{
    pub fn new(transport: T, view: V, delay: D, config: ClientConfig) -> Self {
        Self {
            transport,
            view,
            delay,
            config,
            phase: Arc::new(Mutex::new(Phase::Idle)),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs a full interaction for `raw_input`. Never fails: every error is
    /// reported through the view, and the view is always left interactive.
    pub async fn send(&self, raw_input: &str) {
        let query = raw_input.trim();
        if query.is_empty() {
            return;
        }
        if !self.try_begin() {
            log::debug!("Ignoring send while {:?}", self.phase());
            return;
        }

        self.view
            .append_message(Sender::User, MessageBody::Text(query.to_string()));
        self.view.clear_input();
        self.view.set_send_enabled(false);
        self.view.hide_error();

        let reply = self.view.append_message(Sender::Assistant, MessageBody::empty());
        self.view.scroll_to_bottom();

        if let Err(err) = self.exchange(query, reply).await {
            self.set_phase(Phase::Error);
            match err.status() {
                Some(status) => log::error!("Query failed with HTTP {status}: {err}"),
                None => log::error!("Query failed: {err}"),
            }
            self.report_failure(reply, &err);
        }

        self.view.set_send_enabled(true);
        self.view.focus_input();
        self.set_phase(Phase::Idle);
    }

    async fn exchange(&self, query: &str, reply: EntryId) -> Result<(), ClientError> {
        let request = QueryRequest::new(query);
        let mut body = self.transport.post_query(&request).await?;

        let mut stream = ResponseStream::new();
        self.set_phase(Phase::StreamingText);
        while let Some(chunk) = body.next_chunk().await? {
            match stream.push_chunk(&chunk)? {
                StreamUpdate::Text(text) => {
                    self.view.set_body(reply, MessageBody::Text(text.to_string()));
                }
                StreamUpdate::Image(markup) => {
                    self.set_phase(Phase::StreamingImage);
                    self.view.set_body(reply, MessageBody::Html(markup.to_string()));
                }
            }
            self.view.scroll_to_bottom();
        }

        if let Payload::Text(text) = stream.finish()? {
            self.set_phase(Phase::Typing);
            type_out(&self.view, &self.delay, self.config.typing_delay, reply, &text).await;
        }
        Ok(())
    }

    fn report_failure(&self, reply: EntryId, err: &ClientError) {
        self.view.show_error(&err.banner_text());

        // An image fragment carries no text, so it gets the apology too.
        let annotated = match self.view.body(reply) {
            Some(MessageBody::Text(text)) if !text.is_empty() => format!("{text}{INCOMPLETE_NOTE}"),
            _ => APOLOGY_TEXT.to_string(),
        };
        self.view.set_body(reply, MessageBody::Text(annotated));
        self.view.scroll_to_bottom();
    }

    fn try_begin(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase != Phase::Idle {
            return false;
        }
        *phase = Phase::Sending;
        true
    }

    fn set_phase(&self, next: Phase) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *phase != next {
            log::debug!("Chat phase {:?} -> {:?}", *phase, next);
            *phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use futures::executor::block_on;

    use super::*;

    // ── Fakes ────────────────────────────────────────────────────────────────

    type Reply = Result<Vec<Result<Vec<u8>, ClientError>>, ClientError>;

    /// Resolves on the second poll, letting a concurrent future run.
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                Poll::Ready(())
            } else {
                self.0 = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeTransport {
        replies: Rc<RefCell<VecDeque<Reply>>>,
        requests: Rc<RefCell<Vec<QueryRequest>>>,
    }

    impl FakeTransport {
        fn replying(replies: Vec<Reply>) -> Self {
            Self {
                replies: Rc::new(RefCell::new(replies.into())),
                ..Default::default()
            }
        }

        fn text(chunks: &[&str]) -> Reply {
            Ok(chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
        }
    }

    struct FakeBody(VecDeque<Result<Vec<u8>, ClientError>>);

    impl ChunkStream for FakeBody {
        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
            self.0.pop_front().transpose()
        }
    }

    impl QueryTransport for FakeTransport {
        type Body = FakeBody;

        async fn post_query(&self, request: &QueryRequest) -> Result<FakeBody, ClientError> {
            self.requests.borrow_mut().push(request.clone());
            YieldOnce(false).await;
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::Network("no reply queued".into())));
            reply.map(|chunks| FakeBody(chunks.into()))
        }
    }

    #[derive(Default)]
    struct ViewLog {
        entries: Vec<(Sender, MessageBody)>,
        /// Every body each entry has displayed, in order.
        history: Vec<Vec<MessageBody>>,
        input_cleared: usize,
        send_enabled: Vec<bool>,
        error: Option<String>,
        focused: usize,
        scrolls: usize,
    }

    #[derive(Clone, Default)]
    struct RecordingView(Rc<RefCell<ViewLog>>);

    impl RecordingView {
        fn log(&self) -> std::cell::Ref<'_, ViewLog> {
            self.0.borrow()
        }
    }

    impl ChatView for RecordingView {
        fn append_message(&self, sender: Sender, body: MessageBody) -> EntryId {
            let mut log = self.0.borrow_mut();
            log.entries.push((sender, body.clone()));
            log.history.push(vec![body]);
            log.entries.len() - 1
        }

        fn set_body(&self, id: EntryId, body: MessageBody) {
            let mut log = self.0.borrow_mut();
            log.entries[id].1 = body.clone();
            log.history[id].push(body);
        }

        fn push_char(&self, id: EntryId, ch: char) {
            let next = match self.body(id) {
                Some(MessageBody::Text(mut text)) => {
                    text.push(ch);
                    text
                }
                _ => ch.to_string(),
            };
            self.set_body(id, MessageBody::Text(next));
        }

        fn body(&self, id: EntryId) -> Option<MessageBody> {
            self.0.borrow().entries.get(id).map(|(_, body)| body.clone())
        }

        fn clear_input(&self) {
            self.0.borrow_mut().input_cleared += 1;
        }

        fn set_send_enabled(&self, enabled: bool) {
            self.0.borrow_mut().send_enabled.push(enabled);
        }

        fn focus_input(&self) {
            self.0.borrow_mut().focused += 1;
        }

        fn show_error(&self, message: &str) {
            self.0.borrow_mut().error = Some(message.to_string());
        }

        fn hide_error(&self) {
            self.0.borrow_mut().error = None;
        }

        fn scroll_to_bottom(&self) {
            self.0.borrow_mut().scrolls += 1;
        }
    }

    #[derive(Clone, Default)]
    struct InstantDelay {
        sleeps: Rc<Cell<usize>>,
        last: Rc<Cell<Duration>>,
    }

    impl Delay for InstantDelay {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.set(self.sleeps.get() + 1);
            self.last.set(duration);
        }
    }

    fn client(
        transport: &FakeTransport,
        view: &RecordingView,
        delay: &InstantDelay,
    ) -> ChatClient<FakeTransport, RecordingView, InstantDelay> {
        ChatClient::new(
            transport.clone(),
            view.clone(),
            delay.clone(),
            ClientConfig::default(),
        )
    }

    fn text(s: &str) -> MessageBody {
        MessageBody::Text(s.to_string())
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    #[test]
    fn blank_input_is_a_no_op() {
        let (transport, view, delay) = Default::default();
        let client = client(&transport, &view, &delay);

        block_on(client.send(""));
        block_on(client.send("   \t "));

        assert!(view.log().entries.is_empty());
        assert!(view.log().send_enabled.is_empty());
        assert!(transport.requests.borrow().is_empty());
        assert_eq!(client.phase(), Phase::Idle);
    }

    #[test]
    fn text_reply_streams_then_retypes() {
        let transport = FakeTransport::replying(vec![FakeTransport::text(&["Hel", "lo"])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("  hi there  "));

        assert_eq!(
            transport.requests.borrow().as_slice(),
            &[QueryRequest::new("hi there")]
        );

        let log = view.log();
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0], (Sender::User, text("hi there")));
        assert_eq!(log.entries[1], (Sender::Assistant, text("Hello")));

        let expected: Vec<MessageBody> = ["", "Hel", "Hello", "", "H", "He", "Hel", "Hell", "Hello"]
            .into_iter()
            .map(text)
            .collect();
        assert_eq!(log.history[1], expected);

        assert_eq!(delay.sleeps.get(), 5);
        assert_eq!(delay.last.get(), Duration::from_millis(20));
        assert_eq!(log.input_cleared, 1);
        assert_eq!(log.send_enabled, vec![false, true]);
        assert_eq!(log.focused, 1);
        assert!(log.error.is_none());
        assert_eq!(client.phase(), Phase::Idle);
    }

    #[test]
    fn every_update_scrolls_the_transcript() {
        let transport = FakeTransport::replying(vec![FakeTransport::text(&["ab", "c"])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("q"));

        // placeholder + 2 chunks + 3 typed characters
        assert_eq!(view.log().scrolls, 6);
    }

    #[test]
    fn image_reply_is_rendered_as_html_without_typing() {
        let markup = "<img src=\"data:image/png;base64,AAAA\">";
        let transport = FakeTransport::replying(vec![FakeTransport::text(&[
            "<img src=\"data:image/png;base64,",
            "AAAA\">",
        ])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("chart total sales over time"));

        let log = view.log();
        assert_eq!(log.entries[1].1, MessageBody::Html(markup.to_string()));
        assert_eq!(delay.sleeps.get(), 0);
        assert!(log.error.is_none());
        assert_eq!(client.phase(), Phase::Idle);
    }

    #[test]
    fn http_failure_shows_banner_and_apology() {
        let transport =
            FakeTransport::replying(vec![Err(ClientError::http(500, "server exploded"))]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("hello"));

        let log = view.log();
        let banner = log.error.as_deref().expect("banner shown");
        assert!(banner.contains("server exploded"));
        assert_eq!(log.entries[1].1, text(APOLOGY_TEXT));
        assert_eq!(log.send_enabled.last(), Some(&true));
        assert_eq!(log.focused, 1);
        assert_eq!(client.phase(), Phase::Idle);
    }

    #[test]
    fn failure_after_partial_text_appends_note() {
        let transport = FakeTransport::replying(vec![Ok(vec![
            Ok(b"Total sales were".to_vec()),
            Err(ClientError::Network("connection reset".into())),
        ])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("total sales?"));

        let log = view.log();
        assert_eq!(
            log.entries[1].1,
            text("Total sales were\n(Error: Could not complete response)")
        );
        assert!(log.error.as_deref().unwrap().contains("connection reset"));
        assert_eq!(delay.sleeps.get(), 0);
    }

    #[test]
    fn unterminated_image_is_reported_as_malformed() {
        let transport = FakeTransport::replying(vec![FakeTransport::text(&[
            "<img src=\"data:image/png;base64,AAAA",
        ])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("chart"));

        let log = view.log();
        assert_eq!(log.entries[1].1, text(APOLOGY_TEXT));
        assert!(log.error.as_deref().unwrap().contains("tag was closed"));
    }

    #[test]
    fn error_banner_is_hidden_by_the_next_send() {
        let transport = FakeTransport::replying(vec![
            Err(ClientError::http(503, "")),
            FakeTransport::text(&["ok"]),
        ]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("first"));
        assert!(view.log().error.as_deref().unwrap().contains("Something went wrong"));

        block_on(client.send("second"));
        assert!(view.log().error.is_none());
        assert_eq!(view.log().entries[3].1, text("ok"));
    }

    #[test]
    fn repeated_input_yields_independent_pairs() {
        let transport = FakeTransport::replying(vec![
            FakeTransport::text(&["one"]),
            FakeTransport::text(&["two"]),
        ]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);

        block_on(client.send("same"));
        block_on(client.send("same"));

        let log = view.log();
        let senders: Vec<Sender> = log.entries.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            senders,
            vec![Sender::User, Sender::Assistant, Sender::User, Sender::Assistant]
        );
        assert_eq!(log.entries[1].1, text("one"));
        assert_eq!(log.entries[3].1, text("two"));
        assert_eq!(transport.requests.borrow().len(), 2);
    }

    #[test]
    fn send_while_in_flight_is_ignored() {
        let transport = FakeTransport::replying(vec![FakeTransport::text(&["done"])]);
        let (view, delay) = (RecordingView::default(), InstantDelay::default());
        let client = client(&transport, &view, &delay);
        let other = client.clone();

        block_on(async {
            futures::join!(client.send("first"), other.send("second"));
        });

        let log = view.log();
        assert_eq!(log.entries.len(), 2);
        assert_eq!(log.entries[0].1, text("first"));
        assert_eq!(transport.requests.borrow().len(), 1);
        assert_eq!(client.phase(), Phase::Idle);
    }
}
