use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::api::HttpTransport;
use crate::client::ChatClient;
use crate::models::MessageBody;
use crate::state::{ChatEntry, ChatState};
use crate::typing::TimerDelay;

/// The client as wired in the browser.
pub type BrowserClient = ChatClient<HttpTransport, ChatState, TimerDelay>;

/// Transcript, error banner and input row.
#[component]
pub fn ChatWidget(client: BrowserClient) -> impl IntoView {
    let state = expect_context::<ChatState>();

    view! {
        <main class="chat-area">
            <div class="chat-header">"Query Assistant"</div>

            <div class="messages-container" node_ref=state.transcript_ref>
                <For
                    each=move || state.entries.get()
                    key=|entry| entry.id
                    let:entry
                >
                    <MessageBubble entry=entry />
                </For>
            </div>

            // Error banner
            {move || {
                state.error.get().map(|err| {
                    view! {
                        <div class="error-banner">{err}</div>
                    }
                })
            }}

            <ChatInput client=client />
        </main>
    }
}

/// A single transcript entry. Image replies are injected as markup.
#[component]
fn MessageBubble(entry: ChatEntry) -> impl IntoView {
    let css_class = format!("message {}", entry.sender.as_str());
    let body = entry.body;

    view! {
        <div class=css_class>
            <div class="role-label">{entry.sender.as_str()}</div>
            {move || match body.get() {
                MessageBody::Text(text) => {
                    view! { <div class="message-body">{text}</div> }.into_any()
                }
                MessageBody::Html(markup) => {
                    view! { <div class="message-body" inner_html=markup></div> }.into_any()
                }
            }}
        </div>
    }
}

/// Single-line input and send button. Enter or click sends.
#[component]
fn ChatInput(client: BrowserClient) -> impl IntoView {
    let state = expect_context::<ChatState>();

    let send = move || {
        let text = state.input.get_untracked();
        let client = client.clone();
        spawn_local(async move {
            client.send(&text).await;
        });
    };

    let send_clone = send.clone();
    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" {
            ev.prevent_default();
            send_clone();
        }
    };

    let on_click = move |_| {
        send();
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <input
                    type="text"
                    placeholder="Ask a question… (Enter to send)"
                    node_ref=state.input_ref
                    prop:value=move || state.input.get()
                    on:input=move |ev| {
                        state.input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                />
                <button
                    class="send-btn"
                    on:click=on_click
                    disabled=move || !state.send_enabled.get()
                >
                    "Send"
                </button>
            </div>
        </div>
    }
}
