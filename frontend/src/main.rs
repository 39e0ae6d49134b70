mod api;
mod client;
mod components;
mod config;
mod errors;
mod models;
mod payload;
mod state;
mod typing;
mod view;

use leptos::mount::mount_to_body;
use leptos::prelude::*;

use api::HttpTransport;
use client::ChatClient;
use components::chat::ChatWidget;
use config::ClientConfig;
use state::ChatState;
use typing::TimerDelay;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = ChatState::provide();
    let config = ClientConfig::default();

    match HttpTransport::for_current_origin(&config) {
        Ok(transport) => {
            log::info!("Sending queries to {}", transport.endpoint());
            let client = ChatClient::new(transport, state, TimerDelay, config);
            view! { <ChatWidget client=client /> }.into_any()
        }
        Err(e) => {
            log::error!("Failed to resolve query endpoint: {e}");
            view! { <div class="error-banner">{e.to_string()}</div> }.into_any()
        }
    }
}

fn main() {
    console_log::init_with_level(log::Level::Debug).expect("Failed to init logger");
    mount_to_body(App);
}
