//! HTTP adapters.

pub mod webhook_http;

pub use webhook_http::{WebhookHttpConfig, WebhookHttpServer, WebhookState};
