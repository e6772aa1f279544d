// SPDX-License-Identifier: GPL-3.0-only
pub mod handlers;
pub mod http;

pub use handlers::{AdminCommand, AdminReply, AdminRequest, ApiHandlers, serve_request};
pub use http::HttpServer;
