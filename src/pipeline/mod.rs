//! Render pipeline stages.
//!
//! ```text
//! request ──▶ auth::auth_cookie_segment ──┐
//!         ──▶ arguments::serialize ───────┼──▶ invoke::Invocation ──▶ invoke::Invoker ──▶ bytes
//!         ──▶ source::SourceSpec::resolve ┘                                               │
//!                                                                respond::build_response ◀┘
//!                                                           respond::save_bytes_to_path ◀┘
//! ```
//!
//! Each stage is usable on its own; [`crate::convert::Renderer`] wires them
//! together.

pub mod arguments;
pub mod auth;
pub mod invoke;
pub mod respond;
pub mod source;
