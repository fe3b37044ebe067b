//! Storage traits for the flow engine.
//!
//! Each trait covers one record family and is implemented by a storage
//! backend crate. The engine only ever holds `Arc<dyn Trait>` handles,
//! so backends can be swapped without touching the sub-engines.

pub mod approval;
pub mod client;
pub mod code;
pub mod domain;
pub mod flow;
pub mod refresh_token;
pub mod session;
pub mod user;

pub use approval::{ApprovalStorage, ScopeApproval};
pub use client::ClientStorage;
pub use code::CodeStorage;
pub use domain::DomainStorage;
pub use flow::FlowStorage;
pub use refresh_token::RefreshTokenStorage;
pub use session::SessionStorage;
pub use user::UserStorage;
