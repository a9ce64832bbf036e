//! JSON REST API for noteshelf.
//!
//! Exposes an axum [`Router`] backed by any [`noteshelf_core::store::NoteStore`].
//! Every route requires a logged-in user ([`session::CurrentUser`]); account
//! creation and login live with the server binary.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new().merge(noteshelf_api::api_router(state.clone()))
//! ```

pub mod body;
pub mod error;
pub mod notes;
pub mod session;
pub mod subjects;
pub mod topics;
pub mod user;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use noteshelf_core::{order::OrderPolicy, store::NoteStore};

pub use error::ApiError;
pub use session::{CurrentUser, SessionSettings};

/// Settings the handlers consult on every request.
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
  pub order_policy: OrderPolicy,
  pub session:      SessionSettings,
}

/// Shared handler state.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub settings: Arc<ApiSettings>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, settings: ApiSettings) -> Self {
    Self { store, settings: Arc::new(settings) }
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), settings: Arc::clone(&self.settings) }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: NoteStore + 'static,
{
  Router::new()
    // User
    .route("/user", get(user::name::<S>).delete(user::delete::<S>))
    .route("/user/data", get(user::data::<S>))
    // Subjects
    .route("/subject", post(subjects::create::<S>))
    .route("/subject/all", get(subjects::list::<S>))
    .route(
      "/subject/{id}",
      get(subjects::get_one::<S>)
        .patch(subjects::rename::<S>)
        .delete(subjects::delete::<S>),
    )
    .route("/subject/{id}/with-notes", get(subjects::tree::<S>))
    .route("/subject/order/{id}", patch(subjects::reorder::<S>))
    // Topics
    .route("/topic", post(topics::create::<S>))
    .route(
      "/topic/{id}",
      get(topics::get_one::<S>)
        .patch(topics::rename::<S>)
        .delete(topics::delete::<S>),
    )
    .route("/topic/order/{id}", patch(topics::reorder::<S>))
    // Notes
    .route("/note", post(notes::create::<S>))
    .route(
      "/note/{id}",
      get(notes::get_one::<S>)
        .patch(notes::update::<S>)
        .delete(notes::delete::<S>),
    )
    .route("/note/move/{id}", patch(notes::move_to::<S>))
    .with_state(state)
}
