//! Клиентская библиотека форума: REST API, сессия и состояние экранов.
//!
//! - [`ApiClient`]: тонкая обёртка над HTTP (`reqwest`) для всех эндпоинтов API.
//! - [`Session`]: токен и данные пользователя поверх [`SessionStore`].
//! - [`screens`]: экраны входа, ленты, поста, профиля и его редактирования.
//!
//! Экран держит своё состояние и получает `ApiClient` и `Session` в каждом
//! обработчике; глобального состояния нет.
#![warn(missing_docs)]

mod error;
mod http_client;
mod models;
pub mod screens;
mod session;

pub use error::{ForumClientError, ForumClientResult};
pub use http_client::{ApiClient, DEFAULT_API_BASE_URL};
pub use models::{
    AuthResponse, Comment, FavoriteToggle, LikeToggle, MessageResponse, NewPost, Post,
    PostRelation, ProfileUpdate, User,
};
pub use session::{
    AuthState, FileSessionStore, MemorySessionStore, Session, SessionStore, TOKEN_KEY, USER_KEY,
};

pub use reqwest::Method;
