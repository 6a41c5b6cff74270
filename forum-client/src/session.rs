//! Сессия пользователя и её локальное хранилище.
//!
//! Хранилище: простое key-value (`get/set/remove`) с двумя ключами:
//! `userToken` и `userData`. [`Session`] создаётся при старте процесса через
//! [`Session::restore`] и меняется только в [`Session::sign_in`] и
//! [`Session::sign_out`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ForumClientError, ForumClientResult};
use crate::models::User;

/// Ключ токена в хранилище.
pub const TOKEN_KEY: &str = "userToken";
/// Ключ сериализованного пользователя в хранилище.
pub const USER_KEY: &str = "userData";

/// Key-value хранилище сессии.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Значение по ключу, `None` если ключа нет.
    async fn get_item(&self, key: &str) -> ForumClientResult<Option<String>>;
    /// Записывает значение.
    async fn set_item(&self, key: &str, value: &str) -> ForumClientResult<()>;
    /// Удаляет ключ. Отсутствующий ключ не считается ошибкой.
    async fn remove_item(&self, key: &str) -> ForumClientResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса.
pub struct MemorySessionStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    /// Пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_item(&self, key: &str) -> ForumClientResult<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> ForumClientResult<()> {
        self.items
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> ForumClientResult<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Хранилище в JSON-файле (`{"userToken": "...", "userData": "..."}`).
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Хранилище в файле `path`. Файл создаётся при первой записи.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Путь к файлу.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_items(&self) -> ForumClientResult<HashMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_items(&self, items: &HashMap<String, String>) -> ForumClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&self.path, raw).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_item(&self, key: &str) -> ForumClientResult<Option<String>> {
        Ok(self.read_items().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> ForumClientResult<()> {
        let mut items = self.read_items().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_items(&items).await
    }

    async fn remove_item(&self, key: &str) -> ForumClientResult<()> {
        let mut items = self.read_items().await?;
        if items.remove(key).is_some() {
            self.write_items(&items).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Глобальное состояние авторизации.
pub enum AuthState {
    /// Токена нет: доступны только экраны входа и регистрации.
    SignedOut,
    /// Токен есть.
    SignedIn,
}

#[derive(Debug)]
/// Сессия: токен и минимальные данные пользователя поверх [`SessionStore`].
pub struct Session<S> {
    store: S,
    token: Option<String>,
    user: Option<User>,
}

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn parse_user(raw: &str) -> Option<User> {
    serde_json::from_str::<User>(raw).ok()
}

impl<S: SessionStore> Session<S> {
    /// Восстанавливает сессию из хранилища.
    ///
    /// Пустой токен и испорченная запись пользователя считаются отсутствующими.
    pub async fn restore(store: S) -> ForumClientResult<Self> {
        let token = store
            .get_item(TOKEN_KEY)
            .await?
            .as_deref()
            .and_then(parse_token);

        let user = match store.get_item(USER_KEY).await? {
            Some(raw) => {
                let user = parse_user(&raw);
                if user.is_none() {
                    warn!("stored user record is not valid JSON, ignoring it");
                }
                user
            }
            None => None,
        };

        debug!(signed_in = token.is_some(), "session restored");
        Ok(Self { store, token, user })
    }

    /// Текущее состояние авторизации.
    pub fn state(&self) -> AuthState {
        if self.token.is_some() {
            AuthState::SignedIn
        } else {
            AuthState::SignedOut
        }
    }

    /// Токен сессии, если пользователь вошёл.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Токен сессии или [`ForumClientError::Unauthorized`].
    pub fn require_token(&self) -> ForumClientResult<&str> {
        self.token.as_deref().ok_or(ForumClientError::Unauthorized)
    }

    /// Данные пользователя, сохранённые при входе.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Хранилище сессии.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Сохраняет токен и пользователя и переводит сессию в [`AuthState::SignedIn`].
    pub async fn sign_in(&mut self, token: &str, user: User) -> ForumClientResult<()> {
        let token = parse_token(token).ok_or_else(|| {
            ForumClientError::InvalidRequest("server returned an empty token".to_string())
        })?;
        let raw_user = serde_json::to_string(&user)?;

        // без токена запись пользователя не считается входом
        self.store.set_item(USER_KEY, &raw_user).await?;
        self.store.set_item(TOKEN_KEY, &token).await?;

        debug!(user_id = user.id, "signed in");
        self.token = Some(token);
        self.user = Some(user);
        Ok(())
    }

    /// Удаляет токен и пользователя и переводит сессию в [`AuthState::SignedOut`].
    ///
    /// Состояние в памяти очищается даже если хранилище вернуло ошибку.
    /// Удаляются оба ключа; возвращается первая ошибка.
    pub async fn sign_out(&mut self) -> ForumClientResult<()> {
        self.token = None;
        self.user = None;

        let token_removed = self.store.remove_item(TOKEN_KEY).await;
        let user_removed = self.store.remove_item(USER_KEY).await;
        token_removed?;
        user_removed?;
        debug!("signed out");
        Ok(())
    }
}
