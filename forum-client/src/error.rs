use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `forum-client`.
pub enum ForumClientError {
    /// Ошибка HTTP-транспорта (`reqwest`): сеть недоступна, соединение сброшено и т.п.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Сервер ответил статусом вне диапазона 2xx.
    #[error("http status {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status {
        /// HTTP-статус ответа.
        status: StatusCode,
        /// Сообщение сервера из поля `message` (или `error`), если оно было.
        message: Option<String>,
    },

    /// Пустой или некорректный JSON в ответе.
    #[error("decode error: {0}")]
    Decode(String),

    /// Операция требует токен, а сессия его не содержит.
    #[error("unauthorized")]
    Unauthorized,

    /// Запрос отклонён на стороне клиента до отправки.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Ошибка ввода-вывода хранилища сессии.
    #[error("session storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Ошибка сериализации данных сессии.
    #[error("session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Результат операций `forum-client`.
pub type ForumClientResult<T> = Result<T, ForumClientError>;

impl ForumClientError {
    pub(crate) fn from_http_status(status: StatusCode, message: Option<String>) -> Self {
        Self::Status { status, message }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }

    /// HTTP-статус ответа, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Сообщение сервера, если оно было в теле ответа.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// `true` для 401/403 и для отсутствующего токена: сессию нужно закрыть.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthorized => true,
            Self::Status { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }

    /// Текст для пользователя: сообщение сервера или `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self.server_message() {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => fallback.to_string(),
        }
    }
}
