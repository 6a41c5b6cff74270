//! Экраны клиента: состояние экрана плюс асинхронные обработчики действий.
//!
//! Обработчик не возвращает ошибку наружу. Он логирует детали, кладёт
//! [`Notice`] для пользователя и возвращает [`Navigation`] с переходом, который нужно выполнить.

pub mod auth;
pub mod detail;
pub mod edit_profile;
pub mod feed;
pub mod profile;

use tracing::{error, warn};

use crate::error::ForumClientError;
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Состояние экрана.
pub enum ViewState {
    /// Экран ещё ничего не запрашивал.
    #[default]
    Idle,
    /// Идёт загрузка данных.
    Loading,
    /// Отправляется действие пользователя.
    Submitting,
    /// Данные загружены или действие выполнено.
    Ready,
    /// Последняя операция завершилась ошибкой с этим сообщением.
    Failed(String),
}

impl ViewState {
    /// `true`, пока вместо кнопки действия нужно показывать индикатор.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Loading | Self::Submitting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Тип уведомления.
pub enum NoticeKind {
    /// Успешное действие.
    Success,
    /// Действие отклонено до отправки.
    Warning,
    /// Ошибка.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Уведомление для пользователя (аналог всплывающего алерта).
pub struct Notice {
    /// Тип уведомления.
    pub kind: NoticeKind,
    /// Заголовок.
    pub title: String,
    /// Текст.
    pub message: String,
}

impl Notice {
    /// Уведомление об успехе.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, "Успех", message)
    }

    /// Предупреждение.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, "Внимание", message)
    }

    /// Ошибка.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, "Ошибка", message)
    }

    fn new(kind: NoticeKind, title: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Переход, который должен выполнить фронтенд после обработчика.
pub enum Navigation {
    /// Остаться на текущем экране.
    Stay,
    /// Перейти в ленту.
    Feed,
    /// Перейти на экран входа.
    Login,
    /// Вернуться на предыдущий экран.
    Back,
    /// Сессия закрыта: вернуться к экранам авторизации.
    SignedOut,
}

#[derive(Debug, Clone, Default)]
/// Общая часть состояния любого экрана: [`ViewState`] и очередь уведомлений.
pub struct ScreenStatus {
    view: ViewState,
    notices: Vec<Notice>,
}

impl ScreenStatus {
    /// Текущее состояние.
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// `true` во время загрузки или отправки.
    pub fn is_busy(&self) -> bool {
        self.view.is_busy()
    }

    /// Уведомления, ещё не показанные пользователю.
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub(crate) fn begin_loading(&mut self) {
        self.view = ViewState::Loading;
    }

    pub(crate) fn begin_submitting(&mut self) {
        self.view = ViewState::Submitting;
    }

    pub(crate) fn succeed(&mut self) {
        self.view = ViewState::Ready;
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.notices.push(Notice::error(message.clone()));
        self.view = ViewState::Failed(message);
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Когда ошибка запроса закрывает сессию.
pub(crate) enum SignOutPolicy {
    /// Никогда: ошибка только показывается.
    Never,
    /// На 401 и 403.
    OnAuthFailure,
    /// Только на 401.
    OnUnauthorized,
}

impl SignOutPolicy {
    fn applies(self, err: &ForumClientError) -> bool {
        match self {
            Self::Never => false,
            Self::OnAuthFailure => err.is_auth_failure(),
            Self::OnUnauthorized => matches!(err, ForumClientError::Unauthorized)
                || err.status() == Some(reqwest::StatusCode::UNAUTHORIZED),
        }
    }
}

/// Логирует ошибку, показывает сообщение и при необходимости закрывает сессию.
pub(crate) async fn handle_failure<S: SessionStore>(
    status: &mut ScreenStatus,
    session: &mut Session<S>,
    err: &ForumClientError,
    action: &'static str,
    fallback: &str,
    policy: SignOutPolicy,
) -> Navigation {
    error!(action, error = %err, "request failed");
    status.fail(err.user_message(fallback));

    if policy.applies(err) {
        force_sign_out(session).await;
        return Navigation::SignedOut;
    }
    Navigation::Stay
}

/// Действие требует токен, а его нет: показываем сообщение и закрываем сессию.
pub(crate) async fn reject_missing_token<S: SessionStore>(
    status: &mut ScreenStatus,
    session: &mut Session<S>,
    message: &str,
) -> Navigation {
    warn!("action requires a session token, signing out");
    status.notify(Notice::error(message));
    force_sign_out(session).await;
    Navigation::SignedOut
}

pub(crate) async fn force_sign_out<S: SessionStore>(session: &mut Session<S>) {
    if let Err(err) = session.sign_out().await {
        error!(error = %err, "failed to clear stored session");
    }
}
