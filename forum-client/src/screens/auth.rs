//! Вход, регистрация и выход.

use tracing::info;

use super::{
    Navigation, Notice, ScreenStatus, SignOutPolicy, force_sign_out, handle_failure,
};
use crate::http_client::ApiClient;
use crate::session::{Session, SessionStore};

fn validate_non_empty_fields(
    fields: &[&str],
    error_message: &'static str,
) -> Result<(), &'static str> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(error_message);
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
/// Экран входа.
pub struct LoginScreen {
    /// Логин или email.
    pub identifier: String,
    /// Пароль.
    pub password: String,
    status: ScreenStatus,
}

impl LoginScreen {
    /// Пустая форма входа.
    pub fn new() -> Self {
        Self::default()
    }

    /// Состояние экрана.
    pub fn status(&self) -> &ScreenStatus {
        &self.status
    }

    /// Забирает накопленные уведомления.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.status.take_notices()
    }

    /// Обменивает логин и пароль на токен и открывает сессию.
    pub async fn login<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        if let Err(message) = validate_non_empty_fields(
            &[self.identifier.as_str(), self.password.as_str()],
            "Введите логин и пароль",
        ) {
            self.status.notify(Notice::warning(message));
            return Navigation::Stay;
        }

        self.status.begin_submitting();
        let auth = match api.login(self.identifier.trim(), &self.password).await {
            Ok(auth) => auth,
            Err(err) => {
                return handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "login",
                    "Не удалось выполнить вход.",
                    SignOutPolicy::Never,
                )
                .await;
            }
        };

        if let Err(err) = session.sign_in(&auth.token, auth.user).await {
            return handle_failure(
                &mut self.status,
                session,
                &err,
                "store session",
                "Не удалось сохранить сессию.",
                SignOutPolicy::Never,
            )
            .await;
        }

        info!(identifier = %self.identifier, "login succeeded");
        self.password.clear();
        self.status.succeed();
        self.status.notify(Notice::success("Вход выполнен"));
        Navigation::Feed
    }
}

#[derive(Debug, Clone, Default)]
/// Экран регистрации.
pub struct RegisterScreen {
    /// Логин.
    pub username: String,
    /// Email.
    pub email: String,
    /// Пароль.
    pub password: String,
    status: ScreenStatus,
}

impl RegisterScreen {
    /// Пустая форма регистрации.
    pub fn new() -> Self {
        Self::default()
    }

    /// Состояние экрана.
    pub fn status(&self) -> &ScreenStatus {
        &self.status
    }

    /// Забирает накопленные уведомления.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.status.take_notices()
    }

    /// Создаёт аккаунт. Сессию не открывает: после успеха нужен вход.
    pub async fn register<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        if let Err(message) = validate_non_empty_fields(
            &[
                self.username.as_str(),
                self.email.as_str(),
                self.password.as_str(),
            ],
            "Заполните все поля регистрации",
        ) {
            self.status.notify(Notice::warning(message));
            return Navigation::Stay;
        }

        self.status.begin_submitting();
        if let Err(err) = api
            .register(self.username.trim(), self.email.trim(), &self.password)
            .await
        {
            return handle_failure(
                &mut self.status,
                session,
                &err,
                "register",
                "Не удалось зарегистрироваться.",
                SignOutPolicy::Never,
            )
            .await;
        }

        info!(username = %self.username, "registration succeeded");
        self.password.clear();
        self.status.succeed();
        self.status.notify(Notice::success(
            "Пользователь зарегистрирован. Войдите, чтобы продолжить.",
        ));
        Navigation::Login
    }
}

/// Закрывает сессию и возвращает к экранам авторизации.
pub async fn sign_out<S: SessionStore>(session: &mut Session<S>) -> Navigation {
    force_sign_out(session).await;
    info!("signed out by user");
    Navigation::SignedOut
}
