//! Редактирование и удаление аккаунта.

use tracing::{info, warn};

use super::{
    Navigation, Notice, ScreenStatus, SignOutPolicy, force_sign_out, handle_failure,
    reject_missing_token,
};
use crate::http_client::ApiClient;
use crate::models::{ProfileUpdate, User};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Поля формы профиля.
pub struct ProfileForm {
    /// Логин.
    pub username: String,
    /// Email.
    pub email: String,
    /// Аватар: путь на сервере или ссылка на выбранный файл.
    pub profile_picture_url: Option<String>,
    /// Текущий пароль.
    pub old_password: String,
    /// Новый пароль.
    pub new_password: String,
    /// Подтверждение нового пароля.
    pub confirm_new_password: String,
}

impl ProfileForm {
    /// Форма, заполненная данными пользователя.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            profile_picture_url: user.profile_picture_url.clone(),
            ..Self::default()
        }
    }
}

/// Собирает частичное обновление: только поля, отличающиеся от `initial`.
///
/// Пароли попадают в обновление парой, если задан новый пароль.
pub fn build_update(initial: &User, form: &ProfileForm) -> ProfileUpdate {
    let changed = |current: &str, original: &str| {
        (current != original).then(|| current.to_string())
    };

    let profile_picture_url = match &form.profile_picture_url {
        Some(url) if initial.profile_picture_url.as_deref() != Some(url.as_str()) => {
            Some(url.clone())
        }
        _ => None,
    };

    let (old_password, new_password) = if form.new_password.is_empty() {
        (None, None)
    } else {
        (
            Some(form.old_password.clone()),
            Some(form.new_password.clone()),
        )
    };

    ProfileUpdate {
        username: changed(&form.username, &initial.username),
        email: changed(&form.email, &initial.email),
        profile_picture_url,
        old_password,
        new_password,
    }
}

#[derive(Debug, Clone)]
/// Экран редактирования профиля.
pub struct EditProfileScreen {
    initial: User,
    /// Поля формы.
    pub form: ProfileForm,
    delete_requested: bool,
    status: ScreenStatus,
}

impl EditProfileScreen {
    /// Экран со снимком `initial`, с которым сравнивается форма.
    pub fn new(initial: User) -> Self {
        let form = ProfileForm::from_user(&initial);
        Self {
            initial,
            form,
            delete_requested: false,
            status: ScreenStatus::default(),
        }
    }

    /// Снимок пользователя на момент открытия экрана.
    pub fn initial(&self) -> &User {
        &self.initial
    }

    /// Состояние экрана.
    pub fn status(&self) -> &ScreenStatus {
        &self.status
    }

    /// Забирает накопленные уведомления.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.status.take_notices()
    }

    /// Отправляет изменённые поля профиля.
    ///
    /// Без изменений запрос не отправляется. Ответ 401 закрывает сессию.
    pub async fn update_profile<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        if !self.form.new_password.is_empty()
            && self.form.new_password != self.form.confirm_new_password
        {
            self.status.notify(Notice::error(
                "Новый пароль и подтверждение не совпадают.",
            ));
            return Navigation::Stay;
        }

        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(&mut self.status, session, "Вы не вошли в систему.")
                .await;
        };

        let update = build_update(&self.initial, &self.form);
        if update.is_empty() {
            self.status.notify(Notice::warning("Изменений не обнаружено."));
            return Navigation::Stay;
        }

        self.status.begin_submitting();
        match api.update_current_user(&token, &update).await {
            Ok(response) => {
                info!(user_id = self.initial.id, "profile updated");
                self.status.succeed();
                self.status.notify(Notice::success(
                    response
                        .message
                        .unwrap_or_else(|| "Профиль обновлён.".to_string()),
                ));
                Navigation::Back
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "update profile",
                    "Не удалось обновить профиль.",
                    SignOutPolicy::OnUnauthorized,
                )
                .await
            }
        }
    }

    /// Первый шаг удаления: запрашивает подтверждение.
    pub fn request_delete(&mut self) {
        self.delete_requested = true;
        self.status.notify(Notice::warning(
            "Удалить аккаунт? Это действие необратимо.",
        ));
    }

    /// Отменяет запрошенное удаление.
    pub fn cancel_delete(&mut self) {
        self.delete_requested = false;
    }

    /// Ожидает ли удаление подтверждения.
    pub fn is_delete_pending(&self) -> bool {
        self.delete_requested
    }

    /// Удаляет аккаунт, если удаление было запрошено через [`Self::request_delete`].
    ///
    /// После успеха, а также на 401/403, сессия закрывается.
    pub async fn confirm_delete<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        if !std::mem::take(&mut self.delete_requested) {
            warn!("account deletion was not requested, ignoring confirmation");
            return Navigation::Stay;
        }

        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(&mut self.status, session, "Вы не вошли в систему.")
                .await;
        };

        self.status.begin_submitting();
        match api.delete_current_user(&token).await {
            Ok(()) => {
                info!(user_id = self.initial.id, "account deleted");
                self.status.succeed();
                force_sign_out(session).await;
                Navigation::SignedOut
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "delete account",
                    "Не удалось удалить аккаунт.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            profile_picture_url: Some("/uploads/alice.png".to_string()),
            created_at: None,
        }
    }

    #[test]
    fn unchanged_form_builds_empty_update() {
        let user = alice();
        let update = build_update(&user, &ProfileForm::from_user(&user));
        assert!(update.is_empty());
    }

    #[test]
    fn only_changed_fields_are_included() {
        let user = alice();
        let mut form = ProfileForm::from_user(&user);
        form.email = "alice@new.example.com".to_string();

        let update = build_update(&user, &form);
        assert_eq!(
            update,
            ProfileUpdate {
                email: Some("alice@new.example.com".to_string()),
                ..ProfileUpdate::default()
            }
        );
    }

    #[test]
    fn new_picture_is_included() {
        let user = alice();
        let mut form = ProfileForm::from_user(&user);
        form.profile_picture_url = Some("file:///tmp/picked.jpg".to_string());

        let update = build_update(&user, &form);
        assert_eq!(
            update.profile_picture_url.as_deref(),
            Some("file:///tmp/picked.jpg")
        );
        assert!(update.username.is_none());
    }

    #[test]
    fn new_password_brings_old_password_along() {
        let user = alice();
        let mut form = ProfileForm::from_user(&user);
        form.old_password = "old".to_string();
        form.new_password = "new".to_string();

        let update = build_update(&user, &form);
        assert_eq!(update.old_password.as_deref(), Some("old"));
        assert_eq!(update.new_password.as_deref(), Some("new"));
        assert!(update.email.is_none());
    }

    #[test]
    fn old_password_alone_is_ignored() {
        let user = alice();
        let mut form = ProfileForm::from_user(&user);
        form.old_password = "old".to_string();

        assert!(build_update(&user, &form).is_empty());
    }

    #[test]
    fn cancel_delete_disarms_confirmation() {
        let mut screen = EditProfileScreen::new(alice());
        screen.request_delete();
        assert!(screen.is_delete_pending());

        screen.cancel_delete();
        assert!(!screen.is_delete_pending());
    }
}
