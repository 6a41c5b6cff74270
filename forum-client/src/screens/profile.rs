//! Профиль текущего пользователя: свои посты и избранное.

use super::edit_profile::EditProfileScreen;
use super::{
    Navigation, Notice, ScreenStatus, SignOutPolicy, handle_failure, reject_missing_token,
};
use crate::error::ForumClientError;
use crate::http_client::ApiClient;
use crate::models::{Post, User};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Вкладка профиля.
pub enum ProfileTab {
    /// Посты пользователя.
    #[default]
    MyPosts,
    /// Избранные посты.
    Favorites,
}

#[derive(Debug, Clone, Default)]
/// Экран профиля.
pub struct ProfileScreen {
    user: Option<User>,
    my_posts: Vec<Post>,
    favorites: Vec<Post>,
    tab: ProfileTab,
    status: ScreenStatus,
}

impl ProfileScreen {
    /// Пустой экран профиля.
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

    /// Загруженный пользователь.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Активная вкладка.
    pub fn tab(&self) -> ProfileTab {
        self.tab
    }

    /// Переключает вкладку без запросов к серверу.
    pub fn select_tab(&mut self, tab: ProfileTab) {
        self.tab = tab;
    }

    /// Посты активной вкладки.
    pub fn visible_posts(&self) -> &[Post] {
        match self.tab {
            ProfileTab::MyPosts => &self.my_posts,
            ProfileTab::Favorites => &self.favorites,
        }
    }

    /// Экран получил фокус: данные всегда перезагружаются.
    pub async fn on_focus<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        self.fetch_profile(api, session).await
    }

    /// Загружает пользователя, его посты и избранное.
    pub async fn fetch_profile<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(&mut self.status, session, "Токен не найден.").await;
        };

        self.status.begin_loading();
        let loaded = async {
            let user = api.current_user(&token).await?;
            let my_posts = api.my_posts(&token).await?;
            let favorites = api.my_favorites(&token).await?;
            Ok::<_, ForumClientError>((user, my_posts, favorites))
        };

        match loaded.await {
            Ok((user, my_posts, favorites)) => {
                self.user = Some(user);
                self.my_posts = my_posts;
                self.favorites = favorites;
                self.status.succeed();
                Navigation::Stay
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "fetch profile",
                    "Не удалось загрузить профиль.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }

    /// Экран редактирования со снимком загруженного пользователя.
    pub fn edit_profile(&self) -> Option<EditProfileScreen> {
        self.user.clone().map(EditProfileScreen::new)
    }
}
