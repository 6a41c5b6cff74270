//! Лента: поиск, создание поста, лайки и избранное.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{
    Navigation, Notice, ScreenStatus, SignOutPolicy, handle_failure, reject_missing_token,
};
use crate::error::ForumClientResult;
use crate::http_client::ApiClient;
use crate::models::{NewPost, Post, PostRelation};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Default)]
/// Форма нового поста.
pub struct ComposeForm {
    /// Заголовок.
    pub title: String,
    /// Содержимое.
    pub content: String,
    /// Ссылка на выбранную картинку.
    pub image_ref: Option<String>,
}

impl ComposeForm {
    fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }

    fn to_new_post(&self) -> NewPost {
        NewPost {
            title: self.title.clone(),
            content: self.content.clone(),
            image_url: self.image_ref.clone(),
        }
    }
}

/// Снимок состояния до оптимистичного переключения.
///
/// Сначала применяется `!previous`, затем ответ сервера либо подтверждает
/// значение, либо исправляет его; при ошибке восстанавливается снимок.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingToggle {
    previous: bool,
    previous_count: Option<u64>,
}

impl PendingToggle {
    fn optimistic(&self) -> bool {
        !self.previous
    }

    /// Счётчик, соответствующий состоянию `state`; `None`, если счётчик не ведётся.
    fn count_for(&self, state: bool) -> Option<u64> {
        self.previous_count
            .map(|count| adjusted_count(count, self.previous, state))
    }
}

fn adjusted_count(count: u64, from: bool, to: bool) -> u64 {
    match (from, to) {
        (false, true) => count.saturating_add(1),
        (true, false) => count.saturating_sub(1),
        _ => count,
    }
}

fn relation_map(relations: &[PostRelation]) -> HashMap<i64, bool> {
    relations
        .iter()
        .map(|relation| (relation.post_id, true))
        .collect()
}

fn load_relations(
    kind: &'static str,
    loaded: ForumClientResult<Vec<PostRelation>>,
) -> HashMap<i64, bool> {
    match loaded {
        Ok(relations) => relation_map(&relations),
        Err(err) => {
            warn!(kind, error = %err, "failed to load post relations");
            HashMap::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Экран ленты.
pub struct FeedScreen {
    /// Поисковый запрос; передаётся серверу как есть.
    pub query: String,
    /// Форма нового поста.
    pub compose: ComposeForm,
    posts: Vec<Post>,
    likes: HashMap<i64, bool>,
    favorites: HashMap<i64, bool>,
    status: ScreenStatus,
}

impl FeedScreen {
    /// Пустая лента.
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

    /// Загруженные посты в порядке сервера.
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Пост из текущего списка.
    pub fn post(&self, post_id: i64) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    /// Лайкнул ли текущий пользователь пост.
    pub fn is_liked(&self, post_id: i64) -> bool {
        self.likes.get(&post_id).copied().unwrap_or(false)
    }

    /// Добавил ли текущий пользователь пост в избранное.
    pub fn is_favorited(&self, post_id: i64) -> bool {
        self.favorites.get(&post_id).copied().unwrap_or(false)
    }

    /// Загружает посты по `query` и, если пользователь вошёл, его лайки и избранное.
    ///
    /// Ошибка загрузки лайков или избранного не мешает показать ленту:
    /// каждый список загружается отдельно.
    pub async fn fetch_posts<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        self.status.begin_loading();

        let posts = match api.list_posts(&self.query).await {
            Ok(posts) => posts,
            Err(err) => {
                return handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "fetch posts",
                    "Не удалось загрузить посты.",
                    SignOutPolicy::Never,
                )
                .await;
            }
        };

        let (likes, favorites) = match (session.user(), session.token()) {
            (Some(user), Some(token)) => (
                load_relations("likes", api.user_likes(token, user.id).await),
                load_relations("favorites", api.user_favorites(token, user.id).await),
            ),
            _ => (HashMap::new(), HashMap::new()),
        };

        debug!(count = posts.len(), query = %self.query, "posts loaded");
        self.posts = posts;
        self.likes = likes;
        self.favorites = favorites;
        self.status.succeed();
        Navigation::Stay
    }

    /// Публикует пост из [`ComposeForm`], затем перезагружает ленту и очищает форму.
    pub async fn create_post<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        if self.compose.is_blank() {
            self.status.notify(Notice::warning(
                "Введите заголовок или текст, чтобы создать пост.",
            ));
            return Navigation::Stay;
        }

        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(
                &mut self.status,
                session,
                "Нужно войти, чтобы создавать посты.",
            )
            .await;
        };

        self.status.begin_submitting();
        match api.create_post(&token, &self.compose.to_new_post()).await {
            Ok(created) => {
                debug!(post_id = created.id, "post created");
                self.compose = ComposeForm::default();
                self.fetch_posts(api, session).await
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "create post",
                    "Не удалось создать пост.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }

    /// Переключает лайк с оптимистичным обновлением флага и счётчика.
    pub async fn toggle_like<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
        post_id: i64,
    ) -> Navigation {
        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(
                &mut self.status,
                session,
                "Нужно войти, чтобы ставить лайки.",
            )
            .await;
        };

        let pending = PendingToggle {
            previous: self.is_liked(post_id),
            previous_count: self.post(post_id).map(|post| post.likes_count),
        };
        self.apply_like(post_id, &pending, pending.optimistic());

        self.status.begin_submitting();
        match api.toggle_like(&token, post_id).await {
            Ok(response) => {
                if response.liked != pending.optimistic() {
                    debug!(
                        post_id,
                        liked = response.liked,
                        "server disagreed with optimistic like"
                    );
                }
                self.apply_like(post_id, &pending, response.liked);
                self.status.succeed();
                Navigation::Stay
            }
            Err(err) => {
                self.apply_like(post_id, &pending, pending.previous);
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "toggle like",
                    "Не удалось обработать лайк.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }

    /// Переключает избранное. Меняется только флаг, счётчиков нет.
    pub async fn toggle_favorite<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
        post_id: i64,
    ) -> Navigation {
        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(
                &mut self.status,
                session,
                "Нужно войти, чтобы добавлять в избранное.",
            )
            .await;
        };

        let pending = PendingToggle {
            previous: self.is_favorited(post_id),
            previous_count: None,
        };
        self.favorites.insert(post_id, pending.optimistic());

        self.status.begin_submitting();
        match api.toggle_favorite(&token, post_id).await {
            Ok(response) => {
                self.favorites.insert(post_id, response.favorited);
                self.status.succeed();
                if let Some(message) = response.message.filter(|m| !m.trim().is_empty()) {
                    self.status.notify(Notice::success(message));
                }
                Navigation::Stay
            }
            Err(err) => {
                self.favorites.insert(post_id, pending.previous);
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "toggle favorite",
                    "Не удалось обработать избранное.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }

    fn apply_like(&mut self, post_id: i64, pending: &PendingToggle, liked: bool) {
        self.likes.insert(post_id, liked);
        let Some(count) = pending.count_for(liked) else {
            return;
        };
        if let Some(post) = self.posts.iter_mut().find(|post| post.id == post_id) {
            post.likes_count = count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: i64, likes_count: u64) -> Post {
        Post {
            id,
            username: "alice".to_string(),
            profile_picture_url: None,
            title: format!("title {id}"),
            content: "content".to_string(),
            image_url: None,
            likes_count,
            comments_count: 0,
            created_at: None,
        }
    }

    #[test]
    fn adjusted_count_never_goes_below_zero() {
        assert_eq!(adjusted_count(0, true, false), 0);
        assert_eq!(adjusted_count(2, true, false), 1);
        assert_eq!(adjusted_count(2, false, true), 3);
        assert_eq!(adjusted_count(2, true, true), 2);
    }

    #[test]
    fn server_correction_is_relative_to_snapshot() {
        let pending = PendingToggle {
            previous: false,
            previous_count: Some(5),
        };
        assert!(pending.optimistic());
        assert_eq!(pending.count_for(true), Some(6));
        // сервер ответил «не лайкнут»: счётчик возвращается к снимку
        assert_eq!(pending.count_for(false), Some(5));
    }

    #[test]
    fn apply_like_updates_flag_and_count() {
        let mut screen = FeedScreen::new();
        screen.posts = vec![post(1, 3), post(2, 0)];

        let pending = PendingToggle {
            previous: screen.is_liked(1),
            previous_count: Some(3),
        };
        screen.apply_like(1, &pending, pending.optimistic());
        assert!(screen.is_liked(1));
        assert_eq!(screen.post(1).map(|p| p.likes_count), Some(4));

        screen.apply_like(1, &pending, pending.previous);
        assert!(!screen.is_liked(1));
        assert_eq!(screen.post(1).map(|p| p.likes_count), Some(3));
        assert_eq!(screen.post(2).map(|p| p.likes_count), Some(0));
    }

    #[test]
    fn compose_form_blank_requires_both_fields_empty() {
        let mut form = ComposeForm {
            title: "  ".to_string(),
            content: "\n".to_string(),
            image_ref: Some("file:///tmp/a.jpg".to_string()),
        };
        assert!(form.is_blank());

        form.content = "hello".to_string();
        assert!(!form.is_blank());
    }

    #[test]
    fn relation_map_marks_listed_posts() {
        let map = relation_map(&[PostRelation { post_id: 4 }, PostRelation { post_id: 9 }]);
        assert_eq!(map.get(&4), Some(&true));
        assert_eq!(map.get(&9), Some(&true));
        assert_eq!(map.get(&1), None);
    }
}
