//! Пост с комментариями.

use tracing::debug;

use super::{
    Navigation, Notice, ScreenStatus, SignOutPolicy, handle_failure, reject_missing_token,
};
use crate::error::ForumClientError;
use crate::http_client::ApiClient;
use crate::models::{Comment, Post};
use crate::session::{Session, SessionStore};

#[derive(Debug, Clone)]
/// Экран поста.
pub struct PostDetailScreen {
    post_id: i64,
    post: Option<Post>,
    comments: Vec<Comment>,
    /// Текст нового комментария.
    pub new_comment: String,
    status: ScreenStatus,
}

impl PostDetailScreen {
    /// Экран для поста `post_id`. Данные загружаются в [`Self::fetch_post_detail`].
    pub fn new(post_id: i64) -> Self {
        Self {
            post_id,
            post: None,
            comments: Vec::new(),
            new_comment: String::new(),
            status: ScreenStatus::default(),
        }
    }

    /// Идентификатор поста экрана.
    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    /// Загруженный пост.
    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    /// Комментарии в порядке сервера.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Состояние экрана.
    pub fn status(&self) -> &ScreenStatus {
        &self.status
    }

    /// Забирает накопленные уведомления.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.status.take_notices()
    }

    /// Загружает пост и его комментарии. При ошибке экран нужно закрыть.
    pub async fn fetch_post_detail<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        self.status.begin_loading();

        let post_id = self.post_id;
        let loaded = async {
            let post = api.get_post(post_id).await?;
            let comments = api.list_comments(post_id).await?;
            Ok::<_, ForumClientError>((post, comments))
        };

        match loaded.await {
            Ok((post, comments)) => {
                debug!(post_id = self.post_id, comments = comments.len(), "post loaded");
                self.post = Some(post);
                self.comments = comments;
                self.status.succeed();
                Navigation::Stay
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "fetch post detail",
                    "Не удалось загрузить пост.",
                    SignOutPolicy::Never,
                )
                .await;
                Navigation::Back
            }
        }
    }

    /// Отправляет комментарий, очищает поле ввода и перезагружает пост.
    pub async fn create_comment<S: SessionStore>(
        &mut self,
        api: &ApiClient,
        session: &mut Session<S>,
    ) -> Navigation {
        let content = self.new_comment.trim().to_string();
        if content.is_empty() {
            self.status.notify(Notice::error("Комментарий не может быть пустым."));
            return Navigation::Stay;
        }

        let Some(token) = session.token().map(str::to_string) else {
            return reject_missing_token(
                &mut self.status,
                session,
                "Нужно войти, чтобы комментировать.",
            )
            .await;
        };

        self.status.begin_submitting();
        match api.create_comment(&token, self.post_id, &content).await {
            Ok(comment) => {
                debug!(post_id = self.post_id, comment_id = comment.id, "comment created");
                self.new_comment.clear();
                self.fetch_post_detail(api, session).await
            }
            Err(err) => {
                handle_failure(
                    &mut self.status,
                    session,
                    &err,
                    "create comment",
                    "Не удалось отправить комментарий.",
                    SignOutPolicy::OnAuthFailure,
                )
                .await
            }
        }
    }
}
