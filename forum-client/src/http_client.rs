use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::error::{ForumClientError, ForumClientResult};
use crate::models::{
    AuthResponse, Comment, FavoriteToggle, LikeToggle, MessageResponse, NewPost, Post,
    PostRelation, ProfileUpdate, User,
};

/// Базовый URL API, зашитый при сборке (`FORUM_API_BASE_URL`).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("FORUM_API_BASE_URL") {
    Some(value) => value,
    None => "http://localhost:3001/api",
};

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequestDto<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequestDto<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct EmptyBody {}

#[derive(Debug, Deserialize)]
struct ErrorResponseDto {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
/// HTTP-клиент REST API форума.
///
/// Каждый вызов делает один запрос без повторов, таймаутов и кэша. Токен
/// передаётся явно: клиент не хранит состояние сессии.
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Создаёт клиент с базовым URL, например `http://localhost:3001/api`.
    pub fn new(base_url: impl Into<String>) -> ForumClientResult<Self> {
        let client = Client::builder().build().map_err(ForumClientError::Http)?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Клиент с базовым URL, зашитым при сборке.
    pub fn with_default_base_url() -> ForumClientResult<Self> {
        Self::new(DEFAULT_API_BASE_URL)
    }

    /// Базовый URL API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Превращает путь к медиафайлу из ответа сервера в абсолютный URL.
    ///
    /// Относительные пути (`/uploads/a.png`) разрешаются от origin сервера:
    /// базового URL без завершающего сегмента `/api`. Абсолютные ссылки
    /// возвращаются как есть.
    pub fn asset_url(&self, path: &str) -> String {
        const ABSOLUTE_PREFIXES: [&str; 4] = ["http://", "https://", "file://", "data:"];
        if ABSOLUTE_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
        {
            return path.to_string();
        }

        let base = self.base_url.trim_end_matches('/');
        let origin = base.strip_suffix("/api").unwrap_or(base);
        format!("{}/{}", origin, path.trim_start_matches('/'))
    }

    fn builder(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%method, %url, authenticated = token.is_some(), "sending request");

        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn decode_error(response: reqwest::Response) -> ForumClientError {
        let status = response.status();

        let message = match response.bytes().await {
            Ok(body) => serde_json::from_slice::<ErrorResponseDto>(&body)
                .ok()
                .and_then(|dto| dto.message.or(dto.error)),
            Err(_) => None,
        };
        debug!(%status, message = message.as_deref().unwrap_or(""), "request failed");
        ForumClientError::from_http_status(status, message)
    }

    async fn send(request: RequestBuilder) -> ForumClientResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(ForumClientError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }
        Ok(response)
    }

    async fn execute<TRes>(request: RequestBuilder) -> ForumClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let response = Self::send(request).await?;
        let body = response
            .bytes()
            .await
            .map_err(ForumClientError::from_reqwest)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ForumClientError::Decode("empty response body".to_string()));
        }

        serde_json::from_slice::<TRes>(&body)
            .map_err(|err| ForumClientError::Decode(err.to_string()))
    }

    /// Ответы вида `{}` или пустое тело: содержимое не нужно.
    async fn execute_discard(request: RequestBuilder) -> ForumClientResult<()> {
        Self::send(request).await?;
        Ok(())
    }

    /// Универсальный вызов: метод, путь, необязательное JSON-тело и токен.
    ///
    /// Возвращает разобранное JSON-тело ответа.
    pub async fn request<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: Option<&TReq>,
        token: Option<&str>,
    ) -> ForumClientResult<TRes>
    where
        TReq: Serialize + ?Sized,
        TRes: DeserializeOwned,
    {
        let mut request = self.builder(method, path, token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::execute(request).await
    }

    /// `POST /auth/login`.
    pub async fn login(&self, identifier: &str, password: &str) -> ForumClientResult<AuthResponse> {
        let payload = LoginRequestDto {
            identifier,
            password,
        };
        self.request(Method::POST, "/auth/login", Some(&payload), None)
            .await
    }

    /// `POST /auth/register`. Токен сервер не выдаёт: после регистрации нужен вход.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ForumClientResult<()> {
        let payload = RegisterRequestDto {
            username,
            email,
            password,
        };
        let request = self
            .builder(Method::POST, "/auth/register", None)
            .json(&payload);
        Self::execute_discard(request).await
    }

    /// `GET /users/me`.
    pub async fn current_user(&self, token: &str) -> ForumClientResult<User> {
        Self::execute(self.builder(Method::GET, "/users/me", Some(token))).await
    }

    /// `PUT /users/me` с частичным обновлением.
    pub async fn update_current_user(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> ForumClientResult<MessageResponse> {
        let request = self
            .builder(Method::PUT, "/users/me", Some(token))
            .json(update);
        Self::execute(request).await
    }

    /// `DELETE /users/me`.
    pub async fn delete_current_user(&self, token: &str) -> ForumClientResult<()> {
        Self::execute_discard(self.builder(Method::DELETE, "/users/me", Some(token))).await
    }

    /// `GET /users/me/posts`.
    pub async fn my_posts(&self, token: &str) -> ForumClientResult<Vec<Post>> {
        Self::execute(self.builder(Method::GET, "/users/me/posts", Some(token))).await
    }

    /// `GET /users/me/favorites`.
    pub async fn my_favorites(&self, token: &str) -> ForumClientResult<Vec<Post>> {
        Self::execute(self.builder(Method::GET, "/users/me/favorites", Some(token))).await
    }

    /// `GET /users/{id}/likes`.
    pub async fn user_likes(
        &self,
        token: &str,
        user_id: i64,
    ) -> ForumClientResult<Vec<PostRelation>> {
        let path = format!("/users/{user_id}/likes");
        Self::execute(self.builder(Method::GET, &path, Some(token))).await
    }

    /// `GET /users/{id}/favorites`.
    pub async fn user_favorites(
        &self,
        token: &str,
        user_id: i64,
    ) -> ForumClientResult<Vec<PostRelation>> {
        let path = format!("/users/{user_id}/favorites");
        Self::execute(self.builder(Method::GET, &path, Some(token))).await
    }

    /// `GET /posts?q={query}`. Фильтрация выполняется сервером, запрос
    /// передаётся без изменений.
    pub async fn list_posts(&self, query: &str) -> ForumClientResult<Vec<Post>> {
        let request = self
            .builder(Method::GET, "/posts", None)
            .query(&[("q", query)]);
        Self::execute(request).await
    }

    /// `POST /posts`.
    pub async fn create_post(&self, token: &str, post: &NewPost) -> ForumClientResult<Post> {
        self.request(Method::POST, "/posts", Some(post), Some(token))
            .await
    }

    /// `GET /posts/{id}`.
    pub async fn get_post(&self, id: i64) -> ForumClientResult<Post> {
        let path = format!("/posts/{id}");
        Self::execute(self.builder(Method::GET, &path, None)).await
    }

    /// `POST /posts/{id}/like`.
    pub async fn toggle_like(&self, token: &str, id: i64) -> ForumClientResult<LikeToggle> {
        let path = format!("/posts/{id}/like");
        self.request(Method::POST, &path, Some(&EmptyBody {}), Some(token))
            .await
    }

    /// `POST /posts/{id}/favorite`.
    pub async fn toggle_favorite(&self, token: &str, id: i64) -> ForumClientResult<FavoriteToggle> {
        let path = format!("/posts/{id}/favorite");
        self.request(Method::POST, &path, Some(&EmptyBody {}), Some(token))
            .await
    }

    /// `GET /comments/{post_id}`. Порядок определяет сервер.
    pub async fn list_comments(&self, post_id: i64) -> ForumClientResult<Vec<Comment>> {
        let path = format!("/comments/{post_id}");
        Self::execute(self.builder(Method::GET, &path, None)).await
    }

    /// `POST /comments/{post_id}`.
    pub async fn create_comment(
        &self,
        token: &str,
        post_id: i64,
        content: &str,
    ) -> ForumClientResult<Comment> {
        let path = format!("/comments/{post_id}");
        let payload = CreateCommentRequestDto { content };
        self.request(Method::POST, &path, Some(&payload), Some(token))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url).expect("client should build")
    }

    #[test]
    fn endpoint_normalizes_slashes() {
        let client = client("http://localhost:3001/api/");
        assert_eq!(client.endpoint("/posts"), "http://localhost:3001/api/posts");
    }

    #[test]
    fn asset_url_strips_api_segment() {
        let client = client("http://localhost:3001/api");
        assert_eq!(
            client.asset_url("/uploads/avatar.png"),
            "http://localhost:3001/uploads/avatar.png"
        );
    }

    #[test]
    fn asset_url_keeps_base_without_api_segment() {
        let client = client("https://forum.example.com/");
        assert_eq!(
            client.asset_url("uploads/p.jpg"),
            "https://forum.example.com/uploads/p.jpg"
        );
    }

    #[test]
    fn asset_url_passes_absolute_references_through() {
        let client = client("http://localhost:3001/api");
        assert_eq!(
            client.asset_url("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
        assert_eq!(
            client.asset_url("file:///tmp/picked.jpg"),
            "file:///tmp/picked.jpg"
        );
    }
}
