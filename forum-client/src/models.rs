use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Публичная модель пользователя.
///
/// Ответ логина может содержать только `id` и `username`, поэтому остальные
/// поля необязательны.
pub struct User {
    /// Идентификатор пользователя.
    pub id: i64,
    /// Логин.
    pub username: String,
    /// Email.
    #[serde(default)]
    pub email: String,
    /// Путь или URL аватара.
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    /// Дата и время создания пользователя (UTC).
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Пост ленты.
pub struct Post {
    /// Идентификатор поста.
    pub id: i64,
    /// Логин автора.
    #[serde(default)]
    pub username: String,
    /// Аватар автора.
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    /// Заголовок поста.
    #[serde(default)]
    pub title: String,
    /// Содержимое поста.
    #[serde(default)]
    pub content: String,
    /// Путь или URL картинки поста.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Количество лайков (считается сервером).
    #[serde(default, deserialize_with = "deserialize_count")]
    pub likes_count: u64,
    /// Количество комментариев (считается сервером).
    #[serde(default, deserialize_with = "deserialize_count")]
    pub comments_count: u64,
    /// Дата и время создания поста (UTC).
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Комментарий к посту.
pub struct Comment {
    /// Идентификатор комментария.
    pub id: i64,
    /// Идентификатор поста.
    pub post_id: i64,
    /// Логин автора.
    #[serde(default)]
    pub username: String,
    /// Аватар автора.
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    /// Текст комментария.
    pub content: String,
    /// Дата и время создания (UTC).
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
/// Связь «пользователь/пост» из списков лайков и избранного.
pub struct PostRelation {
    /// Идентификатор поста.
    pub post_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
/// Ответ после успешного входа.
pub struct AuthResponse {
    /// Bearer-токен сессии.
    pub token: String,
    /// Данные пользователя.
    pub user: User,
}

#[derive(Debug, Clone, Copy, Deserialize)]
/// Ответ `POST /posts/{id}/like`.
pub struct LikeToggle {
    /// Новое состояние лайка.
    pub liked: bool,
}

#[derive(Debug, Clone, Deserialize)]
/// Ответ `POST /posts/{id}/favorite`.
pub struct FavoriteToggle {
    /// Новое состояние избранного.
    pub favorited: bool,
    /// Сообщение сервера.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
/// Ответ, содержащий только сообщение сервера.
pub struct MessageResponse {
    /// Сообщение сервера.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
/// Тело `POST /posts`.
pub struct NewPost {
    /// Заголовок.
    pub title: String,
    /// Содержимое.
    pub content: String,
    /// Ссылка на картинку; не отправляется, если отсутствует.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Частичное обновление профиля для `PUT /users/me`.
///
/// Отправляются только заданные поля.
pub struct ProfileUpdate {
    /// Новый логин.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Новый email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Новый аватар.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
    /// Текущий пароль, обязателен вместе с `new_password`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_password: Option<String>,
    /// Новый пароль.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

impl ProfileUpdate {
    /// `true`, если обновлять нечего.
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.profile_picture_url.is_none()
            && self.old_password.is_none()
            && self.new_password.is_none()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Number(i64),
    Text(String),
}

// агрегаты COUNT из SQL часто приходят строками
fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawCount::Number(value)) => Ok(value.max(0) as u64),
        Some(RawCount::Text(raw)) => raw
            .trim()
            .parse::<i64>()
            .map(|value| value.max(0) as u64)
            .map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_accepts_counts_as_numbers_or_strings() {
        let raw = r#"[
            {"id":1,"username":"alice","title":"t","content":"c",
             "likes_count":3,"comments_count":"7"},
            {"id":2,"username":"bob","title":"t","content":"c","likes_count":null}
        ]"#;
        let posts: Vec<Post> = serde_json::from_str(raw).expect("posts should parse");

        assert_eq!(posts[0].likes_count, 3);
        assert_eq!(posts[0].comments_count, 7);
        assert_eq!(posts[1].likes_count, 0);
        assert_eq!(posts[1].comments_count, 0);
    }

    #[test]
    fn post_rejects_non_numeric_count_string() {
        let raw = r#"{"id":1,"likes_count":"many"}"#;
        assert!(serde_json::from_str::<Post>(raw).is_err());
    }

    #[test]
    fn minimal_login_user_parses() {
        let user: User =
            serde_json::from_str(r#"{"id":1,"username":"alice"}"#).expect("user should parse");
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "alice");
        assert!(user.email.is_empty());
        assert!(user.profile_picture_url.is_none());
    }

    #[test]
    fn new_post_omits_missing_image() {
        let body = serde_json::to_value(NewPost {
            title: "t".to_string(),
            content: String::new(),
            image_url: None,
        })
        .expect("serializable");
        assert_eq!(body, serde_json::json!({"title": "t", "content": ""}));
    }

    #[test]
    fn profile_update_serializes_only_present_fields() {
        let update = ProfileUpdate {
            email: Some("new@example.com".to_string()),
            ..ProfileUpdate::default()
        };
        let body = serde_json::to_value(&update).expect("serializable");
        assert_eq!(body, serde_json::json!({"email": "new@example.com"}));
        assert!(!update.is_empty());
        assert!(ProfileUpdate::default().is_empty());
    }
}
