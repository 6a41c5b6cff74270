use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forum_client::screens::auth::{LoginScreen, RegisterScreen, sign_out};
use forum_client::screens::detail::PostDetailScreen;
use forum_client::screens::feed::FeedScreen;
use forum_client::screens::profile::{ProfileScreen, ProfileTab};
use forum_client::screens::{Navigation, Notice, NoticeKind, ViewState};
use forum_client::{
    ApiClient, Comment, FileSessionStore, ForumClientError, Post, Session, User,
};
use tracing::debug;

mod logging;
mod settings;

use logging::init_logging;
use settings::Settings;

type CliSession = Session<FileSessionStore>;

#[derive(Debug, Parser)]
#[command(name = "forum-cli", version, about = "CLI клиент форума")]
struct Cli {
    /// Базовый адрес API, например `http://localhost:3001/api`.
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Регистрация пользователя.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Вход по логину или email.
    Login {
        #[arg(long)]
        identifier: String,
        #[arg(long)]
        password: String,
    },
    /// Выход: удаляет сохранённую сессию.
    Logout,
    /// Лента постов с необязательным поиском.
    Feed {
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Создание поста (требует вход).
    Post {
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// Путь или ссылка на картинку.
        #[arg(long)]
        image: Option<String>,
    },
    /// Поставить или снять лайк.
    Like {
        #[arg(long)]
        id: i64,
    },
    /// Добавить в избранное или убрать из него.
    Favorite {
        #[arg(long)]
        id: i64,
    },
    /// Пост с комментариями.
    Show {
        #[arg(long)]
        id: i64,
    },
    /// Комментарий к посту (требует вход).
    Comment {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        content: String,
    },
    /// Профиль: свои посты или избранное.
    Profile {
        #[arg(long)]
        favorites: bool,
    },
    /// Изменение профиля. Отправляются только изменённые поля.
    EditProfile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        picture: Option<String>,
        #[arg(long)]
        old_password: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
        /// По умолчанию совпадает с `--new-password`.
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Удаление аккаунта.
    DeleteAccount {
        /// Не спрашивать подтверждение.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Failed,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(Outcome::Done) => {}
        Ok(Outcome::Failed) => process::exit(1),
        Err(err) => {
            eprintln!("Ошибка: {err}");
            process::exit(1);
        }
    }
}

async fn run() -> Result<Outcome> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    init_logging(&settings.log_level)?;

    let api = match resolve_server(cli.server, settings.api_url.clone()) {
        Some(base_url) => ApiClient::new(base_url),
        None => ApiClient::with_default_base_url(),
    }
    .map_err(map_client_error)?;

    let store = FileSessionStore::new(&settings.session_file);
    debug!(
        base_url = api.base_url(),
        session_file = %store.path().display(),
        "starting"
    );
    let mut session = Session::restore(store)
        .await
        .map_err(map_client_error)
        .with_context(|| format!("не удалось прочитать {}", settings.session_file.display()))?;

    let outcome = match cli.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let mut screen = RegisterScreen::new();
            screen.username = username;
            screen.email = email;
            screen.password = password;
            let navigation = screen.register(&api, &mut session).await;
            report(screen.take_notices(), navigation)
        }
        Command::Login {
            identifier,
            password,
        } => {
            let mut screen = LoginScreen::new();
            screen.identifier = identifier;
            screen.password = password;
            let navigation = screen.login(&api, &mut session).await;
            let outcome = report(screen.take_notices(), navigation);
            if let Some(user) = logged_in_user(navigation, session.user()) {
                print_user("Пользователь", user);
            }
            outcome
        }
        Command::Logout => {
            let navigation = sign_out(&mut session).await;
            report(Vec::new(), navigation)
        }
        Command::Feed { query } => {
            let mut screen = FeedScreen::new();
            screen.query = query;
            let navigation = screen.fetch_posts(&api, &mut session).await;
            print_feed(&api, &screen);
            report(screen.take_notices(), navigation)
        }
        Command::Post {
            title,
            content,
            image,
        } => {
            let mut screen = FeedScreen::new();
            screen.compose.title = title;
            screen.compose.content = content;
            screen.compose.image_ref = image;
            let navigation = screen.create_post(&api, &mut session).await;
            if screen.status().view() == &ViewState::Ready {
                print_feed(&api, &screen);
            }
            report(screen.take_notices(), navigation)
        }
        Command::Like { id } => {
            let mut screen = load_feed(&api, &mut session).await;
            let navigation = screen.toggle_like(&api, &mut session, id).await;
            if screen.status().view() == &ViewState::Ready {
                let likes = screen.post(id).map(|post| post.likes_count);
                println!(
                    "Пост {id}: {} (лайков: {})",
                    if screen.is_liked(id) { "лайк поставлен" } else { "лайк снят" },
                    likes.map_or_else(|| "?".to_string(), |count| count.to_string())
                );
            }
            report(screen.take_notices(), navigation)
        }
        Command::Favorite { id } => {
            let mut screen = load_feed(&api, &mut session).await;
            let navigation = screen.toggle_favorite(&api, &mut session, id).await;
            if screen.status().view() == &ViewState::Ready {
                println!(
                    "Пост {id}: {}",
                    if screen.is_favorited(id) { "в избранном" } else { "не в избранном" }
                );
            }
            report(screen.take_notices(), navigation)
        }
        Command::Show { id } => {
            let mut screen = PostDetailScreen::new(id);
            let navigation = screen.fetch_post_detail(&api, &mut session).await;
            match screen.post() {
                Some(post) => {
                    print_post(&api, post);
                    print_comments(&api, screen.comments());
                }
                None => println!("Пост {} не загружен.", screen.post_id()),
            }
            report(screen.take_notices(), navigation)
        }
        Command::Comment { id, content } => {
            let mut screen = PostDetailScreen::new(id);
            screen.new_comment = content;
            let navigation = screen.create_comment(&api, &mut session).await;
            if screen.status().view() == &ViewState::Ready {
                print_comments(&api, screen.comments());
            }
            report(screen.take_notices(), navigation)
        }
        Command::Profile { favorites } => {
            let mut screen = ProfileScreen::new();
            let navigation = screen.on_focus(&api, &mut session).await;
            if favorites {
                screen.select_tab(ProfileTab::Favorites);
            }
            if let Some(user) = screen.user() {
                print_user("Профиль", user);
                if let Some(picture) = &user.profile_picture_url {
                    println!("  avatar: {}", api.asset_url(picture));
                }
                let heading = match screen.tab() {
                    ProfileTab::MyPosts => "Мои посты",
                    ProfileTab::Favorites => "Избранное",
                };
                print_posts(&api, heading, screen.visible_posts());
            }
            report(screen.take_notices(), navigation)
        }
        Command::EditProfile {
            username,
            email,
            picture,
            old_password,
            new_password,
            confirm_password,
        } => {
            let mut profile = ProfileScreen::new();
            let navigation = profile.on_focus(&api, &mut session).await;
            let Some(mut screen) = profile.edit_profile() else {
                return Ok(report(profile.take_notices(), navigation));
            };

            if let Some(username) = username {
                screen.form.username = username;
            }
            if let Some(email) = email {
                screen.form.email = email;
            }
            if picture.is_some() {
                screen.form.profile_picture_url = picture;
            }
            if let Some(old_password) = old_password {
                screen.form.old_password = old_password;
            }
            if let Some(new_password) = new_password {
                screen.form.confirm_new_password =
                    confirm_password.unwrap_or_else(|| new_password.clone());
                screen.form.new_password = new_password;
            }

            let navigation = screen.update_profile(&api, &mut session).await;
            report(screen.take_notices(), navigation)
        }
        Command::DeleteAccount { yes } => {
            let mut profile = ProfileScreen::new();
            let navigation = profile.on_focus(&api, &mut session).await;
            let Some(mut screen) = profile.edit_profile() else {
                return Ok(report(profile.take_notices(), navigation));
            };

            screen.request_delete();
            println!("Аккаунт: @{}", screen.initial().username);
            print_notices(&screen.take_notices());

            let confirmed = yes || ask_confirmation().context("не удалось прочитать ответ")?;
            if !confirmed {
                screen.cancel_delete();
                println!("Удаление отменено.");
                return Ok(Outcome::Done);
            }

            let navigation = screen.confirm_delete(&api, &mut session).await;
            report(screen.take_notices(), navigation)
        }
    };

    Ok(outcome)
}

async fn load_feed(api: &ApiClient, session: &mut CliSession) -> FeedScreen {
    let mut screen = FeedScreen::new();
    // снимок лайков и избранного нужен до переключения
    screen.fetch_posts(api, session).await;
    screen
}

/// Адрес из `--server` или `FORUM_API_URL`; `None`, если используется встроенный.
fn resolve_server(flag: Option<String>, configured: Option<String>) -> Option<String> {
    flag.or(configured).map(normalize_server)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn ask_confirmation() -> io::Result<bool> {
    print!("Введите \"yes\", чтобы подтвердить: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_confirmation(&answer))
}

fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

fn map_client_error(err: ForumClientError) -> anyhow::Error {
    let message = match err {
        ForumClientError::Unauthorized => {
            "требуется авторизация: выполните `forum-cli login ...`".to_string()
        }
        ForumClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        ForumClientError::Http(err) => format!("ошибка HTTP: {err}"),
        ForumClientError::Status { status, message } => match message {
            Some(message) => format!("сервер ответил {status}: {message}"),
            None => format!("сервер ответил {status}"),
        },
        ForumClientError::Decode(message) => format!("некорректный ответ сервера: {message}"),
        ForumClientError::Storage(err) => format!("ошибка файла сессии: {err}"),
        ForumClientError::Serialization(err) => format!("повреждённый файл сессии: {err}"),
    };
    anyhow::anyhow!(message)
}

fn report(notices: Vec<Notice>, navigation: Navigation) -> Outcome {
    print_notices(&notices);
    if navigation == Navigation::SignedOut {
        println!("Сессия закрыта. Войдите снова: `forum-cli login ...`");
    }

    if notices.iter().any(|notice| notice.kind == NoticeKind::Error) {
        Outcome::Failed
    } else {
        Outcome::Done
    }
}

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        let line = format_notice(notice);
        match notice.kind {
            NoticeKind::Error => eprintln!("{line}"),
            NoticeKind::Success | NoticeKind::Warning => println!("{line}"),
        }
    }
}

fn format_notice(notice: &Notice) -> String {
    format!("[{}] {}", notice.title, notice.message)
}

/// Пользователь, которого нужно показать после входа: старая сессия при ошибке не выводится.
fn logged_in_user(navigation: Navigation, user: Option<&User>) -> Option<&User> {
    user.filter(|_| navigation == Navigation::Feed)
}

fn print_user(title: &str, user: &User) {
    println!("{title}");
    println!("  id: {}", user.id);
    println!("  username: {}", user.username);
    if !user.email.is_empty() {
        println!("  email: {}", user.email);
    }
    if let Some(created_at) = user.created_at {
        println!("  created_at: {created_at}");
    }
}

fn print_feed(api: &ApiClient, screen: &FeedScreen) {
    println!("Постов: {}", screen.posts().len());
    for post in screen.posts() {
        let mut marks = String::new();
        if screen.is_liked(post.id) {
            marks.push_str(" ♥");
        }
        if screen.is_favorited(post.id) {
            marks.push_str(" ★");
        }
        println!(
            "- [{}] {} @{} (лайков: {}, комментариев: {}){marks}",
            post.id, post.title, post.username, post.likes_count, post.comments_count
        );
        if let Some(image) = &post.image_url {
            println!("    image: {}", api.asset_url(image));
        }
    }
}

fn print_posts(api: &ApiClient, heading: &str, posts: &[Post]) {
    println!("{heading}: {}", posts.len());
    for post in posts {
        println!("- [{}] {} (лайков: {})", post.id, post.title, post.likes_count);
        if let Some(image) = &post.image_url {
            println!("    image: {}", api.asset_url(image));
        }
    }
}

fn print_post(api: &ApiClient, post: &Post) {
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("author: {}", post.username);
    if let Some(picture) = &post.profile_picture_url {
        println!("avatar: {}", api.asset_url(picture));
    }
    println!("content: {}", post.content);
    if let Some(image) = &post.image_url {
        println!("image: {}", api.asset_url(image));
    }
    println!("likes: {}", post.likes_count);
    if let Some(created_at) = post.created_at {
        println!("created_at: {created_at}");
    }
}

fn print_comments(api: &ApiClient, comments: &[Comment]) {
    println!("Комментариев: {}", comments.len());
    for comment in comments {
        println!("- @{}: {}", comment.username, comment.content);
        if let Some(picture) = &comment.profile_picture_url {
            println!("    avatar: {}", api.asset_url(picture));
        }
    }
}

#[cfg(test)]
mod tests {
    use forum_client::DEFAULT_API_BASE_URL;

    use super::*;

    #[test]
    fn normalize_server_keeps_scheme() {
        let s = normalize_server("https://forum.example.com/api".to_string());
        assert_eq!(s, "https://forum.example.com/api");
    }

    #[test]
    fn normalize_server_adds_http_scheme() {
        let s = normalize_server("127.0.0.1:3001/api".to_string());
        assert_eq!(s, "http://127.0.0.1:3001/api");
    }

    #[test]
    fn resolve_server_falls_back_to_built_in_url() {
        assert_eq!(resolve_server(None, None), None);
        let api = ApiClient::with_default_base_url().expect("client should build");
        assert_eq!(api.base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn resolve_server_prefers_flag_over_configuration() {
        let url = resolve_server(
            Some("localhost:9999/api".to_string()),
            Some("http://configured/api".to_string()),
        );
        assert_eq!(url.as_deref(), Some("http://localhost:9999/api"));

        let url = resolve_server(None, Some("http://configured/api".to_string()));
        assert_eq!(url.as_deref(), Some("http://configured/api"));
    }

    #[test]
    fn confirmation_requires_yes() {
        assert!(is_confirmation("yes\n"));
        assert!(is_confirmation("  YES "));
        assert!(!is_confirmation("y"));
        assert!(!is_confirmation(""));
    }

    #[test]
    fn notice_is_formatted_with_title() {
        assert_eq!(format_notice(&Notice::warning("Пусто")), "[Внимание] Пусто");
    }

    #[test]
    fn error_notice_fails_the_command() {
        assert_eq!(
            report(vec![Notice::error("boom")], Navigation::Stay),
            Outcome::Failed
        );
        assert_eq!(
            report(vec![Notice::success("ok")], Navigation::Feed),
            Outcome::Done
        );
    }

    #[test]
    fn stale_user_is_not_shown_after_failed_login() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            email: String::new(),
            profile_picture_url: None,
            created_at: None,
        };

        assert!(logged_in_user(Navigation::Stay, Some(&user)).is_none());
        assert_eq!(
            logged_in_user(Navigation::Feed, Some(&user)).map(|u| u.id),
            Some(1)
        );
    }

    #[test]
    fn cli_parses_delete_account_flag() {
        let cli = Cli::try_parse_from(["forum-cli", "delete-account", "--yes"]).expect("parse");
        assert!(matches!(cli.command, Command::DeleteAccount { yes: true }));
    }
}
