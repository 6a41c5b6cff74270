use std::time::{SystemTime, UNIX_EPOCH};

use forum_client::{ApiClient, ForumClientError, NewPost};

fn unique_suffix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock must be after unix epoch")
        .as_nanos();
    format!("{nanos}")
}

#[tokio::test]
#[ignore = "requires running forum API server and database"]
async fn http_smoke_flow() {
    let base_url = std::env::var("FORUM_HTTP_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:3001/api".to_string());
    let client = ApiClient::new(base_url).expect("client must build");

    let suffix = unique_suffix();
    let username = format!("smoke_user_{suffix}");
    let email = format!("smoke_{suffix}@example.com");
    let password = "password123";

    client
        .register(&username, &email, password)
        .await
        .expect("register must succeed");

    let auth = client
        .login(&username, password)
        .await
        .expect("login must succeed");
    assert!(!auth.token.is_empty());
    assert_eq!(auth.user.username, username);
    let token = auth.token.as_str();

    let created = client
        .create_post(
            token,
            &NewPost {
                title: format!("smoke title {suffix}"),
                content: "smoke content".to_string(),
                image_url: None,
            },
        )
        .await
        .expect("create_post must succeed");

    let listed = client
        .list_posts(&suffix)
        .await
        .expect("list_posts must succeed");
    assert!(listed.iter().any(|post| post.id == created.id));

    let liked = client
        .toggle_like(token, created.id)
        .await
        .expect("toggle_like must succeed");
    assert!(liked.liked);
    let likes = client
        .user_likes(token, auth.user.id)
        .await
        .expect("user_likes must succeed");
    assert!(likes.iter().any(|relation| relation.post_id == created.id));

    client
        .create_comment(token, created.id, "smoke comment")
        .await
        .expect("create_comment must succeed");
    let comments = client
        .list_comments(created.id)
        .await
        .expect("list_comments must succeed");
    assert!(comments.iter().any(|c| c.content == "smoke comment"));

    client
        .delete_current_user(token)
        .await
        .expect("delete_current_user must succeed");

    let after_delete = client.current_user(token).await;
    assert!(matches!(
        after_delete,
        Err(ForumClientError::Status { .. })
    ));
}
