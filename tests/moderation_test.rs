mod common;

use async_trait::async_trait;
use forum_moderation::{
    models::{forum::KIND_CATEGORY, ForumModel, TopicStatus, UserModel},
    AppResult, ForumPermissionHandler,
};
use serde_json::Value;
use std::sync::Arc;

#[tokio::test]
async fn lock_topic_sets_status_and_keeps_forum() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(
        common::location(&resp),
        "/api/v1/forums/general/topics/hello-world"
    );

    let locked = app.topic(topic.id).await.unwrap();
    assert_eq!(locked.status(), TopicStatus::Locked);
    assert_eq!(locked.forum_id, forum.id);
}

#[tokio::test]
async fn lock_redirect_carries_flash_message() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let cookie = common::flash_cookie(&resp);

    // Following the redirect still lands on the topic page.
    let page = app
        .client
        .get(app.location_url(&common::location(&resp)))
        .send()
        .await
        .unwrap();
    assert_eq!(page.status(), 200);
    let body: Value = page.json().await.unwrap();
    assert_eq!(body["data"]["topic"]["status"], "locked");

    let resp = app
        .client
        .get(app.url("/messages"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let messages = body["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["level"], "success");
    assert_eq!(
        messages[0]["message"],
        "This topic has been locked successfully."
    );
}

#[tokio::test]
async fn lock_confirmation_returns_topic_and_forum() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .get(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["topic"]["id"], topic.id);
    assert_eq!(body["data"]["topic"]["status"], "normal");
    assert_eq!(body["data"]["forum"]["slug"], "general");

    // Confirmation pages never mutate.
    let unchanged = app.topic(topic.id).await.unwrap();
    assert_eq!(unchanged.status(), TopicStatus::Normal);
}

#[tokio::test]
async fn regular_user_cannot_lock() {
    let app = common::spawn_app().await;
    let (_user, token) = common::create_user(&app, "alice", "user").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    for method in [reqwest::Method::GET, reqwest::Method::POST] {
        let resp = app
            .client
            .request(
                method,
                app.url(&format!("/moderation/topics/{}/lock", topic.id)),
            )
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
    }

    let unchanged = app.topic(topic.id).await.unwrap();
    assert_eq!(unchanged.status(), TopicStatus::Normal);
}

#[tokio::test]
async fn forum_moderator_can_lock_only_in_own_forum() {
    let app = common::spawn_app().await;
    let (moderator, token) = common::create_user(&app, "mod", "user").await;
    let general = common::create_forum(&app, "general").await;
    let offtopic = common::create_forum(&app, "offtopic").await;
    common::make_moderator(&app, &general, &moderator).await;

    let own = common::create_topic(&app, &general, "mine", 1).await;
    let other = common::create_topic(&app, &offtopic, "theirs", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", own.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert!(app.topic(own.id).await.unwrap().is_locked());

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", other.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(!app.topic(other.id).await.unwrap().is_locked());
}

#[tokio::test]
async fn unlock_restores_normal_status() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    app.client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/unlock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(
        common::location(&resp),
        "/api/v1/forums/general/topics/hello-world"
    );
    let unlocked = app.topic(topic.id).await.unwrap();
    assert_eq!(unlocked.status(), TopicStatus::Normal);
}

#[tokio::test]
async fn delete_topic_redirects_to_forum_page() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let doomed = common::create_topic(&app, &forum, "doomed", 4).await;
    common::create_topic(&app, &forum, "survivor", 2).await;
    assert_eq!(app.forum(forum.id).await.topics_count, 2);

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/delete", doomed.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(common::location(&resp), "/api/v1/forums/general");
    assert!(app.topic(doomed.id).await.is_none());

    let refreshed = app.forum(forum.id).await;
    assert_eq!(refreshed.topics_count, 1);
    assert_eq!(refreshed.posts_count, 2);
}

#[tokio::test]
async fn delete_method_removes_topic() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "doomed", 1).await;

    let resp = app
        .client
        .delete(app.url(&format!("/moderation/topics/{}", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(common::location(&resp), "/api/v1/forums/general");
    assert!(app.topic(topic.id).await.is_none());
}

#[tokio::test]
async fn delete_confirmation_does_not_delete() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "kept", 1).await;

    let resp = app
        .client
        .get(app.url(&format!("/moderation/topics/{}/delete", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["forum"]["id"], forum.id);
    assert!(app.topic(topic.id).await.is_some());
}

#[tokio::test]
async fn regular_user_cannot_delete() {
    let app = common::spawn_app().await;
    let (_user, token) = common::create_user(&app, "alice", "user").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "kept", 1).await;

    let resp = app
        .client
        .delete(app.url(&format!("/moderation/topics/{}", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    assert!(app.topic(topic.id).await.is_some());
}

#[tokio::test]
async fn move_topic_with_lock_flag() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    let topic = common::create_topic(&app, &a, "wandering", 3).await;
    common::create_topic(&app, &a, "staying", 2).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": b.id, "lock_topic": true }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    assert_eq!(
        common::location(&resp),
        "/api/v1/forums/forum-b/topics/wandering"
    );

    let moved = app.topic(topic.id).await.unwrap();
    assert_eq!(moved.forum_id, b.id);
    assert_eq!(moved.status(), TopicStatus::Locked);

    // Both forums were saved: the old one lost the topic, the new one gained it.
    let a = app.forum(a.id).await;
    assert_eq!(a.topics_count, 1);
    assert_eq!(a.posts_count, 2);
    let b = app.forum(b.id).await;
    assert_eq!(b.topics_count, 1);
    assert_eq!(b.posts_count, 3);
}

#[tokio::test]
async fn move_topic_without_lock_marks_moved() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": b.id }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 303);
    let moved = app.topic(topic.id).await.unwrap();
    assert_eq!(moved.forum_id, b.id);
    assert_eq!(moved.status(), TopicStatus::Moved);
    assert_eq!(app.forum(a.id).await.topics_count, 0);

    // The flash message survives the redirect.
    let cookie = common::flash_cookie(&resp);
    let body: Value = app
        .client
        .get(app.url("/messages"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body["data"][0]["message"],
        "This topic has been moved successfully."
    );
}

#[tokio::test]
async fn move_form_lists_eligible_forums() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    common::create_forum_of_kind(&app, "section", KIND_CATEGORY).await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let resp = app
        .client
        .get(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["forum"]["id"], a.id);
    let choices: Vec<i64> = body["data"]["forum_choices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect();
    assert_eq!(choices, vec![b.id as i64]);
}

#[tokio::test]
async fn move_to_same_forum_is_rejected() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": a.id, "lock_topic": false }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let unchanged = app.topic(topic.id).await.unwrap();
    assert_eq!(unchanged.status(), TopicStatus::Normal);
}

#[tokio::test]
async fn move_to_category_or_missing_forum_is_rejected() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let section = common::create_forum_of_kind(&app, "section", KIND_CATEGORY).await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    for forum_id in [section.id, 9999] {
        let resp = app
            .client
            .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "forum_id": forum_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    assert_eq!(app.topic(topic.id).await.unwrap().forum_id, a.id);
}

#[tokio::test]
async fn move_rejects_slug_collision() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    let topic = common::create_topic(&app, &a, "faq", 1).await;
    common::create_topic(&app, &b, "faq", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": b.id }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(app.topic(topic.id).await.unwrap().forum_id, a.id);
}

#[tokio::test]
async fn moderator_cannot_move_into_unmoderated_forum() {
    let app = common::spawn_app().await;
    let (moderator, token) = common::create_user(&app, "mod", "user").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    common::make_moderator(&app, &a, &moderator).await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": b.id }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(app.topic(topic.id).await.unwrap().forum_id, a.id);
}

#[tokio::test]
async fn regular_user_cannot_move() {
    let app = common::spawn_app().await;
    let (_user, token) = common::create_user(&app, "alice", "user").await;
    let a = common::create_forum(&app, "forum-a").await;
    let b = common::create_forum(&app, "forum-b").await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "forum_id": b.id, "lock_topic": true }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    let unchanged = app.topic(topic.id).await.unwrap();
    assert_eq!(unchanged.forum_id, a.id);
    assert_eq!(unchanged.status(), TopicStatus::Normal);
}

#[tokio::test]
async fn moderation_requires_authentication() {
    let app = common::spawn_app().await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn banned_admin_is_forbidden() {
    let app = common::spawn_app().await;
    let (_banned, token) = common::create_user(&app, "troll", "banned").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn missing_topic_is_not_found() {
    let app = common::spawn_app().await;
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;

    for action in ["lock", "unlock", "delete", "move"] {
        let resp = app
            .client
            .get(app.url(&format!("/moderation/topics/4242/{}", action)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404, "{action}");
    }
}

/// Grants deletions only, to every user.
struct DeleteOnly;

#[async_trait]
impl ForumPermissionHandler for DeleteOnly {
    async fn can_close_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
        Ok(false)
    }

    async fn can_delete_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
        Ok(true)
    }

    async fn can_move_topics(&self, _: &ForumModel, _: &UserModel) -> AppResult<bool> {
        Ok(false)
    }
}

#[tokio::test]
async fn injected_permission_handler_decides() {
    let app = common::spawn_app_with_permissions(Arc::new(DeleteOnly)).await;
    // Even an admin is refused when the handler says no.
    let (_admin, token) = common::create_user(&app, "admin", "admin").await;
    let (_user, user_token) = common::create_user(&app, "alice", "user").await;
    let forum = common::create_forum(&app, "general").await;
    let topic = common::create_topic(&app, &forum, "hello-world", 1).await;

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/lock", topic.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert!(!app.topic(topic.id).await.unwrap().is_locked());

    let resp = app
        .client
        .post(app.url(&format!("/moderation/topics/{}/delete", topic.id)))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert!(app.topic(topic.id).await.is_none());
}

#[tokio::test]
async fn malformed_move_body_is_rejected_after_permission_check() {
    let app = common::spawn_app().await;
    let (_admin, admin_token) = common::create_user(&app, "admin", "admin").await;
    let (_user, user_token) = common::create_user(&app, "alice", "user").await;
    let a = common::create_forum(&app, "forum-a").await;
    let topic = common::create_topic(&app, &a, "wandering", 1).await;

    let send = |token: String| {
        app.client
            .post(app.url(&format!("/moderation/topics/{}/move", topic.id)))
            .bearer_auth(token)
            .json(&serde_json::json!({ "lock_topic": true }))
            .send()
    };

    assert_eq!(send(user_token).await.unwrap().status(), 403);
    assert_eq!(send(admin_token).await.unwrap().status(), 400);
    assert_eq!(app.topic(topic.id).await.unwrap().forum_id, a.id);
}
