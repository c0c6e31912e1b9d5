use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;

use common::{authed, json_body};

#[tokio::test]
async fn test_health_root() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_live_and_info() {
    let app = common::create_test_app().await;

    for uri in ["/health/live", "/health/info"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_unauthorized_without_token() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/api/progress").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_forged_token_is_rejected() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/progress")
                .header(header::AUTHORIZATION, "Bearer a.b.c")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_token_is_accepted() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/progress")
                .header(header::COOKIE, format!("auth_token={}", common::token_for("cookie-user")))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["userId"], "cookie-user");
    assert_eq!(body["data"]["dailyGoal"], 20);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_integrated_progress_for_new_user() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(authed(Method::GET, "/api/progress/integrated", "newbie", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["dailyGoal"], 20);
    assert_eq!(data["level"], 1);
    assert_eq!(data["xp"], 0);
    assert_eq!(data["streak"], 0);
    assert_eq!(data["wordsLearnedToday"], 0);
    assert_eq!(data["habitsCompletedThisWeek"], 0);
}

#[tokio::test]
async fn test_daily_goal_validation() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::PUT, "/api/progress/daily-goal", "u1", Some(json!({ "dailyGoal": 0 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed(Method::PUT, "/api/progress/daily-goal", "u1", Some(json!({ "dailyGoal": 40 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["data"]["dailyGoal"], 40);
}

#[tokio::test]
async fn test_mission_completion_flow() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/missions", "u1", None))
        .await
        .unwrap();
    let missions = json_body(response).await["data"]["missions"].clone();
    assert_eq!(missions.as_array().unwrap().len(), 5);

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/missions/daily_quiz/complete", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["mission"]["completed"], true);
    assert_eq!(data["xpEarned"], 30);

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/missions/daily_quiz/complete", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(authed(Method::POST, "/api/missions/unknown/complete", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quick_pomodoro_session_updates_progress() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/quick/pomodoro-session", "u1", Some(json!({ "minutes": 25 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["xpEarned"], 50);
    assert_eq!(body["data"]["completedMission"]["type"], "pomodoro");

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/progress", "u1", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["xp"], 50);

    let response = app
        .oneshot(authed(Method::GET, "/api/achievements", "u1", None))
        .await
        .unwrap();
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["totalCount"], 24);
    assert_eq!(data["unlockedCount"], 1);
}

#[tokio::test]
async fn test_quick_session_rejects_negative_input() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(authed(
            Method::POST,
            "/api/quick/flashcard-session",
            "u1",
            Some(json!({ "wordsLearned": -3, "minutes": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quick_session_rejects_oversized_input() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/quick/flashcard-session",
            "u1",
            Some(json!({ "wordsLearned": 1001, "minutes": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "VALIDATION_ERROR");

    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/quick/flashcard-session",
            "u1",
            Some(json!({ "wordsLearned": i64::MAX / 2, "minutes": 5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/quick/pomodoro-session", "u1", Some(json!({ "minutes": 1441 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(authed(Method::GET, "/api/progress", "u1", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["xp"], 0);
}

#[tokio::test]
async fn test_habit_lifecycle() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/habits", "u1", None))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["status"], "empty");

    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/habits",
            "u1",
            Some(json!({ "title": "Đọc 1 trang sách", "icon": "📖" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let habit_id = json_body(response).await["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(Method::POST, &format!("/api/habits/{habit_id}/toggle"), "u1", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["xpEarned"], 25);

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/habits", "u1", None))
        .await
        .unwrap();
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["status"], "ready");
    assert_eq!(data["data"][0]["todayCompleted"], true);
    assert_eq!(data["data"][0]["currentStreak"], 1);

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/habits/weekly", "u1", None))
        .await
        .unwrap();
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["days"].as_array().unwrap().len(), 7);
    assert_eq!(data["total"], 1);

    let response = app
        .clone()
        .oneshot(authed(Method::DELETE, &format!("/api/habits/{habit_id}"), "other-user", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(authed(Method::DELETE, &format!("/api/habits/{habit_id}"), "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_deck_crud_keeps_counts() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(
            Method::POST,
            "/api/decks",
            "u1",
            Some(json!({
                "title": "Du lịch",
                "cards": [
                    { "front": "ticket", "back": "vé" },
                    { "front": "airport", "back": "sân bay", "example": "The airport is busy." }
                ]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let deck = json_body(response).await["data"].clone();
    assert_eq!(deck["total"], 2);
    assert_eq!(deck["learned"], 0);
    let deck_id = deck["id"].as_str().unwrap().to_string();
    let card_id = deck["cards"][0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            &format!("/api/decks/{deck_id}/cards/{card_id}/learned"),
            "u1",
            Some(json!({ "learned": true })),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["data"]["learned"], 1);

    let response = app
        .clone()
        .oneshot(authed(Method::DELETE, &format!("/api/decks/{deck_id}/cards/{card_id}"), "u1", None))
        .await
        .unwrap();
    let deck = json_body(response).await["data"].clone();
    assert_eq!(deck["total"], 1);
    assert_eq!(deck["learned"], 0);

    let response = app
        .oneshot(authed(Method::GET, &format!("/api/decks/{deck_id}"), "someone-else", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ai_routes_without_llm_key_are_unavailable() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/decks/generate", "u1", Some(json!({ "topic": "Màu sắc" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(authed(Method::POST, "/api/chat", "u1", Some(json!({ "message": "Hello?" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_preferences_round_trip() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(
            Method::PUT,
            "/api/preferences",
            "u1",
            Some(json!({ "hasSeenOnboarding": true, "theme": "dark" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed(Method::GET, "/api/preferences", "u1", None))
        .await
        .unwrap();
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["hasSeenOnboarding"], true);
    assert_eq!(data["theme"], "dark");

    let response = app
        .oneshot(authed(Method::PUT, "/api/preferences", "u1", Some(json!({ "fontScale": 9.0 }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_bundles_progress_and_missions() {
    let app = common::create_test_app().await;

    let response = app
        .oneshot(authed(Method::GET, "/api/dashboard", "u1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data["progress"]["level"], 1);
    assert_eq!(data["missions"]["missions"].as_array().unwrap().len(), 5);
    assert_eq!(data["weeklyReset"], false);
}

#[tokio::test]
async fn test_pomodoro_timer_commands() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/pomodoro/start", "u1", None))
        .await
        .unwrap();
    let timer = json_body(response).await["data"]["timer"].clone();
    assert_eq!(timer["status"], "running");
    assert_eq!(timer["phase"], "focus");

    let response = app
        .oneshot(authed(Method::POST, "/api/pomodoro/pause", "u1", None))
        .await
        .unwrap();
    let timer = json_body(response).await["data"]["timer"].clone();
    assert_eq!(timer["status"], "paused");
}

#[tokio::test]
async fn test_navigation_requests_are_validated() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(authed(Method::POST, "/api/events/navigate", "u1", Some(json!({ "tab": "habits" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed(Method::POST, "/api/events/navigate", "u1", Some(json!({ "tab": "admin" }))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_catalog_can_be_filtered_by_category() {
    let app = common::create_test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/achievements/catalog?category=pomodoro").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let data = json_body(response).await["data"].clone();
    assert_eq!(data.as_array().unwrap().len(), 4);
    assert_eq!(data[0]["id"], "pomodoro_1");

    let response = app
        .oneshot(Request::builder().uri("/api/achievements/catalog?category=karaoke").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
