mod anonymous_posts;
mod feed;
mod follows;
mod posts;
mod users;

use std::str::FromStr as _;

use axum::Router;
use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use masque_core::id::PublicUserId;
use masque_db::PublicUser;
use snafu::OptionExt as _;

use crate::SharedState;
use crate::error::{ErrorResponse, NotLoggedInSnafu, RequestError};

/// Header carrying the id of the calling public user
///
/// Stands in for a session layer: whoever sets it is trusted to be that user.
pub const CALLER_HEADER: &str = "x-masque-user";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RequestError))]
pub struct AppJson<T>(pub T);

impl<T> IntoResponse for AppJson<T>
where
    axum::Json<T>: IntoResponse,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RequestError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RequestError))]
pub struct AppQuery<T>(pub T);

/// The public user making the request
///
/// Rejects requests without a valid [`CALLER_HEADER`], or naming a user that
/// does not exist.
pub struct Caller(pub PublicUser);

impl FromRequestParts<SharedState> for Caller {
    type Rejection = RequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| PublicUserId::from_str(value.trim()).ok())
            .context(NotLoggedInSnafu)?;

        Ok(Caller(state.social().caller(user_id).await?))
    }
}

pub async fn not_found(_req: Request<Body>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        AppJson(ErrorResponse {
            error: "Not Found".to_string(),
        }),
    )
}

pub fn route_handler(state: SharedState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .fallback(not_found)
        .with_state(state)
}

fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(users::post_user))
        .route("/users/self", delete(users::delete_self))
        .route("/persona", get(users::get_persona))
        .route("/mode", get(users::get_mode).patch(users::patch_mode))
        .route("/follows", post(follows::post_follow))
        .route("/follows/following", get(follows::get_following))
        .route("/follows/followers", get(follows::get_followers))
        .route("/follows/{username}", delete(follows::delete_follow))
        .route("/feed", get(feed::get_feed))
        .route("/feed/{username}", get(feed::get_author_feed))
        .route("/posts", post(posts::post_post))
        .route(
            "/posts/{id}",
            patch(posts::patch_post).delete(posts::delete_post),
        )
        .route(
            "/anonymous-posts",
            get(anonymous_posts::get_anonymous_posts).post(anonymous_posts::post_anonymous_post),
        )
        .route(
            "/anonymous-posts/{id}",
            patch(anonymous_posts::patch_anonymous_post)
                .delete(anonymous_posts::delete_anonymous_post),
        )
}
