use axum::extract::State;
use axum::http::StatusCode;
use masque_core::id::{AnonymousPostId, PersonaId};
use masque_feed::view::AnonymousPostView;
use serde::Deserialize;

use super::posts::PostInput;
use super::{AppJson, AppPath, AppQuery, Caller};
use crate::SharedState;
use crate::error::RequestResult;

#[derive(Deserialize)]
pub struct AnonymousPostsQuery {
    author_id: Option<PersonaId>,
}

/// The whole anonymous pool, or one persona's posts in it
///
/// Readable without being logged in.
pub async fn get_anonymous_posts(
    State(state): State<SharedState>,
    AppQuery(query): AppQuery<AnonymousPostsQuery>,
) -> RequestResult<AppJson<Vec<AnonymousPostView>>> {
    Ok(AppJson(
        state.social().anonymous_posts(query.author_id).await?,
    ))
}

pub async fn post_anonymous_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppJson(input): AppJson<PostInput>,
) -> RequestResult<(StatusCode, AppJson<AnonymousPostView>)> {
    let post = state
        .social()
        .create_anonymous_post(&caller, &input.content)
        .await?;
    Ok((StatusCode::CREATED, AppJson(post)))
}

pub async fn patch_anonymous_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(post_id): AppPath<AnonymousPostId>,
    AppJson(input): AppJson<PostInput>,
) -> RequestResult<AppJson<AnonymousPostView>> {
    Ok(AppJson(
        state
            .social()
            .update_anonymous_post(&caller, post_id, &input.content)
            .await?,
    ))
}

pub async fn delete_anonymous_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(post_id): AppPath<AnonymousPostId>,
) -> RequestResult<StatusCode> {
    state.social().delete_anonymous_post(&caller, post_id).await?;
    Ok(StatusCode::OK)
}
