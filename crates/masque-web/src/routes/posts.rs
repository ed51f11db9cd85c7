use axum::extract::State;
use axum::http::StatusCode;
use masque_core::id::PublicPostId;
use masque_feed::view::PublicPostView;
use serde::Deserialize;

use super::{AppJson, AppPath, Caller};
use crate::SharedState;
use crate::error::RequestResult;

#[derive(Deserialize)]
pub struct PostInput {
    pub content: String,
}

pub async fn post_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppJson(input): AppJson<PostInput>,
) -> RequestResult<(StatusCode, AppJson<PublicPostView>)> {
    let post = state.social().create_post(&caller, &input.content).await?;
    Ok((StatusCode::CREATED, AppJson(post)))
}

pub async fn patch_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(post_id): AppPath<PublicPostId>,
    AppJson(input): AppJson<PostInput>,
) -> RequestResult<AppJson<PublicPostView>> {
    Ok(AppJson(
        state
            .social()
            .update_post(&caller, post_id, &input.content)
            .await?,
    ))
}

pub async fn delete_post(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(post_id): AppPath<PublicPostId>,
) -> RequestResult<StatusCode> {
    state.social().delete_post(&caller, post_id).await?;
    Ok(StatusCode::OK)
}
