use axum::extract::State;
use axum::http::StatusCode;
use masque_feed::view::FollowView;
use serde::Deserialize;

use super::{AppJson, AppPath, Caller};
use crate::SharedState;
use crate::error::RequestResult;

#[derive(Deserialize)]
pub struct FollowInput {
    username: String,
}

pub async fn post_follow(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppJson(input): AppJson<FollowInput>,
) -> RequestResult<(StatusCode, AppJson<FollowView>)> {
    let edge = state.social().follow(&caller, &input.username).await?;
    Ok((StatusCode::CREATED, AppJson(edge)))
}

pub async fn delete_follow(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(username): AppPath<String>,
) -> RequestResult<StatusCode> {
    state.social().unfollow(&caller, &username).await?;
    Ok(StatusCode::OK)
}

pub async fn get_following(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<AppJson<Vec<FollowView>>> {
    Ok(AppJson(state.social().following(&caller).await?))
}

pub async fn get_followers(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<AppJson<Vec<FollowView>>> {
    Ok(AppJson(state.social().followers(&caller).await?))
}
