use axum::extract::State;
use masque_feed::Feed;
use masque_feed::view::PublicPostView;

use super::{AppJson, AppPath, Caller};
use crate::SharedState;
use crate::error::RequestResult;

/// Feed of the caller, in the caller's current mode
pub async fn get_feed(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<AppJson<Feed>> {
    Ok(AppJson(state.social().feed(&caller).await?))
}

/// Public posts of a single author, regardless of the caller's mode
pub async fn get_author_feed(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppPath(username): AppPath<String>,
) -> RequestResult<AppJson<Vec<PublicPostView>>> {
    Ok(AppJson(
        state.social().author_feed(&caller, &username).await?,
    ))
}
