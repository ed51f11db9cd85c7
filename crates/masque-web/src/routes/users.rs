use axum::extract::State;
use axum::http::StatusCode;
use masque_feed::view::{ModeView, PersonaView, UserView};
use serde::Deserialize;

use super::{AppJson, Caller};
use crate::SharedState;
use crate::error::RequestResult;

#[derive(Deserialize)]
pub struct RegisterUserInput {
    username: String,
}

pub async fn post_user(
    State(state): State<SharedState>,
    AppJson(input): AppJson<RegisterUserInput>,
) -> RequestResult<(StatusCode, AppJson<UserView>)> {
    let user = state.social().register_user(&input.username).await?;
    Ok((StatusCode::CREATED, AppJson(user)))
}

pub async fn delete_self(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<StatusCode> {
    state.social().delete_self(&caller).await?;
    Ok(StatusCode::OK)
}

/// Persona of the caller, visible to the caller only
pub async fn get_persona(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<AppJson<PersonaView>> {
    Ok(AppJson(state.social().persona(&caller).await?))
}

pub async fn get_mode(
    State(state): State<SharedState>,
    Caller(caller): Caller,
) -> RequestResult<AppJson<ModeView>> {
    Ok(AppJson(state.social().mode(&caller).await?))
}

#[derive(Deserialize)]
pub struct SetModeInput {
    is_anonymous: bool,
}

pub async fn patch_mode(
    State(state): State<SharedState>,
    Caller(caller): Caller,
    AppJson(input): AppJson<SetModeInput>,
) -> RequestResult<AppJson<ModeView>> {
    Ok(AppJson(
        state
            .social()
            .set_mode(&caller, input.is_anonymous)
            .await?,
    ))
}
