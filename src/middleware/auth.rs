use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::AppResult;
use crate::utils::jwt::verify_token;
use crate::AppState;

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(
        auth.token(),
        &state.config.jwt_secret,
        state.config.jwt_audience.as_deref(),
    )?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
