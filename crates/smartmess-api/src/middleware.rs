use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use smartmess_types::api::Claims;
use smartmess_types::models::PrincipalKind;

use crate::auth::AppState;
use crate::error::{ApiError, with_db};

/// The authenticated principal, attached as a request extension once the
/// bearer token checks out and the account still exists.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub kind: PrincipalKind,
}

/// Validates the `Authorization: Bearer <token>` header and re-fetches the
/// principal. A deleted or deactivated account is rejected even while its
/// token is still within its validity window.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request)
        .ok_or(ApiError::Unauthenticated("Missing authentication token."))?
        .to_string();

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated("Invalid or expired token."))?;

    let claims = data.claims;
    let id = claims.sub.to_string();

    let user = match claims.kind {
        PrincipalKind::Student => {
            let student = with_db(&state, move |db| Ok(db.student_by_id(&id)?))
                .await?
                .ok_or(ApiError::Unauthenticated("Account no longer exists."))?;
            if !student.is_verified {
                return Err(ApiError::PendingApproval);
            }
            if !student.is_active {
                return Err(ApiError::AccountDisabled);
            }
            CurrentUser {
                id: claims.sub,
                name: student.name,
                email: student.email,
                kind: PrincipalKind::Student,
            }
        }
        PrincipalKind::Admin => {
            let admin = with_db(&state, move |db| Ok(db.admin_by_id(&id)?))
                .await?
                .ok_or(ApiError::Unauthenticated("Account no longer exists."))?;
            CurrentUser {
                id: claims.sub,
                name: admin.name,
                email: admin.email,
                kind: PrincipalKind::Admin,
            }
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Layered inside `require_auth`; only gates on the already-verified kind.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(ApiError::Unauthenticated("Missing authentication token."))?;

    if user.kind != PrincipalKind::Admin {
        return Err(ApiError::Forbidden("Admin access required."));
    }

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header("authorization", value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn bearer_token_extracts_the_token() {
        let req = request_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_empty_values() {
        assert_eq!(bearer_token(&request_with_auth("Basic abc")), None);
        assert_eq!(bearer_token(&request_with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&request_with_auth("abc.def.ghi")), None);

        let no_header = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&no_header), None);
    }
}
