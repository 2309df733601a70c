use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use smartmess_db::Database;
use smartmess_db::models::{AdminRow, StudentRow};
use smartmess_db::queries::accounts::NewStudent;
use smartmess_types::api::{AdminSummary, Claims, LoginRequest, RegisterRequest, StudentSummary};
use smartmess_types::models::PrincipalKind;

use crate::error::{ApiError, with_db};
use crate::middleware::CurrentUser;
use crate::response::ok_message;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

const TOKEN_TTL_DAYS: i64 = 7;
const MIN_PASSWORD_LEN: usize = 8;

/// Registration is approval-gated: the account is created unverified and no
/// token is issued. Login stays blocked with a `pending_approval` code until
/// an admin verifies the student.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = create_student_account(&state, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful. Your account is awaiting admin approval.",
            "data": summary,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email and password.".into(),
        ));
    }

    let email = req.email.trim().to_string();
    let student = with_db(&state, move |db| Ok(db.student_by_email(&email)?))
        .await?
        .ok_or(ApiError::Unauthenticated("Invalid email or password."))?;

    if !verify_password(req.password, student.password.clone()).await? {
        return Err(ApiError::Unauthenticated("Invalid email or password."));
    }

    // Credentials are correct; now apply the admin gates.
    if !student.is_verified {
        return Err(ApiError::PendingApproval);
    }
    if !student.is_active {
        return Err(ApiError::AccountDisabled);
    }

    let id: Uuid = student
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt student id '{}': {e}", student.id)))?;
    let (token, expires_at) =
        create_token(&state.jwt_secret, id, PrincipalKind::Student, &student.email)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "expires_at": expires_at,
        "user": student_summary(&student),
    })))
}

pub async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email and password.".into(),
        ));
    }

    let email = req.email.trim().to_string();
    let admin = with_db(&state, move |db| Ok(db.admin_by_email(&email)?))
        .await?
        .ok_or(ApiError::Unauthenticated("Invalid admin credentials."))?;

    if !verify_password(req.password, admin.password.clone()).await? {
        return Err(ApiError::Unauthenticated("Invalid admin credentials."));
    }

    let id: Uuid = admin
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt admin id '{}': {e}", admin.id)))?;
    let (token, expires_at) =
        create_token(&state.jwt_secret, id, PrincipalKind::Admin, &admin.email)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "expires_at": expires_at,
        "user": admin_summary(&admin),
    })))
}

/// Current principal, re-fetched by the auth middleware on every request.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let id = user.id.to_string();
    let body = match user.kind {
        PrincipalKind::Student => {
            let student = with_db(&state, move |db| Ok(db.student_by_id(&id)?))
                .await?
                .ok_or(ApiError::Unauthenticated("Account no longer exists."))?;
            json!({ "success": true, "user": student_summary(&student) })
        }
        PrincipalKind::Admin => {
            let admin = with_db(&state, move |db| Ok(db.admin_by_id(&id)?))
                .await?
                .ok_or(ApiError::Unauthenticated("Account no longer exists."))?;
            json!({ "success": true, "user": admin_summary(&admin) })
        }
    };
    Ok(Json(body))
}

/// Tokens are stateless; logout is a client-side discard. The endpoint
/// exists so the client gets an acknowledgement.
pub async fn logout() -> impl IntoResponse {
    ok_message("Logged out successfully")
}

/// Shared by self-registration and the admin "add student" operation.
/// Duplicate email/roll resolves inside SQLite: the insert either lands or
/// reports a UNIQUE violation — no read-before-write.
pub(crate) async fn create_student_account(
    state: &AppState,
    req: RegisterRequest,
) -> Result<StudentSummary, ApiError> {
    validate_registration(&req)?;

    let password_hash = hash_password(req.password.clone()).await?;
    let id = Uuid::new_v4().to_string();

    with_db(state, move |db| {
        let new = NewStudent {
            id: &id,
            name: req.name.trim(),
            email: req.email.trim(),
            roll_number: req.roll_number.trim(),
            password_hash: &password_hash,
            hostel_name: req.hostel_name.trim(),
            room_number: req.room_number.trim(),
            phone_number: req.phone_number.trim(),
        };
        if let Err(e) = db.create_student(&new) {
            if smartmess_db::is_unique_violation(&e) {
                return Err(ApiError::Conflict(
                    "A student with this email or roll number already exists.".into(),
                ));
            }
            return Err(e.into());
        }
        info!("Registered student {} ({})", new.roll_number, id);
        let row = db
            .student_by_id(&id)?
            .ok_or_else(|| anyhow!("student missing immediately after insert"))?;
        Ok(student_summary(&row))
    })
    .await
}

fn validate_registration(req: &RegisterRequest) -> Result<(), ApiError> {
    let required = [
        &req.name,
        &req.email,
        &req.roll_number,
        &req.hostel_name,
        &req.room_number,
        &req.phone_number,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::Validation("All fields are required.".into()));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("Invalid email address.".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

pub(crate) fn student_summary(row: &StudentRow) -> StudentSummary {
    StudentSummary {
        id: row.id.clone(),
        name: row.name.clone(),
        email: row.email.clone(),
        roll_number: row.roll_number.clone(),
        hostel_name: row.hostel_name.clone(),
        room_number: row.room_number.clone(),
        phone_number: row.phone_number.clone(),
        is_verified: row.is_verified,
        is_active: row.is_active,
        created_at: row.created_at.clone(),
    }
}

fn admin_summary(row: &AdminRow) -> AdminSummary {
    AdminSummary {
        id: row.id.clone(),
        name: row.name.clone(),
        email: row.email.clone(),
        role: row.role.clone(),
    }
}

/// Argon2id with a fresh random salt. Hashing is deliberately expensive, so
/// it runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("task join error: {e}")))?
}

async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| ApiError::Internal(anyhow!("stored password hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("task join error: {e}")))?
}

/// Issue a signed token. The expiry is returned explicitly so clients can
/// track it without decoding the token.
pub fn create_token(
    secret: &str,
    principal_id: Uuid,
    kind: PrincipalKind,
    email: &str,
) -> Result<(String, DateTime<Utc>), ApiError> {
    let expires_at = Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS);
    let claims = Claims {
        sub: principal_id,
        email: email.to_string(),
        kind,
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow!("token signing failed: {e}")))?;

    Ok((token, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn token_round_trips_with_a_seven_day_expiry() {
        let id = Uuid::new_v4();
        let (token, expires_at) =
            create_token("test-secret", id, PrincipalKind::Student, "a@campus.edu").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, id);
        assert_eq!(data.claims.email, "a@campus.edu");
        assert_eq!(data.claims.kind, PrincipalKind::Student);
        assert_eq!(data.claims.exp as i64, expires_at.timestamp());

        let days = (expires_at - Utc::now()).num_days();
        assert!((6..=7).contains(&days));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let (token, _) = create_token(
            "right-secret",
            Uuid::new_v4(),
            PrincipalKind::Admin,
            "admin@campus.edu",
        )
        .unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"wrong-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn login_is_gated_on_verification_and_active_flags() {
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
        });

        let id = Uuid::new_v4().to_string();
        let hash = hash_password("correct-horse".into()).await.unwrap();
        state
            .db
            .create_student(&NewStudent {
                id: &id,
                name: "Asha Rao",
                email: "asha@campus.edu",
                roll_number: "21CS001",
                password_hash: &hash,
                hostel_name: "North Block",
                room_number: "214",
                phone_number: "9876543210",
            })
            .unwrap();

        let attempt = |password: &str| LoginRequest {
            email: "asha@campus.edu".into(),
            password: password.into(),
        };

        let err = login(State(state.clone()), Json(attempt("wrong")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Unauthenticated(_)));

        // Correct password, but the account is not verified yet.
        let err = login(State(state.clone()), Json(attempt("correct-horse")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::PendingApproval));

        state.db.verify_student(&id).unwrap();
        let response = login(State(state.clone()), Json(attempt("correct-horse")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        state.db.toggle_student_active(&id).unwrap();
        let err = login(State(state.clone()), Json(attempt("correct-horse")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::AccountDisabled));
    }

    #[test]
    fn registration_validation_rejects_bad_input() {
        let valid = RegisterRequest {
            name: "Asha Rao".into(),
            email: "asha@campus.edu".into(),
            password: "long-enough".into(),
            roll_number: "21CS001".into(),
            hostel_name: "North Block".into(),
            room_number: "214".into(),
            phone_number: "9876543210".into(),
        };
        assert!(validate_registration(&valid).is_ok());

        let mut no_email = valid;
        no_email.email = "  ".into();
        assert!(matches!(
            validate_registration(&no_email),
            Err(ApiError::Validation(_))
        ));

        no_email.email = "not-an-email".into();
        assert!(validate_registration(&no_email).is_err());

        no_email.email = "asha@campus.edu".into();
        no_email.password = "short".into();
        assert!(validate_registration(&no_email).is_err());
    }
}
