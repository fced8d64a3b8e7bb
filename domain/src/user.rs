//! Accounts: sign-up, the logged-in user's profile and password changes.

use log::*;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use portal_auth::{
    api::Client,
    capability::Action,
    error::{api_error, ApiErrorKind, Error},
    session::Role,
    storage::KeyValueStore,
};

const MIN_PASSWORD_LEN: usize = 6;

/// A new account request.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email_id: String,
    pub password: SecretString,
    pub role: Role,
    pub phone: String,
    pub address: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

impl SignUp {
    pub fn validate(&self) -> Result<(), Error> {
        if !self.email_id.contains('@') {
            return Err(validation("A valid email address is required"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(validation("Password is required"));
        }
        if self.phone.trim().is_empty() || self.address.trim().is_empty() {
            return Err(validation("Phone and address are required"));
        }
        Ok(())
    }
}

/// The logged-in user's profile as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email_id: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Fields a user may change on their own profile. The email is the account key
/// and cannot change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub phone: String,
    pub address: String,
}

/// A password change as entered: the current password, the new one, and the
/// new one typed again.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordChange {
    /// Checks the change locally; nothing is sent when this fails.
    pub fn validate(&self) -> Result<(), Error> {
        let old = self.old_password.expose_secret();
        let new = self.new_password.expose_secret();

        if new != self.confirm_password.expose_secret() {
            return Err(validation("New passwords do not match"));
        }
        if old == new {
            return Err(validation(
                "New password must be different from old password",
            ));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(validation("Password must be at least 6 characters"));
        }
        let has_lower = new.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = new.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = new.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) {
            return Err(validation(
                "Password must contain uppercase, lowercase, and numbers",
            ));
        }
        Ok(())
    }
}

/// Create an account. Does not log in.
pub async fn sign_up<S: KeyValueStore>(client: &Client<S>, form: &SignUp) -> Result<(), Error> {
    form.validate()?;

    let mut body = json!({
        "emailId": form.email_id,
        "password": form.password.expose_secret(),
        "role": form.role,
        "phone": form.phone,
        "address": form.address,
    });
    for (key, value) in [("name", &form.name), ("city", &form.city)] {
        if let Some(value) = value {
            body[key] = json!(value);
        }
    }

    client
        .execute(Action::SignUp, Method::POST, "/user/register", Some(&body))
        .await?;
    info!("Signed up {} as {}", form.email_id, form.role);
    Ok(())
}

pub async fn profile<S: KeyValueStore>(client: &Client<S>) -> Result<Profile, Error> {
    let email_id = session_identity(client);
    client
        .send(
            Action::ViewProfile,
            Method::GET,
            &format!("/user/profile?emailId={}", urlencoding::encode(&email_id)),
            None,
        )
        .await
}

pub async fn update_profile<S: KeyValueStore>(
    client: &Client<S>,
    update: &ProfileUpdate,
) -> Result<(), Error> {
    let body = json!({
        "emailId": session_identity(client),
        "phone": update.phone,
        "address": update.address,
    });
    client
        .execute(Action::UpdateProfile, Method::PUT, "/user/update", Some(&body))
        .await
}

/// Change the logged-in user's password.
///
/// The server invalidates existing sessions on success, so callers log out
/// afterwards.
pub async fn change_password<S: KeyValueStore>(
    client: &Client<S>,
    change: &PasswordChange,
) -> Result<(), Error> {
    change.validate()?;

    let body = json!({
        "emailId": session_identity(client),
        "oldPassword": change.old_password.expose_secret(),
        "newPassword": change.new_password.expose_secret(),
    });
    client
        .execute(
            Action::ChangePassword,
            Method::POST,
            "/user/reset-password",
            Some(&body),
        )
        .await?;
    info!("Password changed");
    Ok(())
}

// Without a session the client refuses the request before the identity is used.
fn session_identity<S: KeyValueStore>(client: &Client<S>) -> String {
    client
        .session()
        .map(|session| session.identity)
        .unwrap_or_default()
}

fn validation(message: &str) -> Error {
    api_error(ApiErrorKind::Validation, message)
}
