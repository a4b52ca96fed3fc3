use actix_session::{Session, SessionExt};
use actix_web::{dev, FromRequest, HttpRequest};
use serde::Serialize;
use std::future::{ready, Ready};

use crate::errors::ApiError;
use crate::models::{Account, Role};

/// The per-request caller context. Resolved once from the session cookie
/// and threaded explicitly through every policy check; there is no
/// ambient auth state.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

fn caller_from_session(session: &Session) -> Option<Caller> {
    let id = session.get::<i64>("account_id").ok().flatten()?;
    let name = session.get::<String>("name").ok().flatten()?;
    let email = session.get::<String>("email").ok().flatten()?;
    let role = session
        .get::<String>("role")
        .ok()
        .flatten()
        .and_then(|r| Role::parse(&r))?;
    Some(Caller {
        id,
        name,
        email,
        role,
    })
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        match caller_from_session(&session) {
            Some(caller) => ready(Ok(caller)),
            None => ready(Err(ApiError::Unauthenticated(
                "Authentication required.".to_string(),
            ))),
        }
    }
}

/// Like `Caller`, but never fails: public endpoints use this to apply
/// row-level filtering when a session happens to be present.
pub struct MaybeCaller(pub Option<Caller>);

impl MaybeCaller {
    pub fn role(&self) -> Option<Role> {
        self.0.as_ref().map(|c| c.role)
    }
}

impl FromRequest for MaybeCaller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        let session = req.get_session();
        ready(Ok(MaybeCaller(caller_from_session(&session))))
    }
}

/// Writes the authenticated account into the session after login.
pub fn store_caller(session: &Session, account: &Account) -> Result<(), ApiError> {
    session
        .insert("account_id", account.id)
        .and_then(|_| session.insert("name", account.name.clone()))
        .and_then(|_| session.insert("email", account.email.clone()))
        .and_then(|_| session.insert("role", account.role.as_str()))
        .map_err(|e| {
            log::error!("Failed to write session: {}", e);
            ApiError::Database
        })
}
