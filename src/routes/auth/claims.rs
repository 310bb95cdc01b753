use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Identity, UserRole};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub jti: String,
    pub token_use: TokenUse,
}

impl Claims {
    pub fn new(identity: &Identity, token_use: TokenUse, iat: i64, exp: i64) -> Self {
        Self {
            sub: identity.subject_id,
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            role: identity.role,
            exp: exp.max(0) as usize,
            iat: iat.max(0) as usize,
            iss: String::new(),
            aud: String::new(),
            jti: Uuid::new_v4().to_string(),
            token_use,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.sub,
            email: self.email.clone(),
            display_name: self.name.clone(),
            role: self.role,
        }
    }
}
