use serde::{Deserialize, Serialize};

use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Employee id of the authenticated user
    pub user_id: u64,
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
