//! Users API Example
//!
//! A small domain client built on the tongs `Api`: shared base URL, default
//! handlers for the statuses every endpoint shares, JSON in and out.
//!
//! Run against a server: `cargo run -p users-api-demo -- http://localhost:8080`

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::fmt;
use std::sync::Arc;

use derive_more::{Display, Error};
use tongs::prelude::*;

// ============================================================================
// Data Types
// ============================================================================

/// Identifier of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// Failures shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum UsersError {
    #[display("user not found")]
    NotFound,
    #[display("unauthorized")]
    Unauthorized,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct CreateUserRequest {
    user_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct CreateUserResponse {
    user_id: u64,
}

#[derive(Debug, Default, Deserialize)]
struct GetUserResponse {
    id: u64,
    name: String,
}

impl From<GetUserResponse> for User {
    fn from(response: GetUserResponse) -> Self {
        Self {
            id: UserId(response.id),
            name: response.name,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Client of the users API.
#[derive(Debug, Clone)]
pub struct UsersClient {
    api: Api,
}

impl UsersClient {
    pub fn new(doer: Arc<dyn Doer>, server_url: &str) -> Result<Self> {
        let api = Api::parse(doer, server_url)?
            .with_response_handler(401, |_| Err(Error::custom(UsersError::Unauthorized)))
            .with_response_handler(404, |_| Err(Error::custom(UsersError::NotFound)))
            .with_response_handler(200, |_| Ok(()));

        Ok(Self { api })
    }

    pub fn create_user(&self, user_name: &str) -> Result<UserId> {
        let mut response = CreateUserResponse::default();

        self.api
            .execute(self.api.post("/users").send_json(CreateUserRequest {
                user_name: user_name.to_string(),
            }))
            .receive_json(200, &mut response)
            .resolve()?;

        Ok(UserId(response.user_id))
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        let mut response = GetUserResponse::default();

        self.api
            .execute(
                self.api
                    .get("/users/{userID}")
                    .path_replacer("{userID}", &id.to_string()),
            )
            .receive_json(200, &mut response)
            .resolve()?;

        Ok(response.into())
    }

    pub fn delete_user(&self, id: UserId) -> Result<()> {
        self.api.resolve(
            self.api
                .delete("/users/{userID}")
                .path_replacer("{userID}", &id.to_string()),
        )
    }
}

// ============================================================================
// Main: Demonstrate usage
// ============================================================================

fn main() -> Result<()> {
    let server_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let doer = HyperDoer::builder()
        .user_agent("users-api-demo/0.1.0")
        .build()?
        .with_logging();
    let client = UsersClient::new(Arc::new(doer), &server_url)?;

    let id = client.create_user("john.doe")?;
    println!("Created user {id}");

    let user = client.get_user(id)?;
    println!("Fetched user {}: {}", user.id, user.name);

    client.delete_user(id)?;
    println!("Deleted user {id}");

    match client.get_user(id) {
        Err(err) if err.is::<UsersError>() => println!("User {id} is gone: {err}"),
        Err(err) => return Err(err),
        Ok(user) => println!("User {id} still exists: {user:?}"),
    }

    Ok(())
}

// ============================================================================
// Tests using the tongs-test server and stubs
// ============================================================================
