use std::sync::Arc;

use uuid::Uuid;

use crate::{
    auth::AuthService,
    domain::{LoginRequest, NewUser, RegisterRequest, Role, UpdateUserRequest, User, UserPatch},
    error::{AppError, Result},
    repository::UserRepository,
};

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, auth: Arc<AuthService>) -> Self {
        Self { repo, auth }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        if self.repo.find_by_email(&request.email).await?.is_some() {
            tracing::warn!(
                "Registration attempted with existing email: {}",
                request.email
            );
            return Err(AppError::Conflict(format!(
                "User with email \"{}\" already exists",
                request.email
            )));
        }

        let password_hash = self.auth.hash_password(&request.password)?;
        let user = self
            .repo
            .create(NewUser {
                email: request.email,
                password_hash,
                roles: vec![Role::User],
            })
            .await?;

        tracing::info!("User registered: {} ({})", user.email, user.id);
        Ok(user)
    }

    // Unknown email and wrong password produce the same response, so
    // login failures do not reveal which accounts exist.
    pub async fn login(&self, request: LoginRequest) -> Result<(User, String)> {
        let user = match self.repo.find_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("Login attempt for unknown email: {}", request.email);
                return Err(AppError::Unauthorized);
            }
        };

        if !self
            .auth
            .verify_password(&request.password, &user.password_hash)?
        {
            tracing::warn!("Failed login attempt for {}", request.email);
            return Err(AppError::Unauthorized);
        }

        let token = self.auth.issue_token(&user)?;
        tracing::info!("User logged in: {}", user.email);
        Ok((user, token))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        self.repo.list(limit, offset).await
    }

    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> Result<User> {
        if let Some(email) = &request.email {
            if let Some(existing) = self.repo.find_by_email(email).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "User with email \"{}\" already exists",
                        email
                    )));
                }
            }
        }

        let password_hash = request
            .password
            .as_deref()
            .map(|password| self.auth.hash_password(password))
            .transpose()?;

        let user = self
            .repo
            .update(
                id,
                UserPatch {
                    email: request.email,
                    password_hash,
                    roles: request.roles,
                },
            )
            .await?;

        tracing::info!("User updated: {}", user.id);
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.repo.delete(id).await?;
        tracing::info!("User deleted: {}", id);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        self.repo.count().await
    }
}
