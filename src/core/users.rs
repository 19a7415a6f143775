use crate::core::serializers::{AuthTokenSerializer, UserSerializer};
use crate::domain::model::{normalize_email, AuthToken, NewUser, User, UserProfile};
use crate::domain::ports::{PasswordHasher, Store};
use crate::utils::error::{AppError, FieldErrors, Result};
use crate::utils::validation::{check_required_text, check_text, is_valid_email, BLANK, REQUIRED};
use chrono::Utc;
use rand::RngCore;
use std::sync::Arc;

const EMAIL_MAX_LENGTH: usize = 255;
const NAME_MAX_LENGTH: usize = 255;
const PASSWORD_MAX_LENGTH: usize = 128;

/// 使用者帳號、密碼與 token 管理
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn PasswordHasher>,
    min_password_length: usize,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        min_password_length: usize,
    ) -> Self {
        Self {
            store,
            hasher,
            min_password_length,
        }
    }

    /// 建立並回傳一般使用者
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        profile: UserProfile,
    ) -> Result<User> {
        self.insert(email, password, profile, false).await
    }

    /// 建立並回傳超級使用者
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User> {
        self.insert(email, password, UserProfile::default(), true)
            .await
    }

    async fn insert(
        &self,
        email: &str,
        password: &str,
        profile: UserProfile,
        superuser: bool,
    ) -> Result<User> {
        if email.trim().is_empty() {
            return Err(AppError::field("email", "Users must have an email address"));
        }

        let user = self
            .store
            .insert_user(NewUser {
                email: normalize_email(email),
                password_hash: self.hasher.hash(password)?,
                first_name: profile.first_name,
                last_name: profile.last_name,
                is_staff: superuser,
                is_superuser: superuser,
            })
            .await?;

        tracing::info!(user_id = user.id, superuser, "👤 Created user {}", user);
        Ok(user)
    }

    pub fn check_password(&self, user: &User, password: &str) -> bool {
        self.hasher
            .verify(password, &user.password_hash)
            .unwrap_or(false)
    }

    pub async fn get(&self, id: u64) -> Result<User> {
        self.store.user(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.user_by_email(&normalize_email(email)).await
    }

    pub async fn exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// 依 id 排序的所有使用者
    pub async fn all(&self) -> Result<Vec<User>> {
        self.store.users().await
    }

    pub async fn save(&self, user: &User) -> Result<()> {
        self.store.save_user(user).await
    }

    /// 公開註冊：欄位驗證後建立一般使用者
    pub async fn register(&self, input: UserSerializer) -> Result<User> {
        let mut errors = FieldErrors::new();
        let email = check_required_text(&mut errors, "email", input.email.as_deref(), EMAIL_MAX_LENGTH);
        let password = input.password.as_deref();
        self.check_password_field(&mut errors, password, true);
        self.check_names(&mut errors, &input);

        if let Some(email) = email {
            self.check_email_field(&mut errors, email, None).await?;
        }
        errors.into_result()?;

        let profile = UserProfile {
            first_name: input.first_name.unwrap_or_default(),
            last_name: input.last_name.unwrap_or_default(),
        };
        self.create_user(
            email.unwrap_or_default(),
            password.unwrap_or_default(),
            profile,
        )
        .await
    }

    /// 更新目前使用者；`partial` 為 false 時 email 與密碼必填
    pub async fn update_profile(
        &self,
        user: &User,
        input: UserSerializer,
        partial: bool,
    ) -> Result<User> {
        let mut errors = FieldErrors::new();
        match input.email.as_deref() {
            Some(email) => {
                check_text(&mut errors, "email", email, EMAIL_MAX_LENGTH, false);
                self.check_email_field(&mut errors, email, Some(user.id))
                    .await?;
            }
            None if !partial => errors.add("email", REQUIRED),
            None => {}
        }
        self.check_password_field(&mut errors, input.password.as_deref(), !partial);
        self.check_names(&mut errors, &input);
        errors.into_result()?;

        let mut updated = user.clone();
        if let Some(email) = input.email {
            updated.email = normalize_email(&email);
        }
        if let Some(first_name) = input.first_name {
            updated.first_name = first_name;
        }
        if let Some(last_name) = input.last_name {
            updated.last_name = last_name;
        }
        if let Some(password) = input.password {
            updated.password_hash = self.hasher.hash(&password)?;
        }

        self.store.save_user(&updated).await?;
        tracing::debug!(user_id = updated.id, "Updated profile");
        Ok(updated)
    }

    fn check_password_field(&self, errors: &mut FieldErrors, password: Option<&str>, required: bool) {
        match password {
            Some("") => errors.add("password", BLANK),
            Some(password) => {
                let length = password.chars().count();
                if length < self.min_password_length {
                    errors.add(
                        "password",
                        format!(
                            "Ensure this field has at least {} characters.",
                            self.min_password_length
                        ),
                    );
                } else if length > PASSWORD_MAX_LENGTH {
                    errors.add(
                        "password",
                        format!(
                            "Ensure this field has no more than {} characters.",
                            PASSWORD_MAX_LENGTH
                        ),
                    );
                }
            }
            None if required => errors.add("password", REQUIRED),
            None => {}
        }
    }

    fn check_names(&self, errors: &mut FieldErrors, input: &UserSerializer) {
        if let Some(first_name) = &input.first_name {
            check_text(errors, "first_name", first_name, NAME_MAX_LENGTH, true);
        }
        if let Some(last_name) = &input.last_name {
            check_text(errors, "last_name", last_name, NAME_MAX_LENGTH, true);
        }
    }

    async fn check_email_field(
        &self,
        errors: &mut FieldErrors,
        email: &str,
        current_user: Option<u64>,
    ) -> Result<()> {
        if errors.contains("email") {
            return Ok(());
        }
        if !is_valid_email(email.trim()) {
            errors.add("email", "Enter a valid email address.");
            return Ok(());
        }
        if let Some(existing) = self.find_by_email(email).await? {
            if Some(existing.id) != current_user {
                errors.add("email", "user with this email already exists.");
            }
        }
        Ok(())
    }

    /// 帳密正確且帳號啟用時回傳使用者
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };
        if !user.is_active || !self.check_password(&user, password) {
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// 驗證帳密並取得（或建立）該使用者的 token
    pub async fn obtain_token(&self, input: AuthTokenSerializer) -> Result<AuthToken> {
        let mut errors = FieldErrors::new();
        let email = check_required_text(&mut errors, "email", input.email.as_deref(), EMAIL_MAX_LENGTH);
        let password = match input.password.as_deref() {
            Some("") => {
                errors.add("password", BLANK);
                None
            }
            Some(password) => Some(password),
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };
        errors.into_result()?;

        let (Some(email), Some(password)) = (email, password) else {
            return Err(AppError::field("password", REQUIRED));
        };

        let Some(mut user) = self.authenticate(email, password).await? else {
            tracing::warn!("🔒 Failed token request for {}", normalize_email(email));
            return Err(AppError::field(
                "non_field_errors",
                "Unable to authenticate with provided credentials.",
            ));
        };

        user.last_login = Some(Utc::now());
        self.store.save_user(&user).await?;

        if let Some(token) = self.store.token_for_user(user.id).await? {
            return Ok(token);
        }

        let token = AuthToken {
            key: generate_token_key(),
            user_id: user.id,
            created: Utc::now(),
        };
        self.store.insert_token(token.clone()).await?;
        tracing::info!(user_id = user.id, "🔑 Issued new token");
        Ok(token)
    }

    /// 以 token 找出已啟用的使用者
    pub async fn user_for_token(&self, key: &str) -> Result<User> {
        let token = self
            .store
            .token(key)
            .await?
            .ok_or_else(|| AppError::authentication_failed("Invalid token."))?;

        match self.store.user(token.user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::authentication_failed("User inactive or deleted.")),
        }
    }

    /// 管理頁面新增使用者，兩次輸入的密碼需一致
    pub async fn create_from_admin(&self, form: AdminUserCreation) -> Result<User> {
        let mut errors = FieldErrors::new();
        let email = check_required_text(&mut errors, "email", Some(form.email.as_str()), EMAIL_MAX_LENGTH);
        if let Some(email) = email {
            self.check_email_field(&mut errors, email, None).await?;
        }

        if form.password1.is_empty() {
            errors.add("password1", REQUIRED);
        } else {
            let mut password_errors = FieldErrors::new();
            self.check_password_field(&mut password_errors, Some(&form.password1), true);
            for message in password_errors.get("password").unwrap_or_default() {
                errors.add("password1", message.clone());
            }
        }
        if form.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !form.password1.is_empty() && form.password1 != form.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }
        errors.into_result()?;

        self.create_user(&form.email, &form.password1, UserProfile::default())
            .await
    }

    /// 管理頁面修改使用者資料與權限
    pub async fn update_from_admin(&self, id: u64, form: AdminUserChange) -> Result<User> {
        let mut user = self.get(id).await?;

        let mut errors = FieldErrors::new();
        if let Some(email) =
            check_required_text(&mut errors, "email", Some(form.email.as_str()), EMAIL_MAX_LENGTH)
        {
            self.check_email_field(&mut errors, email, Some(user.id)).await?;
        }
        check_text(&mut errors, "first_name", &form.first_name, NAME_MAX_LENGTH, true);
        check_text(&mut errors, "last_name", &form.last_name, NAME_MAX_LENGTH, true);
        errors.into_result()?;

        user.email = normalize_email(&form.email);
        user.first_name = form.first_name;
        user.last_name = form.last_name;
        user.is_active = form.is_active;
        user.is_staff = form.is_staff;
        user.is_superuser = form.is_superuser;

        self.store.save_user(&user).await?;
        tracing::info!(user_id = user.id, "🛠️ Admin updated user {}", user);
        Ok(user)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminUserCreation {
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminUserChange {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// 40 個十六進位字元
fn generate_token_key() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
