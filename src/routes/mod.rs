mod auth;
mod health_check;
mod users;

pub use auth::{issue_token, login, logout, validate_token};
pub use health_check::health_check;
pub use users::{
    add_user, all_users, current_user, delete_current_user, reset_password, update_current_user,
};
