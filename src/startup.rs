use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{Authenticator, TokenStore};
use crate::configuration::Settings;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::TokenAuth;
use crate::routes::{
    add_user, all_users, current_user, delete_current_user, health_check, issue_token, login,
    logout, reset_password, update_current_user, validate_token,
};
use crate::store::CredentialStore;
use crate::users::UserStore;

const MAX_JSON_BYTES: usize = 1_048_576;

/// Build the user store and authenticator over one shared credential store.
pub fn build_services(store: Arc<dyn CredentialStore>, settings: &Settings) -> (UserStore, Authenticator) {
    let timeout = settings.database.query_timeout();
    let users = UserStore::new(store.clone(), timeout);
    let tokens = TokenStore::new(store, timeout);
    let authenticator = Authenticator::new(users.clone(), tokens, settings.auth.login_token_ttl());

    (users, authenticator)
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::InvalidJson(err.to_string())).into()
}

pub fn run(
    listener: TcpListener,
    users: UserStore,
    authenticator: Authenticator,
) -> Result<Server, std::io::Error> {
    let users = web::Data::new(users);
    let authenticator_data = web::Data::new(authenticator.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(users.clone())
            .app_data(authenticator_data.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(MAX_JSON_BYTES)
                    .error_handler(json_error),
            )

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/users/login", web::post().to(login))
            .route("/users/logout", web::post().to(logout))
            .route("/users/validate-token", web::post().to(validate_token))
            .route("/users/add", web::post().to(add_user))

            // Protected routes (require a bearer token)
            .service(
                web::scope("/users")
                    .wrap(TokenAuth::new(authenticator.clone()))
                    .route("/all", web::get().to(all_users))
                    .route("/me", web::get().to(current_user))
                    .route("/me", web::put().to(update_current_user))
                    .route("/me", web::delete().to(delete_current_user))
                    .route("/me/password", web::post().to(reset_password))
                    .route("/me/tokens", web::post().to(issue_token)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
