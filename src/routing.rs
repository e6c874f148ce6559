//! Application router configuration with public, authenticated and admin route definitions.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    AppState, Error,
    account::{
        create_account_endpoint, delete_account_endpoint, get_account_endpoint,
        list_accounts_endpoint, update_account_endpoint,
    },
    auth::{
        Authenticate, OptionalAuthenticate, Pipeline, RequireAdmin, get_me, get_session,
        post_log_in, run_pipeline,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        list_categories_endpoint, update_category_endpoint,
    },
    cors::cors_layer,
    endpoints,
    error::{expose_error_detail, handle_panic},
    health::get_health,
    logging::logging_middleware,
    rate_limit::rate_limit,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
    transaction_type::{
        create_transaction_type_endpoint, delete_transaction_type_endpoint,
        get_transaction_type_endpoint, list_transaction_types_endpoint,
        update_transaction_type_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let authenticator = state.authenticator();
    let authenticated = Pipeline::new().then(Authenticate(authenticator.clone()));
    let admin_only = authenticated
        .clone()
        .then(RequireAdmin(state.admin_policy.clone()));
    let optional = Pipeline::new().then(OptionalAuthenticate(authenticator));

    let public_routes = Router::new().route(endpoints::LOG_IN, post(post_log_in));

    let session_routes = Router::new()
        .route(endpoints::SESSION, get(get_session))
        .route_layer(middleware::from_fn_with_state(optional, run_pipeline));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_me))
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(create_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint)
                .put(update_account_endpoint)
                .delete(delete_account_endpoint),
        )
        .route(
            endpoints::TRANSACTION_TYPES,
            get(list_transaction_types_endpoint),
        )
        .route(
            endpoints::TRANSACTION_TYPE,
            get(get_transaction_type_endpoint),
        )
        .route(endpoints::CATEGORIES, get(list_categories_endpoint))
        .route(endpoints::CATEGORY, get(get_category_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .put(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(authenticated, run_pipeline));

    // Types and categories are shared by every user, so only the admin may change them.
    let admin_routes = Router::new()
        .route(
            endpoints::TRANSACTION_TYPES,
            post(create_transaction_type_endpoint),
        )
        .route(
            endpoints::TRANSACTION_TYPE,
            put(update_transaction_type_endpoint).delete(delete_transaction_type_endpoint),
        )
        .route(endpoints::CATEGORIES, post(create_category_endpoint))
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route_layer(middleware::from_fn_with_state(admin_only, run_pipeline));

    let api_routes = public_routes
        .merge(session_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit,
        ));

    let router = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .merge(api_routes)
        .fallback(get_404_not_found)
        .layer(CatchPanicLayer::custom(handle_panic));

    let router = if state.environment.is_production() {
        router
    } else {
        router.layer(middleware::from_fn(expose_error_detail))
    };

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(cors_layer(&state.allowed_origins))
        .with_state(state)
}

/// Respond to requests for unknown routes with the 404 error envelope.
async fn get_404_not_found() -> Error {
    Error::NotFound
}




#[cfg(test)]
mod error_detail_tests {
    use serde_json::Value;

    use crate::{
        Environment,
        test_utils::{get_test_app_state, get_test_server},
    };

    #[tokio::test]
    async fn production_hides_error_detail() {
        let state = get_test_app_state().with_environment(Environment::Production);
        let server = get_test_server(state);

        let response = server.get("/nope").await;

        let body = response.json::<Value>();
        assert_eq!(body["error"]["kind"], "not_found");
        assert!(body["error"].get("detail").is_none(), "got body {body}");
    }

    #[tokio::test]
    async fn other_environments_expose_error_detail() {
        let server = get_test_server(get_test_app_state());

        let response = server.get("/nope").await;

        let body = response.json::<Value>();
        assert_eq!(
            body["error"]["detail"],
            "the requested resource could not be found"
        );
    }
}
