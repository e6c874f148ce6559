//! Sequential composition of request stages with early exit.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{Error, auth::RequestContext};

/// The outcome of running a [Stage].
#[derive(Debug)]
pub enum Flow {
    /// Hand the (possibly updated) context to the next stage.
    Continue(RequestContext),
    /// Stop processing the request and respond with the normalized error.
    Halt(Error),
}

/// One step of a [Pipeline], e.g. authentication or an authorization check.
pub trait Stage: Send + Sync {
    /// Inspect the request and the context built by the previous stages.
    fn run(&self, parts: &Parts, context: RequestContext) -> Flow;
}

/// An ordered list of stages that run before a route handler.
///
/// The first stage to return [Flow::Halt] ends the request, later stages and
/// the route handler do not run.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    /// Create an empty pipeline, which lets every request through.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `stage` to the end of the pipeline.
    pub fn then(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Run every stage in order, starting from `context`.
    pub fn run(&self, parts: &Parts, context: RequestContext) -> Flow {
        let mut context = context;

        for stage in &self.stages {
            match stage.run(parts, context) {
                Flow::Continue(next_context) => context = next_context,
                halt @ Flow::Halt(_) => return halt,
            }
        }

        Flow::Continue(context)
    }
}

/// Middleware that runs `pipeline` and stores the resulting [RequestContext]
/// in the request extensions.
///
/// Install with `axum::middleware::from_fn_with_state(pipeline, run_pipeline)`.
pub async fn run_pipeline(
    State(pipeline): State<Pipeline>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let context = parts
        .extensions
        .remove::<RequestContext>()
        .unwrap_or_default();

    match pipeline.run(&parts, context) {
        Flow::Continue(context) => {
            parts.extensions.insert(context);
            next.run(Request::from_parts(parts, body)).await
        }
        Flow::Halt(error) => error.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{Router, http::StatusCode, http::request::Parts, middleware, routing::get};
    use axum_test::TestServer;

    use crate::{
        Error,
        auth::{AccessDenied, AuthFailure, RequestContext},
    };

    use super::{Flow, Pipeline, Stage, run_pipeline};

    struct Reject(AuthFailure);

    impl Stage for Reject {
        fn run(&self, _parts: &Parts, _context: RequestContext) -> Flow {
            Flow::Continue(RequestContext::Rejected(self.0))
        }
    }

    struct Deny;

    impl Stage for Deny {
        fn run(&self, _parts: &Parts, _context: RequestContext) -> Flow {
            Flow::Halt(Error::Authorization(AccessDenied::Forbidden))
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl Stage for Count {
        fn run(&self, _parts: &Parts, context: RequestContext) -> Flow {
            self.0.fetch_add(1, Ordering::SeqCst);
            Flow::Continue(context)
        }
    }

    async fn describe_context(context: RequestContext) -> String {
        format!("{context:?}")
    }

    fn get_test_server(pipeline: Pipeline) -> TestServer {
        let app = Router::new()
            .route("/", get(describe_context))
            .route_layer(middleware::from_fn_with_state(pipeline, run_pipeline));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn empty_pipeline_continues_with_anonymous_context() {
        let server = get_test_server(Pipeline::new());

        let response = server.get("/").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "Anonymous");
    }

    #[tokio::test]
    async fn context_from_stage_reaches_handler() {
        let server = get_test_server(Pipeline::new().then(Reject(AuthFailure::Expired)));

        let response = server.get("/").await;

        response.assert_status_ok();
        assert_eq!(response.text(), "Rejected(Expired)");
    }

    #[tokio::test]
    async fn halt_skips_later_stages_and_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .then(Count(counter.clone()))
            .then(Deny)
            .then(Count(counter.clone()));
        let server = get_test_server(pipeline);

        let response = server.get("/").await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
