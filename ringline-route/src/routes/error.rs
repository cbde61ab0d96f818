use crate::handle::{RouteFuture, RouteHandle};
use crate::reply::Reply;
use crate::request::Request;
use crate::result::ResultCode;

/// Fails every request with `LocalError`.
#[derive(Debug, Clone, Default)]
pub struct ErrorRoute {
    message: String,
}

impl ErrorRoute {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorRoute {
            message: message.into(),
        }
    }
}

impl RouteHandle for ErrorRoute {
    fn name(&self) -> &str {
        "error"
    }

    fn route(&self, _req: Request) -> RouteFuture<'_> {
        Box::pin(std::future::ready(Reply::error(
            ResultCode::LocalError,
            self.message.clone(),
        )))
    }
}
