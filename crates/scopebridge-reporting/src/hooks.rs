//! Entry points for host framework events

use std::fmt;

use crate::event::{Breadcrumb, BreadcrumbType, Severity, UserContext};
use crate::scope::Scope;

pub const ROUTE_TAG: &str = "route";
pub const ROUTE_BREADCRUMB_CATEGORY: &str = "route";

/// An authenticated principal
pub trait Identity {
    fn id(&self) -> String;
}

impl Identity for String {
    fn id(&self) -> String {
        self.clone()
    }
}

impl Identity for u64 {
    fn id(&self) -> String {
        self.to_string()
    }
}

/// Code that handles a dispatched route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerDescriptor {
    /// Method on a controller type, rendered `Owner::method()`
    Method { owner: String, method: String },
    /// Free function or standalone action, rendered `path()`
    Function { path: String },
}

impl fmt::Display for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerDescriptor::Method { owner, method } => write!(f, "{}::{}()", owner, method),
            HandlerDescriptor::Function { path } => write!(f, "{}()", path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDispatch {
    pub route_id: String,
    pub handler: HandlerDescriptor,
}

impl ActionDispatch {
    pub fn new(route_id: impl Into<String>, handler: HandlerDescriptor) -> Self {
        Self {
            route_id: route_id.into(),
            handler,
        }
    }
}

/// Record who is making the request
pub fn on_authentication_success(scope: &mut Scope, identity: &dyn Identity) {
    let id = identity.id();
    tracing::debug!("Binding user {} to request scope", id);
    scope.set_user(Some(UserContext::with_id(id)));
}

/// Record the dispatched route as a navigation breadcrumb and the `route` tag
pub fn on_action_dispatch(scope: &mut Scope, dispatch: &ActionDispatch) {
    scope.add_breadcrumb(
        Breadcrumb::new(BreadcrumbType::Navigation, Severity::Info)
            .with_category(ROUTE_BREADCRUMB_CATEGORY)
            .with_message(dispatch.route_id.clone())
            .with_data("action", dispatch.handler.to_string()),
    );
    scope.set_tag(ROUTE_TAG, dispatch.route_id.clone());
}
