//! Compiled-in module metadata and capabilities.

use axum::Router;
use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a setup hook.
pub type SetupFuture = BoxFuture<'static, Result<(), String>>;

/// One-time setup run on every install (not on upgrade).
///
/// A crash between a successful hook and the record write leaves the module
/// uninstalled, so the hook must tolerate being run again on retry.
pub type SetupHook = Arc<dyn Fn() -> SetupFuture + Send + Sync>;

/// Immutable description of a module linked into this binary.
#[derive(Clone)]
pub struct ModuleDescriptor {
    id: String,
    name: String,
    description: String,
    version: String,
    component: String,
    setup: Option<SetupHook>,
    routes: Option<Router>,
}

impl ModuleDescriptor {
    /// Create a descriptor with the required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            component: id.clone(),
            id,
            name: name.into(),
            description: String::new(),
            version: version.into(),
            setup: None,
            routes: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Owning component name. Defaults to the identifier.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// Attach a setup hook run during install.
    pub fn with_setup<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.setup = Some(Arc::new(move || -> SetupFuture { Box::pin(hook()) }));
        self
    }

    /// Routes served under the module's base path while it is installed.
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn routes(&self) -> Option<&Router> {
        self.routes.as_ref()
    }

    pub fn has_setup(&self) -> bool {
        self.setup.is_some()
    }

    /// Run the setup hook on its own task.
    ///
    /// A panicking hook is reported as a failure instead of unwinding into
    /// the caller.
    pub(crate) async fn run_setup(&self) -> Result<(), String> {
        let Some(hook) = self.setup.clone() else {
            return Ok(());
        };
        match tokio::spawn(hook()).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err("setup hook panicked".to_string()),
            Err(e) => Err(format!("setup hook aborted: {e}")),
        }
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("component", &self.component)
            .field("has_setup", &self.setup.is_some())
            .field("has_routes", &self.routes.is_some())
            .finish()
    }
}
