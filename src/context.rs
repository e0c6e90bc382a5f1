use serde_json::{Map, Value};

/// Environment attributes merged into outgoing envelopes,
/// e.g. `user_agent`, `domain`, `base_url`.
pub type ClientContext = Map<String, Value>;

/// Source of client context, supplied by the host application.
///
/// The tracker never inspects its environment itself. A browser host would
/// read the user agent and page location here; a native host can report
/// whatever identifies it. Any `Fn() -> ClientContext` closure qualifies.
///
/// The provider is asked once, on the first envelope that needs context,
/// and the result is reused for the lifetime of the tracker.
pub trait ContextProvider: Send + Sync + 'static {
    fn client_context(&self) -> ClientContext;
}

impl<F> ContextProvider for F
where
    F: Fn() -> ClientContext + Send + Sync + 'static,
{
    fn client_context(&self) -> ClientContext {
        self()
    }
}

/// A fixed context mapping for hosts whose environment does not change.
#[derive(Debug, Clone, Default)]
pub struct StaticContext(ClientContext);

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

impl ContextProvider for StaticContext {
    fn client_context(&self) -> ClientContext {
        self.0.clone()
    }
}
