use std::sync::Arc;

use crate::{
    BatchTransport, Config, ContextProvider, DataTransport, EnvelopeBuilder, Error, EventTracker,
    Result, Signer, WireShape,
    internal::{SignedDispatcher, UnsignedDispatcher},
    validate_name,
};

/// Builds an [`EventTracker`] whose transport receives envelope batches as-is.
///
/// Required: `key`, `url`, `client_name`, `transport`.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use beaconry::{Batch, Config, EventTracker};
///
/// let tracker = EventTracker::unsigned()
///     .key("client-key")
///     .url("https://events.example.com/v1")
///     .client_name("web")
///     .transport(|batch: Batch| println!("{} events", batch.events.len()))
///     .config(Config::default().with_buffer_timeout(Duration::ZERO))
///     .build()?;
///
/// tracker.track("page", "view", None);
/// # Ok::<(), beaconry::Error>(())
/// ```
#[derive(Default)]
pub struct UnsignedBuilder {
    key: Option<String>,
    url: Option<String>,
    client_name: Option<String>,
    transport: Option<Arc<dyn BatchTransport>>,
    context: Option<Arc<dyn ContextProvider>>,
    config: Config,
}

impl UnsignedBuilder {
    pub fn key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn url<S: Into<String>>(mut self, url: S) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Namespace prepended to every event type as `<client_name>.<type>`.
    pub fn client_name<S: Into<String>>(mut self, name: S) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn transport<T: BatchTransport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Source of client context; only consulted when
    /// [`Config::append_client_context`] is set.
    pub fn context_provider<P: ContextProvider>(mut self, provider: P) -> Self {
        self.context = Some(Arc::new(provider));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<EventTracker> {
        let key = required(self.key, "key")?;
        let transport = self.transport.ok_or(Error::MissingArgument("transport"))?;
        let url = required(self.url, "url")?;
        let client_name = required(self.client_name, "client_name")?;

        let shape = WireShape::Unsigned {
            client_name,
            user_id: self.config.user_id.clone(),
        };
        let builder = envelope_builder(shape, &self.config, self.context);
        let dispatcher = UnsignedDispatcher {
            url,
            key,
            transport,
        };
        EventTracker::new(self.config, builder, Box::new(dispatcher))
    }
}

/// Builds an [`EventTracker`] that serializes each batch, signs it with the
/// client secret and hands the transport a ready-to-send [`PostRequest`].
///
/// Required: `client_key`, `client_secret`, `transport`, `events_url`,
/// `app_name` (ASCII letters and digits only), `signer`.
///
/// [`PostRequest`]: crate::PostRequest
#[derive(Default)]
pub struct SignedBuilder {
    client_key: Option<String>,
    client_secret: Option<String>,
    events_url: Option<String>,
    app_name: Option<String>,
    transport: Option<Arc<dyn DataTransport>>,
    signer: Option<Arc<dyn Signer>>,
    context: Option<Arc<dyn ContextProvider>>,
    config: Config,
}

impl SignedBuilder {
    pub fn client_key<S: Into<String>>(mut self, key: S) -> Self {
        self.client_key = Some(key.into());
        self
    }

    pub fn client_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn events_url<S: Into<String>>(mut self, url: S) -> Self {
        self.events_url = Some(url.into());
        self
    }

    pub fn app_name<S: Into<String>>(mut self, name: S) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn transport<T: DataTransport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn signer<S: Signer>(mut self, signer: S) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    pub fn context_provider<P: ContextProvider>(mut self, provider: P) -> Self {
        self.context = Some(Arc::new(provider));
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<EventTracker> {
        let client_key = required(self.client_key, "client_key")?;
        let client_secret = required(self.client_secret, "client_secret")?;
        let transport = self.transport.ok_or(Error::MissingArgument("transport"))?;
        let url = required(self.events_url, "events_url")?;
        let app_name = required(self.app_name, "app_name")?;
        let signer = self.signer.ok_or(Error::MissingArgument("signer"))?;
        validate_name(&app_name)?;

        let shape = WireShape::Authenticated { app_name };
        let builder = envelope_builder(shape, &self.config, self.context);
        let dispatcher = SignedDispatcher {
            url,
            client_key,
            client_secret,
            signer,
            transport,
        };
        EventTracker::new(self.config, builder, Box::new(dispatcher))
    }
}

/// Empty strings count as missing.
fn required(value: Option<String>, name: &'static str) -> Result<Arc<str>> {
    match value {
        Some(v) if !v.is_empty() => Ok(Arc::from(v)),
        _ => Err(Error::MissingArgument(name)),
    }
}

fn envelope_builder(
    shape: WireShape,
    config: &Config,
    context: Option<Arc<dyn ContextProvider>>,
) -> EnvelopeBuilder {
    let builder = EnvelopeBuilder::new(shape);
    match context {
        Some(provider) if config.append_client_context => builder.with_client_context(provider),
        None if config.append_client_context => {
            tracing::debug!("Client context requested but no provider given");
            builder
        }
        _ => builder,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{Batch, PostRequest};

    fn unbuffered() -> Config {
        Config::default().with_buffer_timeout(Duration::ZERO)
    }

    fn signed() -> SignedBuilder {
        EventTracker::signed()
            .client_key("ck")
            .client_secret("cs")
            .events_url("https://events.test")
            .app_name("ModTools")
            .transport(|_: PostRequest| {})
            .signer(|_: &str, _: &[u8]| String::new())
            .config(unbuffered())
    }

    #[test]
    fn test_signed_builds_with_all_arguments() {
        assert!(signed().build().is_ok());
    }

    #[test]
    fn test_signed_reports_first_missing_argument() {
        let err = EventTracker::signed().build().err().unwrap();
        assert!(matches!(err, Error::MissingArgument("client_key")));

        let err = signed().client_secret("").build().err().unwrap();
        assert!(matches!(err, Error::MissingArgument("client_secret")));

        let mut builder = signed();
        builder.signer = None;
        let err = builder.build().err().unwrap();
        assert!(matches!(err, Error::MissingArgument("signer")));
    }

    #[test]
    fn test_signed_rejects_invalid_app_name() {
        let err = signed().app_name("mod-tools").build().err().unwrap();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_unsigned_requires_transport() {
        let err = EventTracker::unsigned()
            .key("k")
            .url("u")
            .client_name("c")
            .config(unbuffered())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingArgument("transport")));
    }

    #[test]
    fn test_unsigned_client_name_is_not_restricted() {
        let tracker = EventTracker::unsigned()
            .key("k")
            .url("u")
            .client_name("my-web.app")
            .transport(|_: Batch| {})
            .config(unbuffered())
            .build();
        assert!(tracker.is_ok());
    }

    #[test]
    fn test_buffering_outside_runtime_fails_fast() {
        let err = signed()
            .config(Config::default())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, Error::NoRuntime));
    }
}
