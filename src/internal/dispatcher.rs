use std::{collections::BTreeMap, sync::Arc};

use crate::{Batch, BatchTransport, DataTransport, Done, Envelope, PostRequest, Result, Signer};

/// Hands a flushed snapshot to the transport in the variant's wire shape.
pub(crate) trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, events: Vec<Envelope>, done: Option<Done>);
}

pub(crate) struct UnsignedDispatcher {
    pub url: Arc<str>,
    pub key: Arc<str>,
    pub transport: Arc<dyn BatchTransport>,
}

impl Dispatcher for UnsignedDispatcher {
    fn dispatch(&self, events: Vec<Envelope>, done: Option<Done>) {
        self.transport.post(Batch {
            url: self.url.clone(),
            key: self.key.clone(),
            events,
            done,
        });
    }
}

pub(crate) struct SignedDispatcher {
    pub url: Arc<str>,
    pub client_key: Arc<str>,
    pub client_secret: Arc<str>,
    pub signer: Arc<dyn Signer>,
    pub transport: Arc<dyn DataTransport>,
}

impl SignedDispatcher {
    fn request(&self, events: &[Envelope], done: Option<Done>) -> Result<PostRequest> {
        let data = serde_json::to_string(events)?;
        let mac = self.signer.sign(&self.client_secret, data.as_bytes());
        let headers = BTreeMap::from([("Content-Type".to_owned(), "text/plain".to_owned())]);
        let query = BTreeMap::from([
            ("key".to_owned(), self.client_key.to_string()),
            ("mac".to_owned(), mac),
        ]);
        Ok(PostRequest {
            url: self.url.clone(),
            data,
            headers,
            query,
            done,
        })
    }
}

impl Dispatcher for SignedDispatcher {
    fn dispatch(&self, events: Vec<Envelope>, done: Option<Done>) {
        match self.request(&events, done) {
            Ok(request) => self.transport.post_data(request),
            Err(e) => {
                tracing::error!(error = %e, dropped = events.len(), "Couldn't serialize batch, dropping it");
            }
        }
    }
}
