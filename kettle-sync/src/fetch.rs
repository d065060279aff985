//! Content fetching over encrypted transport.
//!
//! [`Fetch`] is the seam between the engine and the network: the pipeline
//! only ever sees `url -> bytes`. [`HttpFetcher`] is the production
//! implementation (ureq, per-request timeout); tests substitute an in-memory
//! fake.

use std::io::Read;
use std::time::Duration;

use crate::error::FetchError;

/// Retrieves the bytes behind a URL. No mutable state of its own.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// ureq-backed fetcher with a per-request timeout.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        // TLS is required for anti-tamper; config validation already rejects
        // plaintext recipe URLs, this guards entry URLs inside recipes too.
        if !url.starts_with("https://") {
            return Err(FetchError::Scheme {
                url: url.to_owned(),
            });
        }

        match self.agent.get(url).call() {
            Ok(response) => {
                let mut body = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut body)
                    .map_err(|e| FetchError::Transport {
                        url: url.to_owned(),
                        reason: e.to_string(),
                    })?;
                Ok(body)
            }
            Err(ureq::Error::Status(code, _)) => Err(FetchError::Status {
                url: url.to_owned(),
                code,
            }),
            Err(ureq::Error::Transport(t)) => Err(FetchError::Transport {
                url: url.to_owned(),
                reason: t.to_string(),
            }),
        }
    }
}
