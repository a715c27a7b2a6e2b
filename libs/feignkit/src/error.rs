use thiserror::Error;

/// Boxed error produced by an external collaborator (transport, capability provider).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while registering, building or calling a client.
///
/// Registration-time variants (`BlankName` through `CapabilityLookup`) are fail-fast:
/// none of them is retried or swallowed by this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeignError {
    /// A descriptor was declared without a usable name
    #[error("client name must be set (context id '{context_id}')")]
    BlankName { context_id: String },

    /// A configuration scope was registered a second time
    #[error("configuration scope '{scope}' is already registered")]
    DuplicateScope { scope: String },

    /// A fragment was put into a scope that has already been resolved
    #[error("configuration scope '{scope}' has already been resolved and cannot change")]
    FragmentAlreadyResolved { scope: String },

    /// The service id or url of a descriptor does not yield a legal hostname
    #[error("Service id not legal hostname ({host})")]
    InvalidHostname { host: String },

    /// The url of a descriptor could not be parsed
    #[error("{url} is not a legal URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// An alias is already published by another client
    #[error("alias '{alias}' is already published by client '{owner}'")]
    DuplicateAlias { alias: String, owner: String },

    /// Two descriptors in one batch share a registry name and overriding is disabled
    #[error(
        "client '{name}' is declared more than once; enable overriding or give each client a distinct context id"
    )]
    DuplicateClientName { name: String },

    /// The transport capability lookup failed; the collaborator's error is kept intact
    #[error(transparent)]
    CapabilityLookup(BoxError),

    /// No client is published under the requested alias
    #[error("client not found: alias={alias}")]
    ClientNotFound { alias: String },

    /// A client is published under the alias but with a different type
    #[error("type mismatch for alias={alias}: requested {requested}")]
    TypeMismatch {
        alias: String,
        requested: &'static str,
    },

    /// The adapter type used to build a client differs from the descriptor's target
    #[error("descriptor targets '{expected}' but the client was built as '{actual}'")]
    TargetMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A configured default header has an invalid name or value
    #[error("invalid default header '{name}'")]
    InvalidHeader { name: String },

    /// The call failed inside the transport
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The remote service answered with a non-2xx status
    #[error("HTTP {status} from {method} {url}: {body_preview}")]
    Status {
        status: http::StatusCode,
        method: http::Method,
        url: String,
        body_preview: String,
    },

    /// The response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The call was cancelled through its handle
    #[error("call cancelled")]
    Cancelled,
}

impl FeignError {
    /// Wraps a capability-provider failure without altering it.
    #[must_use]
    pub fn capability_lookup<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        FeignError::CapabilityLookup(err.into())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct ClosedFileSystem;

    impl fmt::Display for ClosedFileSystem {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("file system is closed")
        }
    }

    impl Error for ClosedFileSystem {}

    #[test]
    fn capability_lookup_is_transparent() {
        let err = FeignError::capability_lookup(ClosedFileSystem);

        assert_eq!(err.to_string(), "file system is closed");
        match err {
            FeignError::CapabilityLookup(inner) => {
                assert!(
                    inner.downcast_ref::<ClosedFileSystem>().is_some(),
                    "original error type must survive"
                );
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn transport_error_preserves_source() {
        let err = FeignError::Transport(Box::new(ClosedFileSystem));

        let source = err.source().expect("transport error should have a source");
        assert!(source.downcast_ref::<ClosedFileSystem>().is_some());
    }

    #[test]
    fn invalid_hostname_names_the_host() {
        let err = FeignError::InvalidHostname {
            host: "foo_bar".to_owned(),
        };
        assert_eq!(err.to_string(), "Service id not legal hostname (foo_bar)");
    }
}
