//! Descriptor validation, run before anything is resolved or built.

use std::collections::HashMap;

use url::{Host, Url};

use crate::descriptor::ClientDescriptor;
use crate::error::FeignError;

/// Rejects malformed client declarations.
pub struct Validator;

impl Validator {
    /// Check one descriptor.
    ///
    /// # Errors
    /// - `FeignError::BlankName` if the name is blank
    /// - `FeignError::InvalidHostname` if the service id or url yields a host with
    ///   characters outside `[A-Za-z0-9.-]`
    /// - `FeignError::InvalidUrl` if the url cannot be parsed at all
    pub fn validate(descriptor: &ClientDescriptor) -> Result<(), FeignError> {
        let name = descriptor.name().trim();
        if name.is_empty() {
            return Err(FeignError::BlankName {
                context_id: descriptor.context_id().to_owned(),
            });
        }
        check_host(name)?;

        let url = descriptor.url().trim();
        if !url.is_empty() {
            check_host(url)?;
        }
        Ok(())
    }

    /// Validate a batch and collapse it to one descriptor per context id.
    ///
    /// With `allow_override` the last declaration of a context id wins; otherwise a
    /// repeated context id is an error.
    ///
    /// # Errors
    /// The first per-descriptor failure, or `FeignError::DuplicateClientName`.
    pub fn validate_batch(
        descriptors: Vec<ClientDescriptor>,
        allow_override: bool,
    ) -> Result<Vec<ClientDescriptor>, FeignError> {
        let mut accepted: Vec<ClientDescriptor> = Vec::with_capacity(descriptors.len());
        let mut positions: HashMap<String, usize> = HashMap::new();

        for descriptor in descriptors {
            Self::validate(&descriptor)?;
            let key = descriptor.context_id().to_owned();
            match positions.get(&key) {
                Some(_) if !allow_override => {
                    return Err(FeignError::DuplicateClientName { name: key });
                }
                Some(&at) => {
                    tracing::debug!(context_id = %key, "Overriding earlier client declaration");
                    accepted[at] = descriptor;
                }
                None => {
                    positions.insert(key, accepted.len());
                    accepted.push(descriptor);
                }
            }
        }
        Ok(accepted)
    }
}

/// Parse `raw` as a URL (assuming `http` when no scheme is given) and check its host.
/// Unresolved `${...}` placeholders are accepted as-is.
///
/// The host is checked as written: the parsed host has already been lowercased,
/// percent-decoded and converted to punycode.
fn check_host(raw: &str) -> Result<(), FeignError> {
    if raw.contains("${") {
        return Ok(());
    }
    let candidate = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| FeignError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    match parsed.host() {
        Some(Host::Domain(_)) => {
            let host = written_host(&candidate);
            if is_legal_hostname(host) {
                Ok(())
            } else {
                Err(FeignError::InvalidHostname {
                    host: host.to_owned(),
                })
            }
        }
        Some(_) => Ok(()),
        None => Err(FeignError::InvalidUrl {
            url: raw.to_owned(),
            reason: "no host".to_owned(),
        }),
    }
}

/// Host part of `url` as written: authority minus userinfo and port.
fn written_host(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest
        .split(['/', '?', '#', '\\'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);
    host_port
        .split_once(':')
        .map_or(host_port, |(host, _)| host)
}

fn is_legal_hostname(host: &str) -> bool {
    host.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::DynamicClient;

    fn descriptor(name: &str) -> ClientDescriptor {
        ClientDescriptor::for_type::<DynamicClient>(name)
    }

    #[test]
    fn underscore_in_service_id_is_rejected() {
        let err = Validator::validate(&descriptor("foo_bar")).unwrap_err();
        assert_eq!(err.to_string(), "Service id not legal hostname (foo_bar)");
    }

    #[test]
    fn dash_in_service_id_is_fine() {
        Validator::validate(&descriptor("foo-bar")).unwrap();
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Validator::validate(&descriptor("  ").with_context_id("ctx")).unwrap_err();
        assert!(matches!(err, FeignError::BlankName { context_id } if context_id == "ctx"));
    }

    #[test]
    fn url_host_is_checked() {
        let err = Validator::validate(&descriptor("foo").with_url("http://bad_host:8080/api"))
            .unwrap_err();
        assert!(matches!(err, FeignError::InvalidHostname { host } if host == "bad_host"));

        Validator::validate(&descriptor("foo").with_url("localhost:8080")).unwrap();
        Validator::validate(&descriptor("foo").with_url("https://127.0.0.1")).unwrap();
    }

    #[test]
    fn non_ascii_service_id_is_rejected() {
        let err = Validator::validate(&descriptor("b\u{fc}cher")).unwrap_err();
        assert!(matches!(err, FeignError::InvalidHostname { host } if host == "b\u{fc}cher"));
    }

    #[test]
    fn host_is_reported_as_written() {
        let err = Validator::validate(&descriptor("FOO_BAR")).unwrap_err();
        assert!(matches!(err, FeignError::InvalidHostname { host } if host == "FOO_BAR"));

        let err = Validator::validate(&descriptor("foo%5Fbar")).unwrap_err();
        assert!(matches!(err, FeignError::InvalidHostname { host } if host == "foo%5Fbar"));

        let err = Validator::validate(
            &descriptor("foo").with_url("https://user:pw@Bad_Host:8443/api?q=1"),
        )
        .unwrap_err();
        assert!(matches!(err, FeignError::InvalidHostname { host } if host == "Bad_Host"));
    }

    #[test]
    fn placeholder_url_is_accepted() {
        Validator::validate(
            &descriptor("foo").with_url("${feignClient.url:https://example.com}"),
        )
        .unwrap();
    }

    #[test]
    fn unparsable_url_is_invalid() {
        let err = Validator::validate(&descriptor("foo").with_url("http://exa mple.com"))
            .unwrap_err();
        assert!(matches!(err, FeignError::InvalidUrl { .. }));
    }

    #[test]
    fn duplicate_context_ids_need_override() {
        let batch = || vec![descriptor("bar").with_url("http://one"), descriptor("bar")];

        let err = Validator::validate_batch(batch(), false).unwrap_err();
        assert!(matches!(err, FeignError::DuplicateClientName { name } if name == "bar"));

        let accepted = Validator::validate_batch(batch(), true).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].url(), "");
    }

    #[test]
    fn same_name_different_context_ids_are_fine() {
        let accepted = Validator::validate_batch(
            vec![descriptor("bar").with_context_id("foo"), descriptor("bar")],
            false,
        )
        .unwrap();
        assert_eq!(accepted.len(), 2);
    }
}
