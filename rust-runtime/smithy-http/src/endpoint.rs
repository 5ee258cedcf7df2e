/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use http::uri::{Authority, PathAndQuery, Uri};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvalidEndpoint {
    #[error("endpoint `{0}` must have a scheme and an authority")]
    MissingAuthority(String),
    #[error("failed to build the request URI: {0}")]
    InvalidUri(#[from] http::Error),
}

/// Points a relative request URI (`/path?query`) at `endpoint`. A path on the endpoint acts as
/// a mount point and is prepended to the request path.
pub fn apply_endpoint(uri: &mut Uri, endpoint: &Uri) -> Result<(), InvalidEndpoint> {
    let (scheme, authority): (_, &Authority) = match (endpoint.scheme(), endpoint.authority()) {
        (Some(scheme), Some(authority)) => (scheme.clone(), authority),
        _ => return Err(InvalidEndpoint::MissingAuthority(endpoint.to_string())),
    };
    let request_path = uri.path_and_query().map(PathAndQuery::as_str).unwrap_or("/");
    let mount = endpoint.path().trim_end_matches('/');
    let combined = format!("{}{}", mount, request_path);
    let path_and_query = PathAndQuery::from_str(&combined).map_err(http::Error::from)?;
    *uri = Uri::builder()
        .scheme(scheme)
        .authority(authority.clone())
        .path_and_query(path_and_query)
        .build()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::apply_endpoint;
    use http::Uri;

    #[test]
    fn endpoint_is_applied() {
        let mut uri = Uri::from_static("/my-bucket/key?tagging");
        apply_endpoint(&mut uri, &Uri::from_static("https://s3.us-east-1.amazonaws.com")).unwrap();
        assert_eq!(uri, "https://s3.us-east-1.amazonaws.com/my-bucket/key?tagging");
    }

    #[test]
    fn endpoint_path_is_a_mount_point() {
        let mut uri = Uri::from_static("/?Action=Foo");
        apply_endpoint(&mut uri, &Uri::from_static("http://localhost:8080/mount/")).unwrap();
        assert_eq!(uri, "http://localhost:8080/mount/?Action=Foo");
    }

    #[test]
    fn relative_endpoints_are_rejected() {
        let mut uri = Uri::from_static("/");
        assert!(apply_endpoint(&mut uri, &Uri::from_static("/just-a-path")).is_err());
    }
}
