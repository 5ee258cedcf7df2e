/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Load Credentials from a Web Identity Token File
//!
//! WebIdentityToken providers are most commonly used with EKS. The token file, the role and the
//! session name are read from the environment:
//! - `AWS_WEB_IDENTITY_TOKEN_FILE`: full path to the token file
//! - `AWS_ROLE_ARN`: role to assume
//! - `AWS_ROLE_SESSION_NAME`: optional, defaults to `aws-sdk-rust-<epoch millis>`
//!
//! When `AWS_WEB_IDENTITY_TOKEN_FILE` is unset they are read from the selected profile instead:
//!
//! ```ini
//! [profile default]
//! role_arn = arn:aws:iam::123456789012:role/target
//! source_profile = web
//!
//! [profile web]
//! web_identity_token_file = /token.jwt
//! role_arn = arn:aws:iam::123456789012:role/web
//! role_session_name = web-session
//! ```
//!
//! A profile without `web_identity_token_file` may name a `source_profile` with one. The token is
//! exchanged in the source profile and every role on the way back is assumed with `AssumeRole`.
//!
//! The token file is read again on every refresh, so a rotated token is picked up without
//! rebuilding the provider.

use crate::profile::parser::{self, LoadOptions};
use crate::profile::ProfileFileError;
use crate::provider_config::ProviderConfig;
use crate::sts::client::{AssumeRoleRequest, AssumeRoleWithWebIdentityRequest, SharedStsClient};
use crate::sts::util::{default_session_name, AuxiliaryData, LazyStsClient};
use aws_types::credential::lazy_caching::CredentialsCache;
use aws_types::credential::{self, future, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::{Env, Fs};
use aws_types::time_source::SharedTimeSource;
use smithy_types::Value;
use std::path::PathBuf;
use tracing::Instrument;

const PROVIDER_NAME: &str = "WebIdentityToken";

const ENV_VAR_TOKEN_FILE: &str = "AWS_WEB_IDENTITY_TOKEN_FILE";
const ENV_VAR_ROLE_ARN: &str = "AWS_ROLE_ARN";
const ENV_VAR_SESSION_NAME: &str = "AWS_ROLE_SESSION_NAME";

/// Error codes after which the whole exchange is attempted once more
const RETRY_CODES: &[&str] = &[
    "IDPCommunicationError",
    "IDPCommunicationErrorException",
    "InvalidIdentityToken",
];

#[derive(Debug, PartialEq, Eq)]
struct WebIdentity {
    token_file: PathBuf,
    role_arn: String,
    session_name: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
struct ChainedRole {
    role_arn: String,
    session_name: Option<String>,
}

/// Where the token comes from, plus the roles to assume afterwards, innermost first
#[derive(Debug, PartialEq, Eq)]
struct Settings {
    web_identity: WebIdentity,
    chain: Vec<ChainedRole>,
}

/// Credential provider to load credentials from a Web Identity Token
///
/// See the module documentation for where the token and role come from.
#[derive(Debug)]
pub struct TokenFileWebIdentityProvider {
    options: LoadOptions,
    env: Env,
    fs: Fs,
    client: LazyStsClient,
    time_source: SharedTimeSource,
    cache: CredentialsCache,
    data: AuxiliaryData,
}

impl TokenFileWebIdentityProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Output of the last successful STS call other than the credentials
    pub fn data(&self) -> Option<Value> {
        self.data.get()
    }

    async fn load(&self) -> credential::Result {
        match self.load_once().await {
            Err(err) if RETRY_CODES.contains(&err.code()) => {
                tracing::debug!(code = %err.code(), "retrying web identity token exchange");
                self.load_once().await
            }
            result => result,
        }
    }

    async fn load_once(&self) -> credential::Result {
        let settings = self.settings()?;
        let client = self
            .client
            .get()
            .map_err(|err| err.into_credentials_error("AssumeRoleWithWebIdentity"))?;

        let web_identity = &settings.web_identity;
        let token = self.fs.read_to_string(&web_identity.token_file).map_err(|err| {
            CredentialsError::invalid_configuration(format!(
                "could not read web identity token file {}: {}",
                web_identity.token_file.display(),
                err
            ))
            .with_source(err)
        })?;
        let request = AssumeRoleWithWebIdentityRequest {
            role_arn: web_identity.role_arn.clone(),
            role_session_name: self.session_name(web_identity.session_name.as_deref()),
            web_identity_token: token.trim().to_string(),
            ..Default::default()
        };
        let response = client
            .assume_role_with_web_identity(&request)
            .await
            .map_err(|err| err.into_credentials_error("AssumeRoleWithWebIdentity"))?;
        tracing::info!(role_arn = %request.role_arn, "assumed role with web identity");
        let mut creds = response.credentials(PROVIDER_NAME);
        let mut data = response.data().clone();

        for role in &settings.chain {
            let request = AssumeRoleRequest {
                role_arn: role.role_arn.clone(),
                role_session_name: self.session_name(role.session_name.as_deref()),
                ..Default::default()
            };
            let response = client
                .assume_role(&creds, &request)
                .instrument(tracing::info_span!("load_assume_role", role_arn = %role.role_arn))
                .await
                .map_err(|err| err.into_credentials_error("AssumeRole"))?;
            tracing::info!(role_arn = %role.role_arn, "loaded assume role credentials");
            creds = response.credentials(PROVIDER_NAME);
            data = response.data().clone();
        }
        self.data.set(&data);
        Ok(creds)
    }

    fn session_name(&self, configured: Option<&str>) -> String {
        configured
            .map(str::to_string)
            .unwrap_or_else(|| default_session_name(self.time_source.now()))
    }

    fn settings(&self) -> Result<Settings, CredentialsError> {
        if let Some(token_file) = self.env.get_non_empty(ENV_VAR_TOKEN_FILE) {
            let role_arn = self.env.get_non_empty(ENV_VAR_ROLE_ARN).ok_or_else(|| {
                CredentialsError::invalid_configuration(format!(
                    "{} is set but {} is not",
                    ENV_VAR_TOKEN_FILE, ENV_VAR_ROLE_ARN
                ))
            })?;
            return Ok(Settings {
                web_identity: WebIdentity {
                    token_file: token_file.into(),
                    role_arn,
                    session_name: self.env.get_non_empty(ENV_VAR_SESSION_NAME),
                },
                chain: vec![],
            });
        }
        let profile_set = parser::load(&self.env, &self.fs, &self.options)?;
        Ok(settings_from_profile(&profile_set)?)
    }
}

mod keys {
    pub const TOKEN_FILE: &str = "web_identity_token_file";
    pub const ROLE_ARN: &str = "role_arn";
    pub const SESSION_NAME: &str = "role_session_name";
    pub const SOURCE_PROFILE: &str = "source_profile";
}

fn settings_from_profile(profile_set: &parser::ProfileSet) -> Result<Settings, ProfileFileError> {
    let mut visited: Vec<&str> = Vec::new();
    let mut chain = Vec::new();
    let mut name = profile_set.selected_profile();
    loop {
        if visited.contains(&name) {
            return Err(ProfileFileError::CredentialLoop {
                profiles: visited.iter().map(|p| p.to_string()).collect(),
                next: name.to_string(),
            });
        }
        let profile = profile_set
            .get_profile(name)
            .ok_or_else(|| ProfileFileError::MissingProfile {
                profile: name.to_string(),
            })?;
        visited.push(name);

        let role_arn = profile.get_non_empty(keys::ROLE_ARN);
        let session_name = profile.get_non_empty(keys::SESSION_NAME).map(str::to_string);
        match (profile.get_non_empty(keys::TOKEN_FILE), role_arn) {
            (Some(token_file), Some(role_arn)) => {
                chain.reverse();
                return Ok(Settings {
                    web_identity: WebIdentity {
                        token_file: token_file.into(),
                        role_arn: role_arn.to_string(),
                        session_name,
                    },
                    chain,
                });
            }
            (None, Some(role_arn)) => {
                let source = profile.get_non_empty(keys::SOURCE_PROFILE).ok_or_else(|| {
                    ProfileFileError::MissingWebIdentityToken {
                        profile: name.to_string(),
                    }
                })?;
                chain.push(ChainedRole {
                    role_arn: role_arn.to_string(),
                    session_name,
                });
                name = source;
            }
            _ => {
                return Err(ProfileFileError::MissingWebIdentityToken {
                    profile: name.to_string(),
                })
            }
        }
    }
}

impl ProvideCredentials for TokenFileWebIdentityProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .get_or_load(move || self.load())
                .instrument(tracing::info_span!("load_credentials", provider = PROVIDER_NAME)),
        )
    }

    fn refresh<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.cache
                .refresh(move || self.load())
                .instrument(tracing::info_span!("load_credentials", provider = PROVIDER_NAME)),
        )
    }

    fn needs_refresh(&self) -> bool {
        self.cache.needs_refresh()
    }

    fn expire(&self) {
        self.cache.expire()
    }
}

#[derive(Debug, Default)]
pub struct Builder {
    profile: Option<String>,
    conf: Option<ProviderConfig>,
    sts_client: Option<SharedStsClient>,
}

impl Builder {
    /// Profile to read when `AWS_WEB_IDENTITY_TOKEN_FILE` is unset. Defaults to `AWS_PROFILE`,
    /// then `default`.
    pub fn profile_name(mut self, profile_name: impl Into<String>) -> Self {
        self.profile = Some(profile_name.into());
        self
    }

    pub fn sts_client(mut self, client: SharedStsClient) -> Self {
        self.sts_client = Some(client);
        self
    }

    pub fn configure(mut self, conf: &ProviderConfig) -> Self {
        self.conf = Some(conf.clone());
        self
    }

    pub fn build(self) -> TokenFileWebIdentityProvider {
        let conf = self.conf.unwrap_or_default();
        TokenFileWebIdentityProvider {
            options: LoadOptions {
                profile: self.profile,
                load_config: Some(true),
                ..Default::default()
            },
            env: conf.env(),
            fs: conf.fs(),
            time_source: conf.time_source(),
            cache: CredentialsCache::new().with_time_source(conf.time_source()),
            client: LazyStsClient::new(conf, self.sts_client),
            data: AuxiliaryData::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{settings_from_profile, ChainedRole, Settings, TokenFileWebIdentityProvider, WebIdentity};
    use crate::profile::ProfileSet;
    use crate::provider_config::ProviderConfig;
    use crate::sts::client::test::{Call, RecordingStsClient};
    use crate::sts::client::{AssumeRoleRequest, AssumeRoleWithWebIdentityRequest, StsError};
    use aws_types::credential::{CredentialsError, ProvideCredentials};
    use aws_types::os_shim_internal::{Env, Fs};
    use pretty_assertions::assert_eq;
    use smithy_http::protocol::ServiceError;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn provider(
        env: &[(&str, &str)],
        fs: &[(&str, &str)],
        sts: &Arc<RecordingStsClient>,
    ) -> TokenFileWebIdentityProvider {
        TokenFileWebIdentityProvider::builder()
            .configure(
                &ProviderConfig::no_configuration()
                    .with_env(Env::from_slice(env))
                    .with_fs(Fs::from_slice(fs)),
            )
            .sts_client(sts.clone())
            .build()
    }

    fn web_identity_call(token: &str, role_arn: &str, session: &str) -> Call {
        Call::WebIdentity(AssumeRoleWithWebIdentityRequest {
            role_arn: role_arn.to_string(),
            role_session_name: session.to_string(),
            web_identity_token: token.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn settings_from_environment() {
        let sts = Arc::new(RecordingStsClient::default());
        let provider = provider(
            &[
                ("AWS_WEB_IDENTITY_TOKEN_FILE", "/token.jwt"),
                ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/eks"),
                ("AWS_ROLE_SESSION_NAME", "pod"),
            ],
            &[("/token.jwt", "jwt-token\n")],
            &sts,
        );
        let creds = provider.provide_credentials().await.expect("exchanged");
        assert_eq!(creds.access_key_id(), "ASIA-web");
        assert_eq!(creds.provider_name(), "WebIdentityToken");
        assert_eq!(
            sts.calls(),
            vec![web_identity_call(
                "jwt-token",
                "arn:aws:iam::123456789012:role/eks",
                "pod"
            )]
        );
    }

    #[tokio::test]
    async fn token_file_without_role() {
        let sts = Arc::new(RecordingStsClient::default());
        let err = provider(&[("AWS_WEB_IDENTITY_TOKEN_FILE", "/token.jwt")], &[], &sts)
            .provide_credentials()
            .await
            .expect_err("no role");
        assert!(matches!(err, CredentialsError::InvalidConfiguration(_)));
        assert!(sts.calls().is_empty());
    }

    #[tokio::test]
    async fn source_profile_without_token_is_assumed() {
        let sts = Arc::new(RecordingStsClient::default());
        let provider = provider(
            &[("HOME", "/home")],
            &[
                (
                    "/home/.aws/config",
                    "[default]\n\
                     role_arn = arn:aws:iam::123456789012:role/target\n\
                     source_profile = web\n\
                     role_session_name = outer\n\
                     [profile web]\n\
                     web_identity_token_file = /token.jwt\n\
                     role_arn = arn:aws:iam::123456789012:role/web\n\
                     role_session_name = inner\n",
                ),
                ("/token.jwt", "jwt-token"),
            ],
            &sts,
        );
        let creds = provider.provide_credentials().await.expect("chained");
        assert_eq!(creds.access_key_id(), "ASIA-target");
        assert_eq!(
            sts.calls(),
            vec![
                web_identity_call("jwt-token", "arn:aws:iam::123456789012:role/web", "inner"),
                Call::AssumeRole(
                    "ASIA-web".to_string(),
                    AssumeRoleRequest {
                        role_arn: "arn:aws:iam::123456789012:role/target".to_string(),
                        role_session_name: "outer".to_string(),
                        ..Default::default()
                    }
                ),
            ]
        );
        assert!(provider.data().is_some());
    }

    #[tokio::test]
    async fn token_is_reread_on_refresh() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("token.jwt");
        std::fs::write(&path, "first").expect("write token");
        let path_str = path.to_str().expect("utf-8 path");

        let sts = Arc::new(RecordingStsClient::default());
        let provider = TokenFileWebIdentityProvider::builder()
            .configure(
                &ProviderConfig::no_configuration()
                    .with_env(Env::from_slice(&[
                        ("AWS_WEB_IDENTITY_TOKEN_FILE", path_str),
                        ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/eks"),
                        ("AWS_ROLE_SESSION_NAME", "pod"),
                    ]))
                    .with_fs(Fs::real()),
            )
            .sts_client(sts.clone())
            .build();
        provider.provide_credentials().await.expect("first");
        std::fs::write(&path, "second").expect("rotate token");
        provider.cache.expire();
        provider.provide_credentials().await.expect("second");
        let tokens: Vec<_> = sts
            .calls()
            .into_iter()
            .map(|call| match call {
                Call::WebIdentity(request) => request.web_identity_token,
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        assert_eq!(tokens, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn idp_errors_are_retried_once() {
        let env = [
            ("AWS_WEB_IDENTITY_TOKEN_FILE", "/token.jwt"),
            ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/eks"),
        ];
        let fs = [("/token.jwt", "jwt")];

        let sts = Arc::new(RecordingStsClient::default());
        sts.fail_next(StsError::Service(ServiceError::new(
            "IDPCommunicationError",
            None,
            400,
        )));
        provider(&env, &fs, &sts)
            .provide_credentials()
            .await
            .expect("second attempt succeeds");
        assert_eq!(sts.calls().len(), 2);

        let sts = Arc::new(RecordingStsClient::default());
        sts.fail_next(StsError::Service(ServiceError::new("AccessDenied", None, 403)));
        let err = provider(&env, &fs, &sts)
            .provide_credentials()
            .await
            .expect_err("not retried");
        assert_eq!(err.code(), "AccessDenied");
        assert_eq!(sts.calls().len(), 1);
    }

    fn profiles(selected: &'static str, properties: &[(&str, &str, &str)]) -> ProfileSet {
        let mut profiles: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (profile, key, value) in properties {
            profiles
                .entry(profile.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        ProfileSet::new(profiles, selected)
    }

    #[test]
    fn profile_settings() {
        let set = profiles(
            "a",
            &[
                ("a", "role_arn", "arn_a"),
                ("a", "source_profile", "b"),
                ("b", "role_arn", "arn_b"),
                ("b", "source_profile", "c"),
                ("c", "role_arn", "arn_c"),
                ("c", "web_identity_token_file", "/token"),
            ],
        );
        assert_eq!(
            settings_from_profile(&set).expect("valid"),
            Settings {
                web_identity: WebIdentity {
                    token_file: "/token".into(),
                    role_arn: "arn_c".to_string(),
                    session_name: None,
                },
                chain: vec![
                    ChainedRole {
                        role_arn: "arn_b".to_string(),
                        session_name: None
                    },
                    ChainedRole {
                        role_arn: "arn_a".to_string(),
                        session_name: None
                    },
                ],
            }
        );

        let set = profiles("a", &[("a", "aws_access_key_id", "akid")]);
        assert_eq!(
            settings_from_profile(&set).expect_err("no token").to_string(),
            "Profile a did not include web_identity_token_file"
        );

        let set = profiles(
            "a",
            &[
                ("a", "role_arn", "arn_a"),
                ("a", "source_profile", "a"),
            ],
        );
        assert_eq!(
            settings_from_profile(&set).expect_err("loop").to_string(),
            "Circular source_profile reference found: a -> a"
        );
    }
}
