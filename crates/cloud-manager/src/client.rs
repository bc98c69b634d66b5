use std::sync::Arc;

use crate::api::{ElbApi, IamApi};
use crate::aws::{AwsElb, AwsIam};
use crate::credentials::{self, CREDENTIALS_FILE};
use crate::env::Environment;
use crate::error::CloudError;

/// Service clients shared by loaders and tasks.
#[derive(Clone)]
pub struct Clients {
    pub iam: Arc<dyn IamApi>,
    pub elb: Arc<dyn ElbApi>,
}

impl Clients {
    pub fn new(iam: Arc<dyn IamApi>, elb: Arc<dyn ElbApi>) -> Self {
        Self { iam, elb }
    }

    /// Build SDK-backed clients for the environment's region.
    pub async fn initialize(env: &Environment) -> Result<Self, CloudError> {
        tracing::info!(region = %env.region, "initialize aws clients");
        let config = build_sdk_config(env).await?;
        Ok(Self::new(
            Arc::new(AwsIam::new(aws_sdk_iam::Client::new(&config))),
            Arc::new(AwsElb::new(aws_sdk_elasticloadbalancing::Client::new(
                &config,
            ))),
        ))
    }
}

async fn build_sdk_config(env: &Environment) -> Result<aws_config::SdkConfig, CloudError> {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(env.region.clone()));

    if let Some(creds) = credentials::load(&env.env_dir)? {
        builder = builder.credentials_provider(aws_sdk_iam::config::Credentials::new(
            creds.access_key,
            creds.secret_key,
            None,
            None,
            CREDENTIALS_FILE,
        ));
    }

    Ok(builder.load().await)
}
