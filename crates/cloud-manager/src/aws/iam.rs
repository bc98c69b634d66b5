use aws_sdk_iam::Client;

use crate::api::{
    BoxFuture, IamApi, InstanceProfileDescription, NewServerCert, Page, RoleDescription,
    ServerCert, ServerCertMetadata,
};
use crate::aws::sdk_error;
use crate::error::CloudError;

/// IAM caps list pages at 1000 items.
const MAX_ITEMS: i32 = 1000;

pub struct AwsIam {
    client: Client,
}

impl AwsIam {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn role_description(role: &aws_sdk_iam::types::Role) -> RoleDescription {
    RoleDescription {
        role_name: role.role_name().to_string(),
        path: role.path().to_string(),
        arn: role.arn().to_string(),
        assume_role_policy_document: role
            .assume_role_policy_document()
            .unwrap_or_default()
            .to_string(),
    }
}

fn instance_profile_description(
    profile: &aws_sdk_iam::types::InstanceProfile,
) -> InstanceProfileDescription {
    InstanceProfileDescription {
        instance_profile_name: profile.instance_profile_name().to_string(),
        path: profile.path().to_string(),
        arn: profile.arn().to_string(),
        role_names: profile
            .roles()
            .iter()
            .map(|r| r.role_name().to_string())
            .collect(),
    }
}

fn cert_metadata(meta: &aws_sdk_iam::types::ServerCertificateMetadata) -> ServerCertMetadata {
    ServerCertMetadata {
        name: meta.server_certificate_name().to_string(),
        path: meta.path().to_string(),
        arn: meta.arn().to_string(),
    }
}

impl IamApi for AwsIam {
    fn list_roles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<RoleDescription>, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_roles()
                .path_prefix(path_prefix)
                .max_items(MAX_ITEMS)
                .send()
                .await
                .map_err(|e| sdk_error("iam:ListRoles", e))?;
            Ok(Page {
                items: resp.roles().iter().map(role_description).collect(),
                truncated: resp.is_truncated(),
            })
        })
    }

    fn list_attached_role_policy_arns<'a>(
        &'a self,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<Page<String>, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_attached_role_policies()
                .role_name(role_name)
                .max_items(MAX_ITEMS)
                .send()
                .await
                .map_err(|e| sdk_error("iam:ListAttachedRolePolicies", e))?;
            Ok(Page {
                items: resp
                    .attached_policies()
                    .iter()
                    .filter_map(|p| p.policy_arn().map(String::from))
                    .collect(),
                truncated: resp.is_truncated(),
            })
        })
    }

    fn find_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, CloudError>> {
        Box::pin(async move {
            match self
                .client
                .get_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .send()
                .await
            {
                Ok(resp) => Ok(Some(resp.policy_document().to_string())),
                Err(e) => {
                    let is_not_found = e
                        .as_service_error()
                        .map(|se| se.is_no_such_entity_exception())
                        .unwrap_or(false);
                    if is_not_found {
                        return Ok(None);
                    }
                    Err(sdk_error("iam:GetRolePolicy", e))
                }
            }
        })
    }

    fn create_role<'a>(
        &'a self,
        path: &'a str,
        role_name: &'a str,
        assume_role_policy_document: &'a str,
    ) -> BoxFuture<'a, Result<RoleDescription, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_role()
                .path(path)
                .role_name(role_name)
                .assume_role_policy_document(assume_role_policy_document)
                .send()
                .await
                .map_err(|e| sdk_error("iam:CreateRole", e))?;
            resp.role().map(role_description).ok_or_else(|| {
                CloudError::aws(None, format!("iam:CreateRole returned no role for {role_name}"))
            })
        })
    }

    fn update_assume_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .update_assume_role_policy()
                .role_name(role_name)
                .policy_document(policy_document)
                .send()
                .await
                .map_err(|e| sdk_error("iam:UpdateAssumeRolePolicy", e))?;
            Ok(())
        })
    }

    fn put_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
        policy_document: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .put_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .policy_document(policy_document)
                .send()
                .await
                .map_err(|e| sdk_error("iam:PutRolePolicy", e))?;
            Ok(())
        })
    }

    fn delete_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .delete_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:DeleteRolePolicy", e))?;
            Ok(())
        })
    }

    fn attach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            tracing::info!(role = %role_name, policy_arn = %policy_arn, "attach role policy");
            self.client
                .attach_role_policy()
                .role_name(role_name)
                .policy_arn(policy_arn)
                .send()
                .await
                .map_err(|e| sdk_error("iam:AttachRolePolicy", e))?;
            Ok(())
        })
    }

    fn detach_role_policy<'a>(
        &'a self,
        role_name: &'a str,
        policy_arn: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            tracing::info!(role = %role_name, policy_arn = %policy_arn, "detach role policy");
            self.client
                .detach_role_policy()
                .role_name(role_name)
                .policy_arn(policy_arn)
                .send()
                .await
                .map_err(|e| sdk_error("iam:DetachRolePolicy", e))?;
            Ok(())
        })
    }

    fn delete_role<'a>(&'a self, role_name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .delete_role()
                .role_name(role_name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:DeleteRole", e))?;
            Ok(())
        })
    }

    fn list_instance_profiles<'a>(
        &'a self,
        path_prefix: &'a str,
    ) -> BoxFuture<'a, Result<Page<InstanceProfileDescription>, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .list_instance_profiles()
                .path_prefix(path_prefix)
                .max_items(MAX_ITEMS)
                .send()
                .await
                .map_err(|e| sdk_error("iam:ListInstanceProfiles", e))?;
            Ok(Page {
                items: resp
                    .instance_profiles()
                    .iter()
                    .map(instance_profile_description)
                    .collect(),
                truncated: resp.is_truncated(),
            })
        })
    }

    fn create_instance_profile<'a>(
        &'a self,
        path: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<InstanceProfileDescription, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .create_instance_profile()
                .path(path)
                .instance_profile_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:CreateInstanceProfile", e))?;
            resp.instance_profile()
                .map(instance_profile_description)
                .ok_or_else(|| {
                    CloudError::aws(
                        None,
                        format!("iam:CreateInstanceProfile returned no profile for {name}"),
                    )
                })
        })
    }

    fn add_role_to_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .add_role_to_instance_profile()
                .instance_profile_name(profile_name)
                .role_name(role_name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:AddRoleToInstanceProfile", e))?;
            Ok(())
        })
    }

    fn remove_role_from_instance_profile<'a>(
        &'a self,
        profile_name: &'a str,
        role_name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .remove_role_from_instance_profile()
                .instance_profile_name(profile_name)
                .role_name(role_name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:RemoveRoleFromInstanceProfile", e))?;
            Ok(())
        })
    }

    fn delete_instance_profile<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .delete_instance_profile()
                .instance_profile_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:DeleteInstanceProfile", e))?;
            Ok(())
        })
    }

    fn upload_server_cert<'a>(
        &'a self,
        cert: &'a NewServerCert,
    ) -> BoxFuture<'a, Result<ServerCertMetadata, CloudError>> {
        Box::pin(async move {
            let resp = self
                .client
                .upload_server_certificate()
                .path(&cert.path)
                .server_certificate_name(&cert.name)
                .certificate_body(&cert.certificate_body)
                .private_key(&cert.private_key)
                .set_certificate_chain(cert.certificate_chain.clone())
                .send()
                .await
                .map_err(|e| sdk_error("iam:UploadServerCertificate", e))?;
            resp.server_certificate_metadata()
                .map(cert_metadata)
                .ok_or_else(|| {
                    CloudError::aws(
                        None,
                        format!("iam:UploadServerCertificate returned no metadata for {}", cert.name),
                    )
                })
        })
    }

    fn find_server_cert<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<ServerCert>, CloudError>> {
        Box::pin(async move {
            match self
                .client
                .get_server_certificate()
                .server_certificate_name(name)
                .send()
                .await
            {
                Ok(resp) => Ok(resp.server_certificate().and_then(|cert| {
                    cert.server_certificate_metadata().map(|meta| ServerCert {
                        metadata: cert_metadata(meta),
                        certificate_body: cert.certificate_body().to_string(),
                    })
                })),
                Err(e) => {
                    let is_not_found = e
                        .as_service_error()
                        .map(|se| se.is_no_such_entity_exception())
                        .unwrap_or(false);
                    if is_not_found {
                        return Ok(None);
                    }
                    Err(sdk_error("iam:GetServerCertificate", e))
                }
            }
        })
    }

    fn delete_server_cert<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CloudError>> {
        Box::pin(async move {
            self.client
                .delete_server_certificate()
                .server_certificate_name(name)
                .send()
                .await
                .map_err(|e| sdk_error("iam:DeleteServerCertificate", e))?;
            Ok(())
        })
    }
}
