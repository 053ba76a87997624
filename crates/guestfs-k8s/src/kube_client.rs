// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use futures::FutureExt;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::{
	api::{Api, AttachParams, DeleteParams, ListParams, PostParams},
	Client, Config,
};
use tracing::{debug, instrument};

use crate::client::K8sClient;
use crate::error::K8sError;
use crate::types::AttachedProcess;

const STATUS_FAILURE: &str = "Failure";

/// Production K8s client implementation using the kube crate.
pub struct KubeClient {
	client: Client,
	default_namespace: String,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. KUBECONFIG environment variable
	/// 2. ~/.kube/config
	/// 3. In-cluster service account (when running in K8s)
	pub async fn new() -> Result<Self, K8sError> {
		let config = Config::infer().await?;
		let default_namespace = config.default_namespace.clone();
		let client = Client::try_from(config)?;
		debug!(namespace = %default_namespace, "K8s client initialized");
		Ok(Self {
			client,
			default_namespace,
		})
	}

	/// Namespace of the active kubeconfig context.
	pub fn default_namespace(&self) -> &str {
		&self.default_namespace
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	#[instrument(skip(self))]
	async fn get_pvc(&self, name: &str, namespace: &str) -> Result<PersistentVolumeClaim, K8sError> {
		let claims: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
		match claims.get(name).await {
			Ok(claim) => Ok(claim),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::ClaimNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self))]
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let pod_list = pods.list(&ListParams::default()).await?;
		Ok(pod_list.items)
	}

	#[instrument(skip(self, pod))]
	async fn create_pod(&self, namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		let name = pod.metadata.name.clone().unwrap_or_default();
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		match pods.create(&PostParams::default(), &pod).await {
			Ok(pod) => Ok(pod),
			Err(kube::Error::Api(err)) if err.code == 409 => Err(K8sError::PodAlreadyExists { name }),
			// 408 and 429 do not say whether the object was stored.
			Err(kube::Error::Api(err))
				if (400..500).contains(&err.code) && err.code != 408 && err.code != 429 =>
			{
				Err(K8sError::Rejected {
					code: err.code,
					message: err.message,
				})
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn get_pod(&self, name: &str, namespace: &str) -> Result<Pod, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		match pods.get(name).await {
			Ok(pod) => Ok(pod),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PodNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self))]
	async fn delete_pod(
		&self,
		name: &str,
		namespace: &str,
		grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			grace_period_seconds,
			..Default::default()
		};
		match pods.delete(name, &dp).await {
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::PodNotFound { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self))]
	async fn exec_attach(
		&self,
		name: &str,
		namespace: &str,
		container: &str,
	) -> Result<AttachedProcess, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let ap = AttachParams {
			container: Some(container.to_string()),
			stdin: true,
			stdout: true,
			stderr: false,
			tty: true,
			..Default::default()
		};

		let mut attached = pods.attach(name, &ap).await.map_err(|e| match e {
			kube::Error::Api(ref err) if err.code == 404 => K8sError::PodNotFound { name: name.into() },
			_ => K8sError::AttachError {
				message: e.to_string(),
			},
		})?;

		let stdin = attached.stdin().ok_or_else(|| K8sError::AttachError {
			message: "stdin not available".into(),
		})?;
		let stdout = attached.stdout().ok_or_else(|| K8sError::AttachError {
			message: "stdout not available".into(),
		})?;
		let resize = attached.terminal_size();
		let status = attached.take_status();

		let completion = async move {
			let status = match status {
				Some(status) => status.await,
				None => None,
			};
			attached.join().await.map_err(|e| K8sError::AttachError {
				message: e.to_string(),
			})?;
			match status {
				Some(status) if status.status.as_deref() == Some(STATUS_FAILURE) => {
					Err(K8sError::AttachError {
						message: status
							.message
							.unwrap_or_else(|| "session ended with failure status".to_string()),
					})
				}
				_ => Ok(()),
			}
		}
		.boxed();

		Ok(AttachedProcess {
			stdin: Box::pin(stdin),
			stdout: Box::pin(stdout),
			resize,
			completion,
		})
	}
}
