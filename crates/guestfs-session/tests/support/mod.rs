// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use guestfs_k8s::{
	AttachedProcess, K8sClient, K8sError, PersistentVolumeClaim, PersistentVolumeClaimSpec,
	PersistentVolumeClaimVolumeSource, Pod, PodSpec, PodStatus, Volume,
};
use guestfs_session::{
	AttachError, AttachSession, PodRef, PollConfig, SessionConfig, SessionRequest, VolumeClaimRef,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const TEST_NAMESPACE: &str = "default";
pub const TEST_PVC: &str = "test-pvc";

/// Shared, ordered record of every platform and attach call.
pub type EventLog = Arc<Mutex<Vec<&'static str>>>;

/// How the mock reports the phase of a created pod.
#[derive(Debug, Clone)]
pub enum PhasePlan {
	/// Pending for this many polls, then Running.
	RunningAfter(usize),
	/// Pending forever.
	NeverReady,
	/// A fixed phase from the first poll.
	Fixed(&'static str),
	/// Reading the status panics.
	Panics,
}

/// How the mock fails pod creation.
#[derive(Debug, Clone, Copy)]
pub enum CreateFailure {
	/// The server refuses the pod; nothing is stored.
	Rejected,
	/// The connection drops before the request reaches the server.
	Transport,
	/// The pod is stored but the response never arrives.
	StoredThenTimeout,
}

pub struct MockK8sClient {
	pvcs: Mutex<HashMap<String, PersistentVolumeClaim>>,
	pods: Mutex<HashMap<String, Pod>>,
	plan: PhasePlan,
	transient_get_failures: AtomicUsize,
	create_failure: Option<CreateFailure>,
	get_pvc_successes: Option<usize>,
	fail_list_pods: bool,
	fail_delete: AtomicBool,
	pub created: Mutex<Vec<Pod>>,
	pub create_calls: AtomicUsize,
	pub get_pvc_calls: AtomicUsize,
	pub delete_calls: AtomicUsize,
	pub get_pod_calls: AtomicUsize,
	pub events: EventLog,
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self {
			pvcs: Mutex::new(HashMap::new()),
			pods: Mutex::new(HashMap::new()),
			plan: PhasePlan::RunningAfter(0),
			transient_get_failures: AtomicUsize::new(0),
			create_failure: None,
			get_pvc_successes: None,
			fail_list_pods: false,
			fail_delete: AtomicBool::new(false),
			created: Mutex::new(Vec::new()),
			create_calls: AtomicUsize::new(0),
			get_pvc_calls: AtomicUsize::new(0),
			delete_calls: AtomicUsize::new(0),
			get_pod_calls: AtomicUsize::new(0),
			events: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn with_pvc(self, name: &str, volume_mode: Option<&str>) -> Self {
		let pvc = PersistentVolumeClaim {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				namespace: Some(TEST_NAMESPACE.to_string()),
				..Default::default()
			},
			spec: Some(PersistentVolumeClaimSpec {
				volume_mode: volume_mode.map(str::to_string),
				..Default::default()
			}),
			status: None,
		};
		self.pvcs.lock().unwrap().insert(name.to_string(), pvc);
		self
	}

	pub fn with_pod(self, pod: Pod) -> Self {
		let name = pod.metadata.name.clone().unwrap_or_default();
		self.pods.lock().unwrap().insert(name, pod);
		self
	}

	pub fn with_plan(mut self, plan: PhasePlan) -> Self {
		self.plan = plan;
		self
	}

	pub fn with_transient_get_failures(self, count: usize) -> Self {
		self.transient_get_failures.store(count, Ordering::SeqCst);
		self
	}

	pub fn failing_create(self) -> Self {
		self.failing_create_with(CreateFailure::Rejected)
	}

	pub fn failing_create_with(mut self, failure: CreateFailure) -> Self {
		self.create_failure = Some(failure);
		self
	}

	/// Every claim lookup fails with a transport error.
	pub fn failing_get_pvc(self) -> Self {
		self.failing_get_pvc_after(0)
	}

	/// Claim lookups succeed `successes` times, then fail with a transport error.
	pub fn failing_get_pvc_after(mut self, successes: usize) -> Self {
		self.get_pvc_successes = Some(successes);
		self
	}

	pub fn failing_list_pods(mut self) -> Self {
		self.fail_list_pods = true;
		self
	}

	pub fn failing_delete(self) -> Self {
		self.fail_delete.store(true, Ordering::SeqCst);
		self
	}

	pub fn creates(&self) -> usize {
		self.create_calls.load(Ordering::SeqCst)
	}

	pub fn deletes(&self) -> usize {
		self.delete_calls.load(Ordering::SeqCst)
	}

	pub fn polls(&self) -> usize {
		self.get_pod_calls.load(Ordering::SeqCst)
	}

	/// Names of the pods currently on the platform.
	pub fn pod_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.pods.lock().unwrap().keys().cloned().collect();
		names.sort();
		names
	}

	pub fn events(&self) -> Vec<&'static str> {
		self.events.lock().unwrap().clone()
	}

	fn record(&self, event: &'static str) {
		self.events.lock().unwrap().push(event);
	}

	fn phase_for_poll(&self, poll: usize) -> &'static str {
		match self.plan {
			PhasePlan::RunningAfter(n) if poll >= n => "Running",
			PhasePlan::RunningAfter(_) | PhasePlan::NeverReady => "Pending",
			PhasePlan::Fixed(phase) => phase,
			PhasePlan::Panics => panic!("malformed pod status"),
		}
	}
}

/// A pod owned by someone else that mounts `claim_name`.
pub fn pod_using_claim(pod_name: &str, claim_name: &str) -> Pod {
	Pod {
		metadata: ObjectMeta {
			name: Some(pod_name.to_string()),
			namespace: Some(TEST_NAMESPACE.to_string()),
			..Default::default()
		},
		spec: Some(PodSpec {
			volumes: Some(vec![Volume {
				name: "volume-test".to_string(),
				persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
					claim_name: claim_name.to_string(),
					read_only: None,
				}),
				..Default::default()
			}]),
			..Default::default()
		}),
		status: None,
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn get_pvc(&self, name: &str, _namespace: &str) -> Result<PersistentVolumeClaim, K8sError> {
		self.record("get_pvc");
		let call = self.get_pvc_calls.fetch_add(1, Ordering::SeqCst);
		if matches!(self.get_pvc_successes, Some(successes) if call >= successes) {
			return Err(K8sError::ApiError {
				message: "dial tcp 10.0.0.1:6443: connect: connection refused".to_string(),
			});
		}
		self
			.pvcs
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| K8sError::ClaimNotFound {
				name: name.to_string(),
			})
	}

	async fn list_pods(&self, _namespace: &str) -> Result<Vec<Pod>, K8sError> {
		self.record("list_pods");
		if self.fail_list_pods {
			return Err(K8sError::ApiError {
				message: "the server is currently unable to handle the request".to_string(),
			});
		}
		Ok(self.pods.lock().unwrap().values().cloned().collect())
	}

	async fn create_pod(&self, _namespace: &str, pod: Pod) -> Result<Pod, K8sError> {
		self.record("create_pod");
		self.create_calls.fetch_add(1, Ordering::SeqCst);
		match self.create_failure {
			Some(CreateFailure::Rejected) => {
				return Err(K8sError::Rejected {
					code: 403,
					message: "admission webhook denied the request".to_string(),
				});
			}
			Some(CreateFailure::Transport) => {
				return Err(K8sError::ApiError {
					message: "connection reset by peer".to_string(),
				});
			}
			Some(CreateFailure::StoredThenTimeout) | None => {}
		}

		let name = pod.metadata.name.clone().unwrap_or_default();
		let mut pods = self.pods.lock().unwrap();
		if pods.contains_key(&name) {
			return Err(K8sError::PodAlreadyExists { name });
		}
		pods.insert(name, pod.clone());
		self.created.lock().unwrap().push(pod.clone());
		if matches!(self.create_failure, Some(CreateFailure::StoredThenTimeout)) {
			return Err(K8sError::Timeout);
		}
		Ok(pod)
	}

	async fn get_pod(&self, name: &str, _namespace: &str) -> Result<Pod, K8sError> {
		let poll = self.get_pod_calls.fetch_add(1, Ordering::SeqCst);
		self.record("get_pod");

		let remaining = self.transient_get_failures.load(Ordering::SeqCst);
		if remaining > 0 {
			self
				.transient_get_failures
				.store(remaining - 1, Ordering::SeqCst);
			return Err(K8sError::ApiError {
				message: "connection reset by peer".to_string(),
			});
		}

		let mut pod = self
			.pods
			.lock()
			.unwrap()
			.get(name)
			.cloned()
			.ok_or_else(|| K8sError::PodNotFound {
				name: name.to_string(),
			})?;
		pod.status = Some(PodStatus {
			phase: Some(self.phase_for_poll(poll).to_string()),
			..Default::default()
		});
		Ok(pod)
	}

	async fn delete_pod(
		&self,
		name: &str,
		_namespace: &str,
		_grace_period_seconds: Option<u32>,
	) -> Result<(), K8sError> {
		self.record("delete_pod");
		self.delete_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(K8sError::ApiError {
				message: "etcdserver: request timed out".to_string(),
			});
		}
		match self.pods.lock().unwrap().remove(name) {
			Some(_) => Ok(()),
			None => Err(K8sError::PodNotFound {
				name: name.to_string(),
			}),
		}
	}

	async fn exec_attach(
		&self,
		_name: &str,
		_namespace: &str,
		_container: &str,
	) -> Result<AttachedProcess, K8sError> {
		Err(K8sError::AttachError {
			message: "attach is not supported by the mock".to_string(),
		})
	}
}

/// Attacher that records calls instead of touching a terminal.
pub struct RecordingAttacher {
	events: EventLog,
	fail: bool,
	hold: Option<Duration>,
	pub calls: AtomicUsize,
	pub attached: Mutex<Vec<(PodRef, String)>>,
}

impl RecordingAttacher {
	pub fn new(events: EventLog) -> Self {
		Self {
			events,
			fail: false,
			hold: None,
			calls: AtomicUsize::new(0),
			attached: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(mut self) -> Self {
		self.fail = true;
		self
	}

	/// Keep the session open for `duration` before returning.
	pub fn holding(mut self, duration: Duration) -> Self {
		self.hold = Some(duration);
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl AttachSession for RecordingAttacher {
	async fn attach(&self, pod: &PodRef, command: &str) -> Result<(), AttachError> {
		self.events.lock().unwrap().push("attach");
		self.calls.fetch_add(1, Ordering::SeqCst);
		self
			.attached
			.lock()
			.unwrap()
			.push((pod.clone(), command.to_string()));

		if let Some(hold) = self.hold {
			tokio::time::sleep(hold).await;
		}
		if self.fail {
			return Err(AttachError::new(&pod.name, "websocket closed with code 1006"));
		}
		Ok(())
	}
}

pub fn test_request() -> SessionRequest {
	SessionRequest {
		claim: VolumeClaimRef::new(TEST_PVC, TEST_NAMESPACE),
		image: "docker.io/afrosirh/libguestfs-tools:latest".to_string(),
		command: "/bin/bash".to_string(),
		args: Vec::new(),
	}
}

/// Fast polling and a short readiness timeout.
pub fn test_config() -> SessionConfig {
	SessionConfig {
		ready_timeout: Duration::from_millis(300),
		poll: PollConfig {
			base_delay: Duration::from_millis(5),
			max_delay: Duration::from_millis(20),
			backoff_factor: 2.0,
			jitter: true,
		},
		cleanup_timeout: Duration::from_secs(1),
		..Default::default()
	}
}
