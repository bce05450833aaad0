// Path: crates/node/src/prove.rs
//! The prove pipeline: decrypt, validate, route to a backend, resolve the
//! project, and shape the result.

use crate::project::{Project, ProjectManager};
use crate::prover::circom::{CircomBackend, CircomOp};
use crate::prover::gnark::PrivateBackend;
use crate::prover::ProverId;
use crate::validator::{ProviderResolver, ValidatorRegistry};
use provenet_crypto::KeyCache;
use provenet_ipc::backend::BackendProveResponse;
use provenet_types::config::{NodeConfig, PRIVATE_KEY_FILE, PUBLIC_KEY_FILE};
use provenet_types::error::ProveError;
use provenet_types::response::WireCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Wire value selecting ZKLOGIN validation.
pub const TASK_TYPE_ZKLOGIN: i32 = 1;
/// Wire value selecting TIGA validation.
pub const TASK_TYPE_TIGA: i32 = 2;
/// Provider used when a request names none.
pub const DEFAULT_OAUTH_PROVIDER: &str = "google";

/// Validation family for a task. Zero on the wire means "unspecified" and
/// defaults to ZKLOGIN; any other unknown value is a capability error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskType {
    ZkLogin,
    Tiga,
}

impl TaskType {
    fn from_wire(code: i32) -> Result<Self, ProveError> {
        match code {
            0 | TASK_TYPE_ZKLOGIN => Ok(Self::ZkLogin),
            TASK_TYPE_TIGA => Ok(Self::Tiga),
            other => Err(ProveError::UnsupportedTaskType(other)),
        }
    }
}

/// One prove request, shared by the HTTP and RPC surfaces.
#[derive(Debug, Clone, Default)]
pub struct ProveParams {
    /// Backend selector (`circom`, `private`).
    pub prover_id: String,
    /// Circuit template the proof targets.
    pub circuit_template_id: String,
    /// The payload, possibly ciphertext.
    pub payload: String,
    /// Whether `payload` is encrypted under the node's crypto public key.
    pub is_encrypted: bool,
    /// Opaque auth token, passed through untouched.
    pub auth_token: String,
    /// Validation family; `0` defaults to ZKLOGIN.
    pub task_type: i32,
    /// Input length hint for the nosha256 variants.
    pub length: u32,
    /// Requested payload validator; empty defaults to `google`.
    pub oauth_provider: String,
}

/// Outcome of one prove call.
#[derive(Debug, Clone, Default)]
pub struct ProofResult {
    /// Numeric wire code; `0` on success.
    pub code: i32,
    /// Outcome message.
    pub msg: String,
    /// Proof as JSON text.
    pub proof: Option<String>,
    /// Solidity-calldata rendering of the proof (v2).
    pub proof_solidity: Option<String>,
    /// Raw proof bytes (offchain variants, v2).
    pub proof_bytes: Option<Vec<u8>>,
    /// Public witness as JSON text (v2).
    pub public_witness: Option<String>,
    /// Raw public witness bytes (v2).
    pub public_witness_bytes: Option<Vec<u8>>,
    /// Witness as JSON text (v1 witness variants).
    pub witness: Option<String>,
    /// Project resolved from the witness tag, when a proof came back.
    pub project_name: Option<String>,
    /// Verifiers attached to the resolved project.
    pub verifiers: Vec<String>,
    /// Wall-clock pipeline duration, milliseconds.
    pub duration_ms: Option<u64>,
}

impl ProofResult {
    fn failure(e: &ProveError) -> Self {
        Self {
            code: WireCode::from(e).code(),
            msg: e.to_string(),
            ..Self::default()
        }
    }

    /// Whether the result carries a project to report to the hub.
    pub fn has_project(&self) -> bool {
        self.project_name.is_some()
    }
}

fn none_if_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn none_if_empty_bytes(b: Vec<u8>) -> Option<Vec<u8>> {
    if b.is_empty() {
        None
    } else {
        Some(b)
    }
}

/// The tag a proof carries: the last element of a JSON array, rendered as
/// text whether it is a string or a number.
fn witness_tag(json_text: &str) -> Option<String> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json_text).ok()?;
    match values.last()? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// The node's prove pipeline. One instance serves both endpoints.
pub struct ProveService {
    crypto_keys: Arc<KeyCache>,
    crypto_public_key_path: PathBuf,
    projects: Arc<ProjectManager>,
    validators: Arc<ValidatorRegistry>,
    resolver: Arc<ProviderResolver>,
    circom: CircomBackend,
    private: PrivateBackend,
    privileged_circuits: Vec<String>,
}

impl ProveService {
    /// Wire the pipeline from a loaded profile. Validators are registered
    /// by the caller before serving; an empty registry rejects every
    /// ZKLOGIN request with `UNSUPPORTED_OAUTH_PROVIDER`.
    pub fn new(config: &NodeConfig, validators: Arc<ValidatorRegistry>) -> Self {
        let crypto_dir = Path::new(&config.crypto_keys_path);
        Self {
            crypto_keys: Arc::new(KeyCache::new_pair(
                crypto_dir.join(PRIVATE_KEY_FILE),
                crypto_dir.join(PUBLIC_KEY_FILE),
            )),
            crypto_public_key_path: crypto_dir.join(PUBLIC_KEY_FILE),
            projects: Arc::new(ProjectManager::load(Path::new(&config.project_path))),
            validators,
            resolver: Arc::new(ProviderResolver::load(Path::new(
                &config.provider_resolver_path,
            ))),
            circom: CircomBackend::new(&config.prover.circom_address, config.prover.max_connections),
            private: PrivateBackend::new(
                &config.prover.private_address,
                config.prover.max_connections,
            ),
            privileged_circuits: config.prover.privileged_circuits.clone(),
        }
    }

    /// Decrypt the payload when flagged encrypted.
    async fn process_input(&self, payload: &str, is_encrypted: bool) -> Result<String, ProveError> {
        if !is_encrypted {
            return Ok(payload.to_string());
        }
        // A missing and an unusable key file both leave the node without a
        // working private key.
        let envelope = self
            .crypto_keys
            .envelope()
            .await
            .map_err(|_| ProveError::PrivateKeyNotFound)?;
        envelope
            .decrypt(payload)
            .map_err(|_| ProveError::PrivateKeyInvalid)
    }

    /// Admission check per task type.
    async fn validate(
        &self,
        task_type: TaskType,
        circuit_template_id: &str,
        payload: &str,
        requested_provider: &str,
    ) -> Result<(), ProveError> {
        match task_type {
            TaskType::ZkLogin => {
                let provider = self
                    .resolver
                    .resolve(circuit_template_id)
                    .unwrap_or(requested_provider);
                let validator = self
                    .validators
                    .get(provider)
                    .ok_or_else(|| ProveError::UnsupportedOauthProvider(provider.to_string()))?;
                if !validator.verify(payload).await {
                    return Err(ProveError::UnauthorizedPayload);
                }
                Ok(())
            }
            TaskType::Tiga => {
                if self
                    .privileged_circuits
                    .iter()
                    .any(|c| c == circuit_template_id)
                {
                    return Ok(());
                }
                let value: serde_json::Value =
                    serde_json::from_str(payload).map_err(|_| ProveError::UnauthorizedPayload)?;
                match value.get("modules") {
                    Some(modules) if !modules.is_null() => Err(ProveError::UnauthorizedPayload),
                    _ => Ok(()),
                }
            }
        }
    }

    fn resolve_project(&self, tag_source: Option<&str>) -> Option<Project> {
        let tag = witness_tag(tag_source?)?;
        Some(self.projects.get_project(&tag))
    }

    /// v1 prove variants. Only the circom backend is reachable here.
    pub async fn prove_v1(&self, op: CircomOp, params: &ProveParams) -> ProofResult {
        let started = Instant::now();
        let result = self.prove_v1_inner(op, params, started).await;
        let outcome = match &result {
            Ok(r) => r.clone(),
            Err(e) => ProofResult::failure(e),
        };
        if outcome.code == WireCode::Successfully.code() {
            tracing::info!(
                target: "prove",
                op = ?op,
                circuit = %params.circuit_template_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "prove completed"
            );
        } else {
            tracing::error!(
                target: "prove",
                op = ?op,
                circuit = %params.circuit_template_id,
                code = outcome.code,
                msg = %outcome.msg,
                "prove failed"
            );
        }
        outcome
    }

    async fn prove_v1_inner(
        &self,
        op: CircomOp,
        params: &ProveParams,
        started: Instant,
    ) -> Result<ProofResult, ProveError> {
        let payload = self
            .process_input(&params.payload, params.is_encrypted)
            .await?;
        let task_type = TaskType::from_wire(params.task_type)?;
        let provider = if params.oauth_provider.is_empty() {
            DEFAULT_OAUTH_PROVIDER
        } else {
            params.oauth_provider.as_str()
        };
        self.validate(task_type, &params.circuit_template_id, &payload, provider)
            .await?;

        match ProverId::parse(&params.prover_id)? {
            ProverId::Circom => {}
            ProverId::Private => {
                return Err(ProveError::UnsupportedProver(params.prover_id.clone()))
            }
        }

        let response = self
            .circom
            .prove(op, &payload, &params.circuit_template_id, params.length)
            .await?;
        Ok(self.shape_v1(op, response, started))
    }

    fn shape_v1(
        &self,
        op: CircomOp,
        response: BackendProveResponse,
        started: Instant,
    ) -> ProofResult {
        let mut result = ProofResult {
            code: response.code,
            msg: response.msg,
            proof: none_if_empty(response.proof),
            proof_bytes: none_if_empty_bytes(response.proof_bytes),
            witness: none_if_empty(response.witness_data),
            ..ProofResult::default()
        };
        let produced_proof = result.proof.is_some() || result.proof_bytes.is_some();
        if produced_proof {
            let tag_source = match op {
                CircomOp::Prove | CircomOp::Nosha256 => result.proof.as_deref(),
                CircomOp::Nosha256WithWitness | CircomOp::Nosha256Offchain => {
                    result.witness.as_deref()
                }
            };
            if let Some(project) = self.resolve_project(tag_source) {
                result.project_name = Some(project.project_name);
                result.verifiers = project.verifiers;
                result.duration_ms = Some(started.elapsed().as_millis() as u64);
            }
        }
        result
    }

    /// v2 prove: richer result shape, private backend routing.
    pub async fn prove_v2(&self, params: &ProveParams) -> ProofResult {
        let started = Instant::now();
        let result = self.prove_v2_inner(params, started).await;
        match &result {
            Ok(r) => r.clone(),
            Err(e) => {
                tracing::error!(
                    target: "prove",
                    op = "prove_v2",
                    circuit = %params.circuit_template_id,
                    error = %e,
                    "prove failed"
                );
                ProofResult::failure(e)
            }
        }
    }

    async fn prove_v2_inner(
        &self,
        params: &ProveParams,
        started: Instant,
    ) -> Result<ProofResult, ProveError> {
        let payload = self
            .process_input(&params.payload, params.is_encrypted)
            .await?;
        let task_type = TaskType::from_wire(params.task_type)?;
        let provider = if params.oauth_provider.is_empty() {
            DEFAULT_OAUTH_PROVIDER
        } else {
            params.oauth_provider.as_str()
        };
        self.validate(task_type, &params.circuit_template_id, &payload, provider)
            .await?;

        let response = match ProverId::parse(&params.prover_id)? {
            ProverId::Circom => {
                self.circom
                    .prove(
                        CircomOp::Prove,
                        &payload,
                        &params.circuit_template_id,
                        params.length,
                    )
                    .await?
            }
            ProverId::Private => {
                self.private
                    .prove(&payload, &params.circuit_template_id)
                    .await?
            }
        };

        let mut result = ProofResult {
            code: response.code,
            msg: response.msg,
            proof: none_if_empty(response.proof),
            proof_solidity: none_if_empty(response.proof_solidity),
            proof_bytes: none_if_empty_bytes(response.proof_bytes),
            public_witness: none_if_empty(response.public_witness),
            public_witness_bytes: none_if_empty_bytes(response.public_witness_bytes),
            ..ProofResult::default()
        };
        if result.proof.is_some() || result.proof_bytes.is_some() {
            if let Some(project) = self.resolve_project(result.public_witness.as_deref()) {
                result.project_name = Some(project.project_name);
                result.verifiers = project.verifiers;
                result.duration_ms = Some(started.elapsed().as_millis() as u64);
            }
        }
        Ok(result)
    }

    /// The node's crypto public key PEM.
    pub async fn get_public_key(&self) -> Result<String, ProveError> {
        tokio::fs::read_to_string(&self.crypto_public_key_path)
            .await
            .map_err(|_| ProveError::PublicKeyNotFound)
    }

    /// Pre-open `n` keep-alive channels to each backend so the first prove
    /// request does not pay connection setup.
    pub fn warmup(&self, n: usize) -> Result<(), ProveError> {
        self.circom.warmup(n)?;
        self.private.warmup(n)?;
        Ok(())
    }

    /// Close the backend pools.
    pub fn close(&self) {
        self.circom.close();
        self.private.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::tests::StaticValidator;
    use provenet_crypto::RsaEnvelope;
    use provenet_types::config::PRIVATE_KEY_FILE;

    struct Fixture {
        service: ProveService,
        envelope: RsaEnvelope,
        _dir: tempfile::TempDir,
    }

    fn fixture(validators: ValidatorRegistry) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let envelope = RsaEnvelope::generate(1024).unwrap();
        std::fs::write(
            dir.path().join(PRIVATE_KEY_FILE),
            envelope.private_key_pem().unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join(PUBLIC_KEY_FILE),
            envelope.public_key_pem().unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("project.json"),
            r#"{"10005": {"project_name": "tiga", "verifiers": ["v1"]}}"#,
        )
        .unwrap();
        let config = NodeConfig {
            crypto_keys_path: dir.path().display().to_string(),
            project_path: dir.path().join("project.json").display().to_string(),
            provider_resolver_path: dir.path().join("resolver.json").display().to_string(),
            ..NodeConfig::default()
        };
        Fixture {
            service: ProveService::new(&config, Arc::new(validators)),
            envelope,
            _dir: dir,
        }
    }

    fn zklogin_params() -> ProveParams {
        ProveParams {
            prover_id: "circom".to_string(),
            circuit_template_id: "20001".to_string(),
            payload: "{}".to_string(),
            ..ProveParams::default()
        }
    }

    #[tokio::test]
    async fn unknown_task_type_is_a_capability_error() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: 7,
            ..zklogin_params()
        };
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeUnsupportedTaskType.code());
    }

    #[tokio::test]
    async fn zklogin_without_a_registered_provider_is_rejected() {
        let f = fixture(ValidatorRegistry::new());
        let result = f.service.prove_v1(CircomOp::Prove, &zklogin_params()).await;
        assert_eq!(result.code, WireCode::NodeUnsupportedOauthProvider.code());
    }

    #[tokio::test]
    async fn zklogin_with_a_rejecting_validator_is_unauthorized() {
        let mut validators = ValidatorRegistry::new();
        validators.register("google", Arc::new(StaticValidator(false)));
        let f = fixture(validators);
        let result = f.service.prove_v1(CircomOp::Prove, &zklogin_params()).await;
        assert_eq!(result.code, WireCode::NodeUnauthorizedPayload.code());
    }

    #[tokio::test]
    async fn tiga_rejects_payloads_carrying_modules() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "30001".to_string(),
            payload: r#"{"modules": ["m1"]}"#.to_string(),
            ..zklogin_params()
        };
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeUnauthorizedPayload.code());
    }

    #[tokio::test]
    async fn tiga_privileged_circuits_skip_payload_inspection() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "10005".to_string(),
            payload: r#"{"modules": ["m1"]}"#.to_string(),
            ..zklogin_params()
        };
        // Admission passes; the failure is the unreachable backend.
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeProverNotResponse.code());
    }

    #[tokio::test]
    async fn unknown_prover_is_a_capability_error() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "10005".to_string(),
            prover_id: "halo2".to_string(),
            ..zklogin_params()
        };
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeUnsupportedProver.code());
    }

    #[tokio::test]
    async fn v1_cannot_reach_the_private_backend() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "10005".to_string(),
            prover_id: "private".to_string(),
            ..zklogin_params()
        };
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeUnsupportedProver.code());
    }

    #[tokio::test]
    async fn v2_routes_privileged_circuits_to_the_private_backend() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "10005".to_string(),
            prover_id: "private".to_string(),
            ..zklogin_params()
        };
        // 10005 routes; the unreachable backend surfaces as not responding.
        let result = f.service.prove_v2(&params).await;
        assert_eq!(result.code, WireCode::NodeProverNotResponse.code());
    }

    #[tokio::test]
    async fn v2_rejects_circuits_the_private_backend_cannot_route() {
        let mut validators = ValidatorRegistry::new();
        validators.register("google", Arc::new(StaticValidator(true)));
        let f = fixture(validators);
        let params = ProveParams {
            circuit_template_id: "30001".to_string(),
            prover_id: "private".to_string(),
            ..zklogin_params()
        };
        let result = f.service.prove_v2(&params).await;
        assert_eq!(result.code, WireCode::NodeUnsupportedTaskType.code());
        assert!(result.msg.contains("30001"));
    }

    #[tokio::test]
    async fn encrypted_payload_decrypts_before_validation() {
        let f = fixture(ValidatorRegistry::new());
        let ciphertext = f.envelope.encrypt(r#"{"modules": ["m1"]}"#).unwrap();
        let params = ProveParams {
            task_type: TASK_TYPE_TIGA,
            circuit_template_id: "30001".to_string(),
            payload: ciphertext,
            is_encrypted: true,
            ..zklogin_params()
        };
        // The rejected `modules` key is only visible after decryption.
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodeUnauthorizedPayload.code());
    }

    #[tokio::test]
    async fn undecryptable_payload_is_private_key_invalid() {
        let f = fixture(ValidatorRegistry::new());
        let params = ProveParams {
            payload: "!!garbage!!".to_string(),
            is_encrypted: true,
            ..zklogin_params()
        };
        let result = f.service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodePrivateKeyInvalid.code());
    }

    #[tokio::test]
    async fn missing_crypto_key_is_private_key_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = NodeConfig {
            crypto_keys_path: dir.path().join("absent").display().to_string(),
            project_path: dir.path().join("project.json").display().to_string(),
            provider_resolver_path: dir.path().join("resolver.json").display().to_string(),
            ..NodeConfig::default()
        };
        let service = ProveService::new(&config, Arc::new(ValidatorRegistry::new()));
        let params = ProveParams {
            payload: "anything".to_string(),
            is_encrypted: true,
            ..ProveParams::default()
        };
        let result = service.prove_v1(CircomOp::Prove, &params).await;
        assert_eq!(result.code, WireCode::NodePrivateKeyNotFound.code());
    }

    #[test]
    fn witness_tags_render_strings_and_numbers() {
        assert_eq!(witness_tag(r#"["a", "10005"]"#).unwrap(), "10005");
        assert_eq!(witness_tag(r#"[1, 2, 10005]"#).unwrap(), "10005");
        assert!(witness_tag("not json").is_none());
        assert!(witness_tag("[]").is_none());
    }
}
