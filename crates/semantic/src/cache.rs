//! Cached ONNX environment and session handle.
//!
//! The ONNX Runtime `Environment` is process-wide and expensive to build
//! more than once; the `Session` is tied to one model file. Both are loaded
//! lazily and kept behind a `Mutex` so the engine can serialize concurrent
//! `embed_*` calls onto a single-inference-at-a-time session, as the runtime
//! does not promise thread safety for concurrent `run` calls.

use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use onnxruntime::environment::Environment;
use onnxruntime::session::Session;

use crate::error::SemanticError;

static ORT_ENV: OnceCell<Environment> = OnceCell::new();

fn ort_environment() -> Result<&'static Environment, SemanticError> {
    ORT_ENV.get_or_try_init(|| {
        Environment::builder()
            .with_name("webindex-semantic")
            .build()
            .map_err(|e| SemanticError::InferenceFailed(e.to_string()))
    })
}

pub(crate) struct ModelHandle {
    pub(crate) session: Mutex<Session<'static>>,
}

impl ModelHandle {
    pub(crate) fn load(model_path: &Path) -> Result<Self, SemanticError> {
        if !model_path.exists() {
            return Err(SemanticError::ModelUnavailable(
                model_path.display().to_string(),
            ));
        }

        let env = ort_environment()?;
        let session = env
            .new_session_builder()
            .map_err(|e| SemanticError::InferenceFailed(e.to_string()))?
            .with_model_from_file(model_path)
            .map_err(|e| SemanticError::InferenceFailed(e.to_string()))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}
