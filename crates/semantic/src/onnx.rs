//! ONNX inference path: builds the input tensors, runs the session, and
//! mean-pools the hidden-state output.

use onnxruntime::ndarray::Array2;

use crate::cache::ModelHandle;
use crate::error::SemanticError;

/// Runs one forward pass for a single token sequence and mean-pools the
/// hidden state over the full sequence length.
///
/// The mean does not mask `[CLS]`/`[SEP]` out: every call here is a single,
/// unpadded sequence (one passage or one query string), matching how the
/// stored passage embeddings were produced. Batched, padded inference is out
/// of scope; if it is added later it must mask padding positions out of the
/// mean instead of reusing this function unmodified.
pub(crate) fn run_inference(
    handle: &ModelHandle,
    token_ids: &[u32],
    embedding_dim: usize,
) -> Result<Vec<f32>, SemanticError> {
    let seq_len = token_ids.len();
    if seq_len == 0 {
        return Err(SemanticError::InferenceFailed(
            "cannot embed an empty token sequence".into(),
        ));
    }

    let ids: Vec<i64> = token_ids.iter().map(|&id| id as i64).collect();
    let input_ids = Array2::from_shape_vec((1, seq_len), ids)
        .map_err(|e| SemanticError::InferenceFailed(e.to_string()))?;
    let attention_mask = Array2::<i64>::from_elem((1, seq_len), 1);

    let mut session = handle
        .session
        .lock()
        .map_err(|_| SemanticError::InferenceFailed("model session mutex poisoned".into()))?;

    // `Session::run` binds inputs to `session.inputs` by position, not by
    // name: a model export that declares its inputs in a different order
    // than `[input_ids, attention_mask, token_type_ids]` would silently
    // swap the all-1s attention mask with the all-0s token-type ids. Walk
    // `session.inputs` and dispatch each array by `input.name` instead, the
    // way the teacher's `execute_session` does.
    let mut input_ids_tensor = Some(input_ids);
    let mut attention_mask_tensor = Some(attention_mask);
    let mut runtime_inputs = Vec::with_capacity(session.inputs.len());

    for input in &session.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    SemanticError::InferenceFailed(
                        "model requested `input_ids` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attention_mask_tensor.take().ok_or_else(|| {
                    SemanticError::InferenceFailed(
                        "model requested `attention_mask` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                runtime_inputs.push(Array2::<i64>::from_elem((1, seq_len), 0).into_dyn());
            }
            other => {
                return Err(SemanticError::InferenceFailed(format!(
                    "unsupported model input `{other}`"
                )));
            }
        }
    }

    if runtime_inputs.is_empty() {
        return Err(SemanticError::InferenceFailed(
            "model did not declare any inputs".into(),
        ));
    }

    let outputs: Vec<onnxruntime::tensor::OrtOwnedTensor<f32, _>> = session
        .run(runtime_inputs)
        .map_err(|e| SemanticError::InferenceFailed(e.to_string()))?;

    let hidden_state = outputs
        .first()
        .ok_or_else(|| SemanticError::InferenceFailed("model produced no output tensor".into()))?;
    let flat: Vec<f32> = hidden_state.iter().copied().collect();

    if flat.len() != seq_len * embedding_dim {
        return Err(SemanticError::InferenceFailed(format!(
            "output tensor has {} values, expected {seq_len} x {embedding_dim}",
            flat.len()
        )));
    }

    let mut pooled = vec![0.0f32; embedding_dim];
    for pos in 0..seq_len {
        let base = pos * embedding_dim;
        for (d, slot) in pooled.iter_mut().enumerate() {
            *slot += flat[base + d];
        }
    }
    for value in pooled.iter_mut() {
        *value /= seq_len as f32;
    }

    Ok(pooled)
}
