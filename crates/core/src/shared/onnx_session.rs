use std::path::Path;

/// Platform execution providers, CPU when none applies.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Opens an ONNX Runtime session with the settings every adapter shares.
///
/// Inference is latency-bound (one frame at a time), so all cores go to
/// intra-op parallelism.
pub fn open_session(
    model_path: &Path,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    log::info!("Loading ONNX model {}", model_path.display());
    let session = ort::session::Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Square input resolution declared by an NCHW model, if static.
pub fn square_input_size(session: &ort::session::Session) -> Option<u32> {
    session.inputs().first().and_then(|input| {
        if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
            if shape.len() >= 4 && shape[2] > 0 {
                return Some(shape[2] as u32);
            }
        }
        None
    })
}
