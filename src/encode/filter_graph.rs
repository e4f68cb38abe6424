use crate::component::AudioContribution;

/// Transcoder input index of the primary audio stream (index 0 is the piped video).
pub const PRIMARY_AUDIO_STREAM: usize = 1;

/// Output label of the final mix.
pub const MIX_LABEL: &str = "[a]";

/// Compose the `-filter_complex` graph mixing the primary audio with `auxiliary` streams.
///
/// Auxiliary stream `k` (0-based) is transcoder input `k + 2`. Each `(name, suffix)` filter of a
/// stream becomes one node `[<prev>] <name><suffix> [<s>tmp<k>]`, chained in order. The graph ends
/// with an `amix` over the primary audio and every chain's terminal label.
///
/// Returns `None` when there is nothing to mix.
pub fn compose(auxiliary: &[AudioContribution]) -> Option<String> {
    if auxiliary.is_empty() {
        return None;
    }

    let mut nodes = Vec::new();
    let mut mix_inputs = format!("[{PRIMARY_AUDIO_STREAM}:a]");
    for (i, contribution) in auxiliary.iter().enumerate() {
        let stream = PRIMARY_AUDIO_STREAM + 1 + i;
        let mut prev = format!("[{stream}:a]");
        for (k, (name, suffix)) in contribution.filters.iter().enumerate() {
            let label = format!("[{stream}tmp{k}]");
            nodes.push(format!("{prev} {name}{suffix} {label}"));
            prev = label;
        }
        mix_inputs.push_str(&prev);
    }
    nodes.push(format!(
        "{mix_inputs} amix=inputs={}:duration=first {MIX_LABEL}",
        auxiliary.len() + 1
    ));
    Some(nodes.join("; "))
}

/// The `-map` value selecting the output audio: the mix when a graph exists, else the primary.
pub fn audio_map(has_graph: bool) -> String {
    if has_graph {
        MIX_LABEL.to_owned()
    } else {
        format!("{PRIMARY_AUDIO_STREAM}:a")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/filter_graph.rs"]
mod tests;
