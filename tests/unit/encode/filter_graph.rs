use std::path::PathBuf;

use super::*;

fn contribution(path: &str, filters: &[(&str, &str)]) -> AudioContribution {
    AudioContribution {
        source: PathBuf::from(path),
        filters: filters
            .iter()
            .map(|(n, s)| ((*n).to_owned(), (*s).to_owned()))
            .collect(),
    }
}

#[test]
fn no_auxiliary_inputs_means_no_graph() {
    assert_eq!(compose(&[]), None);
    assert_eq!(audio_map(false), "1:a");
}

#[test]
fn single_volume_filter_matches_expected_graph() {
    let aux = [contribution("a.wav", &[("volume", "=0.5:replaygain_noclip=0")])];
    assert_eq!(
        compose(&aux).as_deref(),
        Some("[2:a] volume=0.5:replaygain_noclip=0 [2tmp0]; [1:a][2tmp0] amix=inputs=2:duration=first [a]")
    );
    assert_eq!(audio_map(true), "[a]");
}

#[test]
fn filters_chain_in_declared_order() {
    let aux = [contribution(
        "a.wav",
        &[("adelay", "=500"), ("volume", "=2:replaygain_noclip=0")],
    )];
    assert_eq!(
        compose(&aux).as_deref(),
        Some(
            "[2:a] adelay=500 [2tmp0]; [2tmp0] volume=2:replaygain_noclip=0 [2tmp1]; \
             [1:a][2tmp1] amix=inputs=2:duration=first [a]"
        )
    );
}

#[test]
fn unfiltered_stream_feeds_mix_directly() {
    let aux = [
        contribution("a.wav", &[]),
        contribution("b.wav", &[("volume", "=0.3:replaygain_noclip=0")]),
    ];
    assert_eq!(
        compose(&aux).as_deref(),
        Some(
            "[3:a] volume=0.3:replaygain_noclip=0 [3tmp0]; \
             [1:a][2:a][3tmp0] amix=inputs=3:duration=first [a]"
        )
    );
}
