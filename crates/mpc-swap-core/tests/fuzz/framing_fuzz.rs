//! Fuzz tests for frame decoding

use mpc_swap_core::transport::{encode_frame, read_frame};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    /// Arbitrary input decodes or errors, but never panics or over-reads
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let rt = runtime();
        rt.block_on(async {
            let mut reader = bytes.as_slice();
            for _ in 0..bytes.len() + 1 {
                match read_frame(&mut reader, 256).await {
                    Ok(Some(frame)) => assert!(frame.len() <= 256),
                    Ok(None) | Err(_) => break,
                }
            }
        });
    }

    /// A sequence of frames decodes to the same sequence of payloads
    #[test]
    fn concatenated_frames_split_back(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..8),
    ) {
        let wire: Vec<u8> = payloads.iter().flat_map(|p| encode_frame(p)).collect();
        let rt = runtime();
        let decoded = rt.block_on(async {
            let mut reader = wire.as_slice();
            let mut out = Vec::new();
            while let Some(frame) = read_frame(&mut reader, 1024).await.unwrap() {
                out.push(frame);
            }
            out
        });
        prop_assert_eq!(decoded, payloads);
    }
}
