//! Batch decoding across workers
//!
//! A channel's result must not depend on which worker decoded it or on what
//! that worker decoded before.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use qcldpc::ldpc::constants;
use qcldpc::simulation::{random_bits, AwgnChannel};
use qcldpc::tracing_init::init_test_tracing;
use qcldpc::{
    BatchConfig, BatchDecoder, DecoderConfig, HardOutput, LayeredDecoder, QcCode, QcEncoder, WorkerPool,
};

/// `channels` noisy codewords of `code`, back to back, plus the codewords
fn noisy_batch(code: &QcCode, channels: usize, ebn0_db: f32, seed: u64) -> (Vec<u8>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let encoder = QcEncoder::new(code).unwrap();
    let channel = AwgnChannel::from_ebn0(ebn0_db, code.rate()).unwrap();

    let mut codewords = Vec::new();
    for _ in 0..channels {
        let data = random_bits(&mut rng, code.geometry().k());
        codewords.extend(encoder.encode_codeword(&data).unwrap());
    }
    let llr = channel.transmit(&codewords, &mut rng);
    (codewords, llr)
}

#[test]
fn test_results_do_not_depend_on_worker() {
    init_test_tracing();
    let code = constants::ieee_802_11n_648_r12();
    let n = code.geometry().n();
    let decoder = Arc::new(LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap());

    // low enough SNR that some channels need several iterations
    let (_, llr) = noisy_batch(&code, 6, 1.5, 8);

    // one worker decoding the channels one at a time is the reference
    let mut single = BatchDecoder::new(Arc::clone(&decoder), &BatchConfig::default()).unwrap();
    let mut reference = Vec::new();
    for channel in llr.chunks(n) {
        let mut posterior = vec![0.0f32; n];
        let status = single.decode_with_worker(0, channel, &mut posterior);
        reference.push((status, posterior));
    }

    // the same six channels repeated so every worker sees each of them
    let replicated: Vec<f32> = llr.iter().copied().cycle().take(llr.len() * 4).collect();
    let config = BatchConfig { workers: 4, hard_output: HardOutput::Unpacked };
    let mut spawned = BatchDecoder::new(Arc::clone(&decoder), &config).unwrap();
    let mut pool = WorkerPool::new(Arc::clone(&decoder), &config).unwrap();

    let outputs = [
        spawned.decode_spawned(&replicated).unwrap(),
        pool.decode(&replicated).unwrap(),
        // second pool batch runs on workspaces left dirty by the first
        pool.decode(&replicated).unwrap(),
    ];

    for output in &outputs {
        assert_eq!(output.channels(), 24);
        for c in 0..24 {
            let (status, posterior) = &reference[c % 6];
            assert_eq!(&output.outcomes[c], status);
            assert_eq!(output.posterior_of(c), &posterior[..]);
        }
    }
    pool.shutdown();
}

#[test]
fn test_batch_recovers_codewords() {
    let code = constants::ieee_802_11n_648_r12();
    let decoder = Arc::new(LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap());
    let (codewords, llr) = noisy_batch(&code, 8, 6.0, 21);

    let config = BatchConfig { workers: 2, hard_output: HardOutput::Unpacked };
    let mut pool = WorkerPool::new(decoder, &config).unwrap();
    let output = pool.decode(&llr).unwrap();

    assert_eq!(output.converged_count(), 8);
    assert_eq!(output.hard_bits, codewords);
}

#[test]
fn test_packed_output_of_split_batch() {
    let code = constants::demo_code();
    let decoder = Arc::new(LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap());
    let mut llr = vec![2.0f32; 48 * 4];
    // one weak error in channel 2, decoded by the second worker
    llr[2 * 48] = -0.5;

    let config = BatchConfig { workers: 2, hard_output: HardOutput::Packed };
    let mut spawned = BatchDecoder::new(decoder, &config).unwrap();
    let output = spawned.decode_spawned(&llr).unwrap();

    assert_eq!(output.outcomes.len(), 4);
    assert_eq!(output.converged_count(), 4);
    assert_eq!(output.hard_bits.len(), 4 * 6);
    assert!(output.hard_bits.iter().all(|&b| b == 0));
}
