//! End to end encode, channel and decode tests
//!
//! Covers the built-in codes and a hand sized code given as raw shifts.

use bitvec::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use qcldpc::ldpc::{constants, hard_decision_packed, unsatisfied_checks, Arithmetic, FixedFormat};
use qcldpc::simulation::{perfect_llr, random_bits, AwgnChannel};
use qcldpc::tracing_init::init_test_tracing;
use qcldpc::{
    check_syndrome, hard_decision, CheckAdjacency, DecoderConfig, LayeredDecoder, QcCode, QcEncoder,
    SoftDecoder,
};

/// Z=2 code with two block rows and four block columns
fn tiny_code() -> QcCode {
    QcCode::new(2, &[[0, -1, 1, 0], [1, 0, -1, 0]]).unwrap()
}

#[test]
fn test_tiny_code_adjacency() {
    let code = tiny_code();
    let geometry = *code.geometry();
    assert_eq!((geometry.n(), geometry.k(), geometry.m()), (8, 4, 4));

    let adjacency = CheckAdjacency::build(&code).unwrap();
    assert_eq!(adjacency.num_checks(), 4);
    for m in 0..4 {
        assert!(adjacency.degree(m) <= geometry.nb());
    }

    let z = geometry.z();
    for r in 0..geometry.mb() {
        for c in 0..geometry.nb() {
            let Some(s) = code.base().shift(r, c) else { continue };
            for k in 0..z {
                let row = (k + z - s) % z + r * z;
                let col = (c * z + k) as u32;
                assert!(
                    adjacency.neighbors(row).contains(&col),
                    "edge ({}, {}) missing for block ({}, {})",
                    row,
                    col,
                    r,
                    c
                );
            }
        }
    }
}

#[test]
fn test_tiny_code_zero_word() {
    init_test_tracing();
    let code = tiny_code();
    let encoder = QcEncoder::new(&code).unwrap();
    assert_eq!(encoder.encode(&[0; 4]).unwrap(), vec![0; 4]);

    let decoder = LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap();
    let outcome = decoder.decode(&mut decoder.workspace(), &perfect_llr(&[0; 8], 4.0)).unwrap();
    assert!(outcome.status.converged);
    assert_eq!(outcome.status.iterations, 1);
    assert_eq!(outcome.hard_bits, vec![0; 8]);
}

#[test]
fn test_encoded_words_satisfy_every_check() {
    let mut rng = StdRng::seed_from_u64(11);
    for code in [constants::demo_code(), constants::ieee_802_11n_648_r12()] {
        let encoder = QcEncoder::new(&code).unwrap();
        assert!(encoder.is_dual_diagonal_code());
        let adjacency = CheckAdjacency::build(&code).unwrap();

        for _ in 0..10 {
            let data = random_bits(&mut rng, code.geometry().k());
            let codeword = encoder.encode_codeword(&data).unwrap();
            assert_eq!(&codeword[..data.len()], &data[..]);
            assert!(check_syndrome(&adjacency, &codeword[..]));
        }
    }
}

#[test]
fn test_noiseless_round_trip() {
    let mut rng = StdRng::seed_from_u64(3);
    let code = constants::ieee_802_11n_648_r12();
    let encoder = QcEncoder::new(&code).unwrap();
    let decoder = LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap();
    let mut ws = decoder.workspace();

    for _ in 0..5 {
        let data = random_bits(&mut rng, code.geometry().k());
        let codeword = encoder.encode_codeword(&data).unwrap();
        let outcome = decoder.decode(&mut ws, &perfect_llr(&codeword, 6.0)).unwrap();

        assert!(outcome.status.converged);
        assert_eq!(outcome.status.iterations, 1);
        assert_eq!(outcome.hard_bits, codeword);
    }
}

#[test]
fn test_awgn_decode_at_high_snr() {
    let mut rng = StdRng::seed_from_u64(2024);
    let code = constants::ieee_802_11n_648_r12();
    let encoder = QcEncoder::new(&code).unwrap();
    let channel = AwgnChannel::from_ebn0(6.0, code.rate()).unwrap();
    let decoder = LayeredDecoder::<f32>::new(&code, &DecoderConfig::default()).unwrap();
    let adjacency = decoder.adjacency().clone();
    let mut ws = decoder.workspace();

    for _ in 0..20 {
        let data = random_bits(&mut rng, code.geometry().k());
        let codeword = encoder.encode_codeword(&data).unwrap();
        let llr = channel.transmit(&codeword, &mut rng);

        let outcome = decoder.decode(&mut ws, &llr).unwrap();
        assert!(outcome.status.converged);
        assert_eq!(outcome.hard_bits, codeword);
        assert_eq!(unsatisfied_checks(&adjacency, &outcome.hard_bits[..]), 0);
    }
}

#[test]
fn test_fixed_point_awgn_decode() {
    let mut rng = StdRng::seed_from_u64(99);
    let code = constants::ieee_802_11n_648_r12();
    let encoder = QcEncoder::new(&code).unwrap();
    let channel = AwgnChannel::from_ebn0(6.0, code.rate()).unwrap();
    let decoder = LayeredDecoder::<i32>::new(&code, &DecoderConfig::default()).unwrap();
    let format = FixedFormat::default();
    let mut ws = decoder.workspace();

    for _ in 0..10 {
        let data = random_bits(&mut rng, code.geometry().k());
        let codeword = encoder.encode_codeword(&data).unwrap();
        let llr = channel.transmit(&codeword, &mut rng);
        let quantized: Vec<i32> = llr.iter().map(|&x| format.quantize(x)).collect();

        let outcome = decoder.decode(&mut ws, &quantized).unwrap();
        assert!(outcome.status.converged);
        assert_eq!(outcome.hard_bits, codeword);
    }
}

#[test]
fn test_soft_decoder_quantizes_float_channel() {
    let mut rng = StdRng::seed_from_u64(99);
    let code = constants::ieee_802_11n_648_r12();
    let encoder = QcEncoder::new(&code).unwrap();
    let channel = AwgnChannel::from_ebn0(6.0, code.rate()).unwrap();
    let config = DecoderConfig {
        arithmetic: Arithmetic::Fixed(FixedFormat::default()),
        ..Default::default()
    };
    let soft = SoftDecoder::new(&code, &config).unwrap();
    let fixed = LayeredDecoder::<i32>::new(&code, &config).unwrap();
    let format = FixedFormat::default();
    let mut soft_ws = soft.workspace();
    let mut fixed_ws = fixed.workspace();

    for _ in 0..5 {
        let data = random_bits(&mut rng, code.geometry().k());
        let codeword = encoder.encode_codeword(&data).unwrap();
        let llr = channel.transmit(&codeword, &mut rng);

        let outcome = soft.decode(&mut soft_ws, &llr).unwrap();
        assert!(outcome.status.converged);
        assert_eq!(outcome.hard_bits, codeword);

        // same result as quantizing by hand and running the integer decoder
        let quantized: Vec<i32> = llr.iter().map(|&x| format.quantize(x)).collect();
        let reference = fixed.decode(&mut fixed_ws, &quantized).unwrap();
        assert_eq!(outcome.status, reference.status);
        let dequantized: Vec<f32> = reference.posterior.iter().map(|&q| format.dequantize(q)).collect();
        assert_eq!(outcome.posterior, dequantized);
    }
}

#[test]
fn test_hard_decision_ignores_scale() {
    let mut rng = StdRng::seed_from_u64(5);
    let channel = AwgnChannel::new(0.8).unwrap();
    let bits = random_bits(&mut rng, 200);
    let llr: Vec<f32> = channel
        .transmit(&bits, &mut rng)
        .into_iter()
        .filter(|x| *x != 0.0)
        .collect();

    let reference = hard_decision(&llr);
    for scale in [0.01f32, 0.5, 3.0, 250.0] {
        let scaled: Vec<f32> = llr.iter().map(|x| x * scale).collect();
        assert_eq!(hard_decision(&scaled), reference);
    }

    let packed = hard_decision_packed(&llr);
    assert_eq!(packed.len(), llr.len());
    for (i, bit) in packed.iter().by_vals().enumerate() {
        assert_eq!(bit, reference[i] == 1);
    }
}

#[test]
fn test_packed_encoder_matches_array_encoder() {
    let mut rng = StdRng::seed_from_u64(17);
    let code = constants::demo_code();
    let encoder = QcEncoder::new(&code).unwrap();

    for _ in 0..8 {
        let data = random_bits(&mut rng, code.geometry().k());
        let parity = encoder.encode(&data).unwrap();

        let mut packed_data = bitvec![u8, Msb0; 0; data.len()];
        for (i, &b) in data.iter().enumerate() {
            packed_data.set(i, b == 1);
        }
        let packed_parity = encoder.encode_packed(packed_data.as_raw_slice()).unwrap();

        let unpacked: Vec<u8> = packed_parity
            .view_bits::<Msb0>()
            .iter()
            .by_vals()
            .map(u8::from)
            .collect();
        assert_eq!(unpacked, parity);
    }
}

#[test]
fn test_code_text_round_trip() {
    for code in [constants::demo_code(), constants::ieee_802_11n_648_r12(), tiny_code()] {
        let text = code.to_string();
        let parsed: QcCode = text.parse().unwrap();
        assert_eq!(parsed, code);
    }

    let text = "# demo code\nz 8\n1 5 -1 2 0 -1\n3 -1 7 6 0 0\n-1 4 0 2 -1 0  # last row\n";
    assert_eq!(text.parse::<QcCode>().unwrap(), constants::demo_code());
}
