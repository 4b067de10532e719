//! QC-LDPC codec throughput and error rate benchmark
//!
//! Encodes random frames, sends them over a BPSK/AWGN channel, decodes them
//! in batches and reports throughput plus bit and frame error rates.
//!
//! Usage:
//!   cargo run --release --bin qcldpc_bench -- [OPTIONS]
//!
//! Options:
//!   -c, --code <name|file>  Built-in code (`wifi648`, `demo`) or a code file (default: wifi648)
//!   -e, --ebn0 <dB>         Eb/N0 in dB (default: 2.0)
//!   -f, --frames <count>    Number of frames (default: 1200)
//!   -i, --iterations <n>    Maximum decoder iterations (default: 50)
//!   -w, --workers <n>       Worker threads (default: 1)
//!   -p, --pool              Use the persistent worker pool instead of spawning per batch
//!   -x, --fixed             Fixed point decoding on a rayon pool of the same size
//!   -s, --seed <n>          RNG seed (default: 1)
//!   -h, --help              Show this help message
//!
//! Examples:
//!   # 802.11n code at 1.5 dB on 4 threads
//!   qcldpc_bench -e 1.5 -w 4
//!
//!   # Custom code file, fixed point, pooled workers
//!   qcldpc_bench -c my_code.txt -x -p -w 2

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use qcldpc::ldpc::{constants, Arithmetic, FixedFormat};
use qcldpc::simulation::{random_bits, AwgnChannel};
use qcldpc::tracing_init::init_tracing;
use qcldpc::{
    BatchConfig, BatchDecoder, DecodeStatus, DecoderConfig, HardOutput, LayeredDecoder, QcCode, QcEncoder,
    SoftDecoder, WorkerPool,
};

/// Frames decoded per batch
const BATCH_FRAMES: usize = 120;

struct BenchConfig {
    code: String,
    ebn0_db: f32,
    frames: usize,
    iterations: usize,
    workers: usize,
    pool: bool,
    fixed: bool,
    seed: u64,
}

impl BenchConfig {
    fn parse_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();

        let mut config = BenchConfig {
            code: "wifi648".to_string(),
            ebn0_db: 2.0,
            frames: 1200,
            iterations: 50,
            workers: 1,
            pool: false,
            fixed: false,
            seed: 1,
        };

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "-p" | "--pool" => config.pool = true,
                "-x" | "--fixed" => config.fixed = true,
                "-h" | "--help" => {
                    print_usage();
                    std::process::exit(0);
                }
                "-c" | "--code" | "-e" | "--ebn0" | "-f" | "--frames" | "-i" | "--iterations"
                | "-w" | "--workers" | "-s" | "--seed" => {
                    i += 1;
                    let value = args
                        .get(i)
                        .ok_or_else(|| format!("Missing value for {}", flag))?;
                    match flag {
                        "-c" | "--code" => config.code = value.clone(),
                        "-e" | "--ebn0" => config.ebn0_db = parse_value(flag, value)?,
                        "-f" | "--frames" => config.frames = parse_value(flag, value)?,
                        "-i" | "--iterations" => config.iterations = parse_value(flag, value)?,
                        "-w" | "--workers" => config.workers = parse_value(flag, value)?,
                        _ => config.seed = parse_value(flag, value)?,
                    }
                }
                other => return Err(format!("Unknown argument: {}", other)),
            }
            i += 1;
        }

        if config.workers == 0 {
            return Err("At least one worker is required".to_string());
        }
        Ok(config)
    }
}

fn parse_value<T: FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid value for {}: {}", flag, value))
}

fn print_usage() {
    println!("Usage: qcldpc_bench [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --code <name|file>  wifi648, demo or a code file (default: wifi648)");
    println!("  -e, --ebn0 <dB>         Eb/N0 in dB (default: 2.0)");
    println!("  -f, --frames <count>    Number of frames (default: 1200)");
    println!("  -i, --iterations <n>    Maximum decoder iterations (default: 50)");
    println!("  -w, --workers <n>       Worker threads (default: 1)");
    println!("  -p, --pool              Persistent worker pool");
    println!("  -x, --fixed             Fixed point decoding (rayon pool, ignores --pool)");
    println!("  -s, --seed <n>          RNG seed (default: 1)");
}

fn load_code(name: &str) -> Result<QcCode, String> {
    match name {
        "wifi648" => Ok(constants::ieee_802_11n_648_r12()),
        "demo" => Ok(constants::demo_code()),
        path => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read code file {}: {}", path, e))?;
            text.parse().map_err(|e| format!("Invalid code file {}: {}", path, e))
        }
    }
}

/// Error counts accumulated over all batches
#[derive(Default)]
struct Tally {
    bit_errors: usize,
    frame_errors: usize,
    unconverged: usize,
    iterations: usize,
}

impl Tally {
    /// Count the errors of one decoded channel over its K systematic bits
    fn record(&mut self, sent: &[u8], decoded: &[u8], status: &DecodeStatus) {
        self.iterations += status.iterations;
        if !status.converged {
            self.unconverged += 1;
        }

        let errors = decoded.iter().zip(sent).filter(|(a, b)| a != b).count();
        self.bit_errors += errors;
        if errors > 0 {
            self.frame_errors += 1;
        }
    }
}

/// Floating point decoding through the batch layer
fn run_float(
    config: &BenchConfig,
    code: &QcCode,
    batches: &[(Vec<u8>, Vec<f32>)],
) -> Result<(Tally, f64), String> {
    let decoder_config = DecoderConfig {
        max_iterations: config.iterations,
        ..Default::default()
    };
    let decoder = Arc::new(LayeredDecoder::<f32>::new(code, &decoder_config).map_err(|e| e.to_string())?);
    let batch_config = BatchConfig {
        workers: config.workers,
        hard_output: HardOutput::Unpacked,
    };

    let mut pool = if config.pool {
        Some(WorkerPool::new(Arc::clone(&decoder), &batch_config).map_err(|e| e.to_string())?)
    } else {
        None
    };
    let mut spawned = BatchDecoder::new(Arc::clone(&decoder), &batch_config).map_err(|e| e.to_string())?;

    let n = code.geometry().n();
    let k = code.geometry().k();
    let mut tally = Tally::default();
    let start = Instant::now();

    for (codewords, llr) in batches {
        let output = match pool.as_mut() {
            Some(pool) => pool.decode(llr),
            None => spawned.decode_spawned(llr),
        }
        .map_err(|e| e.to_string())?;

        for (c, outcome) in output.outcomes.iter().enumerate() {
            let status = outcome.as_ref().map_err(|e| e.to_string())?;
            tally.record(&codewords[c * n..c * n + k], &output.hard_bits_of(c)[..k], status);
        }
    }

    Ok((tally, start.elapsed().as_secs_f64()))
}

/// Fixed point decoding: the soft decoder quantizes each channel itself
fn run_fixed(
    config: &BenchConfig,
    code: &QcCode,
    batches: &[(Vec<u8>, Vec<f32>)],
) -> Result<(Tally, f64), String> {
    let decoder_config = DecoderConfig {
        max_iterations: config.iterations,
        arithmetic: Arithmetic::Fixed(FixedFormat::default()),
        ..Default::default()
    };
    let decoder = SoftDecoder::new(code, &decoder_config).map_err(|e| e.to_string())?;
    let threads = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| e.to_string())?;

    let n = code.geometry().n();
    let k = code.geometry().k();
    let mut tally = Tally::default();
    let start = Instant::now();

    for (codewords, llr) in batches {
        let outcomes: Vec<_> = threads.install(|| {
            llr.par_chunks(n)
                .map_init(|| decoder.workspace(), |ws, channel| decoder.decode(ws, channel))
                .collect()
        });

        for (c, outcome) in outcomes.into_iter().enumerate() {
            let outcome = outcome.map_err(|e| e.to_string())?;
            tally.record(&codewords[c * n..c * n + k], &outcome.hard_bits[..k], &outcome.status);
        }
    }

    Ok((tally, start.elapsed().as_secs_f64()))
}

fn main() {
    init_tracing();

    let config = match BenchConfig::parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let code = match load_code(&config.code) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let geometry = *code.geometry();
    let (n, k) = (geometry.n(), geometry.k());

    println!("=== QC-LDPC Benchmark ===");
    println!("Code: {} (N={}, K={}, Z={}, rate {:.3})", config.code, n, k, geometry.z(), code.rate());
    println!("Eb/N0: {:.2} dB", config.ebn0_db);
    println!("Frames: {}", config.frames);
    let scheduling = if config.fixed {
        "rayon pool"
    } else if config.pool {
        "persistent pool"
    } else {
        "spawn per batch"
    };
    println!("Workers: {} ({})", config.workers, scheduling);
    println!("Arithmetic: {}", if config.fixed { "fixed point" } else { "floating point" });
    println!();

    let encoder = match QcEncoder::new(&code) {
        Ok(encoder) => encoder,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let channel = match AwgnChannel::from_ebn0(config.ebn0_db, code.rate()) {
        Ok(channel) => channel,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Whole batches only, rounded so every worker gets the same share
    let per_batch = BATCH_FRAMES.div_ceil(config.workers) * config.workers;
    let batch_count = config.frames.div_ceil(per_batch).max(1);
    let frames = batch_count * per_batch;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let data = random_bits(&mut rng, frames * k);

    let start = Instant::now();
    let parity = match encoder.encode_batch(&data, frames) {
        Ok(parity) => parity,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let encode_secs = start.elapsed().as_secs_f64();
    println!(
        "Encoded {} frames in {:.3} s ({:.2} Mbit/s info)",
        frames,
        encode_secs,
        (frames * k) as f64 / encode_secs / 1e6
    );

    let m = geometry.m();
    let mut float_batches = Vec::with_capacity(batch_count);
    for b in 0..batch_count {
        let mut codewords = Vec::with_capacity(per_batch * n);
        for f in b * per_batch..(b + 1) * per_batch {
            codewords.extend_from_slice(&data[f * k..(f + 1) * k]);
            codewords.extend_from_slice(&parity[f * m..(f + 1) * m]);
        }
        let llr = channel.transmit(&codewords, &mut rng);
        float_batches.push((codewords, llr));
    }

    let result = if config.fixed {
        run_fixed(&config, &code, &float_batches)
    } else {
        run_float(&config, &code, &float_batches)
    };

    let (tally, decode_secs) = match result {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Decoded {} frames in {:.3} s ({:.2} Mbit/s info, {:.1} frames/s)",
        frames,
        decode_secs,
        (frames * k) as f64 / decode_secs / 1e6,
        frames as f64 / decode_secs
    );
    println!("Average iterations: {:.2}", tally.iterations as f64 / frames as f64);
    println!("Unconverged frames: {}", tally.unconverged);
    println!("BER: {:.3e}", tally.bit_errors as f64 / (frames * k) as f64);
    println!("FER: {:.3e}", tally.frame_errors as f64 / frames as f64);
}
