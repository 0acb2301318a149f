//! Software loopback: a generated tone streamed through receive, gain and
//! transmit with a simulated sample clock.
//!
//! ```text
//! cargo run -p sport-audio-demos --bin loopback -- --chunks 40 --gain 0.25
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tracing_subscriber::EnvFilter;

use sport_audio::constants::{CHUNK_SAMPLES, SAMPLE_RATE_HZ};
use sport_audio::dispatch::{InterruptSource, IsrDispatcher};
use sport_audio::filter::Gain;
use sport_audio::host::{wav_image, InterruptLine, RecordingEngine};
use sport_audio::io::StatsSnapshot;
use sport_audio::player::AudioPlayer;
use sport_audio::source::SampleSource;
use sport_audio::{Pool, RxPipeline, StreamError, TxPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of chunks to pass through the player
    #[arg(short, long, default_value_t = 32)]
    chunks: usize,

    /// The playback gain
    #[arg(short, long, default_value_t = 0.5, value_name = "GAIN")]
    gain: f32,

    /// Frequency of the generated tone
    #[arg(long, default_value_t = 440.0, value_name = "HZ")]
    tone: f32,

    /// Sample clock speed-up over real time
    #[arg(long, default_value_t = 16)]
    speed: u32,

    /// Show debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("loopback failed: {err}");
            ExitCode::FAILURE
        }
    }
}

/// One second of a sine tone at `freq`, as a WAV image.
fn tone_image(freq: f32) -> Vec<u8> {
    let rate = SAMPLE_RATE_HZ as f32;
    let samples: Vec<i16> = (0..SAMPLE_RATE_HZ)
        .map(|n| {
            let phase = 2.0 * std::f32::consts::PI * freq * n as f32 / rate;
            (phase.sin() * 20_000.0) as i16
        })
        .collect();
    wav_image(&samples, SAMPLE_RATE_HZ)
}

fn run(args: &Cli) -> Result<(), StreamError> {
    let image = tone_image(args.tone);
    let period = Duration::from_micros(
        CHUNK_SAMPLES as u64 * 1_000_000 / SAMPLE_RATE_HZ as u64 / args.speed.max(1) as u64,
    );

    let pool = Pool::new();
    let rx: RxPipeline<'_, RecordingEngine> = RxPipeline::new(&pool, RecordingEngine::new());
    let tx: TxPipeline<'_, RecordingEngine> = TxPipeline::new(&pool, RecordingEngine::new());

    let mut dispatcher = IsrDispatcher::new();
    dispatcher.register(InterruptSource::SportRx, &rx)?;
    dispatcher.register(InterruptSource::SportTx, &tx)?;

    let line = InterruptLine::new();
    let done = AtomicBool::new(false);

    info!(
        "streaming {} chunks of {} samples, one every {:?}",
        args.chunks, CHUNK_SAMPLES, period
    );

    let peak = thread::scope(|s| {
        // The sample clock: software DMA on both directions, then the interrupts
        let clock = s.spawn(|| {
            let mut source = SampleSource::new(&image);
            let mut peak = 0i16;
            while !done.load(Ordering::Acquire) {
                thread::sleep(period);
                if let Some(level) = tx.read_pending(|chunk| {
                    chunk.used_samples().iter().map(|v| v.saturating_abs()).max()
                }) {
                    peak = peak.max(level.unwrap_or(0));
                    dispatcher.dispatch(InterruptSource::SportTx);
                }
                rx.write_pending(|chunk| source.fill(chunk));
                dispatcher.dispatch(InterruptSource::SportRx);
                line.raise();
            }
            peak
        });

        let result = stream(&rx, &tx, &line, args);
        done.store(true, Ordering::Release);
        let peak = clock.join().unwrap_or_default();
        result.map(|()| peak)
    })?;

    print_stats("rx", &rx.stats().snapshot());
    print_stats("tx", &tx.stats().snapshot());
    println!("peak output level: {peak}");
    println!("chunks still held: {}", pool.outstanding());
    Ok(())
}

fn stream<'p>(
    rx: &RxPipeline<'p, RecordingEngine>,
    tx: &TxPipeline<'p, RecordingEngine>,
    line: &InterruptLine,
    args: &Cli,
) -> Result<(), StreamError> {
    let mut player = AudioPlayer::new(rx, tx, Gain::new(args.gain));
    player.start()?;

    let mut power = line;
    for _ in 0..args.chunks {
        player.step(&mut power)?;
    }
    info!("player passed {} chunks", player.chunks());
    Ok(())
}

fn print_stats(name: &str, stats: &StatsSnapshot) {
    println!(
        "{name}: transfers {}, overruns {}, underruns {}, starvations {}",
        stats.transfers, stats.overruns, stats.underruns, stats.starvations
    );
}
