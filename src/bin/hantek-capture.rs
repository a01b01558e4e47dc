//! Capture frames from a Hantek 6254BC.
//!
//! One frame is written to stdout as CSV. With `--follow` the scope keeps
//! capturing and a line of per channel extremes is printed for every frame.

use std::io::{self, BufWriter, Write};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use hantek6254::{stream, CalibratedFrame, HantekScope, RawCapture, SweepMode, TriggerSlope};

#[derive(Parser, Debug)]
#[command(about = "Capture frames from a Hantek 6254BC oscilloscope")]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 2_500_000)]
    rate: u32,

    /// Samples per channel (4096, 8192 or 16384)
    #[arg(long, default_value_t = 16384)]
    buffer: usize,

    /// Volts per division of channels 1 to 4
    #[arg(long, value_delimiter = ',', default_values_t = [1.0, 1.0, 1.0, 1.0])]
    vdiv: Vec<f64>,

    /// Trigger source channel (0 to 3)
    #[arg(long, default_value_t = 0)]
    trigger_source: usize,

    /// Trigger level in volts
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    trigger_level: f64,

    /// RISE or FALL
    #[arg(long, default_value = "RISE")]
    slope: TriggerSlope,

    /// NORMAL, AUTO or SINGLE
    #[arg(long, default_value = "NORMAL")]
    sweep: SweepMode,

    /// Write ADC bytes instead of volts
    #[arg(long)]
    raw: bool,

    /// Keep capturing and print a summary of every frame
    #[arg(long)]
    follow: bool,

    /// Pause between frames in follow mode, in milliseconds
    #[arg(long, default_value_t = 100)]
    interval: u64,
}

fn write_frame(out: &mut impl Write, frame: &CalibratedFrame) -> io::Result<()> {
    writeln!(out, "time,ch1,ch2,ch3,ch4")?;
    for (n, t) in frame.time.iter().enumerate() {
        writeln!(
            out,
            "{:e},{},{},{},{}",
            t,
            frame.channels[0][n],
            frame.channels[1][n],
            frame.channels[2][n],
            frame.channels[3][n]
        )?;
    }
    Ok(())
}

fn write_raw(out: &mut impl Write, capture: &RawCapture) -> io::Result<()> {
    writeln!(
        out,
        "# trigger position {:#06x} correction {:#04x} offset {:#06x}",
        capture.trigger.position, capture.trigger.slope_correction, capture.offset
    )?;
    writeln!(out, "n,ch1,ch2,ch3,ch4")?;
    for n in 0..capture.channels[0].len() {
        writeln!(
            out,
            "{},{},{},{},{}",
            n,
            capture.channels[0][n],
            capture.channels[1][n],
            capture.channels[2][n],
            capture.channels[3][n]
        )?;
    }
    Ok(())
}

fn summary(frame: &CalibratedFrame) -> String {
    frame
        .channels
        .iter()
        .enumerate()
        .map(|(i, samples)| {
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            format!("ch{} [{:+.3e}, {:+.3e}]", i + 1, min, max)
        })
        .collect::<Vec<_>>()
        .join("  ")
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scope = HantekScope::connect()?;

    scope.set_buffer_length(args.buffer)?;
    scope.set_sample_rate(args.rate)?;
    let vdiv: [f64; 4] = match args.vdiv.as_slice().try_into() {
        Ok(vdiv) => vdiv,
        Err(_) => bail!("--vdiv takes four values, got {}", args.vdiv.len()),
    };
    scope.set_volts_per_div(vdiv)?;
    scope.set_trigger_source(args.trigger_source)?;
    let level = scope.set_trigger_level(args.trigger_level)?;
    log::info!("trigger level {:.3e} V", level);
    scope.set_trigger_slope(args.slope);
    scope.set_sweep_mode(args.sweep);
    scope.configure()?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.follow {
        let frames = stream::spawn(scope, 2, Duration::from_millis(args.interval));
        while let Some(frame) = frames.recv() {
            match frame {
                Ok(frame) => {
                    writeln!(out, "{}", summary(&frame))?;
                    out.flush()?;
                }
                // the worker stops by itself unless the capture merely timed out
                Err(e) => log::warn!("capture failed: {:#}", e),
            }
        }
        let mut scope = frames.stop()?;
        return scope.close();
    }

    if args.raw {
        write_raw(&mut out, &scope.get_raw_data()?)?;
    } else {
        write_frame(&mut out, &scope.get_data()?)?;
    }
    out.flush()?;

    scope.close()
}
