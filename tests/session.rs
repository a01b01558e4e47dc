use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hantek6254::{
    acquisition, stream, BufferLength, DeviceConfig, Error, HantekScope, SessionState, SweepMode,
    Transport, TriggerSlope, VoltsPerDiv,
};

/// Everything the fake scope has seen, and how it answers.
struct State {
    control_writes: Vec<(u8, u16, Vec<u8>)>,
    control_reads: Vec<(u8, u16, usize)>,
    commands: Vec<Vec<u8>>,
    resets: usize,
    /// Value of every sample byte
    sample: u8,
    /// First four bytes of the trigger status packet
    trigger: [u8; 4],
    sample_read_failure: Option<rusb::Error>,
    command_failure: Option<rusb::Error>,
    short_samples: bool,
    /// Drop the last byte of every command
    short_commands: bool,
}

impl Default for State {
    fn default() -> Self {
        State {
            control_writes: Vec::new(),
            control_reads: Vec::new(),
            commands: Vec::new(),
            resets: 0,
            sample: 128,
            trigger: [0x00, 0x00, 0x34, 0x12],
            sample_read_failure: None,
            command_failure: None,
            short_samples: false,
            short_commands: false,
        }
    }
}

#[derive(Clone, Default)]
struct FakeScope(Arc<Mutex<State>>);

impl FakeScope {
    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    fn commands_since(&self, mark: usize) -> Vec<Vec<u8>> {
        self.state().commands[mark..].to_vec()
    }
}

impl Transport for FakeScope {
    fn write_control(
        &mut self,
        request: u8,
        value: u16,
        data: &[u8],
        _: Duration,
    ) -> rusb::Result<usize> {
        self.state().control_writes.push((request, value, data.to_vec()));
        Ok(data.len())
    }

    fn read_control(
        &mut self,
        request: u8,
        value: u16,
        length: usize,
        _: Duration,
    ) -> rusb::Result<Vec<u8>> {
        self.state().control_reads.push((request, value, length));
        match request {
            178 => Ok(vec![0x01; length]),
            _ => Ok(vec![0xAB; length]),
        }
    }

    fn write_bulk(&mut self, endpoint: u8, data: &[u8], _: Duration) -> rusb::Result<usize> {
        assert_eq!(endpoint, 0x02);
        let mut state = self.state();
        if let Some(e) = state.command_failure.take() {
            return Err(e);
        }
        state.commands.push(data.to_vec());
        if state.short_commands {
            return Ok(data.len() - 1);
        }
        Ok(data.len())
    }

    fn read_bulk(&mut self, endpoint: u8, length: usize, _: Duration) -> rusb::Result<Vec<u8>> {
        assert_eq!(endpoint, 0x86);
        let mut state = self.state();
        let last = state.commands.last().map(|c| c[0]);
        match last {
            Some(0x05) => {
                if let Some(e) = state.sample_read_failure.take() {
                    return Err(e);
                }
                let length = if state.short_samples { length / 2 } else { length };
                Ok(vec![state.sample; length])
            }
            Some(0x0D) => {
                let mut packet = vec![0x00; length];
                packet[..4].copy_from_slice(&state.trigger);
                Ok(packet)
            }
            _ => Ok(vec![0x00; length]),
        }
    }

    fn reset(&mut self) -> rusb::Result<()> {
        self.state().resets += 1;
        Ok(())
    }
}

fn connect() -> (HantekScope<FakeScope>, FakeScope) {
    let fake = FakeScope::default();
    let scope = HantekScope::with_transport(fake.clone()).unwrap();
    (scope, fake)
}

fn error_of(err: &anyhow::Error) -> &Error {
    err.downcast_ref::<Error>().expect("not a driver error")
}

#[test]
fn connect_brings_up_and_configures() {
    let (scope, fake) = connect();
    assert_eq!(scope.state(), SessionState::Configured);
    assert_eq!(scope.firmware_info().descriptor.len(), 71);
    assert_eq!(scope.firmware_info().driver_version.len(), 8);
    assert_eq!(scope.firmware_info().bring_up.len(), 512);

    let state = fake.state();
    assert_eq!(state.commands[0], vec![0x0C, 0x00]);
    assert_eq!(state.commands[1], vec![0x0C, 0x00]);
    assert_eq!(state.commands[2], vec![0x08, 0x00, 0x00, 0x77, 0x47, 0x12, 0x04, 0x00]);
    assert_eq!(state.commands[7], vec![0x08, 0x00, 0x00, 0x3F, 0x00, 0x55, 0x04, 0x00]);
    // 8 bring-up writes, 21 configuration writes
    assert_eq!(state.commands.len(), 29);

    // every command is preceded by a soft reset, plus the one between the EEPROM reads
    let resets: Vec<_> = state.control_writes.iter().filter(|w| w.0 == 179).collect();
    assert_eq!(resets.len(), 30);
    assert_eq!(resets[0].2, vec![0x0F, 0x03, 0x03, 0x03, 0, 0, 0, 0, 0, 0]);

    let eeprom: Vec<_> = state.control_reads.iter().filter(|r| r.0 == 162).collect();
    assert_eq!(eeprom, vec![&(162, 0x1580, 71), &(162, 0x15E0, 8)]);
}

#[test]
fn configure_sequence_order() {
    let (mut scope, fake) = connect();
    let mark = fake.state().commands.len();

    scope.configure().unwrap();
    scope.configure().unwrap();

    let commands = fake.commands_since(mark);
    assert_eq!(commands.len(), 42);
    assert_eq!(commands[..21], commands[21..]);

    assert_eq!(commands[0], vec![0x08, 0x00, 0x00, 0x10, 0x08, 0x3A, 0x04, 0x00]);
    assert_eq!(commands[4], vec![0x08, 0x00, 0x00, 0x00, 0x00, 0x2A, 0x04, 0x00]);
    // 250 MHz clock
    assert_eq!(commands[5], vec![0x0F, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(commands[6][..3], [0x10, 0x00, 0x4E]);
    assert_eq!(commands[6][3], 0x10);
    // 1 V/div on every channel
    assert_eq!(commands[7], vec![0x08, 0x00, 0x36, 0x36, 0x36, 0x36, 0x01, 0x00]);
    assert_eq!(commands[8], vec![0x08, 0x00, 0x06, 0x06, 0x06, 0x06, 0x01, 0x01]);
    assert_eq!(commands[13], vec![0x08, 0x00, 0x00, 0x00, 0x00, 0x2A, 0x04, 0x00]);
    assert_eq!(commands[14], vec![0x12, 0x00, 0x3C, 0x00, 0x00, 0x00]);
    assert_eq!(commands[15], vec![0x00, 0x00, 0xC2, 0x71]);
    assert_eq!(commands[18], vec![0x04, 0x00, 0x39, 0x72]);
    assert_eq!(commands[19].len(), 26);
    assert_eq!(commands[19][0], 0x07);
    assert_eq!(commands[19][18], 127);
    assert_eq!(commands[20], vec![0x11, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn end_to_end_capture() {
    let (mut scope, fake) = connect();

    scope.set_buffer_length(16384).unwrap();
    scope.set_sample_rate(2_500_000).unwrap();
    scope.set_volts_per_div([1.0, 1.0, 0.005, 0.002]).unwrap();
    scope.set_trigger_source(0).unwrap();
    assert_eq!(scope.set_trigger_level(0.0).unwrap(), 0.0);
    scope.set_sweep_mode(SweepMode::Normal);
    scope.configure().unwrap();

    let commands = fake.commands_since(0);
    let configured = &commands[commands.len() - 21..];
    assert_eq!(configured[5], vec![0x0F, 0x00, 0x31, 0x00, 0x00, 0x00]);
    assert_eq!(configured[7], vec![0x08, 0x00, 0x36, 0x36, 0x2E, 0x2E, 0x01, 0x00]);
    assert_eq!(configured[13], vec![0x08, 0x00, 0x00, 0x00, 0xDA, 0x2A, 0x04, 0x00]);
    assert_eq!(configured[14], vec![0x12, 0x00, 0x3D, 0x00, 0x00, 0x00]);
    assert_eq!(configured[19][18], 128);

    let mark = commands.len();
    let frame = scope.get_data().unwrap();
    assert_eq!(scope.state(), SessionState::Configured);

    for channel in &frame.channels {
        assert_eq!(channel.len(), 16384);
    }
    assert!(frame.channels[0].iter().all(|v| *v == 0.0));
    assert!(frame.channels[2].iter().all(|v| *v < 0.0));
    assert_eq!(frame.time.len(), 16384);
    for n in [0, 1, 100, 16383] {
        assert!((frame.time[n] - n as f64 / 2_500_000.0).abs() < 1e-15);
    }

    let capture = fake.commands_since(mark);
    assert_eq!(
        capture,
        vec![
            vec![0x03, 0x00, 0x00, 0x00],
            vec![0x06, 0x00],
            vec![0x06, 0x00],
            vec![0x0D, 0x00],
            // 0x1234 resolves to 0x121c, plus the skew of 29
            vec![0x0E, 0x00, 0x39, 0x12],
            vec![0x05, 0x00, 0x00, 0x80],
        ]
    );
}

#[test]
fn raw_capture_keeps_status_packets() {
    let (mut scope, fake) = connect();
    fake.state().sample = 200;
    fake.state().trigger = [0x00, 0x01, 0x0D, 0x00];

    let capture = scope.get_raw_data().unwrap();
    assert!(capture.channels.iter().all(|c| c.len() == 16384 && c.iter().all(|b| *b == 200)));
    assert_eq!(capture.status[0].len(), 512);
    assert_eq!(capture.trigger.position, 13);
    assert_eq!(capture.trigger.slope_correction, 1);
    // 13 rounds up to 16, odd correction moves back 24 and wraps to 65528, the skew wraps again
    assert_eq!(capture.offset, 21);
}

#[test]
fn rejected_buffer_length_keeps_current() {
    let (mut scope, _fake) = connect();

    scope.set_buffer_length(4096).unwrap();
    assert_eq!(scope.config().buffer_length, BufferLength::Samples4K);

    let err = scope.set_buffer_length(2048).unwrap_err();
    match error_of(&err) {
        Error::UnsupportedBufferLength { requested, available, current } => {
            assert_eq!(*requested, 2048);
            assert_eq!(available, &vec![4096, 8192, 16384]);
            assert_eq!(*current, 4096);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(scope.config().buffer_length, BufferLength::Samples4K);
    assert_eq!(scope.time_axis().len(), 4096);
}

#[test]
fn rejected_sample_rate_keeps_current() {
    let (mut scope, _fake) = connect();

    scope.set_sample_rate(50_000).unwrap();
    let err = scope.set_sample_rate(1_000_000).unwrap_err();
    assert!(matches!(
        error_of(&err),
        Error::UnsupportedRate { requested: 1_000_000, current: 50_000, .. }
    ));
    assert_eq!(scope.sample_rate(), 50_000);
    assert_eq!(HantekScope::<FakeScope>::available_rates().len(), 20);
}

#[test]
fn rejected_scale_keeps_channel() {
    let (mut scope, _fake) = connect();

    scope.set_volts_per_div([0.5, 0.5, 0.5, 0.5]).unwrap();
    let err = scope.set_volts_per_div([2.0, 0.003, 0.01, 0.003]).unwrap_err();
    match error_of(&err) {
        Error::UnsupportedRange { channels, .. } => assert_eq!(channels, &vec![1, 3]),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(
        scope.config().volts_per_div,
        [
            VoltsPerDiv::Volts2,
            VoltsPerDiv::MilliVolts500,
            VoltsPerDiv::MilliVolts10,
            VoltsPerDiv::MilliVolts500
        ]
    );
}

#[test]
fn trigger_source_range() {
    let (mut scope, _fake) = connect();

    scope.set_trigger_source(3).unwrap();
    let err = scope.set_trigger_source(4).unwrap_err();
    assert!(matches!(error_of(&err), Error::InvalidChannel(4)));
    assert_eq!(scope.config().trigger_source, 3);
}

#[test]
fn trigger_level_clamps_consistently() {
    let (mut scope, _fake) = connect();

    let first = scope.set_trigger_level(100.0).unwrap();
    let second = scope.set_trigger_level(100.0).unwrap();
    assert_eq!(first, second);
    assert_eq!(scope.config().trigger_level, 228);
    assert!((first - 100.0 / 255.0 * 10.0).abs() < 1e-12);

    let low = scope.set_trigger_level(-100.0).unwrap();
    assert_eq!(scope.config().trigger_level, 28);
    assert!((low + 100.0 / 255.0 * 10.0).abs() < 1e-12);
}

#[test]
fn non_finite_trigger_level_keeps_current() {
    let (mut scope, _fake) = connect();
    scope.set_trigger_level(1.0).unwrap();

    for volts in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = scope.set_trigger_level(volts).unwrap_err();
        assert!(matches!(error_of(&err), Error::InvalidTriggerLevel(_)));
        assert_eq!(scope.config().trigger_level, 154);
    }
}

#[test]
fn hand_built_config_is_refused() {
    let mut fake = FakeScope::default();
    let config = DeviceConfig {
        sample_rate: 0,
        ..Default::default()
    };

    let err = acquisition::acquire(&mut fake, &config, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(error_of(&err), Error::UnknownRate(0)));

    let config = DeviceConfig {
        trigger_source: 7,
        ..Default::default()
    };
    let err = acquisition::acquire(&mut fake, &config, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(error_of(&err), Error::InvalidChannel(7)));

    // nothing reached the scope
    assert!(fake.state().commands.is_empty());
    assert!(fake.state().control_writes.is_empty());
}

#[test]
fn partial_command_write_fails() {
    let (mut scope, fake) = connect();
    fake.state().short_commands = true;

    let err = scope.configure().unwrap_err();
    assert!(matches!(
        error_of(&err),
        Error::ShortWrite { expected: 8, written: 7 }
    ));

    fake.state().short_commands = false;
    scope.configure().unwrap();
}

#[test]
fn settings_apply_on_configure() {
    let (mut scope, fake) = connect();

    scope.set_buffer_length(4096).unwrap();
    scope.set_sweep_mode(SweepMode::Single);
    scope.set_trigger_slope(TriggerSlope::Fall);

    // still running with the pushed configuration
    let frame = scope.get_data().unwrap();
    assert_eq!(frame.channels[0].len(), 16384);

    let mark = fake.state().commands.len();
    scope.configure().unwrap();
    assert_eq!(
        fake.commands_since(mark).last(),
        Some(&vec![0x11, 0x00, 0x00, 0x01, 0x00, 0x00])
    );

    let mark = fake.state().commands.len();
    let frame = scope.get_data().unwrap();
    assert_eq!(frame.channels[3].len(), 4096);
    assert_eq!(frame.time.len(), 4096);

    let capture = fake.commands_since(mark);
    assert_eq!(capture[0], vec![0x03, 0x00, 0x04, 0x00]);
    assert_eq!(capture.last(), Some(&vec![0x05, 0x00, 0x00, 0x20]));
}

#[test]
fn timeout_aborts_capture_cleanly() {
    let (mut scope, fake) = connect();
    fake.state().sample_read_failure = Some(rusb::Error::Timeout);

    let err = scope.get_data().unwrap_err();
    assert!(matches!(error_of(&err), Error::Timeout));
    assert_eq!(scope.state(), SessionState::Configured);

    let frame = scope.get_data().unwrap();
    assert_eq!(frame.channels[1].len(), 16384);
}

#[test]
fn short_read_returns_no_frame() {
    let (mut scope, fake) = connect();
    fake.state().short_samples = true;

    let err = scope.get_data().unwrap_err();
    assert!(matches!(
        error_of(&err),
        Error::ShortRead { expected: 65536, received: 32768 }
    ));
}

#[test]
fn transport_errors_propagate() {
    let (mut scope, fake) = connect();
    fake.state().command_failure = Some(rusb::Error::Pipe);

    let err = scope.configure().unwrap_err();
    assert!(matches!(error_of(&err), Error::Transport(rusb::Error::Pipe)));

    // nothing sticks, the next attempt goes through
    scope.configure().unwrap();
}

#[test]
fn close_is_idempotent() {
    let (mut scope, fake) = connect();

    scope.close().unwrap();
    scope.close().unwrap();
    assert_eq!(fake.state().resets, 1);
    assert_eq!(scope.state(), SessionState::Disconnected);

    let err = scope.get_data().unwrap_err();
    assert!(matches!(error_of(&err), Error::Disconnected));
    let err = scope.configure().unwrap_err();
    assert!(matches!(error_of(&err), Error::Disconnected));

    drop(scope);
    assert_eq!(fake.state().resets, 1);
}

#[test]
fn drop_resets_the_scope() {
    let (scope, fake) = connect();
    drop(scope);
    assert_eq!(fake.state().resets, 1);
}

#[test]
fn stream_delivers_frames() {
    let (mut scope, fake) = connect();
    scope.set_sample_rate(2_500_000).unwrap();
    scope.configure().unwrap();

    let frames = stream::spawn(scope, 1, Duration::from_millis(1));
    for _ in 0..3 {
        let frame = frames.recv().unwrap().unwrap();
        assert_eq!(frame.channels[0].len(), 16384);
        assert!((frame.time[1] - 1.0 / 2_500_000.0).abs() < 1e-15);
    }

    let scope = frames.stop().unwrap();
    assert_eq!(scope.state(), SessionState::Configured);
    assert_eq!(fake.state().resets, 0);
}

#[test]
fn stream_keeps_going_after_timeout() {
    let (scope, fake) = connect();
    fake.state().sample_read_failure = Some(rusb::Error::Timeout);

    let frames = stream::spawn(scope, 1, Duration::from_millis(1));
    let first = frames.recv().unwrap();
    assert!(matches!(error_of(&first.unwrap_err()), Error::Timeout));
    assert!(frames.recv().unwrap().is_ok());

    drop(frames);
    // the scope was closed when the worker handed it back and it dropped
    assert_eq!(fake.state().resets, 1);
}
