//! ABOUTME: The capture loop: acquire, score, update the alarm, display, poll commands
//! ABOUTME: Owns the frame source and display and always releases them on the way out

use image::DynamicImage;
use serde::Serialize;
use std::thread;
use tracing::{debug, error, info, warn};
use tw_alarm::{AlarmState, CommandSource, SharedAlarm, Transition};
use tw_capture::{Display, FrameSource};
use tw_config::Config;
use tw_core::{CyclePacer, Error, Result, Stopwatch};
use tw_notify::{AlarmTrigger, NotifierHandle};
use tw_vision::{MotionAnalyzer, VisionConfig};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// The operator asked to exit
    Command,
    /// A finite frame source ran out of frames
    SourceExhausted,
}

/// Summary returned when the loop ends cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitorReport {
    pub cycles: u64,
    pub triggers: u64,
    pub exit: ExitReason,
    pub final_state: AlarmState,
}

/// Preprocessing and scoring settings taken from the loaded configuration
pub fn vision_config(config: &Config) -> VisionConfig {
    VisionConfig {
        frame_width: config.camera.frame_width,
        blur_kernel_size: config.detection.blur_kernel_size,
        pixel_diff_threshold: config.detection.pixel_diff_threshold,
    }
}

/// Single-threaded capture loop
pub struct Monitor {
    source: Box<dyn FrameSource>,
    display: Box<dyn Display>,
    commands: Vec<Box<dyn CommandSource>>,
    analyzer: MotionAnalyzer,
    alarm: SharedAlarm,
    notifier: NotifierHandle,
    pacer: CyclePacer,
    window_name: String,
    cycles: u64,
    triggers: u64,
}

impl Monitor {
    pub fn new(
        config: &Config,
        source: Box<dyn FrameSource>,
        display: Box<dyn Display>,
        alarm: SharedAlarm,
        notifier: NotifierHandle,
    ) -> Result<Self> {
        Ok(Self {
            source,
            display,
            commands: Vec::new(),
            analyzer: MotionAnalyzer::new(&vision_config(config))?,
            alarm,
            notifier,
            pacer: CyclePacer::new(config.pipeline.max_fps),
            window_name: config.pipeline.window_name.clone(),
            cycles: 0,
            triggers: 0,
        })
    }

    /// Add a command source polled once per cycle
    pub fn with_commands(mut self, commands: Box<dyn CommandSource>) -> Self {
        self.commands.push(commands);
        self
    }

    /// Run until exit or exhaustion. The source and display are closed on
    /// every path out, including failures.
    pub fn run(mut self) -> Result<MonitorReport> {
        info!(
            source = %self.source.describe(),
            window = %self.window_name,
            budget_ms = self.pacer.budget().map(|b| b.as_millis() as u64),
            "Monitor started"
        );

        let outcome = self.run_cycles();
        let closed = self.close();

        let exit = match outcome {
            Ok(exit) => exit,
            Err(e) => {
                error!(cycles = self.cycles, error = %e, "Monitor failed");
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "Failed to release capture resources");
                }
                return Err(e);
            }
        };
        closed?;

        let report = MonitorReport {
            cycles: self.cycles,
            triggers: self.triggers,
            exit,
            final_state: self.alarm.state()?,
        };
        info!(
            cycles = report.cycles,
            triggers = report.triggers,
            exit = ?report.exit,
            state = %report.final_state,
            "Monitor stopped"
        );
        Ok(report)
    }

    fn run_cycles(&mut self) -> Result<ExitReason> {
        let mut stopwatch = Stopwatch::start();
        loop {
            if let Some(exit) = self.cycle()? {
                return Ok(exit);
            }

            let wait = self.pacer.remaining(stopwatch.elapsed());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
            stopwatch.lap();
        }
    }

    /// One pass of the loop; `Some` when the loop should stop
    fn cycle(&mut self) -> Result<Option<ExitReason>> {
        let frame = match self.source.read()? {
            Some(frame) => frame,
            None => {
                info!(source = %self.source.describe(), "Frame source exhausted");
                return Ok(Some(ExitReason::SourceExhausted));
            }
        };
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::Acquisition(format!(
                "{} returned an empty frame",
                self.source.describe()
            )));
        }
        self.cycles += 1;

        let view = if self.alarm.state()?.is_armed() {
            let reading = self.analyzer.analyze(&frame)?;
            if let Transition::Triggered { counter } = self.alarm.on_cycle(reading.score)? {
                self.triggers += 1;
                let trigger = AlarmTrigger::new(counter);
                info!(episode = %trigger.episode, counter, "Alarm episode started");
                self.notifier.trigger(trigger)?;
            }
            DynamicImage::ImageLuma8(reading.mask)
        } else {
            DynamicImage::ImageRgb8(frame)
        };
        self.display.show(&self.window_name, &view)?;

        let mut exit = None;
        for commands in self.commands.iter_mut() {
            let Some(command) = commands.poll()? else {
                continue;
            };
            match self.alarm.apply(command)? {
                Transition::Armed => self.analyzer.reset(),
                Transition::Exit => exit = Some(ExitReason::Command),
                _ => {}
            }
        }

        Ok(exit)
    }

    fn close(&mut self) -> Result<()> {
        debug!(source = %self.source.describe(), "Releasing capture resources");
        let source = self.source.close();
        let display = self.display.close();
        source.and(display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_alarm::{ChannelCommands, Command, Thresholds};
    use tw_capture::{MemorySource, NullDisplay};

    fn config() -> Config {
        let mut config = Config::default();
        config.camera.frame_width = 32;
        config
    }

    #[test]
    fn test_vision_config_from_config() {
        let vision = vision_config(&Config::default());
        assert_eq!(vision, VisionConfig::default());
    }

    #[test]
    fn test_exit_command_stops_after_current_cycle() {
        let config = config();
        let alarm = SharedAlarm::new(Thresholds::default());
        let (notifier, _rx) = NotifierHandle::channel();
        let (sender, commands) = ChannelCommands::channel();
        sender.send(Command::Exit).unwrap();

        let monitor = Monitor::new(
            &config,
            Box::new(MemorySource::new(test_support::still_frames(32, 32, 5))),
            Box::new(NullDisplay::new()),
            alarm,
            notifier,
        )
        .unwrap()
        .with_commands(Box::new(commands));

        let report = monitor.run().unwrap();
        assert_eq!(report.exit, ExitReason::Command);
        assert_eq!(report.cycles, 1);
        assert_eq!(report.final_state, AlarmState::Disarmed);
    }

    #[test]
    fn test_empty_source_exhausts_immediately() {
        let (notifier, _rx) = NotifierHandle::channel();
        let monitor = Monitor::new(
            &config(),
            Box::new(MemorySource::new(Vec::new())),
            Box::new(NullDisplay::new()),
            SharedAlarm::new(Thresholds::default()),
            notifier,
        )
        .unwrap();

        let report = monitor.run().unwrap();
        assert_eq!(report.exit, ExitReason::SourceExhausted);
        assert_eq!(report.cycles, 0);
        assert_eq!(report.triggers, 0);
    }

    #[test]
    fn test_invalid_kernel_rejected_at_construction() {
        let mut config = config();
        config.detection.blur_kernel_size = 4;
        let (notifier, _rx) = NotifierHandle::channel();
        let result = Monitor::new(
            &config,
            Box::new(MemorySource::new(Vec::new())),
            Box::new(NullDisplay::new()),
            SharedAlarm::new(Thresholds::default()),
            notifier,
        );
        assert!(result.is_err());
    }
}
