//! Notification sounds.
//!
//! The default is the terminal bell. Building with the `sound` feature adds
//! a file-backed player on a dedicated audio thread.

use std::io::Write;

use crate::config::EventsConfig;

/// Plays the cue for an event notification. Must return quickly; called
/// from the countdown tick.
pub trait NotificationSound: Send + Sync {
    fn play(&self);
}

/// Rings the terminal bell on stderr
pub struct TerminalBell;

impl NotificationSound for TerminalBell {
    fn play(&self) {
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|_| stderr.flush()) {
            tracing::debug!("Failed to ring bell: {}", e);
        }
    }
}

/// No sound at all
pub struct Silent;

impl NotificationSound for Silent {
    fn play(&self) {}
}

/// Pick the sound backend for the configured options
pub fn from_config(config: &EventsConfig) -> Box<dyn NotificationSound> {
    match &config.sound_file {
        #[cfg(feature = "sound")]
        Some(path) => Box::new(file::FileSound::new(path.into(), config.sound_volume)),
        #[cfg(not(feature = "sound"))]
        Some(path) => {
            tracing::warn!(
                "Sound file {} configured but built without the `sound` feature; using the bell",
                path
            );
            Box::new(TerminalBell)
        }
        None => Box::new(TerminalBell),
    }
}

#[cfg(feature = "sound")]
mod file {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::sync::mpsc::{self, Sender};
    use std::thread;

    use rodio::{Decoder, OutputStream, Sink};
    use tracing::{debug, warn};

    use super::NotificationSound;

    /// Plays a sound file through the default output device.
    ///
    /// The output stream is not `Send`, so it lives on its own thread and
    /// receives play requests over a channel.
    pub struct FileSound {
        tx: Sender<()>,
    }

    impl FileSound {
        pub fn new(path: PathBuf, volume: f32) -> Self {
            let (tx, rx) = mpsc::channel::<()>();
            thread::spawn(move || {
                let mut output = OutputStream::try_default().ok();
                if output.is_none() {
                    warn!("Audio output unavailable; notification sounds disabled until a device appears");
                }
                let mut active: Vec<Sink> = Vec::new();

                while rx.recv().is_ok() {
                    active.retain(|sink| !sink.empty());

                    if output.is_none() {
                        output = OutputStream::try_default().ok();
                    }
                    let Some((_, handle)) = output.as_ref() else {
                        continue;
                    };

                    let file = match File::open(&path) {
                        Ok(file) => file,
                        Err(e) => {
                            debug!("Failed to open sound file {:?}: {}", path, e);
                            continue;
                        }
                    };
                    let decoder = match Decoder::new(BufReader::new(file)) {
                        Ok(decoder) => decoder,
                        Err(e) => {
                            debug!("Failed to decode sound file {:?}: {}", path, e);
                            continue;
                        }
                    };

                    match Sink::try_new(handle) {
                        Ok(sink) => {
                            sink.set_volume(volume.clamp(0.0, 1.0));
                            sink.append(decoder);
                            active.push(sink);
                        }
                        Err(e) => {
                            warn!("Failed to create audio sink: {}", e);
                            output = None;
                        }
                    }
                }
            });

            Self { tx }
        }
    }

    impl NotificationSound for FileSound {
        fn play(&self) {
            let _ = self.tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_is_bell() {
        // Smoke test: must not panic or block without a terminal
        from_config(&EventsConfig::default()).play();
        Silent.play();
    }
}
