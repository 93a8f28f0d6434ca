use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::recognition_stream_processor::RecognitionStreamProcessor;
use crate::pipeline::tick_status::TickStatus;
use crate::recognition::domain::analysis::Analysis;
use crate::recognition::infrastructure::face_database::FaceDatabase;

/// Pause after a dropped frame before reading again.
const RETRY_DELAY: Duration = Duration::from_millis(10);

pub enum AnalysisMessage {
    /// A frame was read; `analysis` is the latest analysed snapshot.
    Update {
        frame_index: usize,
        analysis: Vec<Analysis>,
        name: Option<String>,
    },
    /// The frame source is exhausted.
    Ended,
    /// A stop was requested.
    Stopped,
    Error(String),
}

/// Requests to a running worker. Both are served between ticks.
#[derive(Clone, Default)]
pub struct AnalysisControl {
    stop: Arc<AtomicBool>,
    reset: Arc<AtomicBool>,
}

impl AnalysisControl {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Releases the latched name before the next tick, as when the person
    /// in front of the camera rejects the suggestion.
    pub fn reset_name(&self) {
        self.reset.store(true, Ordering::Relaxed);
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::Relaxed)
    }
}

/// Runs `processor` on its own thread until the stream ends, a stop is
/// requested, or the receiver is dropped.
///
/// Control requests are only checked between ticks, so a started tick
/// always runs to completion. The database is read-locked for the duration
/// of a tick; enrollment takes the write lock in between.
pub fn spawn(
    processor: RecognitionStreamProcessor,
    database: Arc<RwLock<FaceDatabase>>,
) -> (Receiver<AnalysisMessage>, AnalysisControl) {
    let (tx, rx) = crossbeam_channel::unbounded::<AnalysisMessage>();
    let control = AnalysisControl::default();
    let control_clone = control.clone();

    thread::spawn(move || {
        let mut processor = processor;
        run_analysis(&tx, &control_clone, &mut processor, &database);
        processor.close();
        processor.logger().summary();
    });

    (rx, control)
}

fn run_analysis(
    tx: &Sender<AnalysisMessage>,
    control: &AnalysisControl,
    processor: &mut RecognitionStreamProcessor,
    database: &RwLock<FaceDatabase>,
) {
    log::info!("analysis worker started");
    loop {
        if control.is_stopped() {
            let _ = tx.send(AnalysisMessage::Stopped);
            break;
        }
        if control.take_reset() {
            processor.reset_name();
        }

        let status = match database.read() {
            Ok(db) => processor.tick(db.records()),
            Err(_) => {
                let _ = tx.send(AnalysisMessage::Error("face database lock poisoned".into()));
                break;
            }
        };

        match status {
            TickStatus::Processed => {
                let update = AnalysisMessage::Update {
                    frame_index: processor.current_frame().map_or(0, |f| f.index()),
                    analysis: processor.current_analysis().to_vec(),
                    name: processor.current_name().map(str::to_string),
                };
                if tx.send(update).is_err() {
                    log::debug!("analysis receiver dropped");
                    break;
                }
            }
            TickStatus::Skipped => thread::sleep(RETRY_DELAY),
            TickStatus::Ended => {
                let _ = tx.send(AnalysisMessage::Ended);
                break;
            }
        }
    }
    log::info!("analysis worker finished");
}
