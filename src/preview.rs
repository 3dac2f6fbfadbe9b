//! Off-line sampling of glottal source waveforms for plots.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use crate::{parameter::SourceParameters, source::SourceModel, Error};

// -------------------------------------------------------------------------------------------------

/// A single point of a waveform preview: normalized cycle time and amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewPoint {
    pub x: f32,
    pub y: f32,
}

// -------------------------------------------------------------------------------------------------

/// Sample one glottal cycle of the given model at `sample_count` equidistant positions and
/// normalize the result to a peak amplitude of 1. Silent waveforms are left unchanged.
pub fn preview_waveform(
    model: SourceModel,
    parameters: &SourceParameters,
    sample_count: usize,
) -> Result<Vec<PreviewPoint>, Error> {
    let shape = model.shape(parameters)?;
    let mut points = (0..sample_count)
        .map(|k| {
            let x = k as f64 / sample_count as f64;
            PreviewPoint {
                x: x as f32,
                y: shape.sample(x),
            }
        })
        .collect::<Vec<_>>();
    let peak = points.iter().fold(0.0f32, |peak, p| peak.max(p.y.abs()));
    if peak > 0.0 && peak.is_finite() {
        for point in &mut points {
            point.y /= peak;
        }
    }
    Ok(points)
}

/// Sample a model preview from a name keyed parameter record. Unknown names are ignored,
/// missing values use their defaults and out of range values get clamped.
pub fn preview_waveform_from_values<'a, I>(
    model_name: &str,
    values: I,
    sample_count: usize,
) -> Result<Vec<PreviewPoint>, Error>
where
    I: IntoIterator<Item = (&'a str, f32)>,
{
    let model = SourceModel::from_name(model_name)?;
    let parameters = model.parameters_from_values(values);
    preview_waveform(model, &parameters, sample_count)
}

// -------------------------------------------------------------------------------------------------

/// A waveform preview request for a [`PreviewWorker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRequest {
    pub model: SourceModel,
    pub parameters: SourceParameters,
    pub sample_count: usize,
}

impl PreviewRequest {
    pub fn new(model: SourceModel, parameters: SourceParameters, sample_count: usize) -> Self {
        Self {
            model,
            parameters,
            sample_count,
        }
    }
}

/// A [`PreviewWorker`]'s answer to a [`PreviewRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResponse {
    /// Id of the request, as returned by [`PreviewWorker::request`].
    pub request_id: u64,
    pub result: Result<Vec<PreviewPoint>, Error>,
}

// -------------------------------------------------------------------------------------------------

/// Samples waveform previews in a background thread.
///
/// When requests pile up faster than they can be answered, only the most recent pending
/// request gets answered. Dropping the worker shuts down its thread.
pub struct PreviewWorker {
    request_sender: Option<Sender<(u64, PreviewRequest)>>,
    response_receiver: Receiver<PreviewResponse>,
    next_request_id: u64,
    thread: Option<JoinHandle<()>>,
}

impl PreviewWorker {
    const REQUEST_QUEUE_SIZE: usize = 16;
    const RESPONSE_QUEUE_SIZE: usize = 16;

    pub fn new() -> Result<Self, Error> {
        let (request_sender, request_receiver) =
            crossbeam_channel::bounded::<(u64, PreviewRequest)>(Self::REQUEST_QUEUE_SIZE);
        let (response_sender, response_receiver) =
            crossbeam_channel::bounded(Self::RESPONSE_QUEUE_SIZE);
        let thread = thread::Builder::new()
            .name("preview_worker".to_string())
            .spawn(move || Self::run(request_receiver, response_sender))
            .map_err(|err| {
                Error::SendError(format!("failed to spawn preview worker thread: {err}"))
            })?;
        Ok(Self {
            request_sender: Some(request_sender),
            response_receiver,
            next_request_id: 0,
            thread: Some(thread),
        })
    }

    /// Queue a new request. Returns the id of the request, which is passed along with its
    /// response.
    pub fn request(&mut self, request: PreviewRequest) -> Result<u64, Error> {
        let sender = self
            .request_sender
            .as_ref()
            .ok_or_else(|| Error::SendError("preview worker is shut down".to_string()))?;
        let id = self.next_request_id;
        sender.try_send((id, request)).map_err(|err| match err {
            TrySendError::Full(_) => Error::SendError("preview request queue is full".to_string()),
            TrySendError::Disconnected(_) => {
                Error::SendError("preview worker is gone".to_string())
            }
        })?;
        self.next_request_id += 1;
        Ok(id)
    }

    /// Fetch the next available response, if any, without blocking.
    pub fn try_recv(&self) -> Option<PreviewResponse> {
        match self.response_receiver.try_recv() {
            Ok(response) => Some(response),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next response until the given timeout elapsed.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<PreviewResponse> {
        match self.response_receiver.recv_timeout(timeout) {
            Ok(response) => Some(response),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    fn run(
        request_receiver: Receiver<(u64, PreviewRequest)>,
        response_sender: Sender<PreviewResponse>,
    ) {
        log::debug!("Preview worker started");
        // runs until the request channel got disconnected
        while let Ok(mut next) = request_receiver.recv() {
            // skip outdated requests
            while let Ok(newer) = request_receiver.try_recv() {
                next = newer;
            }
            let (request_id, request) = next;
            let result = preview_waveform(request.model, &request.parameters, request.sample_count);
            if let Err(err) = &result {
                log::warn!("Preview request {request_id} failed: {err}");
            }
            if response_sender
                .send(PreviewResponse { request_id, result })
                .is_err()
            {
                break;
            }
        }
        log::debug!("Preview worker stopped");
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        // disconnect the request channel to stop the worker thread
        self.request_sender.take();
        // the worker may be blocked on a full response channel: drain it
        while self.response_receiver.try_recv().is_ok() {}
        if let Some(thread) = self.thread.take() {
            while !thread.is_finished() {
                while self.response_receiver.try_recv().is_ok() {}
                thread::yield_now();
            }
            if thread.join().is_err() {
                log::error!("Preview worker thread panicked");
            }
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn normalized_preview() -> Result<(), Error> {
        let model = SourceModel::RosenbergC;
        let points = preview_waveform(model, &model.default_parameters(), 200)?;
        assert_eq!(points.len(), 200);
        assert_eq!(points[0].x, 0.0);
        assert_eq!(points[100].x, 0.5);
        let peak = points.iter().fold(0.0f32, |peak, p| peak.max(p.y.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn silent_preview() -> Result<(), Error> {
        // a single sample at t=0, where the waveform is zero
        let model = SourceModel::Klglott88;
        let points = preview_waveform(model, &model.default_parameters(), 1)?;
        assert_eq!(points, vec![PreviewPoint { x: 0.0, y: 0.0 }]);
        assert!(preview_waveform(model, &model.default_parameters(), 0)?.is_empty());
        Ok(())
    }

    #[test]
    fn preview_from_values() -> Result<(), Error> {
        let points = preview_waveform_from_values(
            "cutoffSawtooth",
            [("Oq", 0.5), ("am", 0.7), ("bogus", 1.0)],
            4,
        )?;
        let ys = points.iter().map(|p| p.y).collect::<Vec<_>>();
        assert_eq!(ys, vec![1.0, 0.75, 0.0, 0.0]);
        assert!(matches!(
            preview_waveform_from_values("sine", [], 4),
            Err(Error::SourceModelNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn worker_answers_latest_request() -> Result<(), Error> {
        let mut worker = PreviewWorker::new()?;
        let model = SourceModel::LiljencrantsFant;
        let mut last_id = 0;
        for sample_count in [100, 200, 300] {
            last_id = worker.request(PreviewRequest::new(
                model,
                model.default_parameters(),
                sample_count,
            ))?;
        }
        let mut responses = Vec::new();
        while let Some(response) = worker.recv_timeout(Duration::from_secs(5)) {
            let done = response.request_id == last_id;
            responses.push(response);
            if done {
                break;
            }
        }
        let last = responses.last().expect("missing response");
        assert_eq!(last.request_id, last_id);
        assert_eq!(last.result.as_ref().map(|p| p.len()), Ok(300));
        assert!(responses.len() <= 3);
        assert!(responses
            .windows(2)
            .all(|w| w[0].request_id < w[1].request_id));
        Ok(())
    }

    #[test]
    fn worker_reports_errors() -> Result<(), Error> {
        let mut worker = PreviewWorker::new()?;
        let model = SourceModel::LiljencrantsFant;
        let mut parameters = model.default_parameters();
        parameters.set(model.parameter("am").unwrap().id(), 0.4);
        let id = worker.request(PreviewRequest::new(model, parameters, 100))?;
        let response = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("missing response");
        assert_eq!(response.request_id, id);
        assert!(matches!(response.result, Err(Error::NumericDomainError(_))));
        Ok(())
    }
}
