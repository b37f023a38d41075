use crate::{
    cancel::{CancelToken, select_until},
    config::Config,
    error::Error,
    types::MergedEvent,
};
use crossbeam_channel::{Receiver, Select, Sender};

/// Multiplexes `sources` into a single channel of [`MergedEvent`]s on a
/// dedicated thread.
///
/// Every value is tagged with the index of the source it came from. No order
/// is guaranteed across sources. The output closes once every source has
/// closed, or as soon as `token` is cancelled; it also stops when the output's
/// receiver is dropped.
///
/// # Errors
/// [`Error::Spawn`] if the merger thread could not be started.
pub fn merge<T: Send + 'static>(
    config: &Config,
    token: &CancelToken,
    sources: Vec<Receiver<T>>,
) -> Result<Receiver<MergedEvent<T>>, Error> {
    let (sender, receiver) = crossbeam_channel::bounded(sources.len());
    let token = token.clone();
    let name = config.merge_thread_name();
    config
        .builder(name.clone())
        .spawn(move || forward(&token, &sources, &sender))
        .map_err(|source| Error::Spawn { name, source })?;
    Ok(receiver)
}

fn forward<T>(token: &CancelToken, sources: &[Receiver<T>], out: &Sender<MergedEvent<T>>) {
    let signals = token.signals();
    let mut select = Select::new();
    for source in sources {
        select.recv(source);
    }
    let signal_range = signals.register(&mut select);

    let mut open = sources.len();
    while open > 0 {
        if token.is_cancelled() {
            tracing::trace!(open, "merger cancelled");
            return;
        }
        let Some(operation) = select_until(&mut select, signals.deadline) else {
            tracing::trace!(open, "merger deadline exceeded");
            return;
        };
        let index = operation.index();
        if signal_range.contains(&index) {
            signals.complete(operation, &signal_range);
            tracing::trace!(open, "merger cancelled");
            return;
        }
        match operation.recv(&sources[index]) {
            Ok(value) => {
                if token.is_cancelled() {
                    return;
                }
                tracing::trace!(index, "merged event");
                if out.send(MergedEvent { value, index }).is_err() {
                    tracing::trace!("merged stream dropped by consumer");
                    return;
                }
            }
            Err(_) => {
                select.remove(index);
                open -= 1;
            }
        }
    }
}
