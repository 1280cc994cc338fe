use std::{future::Future, time::Duration};

use tokio::sync::mpsc;

use crate::{
    ChildEvent, ChildEventKind, ChildEvents, Children, Client, QueueName, StoreResult,
    children_from_value,
};

/// Child subscriptions, emulated by polling a queue node and diffing its key set.
impl Client {
    /// Start polling `queue` and deliver events of `kind` until the receiver is dropped.
    pub(crate) fn watch(&self, queue: QueueName, kind: ChildEventKind) -> StoreResult<ChildEvents> {
        let url = self.session_url(&["queue", queue.as_str()])?;
        let path = format!("queue/{queue}");
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.clone();

        tokio::spawn(poll_children(queue, kind, self.poll_interval, tx, move || {
            let client = client.clone();
            let url = url.clone();
            let path = path.clone();
            async move { children_from_value(&path, client.get_json(&url).await?) }
        }));

        Ok(rx)
    }
}

/// Call `fetch` every `interval` and send the events of `kind` between consecutive
/// results, until the receiver is dropped. Failed fetches are logged and retried
/// on the next tick.
pub(crate) async fn poll_children<F, Fut>(
    queue: QueueName,
    kind: ChildEventKind,
    interval: Duration,
    tx: mpsc::UnboundedSender<ChildEvent>,
    mut fetch: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<Children>>,
{
    let mut interval = tokio::time::interval(interval);
    let mut previous: Option<Children> = None;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tx.closed() => break,
        }

        let children = match fetch().await {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!("Polling queue/{queue} failed: {e}");
                continue;
            }
        };
        for event in poll_events(queue, kind, previous.as_ref(), &children) {
            if tx.send(event).is_err() {
                return;
            }
        }
        previous = Some(children);
    }
    tracing::debug!("Stopped watching queue/{queue} for {kind:?} events");
}

/// The events of `kind` for one successful poll.
///
/// On the first poll an added subscription reports every child, and a removed
/// subscription reports nothing and uses the result as its baseline.
pub(crate) fn poll_events(
    queue: QueueName,
    kind: ChildEventKind,
    previous: Option<&Children>,
    current: &Children,
) -> Vec<ChildEvent> {
    match (previous, kind) {
        (None, ChildEventKind::Removed) => vec![],
        (None, ChildEventKind::Added) => diff_children(queue, kind, &Children::new(), current),
        (Some(previous), _) => diff_children(queue, kind, previous, current),
    }
}

/// Compute the events of `kind` that turn `previous` into `current`.
///
/// Only key membership matters; a child whose value changed in place is neither
/// added nor removed.
pub(crate) fn diff_children(
    queue: QueueName,
    kind: ChildEventKind,
    previous: &Children,
    current: &Children,
) -> Vec<ChildEvent> {
    let (from, to) = match kind {
        ChildEventKind::Added => (previous, current),
        ChildEventKind::Removed => (current, previous),
    };
    to.iter()
        .filter(|(key, _)| !from.contains_key(*key))
        .map(|(key, value)| ChildEvent::new(kind, queue, key.clone(), value.clone()))
        .collect()
}
